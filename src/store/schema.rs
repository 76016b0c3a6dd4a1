//! Relational schema of the catalogue store.
//!
//! One `datasets` row per record, one child table per queryable facet keyed
//! by `fk_datasets`, and three representation tables holding one row per
//! encoding. Table names only ever reach SQL text through [`Table::name`].

use std::fmt;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::representation::DetailLevel;

/// Every table the engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Main record table
    Datasets,
    /// Titles
    Title,
    /// Alternate titles
    AlternateTitle,
    /// Hierarchy type code
    Type,
    /// Keyword terms, one row per term
    Keyword,
    /// Topic categories
    TopicCategory,
    /// Distribution formats
    Format,
    /// Abstract fragments
    Abstract,
    /// Organisation name
    OrganisationName,
    /// Resource identifier
    ResourceIdentifier,
    /// Resource language
    ResourceLanguage,
    /// Geographic bounding box
    BoundingBox,
    /// Reference system
    Crs,
    /// Citation creation date
    CreationDate,
    /// Citation revision date
    RevisionDate,
    /// Citation publication date
    PublicationDate,
    /// Access rights codes
    Rights,
    /// Brief representations
    RecordBrief,
    /// Summary representations
    RecordSummary,
    /// Full representations
    RecordFull,
}

impl Table {
    /// All tables in creation order.
    pub const ALL: [Table; 20] = [
        Table::Datasets,
        Table::Title,
        Table::AlternateTitle,
        Table::Type,
        Table::Keyword,
        Table::TopicCategory,
        Table::Format,
        Table::Abstract,
        Table::OrganisationName,
        Table::ResourceIdentifier,
        Table::ResourceLanguage,
        Table::BoundingBox,
        Table::Crs,
        Table::CreationDate,
        Table::RevisionDate,
        Table::PublicationDate,
        Table::Rights,
        Table::RecordBrief,
        Table::RecordSummary,
        Table::RecordFull,
    ];

    /// SQL table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Table::Datasets => "datasets",
            Table::Title => "isoqp_title",
            Table::AlternateTitle => "isoqp_alternatetitle",
            Table::Type => "isoqp_type",
            Table::Keyword => "isoqp_keyword",
            Table::TopicCategory => "isoqp_topiccategory",
            Table::Format => "isoqp_format",
            Table::Abstract => "isoqp_abstract",
            Table::OrganisationName => "isoqp_organisationname",
            Table::ResourceIdentifier => "isoqp_resourceidentifier",
            Table::ResourceLanguage => "isoqp_resourcelanguage",
            Table::BoundingBox => "isoqp_boundingbox",
            Table::Crs => "isoqp_crs",
            Table::CreationDate => "isoqp_creationdate",
            Table::RevisionDate => "isoqp_revisiondate",
            Table::PublicationDate => "isoqp_publicationdate",
            Table::Rights => "isoqp_rights",
            Table::RecordBrief => "recordbrief",
            Table::RecordSummary => "recordsummary",
            Table::RecordFull => "recordfull",
        }
    }

    /// Value column of single-column facet tables.
    ///
    /// `None` for the main table, the multi-column facet tables and the
    /// representation tables.
    #[must_use]
    pub const fn value_column(self) -> Option<&'static str> {
        match self {
            Table::Title => Some("title"),
            Table::AlternateTitle => Some("alternatetitle"),
            Table::Type => Some("type"),
            Table::TopicCategory => Some("topiccategory"),
            Table::Abstract => Some("abstract"),
            Table::OrganisationName => Some("organisationname"),
            Table::ResourceIdentifier => Some("resourceidentifier"),
            Table::ResourceLanguage => Some("resourcelanguage"),
            Table::CreationDate => Some("creationdate"),
            Table::RevisionDate => Some("revisiondate"),
            Table::PublicationDate => Some("publicationdate"),
            Table::Rights => Some("rights"),
            _ => None,
        }
    }

    /// Representation table for a detail level.
    #[must_use]
    pub const fn representation(level: DetailLevel) -> Table {
        match level {
            DetailLevel::Brief => Table::RecordBrief,
            DetailLevel::Summary => Table::RecordSummary,
            DetailLevel::Full => Table::RecordFull,
        }
    }

    fn ddl(self) -> String {
        let name = self.name();
        let child = |columns: &str| {
            format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    id INTEGER PRIMARY KEY,
                    fk_datasets INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                    {columns}
                );
                CREATE INDEX IF NOT EXISTS idx_{name}_fk ON {name} (fk_datasets);"
            )
        };
        match self {
            Table::Datasets => "CREATE TABLE IF NOT EXISTS datasets (
                    id INTEGER PRIMARY KEY,
                    version INTEGER NOT NULL DEFAULT 1,
                    status TEXT,
                    anytext TEXT,
                    identifier TEXT NOT NULL UNIQUE,
                    modified TEXT,
                    hassecurityconstraints INTEGER NOT NULL DEFAULT 0,
                    language TEXT,
                    parentidentifier TEXT,
                    source TEXT,
                    association TEXT,
                    creator TEXT,
                    publisher TEXT,
                    contributor TEXT,
                    graphicoverview TEXT
                );"
            .to_string(),
            Table::Keyword => child(
                "keywordgroup INTEGER NOT NULL,
                    keywordtype TEXT,
                    keyword TEXT,
                    thesaurus TEXT",
            ),
            Table::Format => child("format TEXT NOT NULL, version TEXT"),
            Table::BoundingBox => child(
                "westbound REAL NOT NULL,
                    eastbound REAL NOT NULL,
                    southbound REAL NOT NULL,
                    northbound REAL NOT NULL,
                    crs TEXT",
            ),
            Table::Crs => child("authority TEXT, id_crs TEXT NOT NULL, version TEXT"),
            Table::RecordBrief | Table::RecordSummary | Table::RecordFull => format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    id INTEGER PRIMARY KEY,
                    fk_datasets INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                    format INTEGER NOT NULL CHECK (format IN (1, 2)),
                    data TEXT NOT NULL,
                    UNIQUE (fk_datasets, format)
                );"
            ),
            Table::CreationDate | Table::RevisionDate | Table::PublicationDate => {
                let column = self.value_column().unwrap_or("value");
                child(&format!("{column} TEXT"))
            },
            _ => {
                let column = self.value_column().unwrap_or("value");
                child(&format!("{column} TEXT NOT NULL"))
            },
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create all tables if they do not exist yet and enable foreign keys on
/// `conn`.
///
/// # Errors
///
/// Returns [`CatalogError::WriteFailure`] naming the table whose DDL failed.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(CatalogError::write("pragma"))?;
    for table in Table::ALL {
        conn.execute_batch(&table.ddl())
            .map_err(CatalogError::write(table.name()))?;
    }
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS key_sequences (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );",
    )
    .map_err(CatalogError::write("key_sequences"))?;
    debug!(tables = Table::ALL.len(), "schema ready");
    Ok(())
}
