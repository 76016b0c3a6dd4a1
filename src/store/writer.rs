//! Insert and update of parsed records.
//!
//! On insert every facet that is present is written. On update every
//! present facet replaces the stored rows for that facet (delete, then
//! insert), while absent facets keep their stored rows. Scalar columns of
//! the main row and all six representations are rewritten by both.

use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::parser::ParsedRecord;
use crate::properties::{BoundingBox, CrsReference, Format, Keyword, MetadataDate};
use crate::recovery::ParseReport;
use crate::representation::{generate, RepresentationSet};

use super::keys::{next_insert_key, resolve_key};
use super::reader::read_crs;
use super::schema::Table;
use super::RecordStore;

/// Result of a successful insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Internal key of the written record
    pub key: i64,
    /// Global identifier of the written record
    pub identifier: String,
    /// Row ids of the six representations, by level then encoding
    pub representation_ids: Vec<i64>,
    /// Fields defaulted while parsing the submitted record
    pub report: ParseReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    Update,
}

impl RecordStore<'_> {
    /// Persist a new record.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::MissingIdentifier`] if the record has no identifier
    /// - [`CatalogError::DuplicateIdentifier`] if the identifier is already stored
    /// - [`CatalogError::WriteFailure`] if any statement fails; nothing is persisted
    pub fn insert(&mut self, record: &ParsedRecord) -> Result<WriteOutcome> {
        let identifier = record.identifier().ok_or(CatalogError::MissingIdentifier)?;
        let representations = generate(record, &self.config);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(CatalogError::write("transaction"))?;
        if resolve_key(&tx, identifier)?.is_some() {
            return Err(CatalogError::DuplicateIdentifier(identifier.to_string()));
        }

        let key = next_insert_key(&tx, Table::Datasets)?;
        insert_main_row(&tx, key, identifier, record)?;
        write_facets(&tx, key, record, WriteMode::Insert)?;
        let representation_ids =
            write_representations(&tx, key, &representations, WriteMode::Insert)?;
        tx.commit().map_err(CatalogError::write("transaction"))?;

        info!(key, identifier, "inserted record");
        Ok(WriteOutcome {
            key,
            identifier: identifier.to_string(),
            representation_ids,
            report: record.report.clone(),
        })
    }

    /// Replace the stored record with global identifier `identifier`.
    ///
    /// The stored identifier is kept even if `record` carries another one.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if no record has `identifier`; nothing is written
    /// - [`CatalogError::WriteFailure`] if any statement fails; nothing is persisted
    pub fn update(&mut self, identifier: &str, record: &ParsedRecord) -> Result<WriteOutcome> {
        let representations = generate(record, &self.config);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(CatalogError::write("transaction"))?;
        let key = resolve_key(&tx, identifier)?
            .ok_or_else(|| CatalogError::NotFound(identifier.to_string()))?;

        update_main_row(&tx, key, record)?;
        write_facets(&tx, key, record, WriteMode::Update)?;
        let representation_ids =
            write_representations(&tx, key, &representations, WriteMode::Update)?;
        tx.commit().map_err(CatalogError::write("transaction"))?;

        info!(key, identifier, "updated record");
        Ok(WriteOutcome {
            key,
            identifier: identifier.to_string(),
            representation_ids,
            report: record.report.clone(),
        })
    }
}

fn insert_main_row(
    tx: &Transaction<'_>,
    key: i64,
    identifier: &str,
    record: &ParsedRecord,
) -> Result<()> {
    let qp = &record.queryables;
    let rp = &record.returnables;
    tx.execute(
        "INSERT INTO datasets (id, version, anytext, identifier, modified,
             hassecurityconstraints, language, parentidentifier, source, association,
             creator, publisher, contributor, graphicoverview)
         VALUES (?1, 1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            key,
            qp.any_text,
            identifier,
            qp.modified.to_sql(),
            qp.has_security_constraints,
            rp.language,
            qp.parent_identifier,
            rp.source,
            qp.association,
            rp.creator,
            rp.publisher,
            rp.contributor,
            rp.graphic_overview,
        ],
    )
    .map_err(CatalogError::write(Table::Datasets.name()))?;
    debug!(key, identifier, "wrote main row");
    Ok(())
}

fn update_main_row(tx: &Transaction<'_>, key: i64, record: &ParsedRecord) -> Result<()> {
    let qp = &record.queryables;
    let rp = &record.returnables;
    tx.execute(
        "UPDATE datasets SET version = version + 1, anytext = ?2, modified = ?3,
             hassecurityconstraints = ?4, language = ?5, parentidentifier = ?6,
             source = ?7, association = ?8, creator = ?9, publisher = ?10,
             contributor = ?11, graphicoverview = ?12
         WHERE id = ?1",
        params![
            key,
            qp.any_text,
            qp.modified.to_sql(),
            qp.has_security_constraints,
            rp.language,
            qp.parent_identifier,
            rp.source,
            qp.association,
            rp.creator,
            rp.publisher,
            rp.contributor,
            rp.graphic_overview,
        ],
    )
    .map_err(CatalogError::write(Table::Datasets.name()))?;
    debug!(key, "updated main row");
    Ok(())
}

/// Remove the rows of `table` belonging to `key` when updating.
fn clear(tx: &Transaction<'_>, table: Table, key: i64, mode: WriteMode) -> Result<()> {
    if mode == WriteMode::Update {
        let name = table.name();
        let removed = tx
            .execute(
                &format!("DELETE FROM {name} WHERE fk_datasets = ?1"),
                params![key],
            )
            .map_err(CatalogError::write(name))?;
        debug!(table = name, key, removed, "cleared facet");
    }
    Ok(())
}

/// Replace the rows of a single-column facet table with `values`.
fn replace_values<V: ToSql>(
    tx: &Transaction<'_>,
    table: Table,
    key: i64,
    mode: WriteMode,
    values: &[V],
) -> Result<()> {
    let name = table.name();
    let column = table.value_column().ok_or_else(|| CatalogError::WriteFailure {
        table: name,
        source: rusqlite::Error::InvalidColumnName(name.to_string()),
    })?;
    clear(tx, table, key, mode)?;

    let mut stmt = tx
        .prepare_cached(&format!(
            "INSERT INTO {name} (id, fk_datasets, {column}) VALUES (?1, ?2, ?3)"
        ))
        .map_err(CatalogError::write(name))?;
    for value in values {
        let id = next_insert_key(tx, table)?;
        stmt.execute(params![id, key, value])
            .map_err(CatalogError::write(name))?;
    }
    debug!(table = name, key, rows = values.len(), "wrote facet");
    Ok(())
}

fn write_keywords(
    tx: &Transaction<'_>,
    key: i64,
    mode: WriteMode,
    groups: &[Keyword],
) -> Result<()> {
    let table = Table::Keyword;
    clear(tx, table, key, mode)?;
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO isoqp_keyword (id, fk_datasets, keywordgroup, keywordtype, keyword, thesaurus)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(CatalogError::write(table.name()))?;

    let mut group_index: i64 = 0;
    for group in groups {
        // A group without terms keeps one row so its type and thesaurus survive.
        let terms: Vec<Option<&str>> = if group.terms.is_empty() {
            vec![None]
        } else {
            group.terms.iter().map(|t| Some(t.as_str())).collect()
        };
        for term in terms {
            let id = next_insert_key(tx, table)?;
            stmt.execute(params![
                id,
                key,
                group_index,
                group.keyword_type,
                term,
                group.thesaurus
            ])
            .map_err(CatalogError::write(table.name()))?;
        }
        group_index += 1;
    }
    debug!(table = table.name(), key, groups = groups.len(), "wrote facet");
    Ok(())
}

fn write_formats(
    tx: &Transaction<'_>,
    key: i64,
    mode: WriteMode,
    formats: &[Format],
) -> Result<()> {
    let table = Table::Format;
    clear(tx, table, key, mode)?;
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO isoqp_format (id, fk_datasets, format, version) VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(CatalogError::write(table.name()))?;
    for format in formats {
        let id = next_insert_key(tx, table)?;
        stmt.execute(params![id, key, format.name, format.version])
            .map_err(CatalogError::write(table.name()))?;
    }
    debug!(table = table.name(), key, rows = formats.len(), "wrote facet");
    Ok(())
}

fn write_bounding_box(
    tx: &Transaction<'_>,
    key: i64,
    mode: WriteMode,
    bbox: &BoundingBox,
    crs: Option<&CrsReference>,
) -> Result<()> {
    let table = Table::BoundingBox;
    // An update without a reference system keeps the stored one.
    let crs_name = match crs {
        Some(crs) => Some(crs.name()),
        None if mode == WriteMode::Update => read_crs(tx, key)?.map(|c| c.name()),
        None => None,
    };
    clear(tx, table, key, mode)?;
    let id = next_insert_key(tx, table)?;
    tx.execute(
        "INSERT INTO isoqp_boundingbox (id, fk_datasets, westbound, eastbound, southbound, northbound, crs)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            key,
            bbox.west,
            bbox.east,
            bbox.south,
            bbox.north,
            crs_name
        ],
    )
    .map_err(CatalogError::write(table.name()))?;
    debug!(table = table.name(), key, "wrote facet");
    Ok(())
}

fn write_crs(tx: &Transaction<'_>, key: i64, mode: WriteMode, crs: &CrsReference) -> Result<()> {
    let table = Table::Crs;
    clear(tx, table, key, mode)?;
    let id = next_insert_key(tx, table)?;
    tx.execute(
        "INSERT INTO isoqp_crs (id, fk_datasets, authority, id_crs, version) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, key, crs.authority, crs.code, crs.version],
    )
    .map_err(CatalogError::write(table.name()))?;
    debug!(table = table.name(), key, "wrote facet");
    Ok(())
}

fn write_date(
    tx: &Transaction<'_>,
    table: Table,
    key: i64,
    mode: WriteMode,
    date: MetadataDate,
) -> Result<()> {
    replace_values(tx, table, key, mode, &[date.to_sql()])
}

fn write_facets(
    tx: &Transaction<'_>,
    key: i64,
    record: &ParsedRecord,
    mode: WriteMode,
) -> Result<()> {
    let qp = &record.queryables;

    if let Some(titles) = &qp.title {
        replace_values(tx, Table::Title, key, mode, titles)?;
    }
    if let Some(titles) = &qp.alternate_title {
        replace_values(tx, Table::AlternateTitle, key, mode, titles)?;
    }
    if let Some(code) = &qp.type_code {
        replace_values(tx, Table::Type, key, mode, std::slice::from_ref(code))?;
    }
    if let Some(keywords) = &qp.keywords {
        write_keywords(tx, key, mode, keywords)?;
    }
    if let Some(topics) = &qp.topic_category {
        replace_values(tx, Table::TopicCategory, key, mode, topics)?;
    }
    if let Some(formats) = &qp.format {
        write_formats(tx, key, mode, formats)?;
    }
    if let Some(fragments) = &qp.abstract_text {
        replace_values(tx, Table::Abstract, key, mode, fragments)?;
    }
    if let Some(name) = &qp.organisation_name {
        replace_values(tx, Table::OrganisationName, key, mode, std::slice::from_ref(name))?;
    }
    if let Some(id) = &qp.resource_identifier {
        replace_values(tx, Table::ResourceIdentifier, key, mode, std::slice::from_ref(id))?;
    }
    if let Some(language) = &qp.resource_language {
        replace_values(tx, Table::ResourceLanguage, key, mode, std::slice::from_ref(language))?;
    }
    if let Some(bbox) = &qp.bounding_box {
        write_bounding_box(tx, key, mode, bbox, qp.crs.as_ref())?;
    }
    if let Some(crs) = &qp.crs {
        write_crs(tx, key, mode, crs)?;
    }
    if let Some(date) = qp.creation_date {
        write_date(tx, Table::CreationDate, key, mode, date)?;
    }
    if let Some(date) = qp.revision_date {
        write_date(tx, Table::RevisionDate, key, mode, date)?;
    }
    if let Some(date) = qp.publication_date {
        write_date(tx, Table::PublicationDate, key, mode, date)?;
    }
    if let Some(rights) = &record.returnables.rights {
        replace_values(tx, Table::Rights, key, mode, rights)?;
    }
    Ok(())
}

/// Write all representations of `set`, returning their row ids.
///
/// On update an existing row for the same level and encoding is rewritten in
/// place; a missing one is created.
fn write_representations(
    tx: &Transaction<'_>,
    key: i64,
    set: &RepresentationSet,
    mode: WriteMode,
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(set.len());
    for rep in set {
        let table = Table::representation(rep.level);
        let name = table.name();
        let format = rep.encoding.code();

        let existing: Option<i64> = match mode {
            WriteMode::Insert => None,
            WriteMode::Update => tx
                .query_row(
                    &format!("SELECT id FROM {name} WHERE fk_datasets = ?1 AND format = ?2"),
                    params![key, format],
                    |row| row.get(0),
                )
                .optional()
                .map_err(CatalogError::write(name))?,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    &format!("UPDATE {name} SET data = ?1 WHERE id = ?2"),
                    params![rep.xml, id],
                )
                .map_err(CatalogError::write(name))?;
                id
            },
            None => {
                let id = next_insert_key(tx, table)?;
                tx.execute(
                    &format!(
                        "INSERT INTO {name} (id, fk_datasets, format, data) VALUES (?1, ?2, ?3, ?4)"
                    ),
                    params![id, key, format, rep.xml],
                )
                .map_err(CatalogError::write(name))?;
                id
            },
        };
        debug!(table = name, key, id, encoding = %rep.encoding, "wrote representation");
        ids.push(id);
    }
    Ok(ids)
}
