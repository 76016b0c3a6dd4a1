//! Reading stored records back into the Property Model.
//!
//! A facet table without rows for a record loads as an absent facet, so a
//! facet stored as present-but-empty reads back as `None`.

use rusqlite::types::FromSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CatalogError, Result};
use crate::properties::{
    BoundingBox, CrsReference, Format, Keyword, MetadataDate, QueryableProperties,
    ReturnableProperties,
};
use crate::representation::{DetailLevel, Encoding};

use super::schema::Table;

/// A record as reconstructed from its stored rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Internal key
    pub key: i64,
    /// Global identifier
    pub identifier: String,
    /// Row version, `1` after insert and incremented by every update
    pub version: i64,
    /// Stored queryable properties
    pub queryables: QueryableProperties,
    /// Stored returnable properties
    pub returnables: ReturnableProperties,
}

/// Load the record with internal key `key`.
///
/// # Errors
///
/// Returns [`CatalogError::ReadFailure`] naming the table whose query failed.
pub fn load_record(conn: &Connection, key: i64) -> Result<Option<StoredRecord>> {
    let main = conn
        .query_row(
            "SELECT version, anytext, identifier, modified, hassecurityconstraints, language,
                    parentidentifier, source, association, creator, publisher, contributor,
                    graphicoverview
             FROM datasets WHERE id = ?1",
            params![key],
            |row| {
                let version: i64 = row.get(0)?;
                let identifier: String = row.get(2)?;
                let modified: Option<String> = row.get(3)?;
                let qp = QueryableProperties {
                    identifier: Some(identifier.clone()),
                    any_text: row.get(1)?,
                    modified: MetadataDate::from_sql(modified.as_deref()),
                    has_security_constraints: row.get(4)?,
                    parent_identifier: row.get(6)?,
                    association: row.get(8)?,
                    ..QueryableProperties::default()
                };
                let rp = ReturnableProperties {
                    language: row.get(5)?,
                    source: row.get(7)?,
                    creator: row.get(9)?,
                    publisher: row.get(10)?,
                    contributor: row.get(11)?,
                    graphic_overview: row.get(12)?,
                    rights: None,
                };
                Ok((version, identifier, qp, rp))
            },
        )
        .optional()
        .map_err(CatalogError::read(Table::Datasets.name()))?;

    let Some((version, identifier, mut qp, mut rp)) = main else {
        return Ok(None);
    };

    qp.title = non_empty(read_values(conn, Table::Title, key)?);
    qp.alternate_title = non_empty(read_values(conn, Table::AlternateTitle, key)?);
    qp.type_code = first(read_values(conn, Table::Type, key)?);
    qp.keywords = non_empty(read_keywords(conn, key)?);
    qp.topic_category = non_empty(read_values(conn, Table::TopicCategory, key)?);
    qp.format = non_empty(read_formats(conn, key)?);
    qp.abstract_text = non_empty(read_values(conn, Table::Abstract, key)?);
    qp.organisation_name = first(read_values(conn, Table::OrganisationName, key)?);
    qp.resource_identifier = first(read_values(conn, Table::ResourceIdentifier, key)?);
    qp.resource_language = first(read_values(conn, Table::ResourceLanguage, key)?);
    qp.bounding_box = read_bounding_box(conn, key)?;
    qp.crs = read_crs(conn, key)?;
    qp.creation_date = read_date(conn, Table::CreationDate, key)?;
    qp.revision_date = read_date(conn, Table::RevisionDate, key)?;
    qp.publication_date = read_date(conn, Table::PublicationDate, key)?;
    rp.rights = non_empty(read_values(conn, Table::Rights, key)?);

    Ok(Some(StoredRecord {
        key,
        identifier,
        version,
        queryables: qp,
        returnables: rp,
    }))
}

/// Stored XML of one representation of record `key`.
///
/// # Errors
///
/// Returns [`CatalogError::ReadFailure`] if the query fails.
pub fn representation(
    conn: &Connection,
    key: i64,
    level: DetailLevel,
    encoding: Encoding,
) -> Result<Option<String>> {
    let name = Table::representation(level).name();
    conn.query_row(
        &format!("SELECT data FROM {name} WHERE fk_datasets = ?1 AND format = ?2"),
        params![key, encoding.code()],
        |row| row.get(0),
    )
    .optional()
    .map_err(CatalogError::read(name))
}

/// Row ids of every stored representation of record `key`, by level then
/// encoding.
///
/// # Errors
///
/// Returns [`CatalogError::ReadFailure`] if a query fails.
pub fn representation_ids(conn: &Connection, key: i64) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(6);
    for level in DetailLevel::ALL {
        let name = Table::representation(level).name();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT id FROM {name} WHERE fk_datasets = ?1 ORDER BY format"
            ))
            .map_err(CatalogError::read(name))?;
        let rows = stmt
            .query_map(params![key], |row| row.get(0))
            .map_err(CatalogError::read(name))?;
        for id in rows {
            ids.push(id.map_err(CatalogError::read(name))?);
        }
    }
    Ok(ids)
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn first<T>(values: Vec<T>) -> Option<T> {
    values.into_iter().next()
}

fn read_values<T: FromSql>(conn: &Connection, table: Table, key: i64) -> Result<Vec<T>> {
    let name = table.name();
    let column = table.value_column().ok_or_else(|| CatalogError::ReadFailure {
        table: name,
        source: rusqlite::Error::InvalidColumnName(name.to_string()),
    })?;
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {column} FROM {name} WHERE fk_datasets = ?1 ORDER BY id"
        ))
        .map_err(CatalogError::read(name))?;
    let rows = stmt
        .query_map(params![key], |row| row.get(0))
        .map_err(CatalogError::read(name))?;
    rows.collect::<std::result::Result<Vec<T>, _>>()
        .map_err(CatalogError::read(name))
}

fn read_keywords(conn: &Connection, key: i64) -> Result<Vec<Keyword>> {
    let name = Table::Keyword.name();
    let mut stmt = conn
        .prepare_cached(
            "SELECT keywordgroup, keywordtype, keyword, thesaurus FROM isoqp_keyword
             WHERE fk_datasets = ?1 ORDER BY keywordgroup, id",
        )
        .map_err(CatalogError::read(name))?;
    let rows = stmt
        .query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map_err(CatalogError::read(name))?;

    let mut groups: Vec<(i64, Keyword)> = Vec::new();
    for row in rows {
        let (group, keyword_type, term, thesaurus) = row.map_err(CatalogError::read(name))?;
        if groups.last().map(|(g, _)| *g) != Some(group) {
            groups.push((
                group,
                Keyword {
                    keyword_type,
                    terms: Vec::new(),
                    thesaurus,
                },
            ));
        }
        if let (Some(term), Some((_, keyword))) = (term, groups.last_mut()) {
            keyword.terms.push(term);
        }
    }
    Ok(groups.into_iter().map(|(_, k)| k).collect())
}

fn read_formats(conn: &Connection, key: i64) -> Result<Vec<Format>> {
    let name = Table::Format.name();
    let mut stmt = conn
        .prepare_cached(
            "SELECT format, version FROM isoqp_format WHERE fk_datasets = ?1 ORDER BY id",
        )
        .map_err(CatalogError::read(name))?;
    let rows = stmt
        .query_map(params![key], |row| {
            Ok(Format {
                name: row.get(0)?,
                version: row.get(1)?,
            })
        })
        .map_err(CatalogError::read(name))?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(CatalogError::read(name))
}

fn read_bounding_box(conn: &Connection, key: i64) -> Result<Option<BoundingBox>> {
    conn.query_row(
        "SELECT westbound, eastbound, southbound, northbound FROM isoqp_boundingbox
         WHERE fk_datasets = ?1 ORDER BY id LIMIT 1",
        params![key],
        |row| Ok(BoundingBox::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )
    .optional()
    .map_err(CatalogError::read(Table::BoundingBox.name()))
}

pub(crate) fn read_crs(conn: &Connection, key: i64) -> Result<Option<CrsReference>> {
    conn.query_row(
        "SELECT authority, id_crs, version FROM isoqp_crs
         WHERE fk_datasets = ?1 ORDER BY id LIMIT 1",
        params![key],
        |row| {
            Ok(CrsReference {
                authority: row.get(0)?,
                code: row.get(1)?,
                version: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(CatalogError::read(Table::Crs.name()))
}

fn read_date(conn: &Connection, table: Table, key: i64) -> Result<Option<MetadataDate>> {
    let values: Vec<Option<String>> = read_values(conn, table, key)?;
    Ok(first(values).map(|v| MetadataDate::from_sql(v.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_record_str;
    use crate::store::{create_schema, RecordStore};

    const LAKE_SURVEY: &str = include_str!("../../tests/data/lake_survey.xml");

    #[test]
    fn test_load_missing_key() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        assert_eq!(load_record(&conn, 99).unwrap(), None);
        assert!(representation_ids(&conn, 99).unwrap().is_empty());
        assert_eq!(
            representation(&conn, 99, DetailLevel::Brief, Encoding::Native).unwrap(),
            None
        );
    }

    #[test]
    fn test_load_reconstructs_parsed_properties() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let record = parse_record_str(LAKE_SURVEY).unwrap();
        let key = RecordStore::new(&mut conn).insert(&record).unwrap().key;

        let stored = load_record(&conn, key).unwrap().unwrap();
        assert_eq!(stored.identifier, "lake-survey-2020");
        assert_eq!(stored.version, 1);
        assert_eq!(stored.queryables, record.queryables);
        assert_eq!(stored.returnables, record.returnables);
    }

    #[test]
    fn test_empty_keyword_group_survives() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let mut record = parse_record_str(LAKE_SURVEY).unwrap();
        record.queryables.keywords = Some(vec![
            Keyword::default().with_type("place"),
            Keyword::new(["lake"]),
        ]);
        let key = RecordStore::new(&mut conn).insert(&record).unwrap().key;

        let stored = load_record(&conn, key).unwrap().unwrap();
        assert_eq!(stored.queryables.keywords, record.queryables.keywords);
    }

    #[test]
    fn test_representation_ids_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let record = parse_record_str(LAKE_SURVEY).unwrap();
        let outcome = RecordStore::new(&mut conn).insert(&record).unwrap();
        assert_eq!(representation_ids(&conn, outcome.key).unwrap(), outcome.representation_ids);
        // each representation table has its own key space
        assert_eq!(outcome.representation_ids, vec![1, 2, 1, 2, 1, 2]);
    }
}
