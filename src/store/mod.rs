//! Relational persistence of parsed records.
//!
//! [`RecordStore`] borrows a caller-owned [`rusqlite::Connection`] and never
//! closes it. Each [`insert`](RecordStore::insert) or
//! [`update`](RecordStore::update) is one immediate transaction covering the
//! main row, every facet table and all six representation rows: it commits
//! on success and rolls back on every error path.
//!
//! # Examples
//!
//! ```
//! use isocat::parser::parse_record_str;
//! use isocat::representation::{DetailLevel, Encoding};
//! use isocat::store::{create_schema, RecordStore};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! create_schema(&conn)?;
//!
//! let record = parse_record_str(
//!     r#"<csw:Record xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"
//!                    xmlns:dc="http://purl.org/dc/elements/1.1/">
//!          <dc:identifier>r1</dc:identifier><dc:title>Rivers</dc:title>
//!        </csw:Record>"#,
//! )?;
//! let mut store = RecordStore::new(&mut conn);
//! let outcome = store.insert(&record)?;
//! assert_eq!(outcome.representation_ids.len(), 6);
//!
//! let brief = store.representation(outcome.key, DetailLevel::Brief, Encoding::Bibliographic)?;
//! assert!(brief.is_some_and(|xml| xml.contains("<dc:title>Rivers</dc:title>")));
//! # Ok::<(), isocat::CatalogError>(())
//! ```

pub mod keys;
pub mod reader;
pub mod schema;
pub mod writer;

use rusqlite::Connection;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::representation::{DetailLevel, Encoding};

pub use keys::{next_insert_key, resolve_key};
pub use reader::StoredRecord;
pub use schema::{create_schema, Table};
pub use writer::WriteOutcome;

/// Write Coordinator over a borrowed connection.
#[derive(Debug)]
pub struct RecordStore<'c> {
    conn: &'c mut Connection,
    config: EngineConfig,
}

impl<'c> RecordStore<'c> {
    /// Store with the default configuration.
    pub fn new(conn: &'c mut Connection) -> Self {
        Self::with_config(conn, EngineConfig::default())
    }

    /// Store generating representations according to `config`.
    pub fn with_config(conn: &'c mut Connection, config: EngineConfig) -> Self {
        RecordStore { conn, config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The borrowed connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Internal key of the record with `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ReadFailure`](crate::CatalogError::ReadFailure)
    /// if the lookup fails.
    pub fn find_key(&self, identifier: &str) -> Result<Option<i64>> {
        resolve_key(self.conn, identifier)
    }

    /// Reconstruct the stored properties of record `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ReadFailure`](crate::CatalogError::ReadFailure)
    /// if any query fails.
    pub fn load_record(&self, key: i64) -> Result<Option<StoredRecord>> {
        reader::load_record(self.conn, key)
    }

    /// Stored representation of record `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ReadFailure`](crate::CatalogError::ReadFailure)
    /// if the query fails.
    pub fn representation(
        &self,
        key: i64,
        level: DetailLevel,
        encoding: Encoding,
    ) -> Result<Option<String>> {
        reader::representation(self.conn, key, level, encoding)
    }

    /// Row ids of the representations of record `key`, by level then encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ReadFailure`](crate::CatalogError::ReadFailure)
    /// if a query fails.
    pub fn representation_ids(&self, key: i64) -> Result<Vec<i64>> {
        reader::representation_ids(self.conn, key)
    }
}
