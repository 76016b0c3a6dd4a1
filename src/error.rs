//! Error types for catalogue record operations.
//!
//! This module provides the [`CatalogError`] type for all engine operations
//! and the [`Result`] convenience type.
//!
//! Recoverable conditions found while reading a record (unparseable dates,
//! missing coordinates) are not errors; they are collected in a
//! [`ParseReport`](crate::recovery::ParseReport) instead.

use thiserror::Error;

/// Error type for all catalogue engine operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The document could not be tokenized into an element tree.
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// The root element belongs to neither supported metadata profile.
    #[error("Unsupported record root: {{{namespace}}}{local_name}")]
    UnsupportedRoot {
        /// Namespace URI of the root element (empty when unbound)
        namespace: String,
        /// Local name of the root element
        local_name: String,
    },

    /// The record carries no global identifier.
    #[error("Record has no global identifier")]
    MissingIdentifier,

    /// No stored record matches the global identifier.
    #[error("No record found for identifier '{0}'")]
    NotFound(String),

    /// A record with this global identifier is already stored.
    #[error("A record with identifier '{0}' already exists")]
    DuplicateIdentifier(String),

    /// A persistence statement failed. The enclosing transaction was rolled back.
    #[error("Write failed on table {table}: {source}")]
    WriteFailure {
        /// Table the failing statement targeted
        table: &'static str,
        /// Backend error
        #[source]
        source: rusqlite::Error,
    },

    /// Reading stored rows back failed.
    #[error("Read failed on table {table}: {source}")]
    ReadFailure {
        /// Table the failing query targeted
        table: &'static str,
        /// Backend error
        #[source]
        source: rusqlite::Error,
    },

    /// Engine configuration could not be decoded.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CatalogError {
    /// Wraps a backend error raised while writing `table`.
    pub(crate) fn write(table: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| CatalogError::WriteFailure { table, source }
    }

    /// Wraps a backend error raised while reading `table`.
    pub(crate) fn read(table: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| CatalogError::ReadFailure { table, source }
    }

    /// Whether the caller may assume nothing was persisted.
    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, CatalogError::WriteFailure { .. })
    }
}

/// Convenience type alias for [`std::result::Result`] with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
