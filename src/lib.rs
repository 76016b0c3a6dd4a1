#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # isocat: catalogue record normalization
//!
//! Turns ISO 19139 (`gmd:MD_Metadata`) and CSW Dublin Core (`csw:Record`)
//! metadata documents into normalized relational rows plus six pre-rendered
//! representations.
//!
//! ## Quick Start
//!
//! ```
//! use isocat::{parse_record_str, create_schema, RecordStore};
//! use rusqlite::Connection;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = Connection::open_in_memory()?;
//! create_schema(&conn)?;
//!
//! let record = parse_record_str(
//!     r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
//!                         xmlns:gco="http://www.isotc211.org/2005/gco">
//!          <gmd:fileIdentifier><gco:CharacterString>rec-1</gco:CharacterString></gmd:fileIdentifier>
//!        </gmd:MD_Metadata>"#,
//! )?;
//!
//! let mut store = RecordStore::new(&mut conn);
//! let outcome = store.insert(&record)?;
//! for field in outcome.report.defaulted_fields() {
//!     println!("defaulted: {field}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`xml`] - owned element tree, document parsing and serialization
//! - [`path`] - namespace-aware child-path queries
//! - [`parser`] - Record Parser for the ISO and Dublin Core profiles
//! - [`properties`] - Property Model
//! - [`representation`] - Representation Generator
//! - [`dublin_core`] - CSW Dublin Core encoding of a record
//! - [`store`] - schema, key allocation, Write Coordinator and read-back
//! - [`batch`] - parallel parsing of many documents
//! - [`config`] - engine configuration
//! - [`recovery`] - fields defaulted while parsing
//! - [`error`] - error types and result type

pub mod batch;
pub mod config;
pub mod dublin_core;
pub mod error;
pub mod namespaces;
pub mod parser;
pub mod path;
pub mod properties;
pub mod recovery;
pub mod representation;
pub mod store;
pub mod xml;

pub use config::{CornerOrder, EngineConfig};
pub use error::{CatalogError, Result};
pub use parser::{parse_record_str, ParsedRecord, Profile, RecordParser};
pub use properties::{
    BoundingBox, CrsReference, Format, Keyword, MetadataDate, QueryableProperties,
    ReturnableProperties,
};
pub use recovery::{ParseIssue, ParseReport};
pub use representation::{generate, DetailLevel, Encoding, RepresentationSet};
pub use store::{create_schema, RecordStore, StoredRecord, WriteOutcome};
pub use xml::{parse_document, XmlElement};
