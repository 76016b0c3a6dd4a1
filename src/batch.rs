//! Parallel record parsing using Rayon.
//!
//! Parsing a document touches no shared state, so a batch of documents is
//! parsed on Rayon's work-stealing pool with one task per document. Writes
//! are not parallelized here: every [`RecordStore`](crate::store::RecordStore)
//! call borrows its connection mutably and runs its own transaction.
//!
//! # Examples
//!
//! ```
//! use isocat::batch::parse_batch_parallel;
//!
//! let docs = [
//!     r#"<csw:Record xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"
//!                    xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:identifier>a</dc:identifier></csw:Record>"#,
//!     "<not-a-record/>",
//! ];
//! let results = parse_batch_parallel(&docs);
//! assert_eq!(results[0].as_ref().map(|r| r.identifier()).ok(), Some(Some("a")));
//! assert!(results[1].is_err());
//! ```

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::parser::{ParsedRecord, RecordParser};
use crate::xml::parse_document;

/// Parse `documents` in parallel with the default parser.
///
/// Results are returned in input order; a failing document does not affect
/// the others.
#[must_use]
pub fn parse_batch_parallel(documents: &[&str]) -> Vec<Result<ParsedRecord>> {
    parse_batch_with(&RecordParser::default(), documents)
}

/// Parse `documents` in parallel with `parser`.
///
/// Uses the global Rayon pool, which respects `RAYON_NUM_THREADS`.
#[must_use]
pub fn parse_batch_with(parser: &RecordParser, documents: &[&str]) -> Vec<Result<ParsedRecord>> {
    let results: Vec<Result<ParsedRecord>> = documents
        .par_iter()
        .map(|xml| parse_document(xml).and_then(|root| parser.parse(&root)))
        .collect();
    debug!(
        documents = documents.len(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "parsed batch"
    );
    results
}
