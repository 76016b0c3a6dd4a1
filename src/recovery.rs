//! Recoverable conditions found while reading a record.
//!
//! Metadata documents in the wild are loosely structured: dates are missing
//! or written in free text, bounding-box corners are left out. None of that
//! aborts ingestion. The parser substitutes a documented default and records
//! a [`ParseIssue`] in the record's [`ParseReport`], which travels with the
//! parsed record into every write outcome so callers can see exactly which
//! fields were defaulted.

use std::fmt;

use tracing::warn;

/// A field that was defaulted during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    /// Date text present but not a recognized date; the sentinel was used.
    UnparseableDate {
        /// Field name (e.g. `modified`)
        field: &'static str,
        /// Text found in the document
        raw: String,
    },
    /// Date element present without a value; the sentinel was used.
    MissingDate {
        /// Field name
        field: &'static str,
    },
    /// Coordinate text present but not a number; `0.0` was used.
    InvalidCoordinate {
        /// Field name (e.g. `westBoundLongitude`)
        field: &'static str,
        /// Text found in the document
        raw: String,
    },
    /// Coordinate element absent; `0.0` was used.
    MissingCoordinate {
        /// Field name
        field: &'static str,
    },
    /// An expected sub-element was not found.
    MissingElement {
        /// Field that could not be populated
        field: &'static str,
        /// Path that was looked up
        path: &'static str,
    },
}

impl ParseIssue {
    /// Name of the affected field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ParseIssue::UnparseableDate { field, .. }
            | ParseIssue::MissingDate { field }
            | ParseIssue::InvalidCoordinate { field, .. }
            | ParseIssue::MissingCoordinate { field }
            | ParseIssue::MissingElement { field, .. } => field,
        }
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIssue::UnparseableDate { field, raw } => {
                write!(f, "{field}: unparseable date '{raw}', using sentinel")
            },
            ParseIssue::MissingDate { field } => {
                write!(f, "{field}: no date value, using sentinel")
            },
            ParseIssue::InvalidCoordinate { field, raw } => {
                write!(f, "{field}: invalid coordinate '{raw}', using 0.0")
            },
            ParseIssue::MissingCoordinate { field } => write!(f, "{field}: missing, using 0.0"),
            ParseIssue::MissingElement { field, path } => {
                write!(f, "{field}: expected element {path} not found")
            },
        }
    }
}

/// Ordered collection of the issues met while parsing one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    issues: Vec<ParseIssue>,
}

impl ParseReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue.
    pub fn push(&mut self, issue: ParseIssue) {
        warn!(field = issue.field(), "{issue}");
        self.issues.push(issue);
    }

    /// Whether no field was defaulted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// All issues in the order they were found.
    #[must_use]
    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    /// Distinct names of the defaulted fields, in first-seen order.
    #[must_use]
    pub fn defaulted_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        for issue in &self.issues {
            let field = issue.field();
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}
