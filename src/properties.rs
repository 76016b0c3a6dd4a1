//! In-memory Property Model for one catalogue record.
//!
//! [`QueryableProperties`] holds the attributes used as search predicates and
//! [`ReturnableProperties`] the presentation-only ones. Every facet is an
//! explicit `Option`: `None` means the facet was absent from the source
//! document, while `Some(vec![])` means it was present but empty. Updates
//! rely on this distinction: an absent facet leaves the stored rows
//! untouched, a present one replaces them.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

/// Text used for a date that is absent or could not be parsed.
pub const UNSET_DATE: &str = "0000-00-00";

/// A metadata date with an explicit "unset" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataDate {
    /// Absent or unparseable in the source document
    #[default]
    Unset,
    /// Calendar date without time
    Date(NaiveDate),
    /// Date and time (offsets are normalized to UTC)
    DateTime(NaiveDateTime),
}

impl MetadataDate {
    /// Parse `YYYY-MM-DD` or an ISO 8601 date-time.
    ///
    /// Returns `None` when the text matches neither form; callers substitute
    /// [`MetadataDate::Unset`] and record a parse issue.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text == UNSET_DATE {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(MetadataDate::Date(date));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(MetadataDate::DateTime(dt.naive_utc()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(MetadataDate::DateTime(dt));
        }
        None
    }

    /// Whether this is the sentinel.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, MetadataDate::Unset)
    }

    /// Storage form: `None` for the sentinel, ISO text otherwise.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        match self {
            MetadataDate::Unset => None,
            _ => Some(self.to_string()),
        }
    }

    /// Inverse of [`MetadataDate::to_sql`].
    #[must_use]
    pub fn from_sql(value: Option<&str>) -> Self {
        value.and_then(MetadataDate::parse).unwrap_or_default()
    }
}

impl fmt::Display for MetadataDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataDate::Unset => f.write_str(UNSET_DATE),
            MetadataDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            MetadataDate::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// One keyword group: a type code, its terms and the thesaurus they come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyword {
    /// Keyword type code (e.g. `theme`, `place`)
    pub keyword_type: Option<String>,
    /// Terms, in document order
    pub terms: Vec<String>,
    /// Thesaurus title
    pub thesaurus: Option<String>,
}

impl Keyword {
    /// Keyword group with terms only.
    #[must_use]
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Keyword {
            keyword_type: None,
            terms: terms.into_iter().map(Into::into).collect(),
            thesaurus: None,
        }
    }

    /// Builder-style type code.
    #[must_use]
    pub fn with_type(mut self, keyword_type: &str) -> Self {
        self.keyword_type = Some(keyword_type.to_string());
        self
    }

    /// Builder-style thesaurus name.
    #[must_use]
    pub fn with_thesaurus(mut self, thesaurus: &str) -> Self {
        self.thesaurus = Some(thesaurus.to_string());
        self
    }
}

/// A distribution format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    /// Format name (e.g. `GeoTIFF`)
    pub name: String,
    /// Format version
    pub version: Option<String>,
}

impl Format {
    /// Create a format.
    #[must_use]
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Format {
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }
}

/// Geographic bounding box in decimal degrees.
///
/// Coordinates missing from the source default to `0.0`; an all-zero box is
/// not a usable extent (see [`BoundingBox::is_empty_extent`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Western longitude
    pub west: f64,
    /// Eastern longitude
    pub east: f64,
    /// Southern latitude
    pub south: f64,
    /// Northern latitude
    pub north: f64,
}

impl BoundingBox {
    /// Create a box from its four edges.
    #[must_use]
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        BoundingBox {
            west,
            east,
            south,
            north,
        }
    }

    /// Whether every edge is zero, i.e. no usable extent was supplied.
    #[must_use]
    pub fn is_empty_extent(&self) -> bool {
        self.west == 0.0 && self.east == 0.0 && self.south == 0.0 && self.north == 0.0
    }
}

lazy_static! {
    static ref EPSG_URN: Regex =
        Regex::new(r"(?i)^urn:ogc:def:crs:([A-Za-z]+):([0-9.]*):([A-Za-z0-9._-]+)$").unwrap();
    static ref AUTHORITY_CODE: Regex =
        Regex::new(r"^([A-Za-z]+):([A-Za-z0-9._-]+)$").unwrap();
    static ref EPSG_HTTP: Regex =
        Regex::new(r"(?i)^https?://www\.opengis\.net/def/crs/([A-Za-z]+)/([0-9.]+)/([A-Za-z0-9._-]+)$").unwrap();
}

/// Reference to a coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrsReference {
    /// Code space / authority (e.g. `EPSG`)
    pub authority: Option<String>,
    /// Identifier within the authority (e.g. `4326`)
    pub code: String,
    /// Authority version
    pub version: Option<String>,
}

impl CrsReference {
    /// Build a reference from the `RS_Identifier` parts.
    ///
    /// When no code space is given, codes shaped like `EPSG:4326`,
    /// `urn:ogc:def:crs:EPSG::4326` or the OGC http form are split into
    /// authority and code.
    #[must_use]
    pub fn from_parts(code: &str, code_space: Option<&str>, version: Option<&str>) -> Self {
        let code = code.trim();
        let version = version.map(str::to_string).filter(|v| !v.is_empty());
        if let Some(space) = code_space.filter(|s| !s.is_empty()) {
            return CrsReference {
                authority: Some(space.to_string()),
                code: code.to_string(),
                version,
            };
        }
        if let Some(caps) = EPSG_URN
            .captures(code)
            .or_else(|| EPSG_HTTP.captures(code))
        {
            let urn_version = caps.get(2).map(|m| m.as_str()).filter(|v| !v.is_empty());
            return CrsReference {
                authority: Some(caps[1].to_uppercase()),
                code: caps[3].to_string(),
                version: version.or_else(|| urn_version.map(str::to_string)),
            };
        }
        if let Some(caps) = AUTHORITY_CODE.captures(code) {
            return CrsReference {
                authority: Some(caps[1].to_uppercase()),
                code: caps[2].to_string(),
                version,
            };
        }
        CrsReference {
            authority: None,
            code: code.to_string(),
            version,
        }
    }

    /// `AUTHORITY:code`, or the bare code without an authority.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.authority {
            Some(authority) => format!("{authority}:{}", self.code),
            None => self.code.clone(),
        }
    }

    /// OGC URN form (`urn:ogc:def:crs:EPSG::4326`), or the bare code without
    /// an authority.
    #[must_use]
    pub fn urn(&self) -> String {
        match &self.authority {
            Some(authority) => format!(
                "urn:ogc:def:crs:{authority}:{}:{}",
                self.version.as_deref().unwrap_or(""),
                self.code
            ),
            None => self.code.clone(),
        }
    }
}

/// Attributes usable as search predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryableProperties {
    /// Global identifier (`fileIdentifier` / `dc:identifier`)
    pub identifier: Option<String>,
    /// Titles in document order
    pub title: Option<Vec<String>>,
    /// Alternate titles
    pub alternate_title: Option<Vec<String>>,
    /// Hierarchy type code (`dataset`, `series`, `service`, ...)
    pub type_code: Option<String>,
    /// Keyword groups
    pub keywords: Option<Vec<Keyword>>,
    /// Topic category codes
    pub topic_category: Option<Vec<String>>,
    /// Distribution formats
    pub format: Option<Vec<Format>>,
    /// Abstract fragments
    pub abstract_text: Option<Vec<String>>,
    /// Geographic extent
    pub bounding_box: Option<BoundingBox>,
    /// Reference system of the resource
    pub crs: Option<CrsReference>,
    /// Organisation of the first point of contact
    pub organisation_name: Option<String>,
    /// Identifier of the described resource (not the metadata record)
    pub resource_identifier: Option<String>,
    /// Language of the described resource
    pub resource_language: Option<String>,
    /// Parent metadata record identifier
    pub parent_identifier: Option<String>,
    /// Metadata date stamp
    pub modified: MetadataDate,
    /// Citation creation date
    pub creation_date: Option<MetadataDate>,
    /// Citation revision date
    pub revision_date: Option<MetadataDate>,
    /// Citation publication date
    pub publication_date: Option<MetadataDate>,
    /// Whether security constraints are declared
    pub has_security_constraints: bool,
    /// All text content of the record
    pub any_text: Option<String>,
    /// Identifier of an aggregated resource
    pub association: Option<String>,
}

impl QueryableProperties {
    /// Every keyword term followed by every topic category, in order.
    #[must_use]
    pub fn subjects(&self) -> Vec<&str> {
        let keywords = self
            .keywords
            .iter()
            .flatten()
            .flat_map(|k| k.terms.iter().map(String::as_str));
        let topics = self.topic_category.iter().flatten().map(String::as_str);
        keywords.chain(topics).collect()
    }

    /// First title, if any.
    #[must_use]
    pub fn first_title(&self) -> Option<&str> {
        self.title
            .as_ref()
            .and_then(|t| t.first())
            .map(String::as_str)
    }
}

/// Presentation-only attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnableProperties {
    /// Originator organisation
    pub creator: Option<String>,
    /// Publisher organisation
    pub publisher: Option<String>,
    /// Author organisation
    pub contributor: Option<String>,
    /// Source of the record
    pub source: Option<String>,
    /// Access rights codes
    pub rights: Option<Vec<String>>,
    /// Metadata language
    pub language: Option<String>,
    /// Browse graphic file name
    pub graphic_overview: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parsing_forms() {
        assert_eq!(
            MetadataDate::parse("2020-03-01"),
            Some(MetadataDate::Date(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()))
        );
        let dt = MetadataDate::parse("2020-03-01T10:20:30").unwrap();
        assert_eq!(dt.to_string(), "2020-03-01T10:20:30");
        let zoned = MetadataDate::parse("2020-03-01T10:20:30+02:00").unwrap();
        assert_eq!(zoned.to_string(), "2020-03-01T08:20:30");
        assert_eq!(MetadataDate::parse("2020"), None);
        assert_eq!(MetadataDate::parse("not a date"), None);
        assert_eq!(MetadataDate::parse(UNSET_DATE), None);
    }

    #[test]
    fn test_date_sql_mapping() {
        assert_eq!(MetadataDate::Unset.to_sql(), None);
        assert_eq!(MetadataDate::Unset.to_string(), "0000-00-00");
        let date = MetadataDate::parse("2019-12-31").unwrap();
        assert_eq!(MetadataDate::from_sql(date.to_sql().as_deref()), date);
        assert!(MetadataDate::from_sql(None).is_unset());
    }

    #[test]
    fn test_empty_extent() {
        assert!(BoundingBox::default().is_empty_extent());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_empty_extent());
    }

    #[test]
    fn test_crs_forms() {
        let plain = CrsReference::from_parts("EPSG:4326", None, None);
        assert_eq!(plain.authority.as_deref(), Some("EPSG"));
        assert_eq!(plain.code, "4326");

        let urn = CrsReference::from_parts("urn:ogc:def:crs:EPSG:6.6:25832", None, None);
        assert_eq!(urn.name(), "EPSG:25832");
        assert_eq!(urn.version.as_deref(), Some("6.6"));

        let http =
            CrsReference::from_parts("http://www.opengis.net/def/crs/EPSG/0/3857", None, None);
        assert_eq!(http.name(), "EPSG:3857");

        let spaced = CrsReference::from_parts("4258", Some("EPSG"), Some("7.4"));
        assert_eq!(spaced.name(), "EPSG:4258");
        assert_eq!(spaced.version.as_deref(), Some("7.4"));

        assert_eq!(spaced.urn(), "urn:ogc:def:crs:EPSG:7.4:4258");
        assert_eq!(plain.urn(), "urn:ogc:def:crs:EPSG::4326");

        let bare = CrsReference::from_parts("WGS 84", None, None);
        assert_eq!(bare.authority, None);
        assert_eq!(bare.name(), "WGS 84");
    }

    #[test]
    fn test_subjects_union() {
        let qp = QueryableProperties {
            keywords: Some(vec![
                Keyword::new(["hydrology", "lake"]).with_type("theme"),
                Keyword::new(["Bavaria"]),
            ]),
            topic_category: Some(vec!["inlandWaters".to_string()]),
            ..Default::default()
        };
        assert_eq!(qp.subjects(), vec!["hydrology", "lake", "Bavaria", "inlandWaters"]);
    }
}
