//! Record Parser: from a metadata element tree to the Property Model.
//!
//! [`RecordParser::parse`] detects the profile from the root element, then
//! walks the root's direct children exactly once. Each child is looked up by
//! local name in the profile's handler table ([`iso::HANDLERS`] or
//! [`dublin_core::HANDLERS`]); the matching handler turns the element into a
//! typed [`Contribution`], which is then applied to the properties.
//! Unrecognized elements are ignored. Table entries may also name a
//! [`Subtree`] under which the element is retained verbatim for the native
//! representations.
//!
//! Parsing never fails on content: unparseable dates and missing coordinates
//! are defaulted and reported in [`ParsedRecord::report`]. Only an
//! unsupported root element is an error.
//!
//! # Examples
//!
//! ```
//! use isocat::parser::parse_record_str;
//!
//! let record = parse_record_str(
//!     r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
//!                         xmlns:gco="http://www.isotc211.org/2005/gco">
//!          <gmd:fileIdentifier><gco:CharacterString>rec-1</gco:CharacterString></gmd:fileIdentifier>
//!          <gmd:dateStamp><gco:Date>2021-04-01</gco:Date></gmd:dateStamp>
//!        </gmd:MD_Metadata>"#,
//! )?;
//! assert_eq!(record.queryables.identifier.as_deref(), Some("rec-1"));
//! assert_eq!(record.queryables.type_code.as_deref(), Some("dataset"));
//! assert!(record.report.is_clean());
//! # Ok::<(), isocat::CatalogError>(())
//! ```

pub mod dublin_core;
pub mod iso;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{CatalogError, Result};
use crate::namespaces::{NamespaceContext, CSW, DC, DCT, GCO, GMD, OWS};
use crate::path::PathQuery;
use crate::properties::{
    BoundingBox, CrsReference, Format, Keyword, MetadataDate, QueryableProperties,
    ReturnableProperties,
};
use crate::recovery::{ParseIssue, ParseReport};
use crate::xml::{parse_document, XmlElement};

pub use iso::Identification;

/// Metadata profile of an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// ISO 19139 `gmd:MD_Metadata`
    Iso,
    /// CSW Dublin Core `csw:Record` (or its brief/summary forms)
    DublinCore,
}

impl Profile {
    /// Detect the profile of a root element.
    #[must_use]
    pub fn detect(root: &XmlElement) -> Option<Self> {
        if root.is(GMD, "MD_Metadata") {
            return Some(Profile::Iso);
        }
        match root.local_name.as_str() {
            "Record" | "SummaryRecord" | "BriefRecord"
                if root.namespace.as_deref() == Some(CSW) =>
            {
                Some(Profile::DublinCore)
            },
            _ => None,
        }
    }
}

impl Profile {
    /// Whether `child` is in one of the namespaces this profile's handlers read.
    #[must_use]
    pub fn owns(self, child: &XmlElement) -> bool {
        match (self, child.namespace.as_deref()) {
            (Profile::Iso, Some(ns)) => ns == GMD,
            (Profile::DublinCore, Some(ns)) => ns == DC || ns == DCT || ns == OWS,
            (_, None) => false,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso => write!(f, "ISO 19139"),
            Self::DublinCore => write!(f, "Dublin Core"),
        }
    }
}

/// Named sub-trees retained from the source for the native representations.
///
/// Variant order is the order in which they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subtree {
    /// `fileIdentifier`
    Identifier,
    /// `hierarchyLevel`
    HierarchyLevel,
    /// `identificationInfo`
    IdentificationInfo,
    /// `distributionInfo`
    DistributionInfo,
    /// `hierarchyLevelName`
    HierarchyLevelName,
    /// `language`
    Language,
    /// `dataQualityInfo`
    DataQualityInfo,
    /// `characterSet`
    CharacterSet,
    /// `metadataStandardName`
    MetadataStandardName,
    /// `metadataStandardVersion`
    MetadataStandardVersion,
    /// `parentIdentifier`
    ParentIdentifier,
    /// `referenceSystemInfo`
    ReferenceSystemInfo,
}

impl Subtree {
    /// Sub-trees of the brief native representation.
    pub const BRIEF: [Subtree; 3] = [
        Subtree::Identifier,
        Subtree::HierarchyLevel,
        Subtree::IdentificationInfo,
    ];

    /// Sub-trees the summary native representation adds to brief.
    pub const SUMMARY: [Subtree; 9] = [
        Subtree::DistributionInfo,
        Subtree::HierarchyLevelName,
        Subtree::Language,
        Subtree::DataQualityInfo,
        Subtree::CharacterSet,
        Subtree::MetadataStandardName,
        Subtree::MetadataStandardVersion,
        Subtree::ParentIdentifier,
        Subtree::ReferenceSystemInfo,
    ];
}

/// Source elements retained by reference to their sub-tree kind.
///
/// Some kinds repeat in valid documents (`referenceSystemInfo`,
/// `identificationInfo`, `dataQualityInfo`), so each kind holds a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedSubtrees {
    elements: BTreeMap<Subtree, Vec<XmlElement>>,
}

impl RetainedSubtrees {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `element` under `kind`, after any earlier ones.
    pub fn insert(&mut self, kind: Subtree, element: XmlElement) {
        self.elements.entry(kind).or_default().push(element);
    }

    /// Elements retained under `kind`; empty when none.
    #[must_use]
    pub fn get(&self, kind: Subtree) -> &[XmlElement] {
        self.elements.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Whether anything was retained under `kind`.
    #[must_use]
    pub fn contains(&self, kind: Subtree) -> bool {
        !self.get(kind).is_empty()
    }

    /// Retained kinds in emission order.
    pub fn kinds(&self) -> impl Iterator<Item = Subtree> + '_ {
        self.elements.keys().copied()
    }
}

/// Everything the parser extracted from one record.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    /// Profile of the source document
    pub profile: Profile,
    /// Search attributes
    pub queryables: QueryableProperties,
    /// Presentation attributes
    pub returnables: ReturnableProperties,
    /// Sub-trees kept for the native representations
    pub retained: RetainedSubtrees,
    /// The submitted element tree, unmodified
    pub source: XmlElement,
    /// Fields defaulted while parsing
    pub report: ParseReport,
}

impl ParsedRecord {
    /// The record's global identifier, if it has one.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.queryables.identifier.as_deref()
    }
}

/// Signature shared by all element handlers.
pub type Handler = fn(&XmlElement, &PathQuery<'_>, &mut ParseReport) -> Contribution;

/// One row of a profile's handler table.
#[derive(Debug, Clone, Copy)]
pub struct HandlerEntry {
    /// Local name of the direct child element this entry handles
    pub local_name: &'static str,
    /// Sub-tree kind under which the element is retained, if any
    pub retain: Option<Subtree>,
    /// Extraction function
    pub handler: Handler,
}

/// Typed contribution of one source element to the Property Model.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    /// Nothing to extract; the element may still be retained
    RetainOnly,
    /// Global identifier
    Identifier(Option<String>),
    /// Hierarchy type code
    HierarchyType(Option<String>),
    /// Parent record identifier
    ParentIdentifier(Option<String>),
    /// Metadata date stamp
    Modified(MetadataDate),
    /// Reference system of the resource
    ReferenceSystem(Option<CrsReference>),
    /// Metadata language
    MetadataLanguage(Option<String>),
    /// Content of the identification section
    Identification(Box<Identification>),
    /// Distribution formats
    Formats(Vec<Format>),
    /// One title
    Title(String),
    /// One alternate title
    AlternateTitle(String),
    /// One subject term
    Subject(String),
    /// One format
    Format(Format),
    /// One abstract fragment
    Abstract(String),
    /// Extent with optional reference system
    Extent(BoundingBox, Option<CrsReference>),
    /// Originator
    Creator(String),
    /// Publisher
    Publisher(String),
    /// Contributor
    Contributor(String),
    /// Source
    Source(String),
    /// One access rights value
    Rights(String),
    /// Related resource identifier
    Association(String),
}

#[derive(Debug, Default)]
struct ParseState {
    queryables: QueryableProperties,
    returnables: ReturnableProperties,
    retained: RetainedSubtrees,
    report: ParseReport,
    saw_identification: bool,
    saw_reference_system: bool,
    saw_date_stamp: bool,
}

fn push_to<T>(facet: &mut Option<Vec<T>>, value: T) {
    facet.get_or_insert_with(Vec::new).push(value);
}

impl Contribution {
    fn apply(self, state: &mut ParseState) {
        let qp = &mut state.queryables;
        let rp = &mut state.returnables;
        match self {
            Contribution::RetainOnly => {},
            Contribution::Identifier(id) => {
                if qp.identifier.is_none() {
                    qp.identifier = id;
                }
            },
            Contribution::HierarchyType(code) => {
                if code.is_some() {
                    qp.type_code = code;
                }
            },
            Contribution::ParentIdentifier(id) => qp.parent_identifier = id,
            Contribution::Modified(date) => {
                state.saw_date_stamp = true;
                qp.modified = date;
            },
            Contribution::ReferenceSystem(crs) => {
                if !state.saw_reference_system {
                    state.saw_reference_system = crs.is_some();
                    qp.crs = crs;
                }
            },
            Contribution::MetadataLanguage(language) => rp.language = language,
            Contribution::Identification(ident) => {
                // Only the first identification section feeds the queryables.
                if !state.saw_identification {
                    state.saw_identification = true;
                    ident.apply(qp, rp);
                }
            },
            Contribution::Formats(formats) => qp.format = Some(formats),
            Contribution::Title(t) => push_to(&mut qp.title, t),
            Contribution::AlternateTitle(t) => push_to(&mut qp.alternate_title, t),
            Contribution::Subject(term) => {
                let groups = qp.keywords.get_or_insert_with(Vec::new);
                match groups.first_mut() {
                    Some(group) => group.terms.push(term),
                    None => groups.push(Keyword::new([term])),
                }
            },
            Contribution::Format(f) => push_to(&mut qp.format, f),
            Contribution::Abstract(a) => push_to(&mut qp.abstract_text, a),
            Contribution::Extent(bbox, crs) => {
                if qp.bounding_box.is_none() {
                    qp.bounding_box = Some(bbox);
                    if qp.crs.is_none() {
                        qp.crs = crs;
                    }
                }
            },
            Contribution::Creator(v) => rp.creator = rp.creator.take().or(Some(v)),
            Contribution::Publisher(v) => rp.publisher = rp.publisher.take().or(Some(v)),
            Contribution::Contributor(v) => rp.contributor = rp.contributor.take().or(Some(v)),
            Contribution::Source(v) => rp.source = rp.source.take().or(Some(v)),
            Contribution::Rights(v) => push_to(&mut rp.rights, v),
            Contribution::Association(v) => {
                qp.association = qp.association.take().or(Some(v));
            },
        }
    }
}

/// Parses metadata element trees into [`ParsedRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    ctx: NamespaceContext,
    config: EngineConfig,
}

impl RecordParser {
    /// Parser with the default namespace bindings and configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser using `config` for defaults.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        RecordParser {
            ctx: NamespaceContext::default(),
            config,
        }
    }

    /// Replace the namespace bindings used by path queries.
    #[must_use]
    pub fn with_namespaces(mut self, ctx: NamespaceContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Parse one record rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedRoot`] when the root element is not
    /// a supported metadata root. Content problems are never errors.
    pub fn parse(&self, root: &XmlElement) -> Result<ParsedRecord> {
        let profile = Profile::detect(root).ok_or_else(|| CatalogError::UnsupportedRoot {
            namespace: root.namespace.clone().unwrap_or_default(),
            local_name: root.local_name.clone(),
        })?;
        let dispatch = match profile {
            Profile::Iso => iso::dispatch,
            Profile::DublinCore => dublin_core::dispatch,
        };

        let query = PathQuery::new(&self.ctx);
        let mut state = ParseState::default();

        for child in root.child_elements() {
            let entry = if profile.owns(child) {
                dispatch(&child.local_name)
            } else {
                None
            };
            let Some(entry) = entry else {
                debug!(element = %child.name, "ignoring unrecognized element");
                continue;
            };
            let contribution = (entry.handler)(child, &query, &mut state.report);
            contribution.apply(&mut state);
            if let Some(kind) = entry.retain {
                state.retained.insert(kind, child.clone());
            }
        }

        Ok(self.finish(profile, root, state))
    }

    fn finish(&self, profile: Profile, root: &XmlElement, mut state: ParseState) -> ParsedRecord {
        let qp = &mut state.queryables;
        if qp.type_code.is_none() {
            qp.type_code = Some(self.config.default_hierarchy_type.clone());
        }
        if !state.saw_date_stamp {
            state.report.push(ParseIssue::MissingDate { field: "modified" });
        }
        if self.config.store_any_text {
            qp.any_text = Some(root.text_content());
        }

        if profile == Profile::DublinCore {
            if qp.resource_language.is_none() {
                qp.resource_language.clone_from(&state.returnables.language);
            }
            synthesize_native_shell(qp, &mut state.retained);
        }

        debug!(
            profile = %profile,
            identifier = qp.identifier.as_deref().unwrap_or(""),
            issues = state.report.issues().len(),
            "parsed record"
        );

        ParsedRecord {
            profile,
            queryables: state.queryables,
            returnables: state.returnables,
            retained: state.retained,
            source: root.clone(),
            report: state.report,
        }
    }
}

/// Dublin Core records carry no ISO sub-trees; build the identifier and
/// hierarchy level elements so the native brief/summary shells are populated.
fn synthesize_native_shell(qp: &QueryableProperties, retained: &mut RetainedSubtrees) {
    if let Some(id) = &qp.identifier {
        let element = XmlElement::new("gmd:fileIdentifier", Some(GMD))
            .with_child(XmlElement::new("gco:CharacterString", Some(GCO)).with_text(id));
        retained.insert(Subtree::Identifier, element);
    }
    if let Some(code) = &qp.type_code {
        let scope = XmlElement::new("gmd:MD_ScopeCode", Some(GMD))
            .with_attribute(
                "codeList",
                "http://www.isotc211.org/2005/resources/codeList.xml#MD_ScopeCode",
            )
            .with_attribute("codeListValue", code)
            .with_text(code);
        retained.insert(
            Subtree::HierarchyLevel,
            XmlElement::new("gmd:hierarchyLevel", Some(GMD)).with_child(scope),
        );
    }
}

/// Parse an XML document and then the record it contains.
///
/// # Errors
///
/// Returns [`CatalogError::MalformedXml`] or [`CatalogError::UnsupportedRoot`].
pub fn parse_record_str(xml: &str) -> Result<ParsedRecord> {
    let root = parse_document(xml)?;
    RecordParser::default().parse(&root)
}

/// Read a date from `element` at the first of `paths` that yields text.
///
/// Absent or unparseable values produce the sentinel and a parse issue.
pub(crate) fn read_date(
    element: &XmlElement,
    paths: &[&str],
    field: &'static str,
    query: &PathQuery<'_>,
    report: &mut ParseReport,
) -> MetadataDate {
    let Some(raw) = paths.iter().find_map(|p| query.text(element, p)) else {
        report.push(ParseIssue::MissingDate { field });
        return MetadataDate::Unset;
    };
    MetadataDate::parse(&raw).unwrap_or_else(|| {
        report.push(ParseIssue::UnparseableDate { field, raw });
        MetadataDate::Unset
    })
}

/// Read a coordinate at `path`, defaulting to 0.0 with a parse issue.
pub(crate) fn read_coordinate(
    element: &XmlElement,
    path: &str,
    field: &'static str,
    query: &PathQuery<'_>,
    report: &mut ParseReport,
) -> f64 {
    match query.text(element, path) {
        None => {
            report.push(ParseIssue::MissingCoordinate { field });
            0.0
        },
        Some(raw) => raw.trim().parse::<f64>().unwrap_or_else(|_| {
            report.push(ParseIssue::InvalidCoordinate { field, raw });
            0.0
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_ISO: &str = r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">
  <gmd:fileIdentifier><gco:CharacterString>abc</gco:CharacterString></gmd:fileIdentifier>
  <gmd:unknownThing><gco:CharacterString>ignored</gco:CharacterString></gmd:unknownThing>
</gmd:MD_Metadata>"#;

    #[test]
    fn test_profile_detection() {
        let iso = parse_document(MINIMAL_ISO).unwrap();
        assert_eq!(Profile::detect(&iso), Some(Profile::Iso));

        let dc = parse_document(r#"<csw:Record xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"/>"#)
            .unwrap();
        assert_eq!(Profile::detect(&dc), Some(Profile::DublinCore));

        let other = parse_document(r#"<Record xmlns="urn:elsewhere"/>"#).unwrap();
        assert_eq!(Profile::detect(&other), None);
    }

    #[test]
    fn test_unsupported_root_is_error() {
        let root = parse_document("<rss/>").unwrap();
        let err = RecordParser::new().parse(&root).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnsupportedRoot { ref local_name, .. } if local_name == "rss"
        ));
    }

    #[test]
    fn test_defaults_and_missing_date_stamp() {
        let record = parse_record_str(MINIMAL_ISO).unwrap();
        assert_eq!(record.identifier(), Some("abc"));
        assert_eq!(record.queryables.type_code.as_deref(), Some("dataset"));
        assert!(record.queryables.modified.is_unset());
        assert_eq!(record.report.defaulted_fields(), vec!["modified"]);
        assert!(record.retained.contains(Subtree::Identifier));
        assert!(!record.retained.contains(Subtree::IdentificationInfo));
        // absent sections leave facets absent, not empty
        assert_eq!(record.queryables.title, None);
        assert_eq!(record.queryables.keywords, None);
        assert_eq!(record.queryables.format, None);
    }

    #[test]
    fn test_configured_default_type() {
        let config = EngineConfig {
            default_hierarchy_type: "series".to_string(),
            store_any_text: false,
            ..EngineConfig::default()
        };
        let root = parse_document(MINIMAL_ISO).unwrap();
        let record = RecordParser::with_config(config).parse(&root).unwrap();
        assert_eq!(record.queryables.type_code.as_deref(), Some("series"));
        assert_eq!(record.queryables.any_text, None);
    }

    #[test]
    fn test_source_is_kept_unmodified() {
        let root = parse_document(MINIMAL_ISO).unwrap();
        let record = RecordParser::new().parse(&root).unwrap();
        assert_eq!(record.source, root);
    }

    #[test]
    fn test_retained_subtrees_keep_order_within_kind() {
        let mut retained = RetainedSubtrees::new();
        retained.insert(Subtree::ReferenceSystemInfo, XmlElement::new("a", None));
        retained.insert(Subtree::Identifier, XmlElement::new("b", None));
        retained.insert(Subtree::ReferenceSystemInfo, XmlElement::new("c", None));
        let names: Vec<_> = retained
            .get(Subtree::ReferenceSystemInfo)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(
            retained.kinds().collect::<Vec<_>>(),
            vec![Subtree::Identifier, Subtree::ReferenceSystemInfo]
        );
    }

    #[test]
    fn test_subject_contributions_form_one_group() {
        let mut state = ParseState::default();
        Contribution::Subject("a".to_string()).apply(&mut state);
        Contribution::Subject("b".to_string()).apply(&mut state);
        assert_eq!(
            state.queryables.keywords,
            Some(vec![Keyword::new(["a", "b"])])
        );
    }
}
