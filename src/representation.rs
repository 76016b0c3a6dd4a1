//! Representation Generator: six serialized views of one record.
//!
//! For every [`DetailLevel`] the generator produces a bibliographic encoding
//! (CSW Dublin Core, see [`crate::dublin_core`]) and a native encoding
//! (ISO 19139). Native brief and summary are `gmd:MD_Metadata` elements
//! assembled from the retained source sub-trees; native full is the
//! submitted document itself.
//!
//! Each level contains at least the elements of the level below it.
//!
//! # Examples
//!
//! ```
//! use isocat::config::EngineConfig;
//! use isocat::parser::parse_record_str;
//! use isocat::representation::{generate, DetailLevel, Encoding};
//!
//! let record = parse_record_str(
//!     r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
//!                         xmlns:gco="http://www.isotc211.org/2005/gco">
//!          <gmd:fileIdentifier><gco:CharacterString>rec-1</gco:CharacterString></gmd:fileIdentifier>
//!        </gmd:MD_Metadata>"#,
//! )?;
//! let set = generate(&record, &EngineConfig::default());
//! let brief = set.get(DetailLevel::Brief, Encoding::Bibliographic).unwrap();
//! assert!(brief.contains("<dc:identifier>rec-1</dc:identifier>"));
//! # Ok::<(), isocat::CatalogError>(())
//! ```

use std::fmt;

use tracing::debug;

use crate::config::EngineConfig;
use crate::dublin_core::{bounding_box_element, DublinCoreRecord};
use crate::namespaces::{NamespaceContext, GMD};
use crate::parser::{ParsedRecord, Subtree};
use crate::xml::XmlElement;

/// Level of detail of a representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetailLevel {
    /// Identity only
    Brief,
    /// Identity plus discovery content
    Summary,
    /// Everything
    Full,
}

impl DetailLevel {
    /// All levels, least detailed first.
    pub const ALL: [DetailLevel; 3] = [DetailLevel::Brief, DetailLevel::Summary, DetailLevel::Full];

    /// Lower-case name (`brief`, `summary`, `full`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Brief => "brief",
            DetailLevel::Summary => "summary",
            DetailLevel::Full => "full",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output vocabulary of a representation.
///
/// The discriminant is the value stored in the representation tables'
/// `format` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Encoding {
    /// CSW Dublin Core
    Bibliographic = 1,
    /// ISO 19139
    Native = 2,
}

impl Encoding {
    /// Both encodings in storage order.
    pub const ALL: [Encoding; 2] = [Encoding::Bibliographic, Encoding::Native];

    /// Storage code.
    #[must_use]
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Inverse of [`Encoding::code`].
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Encoding::Bibliographic),
            2 => Some(Encoding::Native),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Bibliographic => write!(f, "bibliographic"),
            Encoding::Native => write!(f, "native"),
        }
    }
}

/// One serialized representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    /// Detail level
    pub level: DetailLevel,
    /// Output vocabulary
    pub encoding: Encoding,
    /// Serialized XML, without declaration
    pub xml: String,
}

/// The six representations of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentationSet {
    items: Vec<Representation>,
}

impl RepresentationSet {
    /// Serialized XML for `level` in `encoding`.
    #[must_use]
    pub fn get(&self, level: DetailLevel, encoding: Encoding) -> Option<&str> {
        self.items
            .iter()
            .find(|r| r.level == level && r.encoding == encoding)
            .map(|r| r.xml.as_str())
    }

    /// All representations, by level then encoding.
    pub fn iter(&self) -> impl Iterator<Item = &Representation> {
        self.items.iter()
    }

    /// Number of representations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a RepresentationSet {
    type Item = &'a Representation;
    type IntoIter = std::slice::Iter<'a, Representation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Generate all six representations of `record`.
#[must_use]
pub fn generate(record: &ParsedRecord, config: &EngineConfig) -> RepresentationSet {
    let dc = DublinCoreRecord::from_properties(&record.queryables, &record.returnables);
    let mut items = Vec::with_capacity(6);
    for level in DetailLevel::ALL {
        items.push(Representation {
            level,
            encoding: Encoding::Bibliographic,
            xml: dc.to_element(level, config.bbox_corner_order).to_xml_string(),
        });
        let native = match level {
            DetailLevel::Full => record.source.to_xml_string(),
            _ => native_element(record, level, config).to_xml_string(),
        };
        items.push(Representation {
            level,
            encoding: Encoding::Native,
            xml: native,
        });
    }
    debug!(
        identifier = record.identifier().unwrap_or(""),
        count = items.len(),
        "generated representations"
    );
    RepresentationSet { items }
}

/// `gmd:MD_Metadata` wrapper around the retained sub-trees for `level`.
fn native_element(record: &ParsedRecord, level: DetailLevel, config: &EngineConfig) -> XmlElement {
    let mut root = XmlElement::new("gmd:MD_Metadata", Some(GMD));
    let ctx = NamespaceContext::default();
    for (name, uri) in ctx.declarations(&["gmd", "gco", "srv", "gml", "xlink"]) {
        root.set_attribute(&name, &uri);
    }
    // Declarations of the source root keep retained prefixes bound.
    for decl in record.source.namespace_declarations() {
        if root.attributes.iter().all(|a| a.name != decl.name) {
            root.attributes.push(decl.clone());
        }
    }

    let mut kinds = Subtree::BRIEF.to_vec();
    if level >= DetailLevel::Summary {
        kinds.extend(Subtree::SUMMARY);
    }
    for kind in kinds {
        for element in record.retained.get(kind) {
            root.push_child(element.clone());
        }
    }

    if config.native_bounding_box {
        if let Some(bbox) = record.queryables.bounding_box.filter(|b| !b.is_empty_extent()) {
            for (name, uri) in ctx.declarations(&["ows"]) {
                root.set_attribute(&name, &uri);
            }
            root.push_child(bounding_box_element(
                &bbox,
                record.queryables.crs.as_ref(),
                config.bbox_corner_order,
            ));
        }
    }
    root
}
