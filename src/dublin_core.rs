//! Bibliographic (CSW Dublin Core) encoding of catalogue records.
//!
//! This module maps the Property Model onto the Dublin Core elements used by
//! CSW 2.0.2 and builds the `csw:BriefRecord`, `csw:SummaryRecord` and
//! `csw:Record` elements:
//!
//! | Level   | Elements                                                        |
//! |---------|-----------------------------------------------------------------|
//! | brief   | `dc:identifier`, first `dc:title`, `dc:type`                    |
//! | summary | brief + `dc:subject`, `dc:format`, `dct:modified`, `dct:abstract` |
//! | full    | summary + `dc:creator`, `dc:publisher`, `dc:contributor`, `dc:source`, `dc:language`, `dc:relation`, `dc:rights` |
//!
//! Every level ends with an `ows:BoundingBox` when the record has a usable
//! extent. Which edges go into the lower and upper corners is set by
//! [`CornerOrder`].
//!
//! # API Patterns
//!
//! - **Intermediate struct**: [`DublinCoreRecord::from_properties`] gives
//!   programmatic access to the mapped values
//! - **Element tree**: [`DublinCoreRecord::to_element`] builds the CSW element
//!   for one detail level
//!
//! # Examples
//!
//! ```
//! use isocat::config::CornerOrder;
//! use isocat::dublin_core::DublinCoreRecord;
//! use isocat::parser::parse_record_str;
//! use isocat::representation::DetailLevel;
//!
//! let record = parse_record_str(
//!     r#"<csw:Record xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"
//!                    xmlns:dc="http://purl.org/dc/elements/1.1/">
//!          <dc:identifier>r1</dc:identifier><dc:title>Rivers</dc:title>
//!        </csw:Record>"#,
//! )?;
//! let dc = DublinCoreRecord::from_properties(&record.queryables, &record.returnables);
//! assert_eq!(dc.title, vec!["Rivers"]);
//!
//! let brief = dc.to_element(DetailLevel::Brief, CornerOrder::Legacy).to_xml_string();
//! assert!(brief.starts_with("<csw:BriefRecord"));
//! # Ok::<(), isocat::CatalogError>(())
//! ```

use crate::config::CornerOrder;
use crate::namespaces::{NamespaceContext, CSW, DC, DCT, OWS};
use crate::properties::{BoundingBox, CrsReference, QueryableProperties, ReturnableProperties};
use crate::representation::DetailLevel;
use crate::xml::XmlElement;

/// Dublin Core view of one catalogue record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DublinCoreRecord {
    /// dc:identifier - Global identifier of the record
    pub identifier: Option<String>,
    /// dc:title - Titles of the resource
    pub title: Vec<String>,
    /// dc:type - Hierarchy type code
    pub dc_type: Option<String>,
    /// dc:subject - Keyword terms followed by topic categories
    pub subject: Vec<String>,
    /// dc:format - Distribution format names
    pub format: Vec<String>,
    /// dct:modified - Metadata date stamp, absent when unset
    pub modified: Option<String>,
    /// dct:abstract - Abstracts
    pub abstract_text: Vec<String>,
    /// dc:creator - Originator
    pub creator: Option<String>,
    /// dc:publisher - Publisher
    pub publisher: Option<String>,
    /// dc:contributor - Author
    pub contributor: Option<String>,
    /// dc:source - Source
    pub source: Option<String>,
    /// dc:language - Metadata language
    pub language: Option<String>,
    /// dc:relation - Aggregated resource
    pub relation: Option<String>,
    /// dc:rights - Access constraint codes
    pub rights: Vec<String>,
    /// ows:BoundingBox - Extent, absent when unusable
    pub bounding_box: Option<BoundingBox>,
    /// Reference system written as the `crs` attribute of the bounding box
    pub crs: Option<CrsReference>,
}

impl DublinCoreRecord {
    /// Map queryable and returnable properties onto Dublin Core.
    #[must_use]
    pub fn from_properties(qp: &QueryableProperties, rp: &ReturnableProperties) -> Self {
        DublinCoreRecord {
            identifier: qp.identifier.clone(),
            title: qp.title.clone().unwrap_or_default(),
            dc_type: qp.type_code.clone(),
            subject: qp.subjects().into_iter().map(str::to_string).collect(),
            format: qp
                .format
                .iter()
                .flatten()
                .map(|f| f.name.clone())
                .collect(),
            modified: (!qp.modified.is_unset()).then(|| qp.modified.to_string()),
            abstract_text: qp.abstract_text.clone().unwrap_or_default(),
            creator: rp.creator.clone(),
            publisher: rp.publisher.clone(),
            contributor: rp.contributor.clone(),
            source: rp.source.clone(),
            language: rp.language.clone(),
            relation: qp.association.clone(),
            rights: rp.rights.clone().unwrap_or_default(),
            bounding_box: qp.bounding_box.filter(|b| !b.is_empty_extent()),
            crs: qp.crs.clone(),
        }
    }

    /// Build the CSW element for `level`.
    #[must_use]
    pub fn to_element(&self, level: DetailLevel, corners: CornerOrder) -> XmlElement {
        let root_name = match level {
            DetailLevel::Brief => "csw:BriefRecord",
            DetailLevel::Summary => "csw:SummaryRecord",
            DetailLevel::Full => "csw:Record",
        };
        let mut root = XmlElement::new(root_name, Some(CSW));
        for (name, uri) in NamespaceContext::default().declarations(&["csw", "dc", "dct", "ows"]) {
            root.set_attribute(&name, &uri);
        }

        write_elements(&mut root, "dc:identifier", DC, self.identifier.iter());
        let titles = match level {
            DetailLevel::Brief => &self.title[..self.title.len().min(1)],
            _ => &self.title[..],
        };
        write_elements(&mut root, "dc:title", DC, titles.iter());
        write_elements(&mut root, "dc:type", DC, self.dc_type.iter());

        if level >= DetailLevel::Summary {
            write_elements(&mut root, "dc:subject", DC, self.subject.iter());
            write_elements(&mut root, "dc:format", DC, self.format.iter());
            write_elements(&mut root, "dct:modified", DCT, self.modified.iter());
            write_elements(&mut root, "dct:abstract", DCT, self.abstract_text.iter());
        }

        if level == DetailLevel::Full {
            write_elements(&mut root, "dc:creator", DC, self.creator.iter());
            write_elements(&mut root, "dc:publisher", DC, self.publisher.iter());
            write_elements(&mut root, "dc:contributor", DC, self.contributor.iter());
            write_elements(&mut root, "dc:source", DC, self.source.iter());
            write_elements(&mut root, "dc:language", DC, self.language.iter());
            write_elements(&mut root, "dc:relation", DC, self.relation.iter());
            write_elements(&mut root, "dc:rights", DC, self.rights.iter());
        }

        if let Some(bbox) = &self.bounding_box {
            root.push_child(bounding_box_element(bbox, self.crs.as_ref(), corners));
        }
        root
    }
}

fn write_elements<'a>(
    root: &mut XmlElement,
    tag: &str,
    namespace: &str,
    values: impl Iterator<Item = &'a String>,
) {
    for value in values {
        root.push_child(XmlElement::new(tag, Some(namespace)).with_text(value));
    }
}

/// Coordinates keep a fractional part (`8.0`, not `8`).
fn coordinate(value: f64) -> String {
    format!("{value:?}")
}

/// `ows:BoundingBox` with corners in the configured order.
#[must_use]
pub fn bounding_box_element(
    bbox: &BoundingBox,
    crs: Option<&CrsReference>,
    corners: CornerOrder,
) -> XmlElement {
    let (lower_x, upper_x) = match corners {
        CornerOrder::Legacy => (bbox.east, bbox.west),
        CornerOrder::Conventional => (bbox.west, bbox.east),
    };
    let lower = format!("{} {}", coordinate(lower_x), coordinate(bbox.south));
    let upper = format!("{} {}", coordinate(upper_x), coordinate(bbox.north));

    let mut element = XmlElement::new("ows:BoundingBox", Some(OWS));
    if let Some(crs) = crs {
        element.set_attribute("crs", &crs.urn());
    }
    element
        .with_child(XmlElement::new("ows:LowerCorner", Some(OWS)).with_text(&lower))
        .with_child(XmlElement::new("ows:UpperCorner", Some(OWS)).with_text(&upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{Format, Keyword, MetadataDate};

    fn lake_properties() -> (QueryableProperties, ReturnableProperties) {
        let qp = QueryableProperties {
            identifier: Some("lake-survey-2020".to_string()),
            title: Some(vec!["Lake Survey 2020".to_string()]),
            type_code: Some("dataset".to_string()),
            keywords: Some(vec![Keyword::new(["hydrology", "lake"])
                .with_type("theme")
                .with_thesaurus("GEMET")]),
            topic_category: Some(vec!["inlandWaters".to_string()]),
            format: Some(vec![Format::new("GeoTIFF", Some("1.0"))]),
            abstract_text: Some(vec!["Lakes <& reservoirs>".to_string()]),
            bounding_box: Some(BoundingBox::new(8.0, 10.0, 48.0, 50.0)),
            modified: MetadataDate::parse("2021-02-03").unwrap(),
            ..Default::default()
        };
        let rp = ReturnableProperties {
            creator: Some("Institute of Limnology".to_string()),
            rights: Some(vec!["otherRestrictions".to_string()]),
            ..Default::default()
        };
        (qp, rp)
    }

    #[test]
    fn test_mapping() {
        let (qp, rp) = lake_properties();
        let dc = DublinCoreRecord::from_properties(&qp, &rp);
        assert_eq!(dc.subject, vec!["hydrology", "lake", "inlandWaters"]);
        assert_eq!(dc.format, vec!["GeoTIFF"]);
        assert_eq!(dc.modified.as_deref(), Some("2021-02-03"));
        assert_eq!(dc.creator.as_deref(), Some("Institute of Limnology"));
    }

    #[test]
    fn test_brief_contains_only_identity() {
        let (qp, rp) = lake_properties();
        let el = DublinCoreRecord::from_properties(&qp, &rp)
            .to_element(DetailLevel::Brief, CornerOrder::Legacy);
        let names: Vec<_> = el.child_elements().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["dc:identifier", "dc:title", "dc:type", "ows:BoundingBox"]
        );
    }

    #[test]
    fn test_brief_keeps_first_title_only() {
        let (mut qp, rp) = lake_properties();
        qp.title = Some(vec!["First".to_string(), "Second".to_string()]);
        let dc = DublinCoreRecord::from_properties(&qp, &rp);

        let title_texts = |level| -> Vec<String> {
            dc.to_element(level, CornerOrder::Legacy)
                .child_elements()
                .filter(|c| c.name == "dc:title")
                .filter_map(XmlElement::text)
                .collect()
        };
        assert_eq!(title_texts(DetailLevel::Brief), vec!["First"]);
        assert_eq!(title_texts(DetailLevel::Summary), vec!["First", "Second"]);
        assert_eq!(title_texts(DetailLevel::Full), vec!["First", "Second"]);
    }

    #[test]
    fn test_levels_are_nested() {
        let (qp, rp) = lake_properties();
        let dc = DublinCoreRecord::from_properties(&qp, &rp);
        let summary = dc.to_element(DetailLevel::Summary, CornerOrder::Legacy);
        let full = dc.to_element(DetailLevel::Full, CornerOrder::Legacy);
        assert_eq!(summary.name, "csw:SummaryRecord");
        assert_eq!(full.name, "csw:Record");
        for child in summary.child_elements() {
            assert!(full.child_elements().any(|c| c == child), "{}", child.name);
        }
        assert!(full.child_elements().any(|c| c.name == "dc:rights"));
        assert!(!summary.child_elements().any(|c| c.name == "dc:creator"));
    }

    #[test]
    fn test_corner_orders() {
        let bbox = BoundingBox::new(8.0, 10.0, 48.0, 50.0);
        let legacy = bounding_box_element(&bbox, None, CornerOrder::Legacy);
        assert_eq!(
            legacy.to_xml_string(),
            "<ows:BoundingBox><ows:LowerCorner>10.0 48.0</ows:LowerCorner>\
             <ows:UpperCorner>8.0 50.0</ows:UpperCorner></ows:BoundingBox>"
        );
        let conventional = bounding_box_element(&bbox, None, CornerOrder::Conventional);
        let texts: Vec<_> = conventional
            .child_elements()
            .filter_map(XmlElement::text)
            .collect();
        assert_eq!(texts, vec!["8.0 48.0", "10.0 50.0"]);
    }

    #[test]
    fn test_empty_extent_is_omitted() {
        let (mut qp, rp) = lake_properties();
        qp.bounding_box = Some(BoundingBox::default());
        let el = DublinCoreRecord::from_properties(&qp, &rp)
            .to_element(DetailLevel::Full, CornerOrder::Legacy);
        assert!(!el.child_elements().any(|c| c.local_name == "BoundingBox"));
    }

    #[test]
    fn test_xml_escaping() {
        let (qp, rp) = lake_properties();
        let xml = DublinCoreRecord::from_properties(&qp, &rp)
            .to_element(DetailLevel::Summary, CornerOrder::Legacy)
            .to_xml_string();
        assert!(xml.contains("Lakes &lt;&amp; reservoirs&gt;"));
    }
}
