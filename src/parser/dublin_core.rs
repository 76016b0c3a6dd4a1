//! Handler table for CSW Dublin Core records.
//!
//! `csw:Record`, `csw:SummaryRecord` and `csw:BriefRecord` are flat: every
//! child is one `dc:`, `dct:` or `ows:` element carrying a single value, so
//! most handlers contribute exactly one value. All `dc:subject` terms are
//! collected into a single keyword group.
//!
//! `ows:LowerCorner` / `ows:UpperCorner` are read in the OWS convention
//! (west/south, east/north) regardless of the corner order configured for
//! output.

use crate::path::PathQuery;
use crate::properties::{BoundingBox, CrsReference, Format};
use crate::recovery::{ParseIssue, ParseReport};
use crate::xml::XmlElement;

use super::{read_date, Contribution, HandlerEntry};

/// Recognized children of a CSW record.
pub static HANDLERS: &[HandlerEntry] = &[
    HandlerEntry {
        local_name: "identifier",
        retain: None,
        handler: identifier,
    },
    HandlerEntry {
        local_name: "title",
        retain: None,
        handler: title,
    },
    HandlerEntry {
        local_name: "alternative",
        retain: None,
        handler: alternative,
    },
    HandlerEntry {
        local_name: "type",
        retain: None,
        handler: record_type,
    },
    HandlerEntry {
        local_name: "subject",
        retain: None,
        handler: subject,
    },
    HandlerEntry {
        local_name: "format",
        retain: None,
        handler: format,
    },
    HandlerEntry {
        local_name: "modified",
        retain: None,
        handler: modified,
    },
    HandlerEntry {
        local_name: "abstract",
        retain: None,
        handler: abstract_text,
    },
    HandlerEntry {
        local_name: "description",
        retain: None,
        handler: abstract_text,
    },
    HandlerEntry {
        local_name: "creator",
        retain: None,
        handler: creator,
    },
    HandlerEntry {
        local_name: "publisher",
        retain: None,
        handler: publisher,
    },
    HandlerEntry {
        local_name: "contributor",
        retain: None,
        handler: contributor,
    },
    HandlerEntry {
        local_name: "source",
        retain: None,
        handler: source,
    },
    HandlerEntry {
        local_name: "language",
        retain: None,
        handler: language,
    },
    HandlerEntry {
        local_name: "rights",
        retain: None,
        handler: rights,
    },
    HandlerEntry {
        local_name: "accessRights",
        retain: None,
        handler: rights,
    },
    HandlerEntry {
        local_name: "relation",
        retain: None,
        handler: relation,
    },
    HandlerEntry {
        local_name: "BoundingBox",
        retain: None,
        handler: bounding_box,
    },
    HandlerEntry {
        local_name: "WGS84BoundingBox",
        retain: None,
        handler: bounding_box,
    },
];

/// Look up the handler entry for a child of a CSW record.
#[must_use]
pub fn dispatch(local_name: &str) -> Option<&'static HandlerEntry> {
    HANDLERS.iter().find(|entry| entry.local_name == local_name)
}

/// Wrap the element's text, or contribute nothing when it is empty.
fn value(el: &XmlElement, wrap: fn(String) -> Contribution) -> Contribution {
    el.text().map_or(Contribution::RetainOnly, wrap)
}

fn identifier(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::Identifier(el.text())
}

fn title(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Title)
}

fn alternative(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::AlternateTitle)
}

fn record_type(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::HierarchyType(el.text())
}

fn subject(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Subject)
}

fn format(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, |name| Contribution::Format(Format::new(&name, None)))
}

fn modified(el: &XmlElement, q: &PathQuery<'_>, report: &mut ParseReport) -> Contribution {
    Contribution::Modified(read_date(el, &["."], "modified", q, report))
}

fn abstract_text(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Abstract)
}

fn creator(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Creator)
}

fn publisher(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Publisher)
}

fn contributor(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Contributor)
}

fn source(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Source)
}

fn language(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::MetadataLanguage(el.text())
}

fn rights(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Rights)
}

fn relation(el: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    value(el, Contribution::Association)
}

fn corner(
    el: &XmlElement,
    path: &str,
    fields: (&'static str, &'static str),
    q: &PathQuery<'_>,
    report: &mut ParseReport,
) -> (f64, f64) {
    let Some(text) = q.text(el, path) else {
        report.push(ParseIssue::MissingCoordinate { field: fields.0 });
        report.push(ParseIssue::MissingCoordinate { field: fields.1 });
        return (0.0, 0.0);
    };
    let mut parts = text.split_whitespace();
    let mut next = |field: &'static str| match parts.next() {
        None => {
            report.push(ParseIssue::MissingCoordinate { field });
            0.0
        },
        Some(raw) => raw.parse::<f64>().unwrap_or_else(|_| {
            report.push(ParseIssue::InvalidCoordinate {
                field,
                raw: raw.to_string(),
            });
            0.0
        }),
    };
    let x = next(fields.0);
    let y = next(fields.1);
    (x, y)
}

fn bounding_box(el: &XmlElement, q: &PathQuery<'_>, report: &mut ParseReport) -> Contribution {
    let (west, south) = corner(
        el,
        "ows:LowerCorner",
        ("westBoundLongitude", "southBoundLatitude"),
        q,
        report,
    );
    let (east, north) = corner(
        el,
        "ows:UpperCorner",
        ("eastBoundLongitude", "northBoundLatitude"),
        q,
        report,
    );
    let crs = match el.attribute("crs") {
        Some(crs) => CrsReference::from_parts(crs, None, None),
        None => CrsReference::from_parts("EPSG:4326", None, None),
    };
    Contribution::Extent(BoundingBox::new(west, east, south, north), Some(crs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;
    use crate::parser::{parse_record_str, Profile, Subtree};
    use crate::properties::Keyword;
    use crate::xml::parse_document;

    const DC_RECORD: &str = include_str!("../../tests/data/dc_record.xml");

    #[test]
    fn test_record_properties() {
        let record = parse_record_str(DC_RECORD).unwrap();
        assert_eq!(record.profile, Profile::DublinCore);
        assert!(record.report.is_clean(), "{:?}", record.report);

        let qp = &record.queryables;
        assert_eq!(qp.identifier.as_deref(), Some("river-gauges"));
        assert_eq!(qp.first_title(), Some("River Gauges"));
        assert_eq!(qp.type_code.as_deref(), Some("dataset"));
        assert_eq!(qp.keywords, Some(vec![Keyword::new(["hydrology", "gauges"])]));
        assert_eq!(qp.format, Some(vec![Format::new("text/csv", None)]));
        assert_eq!(qp.modified.to_string(), "2022-07-14");
        assert_eq!(
            qp.abstract_text,
            Some(vec!["Daily water levels from river gauges.".to_string()])
        );
        assert_eq!(qp.bounding_box, Some(BoundingBox::new(5.5, 15.0, 47.0, 55.0)));
        assert_eq!(qp.crs.as_ref().map(CrsReference::name).as_deref(), Some("EPSG:4326"));
        assert_eq!(qp.association.as_deref(), Some("river-network"));
        assert_eq!(qp.resource_language.as_deref(), Some("en"));

        let rp = &record.returnables;
        assert_eq!(rp.creator.as_deref(), Some("Hydrological Service"));
        assert_eq!(rp.publisher.as_deref(), Some("Open Data Portal"));
        assert_eq!(rp.rights, Some(vec!["CC-BY-4.0".to_string()]));
        assert_eq!(rp.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_native_shell_is_synthesized() {
        let record = parse_record_str(DC_RECORD).unwrap();
        let ids = record.retained.get(Subtree::Identifier);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].text_content(), "river-gauges");
        let level = &record.retained.get(Subtree::HierarchyLevel)[0];
        assert!(level.to_xml_string().contains(r#"codeListValue="dataset""#));
        assert!(!record.retained.contains(Subtree::IdentificationInfo));
    }

    #[test]
    fn test_absent_subjects_stay_absent() {
        let record = parse_record_str(
            r#"<csw:BriefRecord xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:identifier>x</dc:identifier>
  <dc:title>X</dc:title>
</csw:BriefRecord>"#,
        )
        .unwrap();
        assert_eq!(record.queryables.keywords, None);
        assert_eq!(record.queryables.bounding_box, None);
        assert_eq!(record.report.defaulted_fields(), vec!["modified"]);
    }

    #[test]
    fn test_bad_corner_defaults() {
        let el = parse_document(
            r#"<ows:BoundingBox xmlns:ows="http://www.opengis.net/ows">
  <ows:LowerCorner>1.0</ows:LowerCorner>
  <ows:UpperCorner>x 4.0</ows:UpperCorner>
</ows:BoundingBox>"#,
        )
        .unwrap();
        let ctx = NamespaceContext::default();
        let mut report = ParseReport::new();
        let c = bounding_box(&el, &PathQuery::new(&ctx), &mut report);
        let Contribution::Extent(bbox, _) = c else {
            panic!("expected extent");
        };
        assert_eq!(bbox, BoundingBox::new(1.0, 0.0, 0.0, 4.0));
        assert_eq!(
            report.defaulted_fields(),
            vec!["southBoundLatitude", "eastBoundLongitude"]
        );
    }
}
