//! Handler table for ISO 19139 `gmd:MD_Metadata` records.
//!
//! Each entry maps a direct child of `MD_Metadata` to the function that
//! extracts its contribution. The identification section carries most of the
//! searchable content.

use crate::path::PathQuery;
use crate::properties::{
    BoundingBox, CrsReference, Format, Keyword, MetadataDate, QueryableProperties,
    ReturnableProperties,
};
use crate::recovery::{ParseIssue, ParseReport};
use crate::xml::XmlElement;

use super::{read_coordinate, read_date, Contribution, HandlerEntry, Subtree};

const BBOX_PATH: &str = "gmd:extent/gmd:EX_Extent/gmd:geographicElement/gmd:EX_GeographicBoundingBox";
const SERVICE_BBOX_PATH: &str =
    "srv:extent/gmd:EX_Extent/gmd:geographicElement/gmd:EX_GeographicBoundingBox";

/// Recognized children of `gmd:MD_Metadata`.
pub static HANDLERS: &[HandlerEntry] = &[
    HandlerEntry {
        local_name: "fileIdentifier",
        retain: Some(Subtree::Identifier),
        handler: file_identifier,
    },
    HandlerEntry {
        local_name: "language",
        retain: Some(Subtree::Language),
        handler: metadata_language,
    },
    HandlerEntry {
        local_name: "characterSet",
        retain: Some(Subtree::CharacterSet),
        handler: retain_only,
    },
    HandlerEntry {
        local_name: "parentIdentifier",
        retain: Some(Subtree::ParentIdentifier),
        handler: parent_identifier,
    },
    HandlerEntry {
        local_name: "hierarchyLevel",
        retain: Some(Subtree::HierarchyLevel),
        handler: hierarchy_level,
    },
    HandlerEntry {
        local_name: "hierarchyLevelName",
        retain: Some(Subtree::HierarchyLevelName),
        handler: retain_only,
    },
    HandlerEntry {
        local_name: "dateStamp",
        retain: None,
        handler: date_stamp,
    },
    HandlerEntry {
        local_name: "metadataStandardName",
        retain: Some(Subtree::MetadataStandardName),
        handler: retain_only,
    },
    HandlerEntry {
        local_name: "metadataStandardVersion",
        retain: Some(Subtree::MetadataStandardVersion),
        handler: retain_only,
    },
    HandlerEntry {
        local_name: "referenceSystemInfo",
        retain: Some(Subtree::ReferenceSystemInfo),
        handler: reference_system_info,
    },
    HandlerEntry {
        local_name: "identificationInfo",
        retain: Some(Subtree::IdentificationInfo),
        handler: identification_info,
    },
    HandlerEntry {
        local_name: "distributionInfo",
        retain: Some(Subtree::DistributionInfo),
        handler: distribution_info,
    },
    HandlerEntry {
        local_name: "dataQualityInfo",
        retain: Some(Subtree::DataQualityInfo),
        handler: retain_only,
    },
];

/// Look up the handler entry for a child of `MD_Metadata`.
#[must_use]
pub fn dispatch(local_name: &str) -> Option<&'static HandlerEntry> {
    HANDLERS.iter().find(|entry| entry.local_name == local_name)
}

/// Content extracted from the first data or service identification section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identification {
    /// Citation titles
    pub titles: Vec<String>,
    /// Citation alternate titles
    pub alternate_titles: Vec<String>,
    /// Abstracts
    pub abstracts: Vec<String>,
    /// One group per `MD_Keywords`
    pub keywords: Vec<Keyword>,
    /// Topic category codes
    pub topic_categories: Vec<String>,
    /// First geographic bounding box, if the section has one
    pub bounding_box: Option<BoundingBox>,
    /// Organisation of the first point of contact
    pub organisation_name: Option<String>,
    /// Organisation with role `originator`
    pub creator: Option<String>,
    /// Organisation with role `publisher`
    pub publisher: Option<String>,
    /// Organisation with role `author`
    pub contributor: Option<String>,
    /// Legal access constraint codes
    pub rights: Vec<String>,
    /// Whether `MD_SecurityConstraints` is present
    pub has_security_constraints: bool,
    /// Resource language
    pub resource_language: Option<String>,
    /// Browse graphic file name
    pub graphic_overview: Option<String>,
    /// Citation identifier code
    pub resource_identifier: Option<String>,
    /// Citation date of type `creation`
    pub creation_date: Option<MetadataDate>,
    /// Citation date of type `revision`
    pub revision_date: Option<MetadataDate>,
    /// Citation date of type `publication`
    pub publication_date: Option<MetadataDate>,
    /// First aggregated data set identifier
    pub association: Option<String>,
}

impl Identification {
    /// Move the extracted content into the property model.
    ///
    /// List facets become present (possibly empty) so that an update replaces
    /// them; the bounding box stays absent when the section has none.
    pub(crate) fn apply(self, qp: &mut QueryableProperties, rp: &mut ReturnableProperties) {
        qp.title = Some(self.titles);
        qp.alternate_title = Some(self.alternate_titles);
        qp.abstract_text = Some(self.abstracts);
        qp.keywords = Some(self.keywords);
        qp.topic_category = Some(self.topic_categories);
        if self.bounding_box.is_some() {
            qp.bounding_box = self.bounding_box;
        }
        qp.organisation_name = self.organisation_name;
        qp.resource_identifier = self.resource_identifier;
        qp.resource_language = self.resource_language;
        qp.creation_date = self.creation_date;
        qp.revision_date = self.revision_date;
        qp.publication_date = self.publication_date;
        qp.has_security_constraints = self.has_security_constraints;
        qp.association = self.association;

        rp.creator = self.creator;
        rp.publisher = self.publisher;
        rp.contributor = self.contributor;
        rp.rights = Some(self.rights);
        rp.graphic_overview = self.graphic_overview;
    }
}

fn retain_only(_: &XmlElement, _: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::RetainOnly
}

fn file_identifier(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::Identifier(q.text(el, "gco:CharacterString"))
}

fn parent_identifier(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::ParentIdentifier(q.text(el, "gco:CharacterString"))
}

fn hierarchy_level(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    let code = q
        .text(el, "gmd:MD_ScopeCode/@codeListValue")
        .or_else(|| q.text(el, "gmd:MD_ScopeCode"));
    Contribution::HierarchyType(code)
}

fn date_stamp(el: &XmlElement, q: &PathQuery<'_>, report: &mut ParseReport) -> Contribution {
    Contribution::Modified(read_date(
        el,
        &["gco:DateTime", "gco:Date"],
        "modified",
        q,
        report,
    ))
}

/// `gco:CharacterString` or `gmd:LanguageCode` (attribute, then text).
fn language_code(el: &XmlElement, q: &PathQuery<'_>) -> Option<String> {
    q.text(el, "gco:CharacterString")
        .or_else(|| q.text(el, "gmd:LanguageCode/@codeListValue"))
        .or_else(|| q.text(el, "gmd:LanguageCode"))
}

fn metadata_language(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    Contribution::MetadataLanguage(language_code(el, q))
}

fn reference_system_info(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    let crs = q
        .first(
            el,
            "gmd:MD_ReferenceSystem/gmd:referenceSystemIdentifier/gmd:RS_Identifier",
        )
        .and_then(|rs| {
            let code = q.text(rs, "gmd:code/*")?;
            let space = q.text(rs, "gmd:codeSpace/*");
            let version = q.text(rs, "gmd:version/*");
            Some(CrsReference::from_parts(
                &code,
                space.as_deref(),
                version.as_deref(),
            ))
        });
    Contribution::ReferenceSystem(crs)
}

fn distribution_info(el: &XmlElement, q: &PathQuery<'_>, _: &mut ParseReport) -> Contribution {
    let formats = q
        .select(
            el,
            "gmd:MD_Distribution/gmd:distributionFormat/gmd:MD_Format",
        )
        .into_iter()
        .filter_map(|f| {
            let name = q.text(f, "gmd:name/*")?;
            Some(Format::new(&name, q.text(f, "gmd:version/*").as_deref()))
        })
        .collect();
    Contribution::Formats(formats)
}

fn read_bounding_box(el: &XmlElement, q: &PathQuery<'_>, report: &mut ParseReport) -> BoundingBox {
    BoundingBox {
        west: read_coordinate(
            el,
            "gmd:westBoundLongitude/gco:Decimal",
            "westBoundLongitude",
            q,
            report,
        ),
        east: read_coordinate(
            el,
            "gmd:eastBoundLongitude/gco:Decimal",
            "eastBoundLongitude",
            q,
            report,
        ),
        south: read_coordinate(
            el,
            "gmd:southBoundLatitude/gco:Decimal",
            "southBoundLatitude",
            q,
            report,
        ),
        north: read_coordinate(
            el,
            "gmd:northBoundLatitude/gco:Decimal",
            "northBoundLatitude",
            q,
            report,
        ),
    }
}

fn citation_dates(
    citation: &XmlElement,
    q: &PathQuery<'_>,
    report: &mut ParseReport,
    ident: &mut Identification,
) {
    for date in q.select(citation, "gmd:date/gmd:CI_Date") {
        let kind = q.text(date, "gmd:dateType/gmd:CI_DateTypeCode/@codeListValue");
        let (slot, field) = match kind.as_deref() {
            Some("creation") => (&mut ident.creation_date, "creationDate"),
            Some("revision") => (&mut ident.revision_date, "revisionDate"),
            Some("publication") => (&mut ident.publication_date, "publicationDate"),
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(read_date(
                date,
                &["gmd:date/gco:DateTime", "gmd:date/gco:Date"],
                field,
                q,
                report,
            ));
        }
    }
}

/// Extract the searchable content of an `identificationInfo` section.
///
/// Accepts either `gmd:MD_DataIdentification` or `srv:SV_ServiceIdentification`.
fn identification_info(
    el: &XmlElement,
    q: &PathQuery<'_>,
    report: &mut ParseReport,
) -> Contribution {
    let Some(di) = q
        .first(el, "gmd:MD_DataIdentification")
        .or_else(|| q.first(el, "srv:SV_ServiceIdentification"))
    else {
        report.push(ParseIssue::MissingElement {
            field: "identificationInfo",
            path: "gmd:MD_DataIdentification",
        });
        return Contribution::RetainOnly;
    };

    let mut ident = Identification::default();

    if let Some(citation) = q.first(di, "gmd:citation/gmd:CI_Citation") {
        ident.titles = q.texts(citation, "gmd:title/*");
        ident.alternate_titles = q.texts(citation, "gmd:alternateTitle/*");
        ident.resource_identifier = q.text(citation, "gmd:identifier/*/gmd:code/*");
        citation_dates(citation, q, report, &mut ident);
    } else {
        report.push(ParseIssue::MissingElement {
            field: "title",
            path: "gmd:citation/gmd:CI_Citation",
        });
    }

    ident.abstracts = q.texts(di, "gmd:abstract/*");
    ident.keywords = q
        .select(di, "gmd:descriptiveKeywords/gmd:MD_Keywords")
        .into_iter()
        .map(|group| Keyword {
            keyword_type: q.text(group, "gmd:type/gmd:MD_KeywordTypeCode/@codeListValue"),
            terms: q.texts(group, "gmd:keyword/*"),
            thesaurus: q.text(group, "gmd:thesaurusName/gmd:CI_Citation/gmd:title/*"),
        })
        .collect();
    ident.topic_categories = q.texts(di, "gmd:topicCategory/gmd:MD_TopicCategoryCode");

    match q
        .first(di, BBOX_PATH)
        .or_else(|| q.first(di, SERVICE_BBOX_PATH))
    {
        Some(bbox) => ident.bounding_box = Some(read_bounding_box(bbox, q, report)),
        None => report.push(ParseIssue::MissingElement {
            field: "boundingBox",
            path: BBOX_PATH,
        }),
    }

    let parties: Vec<(Option<String>, Option<String>)> = q
        .select(di, "gmd:pointOfContact/gmd:CI_ResponsibleParty")
        .into_iter()
        .map(|party| {
            (
                q.text(party, "gmd:organisationName/*"),
                q.text(party, "gmd:role/gmd:CI_RoleCode/@codeListValue"),
            )
        })
        .collect();
    let with_role = |role: &str| {
        parties
            .iter()
            .find(|(_, r)| r.as_deref() == Some(role))
            .and_then(|(org, _)| org.clone())
    };
    ident.organisation_name = parties.first().and_then(|(org, _)| org.clone());
    ident.creator = with_role("originator");
    ident.publisher = with_role("publisher");
    ident.contributor = with_role("author");

    ident.rights = q.texts(
        di,
        "gmd:resourceConstraints/gmd:MD_LegalConstraints/gmd:accessConstraints/gmd:MD_RestrictionCode/@codeListValue",
    );
    ident.has_security_constraints =
        q.exists(di, "gmd:resourceConstraints/gmd:MD_SecurityConstraints");
    ident.resource_language = q
        .first(di, "gmd:language")
        .and_then(|lang| language_code(lang, q));
    ident.graphic_overview = q.text(di, "gmd:graphicOverview/gmd:MD_BrowseGraphic/gmd:fileName/*");
    ident.association = q.text(
        di,
        "gmd:aggregationInfo/gmd:MD_AggregateInformation/gmd:aggregateDataSetIdentifier/*/gmd:code/*",
    );

    Contribution::Identification(Box::new(ident))
}
