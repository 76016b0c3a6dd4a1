//! Common test helpers and utilities shared across the test suite.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::sync::Once;

use isocat::store::{create_schema, Table};
use isocat::{parse_record_str, ParsedRecord};
use rusqlite::Connection;

static TRACING: Once = Once::new();

/// Route engine events to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Contents of a document under `tests/data`.
pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {path}: {e}"))
}

/// The Lake Survey 2020 ISO record, parsed.
pub fn lake_survey() -> ParsedRecord {
    parse_record_str(&fixture("lake_survey.xml")).expect("lake survey parses")
}

/// The River Gauges Dublin Core record, parsed.
pub fn river_gauges() -> ParsedRecord {
    parse_record_str(&fixture("dc_record.xml")).expect("river gauges parses")
}

/// In-memory database with the catalogue schema.
pub fn memory_db() -> Connection {
    init_tracing();
    let conn = Connection::open_in_memory().expect("open in-memory database");
    create_schema(&conn).expect("create schema");
    conn
}

/// Number of rows in `table`.
pub fn count_rows(conn: &Connection, table: Table) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| {
        row.get(0)
    })
    .expect("count rows")
}

/// Row counts of every table, in [`Table::ALL`] order.
pub fn all_counts(conn: &Connection) -> Vec<i64> {
    Table::ALL.iter().map(|t| count_rows(conn, *t)).collect()
}

/// Builder for small ISO 19139 documents.
///
/// A section is only emitted when it was configured, so tests can leave
/// facets absent on purpose.
#[derive(Debug, Clone, Default)]
pub struct IsoDoc {
    pub identifier: String,
    pub date_stamp: Option<String>,
    pub titles: Option<Vec<String>>,
    pub keywords: Vec<String>,
    pub rights: Vec<String>,
    pub bbox: Option<[f64; 4]>,
    pub formats: Option<Vec<(String, Option<String>)>>,
}

impl IsoDoc {
    pub fn new(identifier: &str) -> Self {
        IsoDoc {
            identifier: identifier.to_string(),
            date_stamp: Some("2023-01-15".to_string()),
            ..IsoDoc::default()
        }
    }

    pub fn titles(mut self, titles: &[&str]) -> Self {
        self.titles = Some(titles.iter().map(|t| (*t).to_string()).collect());
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| (*k).to_string()).collect();
        self
    }

    pub fn rights(mut self, codes: &[&str]) -> Self {
        self.rights = codes.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn bbox(mut self, west: f64, east: f64, south: f64, north: f64) -> Self {
        self.bbox = Some([west, east, south, north]);
        self
    }

    pub fn formats(mut self, formats: &[(&str, Option<&str>)]) -> Self {
        self.formats = Some(
            formats
                .iter()
                .map(|(n, v)| ((*n).to_string(), v.map(str::to_string)))
                .collect(),
        );
        self
    }

    pub fn without_date_stamp(mut self) -> Self {
        self.date_stamp = None;
        self
    }

    fn string(out: &mut String, element: &str, value: &str) {
        let _ = write!(
            out,
            "<gmd:{element}><gco:CharacterString>{value}</gco:CharacterString></gmd:{element}>"
        );
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">"#,
        );
        Self::string(&mut out, "fileIdentifier", &self.identifier);
        out.push_str(
            r#"<gmd:hierarchyLevel><gmd:MD_ScopeCode codeListValue="dataset">dataset</gmd:MD_ScopeCode></gmd:hierarchyLevel>"#,
        );
        if let Some(stamp) = &self.date_stamp {
            let _ = write!(out, "<gmd:dateStamp><gco:Date>{stamp}</gco:Date></gmd:dateStamp>");
        }

        if let Some(titles) = &self.titles {
            out.push_str("<gmd:identificationInfo><gmd:MD_DataIdentification>");
            out.push_str("<gmd:citation><gmd:CI_Citation>");
            for title in titles {
                Self::string(&mut out, "title", title);
            }
            out.push_str("</gmd:CI_Citation></gmd:citation>");
            Self::string(&mut out, "abstract", "Generated test record");
            if !self.keywords.is_empty() {
                out.push_str("<gmd:descriptiveKeywords><gmd:MD_Keywords>");
                for keyword in &self.keywords {
                    Self::string(&mut out, "keyword", keyword);
                }
                out.push_str("</gmd:MD_Keywords></gmd:descriptiveKeywords>");
            }
            if !self.rights.is_empty() {
                out.push_str("<gmd:resourceConstraints><gmd:MD_LegalConstraints>");
                for code in &self.rights {
                    let _ = write!(
                        out,
                        r#"<gmd:accessConstraints><gmd:MD_RestrictionCode codeListValue="{code}">{code}</gmd:MD_RestrictionCode></gmd:accessConstraints>"#
                    );
                }
                out.push_str("</gmd:MD_LegalConstraints></gmd:resourceConstraints>");
            }
            if let Some([west, east, south, north]) = self.bbox {
                let _ = write!(
                    out,
                    "<gmd:extent><gmd:EX_Extent><gmd:geographicElement><gmd:EX_GeographicBoundingBox>\
                     <gmd:westBoundLongitude><gco:Decimal>{west}</gco:Decimal></gmd:westBoundLongitude>\
                     <gmd:eastBoundLongitude><gco:Decimal>{east}</gco:Decimal></gmd:eastBoundLongitude>\
                     <gmd:southBoundLatitude><gco:Decimal>{south}</gco:Decimal></gmd:southBoundLatitude>\
                     <gmd:northBoundLatitude><gco:Decimal>{north}</gco:Decimal></gmd:northBoundLatitude>\
                     </gmd:EX_GeographicBoundingBox></gmd:geographicElement></gmd:EX_Extent></gmd:extent>"
                );
            }
            out.push_str("</gmd:MD_DataIdentification></gmd:identificationInfo>");
        }

        if let Some(formats) = &self.formats {
            out.push_str("<gmd:distributionInfo><gmd:MD_Distribution>");
            for (name, version) in formats {
                out.push_str("<gmd:distributionFormat><gmd:MD_Format>");
                Self::string(&mut out, "name", name);
                match version {
                    Some(v) => Self::string(&mut out, "version", v),
                    None => out.push_str(r#"<gmd:version gco:nilReason="missing"/>"#),
                }
                out.push_str("</gmd:MD_Format></gmd:distributionFormat>");
            }
            out.push_str("</gmd:MD_Distribution></gmd:distributionInfo>");
        }

        out.push_str("</gmd:MD_Metadata>");
        out
    }

    pub fn parse(&self) -> ParsedRecord {
        parse_record_str(&self.to_xml()).expect("generated document parses")
    }
}
