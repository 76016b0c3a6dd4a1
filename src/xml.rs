//! Owned XML element tree for metadata records.
//!
//! The engine works on a fully materialized tree rather than on a stream:
//! the parser walks the record's children once, retains whole sub-trees for
//! the native representations, and the full native representation is the
//! submitted tree itself. [`parse_document`] builds the tree with
//! `quick_xml`'s namespace-resolving reader; [`XmlElement::to_xml_string`]
//! writes it back.
//!
//! Every element keeps the qualified name exactly as written (so prefixes
//! survive serialization) together with its resolved namespace URI (so path
//! queries can match on `{namespace}local-name` regardless of the prefix the
//! author chose). Namespace declarations stay ordinary attributes.
//!
//! # Examples
//!
//! ```
//! use isocat::xml::parse_document;
//!
//! let root = parse_document(
//!     r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"><gmd:language/></gmd:MD_Metadata>"#,
//! )?;
//! assert_eq!(root.local_name, "MD_Metadata");
//! assert_eq!(root.namespace.as_deref(), Some("http://www.isotc211.org/2005/gmd"));
//! assert_eq!(root.child_elements().count(), 1);
//! # Ok::<(), isocat::CatalogError>(())
//! ```

use std::fmt::Write;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use smallvec::SmallVec;

use crate::error::{CatalogError, Result};

/// An attribute on an [`XmlElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified name as written (e.g. `xlink:href`, `codeListValue`)
    pub name: String,
    /// Local part of the name
    pub local_name: String,
    /// Unescaped value
    pub value: String,
}

/// A child node: either a nested element or a run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element
    Element(XmlElement),
    /// Unescaped character data (text or CDATA)
    Text(String),
}

/// An element with its attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (e.g. `gmd:fileIdentifier`)
    pub name: String,
    /// Local part of the name (e.g. `fileIdentifier`)
    pub local_name: String,
    /// Resolved namespace URI, `None` when the name is unbound
    pub namespace: Option<String>,
    /// Attributes, including namespace declarations, in document order
    pub attributes: SmallVec<[XmlAttribute; 4]>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    ///
    /// `name` is the qualified name to write; the local name is derived from it.
    #[must_use]
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        let local_name = name.rsplit(':').next().unwrap_or(name).to_string();
        XmlElement {
            name: name.to_string(),
            local_name,
            namespace: namespace.map(str::to_string),
            attributes: SmallVec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style text child.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    /// Builder-style element child.
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push_child(child);
        self
    }

    /// Set an attribute, replacing an existing one with the same qualified name.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value.to_string();
            return;
        }
        self.attributes.push(XmlAttribute {
            name: name.to_string(),
            local_name: name.rsplit(':').next().unwrap_or(name).to_string(),
            value: value.to_string(),
        });
    }

    /// Append an element child.
    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Append character data, merging with a preceding text node.
    pub fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Iterate over element children, skipping character data.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Whether this element is `{namespace}local_name`.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    /// Value of the first attribute with the given local name.
    #[must_use]
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name && !a.name.starts_with("xmlns"))
            .map(|a| a.value.as_str())
    }

    /// Namespace declarations (`xmlns` / `xmlns:*`) carried by this element.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes
            .iter()
            .filter(|a| a.name == "xmlns" || a.name.starts_with("xmlns:"))
    }

    /// Direct character data, trimmed. `None` when empty.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                text.push_str(t);
            }
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// All character data below this element, each run trimmed, joined by a
    /// single space.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ")
    }

    /// Serialize without an XML declaration.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Append the serialization of this element to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            write!(out, " {}=\"{}\"", attr.name, escape(&attr.value)).ok();
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_to(out),
                XmlNode::Text(t) => out.push_str(&escape(t)),
            }
        }
        write!(out, "</{}>", self.name).ok();
    }
}

fn collect_text<'a>(element: &'a XmlElement, parts: &mut Vec<&'a str>) {
    for node in &element.children {
        match node {
            XmlNode::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    parts.push(t);
                }
            },
            XmlNode::Element(el) => collect_text(el, parts),
        }
    }
}

/// Parse a complete XML document into its root element.
///
/// Comments, processing instructions and the XML declaration are dropped;
/// whitespace-only text is kept so the tree serializes back faithfully.
///
/// # Errors
///
/// Returns [`CatalogError::MalformedXml`] when the input is not well-formed,
/// has no root element, or has more than one.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let step = reader
            .read_resolved_event()
            .map(|(resolved, event)| (namespace_uri(&resolved), event));
        let (namespace, event) = match step {
            Ok(resolved) => resolved,
            Err(e) => {
                return Err(CatalogError::MalformedXml(format!(
                    "error at position {}: {e}",
                    reader.buffer_position()
                )))
            },
        };

        match event {
            Event::Start(start) => {
                stack.push(start_element(&start, namespace)?);
            },
            Event::Empty(start) => {
                let element = start_element(&start, namespace)?;
                attach(&mut stack, &mut root, element)?;
            },
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    CatalogError::MalformedXml("unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            },
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| CatalogError::MalformedXml(e.to_string()))?;
                    parent.push_text(&text);
                }
            },
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if let Some(open) = stack.last() {
        return Err(CatalogError::MalformedXml(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| CatalogError::MalformedXml("document has no root element".to_string()))
}

fn namespace_uri(resolved: &ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn start_element(start: &BytesStart, namespace: Option<String>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let local_name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = SmallVec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CatalogError::MalformedXml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| CatalogError::MalformedXml(e.to_string()))?;
        attributes.push(XmlAttribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            local_name: String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(XmlElement {
        name,
        local_name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(CatalogError::MalformedXml(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{GCO, GMD};
    use proptest::prelude::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- leading comment -->
<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">
  <gmd:fileIdentifier><gco:CharacterString>abc &amp; def</gco:CharacterString></gmd:fileIdentifier>
  <gmd:hierarchyLevel><gmd:MD_ScopeCode codeListValue="dataset"/></gmd:hierarchyLevel>
</gmd:MD_Metadata>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = parse_document(SAMPLE).unwrap();
        assert!(root.is(GMD, "MD_Metadata"));
        let file_id = root.child_elements().next().unwrap();
        assert_eq!(file_id.name, "gmd:fileIdentifier");
        let cs = file_id.child_elements().next().unwrap();
        assert!(cs.is(GCO, "CharacterString"));
        assert_eq!(cs.text().as_deref(), Some("abc & def"));
    }

    #[test]
    fn test_attribute_lookup_ignores_declarations() {
        let root = parse_document(SAMPLE).unwrap();
        let scope = root
            .child_elements()
            .nth(1)
            .and_then(|h| h.child_elements().next())
            .unwrap();
        assert_eq!(scope.attribute("codeListValue"), Some("dataset"));
        assert_eq!(root.attribute("gmd"), None);
        assert_eq!(root.namespace_declarations().count(), 2);
    }

    #[test]
    fn test_reserialize_and_reparse_is_stable() {
        let root = parse_document(SAMPLE).unwrap();
        let written = root.to_xml_string();
        let again = parse_document(&written).unwrap();
        assert_eq!(root, again);
        assert!(written.contains("abc &amp; def"));
    }

    #[test]
    fn test_text_content_joins_runs() {
        let root = parse_document(SAMPLE).unwrap();
        assert_eq!(root.text_content(), "abc & def");
    }

    #[test]
    fn test_cdata_becomes_text() {
        let root = parse_document("<a><![CDATA[x < y]]></a>").unwrap();
        assert_eq!(root.text().as_deref(), Some("x < y"));
    }

    #[test]
    fn test_unprefixed_default_namespace() {
        let root =
            parse_document(r#"<MD_Metadata xmlns="http://www.isotc211.org/2005/gmd"><language/></MD_Metadata>"#)
                .unwrap();
        assert!(root.is(GMD, "MD_Metadata"));
        assert!(root.child_elements().next().unwrap().is(GMD, "language"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_document("<a><b></a>"),
            Err(CatalogError::MalformedXml(_))
        ));
        assert!(matches!(
            parse_document("<a>"),
            Err(CatalogError::MalformedXml(_))
        ));
        assert!(matches!(
            parse_document("   "),
            Err(CatalogError::MalformedXml(_))
        ));
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(CatalogError::MalformedXml(_))
        ));
    }

    #[test]
    fn test_builder_helpers() {
        let el = XmlElement::new("dc:title", Some("urn:dc"))
            .with_attribute("lang", "en")
            .with_text("Lake ")
            .with_text("Survey");
        assert_eq!(el.local_name, "title");
        assert_eq!(el.children.len(), 1);
        assert_eq!(
            el.to_xml_string(),
            r#"<dc:title lang="en">Lake Survey</dc:title>"#
        );
    }

    proptest! {
        #[test]
        fn prop_text_survives_escaping(text in "[ -~äöü€]{1,40}") {
            let el = XmlElement::new("t", None).with_text(&text);
            let back = parse_document(&el.to_xml_string()).unwrap();
            prop_assert_eq!(back.children, vec![XmlNode::Text(text)]);
        }
    }
}
