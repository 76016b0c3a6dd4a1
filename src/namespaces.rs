//! Namespace definitions and prefix bindings.
//!
//! This module defines the XML namespaces of the two supported metadata
//! profiles (ISO 19139 and the CSW Dublin Core record) together with the
//! namespaces of the generated representations, and provides
//! [`NamespaceContext`], the prefix-to-URI binding used to resolve path
//! queries such as `gmd:citation/gmd:CI_Citation/gmd:title`.

use indexmap::IndexMap;

/// ISO 19139 metadata namespace.
pub const GMD: &str = "http://www.isotc211.org/2005/gmd";

/// ISO 19139 geographic common namespace.
pub const GCO: &str = "http://www.isotc211.org/2005/gco";

/// ISO 19119 service metadata namespace.
pub const SRV: &str = "http://www.isotc211.org/2005/srv";

/// GML 3.2 namespace.
pub const GML: &str = "http://www.opengis.net/gml/3.2";

/// XLink namespace.
pub const XLINK: &str = "http://www.w3.org/1999/xlink";

/// OGC Catalogue Service 2.0.2 namespace.
pub const CSW: &str = "http://www.opengis.net/cat/csw/2.0.2";

/// Dublin Core elements namespace.
pub const DC: &str = "http://purl.org/dc/elements/1.1/";

/// Dublin Core terms namespace.
pub const DCT: &str = "http://purl.org/dc/terms/";

/// OGC Web Services common namespace.
pub const OWS: &str = "http://www.opengis.net/ows";

/// Prefix-to-URI bindings used to resolve qualified names in path queries.
///
/// Bindings keep insertion order so that [`NamespaceContext::declarations`]
/// renders deterministic `xmlns` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: IndexMap<String, String>,
}

impl Default for NamespaceContext {
    fn default() -> Self {
        let mut ctx = NamespaceContext {
            bindings: IndexMap::new(),
        };
        for (prefix, uri) in [
            ("gmd", GMD),
            ("gco", GCO),
            ("srv", SRV),
            ("gml", GML),
            ("xlink", XLINK),
            ("csw", CSW),
            ("dc", DC),
            ("dct", DCT),
            ("ows", OWS),
        ] {
            ctx.bind(prefix, uri);
        }
        ctx
    }
}

impl NamespaceContext {
    /// Create an empty context with no bindings.
    #[must_use]
    pub fn empty() -> Self {
        NamespaceContext {
            bindings: IndexMap::new(),
        }
    }

    /// Bind `prefix` to `uri`, replacing an earlier binding for the prefix.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Resolve a prefix to its namespace URI.
    #[must_use]
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Find the prefix bound to `uri`, if any.
    #[must_use]
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// `xmlns:prefix="uri"` attribute pairs for the given prefixes, in the
    /// order requested. Unbound prefixes are skipped.
    #[must_use]
    pub fn declarations(&self, prefixes: &[&str]) -> Vec<(String, String)> {
        prefixes
            .iter()
            .filter_map(|p| {
                self.resolve(p)
                    .map(|uri| (format!("xmlns:{p}"), uri.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let ctx = NamespaceContext::default();
        assert_eq!(ctx.resolve("gmd"), Some(GMD));
        assert_eq!(ctx.resolve("dc"), Some(DC));
        assert_eq!(ctx.resolve("nope"), None);
        assert_eq!(ctx.prefix_for(OWS), Some("ows"));
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut ctx = NamespaceContext::empty();
        ctx.bind("md", "urn:a");
        ctx.bind("md", "urn:b");
        assert_eq!(ctx.resolve("md"), Some("urn:b"));
    }

    #[test]
    fn test_declarations_skip_unbound() {
        let ctx = NamespaceContext::default();
        let decls = ctx.declarations(&["gmd", "missing", "gco"]);
        assert_eq!(
            decls,
            vec![
                ("xmlns:gmd".to_string(), GMD.to_string()),
                ("xmlns:gco".to_string(), GCO.to_string()),
            ]
        );
    }
}
