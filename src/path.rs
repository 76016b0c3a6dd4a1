//! Namespace-aware child-path queries over [`XmlElement`] trees.
//!
//! Paths are a small subset of XPath sufficient for metadata extraction:
//! a `/`-separated sequence of child steps, each a qualified name
//! (`gmd:title`), an unprefixed local name (matches in any namespace) or
//! `*`, optionally ending in an attribute step (`@codeListValue`). A leading
//! `./` is accepted and ignored.
//!
//! ```
//! use isocat::namespaces::NamespaceContext;
//! use isocat::path::PathQuery;
//! use isocat::xml::parse_document;
//!
//! let root = parse_document(
//!     r#"<gmd:hierarchyLevel xmlns:gmd="http://www.isotc211.org/2005/gmd">
//!          <gmd:MD_ScopeCode codeListValue="series"/>
//!        </gmd:hierarchyLevel>"#,
//! )?;
//! let ctx = NamespaceContext::default();
//! let query = PathQuery::new(&ctx);
//! assert_eq!(query.text(&root, "gmd:MD_ScopeCode/@codeListValue").as_deref(), Some("series"));
//! # Ok::<(), isocat::CatalogError>(())
//! ```

use crate::namespaces::NamespaceContext;
use crate::xml::XmlElement;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step<'p> {
    Any,
    Local(&'p str),
    Qualified { prefix: &'p str, local: &'p str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedPath<'p> {
    steps: Vec<Step<'p>>,
    attribute: Option<&'p str>,
}

fn parse_path(expr: &str) -> ParsedPath<'_> {
    let expr = expr.strip_prefix("./").unwrap_or(expr);
    let mut steps = Vec::new();
    let mut attribute = None;
    for part in expr.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if let Some(attr) = part.strip_prefix('@') {
            attribute = Some(attr.rsplit(':').next().unwrap_or(attr));
            break;
        }
        let step = match part.split_once(':') {
            _ if part == "*" => Step::Any,
            Some((prefix, local)) => Step::Qualified { prefix, local },
            None => Step::Local(part),
        };
        steps.push(step);
    }
    ParsedPath { steps, attribute }
}

/// Evaluates child paths against elements using a fixed set of prefix bindings.
#[derive(Debug, Clone, Copy)]
pub struct PathQuery<'c> {
    ctx: &'c NamespaceContext,
}

impl<'c> PathQuery<'c> {
    /// Create a query evaluator bound to `ctx`.
    #[must_use]
    pub fn new(ctx: &'c NamespaceContext) -> Self {
        PathQuery { ctx }
    }

    /// Namespace context used to resolve step prefixes.
    #[must_use]
    pub fn context(&self) -> &'c NamespaceContext {
        self.ctx
    }

    fn matches(&self, step: &Step<'_>, element: &XmlElement) -> bool {
        match step {
            Step::Any => true,
            Step::Local(local) => element.local_name == *local,
            // An unbound prefix never matches.
            Step::Qualified { prefix, local } => self
                .ctx
                .resolve(prefix)
                .is_some_and(|uri| element.is(uri, local)),
        }
    }

    /// All elements reached by the element steps of `path`, in document order.
    ///
    /// A trailing attribute step is ignored here.
    #[must_use]
    pub fn select<'a>(&self, root: &'a XmlElement, path: &str) -> Vec<&'a XmlElement> {
        let parsed = parse_path(path);
        let mut current = vec![root];
        for step in &parsed.steps {
            current = current
                .into_iter()
                .flat_map(XmlElement::child_elements)
                .filter(|child| self.matches(step, child))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First element reached by `path`.
    #[must_use]
    pub fn first<'a>(&self, root: &'a XmlElement, path: &str) -> Option<&'a XmlElement> {
        self.select(root, path).into_iter().next()
    }

    /// Whether `path` reaches at least one element.
    #[must_use]
    pub fn exists(&self, root: &XmlElement, path: &str) -> bool {
        self.first(root, path).is_some()
    }

    /// Non-empty string values of every node reached by `path`.
    ///
    /// With an attribute step the values are attribute values, otherwise the
    /// trimmed text of each element. Empty values are dropped.
    #[must_use]
    pub fn texts(&self, root: &XmlElement, path: &str) -> Vec<String> {
        let attribute = parse_path(path).attribute;
        self.select(root, path)
            .into_iter()
            .filter_map(|el| match attribute {
                Some(attr) => el
                    .attribute(attr)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
                None => el.text(),
            })
            .collect()
    }

    /// First non-empty string value reached by `path`.
    #[must_use]
    pub fn text(&self, root: &XmlElement, path: &str) -> Option<String> {
        self.texts(root, path).into_iter().next()
    }
}
