//! Engine configuration.
//!
//! [`EngineConfig`] controls the few places where the generated
//! representations have more than one defensible shape, and the defaults the
//! parser substitutes. It deserializes from JSON so it can live next to the
//! rest of a catalogue service's settings.
//!
//! # Examples
//!
//! ```
//! use isocat::config::{CornerOrder, EngineConfig};
//!
//! let config = EngineConfig::from_json_str(r#"{ "bbox_corner_order": "conventional" }"#)?;
//! assert_eq!(config.bbox_corner_order, CornerOrder::Conventional);
//! assert!(!config.native_bounding_box);
//! # Ok::<(), isocat::CatalogError>(())
//! ```

use std::fmt;

use serde::Deserialize;

use crate::error::{CatalogError, Result};

/// Which bounding-box edges go into `ows:LowerCorner` / `ows:UpperCorner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerOrder {
    /// Lower corner = east/south, upper corner = west/north.
    ///
    /// This is the order existing catalogue consumers were fed; it is
    /// inverted on the longitude axis relative to OWS common.
    #[default]
    Legacy,
    /// Lower corner = west/south, upper corner = east/north.
    Conventional,
}

impl fmt::Display for CornerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Conventional => write!(f, "conventional"),
        }
    }
}

/// Configuration for parsing and representation generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Corner convention of the appended `ows:BoundingBox`.
    pub bbox_corner_order: CornerOrder,

    /// Also append `ows:BoundingBox` to brief and summary native representations.
    ///
    /// Off by default: native representations carry the extent inside the
    /// retained identification info already. The full native representation
    /// is always the submitted document and is never modified.
    pub native_bounding_box: bool,

    /// Hierarchy type used when a record declares none.
    pub default_hierarchy_type: String,

    /// Populate the `anyText` column with the record's text content.
    pub store_any_text: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bbox_corner_order: CornerOrder::default(),
            native_bounding_box: false,
            default_hierarchy_type: "dataset".to_string(),
            store_any_text: true,
        }
    }
}

impl EngineConfig {
    /// Decode a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for malformed JSON or unknown keys.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.bbox_corner_order, CornerOrder::Legacy);
        assert!(!config.native_bounding_box);
        assert_eq!(config.default_hierarchy_type, "dataset");
        assert!(config.store_any_text);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            EngineConfig::from_json_str("{}").unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_full_json() {
        let config = EngineConfig::from_json_str(
            r#"{
                "bbox_corner_order": "conventional",
                "native_bounding_box": true,
                "default_hierarchy_type": "series",
                "store_any_text": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.bbox_corner_order, CornerOrder::Conventional);
        assert!(config.native_bounding_box);
        assert_eq!(config.default_hierarchy_type, "series");
        assert!(!config.store_any_text);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "corner": "x" }"#),
            Err(CatalogError::InvalidConfig(_))
        ));
    }
}
