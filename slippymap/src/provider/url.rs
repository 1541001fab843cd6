//! Tile URL templates.
//!
//! A template is a URL containing the `{x}`, `{y}` and `{z}` placeholders:
//!
//! ```
//! use slippymap::coord::TileAddress;
//! use slippymap::provider::TileUrlTemplate;
//!
//! let template = TileUrlTemplate::default();
//! let url = template.url_for(TileAddress::new(619, 320, 10));
//! assert_eq!(
//!     url,
//!     "https://tile2.maps.2gis.com/tiles?x=619&y=320&z=10&v=1.3&ts=online_hd"
//! );
//! ```

use std::fmt;
use std::str::FromStr;

use crate::coord::TileAddress;

/// URL of the default tile server.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://tile2.maps.2gis.com/tiles?x={x}&y={y}&z={z}&v=1.3&ts=online_hd";

const PLACEHOLDERS: [&str; 3] = ["{x}", "{y}", "{z}"];

/// Error returned when a template is missing a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("URL template '{template}' is missing the {placeholder} placeholder")]
pub struct TemplateError {
    pub template: String,
    pub placeholder: &'static str,
}

/// Validated tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
}

impl TileUrlTemplate {
    /// Parse a template, checking that all placeholders are present.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        for placeholder in PLACEHOLDERS {
            if !template.contains(placeholder) {
                return Err(TemplateError {
                    template,
                    placeholder,
                });
            }
        }
        Ok(Self { template })
    }

    /// Builds the URL for a tile.
    pub fn url_for(&self, address: TileAddress) -> String {
        self.template
            .replace("{x}", &address.x.to_string())
            .replace("{y}", &address.y.to_string())
            .replace("{z}", &address.z.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for TileUrlTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

impl FromStr for TileUrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TileUrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_template() {
        let template: TileUrlTemplate = "https://example.com/{z}/{x}/{y}.png".parse().unwrap();
        assert_eq!(
            template.url_for(TileAddress::new(3, 5, 4)),
            "https://example.com/4/3/5.png"
        );
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let err = TileUrlTemplate::new("https://example.com/{z}/{x}.png").unwrap_err();
        assert_eq!(err.placeholder, "{y}");
        assert!(err.to_string().contains("{y}"));
    }

    #[test]
    fn test_default_template_is_valid() {
        assert!(TileUrlTemplate::new(DEFAULT_URL_TEMPLATE).is_ok());
    }
}
