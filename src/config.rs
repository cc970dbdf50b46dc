//! Grid configuration.
//!
//! Every field has a default so partial JSON documents are accepted:
//!
//! ```
//! let config = layergrid::config::GridConfig::from_json(r#"{"default_row_height": 24}"#).unwrap();
//! assert_eq!(config.default_row_height, 24);
//! assert_eq!(config.default_column_width, 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::coordinate::Pixel;
use crate::error::Result;

/// Default column width in pixels.
pub const DEFAULT_COLUMN_WIDTH: Pixel = 100;

/// Default row height in pixels.
pub const DEFAULT_ROW_HEIGHT: Pixel = 20;

/// Overlap kept visible between two consecutive step/page scrolls.
pub const DEFAULT_SCROLL_INTERSECTION: Pixel = 4;

/// Sizes and scroll behaviour used when building a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width of body columns without an explicit size
    pub default_column_width: Pixel,
    /// Height of body rows without an explicit size
    pub default_row_height: Pixel,
    /// Height of the column header row
    pub column_header_height: Pixel,
    /// Width of the row header column
    pub row_header_width: Pixel,
    /// Pixels subtracted from step scrolls (half of it from page scrolls)
    pub scroll_intersection: Pixel,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_column_width: DEFAULT_COLUMN_WIDTH,
            default_row_height: DEFAULT_ROW_HEIGHT,
            column_header_height: DEFAULT_ROW_HEIGHT,
            row_header_width: 40,
            scroll_intersection: DEFAULT_SCROLL_INTERSECTION,
        }
    }
}

impl GridConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns [`crate::GridError::Config`] when the document is not valid JSON
    /// or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to pretty JSON.
    ///
    /// # Errors
    /// Returns [`crate::GridError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
