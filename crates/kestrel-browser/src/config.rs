//! Render configuration.
//!
//! Every field has a default, so a configuration file only needs the
//! fields it changes: `{}` is a valid configuration.

use std::path::PathBuf;

use image::Rgba;
use kestrel_common::Url;
use kestrel_common::url::url_from_location;
use serde::{Deserialize, Serialize};

/// Settings for loading and rendering one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Font size of the root element in pixels.
    pub default_font_size: i32,
    /// CSS text applied at user origin.
    pub user_stylesheet: Option<String>,
    /// TrueType font to shape text with instead of a system font.
    pub font_path: Option<PathBuf>,
    /// Document URL: an absolute URL or a filesystem path.
    pub base_url: Option<String>,
    /// Colour the surface is cleared to before drawing.
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            default_font_size: 16,
            user_stylesheet: None,
            font_path: None,
            base_url: None,
            background: "white".to_string(),
        }
    }
}

impl RenderConfig {
    /// The document URL, if one is configured and parses.
    #[must_use]
    pub fn document_url(&self) -> Option<Url> {
        self.base_url.as_deref().and_then(url_from_location)
    }

    /// The clear colour. Unparseable values fall back to white.
    #[must_use]
    pub fn background_color(&self) -> Rgba<u8> {
        const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
        kestrel_css::units::parse_color(&self.background, WHITE).unwrap_or(WHITE)
    }
}
