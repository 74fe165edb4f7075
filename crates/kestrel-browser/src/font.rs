//! Text shaping backed by fontdue.
//!
//! [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
//!
//! "CSS assumes that every font has font metrics that specify a
//! characteristic height above the baseline and a depth below it."
//!
//! One regular face is required; bold and italic faces are picked up from
//! the system when present and otherwise fall back to the regular face.
//! Font families are not matched: every family renders with the same
//! faces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};
use kestrel_css::{FontMetrics, FontSpec, TextShaper, blend};

use crate::PageError;

/// Common system font paths to search for a regular face.
const FONT_SEARCH_PATHS: &[&str] = &[
    // macOS
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    // Windows
    "C:\\Windows\\Fonts\\arial.ttf",
];

const FONT_BOLD_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

const FONT_ITALIC_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Oblique.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
    "C:\\Windows\\Fonts\\ariali.ttf",
];

const FONT_BOLD_ITALIC_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-BoldOblique.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    "C:\\Windows\\Fonts\\arialbi.ttf",
];

/// Which face a [`FontSpec`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Face {
    const fn of(font: &FontSpec) -> Self {
        match (font.bold, font.italic) {
            (false, false) => Self::Regular,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (true, true) => Self::BoldItalic,
        }
    }
}

/// A [`TextShaper`] over TrueType faces.
///
/// Vertical metrics are cached per face and pixel size. After warm-up the
/// shaper is only read, so one instance can serve concurrent passes.
pub struct FontdueShaper {
    regular: Font,
    bold: Option<Font>,
    italic: Option<Font>,
    bold_italic: Option<Font>,
    metrics: RwLock<HashMap<(Face, i32), FontMetrics>>,
}

impl std::fmt::Debug for FontdueShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontdueShaper")
            .field("bold", &self.bold.is_some())
            .field("italic", &self.italic.is_some())
            .field("bold_italic", &self.bold_italic.is_some())
            .finish_non_exhaustive()
    }
}

impl FontdueShaper {
    /// A shaper with one face for every style.
    #[must_use]
    pub fn new(regular: Font) -> Self {
        Self {
            regular,
            bold: None,
            italic: None,
            bold_italic: None,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Load the regular face from `path`.
    ///
    /// # Errors
    ///
    /// [`PageError::FontIo`] when the file cannot be read and
    /// [`PageError::FontParse`] when it is not a font.
    pub fn from_path(path: &Path) -> Result<Self, PageError> {
        let data = std::fs::read(path).map_err(|source| PageError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|reason| {
            PageError::FontParse {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            }
        })?;
        tracing::debug!(path = %path.display(), "font loaded");
        Ok(Self::new(font))
    }

    /// Search the usual system locations for a regular face, plus bold
    /// and italic faces when available.
    ///
    /// # Errors
    ///
    /// [`PageError::NoSystemFont`] when no regular face is found.
    pub fn system() -> Result<Self, PageError> {
        let Some(regular) = load_first(FONT_SEARCH_PATHS) else {
            return Err(PageError::NoSystemFont {
                searched: FONT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            });
        };
        Ok(Self {
            bold: load_first(FONT_BOLD_SEARCH_PATHS),
            italic: load_first(FONT_ITALIC_SEARCH_PATHS),
            bold_italic: load_first(FONT_BOLD_ITALIC_SEARCH_PATHS),
            ..Self::new(regular)
        })
    }

    /// The best face for `face`: exact, then partial, then regular.
    fn face(&self, face: Face) -> &Font {
        let chosen = match face {
            Face::Regular => None,
            Face::Bold => self.bold.as_ref(),
            Face::Italic => self.italic.as_ref(),
            Face::BoldItalic => self
                .bold_italic
                .as_ref()
                .or(self.bold.as_ref())
                .or(self.italic.as_ref()),
        };
        chosen.unwrap_or(&self.regular)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss
    )]
    fn compute_metrics(font: &Font, size: i32) -> FontMetrics {
        let px = size as f32;
        let (ascent, descent, line_gap) = font.horizontal_line_metrics(px).map_or(
            // No horizontal table: fall back to 0.8 / 0.2 of the em.
            ((px * 0.8).round(), (px * 0.2).round(), 0.0),
            |m| (m.ascent.round(), (-m.descent).round(), m.line_gap.round()),
        );
        let x_height = font.metrics('x', px).height as i32;
        FontMetrics {
            ascent: ascent as i32,
            descent: descent as i32,
            line_gap: line_gap as i32,
            x_height: if x_height > 0 { x_height } else { size / 2 },
        }
    }
}

fn load_first(paths: &[&str]) -> Option<Font> {
    paths.iter().find_map(|path| {
        let data = std::fs::read(path).ok()?;
        let font = Font::from_bytes(data, FontSettings::default()).ok()?;
        tracing::debug!(path, "system font loaded");
        Some(font)
    })
}

impl TextShaper for FontdueShaper {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn measure(&self, text: &str, font: &FontSpec) -> i32 {
        let face = self.face(Face::of(font));
        let px = font.size as f32;
        let width: f32 = text
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| face.metrics(c, px).advance_width)
            .sum();
        width.round() as i32
    }

    fn metrics(&self, font: &FontSpec) -> FontMetrics {
        let key = (Face::of(font), font.size);
        if let Ok(cache) = self.metrics.read()
            && let Some(metrics) = cache.get(&key)
        {
            return *metrics;
        }
        let metrics = Self::compute_metrics(self.face(key.0), font.size);
        if let Ok(mut cache) = self.metrics.write() {
            let _ = cache.insert(key, metrics);
        }
        metrics
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn rasterize(&self, text: &str, font: &FontSpec, color: Rgba<u8>) -> Option<RgbaImage> {
        let width = self.measure(text, font);
        let metrics = self.metrics(font);
        if width <= 0 || metrics.height() <= 0 {
            return None;
        }
        let face = self.face(Face::of(font));
        let px = font.size as f32;
        let mut image = RgbaImage::new(width as u32, metrics.height() as u32);

        // The cursor advances exactly as `measure` sums, so the run ends
        // where layout expects it to.
        let mut cursor = 0.0_f32;
        for c in text.chars().filter(|c| !c.is_control()) {
            let (glyph, coverage) = face.rasterize(c, px);
            let x0 = cursor.round() as i32 + glyph.xmin;
            let y0 = metrics.ascent - glyph.ymin - glyph.height as i32;
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    let alpha = coverage[gy * glyph.width + gx];
                    let (x, y) = (x0 + gx as i32, y0 + gy as i32);
                    if alpha == 0 || x < 0 || y < 0 || x >= width || y >= metrics.height() {
                        continue;
                    }
                    let a = (u32::from(color[3]) * u32::from(alpha) / 255) as u8;
                    blend(
                        image.get_pixel_mut(x as u32, y as u32),
                        Rgba([color[0], color[1], color[2], a]),
                    );
                }
            }
            cursor += glyph.advance_width;
        }
        Some(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(bold: bool, italic: bool) -> FontSpec {
        FontSpec {
            family: "serif".into(),
            size: 16,
            bold,
            italic,
        }
    }

    #[test]
    fn test_face_selection() {
        assert_eq!(Face::of(&spec(false, false)), Face::Regular);
        assert_eq!(Face::of(&spec(true, false)), Face::Bold);
        assert_eq!(Face::of(&spec(false, true)), Face::Italic);
        assert_eq!(Face::of(&spec(true, true)), Face::BoldItalic);
    }

    #[test]
    fn test_missing_font_file_is_an_io_error() {
        let err = FontdueShaper::from_path(Path::new("/nonexistent/kestrel.ttf")).unwrap_err();
        assert!(matches!(err, PageError::FontIo { .. }));
    }

    // Runs only where a system font is installed.
    #[test]
    #[allow(clippy::cast_sign_loss)]
    fn test_system_font_measures_consistently() {
        let Ok(shaper) = FontdueShaper::system() else {
            return;
        };
        let font = spec(false, false);
        let metrics = shaper.metrics(&font);
        assert!(metrics.ascent > 0);
        assert_eq!(shaper.metrics(&font), metrics);

        let width = shaper.measure("Hello", &font);
        assert!(width > shaper.measure("Hell", &font));
        let raster = shaper.rasterize("Hello", &font, Rgba([0, 0, 0, 255]));
        assert_eq!(
            raster.map(|r| r.dimensions()),
            Some((width as u32, metrics.height() as u32))
        );
    }
}
