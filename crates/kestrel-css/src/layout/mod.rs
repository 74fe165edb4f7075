//! CSS layout engine.
//!
//! [CSS 2.1 Visual Formatting Model](https://www.w3.org/TR/CSS2/visuren.html)
//!
//! A single depth-first pass over a [`LayoutTree`] produces, for every
//! node, a draw rectangle, a content rectangle and the line boxes of its
//! inline content, while tracking floats per containing block.
//!
//! # Module Structure
//!
//! - [`tree`] - the arena of layout nodes and their outputs
//! - [`engine`] - block flow, inline flow and float placement
//! - [`line`] - line boxes and line completion
//! - [`float`] - per-block float stacks
//! - [`margin`] - vertical margin collapsing
//! - [`text`] - word splitting, inter-word spacing, a fixed-pitch shaper
//!
//! # Collaborators
//!
//! Text measurement and rasterisation go through [`TextShaper`]; replaced
//! and background images through [`ImageProvider`]. Both are supplied by
//! the caller in a [`LayoutContext`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{Rgba, RgbaImage};
use kestrel_common::Url;
use kestrel_dom::NodeId;
use thiserror::Error;

pub mod engine;
pub mod float;
pub mod line;
pub mod margin;
pub mod text;
pub mod tree;

pub use float::{FloatStack, PlacedFloat};
pub use line::{LineBox, LineContent};
pub use margin::{CollapsibleMargin, collapse_two_margins};
pub use text::MonospaceShaper;
pub use tree::{LayoutNode, LayoutTree};

/// [CSS Fonts § 5 Font matching](https://www.w3.org/TR/css-fonts-4/#font-matching-algorithm)
///
/// The font request a shaper receives: first family name, pixel size and
/// the two style flags the engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontSpec {
    /// First entry of `font-family`, unquoted.
    pub family: String,
    /// Size in pixels.
    pub size: i32,
    /// `font-weight` of 600 or more.
    pub bold: bool,
    /// `font-style: italic | oblique`.
    pub italic: bool,
}

/// [§ 10.8.1 Leading and half-leading](https://www.w3.org/TR/CSS2/visudet.html#leading)
///
/// "CSS assumes that every font has font metrics that specify a
/// characteristic height above the baseline and a depth below it."
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontMetrics {
    /// Height above the baseline.
    pub ascent: i32,
    /// Depth below the baseline, positive.
    pub descent: i32,
    /// Recommended extra space between lines.
    pub line_gap: i32,
    /// Height of a lowercase `x`, used by `vertical-align: middle`.
    pub x_height: i32,
}

impl FontMetrics {
    /// Height of the glyph area: ascent plus descent.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    /// Used value of `line-height: normal`.
    #[must_use]
    pub const fn line_height(&self) -> i32 {
        self.ascent + self.descent + self.line_gap
    }
}

/// Text measurement and rasterisation.
///
/// Implementations must be deterministic: layout measures a run and the
/// draw pass later rasterises the same run, and the two must agree.
pub trait TextShaper: Send + Sync {
    /// Advance width of `text` in `font`.
    fn measure(&self, text: &str, font: &FontSpec) -> i32;

    /// Vertical metrics of `font`.
    fn metrics(&self, font: &FontSpec) -> FontMetrics;

    /// Render `text` in `color` into an image `measure(text)` wide and
    /// `metrics().height()` tall, baseline at `ascent`. `None` when the
    /// shaper has nothing to draw.
    fn rasterize(&self, text: &str, font: &FontSpec, color: Rgba<u8>) -> Option<RgbaImage>;
}

/// Decoded images by URL. A missing or undecodable image is `None`.
pub trait ImageProvider: Send + Sync {
    /// The decoded image at `url`.
    fn image(&self, url: &Url) -> Option<Arc<RgbaImage>>;
}

/// An image provider that never has anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageProvider for NoImages {
    fn image(&self, _url: &Url) -> Option<Arc<RgbaImage>> {
        None
    }
}

/// Shared cancellation flag checked at every layout and draw step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every pass holding a clone of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag so the next pass can run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called since the last
    /// reset.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a layout or draw pass consults besides the tree itself.
#[derive(Clone)]
pub struct LayoutContext<'a> {
    /// Text measurement and rasterisation.
    pub shaper: &'a dyn TextShaper,
    /// Image lookup for `<img>` and `background-image`.
    pub images: &'a dyn ImageProvider,
    /// Cancellation flag.
    pub cancel: CancelToken,
    /// Document URL that relative `src` and `url()` values resolve against.
    pub base_url: Option<Url>,
}

impl<'a> LayoutContext<'a> {
    /// A context with no images, no base URL and a fresh cancel token.
    #[must_use]
    pub fn new(shaper: &'a dyn TextShaper) -> Self {
        Self {
            shaper,
            images: &NoImages,
            cancel: CancelToken::new(),
            base_url: None,
        }
    }

    /// Replace the image provider.
    #[must_use]
    pub fn with_images(mut self, images: &'a dyn ImageProvider) -> Self {
        self.images = images;
        self
    }

    /// Replace the cancel token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the document URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<Url>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Resolve `href` and ask the provider for the image.
    #[must_use]
    pub fn image(&self, href: &str) -> Option<Arc<RgbaImage>> {
        let url = kestrel_common::resolve_url(href, self.base_url.as_ref())?;
        self.images.image(&url)
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), LayoutError> {
        if self.cancel.is_cancelled() {
            Err(LayoutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Reasons a layout pass stops early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The cancel token was set. Nothing that was mid-layout is marked
    /// done, so the next pass redoes it.
    #[error("layout cancelled")]
    Cancelled,

    /// Text reached a line with no usable width and no floats to wait out.
    #[error("no room to lay out text of node {node:?}: {width}px available")]
    NoRoom {
        /// The element whose text could not be placed.
        node: NodeId,
        /// Usable width at the failure point.
        width: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        clone.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_metrics_heights() {
        let m = FontMetrics {
            ascent: 12,
            descent: 4,
            line_gap: 2,
            x_height: 6,
        };
        assert_eq!(m.height(), 16);
        assert_eq!(m.line_height(), 18);
    }
}
