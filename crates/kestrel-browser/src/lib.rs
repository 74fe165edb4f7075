//! Document pipeline for the Kestrel renderer.
//!
//! # Scope
//!
//! This crate provides:
//! - **Stylesheet collection** - `<style>` text and `<link rel=stylesheet>`
//!   resources in document order, plus a configured user sheet
//! - **Text shaping** - a fontdue-backed [`TextShaper`](kestrel_css::TextShaper)
//! - **Images** - fetch, decode and memoise for `<img>` and backgrounds
//! - **Page** - cascade, `layout(viewport)`, `render_into(surface, scroll)`
//!   and `at(x, y)` behind one handle
//! - **Configuration** - a serde-loadable [`RenderConfig`]
//!
//! # Not Implemented
//!
//! - HTML parsing: documents arrive as a [`DomTree`](kestrel_dom::DomTree)
//! - Font family matching
//! - Scripts

use std::path::PathBuf;

use kestrel_css::{DrawError, LayoutError};
use thiserror::Error;

/// Render settings.
pub mod config;
/// Fontdue text shaper.
pub mod font;
/// Image fetch and decode per [§ 4.8.3](https://html.spec.whatwg.org/multipage/embedded-content.html#the-img-element).
pub mod image_loader;
/// The document pipeline.
pub mod page;
/// Author stylesheet collection per [§ 4.2.4](https://html.spec.whatwg.org/multipage/semantics.html#the-link-element).
pub mod stylesheets;

pub use kestrel_css as css;
pub use kestrel_dom as dom;

pub use config::RenderConfig;
pub use font::FontdueShaper;
pub use image_loader::DecodingImageProvider;
pub use page::Page;
pub use stylesheets::{StylesheetSource, author_stylesheets, collect_sources};

/// Errors raised while loading or rendering a page.
#[derive(Debug, Error)]
pub enum PageError {
    /// A configured font file could not be read.
    #[error("failed to read font '{}': {source}", path.display())]
    FontIo {
        /// The font file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A font file was read but is not a usable font.
    #[error("'{}' is not a usable font: {reason}", path.display())]
    FontParse {
        /// The font file.
        path: PathBuf,
        /// The parser's message.
        reason: String,
    },

    /// No regular face exists at any of the searched locations.
    #[error("no system font found in {} locations", searched.len())]
    NoSystemFont {
        /// Locations that were tried.
        searched: Vec<PathBuf>,
    },

    /// Layout stopped early.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Drawing stopped early.
    #[error(transparent)]
    Draw(#[from] DrawError),
}
