//! The document pipeline.
//!
//! ```text
//! DomTree ─► stylesheets ─► cascade ─► LayoutTree ─► layout ─► draw
//!                                                      │
//!                                                      └─► at(x, y)
//! ```
//!
//! A [`Page`] owns the tree and its collaborators. Styles are computed once
//! at load; layout runs on demand and is cached until the viewport width
//! changes.

use std::sync::Arc;

use image::RgbaImage;
use kestrel_common::{Fetcher, History, Url};
use kestrel_css::{
    CancelToken, Cascade, DrawError, LayoutContext, LayoutError, LayoutTree, MatchContext,
    MonospaceShaper, Origin, StyleSet, Stylesheet, TextShaper, parse_stylesheet, ua_stylesheet,
};
use kestrel_dom::{DomTree, NodeId};

use crate::PageError;
use crate::config::RenderConfig;
use crate::font::FontdueShaper;
use crate::image_loader::DecodingImageProvider;
use crate::stylesheets::author_stylesheets;

/// A styled document ready for layout, rendering and hit testing.
pub struct Page {
    tree: LayoutTree,
    author_sheets: Vec<Stylesheet>,
    user_sheet: Option<Stylesheet>,
    shaper: Box<dyn TextShaper>,
    images: DecodingImageProvider,
    cancel: CancelToken,
    base_url: Option<Url>,
    config: RenderConfig,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("nodes", &self.tree.dom().len())
            .field("author_sheets", &self.author_sheets.len())
            .field("base_url", &self.base_url)
            .field("laid_out", &self.tree.is_laid_out())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Load `dom` with the shaper `config` asks for: the font at
    /// `font_path`, else a system font, else the fixed-pitch fallback.
    ///
    /// # Errors
    ///
    /// Fails only when `font_path` is set and cannot be loaded.
    pub fn load(
        dom: DomTree,
        config: &RenderConfig,
        fetcher: Arc<dyn Fetcher>,
        history: &dyn History,
    ) -> Result<Self, PageError> {
        let shaper: Box<dyn TextShaper> = match &config.font_path {
            Some(path) => Box::new(FontdueShaper::from_path(path)?),
            None => match FontdueShaper::system() {
                Ok(shaper) => Box::new(shaper),
                Err(e) => {
                    tracing::warn!(error = %e, "falling back to fixed-pitch text");
                    Box::new(MonospaceShaper::default())
                }
            },
        };
        Ok(Self::with_shaper(dom, config, fetcher, history, shaper))
    }

    /// Load `dom` with an explicit text shaper.
    ///
    /// STEP 1: Collect author sheets, fetching linked ones.
    /// STEP 2: Parse the configured user sheet.
    /// STEP 3: Run the cascade and build the layout tree.
    #[must_use]
    pub fn with_shaper(
        dom: DomTree,
        config: &RenderConfig,
        fetcher: Arc<dyn Fetcher>,
        history: &dyn History,
        shaper: Box<dyn TextShaper>,
    ) -> Self {
        let base_url = config.document_url();

        // STEP 1
        let author_sheets = author_stylesheets(&dom, base_url.as_ref(), fetcher.as_ref());

        // STEP 2
        let user_sheet = config
            .user_stylesheet
            .as_deref()
            .map(|css| parse_stylesheet(css, Origin::User));

        tracing::debug!(
            author_sheets = author_sheets.len(),
            user_sheet = user_sheet.is_some(),
            "stylesheets collected"
        );

        // STEP 3
        let mut page = Self {
            tree: LayoutTree::new(DomTree::new(), Vec::new()),
            author_sheets,
            user_sheet,
            shaper,
            images: DecodingImageProvider::new(fetcher),
            cancel: CancelToken::new(),
            base_url,
            config: config.clone(),
        };
        let styles = page.compute_styles(&dom, history);
        page.tree = LayoutTree::new(dom, styles);
        page
    }

    fn compute_styles(&self, dom: &DomTree, history: &dyn History) -> Vec<StyleSet> {
        let sheets = std::iter::once(ua_stylesheet())
            .chain(self.user_sheet.as_ref())
            .chain(&self.author_sheets);
        let ctx = MatchContext {
            history,
            base_url: self.base_url.as_ref(),
        };
        Cascade::new(sheets)
            .with_root_font_size(self.config.default_font_size)
            .resolve(dom, &ctx)
    }

    /// Recompute every style, for instance after `history` learned new
    /// visited links. All geometry is invalidated.
    pub fn restyle(&mut self, history: &dyn History) {
        let styles = self.compute_styles(self.tree.dom(), history);
        self.tree.restyle(styles);
    }

    /// Lay the document out for a viewport `viewport_width` pixels wide.
    /// Repeated calls at the same width do nothing. Widths beyond
    /// `i32::MAX` are laid out at `i32::MAX`.
    ///
    /// # Errors
    ///
    /// See [`LayoutTree::layout`].
    pub fn layout(&mut self, viewport_width: u32) -> Result<(), LayoutError> {
        let ctx = LayoutContext::new(self.shaper.as_ref())
            .with_images(&self.images)
            .with_cancel(self.cancel.clone())
            .with_base_url(self.base_url.clone());
        self.tree
            .layout(i32::try_from(viewport_width).unwrap_or(i32::MAX), &ctx)
    }

    /// Clear `surface` to the configured background and draw the document
    /// scrolled by `scroll`.
    ///
    /// # Errors
    ///
    /// [`DrawError::NotLaidOut`] before [`layout`](Self::layout) has
    /// succeeded, [`DrawError::Cancelled`] when cancelled.
    pub fn render_into(&self, surface: &mut RgbaImage, scroll: (i32, i32)) -> Result<(), DrawError> {
        if !self.tree.is_laid_out() {
            return Err(DrawError::NotLaidOut(self.tree.root()));
        }
        let background = self.config.background_color();
        for pixel in surface.pixels_mut() {
            *pixel = background;
        }
        let ctx = LayoutContext::new(self.shaper.as_ref())
            .with_images(&self.images)
            .with_cancel(self.cancel.clone())
            .with_base_url(self.base_url.clone());
        kestrel_css::render(&self.tree, surface, scroll, &ctx)
    }

    /// Lay out at the configured viewport width and draw the top of the
    /// document into a new surface of the configured size.
    ///
    /// # Errors
    ///
    /// [`PageError::Layout`] or [`PageError::Draw`].
    pub fn render(&mut self) -> Result<RgbaImage, PageError> {
        self.layout(self.config.viewport_width)?;
        let mut surface =
            RgbaImage::new(self.config.viewport_width, self.config.viewport_height);
        self.render_into(&mut surface, (0, 0))?;
        Ok(surface)
    }

    /// The node drawn at document point `(x, y)`.
    #[must_use]
    pub fn at(&self, x: i32, y: i32) -> Option<NodeId> {
        self.tree.at(x, y)
    }

    /// A handle that cancels this page's layout and draw passes from
    /// another thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The layout tree.
    #[must_use]
    pub const fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    /// The document.
    #[must_use]
    pub const fn dom(&self) -> &DomTree {
        self.tree.dom()
    }

    /// Height of the laid-out document.
    #[must_use]
    pub fn document_height(&self) -> i32 {
        self.tree.document_height()
    }

    /// The configuration the page was loaded with.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }
}
