//! CSS box model.
//!
//! [CSS Box Model Module Level 3](https://www.w3.org/TR/css-box-3/)
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │              margin-top               │
//! │   ┌───────────────────────────────┐   │
//! │   │          border-top           │   │
//! │   │   ┌───────────────────────┐   │   │
//! │   │   │      padding-top      │   │   │
//! │ m │ b │ p ┌───────────────┐ p │ b │ m │
//! │ a │ o │ a │    CONTENT    │ a │ o │ a │
//! │ r │ r │ d └───────────────┘ d │ r │ r │
//! │   │   │     padding-bottom    │   │   │
//! │   │   └───────────────────────┘   │   │
//! │   │         border-bottom         │   │
//! │   └───────────────────────────────┘   │
//! │             margin-bottom             │
//! └───────────────────────────────────────┘
//! ```
//!
//! [`UsedBox`] turns a resolved style and a container width into integer
//! edges and a content width. [`OuterBox`] is the paintable description of
//! everything outside the content: transparent margins, borders, and the
//! background.
//!
//! The layout engine positions boxes by their *draw rectangle*, which
//! includes the horizontal margins but not the vertical ones, so that
//! vertical margins can collapse between siblings. Floats keep their
//! vertical margins too, since they never collapse.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::paint::blend;
use crate::style::{BackgroundRepeat, Property, ResolvedStyle};
use crate::units::{self, TRANSPARENT};

/// An axis-aligned rectangle in integer pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, never negative.
    pub width: i32,
    /// Height, never negative.
    pub height: i32,
}

impl Rect {
    /// Build a rectangle, clamping negative sizes to zero.
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    /// The rectangle spanning `(x0, y0)` to `(x1, y1)`, exclusive.
    #[must_use]
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// One past the right edge.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether `(x, y)` lies inside.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether the two rectangles share at least one pixel.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The same rectangle moved by `(dx, dy)`.
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Sizes of the four sides of a margin, border or padding area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Edges {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Edges {
    /// `left + right`.
    #[must_use]
    pub const fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    /// `top + bottom`.
    #[must_use]
    pub const fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

impl std::ops::Add for Edges {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            top: self.top + rhs.top,
            right: self.right + rhs.right,
            bottom: self.bottom + rhs.bottom,
            left: self.left + rhs.left,
        }
    }
}

/// Used values of one box: every edge in pixels plus the content size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsedBox {
    /// Margin edges. May be negative.
    pub margin: Edges,
    /// Border widths.
    pub border: Edges,
    /// Padding edges.
    pub padding: Edges,
    /// Used content width.
    pub width: i32,
    /// Whether `width` was `auto`.
    pub auto_width: bool,
    /// Specified content height, already clamped. `None` for `auto`.
    pub height: Option<i32>,
    min_height: i32,
    max_height: Option<i32>,
}

impl UsedBox {
    /// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
    ///
    /// Resolve `style` inside a containing block `container_width` wide.
    #[must_use]
    pub fn resolve(style: &ResolvedStyle, container_width: i32) -> Self {
        Self::resolve_inner(style, container_width, None)
    }

    /// Resolve with the content width fixed to `width`, as for a
    /// shrink-to-fit box whose preferred width is already known. The width
    /// still honours `min-width` and `max-width`; `auto` margins become
    /// zero.
    #[must_use]
    pub fn resolve_with_width(style: &ResolvedStyle, container_width: i32, width: i32) -> Self {
        Self::resolve_inner(style, container_width, Some(width))
    }

    fn resolve_inner(style: &ResolvedStyle, container_width: i32, forced: Option<i32>) -> Self {
        let font_size = style.font_size();
        let length = |property: Property| -> Option<i32> {
            units::parse_length(style.value(property), font_size, container_width)
        };

        let padding = Edges {
            top: length(Property::PaddingTop).unwrap_or(0).max(0),
            right: length(Property::PaddingRight).unwrap_or(0).max(0),
            bottom: length(Property::PaddingBottom).unwrap_or(0).max(0),
            left: length(Property::PaddingLeft).unwrap_or(0).max(0),
        };
        let border = Edges {
            top: border_width(style, Property::BorderTopWidth, Property::BorderTopStyle),
            right: border_width(style, Property::BorderRightWidth, Property::BorderRightStyle),
            bottom: border_width(style, Property::BorderBottomWidth, Property::BorderBottomStyle),
            left: border_width(style, Property::BorderLeftWidth, Property::BorderLeftStyle),
        };

        // "If 'margin-top', or 'margin-bottom' are 'auto', their used value
        // is 0."
        let margin_top = length(Property::MarginTop).unwrap_or(0);
        let margin_bottom = length(Property::MarginBottom).unwrap_or(0);
        let margin_left = margin_value(style, Property::MarginLeft, container_width);
        let margin_right = margin_value(style, Property::MarginRight, container_width);

        // [§ 10.4 Minimum and maximum widths](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths)
        let min_width = length(Property::MinWidth).unwrap_or(0).max(0);
        let max_width = length(Property::MaxWidth);
        let clamp_width = |w: i32| {
            let w = w.max(min_width);
            max_width.map_or(w, |max| w.min(max.max(0)))
        };

        let frame = padding.horizontal() + border.horizontal();
        let specified = forced.or_else(|| length(Property::Width));
        let auto_width = specified.is_none();

        // Margins around a content box of known `width`.
        let margins = |width: i32| {
            let remaining = container_width
                - width
                - frame
                - margin_left.unwrap_or(0)
                - margin_right.unwrap_or(0);
            match (margin_left, margin_right) {
                // "If both 'margin-left' and 'margin-right' are 'auto',
                // their used values are equal. This horizontally centers
                // the element with respect to the edges of the containing
                // block."
                (None, None) => {
                    let half = remaining.max(0) / 2;
                    (half, remaining.max(0) - half)
                }
                // "If there is exactly one value specified as 'auto', its
                // used value follows from the equality."
                (None, Some(r)) => (remaining.max(0), r),
                (Some(l), None) => (l, remaining.max(0)),
                // Over-constrained: margin-right keeps its specified value
                // instead of absorbing the slack.
                (Some(l), Some(r)) => (l, r),
            }
        };

        let (width, left, right) = match specified {
            Some(w) if forced.is_some() => (
                clamp_width(w).max(0),
                margin_left.unwrap_or(0),
                margin_right.unwrap_or(0),
            ),
            Some(w) => {
                let width = clamp_width(w).max(0);
                let (left, right) = margins(width);
                (width, left, right)
            }
            // "If 'width' is set to 'auto', any other 'auto' values become
            // '0' and 'width' follows from the resulting equality."
            None => {
                let left = margin_left.unwrap_or(0);
                let right = margin_right.unwrap_or(0);
                let fill = (container_width - left - right - frame).max(0);
                let width = clamp_width(fill).max(0);
                if width == fill {
                    (width, left, right)
                } else {
                    // "If the tentative used width is greater than
                    // 'max-width', the rules above are applied again using
                    // the computed value of 'max-width' as the computed
                    // value for 'width'."
                    let (left, right) = margins(width);
                    (width, left, right)
                }
            }
        };

        // [§ 10.7 Minimum and maximum heights](https://www.w3.org/TR/CSS2/visudet.html#min-max-heights)
        //
        // Percentages need a definite containing block height, which this
        // engine never has: they behave as `auto` / `none`.
        let height_length = |property: Property| -> Option<i32> {
            let value = style.value(property);
            if value.trim_end().ends_with('%') {
                return None;
            }
            units::parse_length(value, font_size, 0)
        };
        let min_height = height_length(Property::MinHeight).unwrap_or(0).max(0);
        let max_height = height_length(Property::MaxHeight).map(|h| h.max(0));

        let mut used = Self {
            margin: Edges {
                top: margin_top,
                right,
                bottom: margin_bottom,
                left,
            },
            border,
            padding,
            width,
            auto_width,
            height: None,
            min_height,
            max_height,
        };
        used.height = height_length(Property::Height).map(|h| used.clamp_height(h));
        used
    }

    /// Apply `min-height` then `max-height` to a content height.
    #[must_use]
    pub fn clamp_height(&self, height: i32) -> i32 {
        let h = height.max(self.min_height);
        self.max_height.map_or(h, |max| h.min(max)).max(0)
    }

    /// Border plus padding.
    #[must_use]
    pub fn frame(&self) -> Edges {
        self.border + self.padding
    }

    /// Width of the margin box.
    #[must_use]
    pub fn outer_width(&self) -> i32 {
        self.margin.horizontal() + self.frame().horizontal() + self.width
    }

    /// Content box origin relative to the draw rectangle. `vertical_margins`
    /// is true for boxes whose draw rectangle includes them (floats).
    #[must_use]
    pub fn content_offset(&self, vertical_margins: bool) -> (i32, i32) {
        let frame = self.frame();
        let top = if vertical_margins { self.margin.top } else { 0 };
        (self.margin.left + frame.left, top + frame.top)
    }
}

/// `margin-left` / `margin-right`, with `auto` as `None`.
fn margin_value(style: &ResolvedStyle, property: Property, container_width: i32) -> Option<i32> {
    let value = style.value(property);
    if value.trim().eq_ignore_ascii_case("auto") {
        return None;
    }
    Some(units::parse_length(value, style.font_size(), container_width).unwrap_or(0))
}

/// [§ 8.5.3 Border style](https://www.w3.org/TR/CSS2/box.html#border-style-properties)
///
/// "none: No border; the computed border width is zero."
fn border_width(style: &ResolvedStyle, width: Property, border_style: Property) -> i32 {
    let kind = style.value(border_style).trim().to_ascii_lowercase();
    if kind == "none" || kind == "hidden" {
        return 0;
    }
    units::parse_border_width(style.value(width), style.font_size()).unwrap_or(3)
}

/// The paintable frame of a box: transparent margins, four border colours,
/// and a background colour with an optional tiled image.
#[derive(Debug, Clone)]
pub struct OuterBox {
    /// Total width of the described area.
    pub width: i32,
    /// Total height of the described area.
    pub height: i32,
    /// Transparent margin bands. Vertical bands are zero unless the box
    /// keeps its vertical margins (floats).
    pub margin: Edges,
    /// Border bands.
    pub border: Edges,
    /// Border colours, top, right, bottom, left.
    pub border_colors: [Rgba<u8>; 4],
    /// Background colour.
    pub background: Rgba<u8>,
    /// Background image tiled over the padding box.
    pub background_image: Option<Arc<RgbaImage>>,
    /// How the background image repeats.
    pub repeat: BackgroundRepeat,
}

impl OuterBox {
    /// [CSS Backgrounds and Borders Level 3](https://www.w3.org/TR/css-backgrounds-3/)
    ///
    /// Describe the frame of a box whose content area is `content_height`
    /// tall.
    #[must_use]
    pub fn build(
        style: &ResolvedStyle,
        used: &UsedBox,
        content_height: i32,
        vertical_margins: bool,
        background_image: Option<Arc<RgbaImage>>,
    ) -> Self {
        let color = units::parse_color(style.value(Property::Color), Rgba([0, 0, 0, 255]))
            .unwrap_or(Rgba([0, 0, 0, 255]));
        // "If an element's border color is not specified with a border
        // property, user agents must use the value of the element's 'color'
        // property as the computed value for the border color."
        let border_color = |property: Property| {
            units::parse_color(style.value(property), color).unwrap_or(color)
        };
        let background = units::parse_color(style.value(Property::BackgroundColor), color)
            .unwrap_or(TRANSPARENT);

        let margin = Edges {
            top: if vertical_margins { used.margin.top.max(0) } else { 0 },
            bottom: if vertical_margins { used.margin.bottom.max(0) } else { 0 },
            left: used.margin.left.max(0),
            right: used.margin.right.max(0),
        };
        let frame = used.frame();
        Self {
            width: margin.horizontal() + frame.horizontal() + used.width,
            height: margin.vertical() + frame.vertical() + content_height.max(0),
            margin,
            border: used.border,
            border_colors: [
                border_color(Property::BorderTopColor),
                border_color(Property::BorderRightColor),
                border_color(Property::BorderBottomColor),
                border_color(Property::BorderLeftColor),
            ],
            background,
            background_image,
            repeat: style.background_repeat(),
        }
    }

    /// Whether painting would change no pixel.
    #[must_use]
    pub fn is_invisible(&self) -> bool {
        let borders = (self.border.top > 0 && self.border_colors[0][3] > 0)
            || (self.border.right > 0 && self.border_colors[1][3] > 0)
            || (self.border.bottom > 0 && self.border_colors[2][3] > 0)
            || (self.border.left > 0 && self.border_colors[3][3] > 0);
        !borders && self.background[3] == 0 && self.background_image.is_none()
    }

    /// Colour of the pixel at `(x, y)` relative to the top-left corner.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        // STEP 1: Margin area.
        if x < self.margin.left
            || y < self.margin.top
            || x >= self.width - self.margin.right
            || y >= self.height - self.margin.bottom
        {
            return TRANSPARENT;
        }

        // STEP 2: Border area. Corners belong to the horizontal bands.
        let bx = x - self.margin.left;
        let by = y - self.margin.top;
        let border_width = self.width - self.margin.horizontal();
        let border_height = self.height - self.margin.vertical();
        if by < self.border.top {
            return self.border_colors[0];
        }
        if by >= border_height - self.border.bottom {
            return self.border_colors[2];
        }
        if bx < self.border.left {
            return self.border_colors[3];
        }
        if bx >= border_width - self.border.right {
            return self.border_colors[1];
        }

        // STEP 3: Padding box: background colour, image on top.
        let mut color = self.background;
        if let Some(image) = &self.background_image {
            let px = bx - self.border.left;
            let py = by - self.border.top;
            if let Some(sample) = self.tile(image, px, py) {
                blend(&mut color, sample);
            }
        }
        color
    }

    /// [§ 3.4 'background-repeat'](https://www.w3.org/TR/css-backgrounds-3/#background-repeat)
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn tile(&self, image: &RgbaImage, x: i32, y: i32) -> Option<Rgba<u8>> {
        let (w, h) = (image.width() as i32, image.height() as i32);
        if w == 0 || h == 0 {
            return None;
        }
        let (repeat_x, repeat_y) = match self.repeat {
            BackgroundRepeat::Repeat => (true, true),
            BackgroundRepeat::RepeatX => (true, false),
            BackgroundRepeat::RepeatY => (false, true),
            BackgroundRepeat::NoRepeat => (false, false),
        };
        let sx = if repeat_x { x.rem_euclid(w) } else { x };
        let sy = if repeat_y { y.rem_euclid(h) } else { y };
        if sx < 0 || sy < 0 || sx >= w || sy >= h {
            return None;
        }
        Some(*image.get_pixel(sx as u32, sy as u32))
    }

    /// Render the description into a standalone image.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width.max(0) as u32, self.height.max(0) as u32, |x, y| {
            self.pixel(x as i32, y as i32)
        })
    }

    /// Composite onto `surface` with the top-left corner at `(x, y)`.
    /// Pixels outside the surface are skipped.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn draw(&self, surface: &mut RgbaImage, x: i32, y: i32) {
        if self.is_invisible() {
            return;
        }
        let (sw, sh) = (surface.width() as i32, surface.height() as i32);
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + self.width).min(sw);
        let y1 = (y + self.height).min(sh);
        for dy in y0..y1 {
            for dx in x0..x1 {
                let src = self.pixel(dx - x, dy - y);
                if src[3] > 0 {
                    blend(surface.get_pixel_mut(dx as u32, dy as u32), src);
                }
            }
        }
    }
}
