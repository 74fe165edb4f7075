//! The draw pass.
//!
//! [Appendix E. Elaborate description of Stacking Contexts](https://www.w3.org/TR/CSS2/zindex.html)
//!
//! Painting walks the laid-out tree and composites onto an RGBA surface in
//! the order CSS stacks non-positioned content:
//!
//! 1. the block's background and borders
//! 2. replaced content
//! 3. in-flow block children
//! 4. floats
//! 5. inline content, line box by line box
//!
//! Nothing here changes the tree. Every node reached must already be laid
//! out.

use image::{Rgba, RgbaImage};
use kestrel_dom::NodeId;
use thiserror::Error;

use crate::box_model::Rect;
use crate::layout::{LayoutContext, LayoutTree, LineBox, LineContent};
use crate::units::TRANSPARENT;

/// Reasons a draw pass stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The cancel token was set.
    #[error("draw cancelled")]
    Cancelled,

    /// A node on the draw path has no geometry.
    #[error("node {0:?} has not been laid out")]
    NotLaidOut(NodeId),
}

/// [Compositing § 9.1.1 Source Over](https://www.w3.org/TR/compositing-1/#porterduffcompositingoperators_srcover)
///
/// Composite `src` over `dst` in place. Colours are not premultiplied.
#[allow(clippy::cast_possible_truncation)]
pub fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let src_alpha = u32::from(src[3]);
    if src_alpha == 0 {
        return;
    }
    if src_alpha == 255 {
        *dst = src;
        return;
    }
    let dst_alpha = u32::from(dst[3]) * (255 - src_alpha) / 255;
    let out_alpha = src_alpha + dst_alpha;
    if out_alpha == 0 {
        *dst = TRANSPARENT;
        return;
    }
    for channel in 0..3 {
        let value = (u32::from(src[channel]) * src_alpha + u32::from(dst[channel]) * dst_alpha)
            / out_alpha;
        dst[channel] = value.min(255) as u8;
    }
    dst[3] = out_alpha.min(255) as u8;
}

/// Paint the whole document with the viewport scrolled to `scroll`.
///
/// # Errors
///
/// See [`draw`].
pub fn render(
    tree: &LayoutTree,
    surface: &mut RgbaImage,
    scroll: (i32, i32),
    ctx: &LayoutContext<'_>,
) -> Result<(), DrawError> {
    tracing::debug!(width = surface.width(), height = surface.height(), ?scroll, "draw pass");
    draw(tree, tree.root(), surface, (-scroll.0, -scroll.1), ctx)
}

/// Paint `node` and its content. `origin` is the surface position of the
/// content box of the block `node` was laid out in.
///
/// # Errors
///
/// [`DrawError::NotLaidOut`] when `node` or anything it contains lacks
/// geometry, [`DrawError::Cancelled`] when the context's token is set.
/// Pixels painted before the error stay painted.
pub fn draw(
    tree: &LayoutTree,
    node: NodeId,
    surface: &mut RgbaImage,
    origin: (i32, i32),
    ctx: &LayoutContext<'_>,
) -> Result<(), DrawError> {
    check_cancelled(ctx)?;
    let layout = tree
        .node(node)
        .filter(|n| n.is_laid_out())
        .ok_or(DrawError::NotLaidOut(node))?;

    let x = origin.0 + layout.draw_rect.x;
    let y = origin.1 + layout.draw_rect.y;

    // STEP 1: Background and borders. The outer box has no room for
    // negative margins, so it starts at the border edge.
    if let Some(outer) = &layout.outer_box {
        let top = if layout.is_float { layout.margin.top.min(0) } else { 0 };
        outer.draw(surface, x + layout.margin.left.min(0), y + top);
    }

    let content = (x + layout.content_rect.x, y + layout.content_rect.y);

    // STEP 2: Replaced content.
    if let Some(image) = &layout.image {
        composite(surface, image, content.0, content.1);
    }

    // STEP 3: Block children.
    for child in &layout.block_children {
        draw(tree, *child, surface, content, ctx)?;
    }

    // STEP 4: Floats.
    for float in &layout.floats {
        draw(tree, *float, surface, content, ctx)?;
    }

    // STEP 5: Inline content.
    for line_box in &layout.line_boxes {
        check_cancelled(ctx)?;
        draw_line_box(tree, line_box, surface, content, ctx)?;
    }
    Ok(())
}

fn draw_line_box(
    tree: &LayoutTree,
    line_box: &LineBox,
    surface: &mut RgbaImage,
    origin: (i32, i32),
    ctx: &LayoutContext<'_>,
) -> Result<(), DrawError> {
    let rect = line_box.rect.translate(origin.0, origin.1);
    match &line_box.content {
        LineContent::Text(text) => {
            if line_box.background[3] > 0 {
                fill(surface, rect, line_box.background);
            }
            let (Some(font), Some(metrics)) = (&line_box.font, line_box.metrics) else {
                return Ok(());
            };
            if let Some(glyphs) = ctx.shaper.rasterize(text, font, line_box.color) {
                composite(surface, &glyphs, rect.x, rect.y);
            }
            if line_box.underline {
                // One pixel below the baseline, thickening with the font.
                let thickness = (font.size / 16).max(1);
                let underline = Rect::new(rect.x, rect.y + metrics.ascent + 1, rect.width, thickness);
                fill(surface, underline, line_box.color);
            }
            Ok(())
        }
        LineContent::Image(node) | LineContent::InlineBlock(node) => {
            draw(tree, *node, surface, origin, ctx)
        }
    }
}

fn check_cancelled(ctx: &LayoutContext<'_>) -> Result<(), DrawError> {
    if ctx.cancel.is_cancelled() {
        Err(DrawError::Cancelled)
    } else {
        Ok(())
    }
}

/// The part of `rect` that lies on `surface`, as pixel ranges.
#[allow(clippy::cast_possible_wrap)]
fn clip(surface: &RgbaImage, rect: Rect) -> Option<(std::ops::Range<i32>, std::ops::Range<i32>)> {
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = rect.right().min(surface.width() as i32);
    let y1 = rect.bottom().min(surface.height() as i32);
    (x0 < x1 && y0 < y1).then_some((x0..x1, y0..y1))
}

#[allow(clippy::cast_sign_loss)]
fn fill(surface: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let Some((xs, ys)) = clip(surface, rect) else {
        return;
    };
    for py in ys {
        for px in xs.clone() {
            blend(surface.get_pixel_mut(px as u32, py as u32), color);
        }
    }
}

/// Blend `image` onto `surface` with its top-left corner at `(x, y)`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn composite(surface: &mut RgbaImage, image: &RgbaImage, x: i32, y: i32) {
    let rect = Rect::new(x, y, image.width() as i32, image.height() as i32);
    let Some((xs, ys)) = clip(surface, rect) else {
        return;
    };
    for py in ys {
        for px in xs.clone() {
            let src = *image.get_pixel((px - x) as u32, (py - y) as u32);
            blend(surface.get_pixel_mut(px as u32, py as u32), src);
        }
    }
}
