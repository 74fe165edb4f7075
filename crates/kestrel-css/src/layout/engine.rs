//! Block flow, inline flow and float placement.
//!
//! [§ 9.4 Normal flow](https://www.w3.org/TR/CSS2/visuren.html#normal-flow)
//!
//! "Boxes in the normal flow belong to a formatting context, which may be
//! block or inline, but not both simultaneously."
//!
//! This engine does not build anonymous block boxes. A block walks its
//! children in document order: block-level children are stacked
//! vertically, and the inline content between them fills line boxes owned
//! by the block itself. Floats are taken out of the flow and pushed to the
//! side of the block they appear in.
//!
//! Every block keeps its working state in a [`BlockState`] for the
//! duration of one [`LayoutTree::layout_block`] call and moves the results
//! into its [`LayoutNode`](super::LayoutNode) when done.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use kestrel_dom::{NodeId, NodeType};

use super::float::FloatStack;
use super::line::{LineBox, LineContent, align_line, align_shift};
use super::margin::CollapsibleMargin;
use super::text::{first_letter_len, space_after, words};
use super::tree::LayoutTree;
use super::{FontMetrics, LayoutContext, LayoutError};
use crate::box_model::{OuterBox, Rect, UsedBox};
use crate::image_map::ImageMap;
use crate::style::{
    Clear, Display, Float, Property, ResolvedStyle, StyleContext, TextAlign, VerticalAlign,
    WhiteSpace,
};
use crate::units::{self, TRANSPARENT};

/// Upper bound on placement attempts for one float.
const MAX_FLOAT_PASSES: usize = 64;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Working state of one block while its children are laid out.
///
/// Coordinates are in the block's content box. The "dot" is the insertion
/// point: the left end of the next run on the current line, and the top of
/// the current line.
struct BlockState {
    owner: NodeId,
    width: i32,
    dot_x: i32,
    dot_y: i32,
    /// Bottom margin of the last block child, waiting to collapse with
    /// whatever comes next.
    pending_margin: CollapsibleMargin,
    /// Index of the first line box of the current line.
    line_start: usize,
    line_boxes: Vec<LineBox>,
    image_map: ImageMap,
    block_children: Vec<NodeId>,
    floats: Vec<NodeId>,
    left: FloatStack,
    right: FloatStack,
    /// A float may not be placed higher than an earlier one.
    last_float_top: i32,
    float_bottom: i32,
    first_line: bool,
    first_letter_pending: bool,
    /// Gap owed before the next run on this line.
    pending_space: i32,
    /// Background colours of the open inline elements.
    backgrounds: Vec<Rgba<u8>>,
    text_indent: i32,
    text_align: TextAlign,
    strut: FontMetrics,
    strut_line_height: i32,
    /// Floats that did not fit beside the current line, in document order.
    /// They are placed when the line completes.
    deferred_floats: Vec<DeferredFloat>,
}

/// A laid-out float still waiting for a position.
struct DeferredFloat {
    node: NodeId,
    side: Float,
    width: i32,
    height: i32,
}

impl BlockState {
    fn new(
        owner: NodeId,
        width: i32,
        left: FloatStack,
        right: FloatStack,
        style: &ResolvedStyle,
        ctx: &LayoutContext<'_>,
    ) -> Self {
        let font_size = style.font_size();
        let strut = ctx.shaper.metrics(&style.font());
        let text_indent =
            units::parse_length(style.value(Property::TextIndent), font_size, width).unwrap_or(0);
        let strut_line_height = units::parse_line_height(style.value(Property::LineHeight), font_size)
            .unwrap_or_else(|| strut.line_height());
        let dot_x = left.left_edge(0, 1) + text_indent;

        Self {
            owner,
            width,
            dot_x,
            dot_y: 0,
            pending_margin: CollapsibleMargin::default(),
            line_start: 0,
            line_boxes: Vec::new(),
            image_map: ImageMap::new(),
            block_children: Vec::new(),
            floats: Vec::new(),
            left,
            right,
            last_float_top: 0,
            float_bottom: 0,
            first_line: true,
            first_letter_pending: true,
            pending_space: 0,
            backgrounds: Vec::new(),
            text_indent,
            text_align: style.text_align(),
            strut,
            strut_line_height,
            deferred_floats: Vec::new(),
        }
    }

    fn line_is_empty(&self) -> bool {
        self.line_boxes.len() == self.line_start
    }

    fn current_line(&self) -> &[LineBox] {
        &self.line_boxes[self.line_start..]
    }

    fn line_left(&self, height: i32) -> i32 {
        self.left.left_edge(self.dot_y, height)
    }

    fn line_right(&self, height: i32) -> i32 {
        self.right.right_edge(self.dot_y, height, self.width)
    }

    /// Whether floats shorten the line at the dot.
    fn narrowed(&self, height: i32) -> bool {
        self.line_left(height) > 0 || self.line_right(height) < self.width
    }

    fn next_float_bottom(&self, y: i32) -> Option<i32> {
        match (self.left.next_bottom_after(y), self.right.next_bottom_after(y)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Move an empty line down to where the next float ends.
    fn drop_below_next_float(&mut self) -> bool {
        match self.next_float_bottom(self.dot_y) {
            Some(y) => {
                self.dot_y = y;
                self.start_line();
                true
            }
            None => false,
        }
    }

    /// Put the dot at the start of a fresh line at the current `dot_y`.
    fn start_line(&mut self) {
        self.left.retire(self.dot_y);
        self.right.retire(self.dot_y);
        let indent = if self.first_line { self.text_indent } else { 0 };
        self.dot_x = self.line_left(1) + indent;
        self.pending_space = 0;
    }

    /// Inline content after a block child: the child's bottom margin is
    /// spent here.
    fn flush_pending_margin(&mut self) {
        if self.pending_margin != CollapsibleMargin::default() {
            self.dot_y += self.pending_margin.resolve();
            self.pending_margin = CollapsibleMargin::default();
            self.start_line();
        }
    }

    fn background(&self) -> Rgba<u8> {
        self.backgrounds.last().copied().unwrap_or(TRANSPARENT)
    }

    /// Horizontal extent of the current line's boxes over the full height
    /// the line will take once aligned.
    fn current_line_rect(&self) -> Rect {
        let boxes = self.current_line();
        let x0 = boxes.iter().map(|b| b.rect.x).min().unwrap_or(self.dot_x);
        let x1 = boxes.iter().map(|b| b.rect.right()).max().unwrap_or(self.dot_x);
        let height = align_line(boxes, &self.strut).advance;
        Rect::from_corners(x0, self.dot_y, x1, self.dot_y + height)
    }

    /// Height of the band a box of `height` keeps clear of floats. Alignment
    /// can move it anywhere within the block's line height.
    fn band(&self, height: i32) -> i32 {
        height.max(self.strut_line_height)
    }

    fn shift_current_line(&mut self, dx: i32) {
        let start = self.line_start;
        for line_box in &mut self.line_boxes[start..] {
            line_box.rect.x += dx;
        }
        self.dot_x += dx;
    }

    /// [§ 9.5.1 Positioning the float](https://www.w3.org/TR/CSS2/visuren.html#float-position)
    ///
    /// Find the margin box position of a `width` x `height` float, or
    /// `None` when it has to wait until the current line is complete.
    fn place_float(&mut self, side: Float, width: i32, height: i32) -> Option<Rect> {
        // "The outer top of a floating box may not be higher than the outer
        // top of any block or floated box generated by an element earlier in
        // the source document."
        if !self.deferred_floats.is_empty() && !self.line_is_empty() {
            return None;
        }
        let mut y = self.last_float_top.max(self.dot_y);
        let mut passes = 0;
        loop {
            passes += 1;
            let settle = passes >= MAX_FLOAT_PASSES;
            let left = self.left.left_edge(y, height);
            let right = self.right.right_edge(y, height, self.width);
            let narrowed = left > 0 || right < self.width;

            // STEP 1: Not enough room beside the existing floats: try below
            // the next one to end.
            if width > right - left && narrowed && !settle {
                if let Some(next) = self.next_float_bottom(y) {
                    y = next;
                    continue;
                }
            }

            let x = if side == Float::Right { right - width } else { left };
            let rect = Rect::new(x, y, width, height);

            // STEP 2: The float may not cover boxes already on the current
            // line. A left float pushes the line right if it still fits;
            // otherwise it goes below the line, whose bottom is only known
            // once the line is complete.
            if !settle && !self.line_is_empty() {
                if y > self.dot_y {
                    return None;
                }
                let line = self.current_line_rect();
                if rect.intersects(&line) {
                    let shift = rect.right() - line.x;
                    let line_right = self.right.right_edge(line.y, line.height, self.width);
                    if side == Float::Left && line.right() + shift <= line_right {
                        self.shift_current_line(shift);
                    } else {
                        return None;
                    }
                }
            }
            return Some(rect);
        }
    }

    /// Height of the content area: the flow plus any floats hanging below.
    fn content_height(&self) -> i32 {
        let flow = self.dot_y + self.pending_margin.resolve().max(0);
        flow.max(self.float_bottom).max(0)
    }
}

/// A text node being placed: the node, the element its line boxes report,
/// and how it wraps.
struct TextRun {
    node: NodeId,
    owner: NodeId,
    vertical_align: VerticalAlign,
    wrap: bool,
}

/// Content of an `<img>` at its used size.
struct ReplacedContent {
    image: Option<Arc<RgbaImage>>,
    width: i32,
    height: i32,
}

impl LayoutTree {
    /// [§ 10 Visual formatting model details](https://www.w3.org/TR/CSS2/visudet.html)
    ///
    /// Lay out the whole document in a viewport `viewport_width` pixels
    /// wide. A second call with the same width is a no-op; a different
    /// width invalidates everything first.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Cancelled`] when the context's token is set, and
    /// [`LayoutError::NoRoom`] when text meets a line with no usable width.
    /// Subtrees finished before the error stay laid out; the next call
    /// resumes with the rest.
    pub fn layout(&mut self, viewport_width: i32, ctx: &LayoutContext<'_>) -> Result<(), LayoutError> {
        if self.viewport_width != Some(viewport_width) {
            if self.viewport_width.is_some() {
                self.invalidate_all();
            }
            self.viewport_width = Some(viewport_width);
        }
        if self.is_laid_out() {
            return Ok(());
        }

        tracing::debug!(viewport_width, nodes = self.nodes.len(), "layout pass");
        let root = self.root();
        self.layout_block(root, viewport_width, FloatStack::new(), FloatStack::new(), None, ctx)?;
        if let Some(node) = self.node_mut(root) {
            node.draw_rect.x = 0;
            node.draw_rect.y = 0;
            node.container = None;
        }
        Ok(())
    }

    /// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
    ///
    /// Lay out `id` as a block inside a containing block `container_width`
    /// wide. `left` and `right` are the containing block's floats in this
    /// block's content coordinates. `forced_width` fixes the content width
    /// (shrink-to-fit).
    ///
    /// Sets the draw rectangle's size; the caller positions it.
    fn layout_block(
        &mut self,
        id: NodeId,
        container_width: i32,
        left: FloatStack,
        right: FloatStack,
        forced_width: Option<i32>,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        ctx.check_cancelled()?;
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if node.layout_done {
            return Ok(());
        }
        let style = node.styles.unconditional.clone();
        let is_float = id != self.root() && style.float() != Float::None;

        // STEP 1: Horizontal dimensions.
        let replaced = self
            .is_replaced(id)
            .then(|| self.replaced_content(id, &style, container_width, ctx));
        let used = match (forced_width, &replaced) {
            (Some(width), _) => UsedBox::resolve_with_width(&style, container_width, width),
            (None, Some(content)) => {
                UsedBox::resolve_with_width(&style, container_width, content.width)
            }
            (None, None) => UsedBox::resolve(&style, container_width),
        };
        let auto_width = replaced.is_none()
            && units::parse_length(style.value(Property::Width), style.font_size(), container_width)
                .is_none();

        // STEP 2: Children, or the replaced content.
        let (content_height, flow) = match &replaced {
            Some(content) => (content.height, None),
            None => {
                let mut state = BlockState::new(id, used.width, left, right, &style, ctx);
                let children = self.dom.children(id).to_vec();
                for child in children {
                    self.layout_child(&mut state, child, ctx)?;
                }
                self.advance_line(&mut state, false, ctx)?;
                (state.content_height(), Some(state))
            }
        };

        // STEP 3: Height.
        // [§ 10.6.3](https://www.w3.org/TR/CSS2/visudet.html#normal-block)
        let height = used
            .height
            .unwrap_or_else(|| used.clamp_height(content_height));

        // STEP 4: Frame and output.
        let background_image = units::parse_url(style.value(Property::BackgroundImage))
            .and_then(|href| ctx.image(href));
        let outer = OuterBox::build(&style, &used, height, is_float, background_image);
        let (content_x, content_y) = used.content_offset(is_float);
        let vertical_margins = if is_float { used.margin.vertical() } else { 0 };
        let draw_width = used.outer_width();
        let draw_height = vertical_margins + used.frame().vertical() + height;

        let Some(node) = self.node_mut(id) else {
            return Ok(());
        };
        node.draw_rect = Rect::new(0, 0, draw_width, draw_height);
        node.content_rect = Rect::new(content_x, content_y, used.width, height);
        node.margin = used.margin;
        node.is_float = is_float;
        node.auto_width = auto_width;
        node.outer_box = (!outer.is_invisible()).then_some(outer);
        node.image = replaced.and_then(|content| content.image);
        if let Some(state) = flow {
            node.line_boxes = state.line_boxes;
            node.image_map = state.image_map;
            node.block_children = state.block_children;
            node.floats = state.floats;
            node.left_floats = state.left;
            node.right_floats = state.right;
        }
        node.layout_done = true;

        tracing::trace!(node = ?id, width = draw_width, height = draw_height, "block laid out");
        Ok(())
    }

    /// Dispatch one child of the block `state` belongs to.
    fn layout_child(
        &mut self,
        state: &mut BlockState,
        child: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        ctx.check_cancelled()?;
        let Some(node) = self.dom.get(child) else {
            return Ok(());
        };
        let tag = match &node.node_type {
            NodeType::Text(_) => return self.layout_text(state, child, ctx),
            NodeType::Element(element) => element.tag_name.to_ascii_lowercase(),
            NodeType::Document | NodeType::Comment(_) => return Ok(()),
        };
        let Some(style) = self.node(child).map(|n| n.styles.unconditional.clone()) else {
            return Ok(());
        };

        let display = style.display();
        if display == Display::None {
            self.mark_done(child);
            return Ok(());
        }
        if tag == "br" {
            self.mark_done(child);
            return self.advance_line(state, true, ctx);
        }

        let float = style.float();
        if float != Float::None {
            self.layout_float(state, child, float, ctx)
        } else if display.is_block_level() {
            self.layout_block_child(state, child, &style, ctx)
        } else if display == Display::InlineBlock || tag == "img" {
            self.layout_atomic(state, child, &style, ctx)
        } else {
            self.layout_inline(state, child, &style, ctx)
        }
    }

    fn mark_done(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.layout_done = true;
        }
    }

    fn is_replaced(&self, id: NodeId) -> bool {
        self.dom
            .as_element(id)
            .is_some_and(|element| element.tag_name.eq_ignore_ascii_case("img"))
    }

    /// [§ 9.5.2 Controlling flow next to floats](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
    ///
    /// Stack a block-level child below the previous content. The child's
    /// border box starts beside any floats at its top edge.
    fn layout_block_child(
        &mut self,
        state: &mut BlockState,
        child: NodeId,
        style: &ResolvedStyle,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        self.advance_line(state, false, ctx)?;

        // STEP 1: Collapse the top margin with the pending one, then clear.
        let margin_top = UsedBox::resolve(style, state.width).margin.top;
        let collapsed = state.pending_margin.adjoin(margin_top);
        let mut y = state.dot_y + collapsed.resolve();
        let clearance = match style.clear() {
            Clear::None => None,
            Clear::Left => state.left.bottom(),
            Clear::Right => state.right.bottom(),
            Clear::Both => state.left.bottom().max(state.right.bottom()),
        };
        let cleared = clearance.is_some_and(|bottom| bottom > y);
        if let Some(bottom) = clearance {
            y = y.max(bottom);
        }

        // STEP 2: Lay out in the band between the floats.
        let x = state.left.left_edge(y, 1);
        let available = state.right.right_edge(y, 1, state.width) - x;
        let (content_x, content_y) = UsedBox::resolve(style, available).content_offset(false);
        let (dx, dy) = (-(x + content_x), -(y + content_y));
        self.layout_block(
            child,
            available,
            state.left.translated(dx, dy),
            state.right.translated(dx, dy),
            None,
            ctx,
        )?;

        // STEP 3: Position and merge.
        let Some(node) = self.node_mut(child) else {
            return Ok(());
        };
        node.draw_rect.x = x;
        node.draw_rect.y = y;
        node.container = Some(state.owner);
        let rect = node.draw_rect;
        let content = node.content_rect;

        if rect.height == 0 && !cleared {
            // An empty block's own margins collapse through it.
            state.pending_margin = collapsed.adjoin(node.margin.bottom);
        } else {
            state.dot_y = rect.bottom();
            state.pending_margin = CollapsibleMargin::new(node.margin.bottom);
        }
        state.image_map.add(rect, child, false);
        state
            .image_map
            .extend_translated(&node.image_map, rect.x + content.x, rect.y + content.y);
        state.block_children.push(child);
        state.first_line = false;
        state.first_letter_pending = false;
        state.start_line();
        Ok(())
    }

    /// [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
    fn layout_float(
        &mut self,
        state: &mut BlockState,
        child: NodeId,
        side: Float,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        self.shrink_to_fit(child, state.width, ctx)?;
        let Some(node) = self.node(child) else {
            return Ok(());
        };
        let size = node.draw_rect;
        let Some(rect) = state.place_float(side, size.width, size.height) else {
            tracing::trace!(node = ?child, ?side, "float deferred to the next line");
            state.deferred_floats.push(DeferredFloat {
                node: child,
                side,
                width: size.width,
                height: size.height,
            });
            return Ok(());
        };
        self.commit_float(state, child, side, rect);
        Ok(())
    }

    /// Record a positioned float in the block's float stacks and image map.
    fn commit_float(&mut self, state: &mut BlockState, child: NodeId, side: Float, rect: Rect) {
        if let Some(node) = self.node_mut(child) {
            node.draw_rect = rect;
            node.container = Some(state.owner);
        }
        if side == Float::Right {
            state.right.push(Some(child), rect);
        } else {
            state.left.push(Some(child), rect);
        }
        state.last_float_top = rect.y;
        state.float_bottom = state.float_bottom.max(rect.bottom());
        state.floats.push(child);
        state.image_map.add(rect, child, true);

        tracing::trace!(node = ?child, ?side, x = rect.x, y = rect.y, "float placed");
    }

    /// Place the floats held back by the line that just completed.
    fn place_deferred_floats(&mut self, state: &mut BlockState) {
        for pending in std::mem::take(&mut state.deferred_floats) {
            match state.place_float(pending.side, pending.width, pending.height) {
                Some(rect) => self.commit_float(state, pending.node, pending.side, rect),
                None => state.deferred_floats.push(pending),
            }
        }
    }

    /// [§ 10.3.5 Floating, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#float-width)
    ///
    /// "If 'width' is computed as 'auto', the used value is the
    /// 'shrink-to-fit' width."
    ///
    /// Lay out once at the available width, measure how far the content
    /// reaches, and lay out again at that width when it is narrower.
    fn shrink_to_fit(
        &mut self,
        id: NodeId,
        available: i32,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        self.layout_block(id, available, FloatStack::new(), FloatStack::new(), None, ctx)?;
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if !node.auto_width {
            return Ok(());
        }
        let preferred = self.preferred_width(id);
        if preferred < node.content_rect.width {
            self.invalidate_subtree(id);
            self.layout_block(id, available, FloatStack::new(), FloatStack::new(), Some(preferred), ctx)?;
        }
        Ok(())
    }

    /// Rightmost extent of a laid-out block's content.
    fn preferred_width(&self, id: NodeId) -> i32 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        let lines = node.line_boxes.iter().map(|b| b.rect.right());
        let floats = node
            .floats
            .iter()
            .filter_map(|f| self.node(*f))
            .map(|f| f.draw_rect.right());
        let blocks = node.block_children.iter().filter_map(|&child| {
            let layout = self.node(child)?;
            Some(if layout.auto_width {
                let frame = layout.draw_rect.width - layout.content_rect.width;
                layout.draw_rect.x + frame + self.preferred_width(child)
            } else {
                layout.draw_rect.right()
            })
        });
        lines.chain(floats).chain(blocks).max().unwrap_or(0).max(0)
    }

    /// An `inline-block` or inline `<img>`: one box on the line, laid out
    /// as its own block.
    fn layout_atomic(
        &mut self,
        state: &mut BlockState,
        child: NodeId,
        style: &ResolvedStyle,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        state.flush_pending_margin();
        let content = if self.is_replaced(child) {
            LineContent::Image(child)
        } else {
            LineContent::InlineBlock(child)
        };

        loop {
            ctx.check_cancelled()?;
            let available = (state.line_right(1) - state.line_left(1)).max(0);
            match self.shrink_to_fit(child, available, ctx) {
                Err(LayoutError::NoRoom { .. }) if !state.line_is_empty() => {
                    self.invalidate_subtree(child);
                    self.advance_line(state, false, ctx)?;
                    continue;
                }
                result => result?,
            }

            let Some(node) = self.node(child) else {
                return Ok(());
            };
            let width = node.draw_rect.width;
            let height = node.draw_rect.height + node.margin.vertical();
            let band = state.band(height);
            let empty = state.line_is_empty();
            let x = if empty {
                state.dot_x.max(state.line_left(band))
            } else {
                state.dot_x + state.pending_space
            };

            if x + width > state.line_right(band) {
                if !empty {
                    self.invalidate_subtree(child);
                    self.advance_line(state, false, ctx)?;
                    continue;
                }
                if state.narrowed(band) && state.drop_below_next_float() {
                    self.invalidate_subtree(child);
                    continue;
                }
            }

            let color = units::parse_color(style.value(Property::Color), BLACK).unwrap_or(BLACK);
            state.line_boxes.push(LineBox {
                node: child,
                rect: Rect::new(x, state.dot_y, width, height),
                content,
                font: None,
                metrics: None,
                line_height: height,
                vertical_align: style.vertical_align(),
                color,
                background: state.background(),
                underline: false,
            });
            state.dot_x = x + width;
            state.pending_space = 0;
            state.first_letter_pending = false;
            if let Some(node) = self.node_mut(child) {
                node.container = Some(state.owner);
            }
            return Ok(());
        }
    }

    /// [§ 10.3.1 Inline, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-width)
    ///
    /// An inline element adds its left and right margin, border and
    /// padding to the line around its content.
    fn layout_inline(
        &mut self,
        state: &mut BlockState,
        child: NodeId,
        style: &ResolvedStyle,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        let used = UsedBox::resolve(style, state.width);
        let frame = used.frame();
        let lead = used.margin.left + frame.left;
        if lead != 0 {
            state.flush_pending_margin();
            if !state.line_is_empty() {
                state.dot_x += state.pending_space;
                state.pending_space = 0;
            }
            state.dot_x += lead;
        }

        let background = units::parse_color(style.value(Property::BackgroundColor), TRANSPARENT)
            .filter(|color| color[3] > 0)
            .unwrap_or_else(|| state.background());
        state.backgrounds.push(background);

        let children = self.dom.children(child).to_vec();
        let result = children
            .into_iter()
            .try_for_each(|grandchild| self.layout_child(state, grandchild, ctx));
        let _ = state.backgrounds.pop();
        result?;

        state.dot_x += used.margin.right + frame.right;
        if let Some(node) = self.node_mut(child) {
            node.margin = used.margin;
            node.layout_done = true;
        }
        Ok(())
    }

    /// [§ 16.6 White space](https://www.w3.org/TR/CSS2/text.html#white-space-prop)
    fn layout_text(
        &mut self,
        state: &mut BlockState,
        id: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        let Some(text) = self.dom.as_text(id).map(str::to_owned) else {
            return Ok(());
        };
        let owner = self.dom.parent(id).unwrap_or(state.owner);
        let white_space = self
            .node(id)
            .map_or(WhiteSpace::Normal, |n| n.styles.unconditional.white_space());
        let vertical_align = if owner == state.owner {
            VerticalAlign::Baseline
        } else {
            self.node(owner)
                .map_or(VerticalAlign::Baseline, |n| n.styles.unconditional.vertical_align())
        };
        let mut run = TextRun {
            node: id,
            owner,
            vertical_align,
            wrap: true,
        };

        match white_space {
            WhiteSpace::Normal => self.place_words(state, &run, &text, ctx)?,
            WhiteSpace::Nowrap => {
                run.wrap = false;
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                self.note_leading_space(state, &run, &text);
                if !collapsed.is_empty() {
                    let gap = text.ends_with(char::is_whitespace);
                    self.place_word(state, &run, &collapsed, gap, ctx)?;
                }
            }
            WhiteSpace::Pre => {
                run.wrap = false;
                for (index, line) in text.split('\n').enumerate() {
                    if index > 0 {
                        self.advance_line(state, true, ctx)?;
                    }
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        self.place_word(state, &run, line, false, ctx)?;
                    }
                }
            }
            WhiteSpace::PreWrap | WhiteSpace::PreLine => {
                for (index, line) in text.split('\n').enumerate() {
                    if index > 0 {
                        self.advance_line(state, true, ctx)?;
                    }
                    self.place_words(state, &run, line, ctx)?;
                }
            }
        }

        self.mark_done(id);
        Ok(())
    }

    fn text_style<'t>(&'t self, state: &BlockState, id: NodeId) -> Option<&'t ResolvedStyle> {
        let context = if state.first_line {
            StyleContext::FirstLine
        } else {
            StyleContext::Unconditional
        };
        self.node(id).map(|n| n.styles.get(context))
    }

    /// White space at the start of a text node separates it from whatever
    /// is already on the line.
    fn note_leading_space(&self, state: &mut BlockState, run: &TextRun, text: &str) {
        if text.starts_with(char::is_whitespace)
            && !state.line_is_empty()
            && state.pending_space == 0
        {
            let size = self.text_style(state, run.node).map_or(0, ResolvedStyle::font_size);
            state.pending_space = space_after("", size);
        }
    }

    fn place_words(
        &mut self,
        state: &mut BlockState,
        run: &TextRun,
        text: &str,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        self.note_leading_space(state, run, text);
        for word in words(text) {
            self.place_word(state, run, word.text, word.space_after, ctx)?;
        }
        Ok(())
    }

    /// Place one unbreakable piece of text, splitting off the
    /// `::first-letter` when it is due.
    fn place_word(
        &mut self,
        state: &mut BlockState,
        run: &TextRun,
        word: &str,
        gap_after: bool,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        let first_letter_due = state.first_letter_pending
            && state.first_line
            && self
                .node(run.node)
                .is_some_and(|n| n.styles.has_first_letter());
        state.first_letter_pending = false;

        if first_letter_due {
            let (letter, rest) = word.split_at(first_letter_len(word));
            self.place_piece(
                state,
                run,
                letter,
                Some(StyleContext::FirstLetter),
                rest.is_empty() && gap_after,
                ctx,
            )?;
            if rest.is_empty() {
                return Ok(());
            }
            return self.place_piece(state, run, rest, None, gap_after, ctx);
        }
        self.place_piece(state, run, word, None, gap_after, ctx)
    }

    fn place_piece(
        &mut self,
        state: &mut BlockState,
        run: &TextRun,
        text: &str,
        context: Option<StyleContext>,
        gap_after: bool,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        state.flush_pending_margin();
        loop {
            ctx.check_cancelled()?;
            let context = context.unwrap_or(if state.first_line {
                StyleContext::FirstLine
            } else {
                StyleContext::Unconditional
            });
            let Some(style) = self.node(run.node).map(|n| n.styles.get(context)) else {
                return Ok(());
            };
            let font = style.font();
            let metrics = ctx.shaper.metrics(&font);
            let line_height = units::parse_line_height(style.value(Property::LineHeight), font.size)
                .unwrap_or_else(|| metrics.line_height());
            let color = units::parse_color(style.value(Property::Color), BLACK).unwrap_or(BLACK);
            let underline = style.underline();

            let width = ctx.shaper.measure(text, &font);
            let height = metrics.height();
            let band = state.band(height.max(line_height));
            let empty = state.line_is_empty();
            let left = state.line_left(band);
            let right = state.line_right(band);
            let x = if empty {
                state.dot_x.max(left)
            } else {
                state.dot_x + state.pending_space
            };

            if run.wrap && x + width > right {
                if !empty {
                    self.advance_line(state, false, ctx)?;
                    continue;
                }
                if state.narrowed(band) && state.drop_below_next_float() {
                    continue;
                }
                if right - left <= 0 {
                    tracing::error!(node = ?run.owner, width = right - left, "no room for text");
                    return Err(LayoutError::NoRoom {
                        node: run.owner,
                        width: right - left,
                    });
                }
                // An empty line at full width: let the word overflow.
            }

            let gap = if gap_after { space_after(text, font.size) } else { 0 };
            state.line_boxes.push(LineBox {
                node: run.owner,
                rect: Rect::new(x, state.dot_y, width, height),
                content: LineContent::Text(text.to_owned()),
                font: Some(font),
                metrics: Some(metrics),
                line_height,
                vertical_align: run.vertical_align,
                color,
                background: state.background(),
                underline,
            });
            state.dot_x = x + width;
            state.pending_space = gap;
            return Ok(());
        }
    }

    /// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
    ///
    /// Complete the current line: align its boxes, record them in the image
    /// map and move the dot to the next line. A forced break on an empty
    /// line still advances by the block's line height.
    fn advance_line(
        &mut self,
        state: &mut BlockState,
        forced: bool,
        ctx: &LayoutContext<'_>,
    ) -> Result<(), LayoutError> {
        if state.line_is_empty() {
            if forced {
                state.flush_pending_margin();
                state.dot_y += state.strut_line_height;
                state.first_line = false;
                state.start_line();
            }
            return Ok(());
        }

        let start = state.line_start;
        let top = state.dot_y;

        // STEP 1: Vertical alignment.
        let geometry = align_line(&state.line_boxes[start..], &state.strut);

        // STEP 2: Horizontal alignment.
        let content_right = state.line_boxes[start..]
            .iter()
            .map(|b| b.rect.right())
            .max()
            .unwrap_or(0);
        let line_right = state.right.right_edge(top, geometry.advance, state.width);
        let shift = align_shift(state.text_align, content_right, line_right);

        for (line_box, offset) in state.line_boxes[start..].iter_mut().zip(&geometry.offsets) {
            line_box.rect.x += shift;
            line_box.rect.y = top + offset;
        }

        // STEP 3: Emit. Atomic boxes learn their final position here.
        for line_box in &state.line_boxes[start..] {
            ctx.check_cancelled()?;
            state.image_map.add(line_box.rect, line_box.node, false);
            let Some(atomic) = line_box.atomic_node() else {
                continue;
            };
            if let Some(node) = self.node_mut(atomic) {
                node.draw_rect.x = line_box.rect.x;
                node.draw_rect.y = line_box.rect.y + node.margin.top;
                node.container = Some(state.owner);
                let origin = (
                    node.draw_rect.x + node.content_rect.x,
                    node.draw_rect.y + node.content_rect.y,
                );
                state
                    .image_map
                    .extend_translated(&node.image_map, origin.0, origin.1);
            }
        }

        tracing::trace!(
            owner = ?state.owner,
            top,
            advance = geometry.advance,
            boxes = state.line_boxes.len() - start,
            "line completed"
        );

        // STEP 4: Next line. Floats that waited for this line go first.
        state.dot_y = top + geometry.advance;
        state.line_start = state.line_boxes.len();
        state.first_line = false;
        state.first_letter_pending = false;
        self.place_deferred_floats(state);
        state.start_line();
        Ok(())
    }

    /// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
    ///
    /// Load and scale an `<img>`. CSS `width`/`height` win over the
    /// attributes; with only one dimension given the other keeps the
    /// image's aspect ratio. A missing image keeps the requested size.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn replaced_content(
        &self,
        id: NodeId,
        style: &ResolvedStyle,
        container_width: i32,
        ctx: &LayoutContext<'_>,
    ) -> ReplacedContent {
        let element = self.dom.as_element(id);
        let attribute = |name: &str| {
            element
                .and_then(|e| e.attr(name))
                .and_then(|value| units::parse_length(value, style.font_size(), container_width))
                .filter(|v| *v >= 0)
        };
        let css = |property: Property| {
            let value = style.value(property);
            if value.trim_end().ends_with('%') && property == Property::Height {
                return None;
            }
            units::parse_length(value, style.font_size(), container_width)
        };
        let wanted_width = css(Property::Width).or_else(|| attribute("width"));
        let wanted_height = css(Property::Height).or_else(|| attribute("height"));

        let image = element
            .and_then(|e| e.attr("src"))
            .and_then(|src| ctx.image(src));
        let Some(image) = image else {
            tracing::debug!(node = ?id, "image unavailable");
            return ReplacedContent {
                image: None,
                width: wanted_width.unwrap_or(0).max(0),
                height: wanted_height.unwrap_or(0).max(0),
            };
        };

        let (natural_width, natural_height) = (image.width() as i32, image.height() as i32);
        let (width, height) = match (wanted_width, wanted_height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if natural_width > 0 => (w, natural_height * w / natural_width),
            (None, Some(h)) if natural_height > 0 => (natural_width * h / natural_height, h),
            (w, h) => (w.unwrap_or(natural_width), h.unwrap_or(natural_height)),
        };
        let (width, height) = (width.max(0), height.max(0));

        let image = if width == 0 || height == 0 {
            None
        } else if (width, height) == (natural_width, natural_height) {
            Some(image)
        } else {
            Some(Arc::new(imageops::resize(
                image.as_ref(),
                width as u32,
                height as u32,
                FilterType::Triangle,
            )))
        };
        ReplacedContent {
            image,
            width,
            height,
        }
    }
}
