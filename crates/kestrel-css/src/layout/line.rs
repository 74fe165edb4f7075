//! Line boxes.
//!
//! [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
//!
//! "The rectangular area that contains the boxes that form a line is called
//! a line box."
//!
//! Each [`LineBox`] here is one run on a line: a word, an image or an
//! inline-block. They are appended to the containing block in reading
//! order; when a line completes, [`align_line`] settles their vertical
//! offsets and the height the cursor advances by.

use image::Rgba;
use kestrel_dom::NodeId;

use super::{FontMetrics, FontSpec};
use crate::box_model::Rect;
use crate::style::{TextAlign, VerticalAlign};

/// What a line box shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineContent {
    /// A run of text.
    Text(String),
    /// A replaced `<img>` element, laid out as an atomic box.
    Image(NodeId),
    /// An `inline-block` element, laid out as an atomic box.
    InlineBlock(NodeId),
}

/// One run of inline content placed on a line.
#[derive(Debug, Clone)]
pub struct LineBox {
    /// The element the run belongs to: the parent of a text run, or the
    /// atomic element itself. Hit testing reports this node.
    pub node: NodeId,
    /// Position in the containing block's content coordinates. For atomic
    /// boxes this is the margin box.
    pub rect: Rect,
    /// What to paint.
    pub content: LineContent,
    /// Font of a text run. `None` for atomic boxes.
    pub font: Option<FontSpec>,
    /// Metrics of `font`. `None` for atomic boxes.
    pub metrics: Option<FontMetrics>,
    /// Used `line-height` of the run.
    pub line_height: i32,
    /// `vertical-align` of the run.
    pub vertical_align: VerticalAlign,
    /// Text colour.
    pub color: Rgba<u8>,
    /// Background of the enclosing inline element, if any.
    pub background: Rgba<u8>,
    /// Whether to underline a text run.
    pub underline: bool,
}

impl LineBox {
    /// Height above the baseline. Atomic boxes sit on the baseline with
    /// their bottom margin edge.
    #[must_use]
    pub fn ascent(&self) -> i32 {
        self.metrics.map_or(self.rect.height, |m| m.ascent)
    }

    /// Whether this is a text run.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.content, LineContent::Text(_))
    }

    /// The atomic element this box stands for, if any.
    #[must_use]
    pub const fn atomic_node(&self) -> Option<NodeId> {
        match self.content {
            LineContent::Image(node) | LineContent::InlineBlock(node) => Some(node),
            LineContent::Text(_) => None,
        }
    }
}

/// Vertical placement of a completed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGeometry {
    /// Offset of each box's top from the line top.
    pub offsets: Vec<i32>,
    /// Baseline position from the line top.
    pub baseline: i32,
    /// Distance from this line's top to the next line's top.
    pub advance: i32,
}

/// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
///
/// Align `boxes` on a shared baseline. `strut` is the font of the
/// containing block: `text-top`, `text-bottom` and `middle` are measured
/// against it.
#[must_use]
pub fn align_line(boxes: &[LineBox], strut: &FontMetrics) -> LineGeometry {
    if boxes.is_empty() {
        return LineGeometry {
            offsets: Vec::new(),
            baseline: 0,
            advance: 0,
        };
    }

    // STEP 1: The shared baseline sits below the tallest ascent among the
    // baseline-aligned boxes.
    let mut baseline = boxes
        .iter()
        .filter(|b| b.vertical_align == VerticalAlign::Baseline)
        .map(LineBox::ascent)
        .max()
        .unwrap_or(0);

    // STEP 2: Place each box relative to it.
    // "text-top: Align the top of the box with the top of the parent's
    // content area."
    // "text-bottom: Align the bottom of the box with the bottom of the
    // parent's content area."
    // "middle: Align the vertical midpoint of the box with the baseline of
    // the parent box plus half the x-height of the parent."
    let mut offsets: Vec<i32> = boxes
        .iter()
        .map(|b| match b.vertical_align {
            VerticalAlign::Baseline => baseline - b.ascent(),
            VerticalAlign::TextTop => baseline - strut.ascent,
            VerticalAlign::TextBottom => baseline + strut.descent - b.rect.height,
            VerticalAlign::Middle => baseline - strut.x_height / 2 - b.rect.height / 2,
        })
        .collect();

    // STEP 3: Nothing may start above the line top.
    let lowest = offsets.iter().copied().min().unwrap_or(0);
    if lowest < 0 {
        for offset in &mut offsets {
            *offset -= lowest;
        }
        baseline -= lowest;
    }

    // STEP 4: Half-leading.
    // "the UA must add half the leading to the top and half to the bottom
    // of the inline box"
    let content_height = boxes
        .iter()
        .zip(&offsets)
        .map(|(b, offset)| offset + b.rect.height)
        .max()
        .unwrap_or(0);
    let step = boxes.iter().map(|b| b.line_height).max().unwrap_or(0);
    if step > content_height {
        let half_leading = (step - content_height) / 2;
        for offset in &mut offsets {
            *offset += half_leading;
        }
        baseline += half_leading;
    }

    LineGeometry {
        offsets,
        baseline,
        advance: step.max(content_height),
    }
}

/// [§ 16.2 Alignment](https://www.w3.org/TR/CSS2/text.html#alignment-prop)
///
/// Horizontal shift for a line whose content spans `content_right` and
/// whose free space ends at `line_right`. `justify` is treated as `left`.
#[must_use]
pub fn align_shift(align: TextAlign, content_right: i32, line_right: i32) -> i32 {
    let free = (line_right - content_right).max(0);
    match align {
        TextAlign::Left | TextAlign::Justify => 0,
        TextAlign::Right => free,
        TextAlign::Center => free / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(height: i32, ascent: i32, line_height: i32, align: VerticalAlign) -> LineBox {
        LineBox {
            node: NodeId(1),
            rect: Rect::new(0, 0, 10, height),
            content: LineContent::Text("x".into()),
            font: None,
            metrics: Some(FontMetrics {
                ascent,
                descent: height - ascent,
                line_gap: 0,
                x_height: height / 2,
            }),
            line_height,
            vertical_align: align,
            color: Rgba([0, 0, 0, 255]),
            background: Rgba([0, 0, 0, 0]),
            underline: false,
        }
    }

    fn atomic(height: i32, align: VerticalAlign) -> LineBox {
        LineBox {
            content: LineContent::InlineBlock(NodeId(2)),
            metrics: None,
            line_height: height,
            ..text_box(height, 0, height, align)
        }
    }

    const STRUT: FontMetrics = FontMetrics {
        ascent: 12,
        descent: 4,
        line_gap: 0,
        x_height: 8,
    };

    #[test]
    fn test_atomic_boxes_share_baseline_with_text() {
        let boxes = [text_box(16, 12, 16, VerticalAlign::Baseline), atomic(50, VerticalAlign::Baseline)];
        let line = align_line(&boxes, &STRUT);
        assert_eq!(line.baseline, 50);
        assert_eq!(line.offsets, vec![38, 0]);
        assert_eq!(line.advance, 54);
    }

    #[test]
    fn test_half_leading() {
        let boxes = [text_box(16, 12, 26, VerticalAlign::Baseline)];
        let line = align_line(&boxes, &STRUT);
        assert_eq!(line.offsets, vec![5]);
        assert_eq!(line.advance, 26);
    }

    #[test]
    fn test_text_top_and_bottom() {
        let boxes = [
            text_box(16, 12, 16, VerticalAlign::Baseline),
            atomic(10, VerticalAlign::TextTop),
            atomic(10, VerticalAlign::TextBottom),
        ];
        let line = align_line(&boxes, &STRUT);
        // Baseline 12: text-top starts at 0, text-bottom ends at 16.
        assert_eq!(line.offsets, vec![0, 0, 6]);
    }

    #[test]
    fn test_middle_never_rises_above_line_top() {
        let boxes = [text_box(16, 12, 16, VerticalAlign::Baseline), atomic(40, VerticalAlign::Middle)];
        let line = align_line(&boxes, &STRUT);
        assert!(line.offsets.iter().all(|&o| o >= 0));
        assert_eq!(line.offsets[1], 0);
    }

    #[test]
    fn test_text_align_shift() {
        assert_eq!(align_shift(TextAlign::Left, 60, 100), 0);
        assert_eq!(align_shift(TextAlign::Right, 60, 100), 40);
        assert_eq!(align_shift(TextAlign::Center, 60, 100), 20);
        assert_eq!(align_shift(TextAlign::Center, 120, 100), 0);
    }
}
