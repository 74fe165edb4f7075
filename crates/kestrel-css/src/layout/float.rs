//! Float stacks.
//!
//! [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
//!
//! "Since a float is not in the flow, non-positioned block boxes created
//! before and after the float box flow vertically as if the float did not
//! exist. However, the current and subsequent line boxes created next to
//! the float are shortened as necessary to make room for the margin box of
//! the float."
//!
//! Each containing block keeps one stack per side while it lays out its
//! children. Rectangles are margin boxes in that block's content
//! coordinates. A child block receives a translated copy and never writes
//! back to its parent's stacks.

use kestrel_dom::NodeId;

use crate::box_model::Rect;

/// A float that has been positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedFloat {
    /// The floated element. `None` for a copy inherited from an ancestor
    /// whose identity does not matter to the receiver.
    pub node: Option<NodeId>,
    /// Margin box in the owning block's content coordinates.
    pub rect: Rect,
}

/// The floats on one side of a containing block, in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloatStack {
    floats: Vec<PlacedFloat>,
}

impl FloatStack {
    /// An empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self { floats: Vec::new() }
    }

    /// Record a placed float.
    pub fn push(&mut self, node: Option<NodeId>, rect: Rect) {
        self.floats.push(PlacedFloat { node, rect });
    }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
    }

    /// Number of floats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.floats.len()
    }

    /// Floats in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedFloat> {
        self.floats.iter()
    }

    /// Floats whose margin box overlaps the band `[y, y + height)`. A zero
    /// height band is treated as one pixel tall.
    pub fn in_band(&self, y: i32, height: i32) -> impl Iterator<Item = &PlacedFloat> {
        let bottom = y + height.max(1);
        self.floats
            .iter()
            .filter(move |f| f.rect.y < bottom && f.rect.bottom() > y)
    }

    /// For a left stack: the first free x at the band, never below zero.
    #[must_use]
    pub fn left_edge(&self, y: i32, height: i32) -> i32 {
        self.in_band(y, height)
            .map(|f| f.rect.right())
            .fold(0, i32::max)
    }

    /// For a right stack: one past the last free x at the band, never above
    /// `width`.
    #[must_use]
    pub fn right_edge(&self, y: i32, height: i32, width: i32) -> i32 {
        self.in_band(y, height)
            .map(|f| f.rect.x)
            .fold(width, i32::min)
    }

    /// Lowest bottom edge, or `None` when empty.
    #[must_use]
    pub fn bottom(&self) -> Option<i32> {
        self.floats.iter().map(|f| f.rect.bottom()).max()
    }

    /// Smallest bottom edge strictly below `y`.
    #[must_use]
    pub fn next_bottom_after(&self, y: i32) -> Option<i32> {
        self.floats
            .iter()
            .map(|f| f.rect.bottom())
            .filter(|&b| b > y)
            .min()
    }

    /// Drop floats that end at or above `y`: nothing placed from `y`
    /// downwards can meet them.
    pub fn retire(&mut self, y: i32) {
        self.floats.retain(|f| f.rect.bottom() > y);
    }

    /// A copy moved by `(dx, dy)`, for handing to a child block.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            floats: self
                .floats
                .iter()
                .map(|f| PlacedFloat {
                    node: None,
                    rect: f.rect.translate(dx, dy),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_follow_the_band() {
        let mut left = FloatStack::new();
        left.push(None, Rect::new(0, 0, 100, 50));
        let mut right = FloatStack::new();
        right.push(None, Rect::new(300, 20, 100, 50));

        assert_eq!(left.left_edge(0, 10), 100);
        assert_eq!(left.left_edge(50, 10), 0);
        assert_eq!(right.right_edge(0, 10, 400), 400);
        assert_eq!(right.right_edge(0, 30, 400), 300);
        assert_eq!(right.right_edge(69, 0, 400), 300);
    }

    #[test]
    fn test_next_bottom_and_retire() {
        let mut stack = FloatStack::new();
        stack.push(None, Rect::new(0, 0, 10, 20));
        stack.push(None, Rect::new(10, 0, 10, 40));
        assert_eq!(stack.next_bottom_after(0), Some(20));
        assert_eq!(stack.next_bottom_after(20), Some(40));
        assert_eq!(stack.next_bottom_after(40), None);

        stack.retire(20);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.bottom(), Some(40));
    }

    #[test]
    fn test_translated_copy() {
        let mut stack = FloatStack::new();
        stack.push(Some(NodeId(3)), Rect::new(0, 10, 50, 50));
        let moved = stack.translated(-20, -30);
        let f = moved.iter().next().copied();
        assert_eq!(f.map(|f| f.rect), Some(Rect::new(-20, -20, 50, 50)));
        assert_eq!(moved.left_edge(0, 1), 30);
    }
}
