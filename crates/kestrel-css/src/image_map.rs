//! Hit testing.
//!
//! Every block records, in its own content coordinates, one entry per
//! child box it positioned and per line box it emitted. A parent copies
//! its block children's entries into its own map, translated, so a point
//! query on the root map resolves most hits in one scan.
//!
//! Floats are the exception: their content is not copied. A float entry
//! stands for the whole float and the query descends into the float's own
//! map, which keeps floats above the in-flow content they overlap.

use kestrel_dom::NodeId;

use crate::box_model::Rect;
use crate::layout::LayoutTree;

/// One hit-testable rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    /// Area in the owning block's content coordinates.
    pub rect: Rect,
    /// The node reported for a hit.
    pub node: NodeId,
    /// Whether `node` is a float whose own map should be consulted.
    pub is_float: bool,
}

/// Rectangles in insertion order; later entries paint above earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMap {
    entries: Vec<MapEntry>,
}

impl ImageMap {
    /// An empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record `rect` as showing `node`.
    pub fn add(&mut self, rect: Rect, node: NodeId, is_float: bool) {
        self.entries.push(MapEntry {
            rect,
            node,
            is_float,
        });
    }

    /// Append every entry of `other`, moved by `(dx, dy)`.
    pub fn extend_translated(&mut self, other: &Self, dx: i32, dy: i32) {
        self.entries.extend(other.entries.iter().map(|entry| MapEntry {
            rect: entry.rect.translate(dx, dy),
            ..*entry
        }));
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The deepest node at `(x, y)` in this map's coordinates.
    ///
    /// STEP 1: floats, newest first, descending into the float's map.
    /// STEP 2: everything else, newest first.
    #[must_use]
    pub fn at(&self, tree: &LayoutTree, x: i32, y: i32) -> Option<NodeId> {
        for entry in self.entries.iter().rev().filter(|e| e.is_float) {
            if !entry.rect.contains(x, y) {
                continue;
            }
            let Some(float) = tree.node(entry.node) else {
                return Some(entry.node);
            };
            let local_x = x - entry.rect.x - float.content_rect.x;
            let local_y = y - entry.rect.y - float.content_rect.y;
            return float
                .image_map
                .at(tree, local_x, local_y)
                .or(Some(entry.node));
        }

        self.entries
            .iter()
            .rev()
            .find(|e| !e.is_float && e.rect.contains(x, y))
            .map(|e| e.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_dom::DomTree;

    #[test]
    fn test_newest_entry_wins() {
        let tree = LayoutTree::new(DomTree::new(), Vec::new());
        let mut map = ImageMap::new();
        map.add(Rect::new(0, 0, 100, 100), NodeId(1), false);
        map.add(Rect::new(10, 10, 10, 10), NodeId(2), false);
        assert_eq!(map.at(&tree, 15, 15), Some(NodeId(2)));
        assert_eq!(map.at(&tree, 50, 50), Some(NodeId(1)));
        assert_eq!(map.at(&tree, 150, 50), None);
    }

    #[test]
    fn test_floats_beat_later_flow_content() {
        let tree = LayoutTree::new(DomTree::new(), Vec::new());
        let mut map = ImageMap::new();
        map.add(Rect::new(0, 0, 50, 50), NodeId(3), true);
        map.add(Rect::new(0, 0, 200, 20), NodeId(4), false);
        assert_eq!(map.at(&tree, 10, 10), Some(NodeId(3)));
        assert_eq!(map.at(&tree, 100, 10), Some(NodeId(4)));
    }

    #[test]
    fn test_extend_translated() {
        let mut inner = ImageMap::new();
        inner.add(Rect::new(0, 0, 10, 10), NodeId(5), false);
        let mut outer = ImageMap::new();
        outer.extend_translated(&inner, 100, 20);
        assert_eq!(outer.entries()[0].rect, Rect::new(100, 20, 10, 10));
        assert_eq!(outer.len(), 1);
    }
}
