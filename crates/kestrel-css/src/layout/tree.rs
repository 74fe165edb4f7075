//! The layout tree.
//!
//! One [`LayoutNode`] per DOM node, stored in an arena indexed by
//! [`NodeId`]: the DOM's parent and sibling links double as the layout
//! tree's, so nothing here holds a reference to another node.

use std::sync::Arc;

use image::RgbaImage;
use kestrel_dom::{DomTree, NodeId};

use super::float::FloatStack;
use super::line::LineBox;
use crate::box_model::{Edges, OuterBox, Rect};
use crate::image_map::ImageMap;
use crate::style::StyleSet;

/// Layout state and output of one node.
#[derive(Debug, Clone, Default)]
pub struct LayoutNode {
    /// Cascade output.
    pub styles: StyleSet,
    /// Outer box position and size in the containing block's content
    /// coordinates. Includes horizontal margins; vertical margins only for
    /// floats.
    pub draw_rect: Rect,
    /// Content box relative to `draw_rect`'s origin.
    pub content_rect: Rect,
    /// Used margins.
    pub margin: Edges,
    /// Inline content laid out by this block, in reading order.
    pub line_boxes: Vec<LineBox>,
    /// Block-level children positioned by this block.
    pub block_children: Vec<NodeId>,
    /// Floats positioned by this block.
    pub floats: Vec<NodeId>,
    /// Left floats still active when this block finished.
    pub left_floats: FloatStack,
    /// Right floats still active when this block finished.
    pub right_floats: FloatStack,
    /// Hit-test entries in this block's content coordinates.
    pub image_map: ImageMap,
    /// Background and border description, when there is anything to paint.
    pub outer_box: Option<OuterBox>,
    /// Content of a replaced element.
    pub image: Option<Arc<RgbaImage>>,
    /// The block whose content coordinates `draw_rect` is in.
    pub container: Option<NodeId>,
    /// Whether the box is floated.
    pub is_float: bool,
    /// Whether `width` was `auto`.
    pub auto_width: bool,
    pub(crate) layout_done: bool,
}

impl LayoutNode {
    fn new(styles: StyleSet) -> Self {
        Self {
            styles,
            ..Self::default()
        }
    }

    /// Whether the node's geometry is final.
    #[must_use]
    pub const fn is_laid_out(&self) -> bool {
        self.layout_done
    }

    /// Forget every layout output, keeping the styles.
    pub(crate) fn reset(&mut self) {
        let styles = std::mem::take(&mut self.styles);
        *self = Self::new(styles);
    }
}

/// The DOM plus one [`LayoutNode`] per node.
#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub(crate) dom: DomTree,
    pub(crate) nodes: Vec<LayoutNode>,
    pub(crate) viewport_width: Option<i32>,
}

impl LayoutTree {
    /// Adapt `dom`, taking ownership. `styles` is indexed by `NodeId`;
    /// missing entries get default styles.
    #[must_use]
    pub fn new(dom: DomTree, styles: Vec<StyleSet>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            dom,
            viewport_width: None,
        };
        tree.restyle(styles);
        tree
    }

    /// Replace every node's styles and invalidate all geometry.
    pub fn restyle(&mut self, mut styles: Vec<StyleSet>) {
        styles.resize_with(self.dom.len(), StyleSet::default);
        styles.truncate(self.dom.len());
        self.nodes = styles.into_iter().map(LayoutNode::new).collect();
        self.viewport_width = None;
    }

    /// The DOM this tree was built from.
    #[must_use]
    pub const fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// The document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.dom.root()
    }

    /// Layout state of `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut LayoutNode> {
        self.nodes.get_mut(id.0)
    }

    /// Clear the geometry of `id`, its whole subtree and its ancestors.
    pub fn invalidate(&mut self, id: NodeId) {
        self.invalidate_subtree(id);
        // Ancestors depend on the subtree's size.
        let ancestors: Vec<NodeId> = self.dom.ancestors(id).collect();
        for ancestor in ancestors {
            if let Some(layout) = self.nodes.get_mut(ancestor.0) {
                layout.reset();
            }
        }
    }

    pub(crate) fn invalidate_subtree(&mut self, id: NodeId) {
        for node in self.dom.descendants(id) {
            if let Some(layout) = self.nodes.get_mut(node.0) {
                layout.reset();
            }
        }
    }

    /// Clear all geometry.
    pub fn invalidate_all(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        self.viewport_width = None;
    }

    /// Whether the whole tree is laid out.
    #[must_use]
    pub fn is_laid_out(&self) -> bool {
        self.node(self.root()).is_some_and(LayoutNode::is_laid_out)
    }

    /// Height of the laid-out document.
    #[must_use]
    pub fn document_height(&self) -> i32 {
        self.node(self.root()).map_or(0, |n| n.draw_rect.height)
    }

    /// `draw_rect` of `id` in document coordinates, or `None` if the node
    /// has no position (not laid out, hidden, or a non-atomic inline).
    #[must_use]
    pub fn absolute_rect(&self, id: NodeId) -> Option<Rect> {
        let node = self.node(id)?;
        if !node.layout_done {
            return None;
        }
        match node.container {
            None if id == self.root() => Some(node.draw_rect),
            None => None,
            Some(container) => {
                let outer = self.absolute_rect(container)?;
                let content = self.node(container)?.content_rect;
                Some(node.draw_rect.translate(outer.x + content.x, outer.y + content.y))
            }
        }
    }

    /// [Hit testing] The node rendered at document point `(x, y)`.
    #[must_use]
    pub fn at(&self, x: i32, y: i32) -> Option<NodeId> {
        let root = self.node(self.root())?;
        if !root.layout_done {
            return None;
        }
        root.image_map
            .at(self, x - root.content_rect.x, y - root.content_rect.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_are_padded_to_tree_size() {
        let mut dom = DomTree::new();
        let div = dom.element(NodeId::ROOT, "div", &[]);
        let tree = LayoutTree::new(dom, Vec::new());
        assert!(tree.node(div).is_some());
        assert!(!tree.is_laid_out());
        assert_eq!(tree.absolute_rect(div), None);
    }

    #[test]
    fn test_invalidate_clears_subtree_and_ancestors() {
        let mut dom = DomTree::new();
        let outer = dom.element(NodeId::ROOT, "div", &[]);
        let inner = dom.element(outer, "p", &[]);
        let sibling = dom.element(NodeId::ROOT, "div", &[]);
        let mut tree = LayoutTree::new(dom, Vec::new());
        for node in &mut tree.nodes {
            node.layout_done = true;
        }

        tree.invalidate(inner);
        assert!(!tree.nodes[inner.0].layout_done);
        assert!(!tree.nodes[outer.0].layout_done);
        assert!(!tree.nodes[NodeId::ROOT.0].layout_done);
        assert!(tree.nodes[sibling.0].layout_done);
    }
}
