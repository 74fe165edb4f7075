//! JSON document format.
//!
//! A document is a recursive tree of element and text objects:
//!
//! ```json
//! { "tag": "body", "attrs": { "class": "page" }, "children": [
//!     { "tag": "p", "children": [ { "text": "Hello" } ] }
//! ] }
//! ```
//!
//! The top-level value may be a single node or an array of nodes; either
//! way the nodes become children of the document node.

use serde::Deserialize;
use thiserror::Error;

use crate::{AttributesMap, DomTree, ElementData, NodeId, NodeType};

/// One node of the JSON document format.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JsonNode {
    /// `{ "text": "..." }`
    Text {
        /// Character data.
        text: String,
    },
    /// `{ "tag": "div", "attrs": {...}, "children": [...] }`
    Element {
        /// Tag name, normalized to lowercase on load.
        tag: String,
        /// Attributes, empty when omitted.
        #[serde(default)]
        attrs: AttributesMap,
        /// Child nodes, empty when omitted.
        #[serde(default)]
        children: Vec<JsonNode>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRoot {
    Many(Vec<JsonNode>),
    One(JsonNode),
}

/// Errors raised while loading a JSON document.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The input is not valid JSON or does not follow the node format.
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl DomTree {
    /// Build a tree from the JSON document format.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError::Malformed`] if the input does not parse.
    pub fn from_json_str(input: &str) -> Result<Self, JsonError> {
        let root: JsonRoot = serde_json::from_str(input)?;
        let nodes = match root {
            JsonRoot::Many(nodes) => nodes,
            JsonRoot::One(node) => vec![node],
        };
        let mut tree = Self::new();
        for node in &nodes {
            tree.append_json(NodeId::ROOT, node);
        }
        Ok(tree)
    }

    fn append_json(&mut self, parent: NodeId, node: &JsonNode) {
        match node {
            JsonNode::Text { text } => {
                let _ = self.text(parent, text);
            }
            JsonNode::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.alloc(NodeType::Element(ElementData::new(tag, attrs.clone())));
                self.append_child(parent, id);
                for child in children {
                    self.append_json(id, child);
                }
            }
        }
    }
}
