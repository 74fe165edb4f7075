//! Tests for tree construction, traversal and the JSON loader.

use kestrel_dom::{DomTree, NodeId};

#[test]
fn test_builder_links_siblings() {
    let mut tree = DomTree::new();
    let body = tree.element(NodeId::ROOT, "body", &[]);
    let a = tree.element(body, "div", &[]);
    let b = tree.text(body, "hello");
    let c = tree.element(body, "p", &[]);

    assert_eq!(tree.first_child(body), Some(a));
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.next_sibling(b), Some(c));
    assert_eq!(tree.next_sibling(c), None);
    assert_eq!(tree.prev_sibling(c), Some(b));
    assert_eq!(tree.parent(b), Some(body));
}

#[test]
fn test_ancestors_walk_to_document() {
    let mut tree = DomTree::new();
    let html = tree.element(NodeId::ROOT, "html", &[]);
    let body = tree.element(html, "body", &[]);
    let span = tree.element(body, "span", &[]);

    let chain: Vec<NodeId> = tree.ancestors(span).collect();
    assert_eq!(chain, vec![body, html, NodeId::ROOT]);
}

#[test]
fn test_tag_and_attribute_names_are_lowercased() {
    let mut tree = DomTree::new();
    let div = tree.element(NodeId::ROOT, "DIV", &[("CLASS", "Big  red"), ("ID", "Main")]);
    let data = tree.as_element(div).expect("element");

    assert_eq!(data.tag_name, "div");
    assert_eq!(data.id(), Some("Main"));
    assert!(data.has_class("big"));
    assert!(data.has_class("RED"));
    assert!(!data.has_class("blue"));
}

#[test]
fn test_descendants_are_preorder() {
    let mut tree = DomTree::new();
    let body = tree.element(NodeId::ROOT, "body", &[]);
    let p = tree.element(body, "p", &[]);
    let t = tree.text(p, "x");
    let div = tree.element(body, "div", &[]);

    assert_eq!(tree.descendants(body), vec![body, p, t, div]);
    assert_eq!(tree.text_content(body), "x");
}

#[test]
fn test_json_single_root() {
    let tree = DomTree::from_json_str(
        r#"{ "tag": "body", "children": [
            { "tag": "p", "attrs": { "class": "lead" }, "children": [ { "text": "Hi" } ] }
        ] }"#,
    )
    .expect("valid document");

    let body = tree.document_element().expect("body");
    let p = tree.first_child(body).expect("p");
    assert_eq!(tree.as_element(p).and_then(|e| e.attr("class")), Some("lead"));
    assert_eq!(tree.text_content(p), "Hi");
}

#[test]
fn test_json_array_root() {
    let tree = DomTree::from_json_str(r#"[ { "tag": "div" }, { "text": " " }, { "tag": "div" } ]"#)
        .expect("valid document");
    assert_eq!(tree.children(NodeId::ROOT).len(), 3);
}

#[test]
fn test_json_rejects_garbage() {
    assert!(DomTree::from_json_str("{ \"nope\": 1 }").is_err());
}
