//! Integration tests for stylesheet parsing and the cascade.

use kestrel_common::NoHistory;
use kestrel_css::shorthand::{Expansion, expand};
use kestrel_css::{
    Cascade, MatchContext, Origin, Property, StyleSet, Stylesheet, parse_stylesheet, ua_stylesheet,
};
use kestrel_dom::{DomTree, NodeId};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn resolve(tree: &DomTree, sheets: &[&Stylesheet]) -> Vec<StyleSet> {
    let ctx = MatchContext {
        history: &NoHistory,
        base_url: None,
    };
    Cascade::new(sheets.iter().copied()).resolve(tree, &ctx)
}

fn value(styles: &[StyleSet], id: NodeId, property: Property) -> Option<&str> {
    styles[id.0].unconditional.get(property)
}

#[test]
fn test_id_beats_two_classes_regardless_of_order() {
    let mut tree = DomTree::new();
    let el = tree.element(NodeId::ROOT, "p", &[("id", "x"), ("class", "y z")]);
    let sheet = parse_stylesheet("#x { color: red } .y.z { color: blue }", Origin::Author);

    let styles = resolve(&tree, &[&sheet]);
    assert_eq!(value(&styles, el, Property::Color), Some("red"));
}

#[test]
fn test_later_rule_wins_at_equal_specificity() {
    let mut tree = DomTree::new();
    let el = tree.element(NodeId::ROOT, "p", &[("class", "a b")]);
    let first = parse_stylesheet(".a { color: red }", Origin::Author);
    let second = parse_stylesheet(".b { color: green }", Origin::Author);

    let styles = resolve(&tree, &[&first, &second]);
    assert_eq!(value(&styles, el, Property::Color), Some("green"));
    let styles = resolve(&tree, &[&second, &first]);
    assert_eq!(value(&styles, el, Property::Color), Some("red"));
}

#[test]
fn test_author_overrides_user_agent() {
    let mut tree = DomTree::new();
    let div = tree.element(NodeId::ROOT, "div", &[]);
    let plain = tree.element(NodeId::ROOT, "div", &[("class", "plain")]);
    let author = parse_stylesheet(".plain { display: inline }", Origin::Author);

    let styles = resolve(&tree, &[ua_stylesheet(), &author]);
    assert_eq!(value(&styles, div, Property::Display), Some("block"));
    assert_eq!(value(&styles, plain, Property::Display), Some("inline"));
}

#[test]
fn test_importance_ordering() {
    let mut tree = DomTree::new();
    let inline_normal = tree.element(NodeId::ROOT, "p", &[("style", "color: blue")]);
    let inline_important = tree.element(NodeId::ROOT, "p", &[("style", "color: blue !important")]);
    let author = parse_stylesheet("p { color: red !important }", Origin::Author);

    let styles = resolve(&tree, &[&author]);
    assert_eq!(value(&styles, inline_normal, Property::Color), Some("red"));
    assert_eq!(value(&styles, inline_important, Property::Color), Some("blue"));

    let user = parse_stylesheet("p { color: black !important }", Origin::User);
    let styles = resolve(&tree, &[&user, &author]);
    assert_eq!(value(&styles, inline_important, Property::Color), Some("black"));
}

#[test]
fn test_user_normal_below_author_normal() {
    let mut tree = DomTree::new();
    let p = tree.element(NodeId::ROOT, "p", &[]);
    let user = parse_stylesheet("#nothing, p { color: black }", Origin::User);
    let author = parse_stylesheet("* { color: gray }", Origin::Author);

    let styles = resolve(&tree, &[&author, &user]);
    assert_eq!(value(&styles, p, Property::Color), Some("gray"));
}

#[test]
fn test_shorthands_reach_the_cascade_as_longhands() {
    let mut tree = DomTree::new();
    let div = tree.element(NodeId::ROOT, "div", &[]);
    let sheet = parse_stylesheet(
        "div { margin: 1px 2px; border: 3px dashed green; margin-top: 9px }",
        Origin::Author,
    );

    let styles = resolve(&tree, &[&sheet]);
    assert_eq!(value(&styles, div, Property::MarginTop), Some("9px"));
    assert_eq!(value(&styles, div, Property::MarginLeft), Some("2px"));
    assert_eq!(value(&styles, div, Property::MarginBottom), Some("1px"));
    assert_eq!(value(&styles, div, Property::BorderLeftStyle), Some("dashed"));
    assert_eq!(value(&styles, div, Property::BorderBottomWidth), Some("3px"));
}

#[test]
fn test_descendant_rules_and_inheritance() {
    let mut tree = DomTree::new();
    let list = tree.element(NodeId::ROOT, "ul", &[("class", "nav")]);
    let item = tree.element(list, "li", &[]);
    let text = tree.text(item, "home");
    let sheet = parse_stylesheet(
        ".nav li { font-size: 2em } ul { color: purple }",
        Origin::Author,
    );

    let styles = resolve(&tree, &[&sheet]);
    assert_eq!(styles[item.0].unconditional.font_size(), 32);
    assert_eq!(styles[text.0].unconditional.font_size(), 32);
    assert_eq!(value(&styles, text, Property::Color), Some("purple"));
}

#[test]
fn test_invalid_declarations_do_not_poison_the_rule() {
    let mut tree = DomTree::new();
    let p = tree.element(NodeId::ROOT, "p", &[]);
    let sheet = parse_stylesheet(
        "p { margin: 1px 2px 3px 4px 5px; grid-area: a; color: teal }",
        Origin::Author,
    );

    let styles = resolve(&tree, &[&sheet]);
    assert_eq!(value(&styles, p, Property::Color), Some("teal"));
    assert_eq!(value(&styles, p, Property::MarginTop), None);
}

/// The four-side distribution of `margin` for one to four components.
#[quickcheck]
fn prop_margin_shorthand_distributes_sides(lengths: Vec<u16>) -> TestResult {
    if lengths.is_empty() || lengths.len() > 4 {
        return TestResult::discard();
    }
    let text: Vec<String> = lengths.iter().map(|l| format!("{l}px")).collect();
    let Expansion::Declarations(declarations) = expand("margin", &text.join(" "), false) else {
        return TestResult::failed();
    };
    let side = |property: Property| {
        declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.clone())
    };

    let (top, right, bottom, left) = match text.as_slice() {
        [a] => (a, a, a, a),
        [a, b] => (a, b, a, b),
        [a, b, c] => (a, b, c, b),
        [a, b, c, d] => (a, b, c, d),
        _ => return TestResult::discard(),
    };
    TestResult::from_bool(
        declarations.len() == 4
            && side(Property::MarginTop).as_ref() == Some(top)
            && side(Property::MarginRight).as_ref() == Some(right)
            && side(Property::MarginBottom).as_ref() == Some(bottom)
            && side(Property::MarginLeft).as_ref() == Some(left),
    )
}
