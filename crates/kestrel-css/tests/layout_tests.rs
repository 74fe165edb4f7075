//! Integration tests for block, inline and float layout.
//!
//! Every test uses the fixed-pitch `MonospaceShaper`: at 16px a character
//! is 8px wide, a line of text is 16px tall, and the gap after a plain word
//! is 5px.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use kestrel_common::{NoHistory, Url};
use kestrel_css::style::Float;
use kestrel_css::{
    Cascade, DrawError, ImageProvider, LayoutContext, LayoutError, LayoutTree, LineContent,
    MatchContext, MonospaceShaper, Origin, Rect, parse_stylesheet, render, ua_stylesheet,
};
use kestrel_dom::{DomTree, NodeId};
use quickcheck_macros::quickcheck;

fn styled(dom: DomTree, css: &str) -> LayoutTree {
    let author = parse_stylesheet(css, Origin::Author);
    let ctx = MatchContext {
        history: &NoHistory,
        base_url: None,
    };
    let styles = Cascade::new([ua_stylesheet(), &author]).resolve(&dom, &ctx);
    LayoutTree::new(dom, styles)
}

fn lay_out(dom: DomTree, css: &str, width: i32) -> LayoutTree {
    let mut tree = styled(dom, css);
    let shaper = MonospaceShaper::default();
    tree.layout(width, &LayoutContext::new(&shaper)).unwrap();
    tree
}

fn rect(tree: &LayoutTree, id: NodeId) -> Rect {
    tree.absolute_rect(id).unwrap()
}

fn texts(tree: &LayoutTree, id: NodeId) -> Vec<(String, Rect)> {
    tree.node(id)
        .unwrap()
        .line_boxes
        .iter()
        .filter_map(|b| match &b.content {
            LineContent::Text(text) => Some((text.clone(), b.rect)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_blocks_stack_vertically() {
    let mut dom = DomTree::new();
    let a = dom.element(NodeId::ROOT, "div", &[]);
    let b = dom.element(NodeId::ROOT, "div", &[]);
    let tree = lay_out(dom, "div { width: 100px; height: 50px }", 250);

    assert_eq!(rect(&tree, a), Rect::from_corners(0, 0, 100, 50));
    assert_eq!(rect(&tree, b), Rect::from_corners(0, 50, 100, 100));
    assert_eq!(tree.document_height(), 100);
}

#[test]
fn test_inline_blocks_sit_side_by_side() {
    let mut dom = DomTree::new();
    let a = dom.element(NodeId::ROOT, "span", &[]);
    let b = dom.element(NodeId::ROOT, "span", &[]);
    let tree = lay_out(
        dom,
        "span { display: inline-block; width: 100px; height: 50px }",
        400,
    );

    assert_eq!(rect(&tree, a), Rect::from_corners(0, 0, 100, 50));
    assert_eq!(rect(&tree, b), Rect::from_corners(100, 0, 200, 50));
}

#[test]
fn test_inline_block_wraps_to_next_line() {
    let mut dom = DomTree::new();
    let a = dom.element(NodeId::ROOT, "span", &[]);
    let b = dom.element(NodeId::ROOT, "span", &[]);
    let tree = lay_out(
        dom,
        "span { display: inline-block; width: 100px; height: 50px }",
        150,
    );

    assert_eq!(rect(&tree, a), Rect::from_corners(0, 0, 100, 50));
    assert_eq!(rect(&tree, b), Rect::from_corners(0, 50, 100, 100));
}

#[test]
fn test_block_flows_beside_left_float() {
    let mut dom = DomTree::new();
    let float = dom.element(NodeId::ROOT, "div", &[("class", "f")]);
    let block = dom.element(NodeId::ROOT, "div", &[("class", "b")]);
    let tree = lay_out(
        dom,
        ".f { float: left; width: 100px; height: 50px }
         .b { width: 100px; height: 50px }",
        400,
    );

    assert_eq!(rect(&tree, float), Rect::from_corners(0, 0, 100, 50));
    let block_rect = rect(&tree, block);
    assert_eq!(block_rect.x, 100);
    assert_eq!(block_rect.y, 0);
    assert!(tree.node(float).unwrap().is_float);
}

#[test]
fn test_sibling_margins_collapse() {
    let mut dom = DomTree::new();
    let a = dom.element(NodeId::ROOT, "div", &[("class", "a")]);
    let b = dom.element(NodeId::ROOT, "div", &[("class", "b")]);
    let tree = lay_out(
        dom,
        "div { height: 10px }
         .a { margin-bottom: 40px }
         .b { margin-top: 40px }",
        200,
    );
    assert_eq!(rect(&tree, a).bottom(), 10);
    assert_eq!(rect(&tree, b).y, 50);
}

#[test]
fn test_negative_margin_collapse() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[("class", "a")]);
    let b = dom.element(NodeId::ROOT, "div", &[("class", "b")]);
    let tree = lay_out(
        dom,
        "div { height: 10px }
         .a { margin-bottom: 30px }
         .b { margin-top: -10px }",
        200,
    );
    assert_eq!(rect(&tree, b).y, 30);
}

#[test]
fn test_nested_block_offsets_accumulate() {
    let mut dom = DomTree::new();
    let outer = dom.element(NodeId::ROOT, "div", &[("class", "outer")]);
    let inner = dom.element(outer, "div", &[("class", "inner")]);
    let tree = lay_out(
        dom,
        ".outer { padding: 10px; border: 2px solid black; margin-left: 5px }
         .inner { height: 20px }",
        200,
    );

    let outer_node = tree.node(outer).unwrap();
    assert_eq!(outer_node.content_rect, Rect::new(17, 12, 171, 20));
    assert_eq!(rect(&tree, outer), Rect::new(0, 0, 200, 44));
    assert_eq!(rect(&tree, inner), Rect::new(17, 12, 171, 20));
}

#[test]
fn test_text_wraps_at_container_width() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "aaaa bbbb cccc");
    let tree = lay_out(dom, "div { width: 100px }", 400);

    let got = texts(&tree, div);
    assert_eq!(got.len(), 3);
    assert_eq!(got[0], ("aaaa".to_string(), Rect::new(0, 0, 32, 16)));
    assert_eq!(got[1], ("bbbb".to_string(), Rect::new(37, 0, 32, 16)));
    assert_eq!(got[2], ("cccc".to_string(), Rect::new(0, 16, 32, 16)));
    assert_eq!(rect(&tree, div).height, 32);
}

#[test]
fn test_sentence_end_gets_a_full_em() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "end. next");
    let tree = lay_out(dom, "", 400);

    let got = texts(&tree, div);
    assert_eq!(got[1].1.x, 32 + 16);
}

#[test]
fn test_text_flows_around_float_and_drops_below_it() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.element(div, "div", &[("class", "f")]);
    let _ = dom.text(div, "aaaa bbbb cccc");
    let tree = lay_out(
        dom,
        "div { width: 120px }
         .f { float: left; width: 80px; height: 20px }",
        400,
    );

    let got = texts(&tree, div);
    // 40px remain beside the float: one word per line until it ends.
    assert_eq!(got[0].1, Rect::new(80, 0, 32, 16));
    assert_eq!(got[1].1, Rect::new(80, 16, 32, 16));
    assert_eq!(got[2].1, Rect::new(0, 32, 32, 16));
}

#[test]
fn test_float_shrinks_to_fit_its_text() {
    let mut dom = DomTree::new();
    let float = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(float, "abcd");
    let tree = lay_out(dom, "div { float: right }", 300);

    assert_eq!(rect(&tree, float), Rect::new(268, 0, 32, 16));
}

#[test]
fn test_shrunk_float_respects_min_width() {
    let mut dom = DomTree::new();
    let float = dom.element(NodeId::ROOT, "div", &[("class", "f")]);
    let _ = dom.text(float, "ab");
    let tree = lay_out(dom, ".f { float: left; min-width: 200px }", 400);

    assert_eq!(rect(&tree, float), Rect::new(0, 0, 200, 16));
}

#[test]
fn test_max_width_block_centres_with_auto_margins() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let tree = lay_out(
        dom,
        "div { max-width: 100px; height: 10px; margin-left: auto; margin-right: auto }",
        300,
    );

    assert_eq!(rect(&tree, div), Rect::new(0, 0, 300, 10));
    assert_eq!(tree.node(div).unwrap().content_rect, Rect::new(100, 0, 100, 10));
}

#[test]
fn test_right_float_after_text_drops_below_the_line() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "aaaaaaaaaa ");
    let float = dom.element(div, "span", &[]);
    let tree = lay_out(
        dom,
        "div { width: 100px }
         span { float: right; width: 50px; height: 10px }",
        400,
    );

    assert_eq!(rect(&tree, float), Rect::new(50, 16, 50, 10));
}

#[test]
fn test_float_beside_tall_line_height_drops_below_the_aligned_line() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "aaaaaaaaaa");
    let float = dom.element(div, "span", &[]);
    let tree = lay_out(
        dom,
        "div { width: 100px; line-height: 40px }
         span { float: right; width: 30px; height: 10px }",
        400,
    );

    // Half-leading puts the text at 12, so the float waits for the 40px line.
    let text = texts(&tree, div)[0].1;
    assert_eq!(text, Rect::new(0, 12, 80, 16));
    assert_eq!(rect(&tree, float), Rect::new(70, 40, 30, 10));
    assert!(!text.intersects(&rect(&tree, float)));
}

#[test]
fn test_float_after_tall_inline_block_drops_below_the_baseline() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.element(div, "span", &[("class", "tall")]);
    let _ = dom.text(div, "aaaaaaaaaa");
    let float = dom.element(div, "span", &[("class", "f")]);
    let tree = lay_out(
        dom,
        "div { width: 200px }
         .tall { display: inline-block; width: 100px; height: 100px }
         .f { float: right; width: 30px; height: 20px }",
        400,
    );

    // The text sits on the inline-block's baseline, 88px down.
    let text = texts(&tree, div)[0].1;
    assert_eq!(text, Rect::new(100, 88, 80, 16));
    assert_eq!(rect(&tree, float), Rect::new(170, 104, 30, 20));
}

#[test]
fn test_left_float_pushes_current_line_right() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "ab ");
    let float = dom.element(div, "span", &[]);
    let tree = lay_out(
        dom,
        "div { width: 200px }
         span { float: left; width: 50px; height: 10px }",
        400,
    );

    assert_eq!(rect(&tree, float), Rect::new(0, 0, 50, 10));
    assert_eq!(texts(&tree, div)[0].1.x, 50);
}

#[test]
fn test_clear_moves_below_floats() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[("class", "f")]);
    let cleared = dom.element(NodeId::ROOT, "div", &[("class", "c")]);
    let tree = lay_out(
        dom,
        ".f { float: left; width: 100px; height: 50px }
         .c { clear: left; height: 10px }",
        400,
    );

    assert_eq!(rect(&tree, cleared), Rect::new(0, 50, 400, 10));
}

#[test]
fn test_floats_on_same_side_stack_horizontally_then_wrap() {
    let mut dom = DomTree::new();
    let a = dom.element(NodeId::ROOT, "div", &[]);
    let b = dom.element(NodeId::ROOT, "div", &[]);
    let c = dom.element(NodeId::ROOT, "div", &[]);
    let tree = lay_out(dom, "div { float: left; width: 80px; height: 30px }", 200);

    assert_eq!(rect(&tree, a), Rect::new(0, 0, 80, 30));
    assert_eq!(rect(&tree, b), Rect::new(80, 0, 80, 30));
    assert_eq!(rect(&tree, c), Rect::new(0, 30, 80, 30));
    assert_eq!(tree.document_height(), 60);
}

#[test]
fn test_text_align_center_and_right() {
    let mut dom = DomTree::new();
    let centered = dom.element(NodeId::ROOT, "div", &[("class", "c")]);
    let _ = dom.text(centered, "ab");
    let right = dom.element(NodeId::ROOT, "div", &[("class", "r")]);
    let _ = dom.text(right, "ab");
    let tree = lay_out(
        dom,
        "div { width: 100px } .c { text-align: center } .r { text-align: right }",
        400,
    );

    assert_eq!(texts(&tree, centered)[0].1.x, 42);
    assert_eq!(texts(&tree, right)[0].1.x, 84);
}

#[test]
fn test_text_indent_applies_to_first_line_only() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "aaaa bbbb");
    let tree = lay_out(dom, "div { width: 60px; text-indent: 20px }", 400);

    let got = texts(&tree, div);
    assert_eq!(got[0].1.x, 20);
    assert_eq!(got[1].1, Rect::new(0, 16, 32, 16));
}

#[test]
fn test_br_forces_a_new_line() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "a");
    let _ = dom.element(div, "br", &[]);
    let _ = dom.element(div, "br", &[]);
    let _ = dom.text(div, "b");
    let tree = lay_out(dom, "", 400);

    let got = texts(&tree, div);
    assert_eq!(got[0].1.y, 0);
    // The second break completes an empty line.
    assert_eq!(got[1].1.y, 32);
}

#[test]
fn test_pre_keeps_lines_and_spaces() {
    let mut dom = DomTree::new();
    let pre = dom.element(NodeId::ROOT, "pre", &[]);
    let _ = dom.text(pre, "a  b\nc");
    let tree = lay_out(dom, "pre { margin: 0 }", 400);

    let got = texts(&tree, pre);
    assert_eq!(got[0], ("a  b".to_string(), Rect::new(0, 0, 32, 16)));
    assert_eq!(got[1], ("c".to_string(), Rect::new(0, 16, 8, 16)));
}

#[test]
fn test_first_line_style() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "aa bb");
    let tree = lay_out(dom, "div { width: 60px } div::first-line { font-size: 32px }", 400);

    let boxes = &tree.node(div).unwrap().line_boxes;
    assert_eq!(boxes[0].font.as_ref().unwrap().size, 32);
    assert_eq!(boxes[0].rect.width, 32);
    assert_eq!(boxes[1].font.as_ref().unwrap().size, 16);
    assert_eq!(boxes[1].rect, Rect::new(0, 32, 16, 16));
}

#[test]
fn test_first_letter_gets_its_own_box() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "Hello world");
    let tree = lay_out(dom, "div::first-letter { font-size: 32px }", 400);

    let got = texts(&tree, div);
    assert_eq!(got[0].0, "H");
    assert_eq!(got[0].1.width, 16);
    assert_eq!(got[1].0, "ello");
    assert_eq!(got[1].1.x, 16);
    assert_eq!(got[2].0, "world");
}

#[test]
fn test_inline_element_padding_reserves_space() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let span = dom.element(div, "span", &[]);
    let _ = dom.text(span, "ab");
    let _ = dom.text(div, "cd");
    let tree = lay_out(dom, "span { padding-left: 4px; padding-right: 6px }", 400);

    let got = texts(&tree, div);
    assert_eq!(got[0].1.x, 4);
    assert_eq!(got[1].1.x, 4 + 16 + 6);
}

#[test]
fn test_display_none_is_skipped() {
    let mut dom = DomTree::new();
    let hidden = dom.element(NodeId::ROOT, "div", &[("style", "display: none")]);
    let _ = dom.text(hidden, "invisible");
    let shown = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(shown, "x");
    let tree = lay_out(dom, "", 400);

    assert_eq!(tree.absolute_rect(hidden), None);
    assert_eq!(rect(&tree, shown).y, 0);
}

#[test]
fn test_zero_width_text_reports_no_room() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "word");
    let mut tree = styled(dom, "div { width: 0 }");
    let shaper = MonospaceShaper::default();

    let err = tree.layout(400, &LayoutContext::new(&shaper)).unwrap_err();
    assert_eq!(err, LayoutError::NoRoom { node: div, width: 0 });
}

#[test]
fn test_layout_is_idempotent() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.element(div, "span", &[]);
    let _ = dom.text(div, "some text around a float");
    let mut tree = styled(dom, "span { float: left; width: 30px; height: 30px }");
    let shaper = MonospaceShaper::default();
    let ctx = LayoutContext::new(&shaper);

    tree.layout(200, &ctx).unwrap();
    let first = tree.node(div).unwrap().clone();
    tree.layout(200, &ctx).unwrap();
    let second = tree.node(div).unwrap();

    assert_eq!(first.floats, second.floats);
    assert_eq!(second.floats.len(), 1);
    assert_eq!(first.line_boxes.len(), second.line_boxes.len());
    assert_eq!(first.draw_rect, second.draw_rect);

    // Invalidation recomputes the same geometry.
    tree.invalidate(div);
    assert!(!tree.is_laid_out());
    tree.layout(200, &ctx).unwrap();
    let third = tree.node(div).unwrap();
    assert_eq!(third.floats.len(), 1);
    assert_eq!(third.draw_rect, first.draw_rect);
}

#[test]
fn test_viewport_change_relays_out() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let mut tree = styled(dom, "div { height: 5px }");
    let shaper = MonospaceShaper::default();
    let ctx = LayoutContext::new(&shaper);

    tree.layout(200, &ctx).unwrap();
    assert_eq!(rect(&tree, div).width, 200);
    tree.layout(300, &ctx).unwrap();
    assert_eq!(rect(&tree, div).width, 300);
}

#[test]
fn test_cancelled_layout_leaves_tree_unfinished() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[]);
    let mut tree = styled(dom, "");
    let shaper = MonospaceShaper::default();
    let ctx = LayoutContext::new(&shaper);

    ctx.cancel.cancel();
    assert_eq!(tree.layout(200, &ctx), Err(LayoutError::Cancelled));
    assert!(!tree.is_laid_out());

    ctx.cancel.reset();
    tree.layout(200, &ctx).unwrap();
    assert!(tree.is_laid_out());
}

#[test]
fn test_hit_testing_prefers_floats_and_deepest_nodes() {
    let mut dom = DomTree::new();
    let float = dom.element(NodeId::ROOT, "div", &[("class", "f")]);
    let block = dom.element(NodeId::ROOT, "div", &[("class", "b")]);
    let word = dom.element(block, "span", &[]);
    let _ = dom.text(word, "hi");
    let tree = lay_out(
        dom,
        ".f { float: left; width: 100px; height: 50px }
         .b { height: 50px }",
        400,
    );

    assert_eq!(tree.at(50, 25), Some(float));
    // The span's text starts at the float's right edge.
    assert_eq!(tree.at(105, 5), Some(word));
    assert_eq!(tree.at(300, 40), Some(block));
    assert_eq!(tree.at(300, 60), None);
}

struct Checkerboard;

impl ImageProvider for Checkerboard {
    fn image(&self, url: &Url) -> Option<Arc<RgbaImage>> {
        url.path()
            .ends_with("board.png")
            .then(|| Arc::new(RgbaImage::from_pixel(10, 5, Rgba([0, 0, 0, 255]))))
    }
}

#[test]
fn test_img_scales_keeping_aspect_ratio() {
    let mut dom = DomTree::new();
    let img = dom.element(
        NodeId::ROOT,
        "img",
        &[("src", "board.png"), ("width", "40")],
    );
    let missing = dom.element(
        NodeId::ROOT,
        "img",
        &[("src", "gone.png"), ("width", "7"), ("height", "9")],
    );
    let mut tree = styled(dom, "");
    let shaper = MonospaceShaper::default();
    let base = Url::parse("http://example.test/page.html").ok();
    let ctx = LayoutContext::new(&shaper)
        .with_images(&Checkerboard)
        .with_base_url(base);
    tree.layout(400, &ctx).unwrap();

    assert_eq!(rect(&tree, img), Rect::new(0, 0, 40, 20));
    let image = tree.node(img).unwrap().image.clone().unwrap();
    assert_eq!(image.dimensions(), (40, 20));

    assert_eq!(rect(&tree, missing), Rect::new(40, 11, 7, 9));
    assert!(tree.node(missing).unwrap().image.is_none());
}

fn float_side(tree: &LayoutTree, id: NodeId) -> Float {
    tree.node(id).unwrap().styles.unconditional.float()
}

#[quickcheck]
fn prop_floats_never_overlap_each_other_or_text(
    specs: Vec<(u8, u8, bool)>,
    line_height: u8,
    tall: u8,
) -> bool {
    let mut dom = DomTree::new();
    let line_height = 16 + u32::from(line_height % 33);
    let container_style = format!("line-height: {line_height}px");
    let container = dom.element(NodeId::ROOT, "div", &[("style", container_style.as_str())]);
    let tall_style = format!("display: inline-block; width: 60px; height: {}px", tall % 121);
    let _ = dom.element(container, "span", &[("style", tall_style.as_str())]);
    for (width, height, right) in specs.iter().take(8) {
        let style = format!(
            "float: {}; width: {width}px; height: {height}px",
            if *right { "right" } else { "left" }
        );
        let _ = dom.element(container, "div", &[("style", style.as_str())]);
        let _ = dom.text(container, "lorem ipsum dolor sit ");
    }
    let tree = lay_out(dom, "div { width: 300px }", 400);
    let node = tree.node(container).unwrap();

    let floats: Vec<(Float, Rect)> = node
        .floats
        .iter()
        .map(|f| (float_side(&tree, *f), tree.node(*f).unwrap().draw_rect))
        .collect();

    for (i, (side_a, a)) in floats.iter().enumerate() {
        for (side_b, b) in &floats[i + 1..] {
            if side_a == side_b && a.intersects(b) {
                return false;
            }
        }
        if node.line_boxes.iter().any(|line| line.rect.intersects(a)) {
            return false;
        }
    }
    true
}

#[test]
fn test_render_paints_backgrounds_and_honours_scroll() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[]);
    let tree = lay_out(
        dom,
        "div { margin-left: 5px; width: 10px; height: 10px; background-color: red }",
        20,
    );
    let shaper = MonospaceShaper::default();
    let ctx = LayoutContext::new(&shaper);
    let white = Rgba([255, 255, 255, 255]);
    let red = Rgba([255, 0, 0, 255]);

    let mut surface = RgbaImage::from_pixel(20, 20, white);
    render(&tree, &mut surface, (0, 0), &ctx).unwrap();
    assert_eq!(*surface.get_pixel(6, 5), red);
    assert_eq!(*surface.get_pixel(2, 2), white);
    assert_eq!(*surface.get_pixel(6, 12), white);

    let mut scrolled = RgbaImage::from_pixel(20, 20, white);
    render(&tree, &mut scrolled, (0, 5), &ctx).unwrap();
    assert_eq!(*scrolled.get_pixel(6, 0), red);
    assert_eq!(*scrolled.get_pixel(6, 5), white);
}

#[test]
fn test_render_requires_layout() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[]);
    let tree = styled(dom, "");
    let shaper = MonospaceShaper::default();
    let mut surface = RgbaImage::new(10, 10);

    let err = render(&tree, &mut surface, (0, 0), &LayoutContext::new(&shaper)).unwrap_err();
    assert_eq!(err, DrawError::NotLaidOut(NodeId::ROOT));
}

#[test]
fn test_render_draws_text_glyphs() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let _ = dom.text(div, "x");
    let tree = lay_out(dom, "div { color: blue }", 20);
    let shaper = MonospaceShaper::default();
    let mut surface = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));

    render(&tree, &mut surface, (0, 0), &LayoutContext::new(&shaper)).unwrap();
    // The monospace glyph fills x-height to baseline: rows 4..12 at 16px.
    assert_eq!(*surface.get_pixel(2, 8), Rgba([0, 0, 255, 255]));
    assert_eq!(*surface.get_pixel(2, 1), Rgba([255, 255, 255, 255]));
}
