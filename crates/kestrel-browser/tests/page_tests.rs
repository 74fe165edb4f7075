//! Integration tests for the document pipeline.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{ImageFormat, Rgba, RgbaImage};
use kestrel_browser::{Page, PageError, RenderConfig};
use kestrel_common::{FetchError, Fetcher, NoHistory, Response, Url};
use kestrel_css::{DrawError, LayoutError, MonospaceShaper};
use kestrel_dom::{DomTree, NodeId};

/// Serves canned responses and counts requests. Unknown URLs are 404.
#[derive(Default)]
struct CannedFetcher {
    responses: HashMap<String, Response>,
    requests: AtomicUsize,
}

impl CannedFetcher {
    fn with(mut self, url: &str, status: u16, bytes: impl Into<Vec<u8>>) -> Self {
        let _ = self.responses.insert(
            url.to_string(),
            Response {
                status,
                bytes: bytes.into(),
            },
        );
        self
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Fetcher for CannedFetcher {
    fn fetch(&self, url: &Url) -> Result<Response, FetchError> {
        let _ = self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses.get(url.as_str()).cloned().unwrap_or(Response {
            status: 404,
            bytes: Vec::new(),
        }))
    }
}

fn config() -> RenderConfig {
    RenderConfig {
        viewport_width: 200,
        viewport_height: 100,
        base_url: Some("http://test.local/index.html".to_string()),
        ..RenderConfig::default()
    }
}

fn page(dom: DomTree, config: &RenderConfig, fetcher: Arc<CannedFetcher>) -> Page {
    Page::with_shaper(
        dom,
        config,
        fetcher,
        &NoHistory,
        Box::new(MonospaceShaper::default()),
    )
}

fn png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, color)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_linked_and_embedded_sheets_apply_in_document_order() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "link", &[("rel", "stylesheet"), ("href", "site.css")]);
    let style = dom.element(NodeId::ROOT, "style", &[]);
    let _ = dom.text(style, "div { width: 50px }");
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let fetcher = Arc::new(
        CannedFetcher::default().with(
            "http://test.local/site.css",
            200,
            "div { height: 30px; width: 10px }",
        ),
    );

    let mut page = page(dom, &config(), fetcher);
    page.layout(200).unwrap();
    let rect = page.tree().absolute_rect(div).unwrap();
    assert_eq!((rect.width, rect.height), (50, 30));
}

#[test]
fn test_missing_linked_sheet_is_skipped() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "link", &[("rel", "stylesheet"), ("href", "gone.css")]);
    let style = dom.element(NodeId::ROOT, "style", &[]);
    let _ = dom.text(style, "div { height: 12px }");
    let div = dom.element(NodeId::ROOT, "div", &[]);
    let fetcher = Arc::new(CannedFetcher::default());

    let mut page = page(dom, &config(), Arc::clone(&fetcher));
    page.layout(200).unwrap();
    assert_eq!(fetcher.requests(), 1);
    assert_eq!(page.tree().absolute_rect(div).unwrap().height, 12);
}

#[test]
fn test_user_sheet_sits_between_user_agent_and_author() {
    let mut dom = DomTree::new();
    let style = dom.element(NodeId::ROOT, "style", &[]);
    let _ = dom.text(style, "p { height: 10px; width: 10px }");
    let p = dom.element(NodeId::ROOT, "p", &[]);
    let config = RenderConfig {
        user_stylesheet: Some("p { height: 99px; margin: 0; width: 20px !important }".to_string()),
        ..config()
    };

    let mut page = page(dom, &config, Arc::new(CannedFetcher::default()));
    page.layout(200).unwrap();
    let rect = page.tree().absolute_rect(p).unwrap();
    assert_eq!((rect.y, rect.width, rect.height), (0, 20, 10));
}

#[test]
fn test_images_are_fetched_once_and_scaled() {
    let mut dom = DomTree::new();
    let first = dom.element(NodeId::ROOT, "img", &[("src", "dot.png"), ("height", "8")]);
    let second = dom.element(NodeId::ROOT, "img", &[("src", "/dot.png")]);
    let fetcher = Arc::new(CannedFetcher::default().with(
        "http://test.local/dot.png",
        200,
        png(4, 2, Rgba([0, 128, 0, 255])),
    ));

    let mut page = page(dom, &config(), Arc::clone(&fetcher));
    page.layout(200).unwrap();
    assert_eq!(fetcher.requests(), 1);

    let first = page.tree().node(first).unwrap();
    assert_eq!(first.image.as_ref().map(|i| i.dimensions()), Some((16, 8)));
    let second = page.tree().node(second).unwrap();
    assert_eq!(second.image.as_ref().map(|i| i.dimensions()), Some((4, 2)));
}

#[test]
fn test_undecodable_image_keeps_requested_size() {
    let mut dom = DomTree::new();
    let img = dom.element(
        NodeId::ROOT,
        "img",
        &[("src", "broken.png"), ("width", "6"), ("height", "7")],
    );
    let fetcher = Arc::new(CannedFetcher::default().with(
        "http://test.local/broken.png",
        200,
        "not an image",
    ));

    let mut page = page(dom, &config(), fetcher);
    page.layout(200).unwrap();
    let node = page.tree().node(img).unwrap();
    assert!(node.image.is_none());
    let rect = page.tree().absolute_rect(img).unwrap();
    assert_eq!((rect.width, rect.height), (6, 7));
}

#[test]
fn test_render_clears_to_background_and_hit_tests() {
    let mut dom = DomTree::new();
    let div = dom.element(
        NodeId::ROOT,
        "div",
        &[("style", "height: 20px; background-color: navy")],
    );
    let config = RenderConfig {
        background: "yellow".to_string(),
        ..config()
    };

    let mut page = page(dom, &config, Arc::new(CannedFetcher::default()));
    let surface = page.render().unwrap();
    assert_eq!(surface.dimensions(), (200, 100));
    assert_eq!(*surface.get_pixel(10, 10), Rgba([0, 0, 128, 255]));
    assert_eq!(*surface.get_pixel(10, 50), Rgba([255, 255, 0, 255]));

    assert_eq!(page.at(10, 10), Some(div));
    assert_eq!(page.document_height(), 20);
}

#[test]
fn test_oversized_viewport_width_saturates() {
    let mut dom = DomTree::new();
    let div = dom.element(NodeId::ROOT, "div", &[("style", "height: 10px")]);
    let mut page = page(dom, &config(), Arc::new(CannedFetcher::default()));

    page.layout(u32::MAX).unwrap();
    let rect = page.tree().absolute_rect(div).unwrap();
    assert_eq!((rect.width, rect.height), (i32::MAX, 10));
}

#[test]
fn test_render_before_layout_is_an_error() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[]);
    let page = page(dom, &config(), Arc::new(CannedFetcher::default()));
    let mut surface = RgbaImage::new(10, 10);

    assert_eq!(
        page.render_into(&mut surface, (0, 0)),
        Err(DrawError::NotLaidOut(NodeId::ROOT))
    );
}

#[test]
fn test_cancel_token_stops_layout() {
    let mut dom = DomTree::new();
    let _ = dom.element(NodeId::ROOT, "div", &[]);
    let mut page = page(dom, &config(), Arc::new(CannedFetcher::default()));

    let token = page.cancel_token();
    token.cancel();
    assert_eq!(page.layout(200), Err(LayoutError::Cancelled));
    assert!(matches!(
        page.render(),
        Err(PageError::Layout(LayoutError::Cancelled))
    ));

    token.reset();
    assert!(page.render().is_ok());
}
