//! Stylesheet collection.
//!
//! [§ 4.2.4 The link element](https://html.spec.whatwg.org/multipage/semantics.html#the-link-element)
//! [§ 4.2.6 The style element](https://html.spec.whatwg.org/multipage/semantics.html#the-style-element)
//!
//! Gathers the author sheets of a document in document order. `style`
//! attributes are not collected here: the cascade reads them from the
//! elements directly.

use kestrel_common::warning::warn_once;
use kestrel_common::{Fetcher, Url, fetch_ok, resolve_url};
use kestrel_css::{Origin, Stylesheet, parse_stylesheet};
use kestrel_dom::{DomTree, ElementData, NodeId, NodeType};

/// Where an author stylesheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetSource {
    /// `<link rel="stylesheet" href="...">`.
    External {
        /// The `href` attribute, unresolved.
        href: String,
    },
    /// The text content of a `<style>` element.
    Embedded {
        /// The CSS text.
        text: String,
    },
}

/// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
///
/// "Declarations from style sheets independently linked by the originating
/// document are treated as if they were concatenated in linking order."
///
/// Stylesheet sources in document order.
#[must_use]
pub fn collect_sources(tree: &DomTree) -> Vec<StylesheetSource> {
    let mut sources = Vec::new();
    collect_recursive(tree, tree.root(), &mut sources);
    sources
}

fn collect_recursive(tree: &DomTree, id: NodeId, sources: &mut Vec<StylesheetSource>) {
    let Some(node) = tree.get(id) else { return };

    if let NodeType::Element(data) = &node.node_type {
        if data.tag_name.eq_ignore_ascii_case("link") {
            // STEP 1: Only stylesheet links with a non-empty href.
            if let Some(href) = is_stylesheet_link(data)
                .then(|| data.attr("href"))
                .flatten()
                .filter(|href| !href.trim().is_empty())
            {
                sources.push(StylesheetSource::External {
                    href: href.to_string(),
                });
            }
        } else if data.tag_name.eq_ignore_ascii_case("style") {
            // STEP 2: The style element's child text, concatenated.
            let text: String = tree
                .children(id)
                .iter()
                .filter_map(|&child| tree.as_text(child))
                .collect();
            sources.push(StylesheetSource::Embedded { text });
        }
    }

    for &child in tree.children(id) {
        collect_recursive(tree, child, sources);
    }
}

/// [§ 2.4.7 Space-separated tokens](https://html.spec.whatwg.org/multipage/common-microsyntaxes.html#space-separated-tokens)
///
/// "If the rel attribute's value contains the token stylesheet, then the
/// link is a stylesheet link."
fn is_stylesheet_link(data: &ElementData) -> bool {
    data.attr("rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

/// Parse every author sheet of `tree`. Linked sheets are resolved against
/// `base_url` and fetched through `fetcher`.
///
/// "If the resource is not available, the user agent must act as if the
/// resource was an empty style sheet": a failed or non-2xx fetch skips
/// that sheet with a warning.
#[must_use]
pub fn author_stylesheets(
    tree: &DomTree,
    base_url: Option<&Url>,
    fetcher: &dyn Fetcher,
) -> Vec<Stylesheet> {
    let mut sheets = Vec::new();
    for source in collect_sources(tree) {
        match source {
            StylesheetSource::Embedded { text } => {
                sheets.push(parse_stylesheet(&text, Origin::Author));
            }
            StylesheetSource::External { href } => {
                let Some(url) = resolve_url(&href, base_url) else {
                    warn_once("stylesheet", &format!("cannot resolve '{href}'"));
                    continue;
                };
                let Some(bytes) = fetch_ok(fetcher, &url) else {
                    warn_once("stylesheet", &format!("failed to load '{url}'"));
                    continue;
                };
                let text = String::from_utf8_lossy(&bytes);
                tracing::debug!(%url, bytes = bytes.len(), "linked stylesheet loaded");
                sheets.push(parse_stylesheet(&text, Origin::Author));
            }
        }
    }
    sheets
}
