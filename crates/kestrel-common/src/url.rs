//! URL resolution.
//!
//! [URL Standard § 4.4 URL parsing](https://url.spec.whatwg.org/#url-parsing)
//!
//! Relative references in `href`, `src` and `url(...)` are resolved against
//! the document URL before they reach a fetcher or the visited-link oracle.

use url::Url;

/// Resolve `href` against an optional base URL.
///
/// STEP 1: An absolute URL parses on its own and is returned as is.
///
/// STEP 2: Otherwise it is joined onto `base`.
///
/// Returns `None` when `href` is relative and there is no base, or when the
/// joined result does not parse.
#[must_use]
pub fn resolve_url(href: &str, base: Option<&Url>) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    // STEP 1
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute);
    }

    // STEP 2
    base.and_then(|b| b.join(href).ok())
}

/// Interpret a command-line style location as a URL: either an absolute URL
/// or a filesystem path turned into a `file://` URL.
#[must_use]
pub fn url_from_location(location: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(location) {
        if url.scheme().len() > 1 {
            return Some(url);
        }
    }
    let path = std::path::Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(absolute).ok()
}
