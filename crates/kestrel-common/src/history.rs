//! Visited-link oracle.
//!
//! [Selectors § 8.2 The link history pseudo-classes](https://www.w3.org/TR/selectors-4/#link)
//!
//! "The :link pseudo-class applies to links that have not yet been visited.
//! The :visited pseudo-class applies once the link has been visited by the
//! user."
//!
//! The browsing history itself lives outside the renderer. Selector matching
//! only asks one question of it.

use std::collections::HashSet;

use url::Url;

/// Answers whether a URL has been visited.
pub trait History: Send + Sync {
    /// `true` if `url` is in the user's history.
    fn has_visited(&self, url: &Url) -> bool;
}

/// History that has never visited anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl History for NoHistory {
    fn has_visited(&self, _url: &Url) -> bool {
        false
    }
}

/// A fixed set of visited URLs.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit.
    pub fn visit(&mut self, url: &Url) {
        let _ = self.urls.insert(url.as_str().to_string());
    }
}

impl History for VisitedSet {
    fn has_visited(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visited_set() {
        let a = Url::parse("https://example.com/a").expect("url");
        let b = Url::parse("https://example.com/b").expect("url");
        let mut history = VisitedSet::new();
        history.visit(&a);

        assert!(history.has_visited(&a));
        assert!(!history.has_visited(&b));
        assert!(!NoHistory.has_visited(&a));
    }
}
