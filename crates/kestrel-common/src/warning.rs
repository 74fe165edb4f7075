//! Deduplicated warnings for unsupported input.
//!
//! Stylesheets in the wild repeat the same unsupported property or selector
//! hundreds of times. Each distinct message is emitted once through
//! `tracing` and suppressed afterwards until [`clear_warnings`] is called.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Messages already emitted, keyed by `"[component] message"`.
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about unsupported input, once per unique message.
///
/// # Example
/// ```
/// kestrel_common::warning::warn_once("CSS", "unsupported property 'grid-area'");
/// ```
pub fn warn_once(component: &str, message: &str) {
    let key = format!("[{component}] {message}");
    let first_time = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if first_time {
        tracing::warn!(component, "{message}");
    }
}

/// Forget every recorded warning (call when loading a new document).
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}

/// Whether `message` has already been reported for `component`.
#[must_use]
pub fn was_warned(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|set| set.contains(&key))
}
