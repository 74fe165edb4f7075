//! Common utilities for the Kestrel renderer.
//!
//! This crate holds the narrow interfaces the layout core uses to reach the
//! outside world, plus shared infrastructure:
//! - **Warning System** - deduplicated warnings for unsupported input
//! - **Fetching** - the [`net::Fetcher`] trait and a default implementation
//! - **History** - the visited-link oracle consumed by selector matching
//! - **URL resolution** - relative references against the document URL

pub mod history;
pub mod net;
pub mod url;
pub mod warning;

pub use history::{History, NoHistory, VisitedSet};
pub use net::{DefaultFetcher, FetchError, Fetcher, Response, fetch_ok};
pub use self::url::resolve_url;

/// Re-export of the URL type used across the workspace.
pub use ::url::Url;
