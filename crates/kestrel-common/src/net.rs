//! Resource fetching.
//!
//! The layout core never performs I/O itself. It talks to a [`Fetcher`],
//! which turns a resolved URL into bytes plus a status code. Anything
//! outside 200–299 means "not found" to callers: a missing stylesheet or
//! image degrades that one resource, it never fails a layout.
//!
//! [`DefaultFetcher`] handles `http(s)` (blocking reqwest), `data:` and
//! `file:` URLs.

use std::time::Duration;

use base64::Engine;
use thiserror::Error;
use url::Url;

/// User-Agent header sent with all requests.
const USER_AGENT: &str = concat!("kestrel/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by a [`Fetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed before a status was received.
    #[error("request for {url} failed: {reason}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// Transport-level description.
        reason: String,
    },
    /// The URL scheme is not handled by this fetcher.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    /// A `data:` URL could not be decoded.
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),
}

/// Bytes and status of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP-style status code. Local sources report 200 or 404.
    pub status: u16,
    /// Response body.
    pub bytes: Vec<u8>,
}

impl Response {
    /// A 200 response carrying `bytes`.
    #[must_use]
    pub const fn ok(bytes: Vec<u8>) -> Self {
        Self { status: 200, bytes }
    }

    /// Whether the status is in the 200–299 range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Turns a URL into bytes.
///
/// Implementations apply their own timeout policy. They are shared across
/// the document pipeline, so they must be thread-safe.
pub trait Fetcher: Send + Sync {
    /// Fetch `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when no response could be produced at all.
    /// A non-2xx status is a successful fetch with an unsuccessful status.
    fn fetch(&self, url: &Url) -> Result<Response, FetchError>;
}

/// Fetch `url` and return the body only when the fetch succeeded with a
/// 2xx status. Failures are logged and reported as `None`.
#[must_use]
pub fn fetch_ok(fetcher: &dyn Fetcher, url: &Url) -> Option<Vec<u8>> {
    match fetcher.fetch(url) {
        Ok(response) if response.is_success() => Some(response.bytes),
        Ok(response) => {
            tracing::warn!(%url, status = response.status, "resource not found");
            None
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "fetch failed");
            None
        }
    }
}

/// A parsed `data:` URL.
///
/// [RFC 2397](https://www.rfc-editor.org/rfc/rfc2397)
///
/// `data:[<mediatype>][;base64],<data>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// Everything between `data:` and the comma.
    pub metadata: &'a str,
    /// Everything after the comma.
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Split a raw `data:` URL into metadata and payload.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedDataUrl`] if the comma is missing.
    pub fn parse(raw: &'a str) -> Result<Self, FetchError> {
        let body = raw.strip_prefix("data:").unwrap_or(raw);
        let (metadata, payload) = body
            .split_once(',')
            .ok_or_else(|| FetchError::MalformedDataUrl("missing comma".to_string()))?;
        Ok(Self { metadata, payload })
    }

    /// Decode the payload: base64 when the metadata ends in `;base64`,
    /// percent-decoded text otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedDataUrl`] on invalid base64.
    pub fn decode(&self) -> Result<Vec<u8>, FetchError> {
        if self.metadata.ends_with(";base64") {
            base64::engine::general_purpose::STANDARD
                .decode(self.payload.trim())
                .map_err(|e| FetchError::MalformedDataUrl(e.to_string()))
        } else {
            Ok(percent_decode(self.payload))
        }
    }
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Fetcher for `http`, `https`, `data` and `file` URLs.
pub struct DefaultFetcher {
    client: Option<reqwest::blocking::Client>,
}

impl DefaultFetcher {
    /// Build a fetcher. If the HTTP client cannot be created, network URLs
    /// fail with [`FetchError::Transport`] while local URLs keep working.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| tracing::warn!(error = %e, "HTTP client unavailable"))
            .ok();
        Self { client }
    }

    fn fetch_http(&self, url: &Url) -> Result<Response, FetchError> {
        let transport = |reason: String| FetchError::Transport {
            url: url.to_string(),
            reason,
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| transport("no HTTP client".to_string()))?;
        let response = client
            .get(url.as_str())
            .send()
            .map_err(|e| transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .map_err(|e| transport(e.to_string()))?
            .to_vec();
        Ok(Response { status, bytes })
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for DefaultFetcher {
    fn fetch(&self, url: &Url) -> Result<Response, FetchError> {
        tracing::debug!(%url, "fetch");
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "data" => DataUrl::parse(url.as_str())?.decode().map(Response::ok),
            "file" => {
                let Ok(path) = url.to_file_path() else {
                    return Ok(Response {
                        status: 404,
                        bytes: Vec::new(),
                    });
                };
                Ok(std::fs::read(path).map_or(
                    Response {
                        status: 404,
                        bytes: Vec::new(),
                    },
                    Response::ok,
                ))
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_base64() {
        let url = DataUrl::parse("data:text/plain;base64,aGVsbG8=").expect("parses");
        assert_eq!(url.metadata, "text/plain;base64");
        assert_eq!(url.decode().expect("decodes"), b"hello");
    }

    #[test]
    fn test_data_url_percent_encoded() {
        let url = DataUrl::parse("data:text/css,p%20%7B%7D").expect("parses");
        assert_eq!(url.decode().expect("decodes"), b"p {}");
    }

    #[test]
    fn test_data_url_without_comma() {
        assert!(DataUrl::parse("data:text/plain").is_err());
    }

    #[test]
    fn test_default_fetcher_data_scheme() {
        let fetcher = DefaultFetcher { client: None };
        let url = Url::parse("data:,abc").expect("url");
        let response = fetcher.fetch(&url).expect("fetch");
        assert!(response.is_success());
        assert_eq!(response.bytes, b"abc");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let fetcher = DefaultFetcher { client: None };
        let url = Url::parse("file:///definitely/not/here.css").expect("url");
        let response = fetcher.fetch(&url).expect("fetch");
        assert_eq!(response.status, 404);
        assert_eq!(fetch_ok(&fetcher, &url), None);
    }

    #[test]
    fn test_status_ranges() {
        assert!(Response { status: 204, bytes: vec![] }.is_success());
        assert!(!Response { status: 301, bytes: vec![] }.is_success());
        assert!(!Response { status: 199, bytes: vec![] }.is_success());
    }
}
