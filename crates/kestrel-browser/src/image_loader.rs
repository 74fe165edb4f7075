//! Image loading: fetch, decode, memoise.
//!
//! [§ 4.8.3 The img element](https://html.spec.whatwg.org/multipage/embedded-content.html#the-img-element)
//!
//! Every URL is fetched and decoded at most once per provider. Failures are
//! remembered too, so a broken image costs one warning and one fetch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use image::RgbaImage;
use kestrel_common::warning::warn_once;
use kestrel_common::{Fetcher, Url, fetch_ok};
use kestrel_css::ImageProvider;

/// Decode raster bytes (PNG, JPEG, GIF, ...) into RGBA.
///
/// # Errors
///
/// Returns the decoder's message when the bytes are not a supported image.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// An [`ImageProvider`] that fetches through a [`Fetcher`] and decodes
/// with the `image` crate.
pub struct DecodingImageProvider {
    fetcher: Arc<dyn Fetcher>,
    cache: RwLock<HashMap<String, Option<Arc<RgbaImage>>>>,
}

impl std::fmt::Debug for DecodingImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.read().map_or(0, |cache| cache.len());
        f.debug_struct("DecodingImageProvider")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

impl DecodingImageProvider {
    /// A provider with an empty cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self, url: &Url) -> Option<Arc<RgbaImage>> {
        let bytes = fetch_ok(self.fetcher.as_ref(), url)?;
        match decode(&bytes) {
            Ok(image) => {
                tracing::debug!(%url, width = image.width(), height = image.height(), "image decoded");
                Some(Arc::new(image))
            }
            Err(e) => {
                warn_once("image", &format!("could not decode '{url}': {e}"));
                None
            }
        }
    }
}

impl ImageProvider for DecodingImageProvider {
    fn image(&self, url: &Url) -> Option<Arc<RgbaImage>> {
        if let Ok(cache) = self.cache.read()
            && let Some(entry) = cache.get(url.as_str())
        {
            return entry.clone();
        }
        let image = self.load(url);
        if let Ok(mut cache) = self.cache.write() {
            let _ = cache.insert(url.to_string(), image.clone());
        }
        image
    }
}
