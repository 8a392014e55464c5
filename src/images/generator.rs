use futures::future::{ready, Ready};
use log::{debug, info};

use crate::cache::{CacheKey, CacheStats, CachedPayload, ImageCache};
use crate::config::AppConfig;
use crate::error::{ImagerError, Result};
use crate::formats::IntoImageFormat;

use super::tools::{self, BlankCanvasEncoder, CanvasEncoder, DecodedImage};

/// Largest RGBA canvas we are willing to allocate, in bytes.
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// Memoizing front for a [`CanvasEncoder`].
///
/// Each instance owns its own cache, so independent generators never see
/// each other's entries. Share one behind an `Arc` to serve many threads.
///
/// There is no single-flight guard: two callers missing on the same key
/// at once both encode, and whichever stores last wins. Encoding is
/// deterministic so both results are identical.
pub struct PlaceholderGenerator<E = BlankCanvasEncoder> {
    cache: ImageCache,
    encoder: E,
    max_dimension: Option<u32>,
}

impl PlaceholderGenerator<BlankCanvasEncoder> {
    pub fn new() -> Self {
        Self::with_encoder(BlankCanvasEncoder::default())
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_encoder(BlankCanvasEncoder::new(config.jpeg_quality))
            .with_max_dimension(config.max_dimension)
    }
}

impl Default for PlaceholderGenerator<BlankCanvasEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CanvasEncoder> PlaceholderGenerator<E> {
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            cache: ImageCache::new(),
            encoder,
            max_dimension: None,
        }
    }

    /// Reject requests wider or taller than `max`.
    pub fn with_max_dimension(mut self, max: Option<u32>) -> Self {
        self.max_dimension = max;
        self
    }

    /// Encoded bytes of a blank `width` x `height` canvas in `format`,
    /// rendered at most once per key barring concurrent misses.
    pub fn get_bytes<F: IntoImageFormat>(
        &self,
        format: F,
        width: u32,
        height: u32,
    ) -> Result<CachedPayload> {
        let format = format.into_image_format()?;
        self.check_dimensions(width, height)?;

        let key = CacheKey::new(format, width, height);
        if let Some(payload) = self.cache.get_image(&key) {
            debug!("Placeholder cache hit for {}", key);
            return Ok(payload);
        }

        debug!("Placeholder cache miss for {}", key);
        let bytes = self.encoder.encode(format, width, height)?;
        let payload = CachedPayload::new(bytes, format);

        info!("Rendered placeholder {} ({} bytes)", key, payload.len());
        self.cache.store_image(key, payload.clone());

        Ok(payload)
    }

    pub fn get_image<F: IntoImageFormat>(
        &self,
        format: F,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage> {
        let payload = self.get_bytes(format, width, height)?;
        self.decode(payload.as_bytes())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        tools::decode(bytes)
    }

    /// [`get_bytes`](Self::get_bytes) for async callers. The work happens
    /// before this returns; the future is already complete.
    pub fn get_bytes_async<F: IntoImageFormat>(
        &self,
        format: F,
        width: u32,
        height: u32,
    ) -> Ready<Result<CachedPayload>> {
        ready(self.get_bytes(format, width, height))
    }

    pub fn get_image_async<F: IntoImageFormat>(
        &self,
        format: F,
        width: u32,
        height: u32,
    ) -> Ready<Result<DecodedImage>> {
        ready(self.get_image(format, width, height))
    }

    /// Render every size up front so the first real request is a hit.
    pub fn prewarm<F: IntoImageFormat + Copy>(
        &self,
        format: F,
        sizes: &[(u32, u32)],
    ) -> Result<usize> {
        for &(width, height) in sizes {
            self.get_bytes(format, width, height)?;
        }
        Ok(sizes.len())
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        let too_large = self
            .max_dimension
            .is_some_and(|max| width > max || height > max);
        let over_budget = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|pixels| pixels.checked_mul(4))
            .map_or(true, |bytes| bytes > MAX_CANVAS_BYTES);

        if width == 0 || height == 0 || too_large || over_budget {
            return Err(ImagerError::InvalidDimensions { width, height });
        }
        Ok(())
    }
}
