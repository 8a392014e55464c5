use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::formats::ImageFormatId;

/// Identifies one rendered placeholder.
///
/// Hashed as a tuple, so `1x23` and `12x3` are distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub format: ImageFormatId,
    pub width: u32,
    pub height: u32,
}

impl CacheKey {
    pub fn new(format: ImageFormatId, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }

    /// MIME, width and height run together with no separator. Ambiguous
    /// (`image/png123` is both 1x23 and 12x3); only for consumers that
    /// still index on the old string.
    pub fn legacy_id(&self) -> String {
        format!("{}{}{}", self.format.mime_type(), self.width, self.height)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}x{}", self.format, self.width, self.height)
    }
}

/// Encoded bytes for one key. Cloning shares the buffer; nothing can
/// mutate it once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    bytes: Arc<[u8]>,
    format: ImageFormatId,
}

impl CachedPayload {
    pub fn new(bytes: Vec<u8>, format: ImageFormatId) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn format(&self) -> ImageFormatId {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Quoted md5 digest, ready for an `ETag` header.
    pub fn etag(&self) -> String {
        format!("\"{:x}\"", md5::compute(&self.bytes))
    }

    /// True when the buffer is the very same allocation as `other`'s.
    pub fn shares_buffer(&self, other: &CachedPayload) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl AsRef<[u8]> for CachedPayload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Rendered placeholders, kept in memory for the life of the process.
pub struct ImageCache {
    images: RwLock<HashMap<CacheKey, CachedPayload>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_image(&self, key: &CacheKey) -> Option<CachedPayload> {
        let images = self.images.read();
        match images.get(key) {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Last writer wins when two callers race on the same key.
    pub fn store_image(&self, key: CacheKey, payload: CachedPayload) {
        let mut images = self.images.write();
        images.insert(key, payload);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.images.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.images.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let images = self.images.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: images.len(),
            bytes: images.values().map(CachedPayload::len).sum(),
        }
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub bytes: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images ({} bytes), {} hits, {} misses",
            self.entries, self.bytes, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8]) -> CachedPayload {
        CachedPayload::new(bytes.to_vec(), ImageFormatId::Png)
    }

    #[test]
    fn test_store_and_get() {
        let cache = ImageCache::new();
        let key = CacheKey::new(ImageFormatId::Png, 10, 10);

        assert!(cache.get_image(&key).is_none());
        cache.store_image(key, payload(b"abc"));

        let found = cache.get_image(&key).unwrap();
        assert_eq!(found.as_bytes(), b"abc");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = ImageCache::new();
        let key = CacheKey::new(ImageFormatId::Gif, 1, 1);

        cache.store_image(key, payload(b"first"));
        cache.store_image(key, payload(b"second"));

        assert_eq!(cache.get_image(&key).unwrap().as_bytes(), b"second");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_do_not_collide() {
        let a = CacheKey::new(ImageFormatId::Png, 1, 23);
        let b = CacheKey::new(ImageFormatId::Png, 12, 3);

        assert_ne!(a, b);
        assert_eq!(a.to_string(), "image/png:1x23");
        assert_eq!(b.to_string(), "image/png:12x3");
        // The unseparated form is the ambiguous one.
        assert_eq!(a.legacy_id(), "image/png123");
        assert_eq!(a.legacy_id(), b.legacy_id());
    }

    #[test]
    fn test_key_includes_format() {
        let cache = ImageCache::new();
        cache.store_image(CacheKey::new(ImageFormatId::Png, 4, 4), payload(b"png"));

        assert!(!cache.contains(&CacheKey::new(ImageFormatId::Bmp, 4, 4)));
        assert!(cache.contains(&CacheKey::new(ImageFormatId::Png, 4, 4)));
    }

    #[test]
    fn test_stats() {
        let cache = ImageCache::new();
        let key = CacheKey::new(ImageFormatId::Png, 2, 2);

        let _ = cache.get_image(&key);
        cache.store_image(key, payload(b"1234"));
        let _ = cache.get_image(&key);
        let _ = cache.get_image(&key);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, 4);
        assert_eq!(stats.to_string(), "1 images (4 bytes), 2 hits, 1 misses");
    }

    #[test]
    fn test_clear() {
        let cache = ImageCache::new();
        cache.store_image(CacheKey::new(ImageFormatId::Png, 2, 2), payload(b"x"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_payload_accessors() {
        let p = CachedPayload::new(b"hello".to_vec(), ImageFormatId::Wmf);
        assert_eq!(p.len(), 5);
        assert_eq!(p.content_type(), "image/Wmf");
        assert_eq!(p.etag(), "\"5d41402abc4b2a76b9719d911017c592\"");
        assert_eq!(p.as_bytes(), b"hello");

        let shared = p.clone();
        assert!(p.shares_buffer(&shared));
        assert!(!p.shares_buffer(&CachedPayload::new(b"hello".to_vec(), ImageFormatId::Wmf)));
    }
}
