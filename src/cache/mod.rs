mod image;

pub use self::image::{CacheKey, CacheStats, CachedPayload, ImageCache};
