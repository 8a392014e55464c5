//! Blank placeholder images in any registered format, rendered once per
//! `(format, width, height)` and served from memory afterwards.

pub mod cache;
pub mod config;
pub mod error;
pub mod formats;
pub mod images;

pub use cache::{CacheKey, CacheStats, CachedPayload, ImageCache};
pub use error::{ImagerError, Result};
pub use formats::{resolve, ImageFormatId, IntoImageFormat};
pub use images::{BlankCanvasEncoder, CanvasEncoder, DecodedImage, PlaceholderGenerator};
