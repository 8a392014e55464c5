use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{ImagerError, Result};

/// The closed set of formats a placeholder can be requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageFormatId {
    Bmp,
    Emf,
    Exif,
    Gif,
    Icon,
    Jpeg,
    MemoryBmp,
    Png,
    Tiff,
    Wmf,
}

pub const MAX_ICON_DIMENSION: u32 = 256;

lazy_static! {
    // Keys are lowercased so lookups ignore case.
    static ref MIME_TO_FORMAT: HashMap<String, ImageFormatId> = ImageFormatId::ALL
        .iter()
        .map(|format| (format.mime_type().to_ascii_lowercase(), *format))
        .collect();
}

impl ImageFormatId {
    pub const ALL: [ImageFormatId; 10] = [
        ImageFormatId::Bmp,
        ImageFormatId::Emf,
        ImageFormatId::Exif,
        ImageFormatId::Gif,
        ImageFormatId::Icon,
        ImageFormatId::Jpeg,
        ImageFormatId::MemoryBmp,
        ImageFormatId::Png,
        ImageFormatId::Tiff,
        ImageFormatId::Wmf,
    ];

    /// Canonical MIME string. `image/Wmf` keeps its historical casing.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormatId::Bmp => "image/bmp",
            ImageFormatId::Emf => "image/emf",
            ImageFormatId::Exif => "image/exif",
            ImageFormatId::Gif => "image/gif",
            ImageFormatId::Icon => "image/icon",
            ImageFormatId::Jpeg => "image/jpeg",
            ImageFormatId::MemoryBmp => "image/memorybmp",
            ImageFormatId::Png => "image/png",
            ImageFormatId::Tiff => "image/tiff",
            ImageFormatId::Wmf => "image/Wmf",
        }
    }

    /// The container actually written for this format.
    ///
    /// Metafiles have no raster encoder and fall back to PNG, EXIF is a
    /// JPEG stream and an in-memory bitmap is serialized as BMP.
    pub fn codec(&self) -> image::ImageFormat {
        match self {
            ImageFormatId::Bmp | ImageFormatId::MemoryBmp => image::ImageFormat::Bmp,
            ImageFormatId::Gif => image::ImageFormat::Gif,
            ImageFormatId::Icon => image::ImageFormat::Ico,
            ImageFormatId::Jpeg | ImageFormatId::Exif => image::ImageFormat::Jpeg,
            ImageFormatId::Png | ImageFormatId::Emf | ImageFormatId::Wmf => {
                image::ImageFormat::Png
            }
            ImageFormatId::Tiff => image::ImageFormat::Tiff,
        }
    }

    /// The container written for a canvas of this size. ICO cannot
    /// describe images past 256x256, so larger icons are written as PNG.
    pub fn codec_for(&self, width: u32, height: u32) -> image::ImageFormat {
        match self {
            ImageFormatId::Icon if width > MAX_ICON_DIMENSION || height > MAX_ICON_DIMENSION => {
                image::ImageFormat::Png
            }
            _ => self.codec(),
        }
    }

    pub fn extension(&self) -> &'static str {
        self.codec().extensions_str().first().copied().unwrap_or("bin")
    }

    /// Whether the written codec can store an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        self.codec() != image::ImageFormat::Jpeg
    }
}

/// Resolve a MIME string to its format, ignoring case, surrounding
/// whitespace and any `;` parameters.
pub fn resolve(mime_type: &str) -> Result<ImageFormatId> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();

    MIME_TO_FORMAT
        .get(&essence.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| ImagerError::UnsupportedFormat(mime_type.to_string()))
}

/// Every registered MIME string, in registry order.
pub fn supported_mime_types() -> impl Iterator<Item = &'static str> {
    ImageFormatId::ALL.iter().map(|format| format.mime_type())
}

impl fmt::Display for ImageFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for ImageFormatId {
    type Err = ImagerError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

impl TryFrom<String> for ImageFormatId {
    type Error = ImagerError;

    fn try_from(value: String) -> Result<Self> {
        resolve(&value)
    }
}

impl From<ImageFormatId> for String {
    fn from(format: ImageFormatId) -> Self {
        format.mime_type().to_string()
    }
}

/// Anything a caller may use to pick a format: a MIME string or an
/// already-resolved [`ImageFormatId`].
pub trait IntoImageFormat {
    fn into_image_format(self) -> Result<ImageFormatId>;
}

impl IntoImageFormat for ImageFormatId {
    fn into_image_format(self) -> Result<ImageFormatId> {
        Ok(self)
    }
}

impl IntoImageFormat for &ImageFormatId {
    fn into_image_format(self) -> Result<ImageFormatId> {
        Ok(*self)
    }
}

impl IntoImageFormat for &str {
    fn into_image_format(self) -> Result<ImageFormatId> {
        resolve(self)
    }
}

impl IntoImageFormat for String {
    fn into_image_format(self) -> Result<ImageFormatId> {
        resolve(&self)
    }
}

impl IntoImageFormat for &String {
    fn into_image_format(self) -> Result<ImageFormatId> {
        resolve(self)
    }
}
