use std::io::Cursor;

use image::{DynamicImage, GenericImageView};

use crate::error::{ImagerError, Result};
use crate::formats::ImageFormatId;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Turns a requested format and size into encoded bytes.
///
/// The memoizing cache calls this only on a miss, so implementations
/// must be deterministic: the same inputs always yield the same bytes.
pub trait CanvasEncoder: Send + Sync {
    fn encode(&self, format: ImageFormatId, width: u32, height: u32) -> Result<Vec<u8>>;
}

/// Encodes a blank, zero-initialised canvas.
#[derive(Debug, Clone)]
pub struct BlankCanvasEncoder {
    jpeg_quality: u8,
}

impl BlankCanvasEncoder {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

impl Default for BlankCanvasEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl CanvasEncoder for BlankCanvasEncoder {
    fn encode(&self, format: ImageFormatId, width: u32, height: u32) -> Result<Vec<u8>> {
        let canvas = blank_canvas(format, width, height);
        encode_image(&canvas, format, self.jpeg_quality)
    }
}

/// Allocate a canvas whose pixels are all zero: transparent black, or
/// plain black for codecs without an alpha channel.
pub fn blank_canvas(format: ImageFormatId, width: u32, height: u32) -> DynamicImage {
    if format.supports_alpha() {
        DynamicImage::new_rgba8(width, height)
    } else {
        DynamicImage::new_rgb8(width, height)
    }
}

pub fn encode_image(img: &DynamicImage, format: ImageFormatId, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let codec = format.codec_for(img.width(), img.height());

    let encoded = match codec {
        image::ImageFormat::Jpeg => {
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, jpeg_quality);
            encoder.encode_image(img)
        }
        _ => img.write_to(&mut Cursor::new(&mut output), codec),
    };

    encoded.map_err(|e| ImagerError::EncodingFailure {
        format,
        message: format!("{:?} encoding failed: {}", codec, e),
    })?;

    Ok(output)
}

/// An image parsed back out of encoded bytes, along with the format
/// its header declared.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    format: image::ImageFormat,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn format(&self) -> image::ImageFormat {
        self.format
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Decode bytes, detecting the format from the payload header rather
/// than trusting whatever the caller thinks it is.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImagerError::DecodeError(format!("Failed to read image: {}", e)))?;

    let format = reader
        .format()
        .ok_or_else(|| ImagerError::DecodeError("Unrecognized image header".to_string()))?;

    let image = reader
        .decode()
        .map_err(|e| ImagerError::DecodeError(format!("Failed to decode {:?}: {}", format, e)))?;

    Ok(DecodedImage { image, format })
}

#[cfg(test)]
mod tests {
    use image::Pixel;
    use test_case::test_case;

    use super::*;

    #[test_case(ImageFormatId::Jpeg, 3)]
    #[test_case(ImageFormatId::Exif, 3)]
    #[test_case(ImageFormatId::Png, 4)]
    #[test_case(ImageFormatId::Gif, 4)]
    fn test_blank_canvas_channels(format: ImageFormatId, channels: u8) {
        let canvas = blank_canvas(format, 4, 2);
        assert_eq!(canvas.dimensions(), (4, 2));
        assert_eq!(canvas.color().channel_count(), channels);
    }

    #[test]
    fn test_blank_canvas_is_zeroed() {
        let canvas = blank_canvas(ImageFormatId::Png, 3, 3);
        assert!(canvas
            .to_rgba8()
            .pixels()
            .all(|p| p.channels().iter().all(|c| *c == 0)));
    }

    #[test]
    fn test_encode_png_header() {
        let bytes = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Png, 5, 7)
            .unwrap();
        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn test_encode_jpeg_header() {
        let bytes = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Jpeg, 5, 7)
            .unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn test_large_icon_falls_back_to_png() {
        let bytes = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Icon, 512, 512)
            .unwrap();
        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));

        let small = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Icon, 32, 32)
            .unwrap();
        assert!(small.starts_with(&[0x00, 0x00, 0x01, 0x00]));
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(BlankCanvasEncoder::new(0).jpeg_quality(), 1);
        assert_eq!(BlankCanvasEncoder::new(250).jpeg_quality(), 100);
    }

    #[test]
    fn test_decode_detects_format() {
        let bytes = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Bmp, 9, 4)
            .unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (9, 4));
        assert_eq!(decoded.format(), image::ImageFormat::Bmp);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImagerError::DecodeError(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let bytes = BlankCanvasEncoder::default()
            .encode(ImageFormatId::Png, 16, 16)
            .unwrap();
        let err = decode(&bytes[..12]).unwrap_err();
        assert!(matches!(err, ImagerError::DecodeError(_)));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode(&[]), Err(ImagerError::DecodeError(_))));
    }
}
