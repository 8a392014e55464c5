mod generator;
mod tools;

pub use generator::PlaceholderGenerator;
pub use tools::{
    blank_canvas, decode, encode_image, BlankCanvasEncoder, CanvasEncoder, DecodedImage,
    DEFAULT_JPEG_QUALITY,
};
