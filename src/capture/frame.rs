use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::error::ScanError;

/// An in-memory still image held as an encoded PNG buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One crop of a video frame, as produced by `FrameCapture::capture_frame`.
pub type CapturedFrame = EncodedImage;

impl EncodedImage {
    /// Encodes an RGBA buffer as PNG.
    pub fn encode(img: &RgbaImage) -> Result<Self, ScanError> {
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .map_err(ScanError::ImageEncode)?;

        Ok(Self {
            width: img.width(),
            height: img.height(),
            data,
        })
    }

    /// Decodes the buffer back into RGBA pixels.
    pub fn decode(&self) -> Result<RgbaImage, ScanError> {
        image::load_from_memory(&self.data)
            .map(|img| img.to_rgba8())
            .map_err(ScanError::ImageDecode)
    }
}
