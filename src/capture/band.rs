use image::{Rgba, RgbaImage};

use crate::config::BandConfig;

/// A rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Computes the scan band for a frame of the given size.
///
/// The band spans `width_ratio` of the frame width and is `height_ratio` of
/// its own width tall, centered both ways. Both sides are clamped to the frame.
pub fn scan_rect(frame_width: u32, frame_height: u32, band: &BandConfig) -> ScanRect {
    let width = ((frame_width as f32 * band.width_ratio) as u32).clamp(1, frame_width.max(1));
    let height = ((width as f32 * band.height_ratio) as u32).clamp(1, frame_height.max(1));

    ScanRect {
        x: frame_width.saturating_sub(width) / 2,
        y: frame_height.saturating_sub(height) / 2,
        width,
        height,
    }
}

/// Crops `rect` out of `frame`. The rect must lie inside the frame.
pub fn crop_band(frame: &RgbaImage, rect: &ScanRect) -> RgbaImage {
    image::imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Applies a contrast then brightness multiplier to the color channels,
/// leaving alpha untouched.
///
/// Contrast pivots on mid-gray: `(v/255 - 0.5) * contrast + 0.5`.
pub fn enhance(img: &mut RgbaImage, contrast: f32, brightness: f32) {
    for pixel in img.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([
            enhance_channel(r, contrast, brightness),
            enhance_channel(g, contrast, brightness),
            enhance_channel(b, contrast, brightness),
            a,
        ]);
    }
}

fn enhance_channel(value: u8, contrast: f32, brightness: f32) -> u8 {
    let v = value as f32 / 255.0;
    let v = ((v - 0.5) * contrast + 0.5) * brightness;
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
