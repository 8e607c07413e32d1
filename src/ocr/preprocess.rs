use image::{Rgba, RgbaImage};

use crate::capture::EncodedImage;
use crate::error::ScanError;

/// A captured frame after grayscale, contrast stretch and binarization.
pub type PreprocessedImage = EncodedImage;

/// Parameters of the pixel transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreprocessParams {
    pub contrast: f32,
    pub threshold: f32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            contrast: 1.5,
            threshold: 128.0,
        }
    }
}

/// Decodes, binarizes and re-encodes a captured frame.
///
/// Fails with `ImageDecode` only when the buffer is corrupt, which means the
/// capture stage produced something it should not have.
pub fn preprocess(frame: &EncodedImage, params: &PreprocessParams) -> Result<PreprocessedImage, ScanError> {
    let mut img = frame.decode()?;
    binarize(&mut img, params);
    EncodedImage::encode(&img)
}

/// Converts image to pure black/white in place.
///
/// Each pixel goes through luminance (`0.299 R + 0.587 G + 0.114 B`), a
/// contrast stretch around 128, and a hard threshold. The result is written to
/// all three color channels; alpha is kept.
pub fn binarize(img: &mut RgbaImage, params: &PreprocessParams) {
    let factor = contrast_factor(params.contrast);

    for pixel in img.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let gray = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let adjusted = factor * (gray - 128.0) + 128.0;

        let value = if adjusted > params.threshold { 255u8 } else { 0u8 };
        *pixel = Rgba([value, value, value, a]);
    }
}

/// Standard contrast-stretch factor: `259 (c + 255) / (255 (259 - c))`.
pub fn contrast_factor(contrast: f32) -> f32 {
    (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(img: &RgbaImage) -> EncodedImage {
        EncodedImage::encode(img).unwrap()
    }

    #[test]
    fn test_contrast_factor() {
        assert!((contrast_factor(0.0) - 1.0).abs() < 1e-6);
        assert!(contrast_factor(1.5) > 1.0);
    }

    #[test]
    fn test_binarize() {
        let mut img = RgbaImage::new(4, 1);

        // Pixel 0: Dark (should become black)
        img.put_pixel(0, 0, Rgba([40, 40, 40, 255]));

        // Pixel 1: Bright (should become white)
        img.put_pixel(1, 0, Rgba([220, 220, 220, 255]));

        // Pixel 2: Pure green, luminance ~150 (should become white)
        img.put_pixel(2, 0, Rgba([0, 255, 0, 128]));

        // Pixel 3: Pure blue, luminance ~29 (should become black)
        img.put_pixel(3, 0, Rgba([0, 0, 255, 255]));

        binarize(&mut img, &PreprocessParams::default());

        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgba([255, 255, 255, 128]), "Alpha is preserved");
        assert_eq!(img.get_pixel(3, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_threshold_splits_around_mid_gray() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([127, 127, 127, 255]));
        img.put_pixel(1, 0, Rgba([129, 129, 129, 255]));

        binarize(&mut img, &PreprocessParams::default());

        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_preprocess_keeps_dimensions_and_is_neutral() {
        let img = RgbaImage::from_fn(31, 7, |x, y| Rgba([(x * 8) as u8, (y * 36) as u8, 90, 255]));
        let out = preprocess(&encode(&img), &PreprocessParams::default()).unwrap();

        assert_eq!((out.width, out.height), (31, 7));
        let decoded = out.decode().unwrap();
        for p in decoded.pixels() {
            assert!(p[0] == 0 || p[0] == 255);
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
        }
    }

    #[test]
    fn test_preprocess_is_deterministic_and_idempotent() {
        let img = RgbaImage::from_fn(40, 12, |x, y| {
            Rgba([(x * 6) as u8, (y * 20) as u8, ((x + y) * 5) as u8, 255])
        });
        let params = PreprocessParams::default();

        let once = preprocess(&encode(&img), &params).unwrap();
        let again = preprocess(&encode(&img), &params).unwrap();
        assert_eq!(once, again);

        let twice = preprocess(&once, &params).unwrap();
        assert_eq!(twice.decode().unwrap(), once.decode().unwrap());
    }

    #[test]
    fn test_preprocess_corrupt_input() {
        let bogus = EncodedImage {
            width: 2,
            height: 2,
            data: b"definitely not a png".to_vec(),
        };
        assert!(matches!(
            preprocess(&bogus, &PreprocessParams::default()),
            Err(ScanError::ImageDecode(_))
        ));
    }
}
