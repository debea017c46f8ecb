use fw_tensor::{ByteOrder, Shape, Tensor};
use image::imageops::FilterType;
use tracing::debug;

use crate::error::{Result, VisionError};

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Turns an encoded image into the single-channel tensor a digit classifier
/// expects: resized to `width x height`, one luminance value per pixel, laid
/// out as `[1, 1, height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
}

impl ImagePreprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        ImagePreprocessor { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decode `bytes` (PNG, JPEG, BMP or GIF) and convert them.
    ///
    /// The image is always resampled with a triangle (bilinear) filter, even
    /// when it already has the target size. Alpha is dropped. Values are
    /// `0.299 R + 0.587 G + 0.114 B` on the 0..=255 scale, in native byte
    /// order.
    ///
    /// # Errors
    /// `InvalidDimensions` for a zero target size, `Decode` when the bytes
    /// are not a supported image.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Tensor> {
        if self.width == 0 || self.height == 0 {
            return Err(VisionError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let decoded = image::load_from_memory(bytes)?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            target_width = self.width,
            target_height = self.height,
            "decoded image"
        );
        let rgb = decoded
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();

        let luma: Vec<f32> = rgb
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                (LUMA_R * f64::from(r) + LUMA_G * f64::from(g) + LUMA_B * f64::from(b)) as f32
            })
            .collect();

        let shape = Shape::new(vec![1, 1, self.height as usize, self.width as usize]);
        Ok(Tensor::from_f32(shape, &luma, ByteOrder::native())?)
    }
}

/// Shorthand for `ImagePreprocessor::new(width, height).preprocess(bytes)`.
pub fn preprocess(bytes: &[u8], width: u32, height: u32) -> Result<Tensor> {
    ImagePreprocessor::new(width, height).preprocess(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn solid_png(width: u32, height: u32, pixel: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(pixel));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn test_black_image() {
        let t = preprocess(&solid_png(40, 30, [0, 0, 0]), 28, 28).unwrap();
        assert_eq!(t.shape().dims(), &[1, 1, 28, 28]);
        assert_eq!(t.byte_order(), ByteOrder::native());
        assert!(t.to_f32_vec().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_white_image_is_full_scale() {
        let t = preprocess(&solid_png(28, 28, [255, 255, 255]), 28, 28).unwrap();
        let values = t.to_f32_vec().unwrap();
        assert_eq!(values.len(), 28 * 28);
        assert!(values.iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_luminance_weights() {
        let t = preprocess(&solid_png(3, 3, [200, 0, 0]), 1, 1).unwrap();
        assert_relative_eq!(t.to_f32_vec().unwrap()[0], 59.8, epsilon = 1e-4);

        let t = preprocess(&solid_png(2, 2, [10, 20, 30]), 2, 2).unwrap();
        let expected = 0.299 * 10.0 + 0.587 * 20.0 + 0.114 * 30.0;
        assert_relative_eq!(t.to_f32_vec().unwrap()[3], expected as f32, epsilon = 1e-4);
    }

    #[test]
    fn test_non_square_layout() {
        // Left half black, right half white; width 4, height 2.
        let img = RgbImage::from_fn(4, 2, |x, _| if x < 2 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);
        let t = ImagePreprocessor::new(4, 2).preprocess(&bytes).unwrap();
        assert_eq!(t.shape().dims(), &[1, 1, 2, 4]);
        let v = t.to_f32_vec().unwrap();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[7], 255.0);
    }

    #[test]
    fn test_alpha_is_dropped() {
        let img = RgbaImage::from_pixel(5, 5, Rgba([255, 255, 255, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);
        let t = preprocess(&bytes, 5, 5).unwrap();
        assert!(t.to_f32_vec().unwrap().iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_bmp_input() {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Bmp);
        let t = preprocess(&bytes, 4, 4).unwrap();
        assert!(t.to_f32_vec().unwrap().iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_not_an_image() {
        assert!(matches!(
            preprocess(b"definitely not a png", 28, 28),
            Err(VisionError::Decode(_))
        ));
    }

    #[test]
    fn test_zero_target() {
        assert!(matches!(
            preprocess(&solid_png(2, 2, [0, 0, 0]), 0, 28),
            Err(VisionError::InvalidDimensions { width: 0, height: 28 })
        ));
    }
}
