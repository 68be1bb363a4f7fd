//! Explicit colour-model conversions
//!
//! Every conversion between channel layouts in the crate goes through these
//! two functions so the alpha policy is stated once.

use image::{DynamicImage, RgbImage, RgbaImage};

/// Convert any decoded image to 8-bit RGBA
///
/// Images without an alpha channel receive alpha = 255 everywhere. Gray images
/// are expanded to equal R, G and B.
#[must_use]
pub fn to_rgba(image: &DynamicImage) -> RgbaImage {
    image.to_rgba8()
}

/// Convert any decoded image to 8-bit RGB
///
/// The alpha channel is dropped as-is; colour values are not premultiplied.
#[must_use]
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba};

    #[test]
    fn test_to_rgba_adds_opaque_alpha() {
        let rgb = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let rgba = to_rgba(&DynamicImage::ImageRgb8(rgb));
        assert!(rgba.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn test_to_rgb_drops_alpha_without_premultiplying() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 0]));
        let rgb = to_rgb(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 100, 50]);
    }

    #[test]
    fn test_gray_expands_to_all_channels() {
        let gray = GrayImage::from_pixel(1, 1, Luma([77]));
        let rgba = to_rgba(&DynamicImage::ImageLuma8(gray));
        assert_eq!(rgba.get_pixel(0, 0).0, [77, 77, 77, 255]);
    }
}
