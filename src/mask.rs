//! Opacity plane extraction and inversion

use crate::types::OpacityPlane;
use image::RgbaImage;

/// Alpha channel of an RGBA image, values copied verbatim
#[must_use]
pub fn extract_opacity(image: &RgbaImage) -> OpacityPlane {
    let data = image.pixels().map(|pixel| pixel[3]).collect();
    OpacityPlane::from_raw_unchecked(data, image.dimensions())
}

/// Per-pixel `255 - value`
///
/// Total over 0..=255 and its own inverse.
#[must_use]
pub fn invert_opacity(mask: &OpacityPlane) -> OpacityPlane {
    let data = mask.data().iter().map(|&value| u8::MAX - value).collect();
    OpacityPlane::from_raw_unchecked(data, mask.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_extract_opacity_is_verbatim() {
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, Rgba([1, 2, 3, 0]));
        image.put_pixel(1, 0, Rgba([4, 5, 6, 128]));
        image.put_pixel(2, 0, Rgba([7, 8, 9, 255]));

        let plane = extract_opacity(&image);
        assert_eq!(plane.dimensions(), (3, 1));
        assert_eq!(plane.data(), &[0, 128, 255]);
    }

    #[test]
    fn test_invert_opacity_full_domain() {
        let values: Vec<u8> = (0..=255).collect();
        let plane = OpacityPlane::new(values, (16, 16)).unwrap();
        let inverted = invert_opacity(&plane);

        for (original, flipped) in plane.data().iter().zip(inverted.data()) {
            assert_eq!(u16::from(*original) + u16::from(*flipped), 255);
        }
    }

    #[test]
    fn test_invert_is_involution() {
        let data: Vec<u8> = (0..60u32).map(|i| (i * 37 % 256) as u8).collect();
        let plane = OpacityPlane::new(data, (10, 6)).unwrap();
        assert_eq!(invert_opacity(&invert_opacity(&plane)), plane);
    }
}
