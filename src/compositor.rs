//! Background preparation and layer composition
//!
//! The three operations here are pure: each takes decoded buffers and returns
//! a freshly allocated RGBA image.

use crate::{
    error::{BgError, Result},
    geometry::{self, FitOp},
    mask::invert_opacity,
    types::{OpacityPlane, Position, ScaleMode, Size},
    utils::{to_rgb, to_rgba},
};
use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::debug;

/// Canvas colour used by `contain` when no other colour is configured
pub const DEFAULT_PAD_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Resize, crop or pad a background to exactly `target`, returned fully opaque
///
/// Any alpha in the source background is discarded before resizing.
pub fn prepare_background(
    background: &DynamicImage,
    target: Size,
    mode: ScaleMode,
    position: Position,
    pad_color: Rgb<u8>,
) -> Result<RgbaImage> {
    let rgb = to_rgb(background);
    let source = Size::of(&rgb)?;
    let placement = geometry::resolve(source, target, mode, position)?;

    let resized = if placement.resized == source {
        rgb
    } else {
        imageops::resize(
            &rgb,
            placement.resized.width(),
            placement.resized.height(),
            imageops::FilterType::Lanczos3,
        )
    };

    let (x, y) = placement.offset;
    let fitted: RgbImage = match placement.op {
        FitOp::Exact => resized,
        FitOp::Crop => imageops::crop_imm(&resized, x, y, target.width(), target.height()).to_image(),
        FitOp::Pad => {
            let mut canvas = RgbImage::from_pixel(target.width(), target.height(), pad_color);
            imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));
            canvas
        },
    };

    debug!(
        source = %source,
        target = %target,
        mode = %mode,
        position = %position,
        "Prepared background"
    );

    Ok(to_rgba(&DynamicImage::ImageRgb8(fitted)))
}

/// Paste `background` at the origin of a transparent `target` canvas and
/// alpha-composite `foreground` over it
///
/// The foreground must be exactly `target` sized. A background of another size
/// is clipped to the canvas, leaving uncovered pixels transparent.
pub fn compose(background: &RgbaImage, foreground: &RgbaImage, target: Size) -> Result<RgbaImage> {
    if foreground.dimensions() != target.as_tuple() {
        return Err(BgError::dimension_mismatch(
            "foreground does not match target size",
            target.as_tuple(),
            foreground.dimensions(),
        ));
    }
    if background.dimensions() != target.as_tuple() {
        debug!(
            background_width = background.width(),
            background_height = background.height(),
            target = %target,
            "Background size differs from target, clipping at origin"
        );
    }

    let mut canvas = RgbaImage::new(target.width(), target.height());
    imageops::replace(&mut canvas, background, 0, 0);

    for (dst, src) in canvas.pixels_mut().zip(foreground.pixels()) {
        *dst = blend_over(*src, *dst);
    }

    Ok(canvas)
}

/// Copy of `original` whose alpha is the inverse of `foreground_alpha`
///
/// Colour data is untouched; pixels the segmentation judged foreground become
/// transparent in proportion to their mask value.
pub fn extract_background_only(
    original: &RgbaImage,
    foreground_alpha: &OpacityPlane,
) -> Result<RgbaImage> {
    Size::of(original)?;
    if original.dimensions() != foreground_alpha.dimensions() {
        return Err(BgError::dimension_mismatch(
            "foreground alpha does not match original image",
            original.dimensions(),
            foreground_alpha.dimensions(),
        ));
    }

    let inverse = invert_opacity(foreground_alpha);
    let mut result = original.clone();
    inverse.apply_to_image(&mut result)?;
    Ok(result)
}

/// Porter-Duff "over" for non-premultiplied 8-bit RGBA, rounded to nearest
///
/// Exact at both ends: an opaque `src` yields `src`, a transparent `src`
/// yields `dst`.
#[must_use]
pub fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0;
    let [dr, dg, db, da] = dst.0;
    let src_alpha = u32::from(sa);
    let dst_weight = u32::from(da) * (255 - src_alpha);
    let src_weight = src_alpha * 255;
    let out_alpha = src_weight + dst_weight;

    if out_alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        ((u32::from(s) * src_weight + u32::from(d) * dst_weight + out_alpha / 2) / out_alpha) as u8
    };

    Rgba([
        channel(sr, dr),
        channel(sg, dg),
        channel(sb, db),
        ((out_alpha + 127) / 255) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::extract_opacity;

    fn size(width: u32, height: u32) -> Size {
        Size::new(width, height).unwrap()
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn test_prepare_background_always_matches_target() {
        let background = gradient(97, 61);
        let targets = [size(40, 40), size(200, 50), size(13, 170), size(97, 61)];
        for target in targets {
            for mode in ScaleMode::ALL {
                for position in Position::ALL {
                    let prepared =
                        prepare_background(&background, target, mode, position, DEFAULT_PAD_COLOR)
                            .unwrap();
                    assert_eq!(prepared.dimensions(), target.as_tuple(), "{mode} {position}");
                    assert!(prepared.pixels().all(|p| p[3] == 255));
                }
            }
        }
    }

    #[test]
    fn test_prepare_background_drops_source_alpha() {
        let transparent = RgbaImage::from_pixel(8, 8, Rgba([12, 34, 56, 0]));
        let prepared = prepare_background(
            &DynamicImage::ImageRgba8(transparent),
            size(8, 8),
            ScaleMode::Cover,
            Position::Center,
            DEFAULT_PAD_COLOR,
        )
        .unwrap();
        assert!(prepared.pixels().all(|p| p.0 == [12, 34, 56, 255]));
    }

    #[test]
    fn test_contain_pads_with_configured_color() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([255, 0, 0])));
        let pad = Rgb([0, 0, 255]);
        let prepared =
            prepare_background(&red, size(20, 20), ScaleMode::Contain, Position::Top, pad).unwrap();

        // resized to 20x10 anchored at the top edge
        assert_eq!(prepared.get_pixel(10, 0).0, [255, 0, 0, 255]);
        assert_eq!(prepared.get_pixel(10, 9).0, [255, 0, 0, 255]);
        assert_eq!(prepared.get_pixel(10, 10).0, [0, 0, 255, 255]);
        assert_eq!(prepared.get_pixel(0, 19).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_fill_top_left_keeps_top_left_region_of_resized_image() {
        let background = gradient(400, 300);
        let prepared = prepare_background(
            &background,
            size(200, 200),
            ScaleMode::Fill,
            Position::TopLeft,
            DEFAULT_PAD_COLOR,
        )
        .unwrap();

        let resized = imageops::resize(
            &background.to_rgb8(),
            266,
            200,
            imageops::FilterType::Lanczos3,
        );
        let expected = imageops::crop_imm(&resized, 0, 0, 200, 200).to_image();
        for (x, y, pixel) in prepared.enumerate_pixels() {
            let [r, g, b] = expected.get_pixel(x, y).0;
            assert_eq!(pixel.0, [r, g, b, 255]);
        }
    }

    #[test]
    fn test_stretch_matches_direct_resize() {
        let background = gradient(30, 10);
        let prepared = prepare_background(
            &background,
            size(10, 30),
            ScaleMode::Stretch,
            Position::BottomRight,
            DEFAULT_PAD_COLOR,
        )
        .unwrap();
        let expected = imageops::resize(&background.to_rgb8(), 10, 30, imageops::FilterType::Lanczos3);
        assert_eq!(&prepared.get_pixel(3, 17).0[..3], &expected.get_pixel(3, 17).0[..]);
    }

    #[test]
    fn test_compose_respects_foreground_opacity() {
        let target = size(4, 1);
        let background = RgbaImage::from_pixel(4, 1, Rgba([0, 0, 255, 255]));
        let mut foreground = RgbaImage::new(4, 1);
        foreground.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        foreground.put_pixel(1, 0, Rgba([255, 0, 0, 0]));
        foreground.put_pixel(2, 0, Rgba([255, 0, 0, 128]));
        foreground.put_pixel(3, 0, Rgba([10, 20, 30, 255]));

        let result = compose(&background, &foreground, target).unwrap();
        assert_eq!(result.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(1, 0).0, [0, 0, 255, 255]);
        assert_eq!(result.get_pixel(2, 0).0, [128, 0, 127, 255]);
        assert_eq!(result.get_pixel(3, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_compose_with_extracted_opacity_reproduces_layers() {
        let target = size(16, 16);
        let foreground = RgbaImage::from_fn(16, 16, |x, y| {
            let alpha = if x < 8 { 255 } else { 0 };
            Rgba([(x * 13) as u8, (y * 7) as u8, 99, alpha])
        });
        let background = RgbaImage::from_fn(16, 16, |x, y| Rgba([1, (x + y) as u8, 200, 255]));

        let opacity = extract_opacity(&foreground);
        let result = compose(&background, &foreground, target).unwrap();

        for (x, y, pixel) in result.enumerate_pixels() {
            let alpha = opacity.data()[(y * 16 + x) as usize];
            let expected = if alpha == 255 {
                *foreground.get_pixel(x, y)
            } else {
                *background.get_pixel(x, y)
            };
            assert_eq!(&pixel.0[..3], &expected.0[..3]);
            assert_eq!(pixel[3], 255);
        }
    }

    #[test]
    fn test_compose_rejects_foreground_size_mismatch() {
        let background = RgbaImage::new(4, 4);
        let foreground = RgbaImage::new(3, 4);
        let err = compose(&background, &foreground, size(4, 4)).unwrap_err();
        assert!(matches!(err, BgError::DimensionMismatch(_)));
    }

    #[test]
    fn test_compose_clips_undersized_background() {
        let background = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let foreground = RgbaImage::new(3, 3);
        let result = compose(&background, &foreground, size(3, 3)).unwrap();
        assert_eq!(result.get_pixel(1, 1).0, [9, 9, 9, 255]);
        assert_eq!(result.get_pixel(2, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_extract_background_only_full_and_empty_masks() {
        let original = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8, y as u8, 42, 255]));

        let full = extract_background_only(&original, &OpacityPlane::filled((5, 3), 255)).unwrap();
        assert!(full.pixels().all(|p| p[3] == 0));

        let empty = extract_background_only(&original, &OpacityPlane::filled((5, 3), 0)).unwrap();
        assert_eq!(empty, original);

        for (kept, source) in full.pixels().zip(original.pixels()) {
            assert_eq!(&kept.0[..3], &source.0[..3]);
        }
    }

    #[test]
    fn test_extract_background_only_partial_mask() {
        let original = RgbaImage::from_pixel(2, 1, Rgba([50, 60, 70, 255]));
        let mask = OpacityPlane::new(vec![200, 55], (2, 1)).unwrap();
        let result = extract_background_only(&original, &mask).unwrap();
        assert_eq!(result.get_pixel(0, 0).0, [50, 60, 70, 55]);
        assert_eq!(result.get_pixel(1, 0).0, [50, 60, 70, 200]);
    }

    #[test]
    fn test_extract_background_only_rejects_mismatch() {
        let original = RgbaImage::new(4, 4);
        let err = extract_background_only(&original, &OpacityPlane::filled((4, 5), 0)).unwrap_err();
        assert!(matches!(err, BgError::DimensionMismatch(_)));
    }

    #[test]
    fn test_blend_over_endpoints() {
        let dst = Rgba([1, 2, 3, 255]);
        assert_eq!(blend_over(Rgba([200, 100, 50, 255]), dst).0, [200, 100, 50, 255]);
        assert_eq!(blend_over(Rgba([200, 100, 50, 0]), dst).0, [1, 2, 3, 255]);
        assert_eq!(blend_over(Rgba([5, 5, 5, 0]), Rgba([7, 7, 7, 0])).0, [0, 0, 0, 0]);
    }
}
