//! Mock segmenter for testing and debugging
//!
//! Produces a deterministic cutout without any model: pixels inside a centred
//! ellipse are foreground. Useful for exercising the HTTP surface end to end.

use crate::error::{BgError, Result};
use crate::segmentation::Segmenter;
use crate::services::ImageIOService;
use crate::utils::to_rgba;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaskShape {
    /// Ellipse spanning 80% of the width and 90% of the height
    Ellipse,
    /// Every pixel gets the same alpha
    Constant(u8),
    /// Left half foreground, right half background
    LeftHalf,
}

/// Mock backend for testing and debugging purposes
#[derive(Debug)]
pub struct MockSegmenter {
    shape: MaskShape,
    unavailable: bool,
    calls: AtomicUsize,
}

impl MockSegmenter {
    /// Create a mock that cuts out a centred ellipse
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(MaskShape::Ellipse)
    }

    /// Create a mock whose mask has the same value everywhere
    #[must_use]
    pub fn constant(alpha: u8) -> Self {
        Self::with_shape(MaskShape::Constant(alpha))
    }

    /// Create a mock that marks the left half of the image as foreground
    #[must_use]
    pub fn left_half() -> Self {
        Self::with_shape(MaskShape::LeftHalf)
    }

    /// Create a mock that behaves like an unreachable model
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    fn with_shape(shape: MaskShape) -> Self {
        Self {
            shape,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `segment` has been invoked
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn alpha_at(&self, x: u32, y: u32, width: u32, height: u32) -> u8 {
        match self.shape {
            MaskShape::Constant(alpha) => alpha,
            MaskShape::LeftHalf => {
                if x < width / 2 {
                    255
                } else {
                    0
                }
            },
            MaskShape::Ellipse => {
                let cx = f64::from(width) / 2.0;
                let cy = f64::from(height) / 2.0;
                let rx = f64::from(width) * 0.4;
                let ry = f64::from(height) * 0.45;
                let dx = (f64::from(x) + 0.5 - cx) / rx;
                let dy = (f64::from(y) + 0.5 - cy) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    255
                } else {
                    0
                }
            },
        }
    }
}

impl Default for MockSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Segmenter for MockSegmenter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn segment(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable {
            return Err(BgError::segmentation_unavailable("mock model is not loaded"));
        }

        let decoded = ImageIOService::decode(image_bytes, "input")?;
        let mut cutout = to_rgba(&decoded);
        let (width, height) = cutout.dimensions();
        for (x, y, pixel) in cutout.enumerate_pixels_mut() {
            pixel[3] = self.alpha_at(x, y, width, height);
        }

        ImageIOService::encode_png(&DynamicImage::ImageRgba8(cutout))
    }
}
