//! Request orchestration
//!
//! [`BackgroundProcessor`] turns uploaded bytes into encoded PNG results. Each
//! operation validates its inputs by decoding them, makes exactly one call to
//! the segmentation collaborator, and runs the CPU-bound compositing on the
//! blocking thread pool.

use crate::{
    compositor::{self, DEFAULT_PAD_COLOR},
    error::{BgError, Result},
    mask::extract_opacity,
    segmentation::Segmenter,
    services::ImageIOService,
    tracing_config::{events, spans},
    types::{Position, ScaleMode, Size},
    utils::to_rgba,
};
use image::{DynamicImage, Rgb, RgbaImage};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Encoded result plus the attachment name it is served under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub file_name: &'static str,
}

impl RenderedImage {
    pub const REMOVED_BACKGROUND: &'static str = "removed_bg.png";
    pub const MASK: &'static str = "mask.png";
    pub const ADDED_BACKGROUND: &'static str = "added_background.png";
    pub const EXTRACTED_BACKGROUND: &'static str = "background.png";
}

/// Parameters for placing a replacement background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeOptions {
    pub scale: ScaleMode,
    pub position: Position,
    pub pad_color: Rgb<u8>,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            scale: ScaleMode::default(),
            position: Position::default(),
            pad_color: DEFAULT_PAD_COLOR,
        }
    }
}

/// Segmentation output, raw and decoded
struct Cutout {
    encoded: Vec<u8>,
    image: RgbaImage,
}

/// Orchestrates segmentation and compositing for one service instance
pub struct BackgroundProcessor {
    segmenter: Arc<dyn Segmenter>,
}

impl BackgroundProcessor {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self { segmenter }
    }

    /// Name of the configured segmentation backend
    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Foreground cutout, or its alpha as a grayscale mask when `return_mask` is set
    ///
    /// Without `return_mask` the segmentation output is passed through unchanged.
    pub async fn remove_background(&self, image: Vec<u8>, return_mask: bool) -> Result<RenderedImage> {
        let started = Instant::now();
        let (size, image) = decode_for_size(image).await?;
        let cutout = self.segment(&image, size).await?;

        let rendered = if return_mask {
            let png = run_blocking("mask", size.as_tuple(), move || {
                let mask = extract_opacity(&cutout.image).to_image()?;
                ImageIOService::encode_png(&DynamicImage::ImageLuma8(mask))
            })
            .await?;
            RenderedImage {
                png,
                file_name: RenderedImage::MASK,
            }
        } else {
            RenderedImage {
                png: cutout.encoded,
                file_name: RenderedImage::REMOVED_BACKGROUND,
            }
        };

        log_completion("remove_background", size, started);
        Ok(rendered)
    }

    /// Composite the segmented foreground over a replacement background
    ///
    /// Both uploads are decoded before segmentation runs, so a bad background
    /// never costs a model call.
    pub async fn add_background(
        &self,
        image: Vec<u8>,
        background: Vec<u8>,
        options: CompositeOptions,
    ) -> Result<RenderedImage> {
        let started = Instant::now();
        let (size, image, background) = run_blocking("decode", (0, 0), move || {
            let size = Size::of(&ImageIOService::decode(&image, "input")?)?;
            let background = ImageIOService::decode(&background, "background")?;
            Ok((size, image, background))
        })
        .await?;

        let cutout = self.segment(&image, size).await?;

        debug!(scale = %options.scale, position = %options.position, "Placing background");
        let png = run_blocking("add_background", size.as_tuple(), move || {
            let prepared = compositor::prepare_background(
                &background,
                size,
                options.scale,
                options.position,
                options.pad_color,
            )?;
            let composite = compositor::compose(&prepared, &cutout.image, size)?;
            ImageIOService::encode_png(&DynamicImage::ImageRgba8(composite))
        })
        .await?;

        log_completion("add_background", size, started);
        Ok(RenderedImage {
            png,
            file_name: RenderedImage::ADDED_BACKGROUND,
        })
    }

    /// Original image with the foreground made transparent
    pub async fn extract_background(&self, image: Vec<u8>) -> Result<RenderedImage> {
        let started = Instant::now();
        let (original, image) = run_blocking("decode", (0, 0), move || {
            let original = to_rgba(&ImageIOService::decode(&image, "input")?);
            Ok((original, image))
        })
        .await?;
        let size = Size::of(&original)?;

        let cutout = self.segment(&image, size).await?;

        let png = run_blocking("extract_background", size.as_tuple(), move || {
            let alpha = extract_opacity(&cutout.image);
            let background = compositor::extract_background_only(&original, &alpha)?;
            ImageIOService::encode_png(&DynamicImage::ImageRgba8(background))
        })
        .await?;

        log_completion("extract_background", size, started);
        Ok(RenderedImage {
            png,
            file_name: RenderedImage::EXTRACTED_BACKGROUND,
        })
    }

    /// Single segmentation call, with the output checked against the input size
    async fn segment(&self, image: &[u8], expected: Size) -> Result<Cutout> {
        let started = Instant::now();
        let span = spans::segmentation(self.segmenter.name(), expected.as_tuple());
        let encoded = self.segmenter.segment(image).instrument(span).await?;
        events::performance_metric("segmentation", elapsed_ms(started));

        run_blocking("decode_cutout", expected.as_tuple(), move || {
            let decoded = ImageIOService::decode(&encoded, "segmentation output")
                .map_err(|e| BgError::segmentation(e.to_string()))?;
            let image = to_rgba(&decoded);
            if image.dimensions() != expected.as_tuple() {
                return Err(BgError::segmentation(format!(
                    "segmenter returned {}x{} for a {} input",
                    image.width(),
                    image.height(),
                    expected
                )));
            }
            Ok(Cutout { encoded, image })
        })
        .await
    }
}

impl std::fmt::Debug for BackgroundProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundProcessor")
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

/// Decode the main upload to validate it and learn its size, handing the bytes back
async fn decode_for_size(image: Vec<u8>) -> Result<(Size, Vec<u8>)> {
    run_blocking("decode", (0, 0), move || {
        let size = Size::of(&ImageIOService::decode(&image, "input")?)?;
        Ok((size, image))
    })
    .await
}

/// Run CPU-bound work off the async executor
async fn run_blocking<T, F>(operation: &'static str, dimensions: (u32, u32), work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = spans::compositing(operation, dimensions);
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| BgError::internal(format!("{} task failed: {}", operation, e)))?;
    events::performance_metric(operation, elapsed_ms(started));
    result
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_completion(operation: &str, size: Size, started: Instant) {
    info!(
        operation = %operation,
        size = %size,
        duration_ms = elapsed_ms(started),
        "Request processed"
    );
}
