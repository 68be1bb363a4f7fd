//! Segmentation collaborator abstraction
//!
//! The compositing core never loads a model. It is handed an implementation of
//! [`Segmenter`] and calls it once per request.

use crate::error::Result;
use async_trait::async_trait;

/// Foreground/background separation service
///
/// `segment` receives the encoded upload and returns encoded image bytes whose
/// decoded RGBA alpha channel is the foreground mask (0 = background,
/// 255 = foreground), with the same pixel dimensions as the input.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Short identifier used in logs and health output
    fn name(&self) -> &str;

    /// Run segmentation on encoded image bytes
    ///
    /// # Errors
    ///
    /// - `SegmentationUnavailable` when the model or service cannot be reached
    /// - `Segmentation` when it answers with something unusable
    async fn segment(&self, image_bytes: &[u8]) -> Result<Vec<u8>>;
}
