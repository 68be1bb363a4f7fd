//! Image I/O operations service
//!
//! Decoding and encoding live here so the compositor only ever sees decoded
//! buffers and the HTTP layer only ever sees bytes.

use crate::error::{BgError, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Service for decoding uploads and encoding results
pub struct ImageIOService;

impl ImageIOService {
    /// Decode image bytes, naming the input in any error
    ///
    /// # Arguments
    /// * `bytes` - Raw image data (PNG, JPEG, WebP, TIFF)
    /// * `role` - Which input this is (`"input"`, `"background"`, ...), used in messages
    ///
    /// # Examples
    /// ```rust,no_run
    /// use backdrop::services::ImageIOService;
    ///
    /// let data = std::fs::read("input.jpg")?;
    /// let image = ImageIOService::decode(&data, "input")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode(bytes: &[u8], role: &str) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(BgError::Decode(format!("{} image is empty", role)));
        }
        image::load_from_memory(bytes).map_err(|e| BgError::decode_error(role, bytes.len(), &e))
    }

    /// Encode an image as PNG bytes, keeping its colour model
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Load an image from a file path
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref).map_err(|e| {
            BgError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read '{}': {}", path_ref.display(), e),
            ))
        })?;
        Self::decode(&data, &path_ref.display().to_string())
    }

    /// Save an image as PNG, creating the parent directory if needed
    pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path_ref, Self::encode_png(image)?)?;
        tracing::debug!(path = %path_ref.display(), "Saved PNG");
        Ok(())
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }
}
