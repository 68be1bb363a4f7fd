//! Segmentation backends
//!
//! - `mock`: deterministic cutouts for tests and local debugging
//! - `remote`: HTTP client for a rembg-compatible segmentation service

pub mod mock;

#[cfg(feature = "remote")]
pub mod remote;

pub use self::mock::MockSegmenter;

#[cfg(feature = "remote")]
pub use self::remote::RemoteSegmenter;

use crate::config::{SegmenterConfig, SegmenterKind};
use crate::error::Result;
use crate::segmentation::Segmenter;
use std::sync::Arc;

/// Build the segmenter selected by configuration
///
/// # Errors
/// - `InvalidConfig` when the remote backend is selected without the `remote` feature
///   or without a URL
pub fn create_segmenter(config: &SegmenterConfig) -> Result<Arc<dyn Segmenter>> {
    match config.kind {
        SegmenterKind::Mock => Ok(Arc::new(MockSegmenter::new())),
        #[cfg(feature = "remote")]
        SegmenterKind::Remote => Ok(Arc::new(RemoteSegmenter::new(config)?)),
        #[cfg(not(feature = "remote"))]
        SegmenterKind::Remote => Err(crate::error::BgError::invalid_config(
            "remote segmenter requested but the 'remote' feature is not enabled",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_mock() {
        let config = SegmenterConfig {
            kind: SegmenterKind::Mock,
            ..SegmenterConfig::default()
        };
        let segmenter = create_segmenter(&config).unwrap();
        assert_eq!(segmenter.name(), "mock");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_factory_remote_without_url_fails() {
        let config = SegmenterConfig {
            kind: SegmenterKind::Remote,
            url: None,
            ..SegmenterConfig::default()
        };
        assert!(create_segmenter(&config).is_err());
    }
}
