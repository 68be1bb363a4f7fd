//! Error types for background compositing operations

use thiserror::Error;

/// Result type alias for background compositing operations
pub type Result<T> = std::result::Result<T, BgError>;

/// Error types for decoding, segmentation and compositing
#[derive(Error, Debug)]
pub enum BgError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or buffer errors raised by the image crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Submitted bytes could not be decoded as an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request itself is malformed (missing field, bad flag value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A size with zero width or height, or a resize too large to allocate
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Two inputs that must share dimensions do not
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Unrecognized scale mode or position in strict parsing
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The segmentation collaborator could not be reached or is not configured
    #[error("Segmentation unavailable: {0}")]
    SegmentationUnavailable(String),

    /// The segmentation collaborator answered with unusable data
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new segmentation unavailable error
    pub fn segmentation_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationUnavailable(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a decode error naming which input failed
    pub fn decode_error(role: &str, byte_len: usize, error: &image::ImageError) -> Self {
        Self::Decode(format!(
            "Failed to decode {} image ({} bytes): {}. Supported formats: PNG, JPEG, WebP, TIFF",
            role, byte_len, error
        ))
    }

    /// Create an invalid size error for a zero-area width/height pair
    pub fn zero_area(what: &str, width: u32, height: u32) -> Self {
        Self::InvalidSize(format!(
            "{} must have positive width and height, got {}x{}",
            what, width, height
        ))
    }

    /// Create a dimension mismatch error with both sizes in the message
    pub fn dimension_mismatch(
        context: &str,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch(format!(
            "{}: expected {}x{}, got {}x{}",
            context, expected.0, expected.1, actual.0, actual.1
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the error was caused by the caller's input rather than the service
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::InvalidRequest(_)
                | Self::InvalidSize(_)
                | Self::DimensionMismatch(_)
                | Self::InvalidParameter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BgError::invalid_config("port must be non-zero");
        assert_eq!(err.to_string(), "Invalid configuration: port must be non-zero");
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = BgError::dimension_mismatch("foreground alpha", (640, 480), (320, 240));
        let message = err.to_string();
        assert!(message.contains("foreground alpha"));
        assert!(message.contains("640x480"));
        assert!(message.contains("320x240"));
    }

    #[test]
    fn test_decode_error_context() {
        let err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let err = BgError::decode_error("background", 23, &err);
        let message = err.to_string();
        assert!(message.contains("background"));
        assert!(message.contains("23 bytes"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_config_value_error() {
        let err = BgError::config_value_error("port", 0, "1-65535", Some(8000));
        let message = err.to_string();
        assert!(message.contains("port"));
        assert!(message.contains("1-65535"));
        assert!(message.contains("Recommended: 8000"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(BgError::zero_area("target", 0, 10).is_client_error());
        assert!(BgError::invalid_request("missing field 'file'").is_client_error());
        assert!(!BgError::segmentation_unavailable("no model").is_client_error());
        assert!(!BgError::internal("join failed").is_client_error());
    }
}
