//! Configuration types for the compositing service

use crate::error::{BgError, Result};
use crate::types::{Position, ScaleMode};
use crate::utils::ColorParser;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8000;

/// Default upper bound for a whole multipart request body
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Which segmentation backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    /// rembg-compatible HTTP service
    #[default]
    Remote,
    /// Built-in deterministic cutout, no model required
    Mock,
}

impl fmt::Display for SegmenterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for SegmenterKind {
    type Err = BgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "mock" => Ok(Self::Mock),
            other => Err(BgError::invalid_config(format!(
                "unknown segmenter '{}' (expected remote or mock)",
                other
            ))),
        }
    }
}

/// Segmentation collaborator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub kind: SegmenterKind,

    /// Endpoint receiving `POST` multipart uploads (remote only)
    pub url: Option<String>,

    /// Model name forwarded as the `model` query parameter
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            kind: SegmenterKind::default(),
            url: None,
            model: "isnet-general-use".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins, `"*"` for any
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Allowed methods, `"*"` for any
    pub allow_methods: Vec<String>,
    /// Allowed request headers, `"*"` for any
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_credentials: true,
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
        }
    }
}

/// Fallbacks applied when a request omits compositing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositingDefaults {
    pub scale: ScaleMode,
    pub position: Position,
    /// Hex colour for the area `contain` leaves uncovered
    pub pad_color: String,
}

impl Default for CompositingDefaults {
    fn default() -> Self {
        Self {
            scale: ScaleMode::Cover,
            position: Position::Center,
            pad_color: "#000000".to_string(),
        }
    }
}

impl CompositingDefaults {
    /// Parsed pad colour
    pub fn pad_rgb(&self) -> Result<Rgb<u8>> {
        ColorParser::parse_hex(&self.pad_color)
    }
}

/// API metadata reported by the health endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Background Removal API".to_string(),
            description: "Remove, replace or extract image backgrounds".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Complete service configuration
///
/// Every section has defaults, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Upper bound for a whole request body, both uploads included
    pub max_upload_bytes: usize,

    pub api: ApiInfo,
    pub cors: CorsConfig,
    pub compositing: CompositingDefaults,
    pub segmenter: SegmenterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            api: ApiInfo::default(),
            cors: CorsConfig::default(),
            compositing: CompositingDefaults::default(),
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use backdrop::config::{SegmenterKind, ServerConfig};
    ///
    /// let config = ServerConfig::builder()
    ///     .port(9000)
    ///     .segmenter_kind(SegmenterKind::Mock)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.bind_address(), "0.0.0.0:9000");
    /// ```
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load a configuration file, filling missing keys with defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = std::fs::read_to_string(path_ref).map_err(|e| {
            BgError::invalid_config(format!("Failed to read '{}': {}", path_ref.display(), e))
        })?;
        Self::from_json_str(&contents)
            .map_err(|e| BgError::invalid_config(format!("{} ({})", e, path_ref.display())))
    }

    /// Parse configuration from JSON text
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| BgError::invalid_config(format!("Malformed configuration: {}", e)))
    }

    /// `host:port` string suitable for binding
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BgError::invalid_config("host must not be empty"));
        }

        if self.port == 0 {
            return Err(BgError::config_value_error(
                "port",
                self.port,
                "1-65535",
                Some(DEFAULT_PORT),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(BgError::config_value_error(
                "max upload bytes",
                self.max_upload_bytes,
                "> 0",
                Some(DEFAULT_MAX_UPLOAD_BYTES),
            ));
        }

        if self.cors.allow_origins.is_empty() {
            return Err(BgError::invalid_config(
                "cors.allow_origins must list at least one origin (use \"*\" for any)",
            ));
        }

        ColorParser::parse_hex(&self.compositing.pad_color).map_err(|e| {
            BgError::invalid_config(format!("compositing.pad_color: {}", e))
        })?;

        if self.segmenter.timeout_secs == 0 {
            return Err(BgError::config_value_error(
                "segmenter timeout (seconds)",
                self.segmenter.timeout_secs,
                "> 0",
                Some(60),
            ));
        }

        if self.segmenter.model.trim().is_empty() {
            return Err(BgError::invalid_config("segmenter.model must not be empty"));
        }

        if self.segmenter.kind == SegmenterKind::Remote {
            match self.segmenter.url.as_deref() {
                None => {
                    return Err(BgError::invalid_config(
                        "segmenter.url is required for the remote segmenter",
                    ))
                },
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(BgError::invalid_config(format!(
                        "segmenter.url must be an http(s) URL, got '{}'",
                        url
                    )))
                },
                Some(_) => {},
            }
        }

        Ok(())
    }
}

/// Builder for [`ServerConfig`]
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from a file)
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors.allow_origins = origins;
        self
    }

    #[must_use]
    pub fn default_scale(mut self, scale: ScaleMode) -> Self {
        self.config.compositing.scale = scale;
        self
    }

    #[must_use]
    pub fn default_position(mut self, position: Position) -> Self {
        self.config.compositing.position = position;
        self
    }

    #[must_use]
    pub fn pad_color<S: Into<String>>(mut self, color: S) -> Self {
        self.config.compositing.pad_color = color.into();
        self
    }

    #[must_use]
    pub fn segmenter_kind(mut self, kind: SegmenterKind) -> Self {
        self.config.segmenter.kind = kind;
        self
    }

    #[must_use]
    pub fn segmenter_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.segmenter.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn segmenter_model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.segmenter.model = model.into();
        self
    }

    #[must_use]
    pub fn segmenter_timeout_secs(mut self, secs: u64) -> Self {
        self.config.segmenter.timeout_secs = secs;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<ServerConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
