//! Conversion of `serve` arguments into a validated [`ServerConfig`]

use crate::cli::main_impl::{CliSegmenterKind, ServeArgs};
use crate::config::{SegmenterKind, ServerConfig, ServerConfigBuilder};
use crate::types::{Position, ScaleMode};
use anyhow::{Context, Result};

/// Layers CLI flags over the configuration file and defaults
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Defaults, then `--config`, then flags/environment
    pub(crate) fn from_serve_args(args: &ServeArgs) -> Result<ServerConfig> {
        let base = match &args.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ServerConfig::default(),
        };

        let mut builder = ServerConfigBuilder::from_config(base);

        if let Some(host) = &args.host {
            builder = builder.host(host.clone());
        }
        if let Some(port) = args.port {
            builder = builder.port(port);
        }
        if let Some(kind) = args.segmenter {
            builder = builder.segmenter_kind(match kind {
                CliSegmenterKind::Remote => SegmenterKind::Remote,
                CliSegmenterKind::Mock => SegmenterKind::Mock,
            });
        }
        if let Some(url) = &args.segmenter_url {
            builder = builder.segmenter_url(url.clone());
        }
        if let Some(model) = &args.model {
            builder = builder.segmenter_model(model.clone());
        }
        if let Some(timeout) = args.segmenter_timeout {
            builder = builder.segmenter_timeout_secs(timeout);
        }
        if let Some(scale) = &args.default_scale {
            let scale: ScaleMode = scale.parse().context("Invalid --default-scale")?;
            builder = builder.default_scale(scale);
        }
        if let Some(position) = &args.default_position {
            let position: Position = position.parse().context("Invalid --default-position")?;
            builder = builder.default_position(position);
        }
        if let Some(color) = &args.pad_color {
            builder = builder.pad_color(color.clone());
        }
        if let Some(bytes) = args.max_upload_bytes {
            builder = builder.max_upload_bytes(bytes);
        }
        if !args.cors_origins.is_empty() {
            builder = builder.cors_origins(args.cors_origins.clone());
        }

        builder.build().context("Configuration validation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn mock_args() -> ServeArgs {
        ServeArgs {
            segmenter: Some(CliSegmenterKind::Mock),
            ..ServeArgs::default()
        }
    }

    #[test]
    fn test_defaults_with_mock_segmenter() {
        let config = CliConfigBuilder::from_serve_args(&mock_args()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.segmenter.kind, SegmenterKind::Mock);
        assert_eq!(config.compositing.scale, ScaleMode::Cover);
    }

    #[test]
    fn test_remote_without_url_is_rejected() {
        let err = CliConfigBuilder::from_serve_args(&ServeArgs::default()).unwrap_err();
        assert!(format!("{err:#}").contains("segmenter.url"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{"port": 7000, "compositing": {"scale": "contain"}, "segmenter": {"kind": "mock"}}"#,
        )
        .unwrap();

        let args = ServeArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(7100),
            default_position: Some("bottom-left".into()),
            cors_origins: vec!["https://app.example".into()],
            ..ServeArgs::default()
        };
        let config = CliConfigBuilder::from_serve_args(&args).unwrap();

        assert_eq!(config.port, 7100);
        assert_eq!(config.compositing.scale, ScaleMode::Contain);
        assert_eq!(config.compositing.position, Position::BottomLeft);
        assert_eq!(config.cors.allow_origins, vec!["https://app.example"]);
    }

    #[test]
    fn test_strict_parsing_of_defaults() {
        let args = ServeArgs {
            default_scale: Some("zoom".into()),
            ..mock_args()
        };
        assert!(CliConfigBuilder::from_serve_args(&args).is_err());

        let args = ServeArgs {
            pad_color: Some("blue".into()),
            ..mock_args()
        };
        assert!(CliConfigBuilder::from_serve_args(&args).is_err());
    }
}
