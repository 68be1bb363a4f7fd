#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

//! # Backdrop
//!
//! Background compositing for images: remove a background, replace it with
//! another image, or keep only the background. Foreground segmentation is
//! delegated to an injected [`Segmenter`]; everything else (scale and
//! placement geometry, mask inversion, alpha compositing, PNG encoding) is
//! done here.
//!
//! ## Features
//!
//! - **Scale modes**: `cover`, `contain`, `stretch` and `fill`, with nine anchor positions
//! - **Exact integer geometry**: resized sizes and offsets never depend on float rounding
//! - **HTTP API**: axum routes `/remove-bg/`, `/add-background/`, `/extract-background/`
//! - **Pluggable segmentation**: remote rembg-compatible service or a deterministic mock
//! - **CLI**: `serve`, plus offline `compose` and `extract` on local files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backdrop::{
//!     backends::MockSegmenter, BackgroundProcessor, CompositeOptions, Position, ScaleMode,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> backdrop::Result<()> {
//! let processor = BackgroundProcessor::new(Arc::new(MockSegmenter::new()));
//!
//! let portrait = std::fs::read("portrait.jpg")?;
//! let beach = std::fs::read("beach.jpg")?;
//! let options = CompositeOptions {
//!     scale: ScaleMode::Cover,
//!     position: Position::Bottom,
//!     ..CompositeOptions::default()
//! };
//!
//! let result = processor.add_background(portrait, beach, options).await?;
//! std::fs::write(result.file_name, &result.png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `server` (default): axum HTTP layer
//! - `remote` (default): `reqwest` client for a remote segmentation service
//! - `cli` (default): `backdrop` binary with tracing subscriber setup
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON log output

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod processor;
pub mod segmentation;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use compositor::{blend_over, compose, extract_background_only, prepare_background};
pub use config::{CompositingDefaults, CorsConfig, SegmenterConfig, SegmenterKind, ServerConfig};
pub use error::{BgError, Result};
pub use geometry::{resolve, FitOp, Placement};
pub use mask::{extract_opacity, invert_opacity};
pub use processor::{BackgroundProcessor, CompositeOptions, RenderedImage};
pub use segmentation::Segmenter;
pub use services::ImageIOService;
pub use types::{Anchor, OpacityPlane, Position, ScaleMode, Size};
