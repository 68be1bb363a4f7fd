//! Tracing configuration for structured logging
//!
//! The binary configures the subscriber; library code only emits spans and
//! events through the helpers below.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors
    Console,
    /// Compact console output without ANSI colors, for CI and containers
    Compact,
    /// JSON structured logging for log shippers
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Instance ID logged once at startup for correlation
    pub instance_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            instance_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_instance_id<S: Into<String>>(mut self, instance_id: S) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    ///
    /// HTTP plumbing crates stay at `info` until `-vv` so per-request spans
    /// from `tower_http` do not drown out compositing output.
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug,hyper=info,tower_http=info",
            _ => "trace",
        }
    }

    /// Initialize tracing subscriber based on configuration
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },

            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(instance_id) = &self.instance_id {
            tracing::info!(instance_id = %instance_id, "Backdrop started");
        }

        Ok(())
    }
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one HTTP request from multipart parsing to response
    pub fn request(operation: &str, request_id: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "request",
            operation = %operation,
            request_id = %request_id
        )
    }

    /// Span around a call into the segmentation collaborator
    pub fn segmentation(segmenter: &str, dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::DEBUG,
            "segmentation",
            segmenter = %segmenter,
            width = %dimensions.0,
            height = %dimensions.1
        )
    }

    /// Span for CPU-bound compositing work
    pub fn compositing(operation: &str, dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::DEBUG,
            "compositing",
            operation = %operation,
            width = %dimensions.0,
            height = %dimensions.1
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, warn};

    /// Log an error with context
    ///
    /// Caller-caused failures are warnings; everything else is an error.
    pub fn error_with_context(error: &crate::error::BgError, context: &str) {
        if error.is_client_error() {
            warn!(error = %error, context = %context, "Request rejected");
        } else {
            error!(error = %error, context = %context, "Operation failed");
        }
    }

    /// Log how long a stage took
    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(
            operation = %operation,
            duration_ms = %duration_ms,
            "Performance metric"
        );
    }
}
