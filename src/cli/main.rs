//! Backdrop command-line interface
//!
//! `serve` runs the HTTP service; `compose` and `extract` run the compositing
//! core on local files using an already segmented cutout.

use super::config::CliConfigBuilder;
use crate::{
    backends::create_segmenter,
    compositor,
    mask::extract_opacity,
    processor::BackgroundProcessor,
    server,
    services::ImageIOService,
    tracing_config::{TracingConfig, TracingFormat},
    types::{Position, ScaleMode, Size},
    utils::{to_rgba, ColorParser},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use instant::Instant;
use std::path::PathBuf;
use tracing::info;

/// Background compositing service and tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "backdrop")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console, global = true)]
    pub log_format: CliLogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Composite a segmented cutout over a new background
    Compose(ComposeArgs),
    /// Keep only the background of an image, given its cutout
    Extract(ExtractArgs),
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliSegmenterKind {
    Remote,
    Mock,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// JSON configuration file; flags and environment override its values
    #[arg(short, long, value_name = "PATH", env = "BACKDROP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind [default: 0.0.0.0]
    #[arg(long, env = "BACKDROP_HOST")]
    pub host: Option<String>,

    /// Port to listen on [default: 8000]
    #[arg(short, long, env = "BACKDROP_PORT")]
    pub port: Option<u16>,

    /// Segmentation backend [default: remote]
    #[arg(long, value_enum, env = "BACKDROP_SEGMENTER")]
    pub segmenter: Option<CliSegmenterKind>,

    /// Segmentation service endpoint (remote backend)
    #[arg(long, value_name = "URL", env = "BACKDROP_SEGMENTER_URL")]
    pub segmenter_url: Option<String>,

    /// Segmentation model name [default: isnet-general-use]
    #[arg(short, long, env = "BACKDROP_MODEL")]
    pub model: Option<String>,

    /// Segmentation request timeout in seconds [default: 60]
    #[arg(long, value_name = "SECONDS", env = "BACKDROP_SEGMENTER_TIMEOUT")]
    pub segmenter_timeout: Option<u64>,

    /// Scale mode used when a request omits `scale` [default: cover]
    #[arg(long, env = "BACKDROP_DEFAULT_SCALE")]
    pub default_scale: Option<String>,

    /// Position used when a request omits `position` [default: center]
    #[arg(long, env = "BACKDROP_DEFAULT_POSITION")]
    pub default_position: Option<String>,

    /// Canvas colour for `contain` padding, #RRGGBB or #RGB [default: #000000]
    #[arg(long, env = "BACKDROP_PAD_COLOR")]
    pub pad_color: Option<String>,

    /// Maximum request body size in bytes [default: 33554432]
    #[arg(long, env = "BACKDROP_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Allowed CORS origin, repeatable [default: *]
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    pub cors_origins: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// RGBA cutout whose alpha marks the foreground; defines the output size
    #[arg(short, long, value_name = "PATH")]
    pub foreground: PathBuf,

    /// Replacement background image
    #[arg(short, long, value_name = "PATH")]
    pub background: PathBuf,

    /// Scale mode: cover, contain, stretch, fill
    #[arg(short, long, default_value = "cover")]
    pub scale: String,

    /// Anchor: center, top, bottom, left, right, top-left, top-right, bottom-left, bottom-right
    #[arg(short, long, default_value = "center")]
    pub position: String,

    /// Canvas colour for `contain` padding
    #[arg(long, default_value = "#000000")]
    pub pad_color: String,

    /// Output PNG path
    #[arg(short, long, value_name = "PATH", default_value = "added_background.png")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Original image
    #[arg(short, long, value_name = "PATH")]
    pub image: PathBuf,

    /// RGBA cutout of the same image whose alpha marks the foreground
    #[arg(short, long, value_name = "PATH")]
    pub cutout: PathBuf,

    /// Output PNG path
    #[arg(short, long, value_name = "PATH", default_value = "background.png")]
    pub output: PathBuf,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    match cli.command {
        Command::Serve(args) => run_serve(&args).await,
        Command::Compose(args) => run_compose(&args),
        Command::Extract(args) => run_extract(&args),
    }
}

fn init_tracing(verbosity: u8, format: CliLogFormat) -> Result<()> {
    let format = match format {
        CliLogFormat::Console => TracingFormat::Console,
        CliLogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        CliLogFormat::Json => TracingFormat::Json,
    };

    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_instance_id(uuid::Uuid::new_v4().to_string());

    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_env_filter(filter);
    }

    config.init()
}

async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = CliConfigBuilder::from_serve_args(args).context("Invalid server configuration")?;

    info!(
        segmenter = %config.segmenter.kind,
        model = %config.segmenter.model,
        default_scale = %config.compositing.scale,
        default_position = %config.compositing.position,
        "Starting background compositing service"
    );

    let segmenter =
        create_segmenter(&config.segmenter).context("Failed to create segmentation backend")?;
    let processor = std::sync::Arc::new(BackgroundProcessor::new(segmenter));

    server::serve(config, processor).await.context("Server failed")
}

fn run_compose(args: &ComposeArgs) -> Result<()> {
    let started = Instant::now();
    let scale: ScaleMode = args.scale.parse().context("Invalid --scale")?;
    let position: Position = args.position.parse().context("Invalid --position")?;
    let pad_color = ColorParser::parse_hex(&args.pad_color).context("Invalid --pad-color")?;

    let foreground = ImageIOService::load_image(&args.foreground)
        .with_context(|| format!("Failed to load foreground {}", args.foreground.display()))?;
    let background = ImageIOService::load_image(&args.background)
        .with_context(|| format!("Failed to load background {}", args.background.display()))?;

    let foreground = to_rgba(&foreground);
    let target = Size::of(&foreground)?;
    let prepared = compositor::prepare_background(&background, target, scale, position, pad_color)?;
    let composite = compositor::compose(&prepared, &foreground, target)?;

    ImageIOService::save_png(&DynamicImage::ImageRgba8(composite), &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        size = %target,
        scale = %scale,
        position = %position,
        "Composited in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let started = Instant::now();
    let original = ImageIOService::load_image(&args.image)
        .with_context(|| format!("Failed to load image {}", args.image.display()))?;
    let cutout = ImageIOService::load_image(&args.cutout)
        .with_context(|| format!("Failed to load cutout {}", args.cutout.display()))?;

    let alpha = extract_opacity(&to_rgba(&cutout));
    let background = compositor::extract_background_only(&to_rgba(&original), &alpha)
        .context("Cutout does not match the image")?;

    ImageIOService::save_png(&DynamicImage::ImageRgba8(background), &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        "Extracted background in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
