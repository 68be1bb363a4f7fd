//! Backdrop CLI
//!
//! Runs the background compositing HTTP service, or the compositing core on
//! local files.

#[cfg(feature = "cli")]
use backdrop::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
