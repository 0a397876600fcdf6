use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tally_common::observability::{init_logging, LogConfig};
use tally_config::{TallyConfig, TallyConfigLoader};

mod wiring;

/// Follower tally and live overlay relay.
#[derive(Debug, Parser)]
#[command(name = "tally")]
struct Cli {
    /// Explicit config file; without it, `tally.yaml` is used when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port; hosting platforms inject this as `PORT`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Log directory override.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = match &cli.config {
        Some(path) => TallyConfigLoader::new().with_file(path),
        None => TallyConfigLoader::new().with_optional_file("tally.yaml"),
    };
    let cfg: TallyConfig = loader.load()?;

    let log_path = init_logging(LogConfig {
        log_dir: cli.log_dir,
        emit_stderr: true,
        ..Default::default()
    })?;
    tracing::info!(log = %log_path.display(), "logging initialised");

    wiring::run(cfg, cli.port).await
}
