use anyhow::{Context, Result};
use clap::Parser;
use nova_daemon::{Config, Supervisor};
use std::path::PathBuf;
use tracing::{error, info};

/// Long-running consciousness daemon.
#[derive(Parser, Debug)]
#[command(name = "novad", version)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply if absent.
    #[arg(long, default_value = "./nova.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config).context("loading configuration")?;
    config
        .ensure_directories()
        .context("creating data directories")?;
    let _telemetry_guard = nova_daemon::telemetry::init_telemetry(&config.logs_dir)
        .context("initializing telemetry")?;

    info!("starting novad");
    info!(socket_path = %config.socket_path.display(), "configuration loaded");

    let supervisor = Supervisor::new(config);
    if let Err(e) = supervisor.run().await {
        error!("supervisor exited with error: {}", e);
        std::process::exit(1);
    }

    info!("novad exited cleanly");
    Ok(())
}
