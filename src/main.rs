//! # Main Entry Point
//!
//! Loads the configuration, sets up logging, connects the platform client, runs the
//! runtime's startup phases, and then feeds stdin frames to it until input closes
//! or the process is interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

use botkit::application::logging;
use botkit::application::runtime::Runtime;
use botkit::domain::config::AppConfig;
use botkit::domain::paths;
use botkit::domain::traits::CommandPlatform;
use botkit::domain::types::SyncMode;
use botkit::infrastructure::http::HttpPlatform;
use botkit::infrastructure::memory::MemoryPlatform;
use botkit::interface::{gateway, handlers};
use botkit::strings::logs;

#[derive(Debug, Parser)]
#[command(name = "botkit", about = "Loads bot modules, syncs commands, and routes interactions")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = paths::CONFIG_FILE)]
    config: PathBuf,

    /// Sync against an in-memory platform instead of the real API.
    #[arg(long)]
    dry_run: bool,

    /// Override the configured sync strategy.
    #[arg(long, value_enum)]
    sync: Option<SyncMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let mut config = AppConfig::load(&args.config)?;
    if let Some(mode) = args.sync {
        config.runtime.sync = mode;
    }

    // 2. Logging Setup
    let _guard = logging::init(&config.logging)?;
    tracing::info!("{}", logs::config_loaded(&args.config.display().to_string()));

    // 3. Platform Client
    let platform: Arc<dyn CommandPlatform> = if args.dry_run {
        tracing::info!("{}", logs::DRY_RUN);
        Arc::new(MemoryPlatform::new())
    } else {
        let http = HttpPlatform::new(&config.platform)?;
        if let Err(e) = http.connect().await {
            tracing::error!("{}", logs::platform_connect_fail(&format!("{e:#}")));
            return Err(e);
        }
        Arc::new(http)
    };

    // 4. Runtime Phases
    let runtime = Arc::new(Runtime::new(config.runtime.clone(), handlers::catalog(), platform));
    runtime.init().await.context("Runtime failed to start")?;

    // 5. Gateway Loop
    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = gateway::run(runtime.clone(), input) => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("{}", logs::shutdown_fail(&e.to_string()));
            }
        }
    }

    tracing::info!("{}", logs::SHUTDOWN);
    Ok(())
}
