//! Futures listing watcher: binary entrypoint.
//! Loads config, wires sources and the notifier, then polls until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use futures_listing_watcher::{build_watcher, notify::ChannelCfg, WatcherConfig};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "futures-listing-watcher", version, about)]
struct Cli {
    /// Path to watcher.toml (default: $WATCHER_CONFIG_PATH or config/watcher.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the state file location
    #[arg(long)]
    state: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("futures_listing_watcher=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = WatcherConfig::load(cli.config.as_deref())?;
    if let Some(p) = cli.state {
        cfg.state_path = p;
    }

    if let Some(addr) = cfg.metrics_addr {
        if let Err(e) = futures_listing_watcher::telemetry::install_exporter(addr) {
            tracing::warn!("metrics disabled: {e:#}");
        }
    }

    let mut watcher = build_watcher(&cfg, &ChannelCfg::from_env())?;
    let mut state = watcher.store().load(cfg.seen_capacity).await;

    if cli.once {
        let report = watcher.run_cycle(&mut state).await;
        futures_listing_watcher::watcher::log_report(&report);
        return Ok(());
    }

    // Register the signal handler up front so Ctrl-C during a cycle is
    // observed after the cycle persists instead of killing the process.
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl_c listener failed, running until killed: {e:#}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl-C received, finishing current cycle");
        let _ = tx.send(true);
    });

    watcher.run(state, rx).await;
    Ok(())
}
