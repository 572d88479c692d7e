// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod baseline;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod event;
pub mod ingest;
pub mod notify;
pub mod state;
pub mod telemetry;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::classify::Classifier;
pub use crate::config::WatcherConfig;
pub use crate::event::{Event, EventKind};
pub use crate::notify::{Dispatcher, Notifier};
pub use crate::state::{EngineState, StateStore};
pub use crate::watcher::{CycleReport, Phase, Watcher};

use anyhow::Result;
use std::time::Duration;

/// Wire a `Watcher` from config: HTTP adapters, keyword tables, notifier and state store.
pub fn build_watcher(cfg: &WatcherConfig, channels: &notify::ChannelCfg) -> Result<Watcher> {
    let client = ingest::providers::http_client(cfg)?;
    let sources = ingest::providers::build_sources(cfg, &client)?;
    let classifier = Classifier::load(cfg.keywords_path.as_deref())?;
    let dispatcher = Dispatcher::new(
        channels.build(client),
        Duration::from_millis(cfg.send_delay_ms),
    );
    let store = StateStore::new(cfg.state_path.clone());

    Ok(Watcher::new(sources, classifier, dispatcher, store)
        .with_poll_interval(Duration::from_secs(cfg.poll_interval_secs))
        .with_fetch_timeout(Duration::from_secs(cfg.fetch_timeout_secs.saturating_add(5))))
}
