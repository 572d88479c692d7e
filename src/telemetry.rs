use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with its own `/metrics` HTTP listener.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;

    describe_counter!("watcher_cycles_total", "Detection cycles completed.");
    describe_counter!("watcher_new_events_total", "Events that passed dedup/diff.");
    describe_counter!("notify_sent_total", "Notifications delivered.");
    describe_counter!("notify_failed_total", "Notifications that failed to send.");
    describe_gauge!("watcher_seen_size", "Fingerprints held in the seen set.");
    describe_gauge!("watcher_last_cycle_ts", "Unix ts when the last cycle finished.");

    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
