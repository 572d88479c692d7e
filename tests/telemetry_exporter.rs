// tests/telemetry_exporter.rs
// One process-wide recorder per test binary, so this file holds a single test.

use anyhow::Result;
use async_trait::async_trait;
use futures_listing_watcher::ingest::types::{FetchPath, RawEntry, Snapshot, SourceAdapter, SourceKind};
use futures_listing_watcher::notify::LogNotifier;
use futures_listing_watcher::telemetry::install_exporter;
use futures_listing_watcher::{Classifier, Dispatcher, EngineState, StateStore, Watcher};
use std::time::Duration;

struct OneFeed;

#[async_trait]
impl SourceAdapter for OneFeed {
    fn name(&self) -> &str {
        "Binance"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::TextFeed
    }
    async fn fetch(&self) -> Result<Snapshot> {
        Ok(Snapshot::Feed {
            entries: vec![RawEntry::titled("Binance Will List XYZUSDT Perpetual")],
            path: FetchPath::Primary,
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metrics_endpoint_exposes_cycle_series() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    install_exporter(addr).expect("exporter installs");

    let dir = tempfile::tempdir().unwrap();
    let mut w = Watcher::new(
        vec![Box::new(OneFeed)],
        Classifier::builtin(),
        Dispatcher::new(Box::new(LogNotifier), Duration::ZERO),
        StateStore::new(dir.path().join("state.json")),
    );
    let mut st = EngineState::empty(10);
    let report = w.run_cycle(&mut st).await;
    assert_eq!(report.dispatch.sent, 1);

    let mut body = String::new();
    for _ in 0..20 {
        if let Ok(resp) = reqwest::get(format!("http://{addr}/metrics")).await {
            body = resp.text().await.unwrap_or_default();
            if !body.is_empty() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for series in [
        "watcher_cycles_total",
        "watcher_new_events_total",
        "notify_sent_total",
        "ingest_entries_total",
        "watcher_seen_size",
    ] {
        assert!(body.contains(series), "missing {series} in:\n{body}");
    }
}
