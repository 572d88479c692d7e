// src/ingest/mod.rs
pub mod providers;
pub mod source;
pub mod types;

use crate::ingest::types::{Snapshot, SourceAdapter, SourceKind};
use anyhow::{anyhow, Result};
use futures_util::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::time::{Duration, Instant};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries parsed from sources.");
        describe_counter!(
            "ingest_source_errors_total",
            "Source fetch/parse errors and timeouts."
        );
        describe_counter!(
            "watcher_fallback_total",
            "Feed fetches that had to use the fallback path."
        );
        describe_histogram!("ingest_parse_ms", "Source parse time in milliseconds.");
        describe_histogram!("ingest_fetch_ms", "Source fetch time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, trim stray punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 500 chars (titles, not bodies)
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }

    out
}

/// Result of polling one source during a cycle.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub kind: SourceKind,
    pub result: Result<Snapshot>,
}

/// Poll every source concurrently. Each call is bounded by `timeout` and
/// isolated: a failing source yields an `Err` outcome and never affects the
/// others. Outcomes come back in the same order as `sources`.
pub async fn fetch_all(sources: &[Box<dyn SourceAdapter>], timeout: Duration) -> Vec<SourceOutcome> {
    ensure_metrics_described();

    let calls = sources.iter().map(|s| async move {
        let t0 = Instant::now();
        let result = match tokio::time::timeout(timeout, s.fetch()).await {
            Ok(Ok(snap)) if snap.kind() != s.kind() => Err(anyhow!(
                "adapter returned {:?} snapshot, expected {:?}",
                snap.kind(),
                s.kind()
            )),
            Ok(r) => r,
            Err(_) => Err(anyhow!("fetch timed out after {}s", timeout.as_secs())),
        };
        histogram!("ingest_fetch_ms", "source" => s.name().to_string())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(snap) => {
                counter!("ingest_entries_total", "source" => s.name().to_string())
                    .increment(snap.len() as u64);
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), source = s.name(), "source error");
                counter!("ingest_source_errors_total", "source" => s.name().to_string())
                    .increment(1);
            }
        }

        SourceOutcome {
            source: s.name().to_string(),
            kind: s.kind(),
            result,
        }
    });

    join_all(calls).await
}
