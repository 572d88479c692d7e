// src/ingest/providers/mod.rs
//! Data-driven HTTP adapters. Exchange specifics live in `config/watcher.toml`;
//! nothing here branches on exchange identity.

pub mod html_feed;
pub mod json_feed;
pub mod json_symbols;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::{FetcherCfg, SourceCfg, TimeUnit, WatcherConfig};
use crate::ingest::source::{FeedSource, SymbolSource};
use crate::ingest::types::{FeedFetcher, SourceAdapter};

use html_feed::HtmlFeedFetcher;
use json_feed::JsonFeedFetcher;
use json_symbols::JsonSymbolsFetcher;

/// Shared client: every adapter call is bounded by the configured timeout.
pub fn http_client(cfg: &WatcherConfig) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .connect_timeout(Duration::from_secs(cfg.fetch_timeout_secs.min(10)))
        .build()
        .context("building http client")
}

/// Build one adapter per enabled `[[sources]]` entry, in config order.
pub fn build_sources(cfg: &WatcherConfig, client: &Client) -> Result<Vec<Box<dyn SourceAdapter>>> {
    let mut out: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for src in cfg.enabled_sources() {
        match src {
            SourceCfg::Feed(f) => {
                let primary = build_fetcher(&f.name, "primary", &f.primary, client)?;
                let mut feed = FeedSource::new(&f.name, primary).with_discriminator(f.discriminator);
                if let Some(fb) = &f.fallback {
                    feed = feed.with_fallback(build_fetcher(&f.name, "fallback", fb, client)?);
                }
                out.push(Box::new(feed));
            }
            SourceCfg::Symbols(s) => {
                let fetcher = JsonSymbolsFetcher::new(s.clone(), client.clone());
                out.push(Box::new(SymbolSource::new(&s.name, Box::new(fetcher))));
            }
        }
    }
    Ok(out)
}

fn build_fetcher(
    source: &str,
    role: &str,
    cfg: &FetcherCfg,
    client: &Client,
) -> Result<Box<dyn FeedFetcher>> {
    let label = format!("{source}/{role}");
    Ok(match cfg {
        FetcherCfg::Json(j) => Box::new(JsonFeedFetcher::new(label, j.clone(), client.clone())),
        FetcherCfg::Html(h) => Box::new(
            HtmlFeedFetcher::new(label, h.clone(), client.clone())
                .with_context(|| format!("source `{source}` {role} html fetcher"))?,
        ),
    })
}

/// Resolve a JSON pointer to an array. An empty pointer means the document itself.
pub(crate) fn items_at<'a>(doc: &'a Value, pointer: &str) -> Result<&'a Vec<Value>> {
    doc.pointer(pointer)
        .ok_or_else(|| anyhow!("no value at `{pointer}`"))?
        .as_array()
        .ok_or_else(|| anyhow!("value at `{pointer}` is not an array"))
}

/// Read a scalar field as text. `field` is a key, or a JSON pointer when it starts with '/'.
pub(crate) fn field_str(item: &Value, field: &str) -> Option<String> {
    let v = if field.starts_with('/') {
        item.pointer(field)?
    } else {
        item.get(field)?
    };
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an epoch number (or numeric string) in `unit`, or an RFC 3339 string.
pub(crate) fn parse_time(raw: &str, unit: TimeUnit) -> Option<DateTime<Utc>> {
    if let Ok(n) = raw.parse::<i64>() {
        if n <= 0 {
            return None;
        }
        return match unit {
            TimeUnit::S => Utc.timestamp_opt(n, 0).single(),
            TimeUnit::Ms => Utc.timestamp_millis_opt(n).single(),
        };
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
