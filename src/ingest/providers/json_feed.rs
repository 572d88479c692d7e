// src/ingest/providers/json_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde_json::Value;

use super::{field_str, items_at, parse_time};
use crate::config::{HttpMethod, JsonFeedCfg};
use crate::ingest::normalize_text;
use crate::ingest::types::{FeedFetcher, RawEntry};

/// Announcement list served as JSON (Binance CMS, Bybit v5, MEXC, ...).
pub struct JsonFeedFetcher {
    label: String,
    cfg: JsonFeedCfg,
    client: Client,
}

impl JsonFeedFetcher {
    pub fn new(label: impl Into<String>, cfg: JsonFeedCfg, client: Client) -> Self {
        Self {
            label: label.into(),
            cfg,
            client,
        }
    }
}

/// Parse a response body into entries. Items without a usable title are skipped.
pub fn parse_entries(cfg: &JsonFeedCfg, body: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let doc: Value = serde_json::from_str(body).context("parsing feed json")?;
    let items = items_at(&doc, &cfg.items)?;

    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let Some(title_raw) = field_str(it, &cfg.title_field) else {
            continue;
        };
        let title = normalize_text(&title_raw);
        if title.is_empty() {
            continue;
        }

        let id = cfg.id_field.as_deref().and_then(|f| field_str(it, f));
        let url = cfg
            .url_field
            .as_deref()
            .and_then(|f| field_str(it, f))
            .or_else(|| match (&cfg.url_template, &id) {
                (Some(t), Some(id)) => Some(t.replace("{id}", id)),
                _ => None,
            });
        let published_at = cfg
            .time_field
            .as_deref()
            .and_then(|f| field_str(it, f))
            .and_then(|raw| parse_time(&raw, cfg.time_unit));

        out.push(RawEntry {
            title,
            url,
            published_at,
            id,
        });
    }

    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

#[async_trait]
impl FeedFetcher for JsonFeedFetcher {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_entries(&self) -> Result<Vec<RawEntry>> {
        let req = match self.cfg.method {
            HttpMethod::Get => self.client.get(&self.cfg.url),
            HttpMethod::Post => {
                let body = self.cfg.body.clone().unwrap_or(Value::Object(Default::default()));
                self.client.post(&self.cfg.url).json(&body)
            }
        };
        let body = req
            .send()
            .await
            .with_context(|| format!("{} request", self.label))?
            .error_for_status()
            .with_context(|| format!("{} non-2xx", self.label))?
            .text()
            .await
            .with_context(|| format!("{} body", self.label))?;
        parse_entries(&self.cfg, &body).with_context(|| format!("{} parse", self.label))
    }
}
