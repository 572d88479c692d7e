// src/ingest/providers/json_symbols.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeSet;

use super::{field_str, items_at};
use crate::config::SymbolSourceCfg;
use crate::ingest::types::SymbolFetcher;

/// Point-in-time contract listing (exchangeInfo, instruments-info, contracts, ...).
pub struct JsonSymbolsFetcher {
    cfg: SymbolSourceCfg,
    client: Client,
}

impl JsonSymbolsFetcher {
    pub fn new(cfg: SymbolSourceCfg, client: Client) -> Self {
        Self { cfg, client }
    }
}

/// Collect tradable symbols. When a status filter is configured, only
/// instruments whose status matches (case-insensitive) are kept.
pub fn parse_symbols(cfg: &SymbolSourceCfg, body: &str) -> Result<BTreeSet<String>> {
    let doc: Value = serde_json::from_str(body).context("parsing symbols json")?;
    let items = items_at(&doc, &cfg.items)?;

    let filter = match (&cfg.status_field, &cfg.status_value) {
        (Some(f), Some(v)) => Some((f.as_str(), v.as_str())),
        _ => None,
    };

    Ok(items
        .iter()
        .filter(|it| match filter {
            Some((field, want)) => field_str(it, field).is_some_and(|s| s.eq_ignore_ascii_case(want)),
            None => true,
        })
        .filter_map(|it| field_str(it, &cfg.symbol_field))
        .collect())
}

#[async_trait]
impl SymbolFetcher for JsonSymbolsFetcher {
    async fn fetch_symbols(&self) -> Result<BTreeSet<String>> {
        let body = self
            .client
            .get(&self.cfg.url)
            .send()
            .await
            .with_context(|| format!("{} symbols request", self.cfg.name))?
            .error_for_status()
            .with_context(|| format!("{} symbols non-2xx", self.cfg.name))?
            .text()
            .await
            .with_context(|| format!("{} symbols body", self.cfg.name))?;
        parse_symbols(&self.cfg, &body).with_context(|| format!("{} symbols parse", self.cfg.name))
    }
}
