// src/ingest/source.rs
//! Adapters the watcher talks to. A feed source sequences a primary and an
//! optional fallback fetcher; a symbol source wraps one snapshot fetcher.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::ingest::types::{
    Discriminator, FeedFetcher, FetchPath, Snapshot, SourceAdapter, SourceKind, SymbolFetcher,
};

pub struct FeedSource {
    name: String,
    discriminator: Discriminator,
    primary: Box<dyn FeedFetcher>,
    fallback: Option<Box<dyn FeedFetcher>>,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, primary: Box<dyn FeedFetcher>) -> Self {
        Self {
            name: name.into(),
            discriminator: Discriminator::None,
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FeedFetcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_discriminator(mut self, d: Discriminator) -> Self {
        self.discriminator = d;
        self
    }
}

#[async_trait]
impl SourceAdapter for FeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::TextFeed
    }

    fn discriminator(&self) -> Discriminator {
        self.discriminator
    }

    async fn fetch(&self) -> Result<Snapshot> {
        // An empty primary result is as useless as an error: blocked APIs
        // often answer 200 with an empty list.
        let primary_err = match self.primary.fetch_entries().await {
            Ok(entries) if !entries.is_empty() => {
                return Ok(Snapshot::Feed {
                    entries,
                    path: FetchPath::Primary,
                });
            }
            Ok(_) => anyhow!("{} returned no entries", self.primary.label()),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_err);
        };

        tracing::info!(
            source = %self.name,
            primary = self.primary.label(),
            fallback = fallback.label(),
            error = %primary_err,
            "primary fetch failed, trying fallback"
        );
        counter!("watcher_fallback_total", "source" => self.name.clone()).increment(1);

        let entries = fallback
            .fetch_entries()
            .await
            .map_err(|e| e.context(format!("primary failed: {primary_err:#}")))?;
        if entries.is_empty() {
            return Err(anyhow!(
                "{} and {} both returned no entries",
                self.primary.label(),
                fallback.label()
            ));
        }
        Ok(Snapshot::Feed {
            entries,
            path: FetchPath::Fallback,
        })
    }
}

pub struct SymbolSource {
    name: String,
    fetcher: Box<dyn SymbolFetcher>,
}

impl SymbolSource {
    pub fn new(name: impl Into<String>, fetcher: Box<dyn SymbolFetcher>) -> Self {
        Self {
            name: name.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl SourceAdapter for SymbolSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SymbolSnapshot
    }

    async fn fetch(&self) -> Result<Snapshot> {
        let symbols = self.fetcher.fetch_symbols().await?;
        if symbols.is_empty() {
            // An empty universe would read as "everything delisted".
            return Err(anyhow!("symbol listing was empty"));
        }
        Ok(Snapshot::Symbols(symbols))
    }
}
