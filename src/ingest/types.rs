// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;

/// One candidate announcement as returned by a feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub id: Option<String>, // stable per-announcement id, when the source has one
}

impl RawEntry {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            published_at: None,
            id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TextFeed,
    SymbolSnapshot,
}

/// Which retrieval strategy produced a feed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Primary,
    Fallback,
}

impl FetchPath {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchPath::Primary => "primary",
            FetchPath::Fallback => "fallback",
        }
    }
}

/// Extra field mixed into a feed entry's fingerprint.
///
/// Only pick `Id` or `PublishedAt` when every retrieval path of the source
/// reports the same value for the same announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discriminator {
    #[default]
    None,
    Id,
    PublishedAt,
}

/// Normalized result of one adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Feed {
        entries: Vec<RawEntry>,
        path: FetchPath,
    },
    Symbols(BTreeSet<String>),
}

impl Snapshot {
    pub fn kind(&self) -> SourceKind {
        match self {
            Snapshot::Feed { .. } => SourceKind::TextFeed,
            Snapshot::Symbols(_) => SourceKind::SymbolSnapshot,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Snapshot::Feed { entries, .. } => entries.len(),
            Snapshot::Symbols(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;
    fn discriminator(&self) -> Discriminator {
        Discriminator::None
    }
    async fn fetch(&self) -> Result<Snapshot>;
}

/// A single retrieval strategy for a feed (API call, HTML scrape, ...).
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    fn label(&self) -> &str;
    async fn fetch_entries(&self) -> Result<Vec<RawEntry>>;
}

/// Retrieval strategy for a point-in-time symbol listing.
#[async_trait::async_trait]
pub trait SymbolFetcher: Send + Sync {
    async fn fetch_symbols(&self) -> Result<BTreeSet<String>>;
}
