// src/event.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Listing,
    Delisting,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Listing => "LISTING",
            EventKind::Delisting => "DELISTING",
        }
    }
}

/// A classified, not-yet-deduplicated change on one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub kind: EventKind,
}

impl Event {
    /// Publish time when the source reported one, else when we saw it.
    pub fn display_time(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.observed_at)
    }
}
