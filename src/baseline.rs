// src/baseline.rs
//! Synthetic listing/delisting events for sources that only expose their
//! current symbol universe.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::event::{Event, EventKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolBaselines {
    by_source: BTreeMap<String, BTreeSet<String>>,
}

impl SymbolBaselines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(by_source: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { by_source }
    }

    pub fn get(&self, source: &str) -> Option<&BTreeSet<String>> {
        self.by_source.get(source)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.by_source.contains_key(source)
    }

    pub fn as_map(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.by_source
    }

    /// Compare `current` with the stored baseline and replace the baseline.
    ///
    /// In silent mode nothing is emitted. Otherwise symbols that appeared are
    /// listings and symbols that vanished are delistings: listings first,
    /// each group in lexical order.
    pub fn diff<I>(&mut self, source: &str, current: I, silent: bool, now: DateTime<Utc>) -> Vec<Event>
    where
        I: IntoIterator<Item = String>,
    {
        let current: BTreeSet<String> = current.into_iter().collect();
        let previous = self
            .by_source
            .insert(source.to_string(), current.clone())
            .unwrap_or_default();

        if silent {
            return Vec::new();
        }

        let make = |symbol: &String, kind: EventKind| Event {
            source: source.to_string(),
            title: symbol.clone(),
            url: None,
            observed_at: now,
            published_at: None,
            kind,
        };

        current
            .difference(&previous)
            .map(|s| make(s, EventKind::Listing))
            .chain(previous.difference(&current).map(|s| make(s, EventKind::Delisting)))
            .collect()
    }
}
