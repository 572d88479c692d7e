// src/dedup.rs
//! Event identity and the bounded record of what was already announced.

use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};

use crate::event::Event;
use crate::ingest::normalize_text;
use crate::ingest::types::{Discriminator, RawEntry};

/// Hex SHA-256 over `source | normalized title | discriminator`.
///
/// Capture time never participates, so re-polling the same announcement
/// (from either fetch path) yields the same id.
pub fn fingerprint(event: &Event, discriminator: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.source.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_title(&event.title).as_bytes());
    if let Some(d) = discriminator {
        hasher.update(b"|");
        hasher.update(d.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// The discriminator value an entry contributes under `policy`, if any.
/// Entries lacking the declared field fall back to source + title.
pub fn discriminator_for(entry: &RawEntry, policy: Discriminator) -> Option<String> {
    match policy {
        Discriminator::None => None,
        Discriminator::Id => entry.id.clone(),
        Discriminator::PublishedAt => entry.published_at.map(|t| t.timestamp().to_string()),
    }
}

pub fn normalize_title(title: &str) -> String {
    normalize_text(title).to_lowercase()
}

/// FIFO-bounded set of announced fingerprints, oldest first.
///
/// `insert_if_new` is the only way an emission decision is made: test and
/// insert happen together. The set may exceed capacity while a cycle is
/// running; `evict` restores the bound once the cycle's decisions are done.
#[derive(Debug, Clone)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl SeenSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from a persisted list (oldest first). Duplicates keep their first position.
    pub fn from_ordered<I: IntoIterator<Item = String>>(items: I, capacity: usize) -> Self {
        let mut s = Self::with_capacity(capacity);
        for id in items {
            s.mark_seen(id);
        }
        s.evict();
        s
    }

    pub fn is_new(&self, id: &str) -> bool {
        !self.members.contains(id)
    }

    pub fn mark_seen(&mut self, id: String) {
        if self.members.insert(id.clone()) {
            self.order.push_back(id);
        }
    }

    /// Returns true (and records `id`) only the first time `id` is offered.
    pub fn insert_if_new(&mut self, id: String) -> bool {
        if !self.is_new(&id) {
            return false;
        }
        self.mark_seen(id);
        true
    }

    /// Drop oldest entries until within capacity. Returns how many were dropped.
    pub fn evict(&mut self) -> usize {
        let mut dropped = 0;
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.members.remove(&old);
                dropped += 1;
            }
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use chrono::{Duration, TimeZone, Utc};

    fn ev(source: &str, title: &str) -> Event {
        Event {
            source: source.into(),
            title: title.into(),
            url: None,
            observed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            published_at: None,
            kind: EventKind::Listing,
        }
    }

    #[test]
    fn fingerprint_ignores_observation_time_and_cosmetics() {
        let a = ev("Binance", "Binance Will List XYZUSDT Perpetual");
        let mut b = ev("binance", "  binance will list   XYZUSDT perpetual! ");
        b.observed_at += Duration::minutes(7);
        b.url = Some("https://elsewhere.test".into());
        assert_eq!(fingerprint(&a, None), fingerprint(&b, None));
    }

    #[test]
    fn fingerprint_separates_sources_and_discriminators() {
        let a = ev("Binance", "Will List XYZUSDT Perpetual");
        let b = ev("Bybit", "Will List XYZUSDT Perpetual");
        assert_ne!(fingerprint(&a, None), fingerprint(&b, None));
        assert_ne!(fingerprint(&a, Some("1")), fingerprint(&a, Some("2")));
        assert_ne!(fingerprint(&a, None), fingerprint(&a, Some("1")));
        assert_eq!(fingerprint(&a, None).len(), 64);
    }

    #[test]
    fn discriminator_falls_back_when_field_missing() {
        let mut e = RawEntry::titled("x");
        assert_eq!(discriminator_for(&e, Discriminator::Id), None);
        e.id = Some("42".into());
        assert_eq!(discriminator_for(&e, Discriminator::Id).as_deref(), Some("42"));
        assert_eq!(discriminator_for(&e, Discriminator::None), None);
        e.published_at = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(
            discriminator_for(&e, Discriminator::PublishedAt).as_deref(),
            Some("1700000000")
        );
    }

    #[test]
    fn insert_if_new_is_once_only() {
        let mut s = SeenSet::with_capacity(10);
        assert!(s.insert_if_new("a".into()));
        assert!(!s.insert_if_new("a".into()));
        assert!(!s.is_new("a"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn evict_keeps_newest() {
        let mut s = SeenSet::with_capacity(3);
        for id in ["a", "b", "c", "d", "e"] {
            s.insert_if_new(id.into());
        }
        // over capacity until the cycle ends
        assert_eq!(s.len(), 5);
        assert_eq!(s.evict(), 2);
        assert_eq!(s.iter().cloned().collect::<Vec<_>>(), vec!["c", "d", "e"]);
        assert!(s.is_new("a"));
        assert!(!s.is_new("e"));
    }

    #[test]
    fn from_ordered_trims_to_capacity() {
        let s = SeenSet::from_ordered((0..10).map(|i| i.to_string()), 4);
        assert_eq!(s.len(), 4);
        assert_eq!(s.iter().next().map(String::as_str), Some("6"));
    }
}
