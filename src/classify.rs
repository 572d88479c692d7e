// src/classify.rs
//! Keyword classifier for announcement titles.
//!
//! Two pure questions are asked of every title:
//! - is it about futures at all (`is_futures_relevant`)?
//! - does it announce a listing or a delisting (`classify`)?
//!
//! The keyword tables are data (TOML), not code. Matching is case-folded and
//! anchored at word starts so "list" hits "Listing" but not "Delist".
//! Delisting keywords always win over listing keywords.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::event::EventKind;

pub const DEFAULT_KEYWORDS_PATH: &str = "config/keywords.toml";
pub const ENV_KEYWORDS_PATH: &str = "KEYWORDS_CONFIG_PATH";

const BUILTIN_KEYWORDS: &str = include_str!("../config/keywords.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTables {
    pub relevance: Vec<String>,
    #[serde(default)]
    pub spot: Vec<String>,
    pub listing: Vec<String>,
    pub delisting: Vec<String>,
}

/// Full explanation of a title, for debug logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub relevant: bool,
    pub kind: Option<EventKind>,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    tables: KeywordTables,
}

impl Classifier {
    /// Load tables from an explicit path, $KEYWORDS_CONFIG_PATH, the default
    /// path, or the built-in copy, in that order (same as `WatcherConfig::load`).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("KEYWORDS_CONFIG_PATH points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_KEYWORDS_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::builtin())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keyword tables from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing keyword tables {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let tables: KeywordTables = toml::from_str(s)?;
        Ok(Self::new(tables))
    }

    pub fn new(tables: KeywordTables) -> Self {
        Self {
            tables: KeywordTables {
                relevance: clean(tables.relevance),
                spot: clean(tables.spot),
                listing: clean(tables.listing),
                delisting: clean(tables.delisting),
            },
        }
    }

    pub fn builtin() -> Self {
        // Shipped file, covered by tests.
        Self::from_toml_str(BUILTIN_KEYWORDS).unwrap_or_else(|_| {
            Self::new(KeywordTables {
                relevance: vec!["futures".into(), "perpetual".into()],
                spot: vec![],
                listing: vec!["list".into()],
                delisting: vec!["delist".into()],
            })
        })
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    pub fn is_futures_relevant(&self, title: &str) -> bool {
        let folded = title.to_lowercase();
        any_hit(&folded, &self.tables.relevance)
    }

    pub fn classify(&self, title: &str) -> Option<EventKind> {
        let folded = title.to_lowercase();
        if any_hit(&folded, &self.tables.delisting) {
            return Some(EventKind::Delisting);
        }
        if any_hit(&folded, &self.tables.listing) {
            return Some(EventKind::Listing);
        }
        None
    }

    /// Relevance and kind together; `kind` is only set for relevant titles.
    pub fn verdict(&self, title: &str) -> Verdict {
        let folded = title.to_lowercase();
        let mut matched = Vec::new();
        for table in [
            &self.tables.relevance,
            &self.tables.spot,
            &self.tables.delisting,
            &self.tables.listing,
        ] {
            matched.extend(all_hits(&folded, table).map(str::to_string));
        }
        let relevant = any_hit(&folded, &self.tables.relevance);
        Verdict {
            relevant,
            kind: if relevant { self.classify(title) } else { None },
            matched,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::builtin()
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn any_hit(folded: &str, keywords: &[String]) -> bool {
    all_hits(folded, keywords).next().is_some()
}

fn all_hits<'a>(folded: &'a str, keywords: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
    keywords
        .iter()
        .map(String::as_str)
        .filter(move |kw| contains_at_word_start(folded, kw))
}

/// True if `kw` occurs in `haystack` at a position not preceded by a letter or digit.
fn contains_at_word_start(haystack: &str, kw: &str) -> bool {
    haystack.match_indices(kw).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c() -> Classifier {
        Classifier::builtin()
    }

    #[test]
    fn builtin_tables_parse() {
        let t = Classifier::from_toml_str(BUILTIN_KEYWORDS).unwrap();
        assert!(t.tables().relevance.contains(&"perpetual".to_string()));
        assert!(t.tables().delisting.contains(&"delist".to_string()));
    }

    #[test]
    fn reference_titles() {
        let c = c();
        assert_eq!(
            c.classify("BINANCE Will List XYZUSDT Perpetual Contracts"),
            Some(EventKind::Listing)
        );
        assert_eq!(
            c.classify("Bybit to Delist ABCUSDT Perpetual"),
            Some(EventKind::Delisting)
        );
        assert!(!c.is_futures_relevant("New Spot Trading Pair DEF/USDT"));
    }

    #[test]
    fn delisting_wins_over_listing() {
        let v = c().verdict("Binance Futures Will Delist and Remove Listing of OLDUSDT Perpetual");
        assert!(v.relevant);
        assert_eq!(v.kind, Some(EventKind::Delisting));
        assert!(v.matched.contains(&"list".to_string()));
    }

    #[test]
    fn word_start_anchoring() {
        assert!(contains_at_word_start("will list xyz", "list"));
        assert!(contains_at_word_start("listing", "list"));
        assert!(!contains_at_word_start("delist", "list"));
        assert!(contains_at_word_start("btc-perp", "perp"));
        assert!(contains_at_word_start("usdt-margined", "usdt-m"));
    }

    #[test]
    fn unrelated_title_is_none() {
        let c = c();
        assert_eq!(c.classify("Maintenance Notice for Wallet Upgrade"), None);
        let v = c.verdict("Notice on Perpetual Funding Rate Update");
        assert!(v.relevant);
        assert_eq!(v.kind, None);
    }

    #[test]
    fn irrelevant_titles_get_no_kind_in_verdict() {
        let v = c().verdict("New Spot Trading Pair DEF/USDT");
        assert!(!v.relevant);
        assert_eq!(v.kind, None);
        assert!(v.matched.contains(&"spot".to_string()));
    }

    #[test]
    fn classification_is_case_insensitive_and_stable() {
        let c = c();
        let a = c.classify("OKX WILL LAUNCH foo PERPETUAL SWAP");
        let b = c.classify("okx will launch FOO perpetual swap");
        assert_eq!(a, b);
        assert_eq!(a, Some(EventKind::Listing));
    }
}
