// src/config.rs
//! Watcher configuration: poll cadence, dedup capacity, state location and
//! the `[[sources]]` table describing every exchange adapter.
//!
//! Resolution order:
//! 1) explicit path (CLI `--config`)
//! 2) $WATCHER_CONFIG_PATH
//! 3) config/watcher.toml
//! 4) built-in copy of the shipped config
//!
//! Credentials are never read from the file; see `notify::ChannelCfg`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::ingest::types::Discriminator;

pub const DEFAULT_CONFIG_PATH: &str = "config/watcher.toml";
pub const ENV_CONFIG_PATH: &str = "WATCHER_CONFIG_PATH";

const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
const ENV_SEEN_CAPACITY: &str = "SEEN_CAPACITY";
const ENV_STATE_PATH: &str = "STATE_PATH";

const BUILTIN_CONFIG: &str = include_str!("../config/watcher.toml");

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
    pub seen_capacity: usize,
    pub state_path: PathBuf,
    pub send_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub metrics_addr: Option<SocketAddr>,
    pub keywords_path: Option<PathBuf>,
    pub sources: Vec<SourceCfg>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            seen_capacity: 2000,
            state_path: PathBuf::from("state/watcher_state.json"),
            send_delay_ms: 1000,
            fetch_timeout_secs: 15,
            user_agent: "Mozilla/5.0".to_string(),
            metrics_addr: None,
            keywords_path: None,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceCfg {
    Feed(FeedSourceCfg),
    Symbols(SymbolSourceCfg),
}

impl SourceCfg {
    pub fn name(&self) -> &str {
        match self {
            SourceCfg::Feed(f) => &f.name,
            SourceCfg::Symbols(s) => &s.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            SourceCfg::Feed(f) => f.enabled,
            SourceCfg::Symbols(s) => s.enabled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSourceCfg {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub discriminator: Discriminator,
    pub primary: FetcherCfg,
    #[serde(default)]
    pub fallback: Option<FetcherCfg>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherCfg {
    Json(JsonFeedCfg),
    Html(HtmlFeedCfg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    S,
    #[default]
    Ms,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonFeedCfg {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// JSON body for POST endpoints.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// JSON pointer to the array of announcements, e.g. "/data/articles".
    pub items: String,
    #[serde(default = "default_title_field")]
    pub title_field: String,
    #[serde(default)]
    pub url_field: Option<String>,
    /// Link built from the id, e.g. "https://x.test/a/{id}".
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub time_field: Option<String>,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlFeedCfg {
    pub url: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Regex with named groups `url` and `title`.
    #[serde(default = "default_link_pattern")]
    pub link_pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolSourceCfg {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    /// JSON pointer to the instrument array ("" for a top-level array).
    pub items: String,
    pub symbol_field: String,
    #[serde(default)]
    pub status_field: Option<String>,
    #[serde(default)]
    pub status_value: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_title_field() -> String {
    "title".to_string()
}

pub fn default_link_pattern() -> String {
    r##"(?is)<a\b[^>]*?href\s*=\s*["'](?P<url>[^"'#]+)["'][^>]*>(?P<title>.*?)</a>"##.to_string()
}

impl WatcherConfig {
    /// Load using an optional explicit path, then env var, then fallbacks.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match resolve_path(explicit)? {
            Some(p) => Self::load_from(&p)?,
            None => {
                tracing::info!("no config file found, using built-in defaults");
                Self::from_toml_str(BUILTIN_CONFIG).context("parsing built-in config")?
            }
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watcher config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing watcher config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: WatcherConfig = toml::from_str(s)?;
        let mut names = std::collections::HashSet::new();
        for src in &cfg.sources {
            if !names.insert(src.name().to_ascii_lowercase()) {
                return Err(anyhow!("duplicate source name `{}`", src.name()));
            }
        }
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>(ENV_POLL_INTERVAL) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_SEEN_CAPACITY) {
            self.seen_capacity = v;
        }
        if let Ok(p) = std::env::var(ENV_STATE_PATH) {
            if !p.trim().is_empty() {
                self.state_path = PathBuf::from(p.trim());
            }
        }
    }

    /// Clamp values that would break the loop.
    pub fn sanitize(&mut self) {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.seen_capacity = self.seen_capacity.max(1);
        self.fetch_timeout_secs = self.fetch_timeout_secs.max(1);
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceCfg> {
        self.sources.iter().filter(|s| s.enabled())
    }
}

fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        return Err(anyhow!("config path {} does not exist", p.display()));
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("WATCHER_CONFIG_PATH points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn builtin_config_parses_with_sources() {
        let cfg = WatcherConfig::from_toml_str(BUILTIN_CONFIG).unwrap();
        assert!(cfg.sources.iter().any(|s| matches!(s, SourceCfg::Feed(_))));
        assert!(cfg.sources.iter().any(|s| matches!(s, SourceCfg::Symbols(_))));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = WatcherConfig::from_toml_str("poll_interval_secs = 30").unwrap();
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.seen_capacity, 2000);
        assert_eq!(cfg.send_delay_ms, 1000);
        assert!(cfg.sources.is_empty());
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        let toml = r#"
[[sources]]
kind = "symbols"
name = "Gate"
url = "https://x.test"
items = ""
symbol_field = "name"

[[sources]]
kind = "symbols"
name = "gate"
url = "https://y.test"
items = ""
symbol_field = "name"
"#;
        assert!(WatcherConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn sanitize_clamps_zeroes() {
        let mut cfg = WatcherConfig {
            poll_interval_secs: 0,
            seen_capacity: 0,
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.poll_interval_secs, 1);
        assert_eq!(cfg.seen_capacity, 1);
        assert_eq!(cfg.fetch_timeout_secs, 1);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        env::set_var(ENV_POLL_INTERVAL, "5");
        env::set_var(ENV_SEEN_CAPACITY, "not-a-number");
        let mut cfg = WatcherConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.poll_interval_secs, 5);
        assert_eq!(cfg.seen_capacity, 2000);
        env::remove_var(ENV_POLL_INTERVAL);
        env::remove_var(ENV_SEEN_CAPACITY);
    }
}
