// tests/config_load.rs
use futures_listing_watcher::classify::Classifier;
use futures_listing_watcher::config::SourceCfg;
use futures_listing_watcher::ingest::providers::{build_sources, http_client};
use futures_listing_watcher::ingest::types::SourceKind;
use futures_listing_watcher::notify::ChannelCfg;
use futures_listing_watcher::{build_watcher, WatcherConfig};
use std::{env, fs};

const SMALL: &str = r#"
poll_interval_secs = 20
seen_capacity = 50
state_path = "var/state.json"

[[sources]]
kind = "feed"
name = "Binance"
discriminator = "id"

[sources.primary]
type = "json"
url = "https://example.test/api"
items = "/data/articles"
id_field = "code"

[sources.fallback]
type = "html"
url = "https://example.test/page"

[[sources]]
kind = "symbols"
name = "Gate"
enabled = false
url = "https://example.test/contracts"
items = ""
symbol_field = "name"
"#;

fn clear_env() {
    for k in [
        "WATCHER_CONFIG_PATH",
        "KEYWORDS_CONFIG_PATH",
        "POLL_INTERVAL_SECS",
        "SEEN_CAPACITY",
        "STATE_PATH",
    ] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn explicit_path_then_env_then_builtin() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // Nothing on disk: shipped defaults.
    let cfg = WatcherConfig::load(None).unwrap();
    assert_eq!(cfg.poll_interval_secs, 60);
    assert!(cfg.sources.len() >= 2);

    let p = tmp.path().join("small.toml");
    fs::write(&p, SMALL).unwrap();
    let cfg = WatcherConfig::load(Some(p.as_path())).unwrap();
    assert_eq!(cfg.poll_interval_secs, 20);
    assert_eq!(cfg.enabled_sources().count(), 1);

    env::set_var("WATCHER_CONFIG_PATH", p.display().to_string());
    env::set_var("SEEN_CAPACITY", "7");
    env::set_var("STATE_PATH", "/tmp/elsewhere.json");
    let cfg = WatcherConfig::load(None).unwrap();
    assert_eq!(cfg.seen_capacity, 7);
    assert_eq!(cfg.state_path, std::path::PathBuf::from("/tmp/elsewhere.json"));

    env::set_var("WATCHER_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(WatcherConfig::load(None).is_err());
    assert!(WatcherConfig::load(Some(tmp.path().join("nope.toml").as_path())).is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn keyword_tables_follow_env_override() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("keywords.toml");
    fs::write(
        &p,
        r#"
relevance = ["Futures"]
listing = [" Onboard ", ""]
delisting = ["sunset"]
"#,
    )
    .unwrap();

    env::set_var("KEYWORDS_CONFIG_PATH", p.display().to_string());
    let c = Classifier::load(None).unwrap();
    assert_eq!(c.tables().listing, vec!["onboard".to_string()]);
    assert!(c.is_futures_relevant("OKX FUTURES onboard"));
    assert!(!c.is_futures_relevant("Binance Will List XYZUSDT Perpetual"));

    env::set_var("KEYWORDS_CONFIG_PATH", tmp.path().join("gone.toml").display().to_string());
    assert!(Classifier::load(None).is_err());
    clear_env();
}

#[serial_test::serial]
#[test]
fn explicit_keywords_path_beats_env() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let explicit = tmp.path().join("explicit.toml");
    fs::write(
        &explicit,
        r#"
relevance = ["futures"]
listing = ["onboard"]
delisting = ["sunset"]
"#,
    )
    .unwrap();
    let from_env = tmp.path().join("env.toml");
    fs::write(
        &from_env,
        r#"
relevance = ["futures"]
listing = ["debut"]
delisting = ["sunset"]
"#,
    )
    .unwrap();

    env::set_var("KEYWORDS_CONFIG_PATH", from_env.display().to_string());
    let c = Classifier::load(Some(explicit.as_path())).unwrap();
    assert_eq!(c.tables().listing, vec!["onboard".to_string()]);

    // Same precedence as the watcher config.
    env::set_var("WATCHER_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    let small = tmp.path().join("small.toml");
    fs::write(&small, SMALL).unwrap();
    assert!(WatcherConfig::load(Some(small.as_path())).is_ok());
    clear_env();
}

#[serial_test::serial]
#[test]
fn huge_fetch_timeout_does_not_overflow() {
    clear_env();
    let cfg = WatcherConfig {
        fetch_timeout_secs: u64::MAX,
        ..Default::default()
    };
    let w = build_watcher(&cfg, &ChannelCfg::default());
    assert!(w.is_ok());
}

#[test]
fn sources_are_built_in_config_order() {
    let cfg = WatcherConfig::from_toml_str(SMALL).unwrap();
    let client = http_client(&cfg).unwrap();
    let sources = build_sources(&cfg, &client).unwrap();
    assert_eq!(sources.len(), 1, "disabled sources are skipped");
    assert_eq!(sources[0].name(), "Binance");
    assert_eq!(sources[0].kind(), SourceKind::TextFeed);
}

#[test]
fn shipped_sources_all_build() {
    let cfg = WatcherConfig::from_toml_str(include_str!("../config/watcher.toml")).unwrap();
    let client = http_client(&cfg).unwrap();
    let sources = build_sources(&cfg, &client).unwrap();
    assert_eq!(sources.len(), cfg.enabled_sources().count());
    let feeds = cfg
        .sources
        .iter()
        .filter(|s| matches!(s, SourceCfg::Feed(_)))
        .count();
    assert_eq!(
        sources.iter().filter(|s| s.kind() == SourceKind::TextFeed).count(),
        feeds
    );
}

#[test]
fn bad_html_pattern_fails_at_build_time() {
    let toml = r#"
[[sources]]
kind = "feed"
name = "X"
[sources.primary]
type = "html"
url = "https://example.test"
link_pattern = "<a>(.*)</a>"
"#;
    let cfg = WatcherConfig::from_toml_str(toml).unwrap();
    let client = http_client(&cfg).unwrap();
    assert!(build_sources(&cfg, &client).is_err());
}
