// src/ingest/providers/html_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;

use crate::config::HtmlFeedCfg;
use crate::ingest::normalize_text;
use crate::ingest::types::{FeedFetcher, RawEntry};

/// Fallback scraper: pulls `<a href>` links off an announcement listing page.
pub struct HtmlFeedFetcher {
    label: String,
    url: String,
    base_url: Option<String>,
    link_re: Regex,
    client: Client,
}

impl HtmlFeedFetcher {
    pub fn new(label: impl Into<String>, cfg: HtmlFeedCfg, client: Client) -> Result<Self> {
        let link_re = Regex::new(&cfg.link_pattern)
            .map_err(|e| anyhow::anyhow!("link_pattern regex error: {e}"))?;
        for group in ["url", "title"] {
            if !link_re.capture_names().flatten().any(|n| n == group) {
                anyhow::bail!("link_pattern is missing the `{group}` group");
            }
        }
        Ok(Self {
            label: label.into(),
            url: cfg.url,
            base_url: cfg.base_url,
            link_re,
            client,
        })
    }

    /// Extract titled links in page order, one entry per distinct url.
    pub fn parse_page(&self, html: &str) -> Vec<RawEntry> {
        let t0 = std::time::Instant::now();
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for caps in self.link_re.captures_iter(html) {
            let (Some(href), Some(title_raw)) = (caps.name("url"), caps.name("title")) else {
                continue;
            };
            let title = normalize_text(title_raw.as_str());
            if title.is_empty() {
                continue;
            }
            let href = html_escape::decode_html_entities(href.as_str().trim()).to_string();
            let url = resolve_link(self.base_url.as_deref(), &href);
            if !seen.insert(url.clone()) {
                continue;
            }
            out.push(RawEntry {
                title,
                url: Some(url),
                published_at: None,
                id: None,
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
}

fn resolve_link(base: Option<&str>, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match base {
        Some(b) => {
            let b = b.trim_end_matches('/');
            if let Some(rest) = href.strip_prefix('/') {
                format!("{b}/{rest}")
            } else {
                format!("{b}/{href}")
            }
        }
        None => href.to_string(),
    }
}

#[async_trait]
impl FeedFetcher for HtmlFeedFetcher {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_entries(&self) -> Result<Vec<RawEntry>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("{} request", self.label))?
            .error_for_status()
            .with_context(|| format!("{} non-2xx", self.label))?
            .text()
            .await
            .with_context(|| format!("{} body", self.label))?;
        Ok(self.parse_page(&body))
    }
}
