use anyhow::{Context, Result};
use reqwest::Client;

use super::Notifier;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String, client: Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({ "text": text });

        // The webhook url is the credential; keep it out of error chains.
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(scrub)
            .context("slack post")?;
        resp.error_for_status().map_err(scrub).context("slack non-2xx")?;
        Ok(())
    }
}

fn scrub(e: reqwest::Error) -> reqwest::Error {
    e.without_url()
}
