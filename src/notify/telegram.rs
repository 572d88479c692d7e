use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::Notifier;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    api_base: String,
    client: Client,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, client: Client) -> Self {
        Self {
            token,
            chat_id,
            api_base: API_BASE.to_string(),
            client,
        }
    }

    /// Point at a different Bot API host (self-hosted bot API server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };
        // reqwest errors embed the url, which carries the token
        self.client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("telegram request failed: {}", e.without_url()))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("telegram non-2xx: {:?}", e.status()))
            .context("telegram sendMessage")?;
        Ok(())
    }
}
