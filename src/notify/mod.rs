// src/notify/mod.rs
pub mod dispatcher;
pub mod slack;
pub mod telegram;

use anyhow::Result;

use crate::event::{Event, EventKind};

pub use dispatcher::{DispatchReport, Dispatcher};
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

/// Outbound channel. Implementations make exactly one attempt per call.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, text: &str) -> Result<()>;
}

/// Fallback channel when no credentials are configured.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<()> {
        tracing::info!(target: "notify", "{text}");
        Ok(())
    }
}

/// Channel credentials, read from the environment only.
#[derive(Debug, Clone, Default)]
pub struct ChannelCfg {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub slack_webhook: Option<String>,
}

impl ChannelCfg {
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            telegram_token: var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: var("TELEGRAM_CHAT_ID"),
            slack_webhook: var("SLACK_WEBHOOK_URL"),
        }
    }

    /// Telegram if fully configured, else Slack, else log-only.
    pub fn build(&self, client: reqwest::Client) -> Box<dyn Notifier> {
        match (&self.telegram_token, &self.telegram_chat_id, &self.slack_webhook) {
            (Some(token), Some(chat), _) => {
                Box::new(TelegramNotifier::new(token.clone(), chat.clone(), client))
            }
            (Some(_), None, _) | (None, Some(_), _) if self.slack_webhook.is_none() => {
                tracing::warn!("Telegram needs both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID; logging only");
                Box::new(LogNotifier)
            }
            (_, _, Some(url)) => Box::new(SlackNotifier::new(url.clone(), client)),
            _ => {
                tracing::warn!("no notification channel configured; logging only");
                Box::new(LogNotifier)
            }
        }
    }
}

/// Plain-text message for one event.
pub fn render_message(ev: &Event) -> String {
    let icon = match ev.kind {
        EventKind::Listing => "🆕",
        EventKind::Delisting => "⚠️",
    };
    let mut out = format!(
        "{icon} {} FUTURES {}\n{}",
        ev.source.to_uppercase(),
        ev.kind.as_str(),
        ev.title
    );
    if let Some(url) = &ev.url {
        out.push('\n');
        out.push_str(url);
    }
    out.push_str(&format!(
        "\n📅 {}",
        ev.display_time().format("%Y-%m-%d %H:%M UTC")
    ));
    out
}
