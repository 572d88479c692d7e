// src/notify/dispatcher.rs
use anyhow::Result;
use metrics::counter;
use std::time::Duration;
use tokio::time::Instant;

use super::{render_message, Notifier};
use crate::event::Event;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sequential, throttled delivery. A failed send is logged and dropped:
/// it is neither retried nor allowed to hold up later events.
pub struct Dispatcher {
    notifier: Box<dyn Notifier>,
    min_delay: Duration,
    last_sent: Option<Instant>,
}

impl Dispatcher {
    pub fn new(notifier: Box<dyn Notifier>, min_delay: Duration) -> Self {
        Self {
            notifier,
            min_delay,
            last_sent: None,
        }
    }

    pub fn channel(&self) -> &'static str {
        self.notifier.name()
    }

    /// One attempt for one event, respecting the gap since the previous attempt.
    pub async fn deliver(&mut self, ev: &Event) -> Result<()> {
        if let Some(last) = self.last_sent {
            tokio::time::sleep_until(last + self.min_delay).await;
        }
        let text = render_message(ev);
        let res = self.notifier.send(&text).await;
        self.last_sent = Some(Instant::now());
        res
    }

    pub async fn deliver_all(&mut self, events: &[Event]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for ev in events {
            match self.deliver(ev).await {
                Ok(()) => {
                    report.sent += 1;
                    counter!("notify_sent_total", "channel" => self.channel()).increment(1);
                    tracing::info!(
                        source = %ev.source,
                        kind = ev.kind.as_str(),
                        title = %ev.title,
                        "notification sent"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    counter!("notify_failed_total", "channel" => self.channel()).increment(1);
                    tracing::warn!(
                        source = %ev.source,
                        title = %ev.title,
                        error = %format!("{e:#}"),
                        "notification failed, not retrying"
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use anyhow::anyhow;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    struct Flaky {
        calls: Arc<Mutex<Vec<(String, Instant)>>>,
        fail_first: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }
        async fn send(&self, text: &str) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((text.to_string(), Instant::now()));
            if self.fail_first && calls.len() == 1 {
                return Err(anyhow!("502"));
            }
            Ok(())
        }
    }

    fn ev(title: &str) -> Event {
        Event {
            source: "Bybit".into(),
            title: title.into(),
            url: None,
            observed_at: Utc::now(),
            published_at: None,
            kind: EventKind::Listing,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_block_later_events_and_gap_is_enforced() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new(
            Box::new(Flaky {
                calls: calls.clone(),
                fail_first: true,
            }),
            Duration::from_millis(1500),
        );

        let report = d.deliver_all(&[ev("A"), ev("B"), ev("C")]).await;
        assert_eq!(report, DispatchReport { sent: 2, failed: 1 });

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].0.contains("\nA\n"));
        for w in calls.windows(2) {
            assert!(w[1].1 - w[0].1 >= Duration::from_millis(1500));
        }
    }
}
