//! Fire-and-forget notification sink
//!
//! State transitions emit short notices to customers, sellers and agents.
//! Delivery is best effort over a broadcast channel: a full or closed
//! channel is logged and never fails the triggering operation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Channel capacity; notices are small and transient
const NOTICE_CHANNEL_CAPACITY: usize = 4096;

/// Notice category, mirrors the recipient-facing inbox tabs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCategory {
    Order,
    Delivery,
    Payment,
}

/// One notification message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub recipient_id: String,
    pub text: String,
    pub category: NoticeCategory,
}

/// Notification fan-out handle
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send a notice; failures are logged, never propagated
    pub fn send(&self, recipient_id: impl Into<String>, text: impl Into<String>, category: NoticeCategory) {
        let notice = Notice {
            recipient_id: recipient_id.into(),
            text: text.into(),
            category,
        };
        if let Err(err) = self.tx.send(notice) {
            tracing::debug!(error = %err, "Notice dropped (no subscribers)");
        }
    }

    /// Subscribe to the notice stream
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_notices() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.send("cust-1", "Your order is on the way", NoticeCategory::Order);

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.recipient_id, "cust-1");
        assert_eq!(notice.category, NoticeCategory::Order);
    }

    #[test]
    fn send_without_subscribers_is_harmless() {
        let notifier = Notifier::new();
        notifier.send("cust-1", "hello", NoticeCategory::Delivery);
    }
}
