use tracing::warn;

use crate::client::Sender;

/// What happened during one fan-out. Failures are counted, never
/// propagated: at most one attempt per recipient, by policy.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends `text` to every chat id, one attempt each. A recipient that
/// errors (blocked the bot, left the group) is logged and skipped; the
/// rest of the fan-out continues.
pub async fn broadcast<S: Sender>(sender: &S, chat_ids: &[i64], text: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for &chat_id in chat_ids {
        match sender.send_text(chat_id, text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!("Broadcast failed for {}: {}", chat_id, e);
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use std::sync::Mutex;

    struct FlakySender {
        fail_for: i64,
        attempted: Mutex<Vec<i64>>,
    }

    impl Sender for FlakySender {
        async fn send_text(&self, chat_id: i64, _text: &str) -> Result<()> {
            self.attempted.lock().unwrap().push(chat_id);
            if chat_id == self.fail_for {
                return Err(anyhow!("chat not found"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_stop_the_fanout() {
        let sender = FlakySender { fail_for: 2, attempted: Mutex::new(Vec::new()) };
        let report = broadcast(&sender, &[1, 2, 3], "Д/З на сьогодні").await;

        assert_eq!(report, BroadcastReport { sent: 2, failed: 1 });
        assert_eq!(*sender.attempted.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_subscriber_list_is_a_noop() {
        let sender = FlakySender { fail_for: 0, attempted: Mutex::new(Vec::new()) };
        let report = broadcast(&sender, &[], "text").await;
        assert_eq!(report, BroadcastReport::default());
    }
}
