//! Acknowledgment seam towards the chat platform.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use hoover_core::{ChatContext, ContentId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Final outcome of an item, as shown to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The item was placed in `pack`.
    Admitted {
        /// Pack name.
        pack: String,
        /// Members after placement.
        count: u32,
    },
    /// The item was not placed.
    Failed {
        /// Short reason.
        reason: String,
    },
    /// The queue was full; the submitter should try again later.
    Rejected,
}

impl Outcome {
    /// Reaction rendered on the originating message.
    pub fn reaction(&self) -> &'static str {
        match self {
            Outcome::Admitted { .. } => "👍",
            Outcome::Failed { .. } | Outcome::Rejected => "👎",
        }
    }

    /// Returns true for a successful admission.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Admitted { .. })
    }
}

/// Delivers acknowledgments back to the originating chat.
///
/// Delivery is best-effort: the pipeline logs failures and moves on.
/// Duplicates are never acknowledged.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Acknowledges the item `id` posted in `context`.
    async fn acknowledge(
        &self,
        context: &ChatContext,
        id: &ContentId,
        outcome: &Outcome,
    ) -> EngineResult<()>;

    /// Announces a newly opened pack in `context`.
    async fn pack_created(&self, context: &ChatContext, pack: &str) -> EngineResult<()>;
}

/// A notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn acknowledge(
        &self,
        context: &ChatContext,
        id: &ContentId,
        outcome: &Outcome,
    ) -> EngineResult<()> {
        tracing::info!(chat = context.chat_id, id = %id, reaction = outcome.reaction(), "acknowledged");
        Ok(())
    }

    async fn pack_created(&self, context: &ChatContext, pack: &str) -> EngineResult<()> {
        tracing::info!(chat = context.chat_id, pack = %pack, "new pack announced");
        Ok(())
    }
}

/// A notification captured by [`MockNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An acknowledgment.
    Ack {
        /// Chat.
        chat_id: i64,
        /// Item identity.
        id: ContentId,
        /// Outcome.
        outcome: Outcome,
    },
    /// A new-pack announcement.
    PackCreated {
        /// Chat.
        chat_id: i64,
        /// Pack name.
        pack: String,
    },
}

/// A mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl MockNotifier {
    /// Creates a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail (after recording it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Acknowledgments for `id`.
    pub fn acks_for(&self, id: &ContentId) -> Vec<Outcome> {
        self.sent
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Ack { id: ack_id, outcome, .. } if ack_id == id => {
                    Some(outcome.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Announced pack names.
    pub fn announced_packs(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::PackCreated { pack, .. } => Some(pack.clone()),
                Notification::Ack { .. } => None,
            })
            .collect()
    }

    fn deliver(&self, notification: Notification) -> EngineResult<()> {
        self.sent.lock().push(notification);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Notify("mock delivery failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn acknowledge(
        &self,
        context: &ChatContext,
        id: &ContentId,
        outcome: &Outcome,
    ) -> EngineResult<()> {
        self.deliver(Notification::Ack {
            chat_id: context.chat_id,
            id: id.clone(),
            outcome: outcome.clone(),
        })
    }

    async fn pack_created(&self, context: &ChatContext, pack: &str) -> EngineResult<()> {
        self.deliver(Notification::PackCreated {
            chat_id: context.chat_id,
            pack: pack.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reactions() {
        let ok = Outcome::Admitted {
            pack: "p".into(),
            count: 1,
        };
        assert_eq!(ok.reaction(), "👍");
        assert!(ok.is_success());
        assert_eq!(Outcome::Rejected.reaction(), "👎");
        assert!(!Outcome::Failed { reason: "x".into() }.is_success());
    }

    #[tokio::test]
    async fn mock_records_and_fails_on_demand() {
        let notifier = MockNotifier::new();
        let ctx = ChatContext::new(9);
        let id = ContentId::from("a");

        notifier.acknowledge(&ctx, &id, &Outcome::Rejected).await.unwrap();
        notifier.pack_created(&ctx, "p1").await.unwrap();

        notifier.set_failing(true);
        assert!(notifier.acknowledge(&ctx, &id, &Outcome::Rejected).await.is_err());

        assert_eq!(notifier.acks_for(&id).len(), 2);
        assert_eq!(notifier.announced_packs(), vec!["p1".to_string()]);
    }
}
