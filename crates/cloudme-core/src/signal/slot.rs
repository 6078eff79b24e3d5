//! One-shot result slot.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use super::SignalError;
use crate::domain::{FailureKind, Stage, StageOutcome};

/// Single-writer / multi-reader holder for one stage outcome.
///
/// Backed by a `watch` channel whose sender lives in the slot itself, so
/// the value stays readable after publication and late readers never block.
#[derive(Debug)]
pub struct Slot {
    stage: Stage,
    key: String,
    tx: watch::Sender<Option<StageOutcome>>,
}

impl Slot {
    pub(crate) fn new(stage: Stage, key: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            stage,
            key: key.into(),
            tx,
        }
    }

    /// Set the terminal value. Fails if a value is already present.
    pub fn publish(&self, outcome: StageOutcome) -> Result<(), SignalError> {
        let stored = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        });

        if stored {
            Ok(())
        } else {
            Err(SignalError::AlreadyPublished {
                stage: self.stage,
                key: self.key.clone(),
            })
        }
    }

    pub fn is_published(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Current value without waiting.
    pub fn peek(&self) -> Option<StageOutcome> {
        self.tx.borrow().clone()
    }

    /// Wait until a value is present.
    ///
    /// No deadline here; callers bound this through `SignalRegistry::await_result`.
    pub async fn wait(&self) -> StageOutcome {
        let mut rx = self.tx.subscribe();
        // `self.tx` outlives `rx`, so the channel cannot close under us.
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| (*value).clone());

        outcome.unwrap_or_else(|| {
            StageOutcome::failure(FailureKind::Abandoned, "slot closed without a value")
        })
    }
}

/// Exclusive write handle for a slot.
///
/// `publish` consumes the handle, so a task cannot publish twice. Dropping an
/// unpublished handle (task panic, early return) publishes an `Abandoned`
/// failure so dependents are released.
#[derive(Debug)]
pub struct SlotPublisher {
    slot: Arc<Slot>,
    done: bool,
}

impl SlotPublisher {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Self { slot, done: false }
    }

    pub fn stage(&self) -> Stage {
        self.slot.stage
    }

    pub fn key(&self) -> &str {
        &self.slot.key
    }

    pub fn publish(mut self, outcome: StageOutcome) -> Result<(), SignalError> {
        self.done = true;
        self.slot.publish(outcome)
    }
}

impl Drop for SlotPublisher {
    fn drop(&mut self) {
        if self.done || self.slot.is_published() {
            return;
        }
        warn!(
            stage = %self.slot.stage,
            key = %self.slot.key,
            "slot dropped without a result"
        );
        let _ = self.slot.publish(StageOutcome::failure(
            FailureKind::Abandoned,
            format!("{} task for {} ended without a result", self.slot.stage, self.slot.key),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn second_publish_is_rejected() {
        let slot = Slot::new(Stage::Build, "img");
        slot.publish(StageOutcome::success()).unwrap();

        let err = slot
            .publish(StageOutcome::failure(FailureKind::StageExecution, "late"))
            .unwrap_err();
        assert!(matches!(err, SignalError::AlreadyPublished { .. }));
        assert!(slot.peek().unwrap().is_success());
    }

    #[tokio::test]
    async fn wait_returns_after_publish() {
        let slot = Arc::new(Slot::new(Stage::Run, "api"));

        let waiter = tokio::spawn({
            let slot = slot.clone();
            async move { slot.wait().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        slot.publish(StageOutcome::success()).unwrap();
        let outcome = waiter.await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn dropped_publisher_releases_waiters() {
        let slot = Arc::new(Slot::new(Stage::Build, "img"));
        let publisher = SlotPublisher::new(slot.clone());
        drop(publisher);

        let outcome = tokio::time::timeout(Duration::from_millis(100), slot.wait())
            .await
            .unwrap();
        assert_eq!(
            outcome.failure_detail().unwrap().kind,
            FailureKind::Abandoned
        );
    }
}
