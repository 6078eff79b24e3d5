//! Per-stage slot registries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{SignalError, Slot, SlotPublisher};
use crate::domain::{Stage, StageOutcome};

/// How long and how often a dependent stage waits for its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Re-check interval while the slot does not exist yet.
    pub poll_interval: Duration,

    /// Upper bound for a single wait.
    pub timeout: Duration,
}

impl WaitPolicy {
    pub fn deadline_from(&self, start: Instant) -> Instant {
        start + self.timeout
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Slots of one stage, keyed by entity (image reference or service name).
///
/// The map is only touched under the mutex and the lock is never held across
/// an await. Waiters are woken by `created` when a slot is inserted; the poll
/// interval is a fallback.
pub struct SignalRegistry {
    stage: Stage,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    created: Notify,
}

impl SignalRegistry {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            slots: Mutex::new(HashMap::new()),
            created: Notify::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Allocate a fresh slot for `key` and hand out its publisher.
    ///
    /// A key whose slot is still unpublished cannot be re-created; a
    /// published slot is replaced.
    pub async fn create_slot(&self, key: &str) -> Result<SlotPublisher, SignalError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            if let Some(existing) = slots.get(key)
                && !existing.is_published()
            {
                return Err(SignalError::SlotExists {
                    stage: self.stage,
                    key: key.to_string(),
                });
            }
            let slot = Arc::new(Slot::new(self.stage, key));
            slots.insert(key.to_string(), Arc::clone(&slot));
            slot
        }; // Lock released here

        self.created.notify_waiters();
        trace!(stage = %self.stage, key, "slot created");
        Ok(SlotPublisher::new(slot))
    }

    /// Publish into an existing slot.
    pub async fn publish(&self, key: &str, outcome: StageOutcome) -> Result<(), SignalError> {
        let slot = self.get(key).await.ok_or_else(|| SignalError::UnknownSlot {
            stage: self.stage,
            key: key.to_string(),
        })?;
        slot.publish(outcome)
    }

    /// Current value of the slot, if it exists and is published.
    pub async fn peek(&self, key: &str) -> Option<StageOutcome> {
        self.get(key).await.and_then(|slot| slot.peek())
    }

    /// Wait for the outcome of `key`.
    ///
    /// A missing slot means the owning stage has not started; keep waiting.
    /// Bounded by `deadline` and `cancel`. A slot that is already published
    /// is returned immediately, even after cancellation.
    pub async fn await_result(
        &self,
        key: &str,
        poll_interval: Duration,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome, SignalError> {
        if let Some(outcome) = self.peek(key).await {
            return Ok(outcome);
        }

        let wait = async {
            let slot = self.wait_for_slot(key, poll_interval).await;
            slot.wait().await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SignalError::Cancelled {
                stage: self.stage,
                key: key.to_string(),
            }),
            result = tokio::time::timeout_at(deadline, wait) => {
                result.map_err(|_| SignalError::Timeout {
                    stage: self.stage,
                    key: key.to_string(),
                })
            }
        }
    }

    async fn get(&self, key: &str) -> Option<Arc<Slot>> {
        self.slots.lock().await.get(key).cloned()
    }

    async fn wait_for_slot(&self, key: &str, poll_interval: Duration) -> Arc<Slot> {
        loop {
            // Register interest before checking so an insert between the
            // check and the select is not missed.
            let notified = self.created.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(slot) = self.get(key).await {
                return slot;
            }

            trace!(stage = %self.stage, key, "slot not created yet");
            tokio::select! {
                _ = &mut notified => {},
                _ = tokio::time::sleep(poll_interval) => {},
            }
        }
    }
}

/// One registry per stage.
pub struct Signals {
    build: SignalRegistry,
    run: SignalRegistry,
    verify: SignalRegistry,
    delete: SignalRegistry,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            build: SignalRegistry::new(Stage::Build),
            run: SignalRegistry::new(Stage::Run),
            verify: SignalRegistry::new(Stage::Verify),
            delete: SignalRegistry::new(Stage::Delete),
        }
    }

    pub fn registry(&self, stage: Stage) -> &SignalRegistry {
        match stage {
            Stage::Build => &self.build,
            Stage::Run => &self.run,
            Stage::Verify => &self.verify,
            Stage::Delete => &self.delete,
        }
    }

    pub async fn create_slot(&self, stage: Stage, key: &str) -> Result<SlotPublisher, SignalError> {
        self.registry(stage).create_slot(key).await
    }

    pub async fn publish(
        &self,
        stage: Stage,
        key: &str,
        outcome: StageOutcome,
    ) -> Result<(), SignalError> {
        self.registry(stage).publish(key, outcome).await
    }

    pub async fn await_result(
        &self,
        stage: Stage,
        key: &str,
        policy: &WaitPolicy,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome, SignalError> {
        self.registry(stage)
            .await_result(key, policy.poll_interval, deadline, cancel)
            .await
    }

    pub async fn peek(&self, stage: Stage, key: &str) -> Option<StageOutcome> {
        self.registry(stage).peek(key).await
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
