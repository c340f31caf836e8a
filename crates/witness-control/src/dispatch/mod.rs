//! Bounded callback queue between the intake API and the delivery worker.
//!
//! Intake handlers enqueue a copy of each validated request and return
//! immediately. A single [`CallbackWorker`] drains the queue in FIFO order.
//! When the queue is full, the [`BackpressurePolicy`] decides whether the
//! producer waits or is turned away.

mod worker;

pub use worker::{CallbackPayload, CallbackSink, CallbackWorker, HttpCallbackSink};

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ControlError, ControlResult};
use crate::types::IntakeRequest;

/// What to do when the callback queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Wait for the worker to free a slot.
    Block,

    /// Fail the request with [`ControlError::Overloaded`].
    #[default]
    Reject,
}

/// Producer handle for the callback queue.
#[derive(Debug, Clone)]
pub struct CallbackDispatcher {
    tx: mpsc::Sender<IntakeRequest>,
    policy: BackpressurePolicy,
}

impl CallbackDispatcher {
    /// Create a queue holding up to `capacity` requests.
    ///
    /// Returns the producer handle and the receiver for the worker.
    #[must_use]
    pub fn channel(
        capacity: usize,
        policy: BackpressurePolicy,
    ) -> (Self, mpsc::Receiver<IntakeRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, policy }, rx)
    }

    /// The configured full-queue behaviour.
    #[must_use]
    pub const fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Queue a request for callback delivery.
    pub async fn enqueue(&self, request: IntakeRequest) -> ControlResult<()> {
        let tenant_id = request.tenant_id.clone();

        match self.policy {
            BackpressurePolicy::Block => self
                .tx
                .send(request)
                .await
                .map_err(|_| ControlError::internal("callback worker stopped"))?,
            BackpressurePolicy::Reject => self.tx.try_send(request).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    ControlError::Overloaded("callback queue is full".to_owned())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    ControlError::internal("callback worker stopped")
                }
            })?,
        }

        debug!(tenant_id = %tenant_id, "callback queued");
        Ok(())
    }
}
