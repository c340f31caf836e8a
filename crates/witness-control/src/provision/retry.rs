//! Bounded fixed-interval retries around ledger calls.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use witness_ledger::{ContractAddress, LedgerError, LedgerGateway, SignedTransaction};

use crate::error::{ControlError, ControlResult};

/// How often and how many times to try a ledger call.
///
/// A call that fails `n` times and then succeeds completes if and only if
/// `n < max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Pause between attempts, in milliseconds.
    pub interval_ms: u64,
    /// Total attempts before giving up.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts,
        }
    }

    /// Pause between attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Outcome of a single attempt.
pub(crate) enum Attempt<T> {
    /// Finished; stop retrying.
    Done(T),
    /// Failed transiently; try again if attempts remain.
    Retry(String),
    /// Failed definitively; stop retrying.
    Fatal(ControlError),
}

/// Run `op` until it finishes or the policy is exhausted.
///
/// Exhaustion is reported as [`ControlError::LedgerUnavailable`].
pub(crate) async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    action: &str,
    mut op: F,
) -> ControlResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut last_failure = String::from("no attempts made");

    for attempt in 1..=policy.max_attempts {
        match op().await {
            Attempt::Done(value) => {
                debug!(action, attempt, "ledger call succeeded");
                return Ok(value);
            }
            Attempt::Fatal(e) => return Err(e),
            Attempt::Retry(reason) => {
                warn!(
                    action,
                    attempt,
                    max = policy.max_attempts,
                    reason = %reason,
                    "ledger call failed"
                );
                last_failure = reason;
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    Err(ControlError::ledger(format!(
        "{action} gave up after {} attempts: {last_failure}",
        policy.max_attempts
    )))
}

/// Retry transient ledger failures; stop on anything else.
fn classify<T>(err: LedgerError) -> Attempt<T> {
    if err.is_transient() {
        Attempt::Retry(err.to_string())
    } else {
        Attempt::Fatal(err.into())
    }
}

/// Confirm nothing is deployed at `address` yet.
///
/// Transient query errors are retried; a definitive "exists" is an address
/// collision.
pub async fn ensure_unoccupied(
    gateway: &dyn LedgerGateway,
    address: &ContractAddress,
    policy: RetryPolicy,
) -> ControlResult<()> {
    with_retry(policy, "collision check", move || async move {
        match gateway.query_contract(address).await {
            Ok(false) => Attempt::Done(()),
            Ok(true) => Attempt::Fatal(ControlError::AddressCollision(address.to_string())),
            Err(e) => classify(e),
        }
    })
    .await
}

/// Poll until a contract is visible at `address`.
///
/// Both transient query errors and "not found" count as failed attempts.
pub async fn wait_until_visible(
    gateway: &dyn LedgerGateway,
    address: &ContractAddress,
    policy: RetryPolicy,
    action: &str,
) -> ControlResult<()> {
    with_retry(policy, action, move || async move {
        match gateway.query_contract(address).await {
            Ok(true) => Attempt::Done(()),
            Ok(false) => Attempt::Retry(format!("contract {address} not found")),
            Err(e) => classify(e),
        }
    })
    .await
}

/// Submit a signed transaction until the ledger accepts it.
///
/// A rejection is final; resubmitting the same bytes cannot change it.
pub async fn submit_until_accepted(
    gateway: &dyn LedgerGateway,
    tx: &SignedTransaction,
    policy: RetryPolicy,
) -> ControlResult<()> {
    with_retry(policy, "submit transaction", move || async move {
        match gateway.submit_transaction(tx).await {
            Ok(()) => Attempt::Done(()),
            Err(e) => classify(e),
        }
    })
    .await
}
