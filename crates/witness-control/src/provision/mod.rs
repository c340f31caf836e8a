//! Contract provisioning: deploy, initialize, publish.
//!
//! The pipeline resumes from whatever stage was last persisted, so a restart
//! at any point repeats at most the step that was in flight. Each ledger call
//! is bounded by a per-site [`RetryPolicy`] or an explicit timeout.

mod context;
mod manager;
mod publish;
mod retry;

pub use context::ProvisionContext;
pub use manager::ProvisionManager;
pub use publish::RunConfig;
pub use retry::{ensure_unoccupied, submit_until_accepted, wait_until_visible, RetryPolicy};
