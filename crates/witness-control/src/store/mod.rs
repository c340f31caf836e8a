//! Pipeline state storage backends.
//!
//! The pipeline keeps exactly one record under [`codec::STATE_KEY`]. The
//! durable implementation uses `SQLite`; an in-memory implementation is
//! provided for testing.

pub mod codec;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::error::{ControlError, ControlResult};
use crate::types::PipelineState;

/// Storage for the pipeline record.
///
/// Backends move raw bytes; encoding and the fresh-start fallback live in the
/// provided methods.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the raw record, if one exists.
    async fn read_record(&self) -> ControlResult<Option<Bytes>>;

    /// Replace the raw record.
    async fn write_record(&self, record: Bytes) -> ControlResult<()>;

    /// Load the pipeline state.
    ///
    /// A missing, unreadable or undecodable record yields a fresh
    /// [`PipelineState::init`]. This is the only place a read failure is
    /// treated as a fresh start.
    async fn load(&self) -> PipelineState {
        let raw = match self.read_record().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return PipelineState::init(),
            Err(e) => {
                warn!(error = %e, "state record unreadable, starting fresh");
                return PipelineState::init();
            }
        };

        match codec::decode_state(&raw) {
            Ok(state) if state.is_consistent() => state,
            Ok(state) => {
                warn!(stage = %state.stage, "state record has no contract address, starting fresh");
                PipelineState::init()
            }
            Err(e) => {
                warn!(error = %e, "state record undecodable, starting fresh");
                PipelineState::init()
            }
        }
    }

    /// Persist the pipeline state.
    async fn save(&self, state: &PipelineState) -> ControlResult<()> {
        self.write_record(codec::encode_state(state))
            .await
            .map_err(|e| match e {
                ControlError::Persistence(_) => e,
                other => ControlError::persistence(other.to_string()),
            })
    }
}
