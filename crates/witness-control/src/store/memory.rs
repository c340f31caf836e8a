//! In-memory state store for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{ControlError, ControlResult};

use super::StateStore;

/// In-memory state store for testing.
///
/// Data is lost when the process exits. Reads and writes can be made to fail
/// to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<Bytes>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU32,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes as if a previous run had written them.
    pub fn insert_raw(&self, record: impl Into<Bytes>) {
        *self.record.lock() = Some(record.into());
    }

    /// Current raw record.
    #[must_use]
    pub fn raw(&self) -> Option<Bytes> {
        self.record.lock().clone()
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read_record(&self) -> ControlResult<Option<Bytes>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ControlError::persistence("injected read failure"));
        }
        Ok(self.record.lock().clone())
    }

    async fn write_record(&self, record: Bytes) -> ControlResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ControlError::persistence("injected write failure"));
        }
        *self.record.lock() = Some(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use witness_ledger::ContractAddress;

    use super::*;
    use crate::types::{PipelineState, Stage};

    #[rstest]
    #[case(Stage::Init, "")]
    #[case(Stage::DeploySuccess, "5f3e")]
    #[case(Stage::ContractInit, "5f3e")]
    #[case(Stage::ConfigRun, "5f3e")]
    #[tokio::test]
    async fn save_then_load(#[case] stage: Stage, #[case] address: &str) {
        let store = MemoryStore::new();
        let state = PipelineState::new(stage, ContractAddress::new(address));

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn empty_store_loads_init() {
        assert_eq!(MemoryStore::new().load().await, PipelineState::init());
    }

    #[tokio::test]
    async fn unreadable_store_loads_init() {
        let store = MemoryStore::new();
        store
            .save(&PipelineState::new(Stage::ConfigRun, ContractAddress::new("ab")))
            .await
            .unwrap();
        store.fail_reads(true);
        assert_eq!(store.load().await, PipelineState::init());
    }

    #[tokio::test]
    async fn garbage_loads_init() {
        let store = MemoryStore::new();
        store.insert_raw(vec![0xde, 0xad]);
        assert_eq!(store.load().await, PipelineState::init());
    }

    #[tokio::test]
    async fn addressless_record_loads_init() {
        let store = MemoryStore::new();
        store.insert_raw(vec![3, 0, 0, 0, 0]);
        assert_eq!(store.load().await, PipelineState::init());
    }

    #[tokio::test]
    async fn failed_save_is_persistence_error() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let err = store.save(&PipelineState::init()).await.unwrap_err();
        assert!(matches!(err, ControlError::Persistence(_)));
        assert!(store.raw().is_none());
    }
}
