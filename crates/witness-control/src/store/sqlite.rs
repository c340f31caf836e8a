//! `SQLite` state store implementation.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::Row;

use crate::error::ControlResult;

use super::codec::STATE_KEY;
use super::StateStore;

/// `SQLite`-backed state store.
///
/// Writes are synchronous (`synchronous = FULL`) so an acknowledged save
/// survives a crash.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    ///
    /// The required table is created if it doesn't exist.
    pub async fn open(path: impl AsRef<Path>) -> ControlResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> ControlResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS server_state (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn read_record(&self) -> ControlResult<Option<Bytes>> {
        let row = sqlx::query("SELECT value FROM server_state WHERE key = ?")
            .bind(&STATE_KEY[..])
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: Vec<u8> = row.try_get("value")?;
                Ok(Some(Bytes::from(value)))
            }
            None => Ok(None),
        }
    }

    async fn write_record(&self, record: Bytes) -> ControlResult<()> {
        sqlx::query(
            r"
            INSERT INTO server_state (key, value) VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(&STATE_KEY[..])
        .bind(&record[..])
        .execute(&self.pool)
        .await?;

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
    #[case(Stage::DeploySuccess, "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678")]
    #[case(Stage::ContractInit, "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678")]
    #[case(Stage::ConfigRun, "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678")]
    #[tokio::test]
    async fn survives_reopen(#[case] stage: Stage, #[case] address: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configstate.db");
        let state = PipelineState::new(stage, ContractAddress::new(address));

        let store = SqliteStore::open(&path).await.unwrap();
        store.save(&state).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.load().await, state);
    }

    #[tokio::test]
    async fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("configstate.db"))
            .await
            .unwrap();
        let address = ContractAddress::new("ab");

        store
            .save(&PipelineState::new(Stage::DeploySuccess, address.clone()))
            .await
            .unwrap();
        store
            .save(&PipelineState::new(Stage::ContractInit, address.clone()))
            .await
            .unwrap();

        assert_eq!(
            store.load().await,
            PipelineState::new(Stage::ContractInit, address)
        );
    }

    #[tokio::test]
    async fn fresh_database_loads_init() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("configstate.db"))
            .await
            .unwrap();
        assert_eq!(store.load().await, PipelineState::init());
    }
}
