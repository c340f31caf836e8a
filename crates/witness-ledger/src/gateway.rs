//! The gateway trait every ledger backend implements.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LedgerResult;
use crate::types::{
    Artifact, ContractAddress, ContractMetadata, GasParams, InvokeTransaction, SignedTransaction,
    SignerIdentity,
};

/// Abstraction over a ledger node plus the operator's wallet.
///
/// Implementations must be safe to share across tasks. None of the methods
/// retry internally; retry policy belongs to the caller.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Deterministic address the artifact would occupy once deployed.
    async fn derive_address(&self, artifact: &Artifact) -> LedgerResult<ContractAddress>;

    /// Whether a contract currently exists at `address`.
    async fn query_contract(&self, address: &ContractAddress) -> LedgerResult<bool>;

    /// Submit a deployment of `artifact`, signed by `signer`.
    ///
    /// Returns once the deployment transaction has been accepted for
    /// broadcast, not when it is included in a block.
    async fn deploy_artifact(
        &self,
        artifact: &Artifact,
        gas: GasParams,
        metadata: &ContractMetadata,
        signer: &SignerIdentity,
    ) -> LedgerResult<()>;

    /// Sign an invocation with the signer's wallet.
    async fn sign_transaction(
        &self,
        tx: &InvokeTransaction,
        signer: &SignerIdentity,
    ) -> LedgerResult<SignedTransaction>;

    /// Broadcast a signed transaction.
    async fn submit_transaction(&self, tx: &SignedTransaction) -> LedgerResult<()>;

    /// Block until the ledger produces a new block or `timeout` elapses.
    async fn wait_for_confirmation(&self, timeout: Duration) -> LedgerResult<()>;
}
