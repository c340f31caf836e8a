//! In-memory ledger for tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, LedgerResult};
use crate::gateway::LedgerGateway;
use crate::types::{
    Artifact, ContractAddress, ContractMetadata, GasParams, InvokeTransaction, SignedTransaction,
    SignerIdentity,
};

#[derive(Debug, Default)]
struct MockState {
    contracts: HashSet<String>,
    /// Deployed contracts not yet visible, with the number of queries left
    /// that still report them missing.
    pending: HashMap<String, u32>,
    visibility_delay: u32,
    deploy_error: Option<String>,
    query_failures: u32,
    submit_failures: u32,
    submit_rejections: u32,
    confirmation_failures: u32,
    submitted: Vec<SignedTransaction>,
    deploy_calls: u32,
    query_calls: u32,
    sign_calls: u32,
    submit_calls: u32,
    confirmation_calls: u32,
}

/// Scriptable in-memory ledger.
///
/// Contract addresses are the first 20 bytes of the artifact's SHA-256, hex
/// encoded. Failure injection methods make the next `n` calls of a kind fail
/// with a transient error; [`MockLedger::reject_submits`] fails them
/// permanently.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the mock assigns to `artifact`.
    #[must_use]
    pub fn address_for(artifact: &Artifact) -> ContractAddress {
        let digest = Sha256::digest(artifact.code());
        ContractAddress::new(hex::encode(&digest[..20]))
    }

    /// Pre-populate a contract at `address`.
    #[must_use]
    pub fn with_contract(self, address: &ContractAddress) -> Self {
        self.state.lock().contracts.insert(address.as_str().to_owned());
        self
    }

    /// Fail the next `n` contract queries.
    pub fn fail_queries(&self, n: u32) {
        self.state.lock().query_failures = n;
    }

    /// Fail the next `n` transaction submissions.
    pub fn fail_submits(&self, n: u32) {
        self.state.lock().submit_failures = n;
    }

    /// Refuse the next `n` transaction submissions outright.
    pub fn reject_submits(&self, n: u32) {
        self.state.lock().submit_rejections = n;
    }

    /// Time out the next `n` confirmation waits.
    pub fn fail_confirmations(&self, n: u32) {
        self.state.lock().confirmation_failures = n;
    }

    /// Reject every deployment with `msg`.
    pub fn fail_deploy(&self, msg: impl Into<String>) {
        self.state.lock().deploy_error = Some(msg.into());
    }

    /// Report newly deployed contracts missing for `n` queries.
    pub fn set_visibility_delay(&self, n: u32) {
        self.state.lock().visibility_delay = n;
    }

    /// Whether `address` is visible on the ledger.
    #[must_use]
    pub fn has_contract(&self, address: &ContractAddress) -> bool {
        self.state.lock().contracts.contains(address.as_str())
    }

    /// Transactions accepted for broadcast, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().submitted.clone()
    }

    /// Number of deployment attempts.
    #[must_use]
    pub fn deploy_calls(&self) -> u32 {
        self.state.lock().deploy_calls
    }

    /// Number of contract queries.
    #[must_use]
    pub fn query_calls(&self) -> u32 {
        self.state.lock().query_calls
    }

    /// Number of signing requests.
    #[must_use]
    pub fn sign_calls(&self) -> u32 {
        self.state.lock().sign_calls
    }

    /// Number of submission attempts.
    #[must_use]
    pub fn submit_calls(&self) -> u32 {
        self.state.lock().submit_calls
    }

    /// Number of confirmation waits.
    #[must_use]
    pub fn confirmation_calls(&self) -> u32 {
        self.state.lock().confirmation_calls
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn derive_address(&self, artifact: &Artifact) -> LedgerResult<ContractAddress> {
        Ok(Self::address_for(artifact))
    }

    async fn query_contract(&self, address: &ContractAddress) -> LedgerResult<bool> {
        let mut state = self.state.lock();
        state.query_calls += 1;

        if state.query_failures > 0 {
            state.query_failures -= 1;
            return Err(LedgerError::unavailable("mock query failure"));
        }

        if let Some(remaining) = state.pending.get_mut(address.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
            state.pending.remove(address.as_str());
            state.contracts.insert(address.as_str().to_owned());
        }

        Ok(state.contracts.contains(address.as_str()))
    }

    async fn deploy_artifact(
        &self,
        artifact: &Artifact,
        _gas: GasParams,
        _metadata: &ContractMetadata,
        _signer: &SignerIdentity,
    ) -> LedgerResult<()> {
        let mut state = self.state.lock();
        state.deploy_calls += 1;

        if let Some(msg) = &state.deploy_error {
            return Err(LedgerError::rejected(msg.clone()));
        }

        let address = Self::address_for(artifact).as_str().to_owned();
        if state.visibility_delay == 0 {
            state.contracts.insert(address);
        } else {
            let delay = state.visibility_delay;
            state.pending.insert(address, delay);
        }
        Ok(())
    }

    async fn sign_transaction(
        &self,
        tx: &InvokeTransaction,
        _signer: &SignerIdentity,
    ) -> LedgerResult<SignedTransaction> {
        self.state.lock().sign_calls += 1;

        let raw = serde_json::to_vec(tx).map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        Ok(SignedTransaction {
            hash: hex::encode(Sha256::digest(&raw)),
            raw: hex::encode(raw),
        })
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> LedgerResult<()> {
        let mut state = self.state.lock();
        state.submit_calls += 1;

        if state.submit_rejections > 0 {
            state.submit_rejections -= 1;
            return Err(LedgerError::rejected("mock submit rejected"));
        }
        if state.submit_failures > 0 {
            state.submit_failures -= 1;
            return Err(LedgerError::unavailable("mock submit failure"));
        }

        state.submitted.push(tx.clone());
        Ok(())
    }

    async fn wait_for_confirmation(&self, timeout: Duration) -> LedgerResult<()> {
        let mut state = self.state.lock();
        state.confirmation_calls += 1;

        if state.confirmation_failures > 0 {
            state.confirmation_failures -= 1;
            return Err(LedgerError::Timeout(timeout));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::InvokeArg;

    fn signer() -> SignerIdentity {
        SignerIdentity {
            wallet: "wallet.dat".to_owned(),
            address: "AKx4cgRtpjyS6xDfMeVEnoHnoUBjaAMA2e".to_owned(),
        }
    }

    const GAS: GasParams = GasParams {
        price: 500,
        limit: 200_000_000,
    };

    #[tokio::test]
    async fn deploy_then_query() {
        let ledger = MockLedger::new();
        let artifact = Artifact::from_bytes(b"contract".to_vec());
        let address = ledger.derive_address(&artifact).await.unwrap();
        assert_eq!(address.as_str().len(), 40);

        assert!(!ledger.query_contract(&address).await.unwrap());
        ledger
            .deploy_artifact(&artifact, GAS, &ContractMetadata::default(), &signer())
            .await
            .unwrap();
        assert!(ledger.query_contract(&address).await.unwrap());
        assert_eq!(ledger.deploy_calls(), 1);
        assert_eq!(ledger.query_calls(), 2);
    }

    #[tokio::test]
    async fn visibility_delay_hides_fresh_deployments() {
        let ledger = MockLedger::new();
        ledger.set_visibility_delay(2);
        let artifact = Artifact::from_bytes(b"contract".to_vec());
        let address = MockLedger::address_for(&artifact);

        ledger
            .deploy_artifact(&artifact, GAS, &ContractMetadata::default(), &signer())
            .await
            .unwrap();

        assert!(!ledger.query_contract(&address).await.unwrap());
        assert!(!ledger.query_contract(&address).await.unwrap());
        assert!(ledger.query_contract(&address).await.unwrap());
        assert!(ledger.has_contract(&address));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let ledger = MockLedger::new();
        ledger.fail_queries(1);
        ledger.fail_submits(1);
        ledger.fail_confirmations(1);
        let address = ContractAddress::new("ab");

        assert!(ledger.query_contract(&address).await.is_err());
        assert!(!ledger.query_contract(&address).await.unwrap());

        let tx = InvokeTransaction {
            contract: address,
            method: "set_owner".to_owned(),
            args: vec![InvokeArg::Address(signer().address)],
            gas: GAS,
        };
        let signed = ledger.sign_transaction(&tx, &signer()).await.unwrap();
        assert!(ledger.submit_transaction(&signed).await.is_err());
        ledger.submit_transaction(&signed).await.unwrap();
        assert_eq!(ledger.submitted(), vec![signed]);

        let timeout = Duration::from_secs(30);
        assert!(matches!(
            ledger.wait_for_confirmation(timeout).await,
            Err(LedgerError::Timeout(_))
        ));
        ledger.wait_for_confirmation(timeout).await.unwrap();
        assert_eq!(ledger.confirmation_calls(), 2);
    }

    #[tokio::test]
    async fn rejected_deploy_leaves_no_contract() {
        let ledger = MockLedger::new();
        ledger.fail_deploy("insufficient balance");
        let artifact = Artifact::from_bytes(b"contract".to_vec());

        let err = ledger
            .deploy_artifact(&artifact, GAS, &ContractMetadata::default(), &signer())
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(!ledger.has_contract(&MockLedger::address_for(&artifact)));
    }
}
