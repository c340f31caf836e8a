//! HTTP client for a ledger gateway service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::gateway::LedgerGateway;
use crate::types::{
    Artifact, ContractAddress, ContractMetadata, GasParams, InvokeTransaction, SignedTransaction,
    SignerIdentity,
};

/// Slack added on top of a confirmation wait so the HTTP call outlives it.
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct DeriveRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct DeriveResponse {
    address: String,
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Serialize)]
struct DeployRequest<'a> {
    code: &'a str,
    gas_price: u64,
    gas_limit: u64,
    signer: &'a SignerIdentity,
    metadata: &'a ContractMetadata,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    transaction: &'a InvokeTransaction,
    signer: &'a SignerIdentity,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    raw: &'a str,
}

#[derive(Serialize)]
struct WaitRequest {
    timeout_secs: u64,
}

/// HTTP client for a gateway that fronts a ledger node and the wallet.
#[derive(Debug, Clone)]
pub struct HttpLedgerGateway {
    client: Client,
    base_url: String,
}

impl HttpLedgerGateway {
    /// Create a client for the gateway at `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> LedgerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: Response, action: &str) -> LedgerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(action, status = %status, body = %body, "ledger gateway returned error");
        if status.is_client_error() {
            Err(LedgerError::rejected(format!("{action}: {status} {body}")))
        } else {
            Err(LedgerError::unavailable(format!("{action}: {status} {body}")))
        }
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn derive_address(&self, artifact: &Artifact) -> LedgerResult<ContractAddress> {
        let url = format!("{}/v1/contracts/address", self.base_url);
        let code = artifact.code_hex();
        let response = self
            .client
            .post(&url)
            .json(&DeriveRequest { code: &code })
            .send()
            .await?;

        let body: DeriveResponse = Self::check(response, "derive address")
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        Ok(ContractAddress::new(body.address))
    }

    async fn query_contract(&self, address: &ContractAddress) -> LedgerResult<bool> {
        let url = format!("{}/v1/contracts/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let body: ExistsResponse = Self::check(response, "query contract")
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        Ok(body.exists)
    }

    async fn deploy_artifact(
        &self,
        artifact: &Artifact,
        gas: GasParams,
        metadata: &ContractMetadata,
        signer: &SignerIdentity,
    ) -> LedgerResult<()> {
        let url = format!("{}/v1/contracts", self.base_url);
        let code = artifact.code_hex();
        let request = DeployRequest {
            code: &code,
            gas_price: gas.price,
            gas_limit: gas.limit,
            signer,
            metadata,
        };
        let response = self.client.post(&url).json(&request).send().await?;

        Self::check(response, "deploy artifact").await?;
        debug!(bytes = artifact.len(), gas_limit = gas.limit, "artifact deployment accepted");
        Ok(())
    }

    async fn sign_transaction(
        &self,
        tx: &InvokeTransaction,
        signer: &SignerIdentity,
    ) -> LedgerResult<SignedTransaction> {
        let url = format!("{}/v1/transactions/sign", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SignRequest {
                transaction: tx,
                signer,
            })
            .send()
            .await?;

        Self::check(response, "sign transaction")
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> LedgerResult<()> {
        let url = format!("{}/v1/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SubmitRequest { raw: &tx.raw })
            .send()
            .await?;

        Self::check(response, "submit transaction").await?;
        debug!(tx = %tx.hash, "transaction submitted");
        Ok(())
    }

    async fn wait_for_confirmation(&self, timeout: Duration) -> LedgerResult<()> {
        let url = format!("{}/v1/blocks/wait", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(timeout + WAIT_SLACK)
            .json(&WaitRequest {
                timeout_secs: timeout.as_secs(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::REQUEST_TIMEOUT {
            return Err(LedgerError::Timeout(timeout));
        }

        Self::check(response, "wait for block").await?;
        Ok(())
    }
}
