//! Resumable provisioning pipeline.

use std::sync::Arc;

use tracing::{info, warn};
use witness_ledger::{ContractAddress, InvokeArg, InvokeTransaction, LedgerGateway};

use crate::error::{ControlError, ControlResult};
use crate::state::{
    AnyPipeline, ConfigRun, ContractInit, DeploySuccess, Init, Pipeline, PipelineStage,
};
use crate::store::StateStore;
use crate::types::PipelineState;

use super::context::ProvisionContext;
use super::publish::RunConfig;
use super::retry;

/// Method that hands contract ownership to the signer.
const INIT_METHOD: &str = "set_owner";

/// Drives the pipeline from its persisted stage to completion.
///
/// Every stage transition is persisted before the next stage starts, and
/// only after the ledger has independently confirmed the previous step.
pub struct ProvisionManager {
    ctx: Arc<ProvisionContext>,
    gateway: Arc<dyn LedgerGateway>,
    store: Arc<dyn StateStore>,
}

impl ProvisionManager {
    /// Create a new provision manager.
    pub fn new(
        ctx: Arc<ProvisionContext>,
        gateway: Arc<dyn LedgerGateway>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            ctx,
            gateway,
            store,
        }
    }

    /// Resume from the persisted stage and run to completion.
    ///
    /// Safe to call repeatedly: a completed pipeline only republishes the run
    /// configuration and never touches the ledger.
    pub async fn resume(&self) -> ControlResult<PipelineState> {
        let mut pipeline = AnyPipeline::from_persisted(self.store.load().await)?;
        info!(
            stage = %pipeline.stage(),
            address = %pipeline.address(),
            ledger_work = !pipeline.is_terminal(),
            "resuming provisioning"
        );

        loop {
            pipeline = match pipeline {
                AnyPipeline::Init(p) => self.deploy(p).await?.into(),
                AnyPipeline::DeploySuccess(p) => self.initialize(p).await?.into(),
                AnyPipeline::ContractInit(p) => self.publish(p).await?.into(),
                AnyPipeline::ConfigRun(p) => {
                    self.republish(&p).await?;
                    return Ok(p.state());
                }
            };
        }
    }

    async fn deploy(&self, pipeline: Pipeline<Init>) -> ControlResult<Pipeline<DeploySuccess>> {
        let ctx = &self.ctx;
        let tuning = &ctx.tuning;
        let gateway = self.gateway.as_ref();

        let address = gateway.derive_address(&ctx.artifact).await?;
        info!(
            address = %address,
            content_hash = ctx.artifact.content_hash(),
            "derived contract address"
        );

        retry::ensure_unoccupied(gateway, &address, tuning.collision_check).await?;

        gateway
            .deploy_artifact(&ctx.artifact, ctx.deploy_gas(), &ctx.metadata, &ctx.signer)
            .await
            .map_err(|e| ControlError::ledger(format!("deploy failed: {e}")))?;
        info!(address = %address, "deployment submitted");

        let timeout = tuning.deploy_confirmation_timeout();
        if let Err(e) = gateway.wait_for_confirmation(timeout).await {
            warn!(error = %e, "no block within deploy confirmation window, polling for contract");
        }

        retry::wait_until_visible(
            gateway,
            &address,
            tuning.deploy_visibility,
            "deploy visibility",
        )
        .await?;

        let next = pipeline.deployed(address);
        self.persist(&next).await?;
        info!(address = %next.address(), "contract deployed");
        Ok(next)
    }

    async fn initialize(
        &self,
        pipeline: Pipeline<DeploySuccess>,
    ) -> ControlResult<Pipeline<ContractInit>> {
        let ctx = &self.ctx;
        let tuning = &ctx.tuning;
        let gateway = self.gateway.as_ref();
        let address = pipeline.address();

        retry::wait_until_visible(gateway, address, tuning.reverify, "contract re-verify").await?;

        let tx = InvokeTransaction {
            contract: address.clone(),
            method: INIT_METHOD.to_owned(),
            args: vec![InvokeArg::Address(ctx.signer.address.clone())],
            gas: ctx.invoke_gas(),
        };
        let signed = gateway.sign_transaction(&tx, &ctx.signer).await?;
        info!(address = %address, tx = %signed.hash, "owner initialization signed");

        retry::submit_until_accepted(gateway, &signed, tuning.init_submit).await?;

        gateway
            .wait_for_confirmation(tuning.init_confirmation_timeout())
            .await
            .map_err(|e| ControlError::ledger(format!("initialization not confirmed: {e}")))?;

        let next = pipeline.initialized();
        self.persist(&next).await?;
        info!(address = %next.address(), "contract initialized");
        Ok(next)
    }

    async fn publish(
        &self,
        pipeline: Pipeline<ContractInit>,
    ) -> ControlResult<Pipeline<ConfigRun>> {
        self.write_run_config(pipeline.address()).await?;

        let next = pipeline.published();
        self.persist(&next).await?;
        info!(path = %self.ctx.run_config_path.display(), "run configuration published");
        Ok(next)
    }

    async fn republish(&self, pipeline: &Pipeline<ConfigRun>) -> ControlResult<()> {
        self.write_run_config(pipeline.address()).await?;
        info!(path = %self.ctx.run_config_path.display(), "run configuration refreshed");
        Ok(())
    }

    async fn write_run_config(&self, address: &ContractAddress) -> ControlResult<()> {
        let run = RunConfig::assemble(&self.ctx.fixed, &self.ctx.tenant, address);
        run.write_to(&self.ctx.run_config_path).await
    }

    async fn persist<S: PipelineStage>(&self, pipeline: &Pipeline<S>) -> ControlResult<()> {
        self.store.save(&pipeline.state()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use witness_ledger::{Address, Artifact, MockLedger};

    use super::*;
    use crate::config::ProvisioningConfig;
    use crate::provision::RetryPolicy;
    use crate::store::MemoryStore;
    use crate::types::{FixedConfig, Stage, TenantWitnessConfig};

    fn fast_tuning() -> ProvisioningConfig {
        ProvisioningConfig {
            collision_check: RetryPolicy::new(1, 3),
            deploy_visibility: RetryPolicy::new(1, 5),
            reverify: RetryPolicy::new(1, 3),
            init_submit: RetryPolicy::new(1, 5),
            ..ProvisioningConfig::default()
        }
    }

    fn context(run_config_path: PathBuf) -> Arc<ProvisionContext> {
        let fixed = FixedConfig {
            wallet_name: "wallet.dat".to_owned(),
            ledger_node: "http://127.0.0.1:20336".to_owned(),
            signer_address: Address::from_hash([1; 20]).to_base58(),
            server_port: 8080,
            gas_price: 500,
            cache_time: 60,
            batch_num: 100,
            try_chain_interval: 3,
            send_tx_interval: 5,
            send_tx_size: 10,
            batch_add_sleep_time: 1,
            contract_hex_addr: String::new(),
            authorize: vec![Address::from_hash([2; 20]).to_base58()],
        };
        let tenant = TenantWitnessConfig {
            owner: Address::from_hash([3; 20]).to_base58(),
            authorized: vec![Address::from_hash([4; 20]).to_base58()],
        };
        Arc::new(
            ProvisionContext::new(
                fixed,
                tenant,
                Artifact::from_bytes(b"\0asm witness contract".to_vec()),
                fast_tuning(),
                run_config_path,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn fresh_pipeline_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path().join("config.run.json"));
        let ledger = Arc::new(MockLedger::new());
        let store = Arc::new(MemoryStore::new());

        let manager = ProvisionManager::new(ctx.clone(), ledger.clone(), store.clone());
        let state = manager.resume().await.unwrap();

        let address = MockLedger::address_for(&ctx.artifact);
        assert_eq!(state, PipelineState::new(Stage::ConfigRun, address.clone()));
        assert_eq!(store.load().await, state);
        assert_eq!(store.writes(), 3);
        assert_eq!(ledger.deploy_calls(), 1);
        assert_eq!(ledger.submitted().len(), 1);
        assert!(ctx.run_config_path.exists());
    }

    #[tokio::test]
    async fn completed_pipeline_never_touches_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path().join("config.run.json"));
        let ledger = Arc::new(MockLedger::new());
        let store = Arc::new(MemoryStore::new());
        let address = ContractAddress::new("c0ffee");
        store
            .save(&PipelineState::new(Stage::ConfigRun, address.clone()))
            .await
            .unwrap();

        let manager = ProvisionManager::new(ctx.clone(), ledger.clone(), store.clone());
        manager.resume().await.unwrap();

        assert_eq!(ledger.query_calls(), 0);
        assert_eq!(ledger.deploy_calls(), 0);
        assert_eq!(ledger.sign_calls(), 0);
        assert_eq!(store.writes(), 1);
        let written = std::fs::read_to_string(&ctx.run_config_path).unwrap();
        assert!(written.contains("c0ffee"));
    }
}
