//! Common test utilities for witness-control integration tests.

#![allow(dead_code)]

pub mod fixtures;

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use witness_control::config::{GatewayKind, ProvisioningConfig};
use witness_control::{
    ControlConfig, FixedConfig, ProvisionContext, ProvisionManager, StateStore,
    TenantWitnessConfig,
};
use witness_ledger::LedgerGateway;

/// Contract bytes written to every test workspace.
pub const CONTRACT: &[u8] = b"\0asm\x01\0\0\0witness contract";

/// A temporary run/config/contract directory layout with inputs in place.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub config: ControlConfig,
}

impl TestWorkspace {
    /// Creates a workspace with complete fixed and tenant settings.
    pub fn new() -> Self {
        Self::with_inputs(&fixtures::complete_fixed(), &fixtures::tenant())
    }

    /// Creates a workspace with the given settings.
    pub fn with_inputs(fixed: &FixedConfig, tenant: &TenantWitnessConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        for sub in ["run", "config", "contract"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }

        let mut config = ControlConfig::default();
        config.paths.run_dir = root.join("run");
        config.paths.config_dir = root.join("config");
        config.paths.contract_dir = root.join("contract");
        config.paths.fixed_config = root.join("config.fixed.json");
        config.gateway.kind = GatewayKind::Mock;
        config.provisioning = fixtures::fast_tuning();

        std::fs::write(
            &config.paths.fixed_config,
            serde_json::to_vec_pretty(fixed).unwrap(),
        )
        .unwrap();
        std::fs::write(
            config.paths.tenant_config_path(),
            serde_json::to_vec_pretty(tenant).unwrap(),
        )
        .unwrap();
        std::fs::write(config.paths.artifact_path(), CONTRACT).unwrap();

        Self { dir, config }
    }

    /// Overrides the provisioning tuning.
    pub fn with_tuning(mut self, tuning: ProvisioningConfig) -> Self {
        self.config.provisioning = tuning;
        self
    }

    /// Loads the provisioning context from disk.
    pub async fn context(&self) -> Arc<ProvisionContext> {
        Arc::new(ProvisionContext::load(&self.config).await.unwrap())
    }

    /// Builds a provision manager over the given ledger and store.
    pub async fn manager(
        &self,
        ledger: Arc<dyn LedgerGateway>,
        store: Arc<dyn StateStore>,
    ) -> ProvisionManager {
        ProvisionManager::new(self.context().await, ledger, store)
    }

    /// Path of the published run configuration.
    pub fn run_config_path(&self) -> PathBuf {
        self.config.paths.run_config_path()
    }

    /// Parsed run configuration, if published.
    pub fn run_config(&self) -> Option<serde_json::Value> {
        let bytes = std::fs::read(self.run_config_path()).ok()?;
        Some(serde_json::from_slice(&bytes).unwrap())
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
