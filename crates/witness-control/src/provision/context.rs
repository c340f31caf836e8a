//! Immutable inputs to the provisioning pipeline.

use std::path::PathBuf;

use tracing::info;
use witness_ledger::{Address, Artifact, ContractMetadata, GasParams, SignerIdentity};

use crate::config::{self, ControlConfig, ProvisioningConfig};
use crate::error::{ControlError, ControlResult};
use crate::types::{FixedConfig, TenantWitnessConfig};

/// Everything the pipeline reads, loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    /// Operator-fixed settings.
    pub fixed: FixedConfig,
    /// Tenant witness settings.
    pub tenant: TenantWitnessConfig,
    /// Compiled contract.
    pub artifact: Artifact,
    /// Account that signs deployments and invocations.
    pub signer: SignerIdentity,
    /// Metadata recorded with the deployment.
    pub metadata: ContractMetadata,
    /// Gas limits, timeouts and retry policies.
    pub tuning: ProvisioningConfig,
    /// Where the run configuration is published.
    pub run_config_path: PathBuf,
}

impl ProvisionContext {
    /// Load and validate every input named by `config`.
    pub async fn load(config: &ControlConfig) -> ControlResult<Self> {
        let paths = &config.paths;

        let fixed = config::load_fixed_config(&paths.fixed_config)?;
        let tenant = config::load_tenant_config(&paths.tenant_config_path())?;
        tenant.validate()?;

        let artifact_path = paths.artifact_path();
        let code = tokio::fs::read(&artifact_path).await.map_err(|e| {
            ControlError::Artifact(format!("{}: {e}", artifact_path.display()))
        })?;

        let context = Self::new(
            fixed,
            tenant,
            Artifact::from_bytes(code),
            config.provisioning.clone(),
            paths.run_config_path(),
        )?;

        info!(
            artifact = %artifact_path.display(),
            content_hash = context.artifact.content_hash(),
            signer = %context.signer.address,
            "provisioning inputs loaded"
        );
        Ok(context)
    }

    /// Build a context from already-loaded inputs.
    pub fn new(
        fixed: FixedConfig,
        tenant: TenantWitnessConfig,
        artifact: Artifact,
        tuning: ProvisioningConfig,
        run_config_path: PathBuf,
    ) -> ControlResult<Self> {
        if artifact.is_empty() {
            return Err(ControlError::Artifact("contract artifact is empty".to_owned()));
        }

        Address::from_base58(&fixed.signer_address).map_err(|e| {
            ControlError::config(format!("signeraddress {}: {e}", fixed.signer_address))
        })?;

        let signer = SignerIdentity {
            wallet: fixed.wallet_name.clone(),
            address: fixed.signer_address.clone(),
        };

        Ok(Self {
            fixed,
            tenant,
            artifact,
            signer,
            metadata: ContractMetadata::default(),
            tuning,
            run_config_path,
        })
    }

    /// Gas settings for the deployment.
    #[must_use]
    pub const fn deploy_gas(&self) -> GasParams {
        GasParams {
            price: self.fixed.gas_price,
            limit: self.tuning.deploy_gas_limit,
        }
    }

    /// Gas settings for the owner initialization.
    #[must_use]
    pub const fn invoke_gas(&self) -> GasParams {
        GasParams {
            price: self.fixed.gas_price,
            limit: self.tuning.invoke_gas_limit,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixed(signer: &str) -> FixedConfig {
        FixedConfig {
            wallet_name: "wallet.dat".to_owned(),
            signer_address: signer.to_owned(),
            gas_price: 500,
            ..FixedConfig::default()
        }
    }

    #[test]
    fn gas_params_combine_price_and_limits() {
        let signer = Address::from_hash([4; 20]).to_base58();
        let ctx = ProvisionContext::new(
            fixed(&signer),
            TenantWitnessConfig::default(),
            Artifact::from_bytes(vec![1, 2, 3]),
            ProvisioningConfig::default(),
            PathBuf::from("/tmp/config.run.json"),
        )
        .unwrap();

        assert_eq!(ctx.signer.address, signer);
        assert_eq!(ctx.deploy_gas(), GasParams { price: 500, limit: 200_000_000 });
        assert_eq!(ctx.invoke_gas(), GasParams { price: 500, limit: 8_000_000 });
    }

    #[test]
    fn invalid_signer_is_config_error() {
        let err = ProvisionContext::new(
            fixed("not-an-address"),
            TenantWitnessConfig::default(),
            Artifact::from_bytes(vec![1]),
            ProvisioningConfig::default(),
            PathBuf::from("/tmp/config.run.json"),
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let signer = Address::from_hash([4; 20]).to_base58();
        let err = ProvisionContext::new(
            fixed(&signer),
            TenantWitnessConfig::default(),
            Artifact::from_bytes(Vec::new()),
            ProvisioningConfig::default(),
            PathBuf::from("/tmp/config.run.json"),
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::Artifact(_)));
    }
}
