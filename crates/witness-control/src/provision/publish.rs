//! Assembly and publication of the run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use witness_ledger::ContractAddress;

use crate::authorize;
use crate::error::{ControlError, ControlResult};
use crate::types::{FixedConfig, TenantWitnessConfig};

/// The configuration handed to the witness runtime.
///
/// Same shape as [`FixedConfig`], with the deployed contract address and the
/// merged authorization set filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunConfig(FixedConfig);

impl RunConfig {
    /// Combine fixed settings, tenant settings and the deployed address.
    #[must_use]
    pub fn assemble(
        fixed: &FixedConfig,
        tenant: &TenantWitnessConfig,
        address: &ContractAddress,
    ) -> Self {
        let mut config = fixed.clone();
        config.contract_hex_addr = address.as_str().to_owned();
        config.authorize = authorize::merge(&fixed.authorize, &tenant.authorized);
        Self(config)
    }

    /// The assembled settings.
    #[must_use]
    pub const fn fields(&self) -> &FixedConfig {
        &self.0
    }

    /// Names of fields that are zero or empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let c = &self.0;
        let checks = [
            ("walletname", c.wallet_name.is_empty()),
            ("ontnode", c.ledger_node.is_empty()),
            ("signeraddress", c.signer_address.is_empty()),
            ("serverport", c.server_port == 0),
            ("gasprice", c.gas_price == 0),
            ("cachetime", c.cache_time == 0),
            ("batchnum", c.batch_num == 0),
            ("trychaininterval", c.try_chain_interval == 0),
            ("sendtxinterval", c.send_tx_interval == 0),
            ("sendtxsize", c.send_tx_size == 0),
            ("batchaddsleeptime", c.batch_add_sleep_time == 0),
            ("contracthexaddr", c.contract_hex_addr.is_empty()),
            ("authorize", c.authorize.is_empty()),
        ];

        checks
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect()
    }

    /// Fail with [`ControlError::ConfigIncomplete`] unless every field is set.
    pub fn validate(&self) -> ControlResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ControlError::ConfigIncomplete(missing))
        }
    }

    /// Validate, then write atomically to `path`.
    ///
    /// The document goes to a sibling temp file which is synced and renamed
    /// over `path`, so readers never see a partial write. A failed write
    /// leaves no temp file behind.
    pub async fn write_to(&self, path: &Path) -> ControlResult<()> {
        self.validate()?;

        let body = serde_json::to_vec_pretty(&self.0)?;
        let tmp = path.with_extension("json.tmp");

        if let Err(e) = replace_with(&tmp, path, &body).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                debug!(path = %tmp.display(), error = %cleanup, "temp file not removed");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

async fn replace_with(tmp: &Path, path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, path).await
}
