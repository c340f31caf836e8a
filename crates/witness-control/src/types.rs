//! Core types for witness-control.

use std::fmt;

use serde::{Deserialize, Serialize};
use witness_ledger::{Address, ContractAddress};

use crate::error::{ControlError, ControlResult};

/// Provisioning pipeline stage.
///
/// Stages only move forward. The numeric tags are the persisted encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing deployed yet.
    Init,
    /// Contract deployed and visible on the ledger.
    DeploySuccess,
    /// Contract owner set.
    ContractInit,
    /// Run configuration published. Terminal.
    ConfigRun,
}

impl Stage {
    /// Persisted numeric tag.
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::Init => 1,
            Self::DeploySuccess => 2,
            Self::ContractInit => 3,
            Self::ConfigRun => 4,
        }
    }

    /// Stage for a persisted tag.
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Init),
            2 => Some(Self::DeploySuccess),
            3 => Some(Self::ContractInit),
            4 => Some(Self::ConfigRun),
            _ => None,
        }
    }

    /// Get the stage name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DeploySuccess => "deploy_success",
            Self::ContractInit => "contract_init",
            Self::ConfigRun => "config_run",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "deploy_success" => Ok(Self::DeploySuccess),
            "contract_init" => Ok(Self::ContractInit),
            "config_run" => Ok(Self::ConfigRun),
            _ => Err(format!("unknown stage: {s}")),
        }
    }
}

/// The single persisted pipeline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Current stage.
    pub stage: Stage,
    /// Deployed contract address; empty only at [`Stage::Init`].
    pub contract_address: ContractAddress,
}

impl PipelineState {
    /// Fresh state with nothing deployed.
    #[must_use]
    pub fn init() -> Self {
        Self {
            stage: Stage::Init,
            contract_address: ContractAddress::default(),
        }
    }

    /// State at `stage` for a deployed contract.
    #[must_use]
    pub const fn new(stage: Stage, contract_address: ContractAddress) -> Self {
        Self {
            stage,
            contract_address,
        }
    }

    /// Whether the record satisfies the address invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stage == Stage::Init || !self.contract_address.is_empty()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::init()
    }
}

/// Operator-fixed settings, read from `config.fixed.json`.
///
/// Missing fields deserialize to zero or empty; completeness is checked when
/// the run configuration is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedConfig {
    /// Wallet file name.
    #[serde(rename = "walletname")]
    pub wallet_name: String,
    /// Ledger node RPC URL.
    #[serde(rename = "ontnode")]
    pub ledger_node: String,
    /// Base58 address of the signing account.
    #[serde(rename = "signeraddress")]
    pub signer_address: String,
    /// Port the witness runtime listens on.
    #[serde(rename = "serverport")]
    pub server_port: u16,
    /// Gas price for ledger transactions.
    #[serde(rename = "gasprice")]
    pub gas_price: u64,
    /// Cache lifetime in seconds.
    #[serde(rename = "cachetime")]
    pub cache_time: u32,
    /// Items per batch.
    #[serde(rename = "batchnum")]
    pub batch_num: u32,
    /// Seconds between ledger retries.
    #[serde(rename = "trychaininterval")]
    pub try_chain_interval: u32,
    /// Seconds between transaction sends.
    #[serde(rename = "sendtxinterval")]
    pub send_tx_interval: u32,
    /// Transactions per send.
    #[serde(rename = "sendtxsize")]
    pub send_tx_size: u32,
    /// Pause between batch additions.
    #[serde(rename = "batchaddsleeptime")]
    pub batch_add_sleep_time: u32,
    /// Contract hex address; replaced by the deployed address on publish.
    #[serde(rename = "contracthexaddr")]
    pub contract_hex_addr: String,
    /// Operator-authorized addresses.
    #[serde(rename = "authorize")]
    pub authorize: Vec<String>,
}

/// Tenant witness settings, read from `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantWitnessConfig {
    /// Contract owner address.
    #[serde(rename = "owneraddr")]
    pub owner: String,
    /// Tenant-authorized addresses.
    #[serde(rename = "authaddr")]
    pub authorized: Vec<String>,
}

impl TenantWitnessConfig {
    /// Check that the owner and every authorized entry are valid addresses.
    pub fn validate(&self) -> ControlResult<()> {
        Address::from_base58(&self.owner)
            .map_err(|e| ControlError::config(format!("owneraddr {}: {e}", self.owner)))?;

        for entry in &self.authorized {
            Address::from_base58(entry)
                .map_err(|e| ControlError::config(format!("authaddr {entry}: {e}")))?;
        }
        Ok(())
    }
}

/// A validated tenant intake request, queued by value for callback delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    /// Hex-encoded public keys, in submission order. Never empty.
    pub auth_pub_keys: Vec<String>,
    /// Add-on identifier.
    pub addon_id: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Network name.
    pub net: String,
    /// Product line selecting the callback target.
    pub product: String,
}

impl IntakeRequest {
    /// Key reported as the owner in callbacks.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.auth_pub_keys.first().map(String::as_str)
    }
}
