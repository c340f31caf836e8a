//! Configuration for witness-control.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Json, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::dispatch::BackpressurePolicy;
use crate::error::{ControlError, ControlResult};
use crate::provision::RetryPolicy;
use crate::types::{FixedConfig, TenantWitnessConfig};

/// Top-level configuration for the control service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ControlConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Ledger gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provisioning pipeline tuning.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Tenant intake configuration.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Callback dispatcher configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl ControlConfig {
    /// Load configuration from a specific TOML file.
    ///
    /// Sources, later overriding earlier:
    /// 1. Default values
    /// 2. The TOML file (if present)
    /// 3. Environment variables with `WITNESS_CONTROL_` prefix
    pub fn from_file(path: impl AsRef<Path>) -> ControlResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("WITNESS_CONTROL_").split("__"))
            .extract()
            .map_err(|e| ControlError::Config(e.to_string()))
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

const fn default_max_body_bytes() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Holds the published run configuration and the state database.
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,

    /// Holds the tenant's `config.json`.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Holds the compiled `contract.wasm`.
    #[serde(default = "default_contract_dir")]
    pub contract_dir: PathBuf,

    /// Operator-fixed settings.
    #[serde(default = "default_fixed_config")]
    pub fixed_config: PathBuf,
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/appconfig")
}

fn default_contract_dir() -> PathBuf {
    PathBuf::from("/wasm")
}

fn default_fixed_config() -> PathBuf {
    PathBuf::from("config.fixed.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
            config_dir: default_config_dir(),
            contract_dir: default_contract_dir(),
            fixed_config: default_fixed_config(),
        }
    }
}

impl PathsConfig {
    /// Published run configuration.
    #[must_use]
    pub fn run_config_path(&self) -> PathBuf {
        self.run_dir.join("config.run.json")
    }

    /// `SQLite` database holding the pipeline state.
    #[must_use]
    pub fn state_db_path(&self) -> PathBuf {
        self.run_dir.join("configstate.db")
    }

    /// Tenant witness settings.
    #[must_use]
    pub fn tenant_config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Contract artifact.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.contract_dir.join("contract.wasm")
    }
}

/// Ledger gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway implementation.
    #[serde(default)]
    pub kind: GatewayKind,

    /// Gateway base URL. Falls back to the fixed config's ledger node.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_gateway_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::default(),
            url: None,
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

/// Type of ledger gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// HTTP gateway service.
    #[default]
    Http,

    /// In-memory ledger for dry runs.
    Mock,
}

/// Provisioning pipeline tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    /// Gas limit for the deployment transaction.
    #[serde(default = "default_deploy_gas_limit")]
    pub deploy_gas_limit: u64,

    /// Gas limit for the owner initialization call.
    #[serde(default = "default_invoke_gas_limit")]
    pub invoke_gas_limit: u64,

    /// Wait for a block after deploying, in seconds.
    #[serde(default = "default_deploy_confirmation_timeout_secs")]
    pub deploy_confirmation_timeout_secs: u64,

    /// Wait for a block after initialization, in seconds.
    #[serde(default = "default_init_confirmation_timeout_secs")]
    pub init_confirmation_timeout_secs: u64,

    /// Address occupancy check before deploying.
    #[serde(default = "default_collision_check")]
    pub collision_check: RetryPolicy,

    /// Existence polling after deploying.
    #[serde(default = "default_deploy_visibility")]
    pub deploy_visibility: RetryPolicy,

    /// Existence re-check before initializing.
    #[serde(default = "default_reverify")]
    pub reverify: RetryPolicy,

    /// Initialization transaction submission.
    #[serde(default = "default_init_submit")]
    pub init_submit: RetryPolicy,
}

const fn default_deploy_gas_limit() -> u64 {
    200_000_000
}

const fn default_invoke_gas_limit() -> u64 {
    8_000_000
}

const fn default_deploy_confirmation_timeout_secs() -> u64 {
    500
}

const fn default_init_confirmation_timeout_secs() -> u64 {
    30
}

const fn default_collision_check() -> RetryPolicy {
    RetryPolicy::new(2000, 3)
}

const fn default_deploy_visibility() -> RetryPolicy {
    RetryPolicy::new(2000, 100)
}

const fn default_reverify() -> RetryPolicy {
    RetryPolicy::new(2000, 3)
}

const fn default_init_submit() -> RetryPolicy {
    RetryPolicy::new(3000, 1000)
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            deploy_gas_limit: default_deploy_gas_limit(),
            invoke_gas_limit: default_invoke_gas_limit(),
            deploy_confirmation_timeout_secs: default_deploy_confirmation_timeout_secs(),
            init_confirmation_timeout_secs: default_init_confirmation_timeout_secs(),
            collision_check: default_collision_check(),
            deploy_visibility: default_deploy_visibility(),
            reverify: default_reverify(),
            init_submit: default_init_submit(),
        }
    }
}

impl ProvisioningConfig {
    /// Post-deploy confirmation wait.
    #[must_use]
    pub const fn deploy_confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_confirmation_timeout_secs)
    }

    /// Post-initialization confirmation wait.
    #[must_use]
    pub const fn init_confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.init_confirmation_timeout_secs)
    }
}

/// Tenant intake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    /// SDK download location returned to tenants.
    #[serde(default = "default_sdk_url")]
    pub sdk_url: String,

    /// Known networks and the endpoint tenants connect to on each.
    #[serde(default = "default_networks")]
    pub networks: HashMap<String, String>,
}

fn default_sdk_url() -> String {
    "https://github.com/leej1012/witness-java-sdk".to_owned()
}

fn default_networks() -> HashMap<String, String> {
    HashMap::from([
        (
            "test".to_owned(),
            "http://107.150.112.175:2020/addon/attestation".to_owned(),
        ),
        (
            "main".to_owned(),
            "http://52.68.40.224:2020/addon/attestation".to_owned(),
        ),
    ])
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            sdk_url: default_sdk_url(),
            networks: default_networks(),
        }
    }
}

/// Callback dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Queue capacity.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Pause before each delivery, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Behaviour when the queue is full.
    #[serde(default)]
    pub backpressure: BackpressurePolicy,

    /// Callback request timeout in seconds.
    #[serde(default = "default_callback_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification for callback targets.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Owner-change callback URL per product.
    #[serde(default = "default_callbacks")]
    pub callbacks: HashMap<String, String>,
}

const fn default_capacity() -> usize {
    10
}

const fn default_delay_ms() -> u64 {
    10_000
}

const fn default_callback_timeout_secs() -> u64 {
    15
}

fn default_callbacks() -> HashMap<String, String> {
    HashMap::from([
        (
            "test".to_owned(),
            "http://test.microservice.ont.io/addon-server/api/v1/app/owner/change".to_owned(),
        ),
        (
            "main".to_owned(),
            "https://prod.microservice.ont.io/addon-server/api/v1/app/owner/change".to_owned(),
        ),
    ])
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            delay_ms: default_delay_ms(),
            backpressure: BackpressurePolicy::default(),
            timeout_secs: default_callback_timeout_secs(),
            accept_invalid_certs: false,
            callbacks: default_callbacks(),
        }
    }
}

impl DispatcherConfig {
    /// Pause before each delivery.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Load the operator-fixed settings.
pub fn load_fixed_config(path: &Path) -> ControlResult<FixedConfig> {
    load_json(path)
}

/// Load the tenant witness settings.
pub fn load_tenant_config(path: &Path) -> ControlResult<TenantWitnessConfig> {
    load_json(path)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> ControlResult<T> {
    if !path.is_file() {
        return Err(ControlError::config(format!(
            "{} not found",
            path.display()
        )));
    }

    Figment::from(Json::file(path))
        .extract()
        .map_err(|e| ControlError::config(format!("{}: {e}", path.display())))
}
