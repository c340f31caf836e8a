//! Witness Control Plane
//!
//! Provisions a tenant's witness contract on the ledger, publishes the run
//! configuration for the witness runtime, and accepts tenant configuration
//! over HTTP.
//!
//! # Architecture
//!
//! - **Provisioning**: a restart-safe pipeline that deploys the contract,
//!   initializes its owner and publishes `config.run.json`, persisting its
//!   stage after each confirmed step
//! - **State storage**: a single durable record in `SQLite`
//! - **Intake API**: validates tenant key submissions and returns connection
//!   details without waiting on downstream calls
//! - **Callback dispatch**: a bounded queue drained by one worker that
//!   notifies the owner-change service, best effort
//!
//! # State Machine
//!
//! The pipeline only moves forward, and the typestate pattern makes skipping
//! a stage a compile error:
//!
//! ```text
//! Init ──▶ DeploySuccess ──▶ ContractInit ──▶ ConfigRun
//! ```
//!
//! # Example
//!
//! ```ignore
//! use witness_control::{Init, Pipeline};
//! use witness_ledger::ContractAddress;
//!
//! let deployed = Pipeline::<Init>::new().deployed(ContractAddress::new("c0ffee"));
//! let published = deployed.initialized().published();
//!
//! // This would not compile:
//! // let invalid = published.deployed(ContractAddress::new("beef"));
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod authorize;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod provision;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::ControlConfig;
pub use dispatch::{BackpressurePolicy, CallbackDispatcher, CallbackWorker};
pub use error::{ControlError, ControlResult};
pub use provision::{ProvisionContext, ProvisionManager, RetryPolicy, RunConfig};
pub use service::ControlService;
pub use state::{AnyPipeline, ConfigRun, ContractInit, DeploySuccess, Init, Pipeline};
pub use store::{MemoryStore, SqliteStore, StateStore};
pub use types::{FixedConfig, IntakeRequest, PipelineState, Stage, TenantWitnessConfig};
