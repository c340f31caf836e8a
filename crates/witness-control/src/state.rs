//! Typestate pattern for the provisioning pipeline.
//!
//! Each stage is a marker type, so a step can only be taken from the stage
//! that precedes it. A pipeline loaded from storage is wrapped in
//! [`AnyPipeline`] until the stage is matched.
//!
//! # Example
//!
//! ```ignore
//! let init = Pipeline::<Init>::new();
//! let deployed = init.deployed(address);
//! let initialized = deployed.initialized();
//! let published = initialized.published();
//! // init.initialized() would not compile: the contract is not deployed yet
//! ```

use std::marker::PhantomData;

use witness_ledger::ContractAddress;

use crate::error::{ControlError, ControlResult};
use crate::types::{PipelineState, Stage};

/// Marker trait for pipeline stages.
pub trait PipelineStage: private::Sealed + Send + Sync {
    /// The persisted stage.
    fn stage() -> Stage;
}

mod private {
    pub trait Sealed {}
}

/// Nothing deployed yet.
#[derive(Debug, Clone, Copy)]
pub struct Init;

/// Contract deployed and visible.
#[derive(Debug, Clone, Copy)]
pub struct DeploySuccess;

/// Contract owner set.
#[derive(Debug, Clone, Copy)]
pub struct ContractInit;

/// Run configuration published.
#[derive(Debug, Clone, Copy)]
pub struct ConfigRun;

impl private::Sealed for Init {}
impl private::Sealed for DeploySuccess {}
impl private::Sealed for ContractInit {}
impl private::Sealed for ConfigRun {}

impl PipelineStage for Init {
    fn stage() -> Stage {
        Stage::Init
    }
}

impl PipelineStage for DeploySuccess {
    fn stage() -> Stage {
        Stage::DeploySuccess
    }
}

impl PipelineStage for ContractInit {
    fn stage() -> Stage {
        Stage::ContractInit
    }
}

impl PipelineStage for ConfigRun {
    fn stage() -> Stage {
        Stage::ConfigRun
    }
}

/// The pipeline at stage `S`.
#[derive(Debug)]
pub struct Pipeline<S: PipelineStage> {
    address: ContractAddress,
    _stage: PhantomData<S>,
}

impl<S: PipelineStage> Pipeline<S> {
    /// Deployed contract address; empty at [`Init`].
    #[must_use]
    pub const fn address(&self) -> &ContractAddress {
        &self.address
    }

    /// The record to persist for this stage.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState::new(S::stage(), self.address.clone())
    }

    fn transition<T: PipelineStage>(self) -> Pipeline<T> {
        Pipeline {
            address: self.address,
            _stage: PhantomData,
        }
    }
}

impl Pipeline<Init> {
    /// A fresh pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: ContractAddress::default(),
            _stage: PhantomData,
        }
    }

    /// The contract is deployed and visible at `address`.
    #[must_use]
    pub fn deployed(self, address: ContractAddress) -> Pipeline<DeploySuccess> {
        Pipeline {
            address,
            _stage: PhantomData,
        }
    }
}

impl Default for Pipeline<Init> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<DeploySuccess> {
    /// The owner initialization is confirmed.
    #[must_use]
    pub fn initialized(self) -> Pipeline<ContractInit> {
        self.transition()
    }
}

impl Pipeline<ContractInit> {
    /// The run configuration is written.
    #[must_use]
    pub fn published(self) -> Pipeline<ConfigRun> {
        self.transition()
    }
}

/// A pipeline in any stage, as loaded from storage.
#[derive(Debug)]
pub enum AnyPipeline {
    /// Pipeline at init.
    Init(Pipeline<Init>),
    /// Pipeline after deployment.
    DeploySuccess(Pipeline<DeploySuccess>),
    /// Pipeline after owner initialization.
    ContractInit(Pipeline<ContractInit>),
    /// Pipeline after publication.
    ConfigRun(Pipeline<ConfigRun>),
}

impl AnyPipeline {
    /// Rebuild a pipeline from its persisted record.
    ///
    /// Fails if a post-deployment stage carries no address.
    pub fn from_persisted(state: PipelineState) -> ControlResult<Self> {
        if !state.is_consistent() {
            return Err(ControlError::persistence(format!(
                "stage {} has no contract address",
                state.stage
            )));
        }

        let address = state.contract_address;
        Ok(match state.stage {
            Stage::Init => Self::Init(Pipeline::new()),
            Stage::DeploySuccess => Self::DeploySuccess(Pipeline {
                address,
                _stage: PhantomData,
            }),
            Stage::ContractInit => Self::ContractInit(Pipeline {
                address,
                _stage: PhantomData,
            }),
            Stage::ConfigRun => Self::ConfigRun(Pipeline {
                address,
                _stage: PhantomData,
            }),
        })
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Init(_) => Stage::Init,
            Self::DeploySuccess(_) => Stage::DeploySuccess,
            Self::ContractInit(_) => Stage::ContractInit,
            Self::ConfigRun(_) => Stage::ConfigRun,
        }
    }

    /// Deployed contract address; empty at init.
    #[must_use]
    pub const fn address(&self) -> &ContractAddress {
        match self {
            Self::Init(p) => p.address(),
            Self::DeploySuccess(p) => p.address(),
            Self::ContractInit(p) => p.address(),
            Self::ConfigRun(p) => p.address(),
        }
    }

    /// Whether the pipeline has nothing left to do on the ledger.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ConfigRun(_))
    }
}

impl From<Pipeline<DeploySuccess>> for AnyPipeline {
    fn from(p: Pipeline<DeploySuccess>) -> Self {
        Self::DeploySuccess(p)
    }
}

impl From<Pipeline<ContractInit>> for AnyPipeline {
    fn from(p: Pipeline<ContractInit>) -> Self {
        Self::ContractInit(p)
    }
}

impl From<Pipeline<ConfigRun>> for AnyPipeline {
    fn from(p: Pipeline<ConfigRun>) -> Self {
        Self::ConfigRun(p)
    }
}
