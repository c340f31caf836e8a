//! Ledger gateway boundary for the witness control plane.
//!
//! The control plane never talks to ledger nodes or wallets directly. Every
//! ledger side effect goes through a [`LedgerGateway`]:
//!
//! - **Address derivation**: mapping a contract artifact to its deterministic
//!   on-ledger address
//! - **Deployment**: installing the artifact, signed by the operator's wallet
//! - **Transactions**: signing and broadcasting contract invocations
//! - **Confirmation**: waiting for the next block and querying contract state
//!
//! Two implementations are provided:
//!
//! - [`HttpLedgerGateway`] talks JSON to a gateway service that holds the
//!   wallet and a connection to a ledger node
//! - [`MockLedger`] is an in-memory ledger with scriptable failures, used in
//!   tests and dry runs
//!
//! Identity parsing for ledger addresses and public keys lives in
//! [`identity`].

#![forbid(unsafe_code)]

pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;
pub mod mock;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use gateway::LedgerGateway;
pub use http::HttpLedgerGateway;
pub use identity::{Address, IdentityError, KeyAlgorithm, PublicKey};
pub use mock::MockLedger;
pub use types::{
    Artifact, ContractAddress, ContractMetadata, GasParams, InvokeArg, InvokeTransaction,
    SignedTransaction, SignerIdentity,
};
