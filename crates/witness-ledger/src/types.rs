//! Core types shared across the gateway boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex address of a deployed contract.
///
/// Empty before a contract has been deployed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

impl ContractAddress {
    /// Create a new contract address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no address has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContractAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A compiled contract ready for deployment.
///
/// The artifact is content-addressed: its identity is the SHA-256 of the code.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    code: Vec<u8>,
    content_hash: String,
}

impl Artifact {
    /// Wrap compiled contract bytes.
    #[must_use]
    pub fn from_bytes(code: Vec<u8>) -> Self {
        let content_hash = hex::encode(Sha256::digest(&code));
        Self { code, content_hash }
    }

    /// Raw contract code.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Contract code as lowercase hex, the form ledger nodes accept.
    #[must_use]
    pub fn code_hex(&self) -> String {
        hex::encode(&self.code)
    }

    /// Hex SHA-256 of the code.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Size of the code in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the artifact has no code at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.code.len())
            .field("content_hash", &self.content_hash)
            .finish()
    }
}

/// Wallet account that signs on behalf of the operator.
///
/// Key material never leaves the gateway; only the wallet name and account
/// address cross the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerIdentity {
    /// Wallet file or keystore name known to the gateway.
    pub wallet: String,
    /// Base58 address of the signing account.
    pub address: String,
}

/// Gas settings for a deployment or invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParams {
    /// Price per unit of gas.
    pub price: u64,
    /// Maximum gas the transaction may consume.
    pub limit: u64,
}

/// Descriptive metadata recorded with a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    /// Contract name.
    pub name: String,
    /// Contract version.
    pub version: String,
    /// Author name.
    pub author: String,
    /// Author contact.
    pub email: String,
    /// Free-form description.
    pub description: String,
}

impl Default for ContractMetadata {
    fn default() -> Self {
        Self {
            name: "witness contract".to_owned(),
            version: "1.0".to_owned(),
            author: "author".to_owned(),
            email: "email".to_owned(),
            description: "desc".to_owned(),
        }
    }
}

/// A typed argument to a contract method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InvokeArg {
    /// A base58 account address.
    Address(String),
    /// A UTF-8 string.
    String(String),
    /// A signed integer.
    Integer(i64),
}

/// An unsigned contract invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTransaction {
    /// Contract being invoked.
    pub contract: ContractAddress,
    /// Method name.
    pub method: String,
    /// Method arguments, in order.
    pub args: Vec<InvokeArg>,
    /// Gas settings.
    pub gas: GasParams,
}

/// A transaction signed by the gateway's wallet, ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Transaction hash.
    pub hash: String,
    /// Serialized signed transaction, hex encoded.
    pub raw: String,
}
