//! Error types for witness-control.

use witness_ledger::{IdentityError, LedgerError};

/// Result type alias using [`ControlError`].
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in the control service.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// A caller supplied an invalid value. Reported back, never fatal.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// A contract already exists at the address derived from our artifact.
    #[error("contract already exists at {0}")]
    AddressCollision(String),

    /// The ledger stayed unreachable past a retry ceiling or timeout.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The pipeline state could not be persisted.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The run configuration is missing required values.
    #[error("run configuration incomplete: missing {}", .0.join(", "))]
    ConfigIncomplete(Vec<&'static str>),

    /// The callback queue is full.
    #[error("service overloaded: {0}")]
    Overloaded(String),

    /// Startup configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Contract artifact missing or unreadable.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Callback delivery error.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialisation error.
    #[error("serialisation error: {0}")]
    Serialisation(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Create a parameter error.
    #[must_use]
    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    /// Create a ledger unavailable error.
    #[must_use]
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::LedgerUnavailable(msg.into())
    }

    /// Create a persistence error.
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short uppercase name used in response envelopes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "PARAMETER ERROR",
            Self::AddressCollision(_) => "ADDRESS COLLISION",
            Self::LedgerUnavailable(_) => "LEDGER UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE FAILURE",
            Self::ConfigIncomplete(_) => "CONFIG INCOMPLETE",
            Self::Overloaded(_) => "SERVICE OVERLOADED",
            Self::Config(_) => "CONFIG ERROR",
            Self::Artifact(_) => "ARTIFACT ERROR",
            Self::Delivery(_) => "DELIVERY ERROR",
            Self::Database(_) => "DATABASE ERROR",
            Self::Io(_) => "IO ERROR",
            Self::Serialisation(_) => "SERIALISATION ERROR",
            Self::Http(_) => "HTTP ERROR",
            Self::Internal(_) => "INTERNAL ERROR",
        }
    }
}

impl From<LedgerError> for ControlError {
    fn from(err: LedgerError) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}

impl From<IdentityError> for ControlError {
    fn from(err: IdentityError) -> Self {
        Self::Parameter(err.to_string())
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialisation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_lists_fields() {
        let err = ControlError::ConfigIncomplete(vec!["gasprice", "authorize"]);
        assert_eq!(
            err.to_string(),
            "run configuration incomplete: missing gasprice, authorize"
        );
    }

    #[test]
    fn ledger_errors_become_unavailable() {
        let err: ControlError = LedgerError::unavailable("node down").into();
        assert!(matches!(err, ControlError::LedgerUnavailable(_)));
        assert_eq!(err.name(), "LEDGER UNAVAILABLE");
    }

    #[test]
    fn identity_errors_are_parameter_errors() {
        let err: ControlError = IdentityError::Checksum.into();
        assert!(matches!(err, ControlError::Parameter(_)));
    }
}
