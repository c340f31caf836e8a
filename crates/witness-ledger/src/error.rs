//! Error types for witness-ledger.

use std::time::Duration;

/// Result type alias using [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by a ledger gateway.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The gateway or the ledger behind it could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The request reached the ledger but was refused.
    #[error("ledger rejected request: {0}")]
    Rejected(String),

    /// A bounded wait elapsed before the ledger confirmed anything.
    #[error("no confirmation within {}s", .0.as_secs())]
    Timeout(Duration),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a body we could not interpret.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a rejection error.
    #[must_use]
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Timeout(_) | Self::Http(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(LedgerError::unavailable("rpc down").is_transient());
        assert!(LedgerError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(!LedgerError::rejected("insufficient gas").is_transient());
        assert!(!LedgerError::InvalidResponse("bad json".to_owned()).is_transient());
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = LedgerError::Timeout(Duration::from_secs(500));
        assert_eq!(err.to_string(), "no confirmation within 500s");
    }
}
