//! Error types for the transfer tracker

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the transfer tracker
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Recovery action errors
    #[error("User cancelled the signature request")]
    UserCancelled,

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Message not found on-chain: {0}")]
    NotFound(String),

    #[error("Action not applicable for transfer {id}: {reason}")]
    ActionNotApplicable { id: String, reason: String },

    #[error("Action already in flight for transfer {0}")]
    ActionInFlight(String),

    #[error("Wrong chain connected: expected {expected}, connected to {connected}")]
    WrongChain { expected: u64, connected: u64 },

    #[error("Retry window expired for transfer {0}")]
    RetryWindowExpired(String),

    // Feed errors
    #[error("Indexer unavailable for class {class}: {reason}")]
    IndexerUnavailable { class: String, reason: String },

    #[error("Page request is stale (address or provider changed mid-flight)")]
    StaleRequest,

    // Computation errors
    #[error("Duration computed against out-of-date chain constants: {0}")]
    StaleComputation(String),

    #[error("Unknown chain id: {0}")]
    UnknownChain(u64),

    // Store errors
    #[error("Overlay persistence failed: {0}")]
    StorePersistence(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error came from the user rejecting a wallet signature.
    /// These are swallowed by recovery actions: no state change, no surfaced error.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Error::UserCancelled)
    }

    /// Check if this error is scoped to a single transfer.
    /// Transfer-scoped errors must never fail a whole page.
    pub fn is_transfer_scoped(&self) -> bool {
        matches!(
            self,
            Error::SubmissionFailed(_)
                | Error::NotFound(_)
                | Error::ActionNotApplicable { .. }
                | Error::ActionInFlight(_)
                | Error::WrongChain { .. }
                | Error::RetryWindowExpired(_)
        )
    }

    /// Check if this error is scoped to a single page/class of the feed
    pub fn is_page_scoped(&self) -> bool {
        matches!(self, Error::IndexerUnavailable { .. } | Error::StaleRequest)
    }

    /// Check if the action that produced this error can be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::SubmissionFailed(_)
                | Error::ActionInFlight(_)
                | Error::WrongChain { .. }
                | Error::IndexerUnavailable { .. }
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_scoping() {
        assert!(Error::NotFound("msg".to_string()).is_transfer_scoped());
        assert!(!Error::NotFound("msg".to_string()).is_page_scoped());
        assert!(Error::IndexerUnavailable {
            class: "deposit_sent".to_string(),
            reason: "timeout".to_string()
        }
        .is_page_scoped());
        assert!(Error::UserCancelled.is_user_cancelled());
        assert!(!Error::UserCancelled.is_retryable());
    }
}
