//! Error types for redirector.

use thiserror::Error;

use crate::rule::RuleId;

/// Error type for redirector operations.
///
/// Every variant is cheap to clone so that the outcome of one
/// synchronization pass can be handed to every caller it covered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Reading the configuration store failed
    #[error("failed to read configuration: {0}")]
    StoreRead(#[source] StoreError),

    /// Writing the configuration store failed
    #[error("failed to write configuration: {0}")]
    StoreWrite(#[source] StoreError),

    /// Listing or removing the active rules failed; nothing was installed
    #[error("failed to clear {rules} active rules: {source}")]
    EnforcementClear {
        rules: usize,
        #[source]
        source: EngineError,
    },

    /// Installing a batch of rules failed; earlier batches stay installed
    #[error("failed to install rule batch {batch}/{batches} (first rule id {first_rule_id}): {source}")]
    EnforcementInstall {
        batch: usize,
        batches: usize,
        first_rule_id: RuleId,
        #[source]
        source: EngineError,
    },

    /// Input rejected before it reached the rule engine
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Domain already present in the blocked list
    #[error("domain already blocked: {0}")]
    DuplicateDomain(String),

    /// Domain not present in the blocked list
    #[error("domain not blocked: {0}")]
    UnknownDomain(String),

    /// The watcher dispatch loop is no longer running
    #[error("watcher stopped")]
    WatcherStopped,
}

/// Result type alias for redirector operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<DomainError> for Error {
    fn from(e: DomainError) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

/// Error type for configuration store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored document is not a JSON object
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// A value has the wrong shape for its key
    #[error("invalid value for key {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// Error type for rule engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// More rules in one call than the engine accepts
    #[error("{requested} rules exceed the per-call limit of {limit}")]
    LimitExceeded { limit: usize, requested: usize },

    /// Rule id already active or repeated within the call
    #[error("rule id {0} is not unique")]
    DuplicateId(RuleId),

    /// Engine could not be reached or persisted
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Unavailable(e.to_string())
    }
}

/// Error type for domain parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Nothing left after normalization
    #[error("empty domain")]
    Empty,

    /// Not a hostname
    #[error("invalid domain (must be a hostname): {0}")]
    InvalidHostname(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_error_names_batch() {
        let err = Error::EnforcementInstall {
            batch: 2,
            batches: 3,
            first_rule_id: 130,
            source: EngineError::LimitExceeded {
                limit: 10,
                requested: 50,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("2/3"));
        assert!(msg.contains("130"));
    }

    #[test]
    fn test_domain_error_is_invalid_input() {
        let err: Error = DomainError::Empty.into();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
