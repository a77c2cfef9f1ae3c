//! Domain-level error taxonomy for ODAVL.

/// ODAVL domain errors.
#[derive(Debug, thiserror::Error)]
pub enum OdavlError {
    #[error("no adapter registered for the {protocol} protocol; bootstrap the registry first")]
    AdapterNotRegistered { protocol: String },

    #[error("{protocol} adapter failed: {message}")]
    AdapterExecutionFailed { protocol: String, message: String },

    #[error("baseline not found: {name}")]
    BaselineNotFound { name: String },

    #[error("baseline '{name}' is corrupt: {reason}")]
    BaselineCorrupt { name: String, reason: String },

    #[error("invalid baseline name: {0:?}")]
    InvalidBaselineName(String),

    #[error("memory file {path} is corrupt: {reason}")]
    MemoryFileCorrupt { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OdavlError {
    pub fn adapter_not_registered(protocol: &str) -> Self {
        Self::AdapterNotRegistered {
            protocol: protocol.to_string(),
        }
    }

    /// Wrap a collaborator failure. The full `anyhow` context chain is kept.
    pub fn adapter_failed(protocol: &str, err: &anyhow::Error) -> Self {
        Self::AdapterExecutionFailed {
            protocol: protocol.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Whether the caller can reasonably continue after this error.
    ///
    /// Missing baselines and a damaged learning store are recoverable;
    /// adapter failures, corrupt baselines and I/O errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BaselineNotFound { .. } | Self::MemoryFileCorrupt { .. }
        )
    }
}

/// Result type for ODAVL domain operations.
pub type Result<T> = std::result::Result<T, OdavlError>;
