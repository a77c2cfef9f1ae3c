//! Error types for the memory subsystem.

use std::path::Path;

use crate::domain::OdavlError;

/// Errors produced by memory operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("memory file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("invalid memory config: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoryError {
    pub(crate) fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<MemoryError> for OdavlError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Corrupt { path, reason } => OdavlError::MemoryFileCorrupt { path, reason },
            MemoryError::InvalidConfig(msg) => OdavlError::InvalidConfig(msg),
            MemoryError::Serialization(e) => OdavlError::Serialization(e),
            MemoryError::Io(e) => OdavlError::Io(e),
        }
    }
}

/// Result type for memory operations.
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_maps_to_memory_file_corrupt() {
        let err: OdavlError = MemoryError::corrupt(Path::new("/ws/p.json"), "eof").into();
        assert!(err.is_recoverable());
        assert!(matches!(err, OdavlError::MemoryFileCorrupt { .. }));
        assert!(err.to_string().contains("/ws/p.json"));
    }
}
