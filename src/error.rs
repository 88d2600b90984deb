// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use std::time::Duration;

use thiserror::Error;

use crate::storage::backend::BackendError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("File '{0}' not found")]
    NotFound(String),

    #[error("File '{filename}' references missing chunk {chunk_id}")]
    ChunkMissing { filename: String, chunk_id: String },

    #[error("Chunk {chunk_id} is corrupt: {reason}")]
    CorruptChunk { chunk_id: String, reason: String },

    #[error("File already exists: {0}")]
    DuplicateName(String),

    #[error("Cannot read source '{name}'")]
    SourceUnreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Chunk size must be between 1 and {max} bytes (got {0})",
        max = crate::storage::sizing::MAX_CHUNK_SIZE
    )]
    InvalidChunkSize(usize),

    #[error("Operation '{op}' timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}

impl From<BackendError> for StoreError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unreachable(msg) => StoreError::BackendUnreachable(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl StoreError {
    /// True for "nothing there" outcomes that are not process-level failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::ChunkMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_maps_to_backend_unreachable() {
        let err: StoreError = BackendError::Unreachable("connection refused".into()).into();
        assert!(matches!(err, StoreError::BackendUnreachable(ref m) if m == "connection refused"));
    }

    #[test]
    fn test_status_maps_to_backend() {
        let err: StoreError = BackendError::Status {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(StoreError::NotFound("a".into()).is_not_found());
        assert!(StoreError::ChunkMissing {
            filename: "a".into(),
            chunk_id: "c".into()
        }
        .is_not_found());
        assert!(!StoreError::DuplicateName("a".into()).is_not_found());
    }
}
