// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Document-store contract between the engine and whatever keeps
//! the documents.
//!
//! Implementations: [`ElasticStore`](crate::storage::elastic::ElasticStore)
//! (REST over HTTP) and [`MemoryStore`](crate::storage::memory::MemoryStore)
//! (in-process).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures reported by a document store. Converted to
/// [`StoreError`](crate::error::StoreError) before leaving the engine.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("document {id} already exists in {collection}")]
    Conflict { collection: String, id: String },

    #[error("collection '{0}' does not exist")]
    MissingCollection(String),

    #[error("cannot decode response: {0}")]
    Decode(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A stored document: backend id plus JSON source.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub source: Value,
}

/// Per-item result counts of a bulk request. The batch is not all-or-nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create `collection` if missing. Returns `true` if this call created it.
    async fn ensure_collection(&self, collection: &str) -> BackendResult<bool>;

    /// Write a document, readable by id once this returns. Searches may not
    /// see it yet. The backend assigns an id when `id` is `None`.
    async fn put(&self, collection: &str, id: Option<&str>, doc: &Value) -> BackendResult<String>;

    /// Write a document only if `id` is unused; otherwise [`BackendError::Conflict`].
    /// Visible to searches once this returns.
    async fn create(&self, collection: &str, id: &str, doc: &Value) -> BackendResult<String>;

    async fn get_by_id(&self, collection: &str, id: &str) -> BackendResult<Option<Document>>;

    /// Exact match on a keyword field (or membership, for array fields).
    async fn search_by_term(&self, collection: &str, field: &str, value: &str) -> BackendResult<Vec<Document>>;

    /// Every document, in an order that is stable for unchanged data.
    async fn search_all(&self, collection: &str) -> BackendResult<Vec<Document>>;

    /// Ids of every document, without sources.
    async fn list_ids(&self, collection: &str) -> BackendResult<Vec<String>>;

    /// Deletes are visible to searches once this returns.
    async fn bulk_delete(&self, collection: &str, ids: &[String]) -> BackendResult<BulkOutcome>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_by_id(&self, collection: &str, id: &str) -> BackendResult<bool>;
}
