// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! In-process document store.
//!
//! Collections are ordered maps keyed by document id, so iteration order is
//! deterministic for identical contents. Cloning the store yields another
//! handle to the same data.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::storage::backend::{BackendError, BackendResult, BulkOutcome, Document, DocumentStore};

type Collection = BTreeMap<String, Value>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection` (0 if it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, |c| c.len())
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Overwrite or remove a document behind the engine's back.
    pub fn raw_set(&self, collection: &str, id: &str, doc: Option<Value>) {
        let mut cols = self.collections.write();
        let col = cols.entry(collection.to_string()).or_default();
        match doc {
            Some(v) => {
                col.insert(id.to_string(), v);
            }
            None => {
                col.remove(id);
            }
        }
    }

    pub fn raw_get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections.read().get(collection)?.get(id).cloned()
    }

    fn with_collection<T>(&self, collection: &str, f: impl FnOnce(&Collection) -> T) -> BackendResult<T> {
        let cols = self.collections.read();
        let col = cols
            .get(collection)
            .ok_or_else(|| BackendError::MissingCollection(collection.to_string()))?;
        Ok(f(col))
    }

    fn with_collection_mut<T>(&self, collection: &str, f: impl FnOnce(&mut Collection) -> T) -> BackendResult<T> {
        let mut cols = self.collections.write();
        let col = cols
            .get_mut(collection)
            .ok_or_else(|| BackendError::MissingCollection(collection.to_string()))?;
        Ok(f(col))
    }
}

fn term_matches(doc: &Value, field: &str, value: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str) -> BackendResult<bool> {
        let mut cols = self.collections.write();
        if cols.contains_key(collection) {
            return Ok(false);
        }
        cols.insert(collection.to_string(), Collection::new());
        Ok(true)
    }

    async fn put(&self, collection: &str, id: Option<&str>, doc: &Value) -> BackendResult<String> {
        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        self.with_collection_mut(collection, |col| {
            col.insert(id.clone(), doc.clone());
        })?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, doc: &Value) -> BackendResult<String> {
        self.with_collection_mut(collection, |col| {
            if col.contains_key(id) {
                return Err(BackendError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            col.insert(id.to_string(), doc.clone());
            Ok(id.to_string())
        })?
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> BackendResult<Option<Document>> {
        self.with_collection(collection, |col| {
            col.get(id).map(|source| Document { id: id.to_string(), source: source.clone() })
        })
    }

    async fn search_by_term(&self, collection: &str, field: &str, value: &str) -> BackendResult<Vec<Document>> {
        self.with_collection(collection, |col| {
            col.iter()
                .filter(|(_, doc)| term_matches(doc, field, value))
                .map(|(id, doc)| Document { id: id.clone(), source: doc.clone() })
                .collect()
        })
    }

    async fn search_all(&self, collection: &str) -> BackendResult<Vec<Document>> {
        self.with_collection(collection, |col| {
            col.iter()
                .map(|(id, doc)| Document { id: id.clone(), source: doc.clone() })
                .collect()
        })
    }

    async fn list_ids(&self, collection: &str) -> BackendResult<Vec<String>> {
        self.with_collection(collection, |col| col.keys().cloned().collect())
    }

    async fn bulk_delete(&self, collection: &str, ids: &[String]) -> BackendResult<BulkOutcome> {
        self.with_collection_mut(collection, |col| {
            let mut outcome = BulkOutcome::default();
            for id in ids {
                if col.remove(id).is_some() {
                    outcome.succeeded += 1;
                } else {
                    outcome.failed += 1;
                }
            }
            outcome
        })
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> BackendResult<bool> {
        self.with_collection_mut(collection, |col| col.remove(id).is_some())
    }
}
