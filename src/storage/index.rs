// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Typed access to the file metadata and chunk collections on top of
//! a [`DocumentStore`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{ChunkModel, FileModel};
use crate::storage::backend::{BackendError, BackendResult, BulkOutcome, Document, DocumentStore};

pub const FILENAME_FIELD: &str = "filename";

/// Collection names plus the store they live in.
pub struct Index<S> {
    store: S,
    files: String,
    chunks: String,
}

fn encode<T: serde::Serialize>(value: &T) -> BackendResult<Value> {
    serde_json::to_value(value).map_err(|e| BackendError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(doc: Document) -> BackendResult<(String, T)> {
    let parsed = serde_json::from_value(doc.source)
        .map_err(|e| BackendError::Decode(format!("document {}: {e}", doc.id)))?;
    Ok((doc.id, parsed))
}

fn decode_file(doc: Document) -> BackendResult<FileModel> {
    let (id, mut fm): (String, FileModel) = decode(doc)?;
    fm.id = id;
    Ok(fm)
}

impl<S: DocumentStore> Index<S> {
    pub fn new(store: S, files: impl Into<String>, chunks: impl Into<String>) -> Self {
        Self { store, files: files.into(), chunks: chunks.into() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn file_collection(&self) -> &str {
        &self.files
    }

    pub fn chunk_collection(&self) -> &str {
        &self.chunks
    }

    /// Create both collections if needed.
    pub async fn ensure_collections(&self) -> BackendResult<()> {
        self.store.ensure_collection(&self.files).await?;
        self.store.ensure_collection(&self.chunks).await?;
        Ok(())
    }

    /// Persist one chunk; returns the id the backend assigned.
    pub async fn put_chunk(&self, chunk: &ChunkModel) -> BackendResult<String> {
        self.store.put(&self.chunks, None, &encode(chunk)?).await
    }

    pub async fn get_chunk(&self, id: &str) -> BackendResult<Option<ChunkModel>> {
        match self.store.get_by_id(&self.chunks, id).await? {
            Some(doc) => {
                let (id, mut chunk): (String, ChunkModel) = decode(doc)?;
                chunk.id = id;
                Ok(Some(chunk))
            }
            None => Ok(None),
        }
    }

    /// Conditionally create a metadata document under `id`.
    pub async fn create_file(&self, id: &str, file: &FileModel) -> BackendResult<String> {
        self.store.create(&self.files, id, &encode(file)?).await
    }

    pub async fn find_files(&self, filename: &str) -> BackendResult<Vec<FileModel>> {
        self.store
            .search_by_term(&self.files, FILENAME_FIELD, filename)
            .await?
            .into_iter()
            .map(decode_file)
            .collect()
    }

    pub async fn all_files(&self) -> BackendResult<Vec<FileModel>> {
        self.store
            .search_all(&self.files)
            .await?
            .into_iter()
            .map(decode_file)
            .collect()
    }

    pub async fn all_file_ids(&self) -> BackendResult<Vec<String>> {
        self.store.list_ids(&self.files).await
    }

    pub async fn all_chunk_ids(&self) -> BackendResult<Vec<String>> {
        self.store.list_ids(&self.chunks).await
    }

    pub async fn delete_chunks(&self, ids: &[String]) -> BackendResult<BulkOutcome> {
        self.store.bulk_delete(&self.chunks, ids).await
    }

    pub async fn delete_files(&self, ids: &[String]) -> BackendResult<BulkOutcome> {
        self.store.bulk_delete(&self.files, ids).await
    }

    pub async fn delete_file(&self, id: &str) -> BackendResult<bool> {
        self.store.delete_by_id(&self.files, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    async fn index() -> Index<MemoryStore> {
        let idx = Index::new(MemoryStore::new(), "files", "chunks");
        idx.ensure_collections().await.unwrap();
        idx
    }

    #[tokio::test]
    async fn test_chunk_put_get_fills_id() {
        let idx = index().await;
        let id = idx.put_chunk(&ChunkModel::new(vec![9, 8, 7])).await.unwrap();
        let chunk = idx.get_chunk(&id).await.unwrap().unwrap();
        assert_eq!(chunk.id, id);
        assert_eq!(chunk.payload(), Some(&[9u8, 8, 7][..]));
        assert!(idx.get_chunk("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_files_by_exact_name() {
        let idx = index().await;
        idx.create_file("f1", &FileModel::new("a.txt", 1, 4, vec!["c".into()])).await.unwrap();
        idx.create_file("f2", &FileModel::new("a.txt.bak", 1, 4, vec!["d".into()])).await.unwrap();

        let found = idx.find_files("a.txt").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "f1");
        assert!(idx.find_files("A.TXT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_document_is_decode_error() {
        let idx = index().await;
        idx.store().raw_set("files", "bad", Some(json!({"filename": 12})));
        let err = idx.all_files().await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(ref m) if m.contains("bad")));
    }
}
