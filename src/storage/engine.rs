// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Storage engine: splits files into chunk documents and puts them back
//! together.
//!
//! ```text
//!  store:  source ──read chunk_size──► put chunk ─► put chunk ─► … ─► create metadata
//!  get:    metadata.chunkList[0..n] ──get chunk──► concat first `length` bytes
//!  delete: bulk-delete chunks ─► delete metadata
//! ```
//!
//! ## Write ordering
//!
//! Metadata is written only after every chunk is persisted, and deleted only
//! after its chunks are gone. A failure in between leaves orphan chunks (found
//! by [`StorageEngine::integrity_check`]) but never a metadata document that
//! points at missing chunks.
//!
//! ## Same-name races
//!
//! The metadata document id is derived from the filename
//! ([`metadata_id`]) and written with a conditional create, so of two stores
//! racing on one name exactly one commits; the other gets
//! [`StoreError::DuplicateName`] and its chunks are left as orphans.
//!
//! Nothing here is staged as "pending" before the chunks land; the orphan
//! window between the last chunk and the metadata write is not closed.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::model::{ChunkModel, FileModel};
use crate::storage::backend::{BackendError, BulkOutcome, DocumentStore};
use crate::storage::index::Index;
use crate::storage::sizing::{is_valid_chunk_size, ChunkSizing};

/// Upper bound on the buffer preallocated for a reconstructed file; larger
/// files grow the buffer as chunks arrive.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Id of the metadata document for `filename`.
pub fn metadata_id(filename: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, filename.as_bytes()).to_string()
}

/// Ordering for [`StorageEngine::list_files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Backend order.
    #[default]
    None,
    Asc,
    Desc,
}

/// What a successful store wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    pub file_id: String,
    pub filename: String,
    pub filesize: u64,
    pub chunk_size: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub filename: String,
    pub chunks: BulkOutcome,
    /// False if the metadata document had already vanished.
    pub metadata_deleted: bool,
}

/// Integrity verdict for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIntegrity {
    pub file_id: String,
    pub filename: String,
    pub chunk_count: usize,
    /// Chunk ids that do not resolve.
    pub missing: usize,
    /// Chunks whose `length` overruns their data or the file's chunk size,
    /// or that cannot be decoded.
    pub mismatched: usize,
    pub expected_size: u64,
    /// Sum of `length` over the chunks that resolved.
    pub actual_size: u64,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub files: Vec<FileIntegrity>,
    /// Chunk documents no file references.
    pub orphan_chunks: Vec<String>,
    /// Filenames carried by more than one metadata document.
    pub duplicate_names: Vec<String>,
}

impl IntegrityReport {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileIntegrity> {
        self.files.iter().filter(|f| !f.passed)
    }

    pub fn is_clean(&self) -> bool {
        self.failed_files().next().is_none()
            && self.orphan_chunks.is_empty()
            && self.duplicate_names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub chunks: BulkOutcome,
    pub files: BulkOutcome,
}

/// Chunked file storage over a [`DocumentStore`].
pub struct StorageEngine<S> {
    index: Index<S>,
    op_timeout: Option<Duration>,
}

impl<S: DocumentStore> StorageEngine<S> {
    /// Wrap `store` and make sure both collections exist.
    pub async fn open(store: S, cfg: &StorageConfig) -> Result<Self> {
        let engine = Self::with_collections(store, &cfg.file_collection, &cfg.chunk_collection)
            .with_timeout(cfg.op_timeout());
        engine.index.ensure_collections().await?;
        debug!(
            files = engine.index.file_collection(),
            chunks = engine.index.chunk_collection(),
            "Collections ready"
        );
        Ok(engine)
    }

    /// Wrap `store` without touching it.
    pub fn with_collections(store: S, files: &str, chunks: &str) -> Self {
        Self { index: Index::new(store, files, chunks), op_timeout: None }
    }

    /// Bound every subsequent operation by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn index(&self) -> &Index<S> {
        &self.index
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.op_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| StoreError::Timeout { op, after })?,
            None => fut.await,
        }
    }

    // ──────────────── lookup ───────────────────────────────────────────────

    /// Exact-match lookup on the filename.
    pub async fn find_file_by_name(&self, name: &str) -> Result<FileModel> {
        self.bounded("find", self.find(name)).await
    }

    async fn find(&self, name: &str) -> Result<FileModel> {
        let mut found = self.index.find_files(name).await?;
        if found.len() > 1 {
            warn!(filename = name, entries = found.len(), "Multiple metadata documents share this name");
        }
        if found.is_empty() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(found.swap_remove(0))
    }

    async fn ensure_absent(&self, name: &str) -> Result<()> {
        match self.find(name).await {
            Ok(_) => Err(StoreError::DuplicateName(name.to_string())),
            Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // ──────────────── store ────────────────────────────────────────────────

    /// Split `source` into `chunk_size` chunks and store it as `destination`.
    pub async fn store_file<R>(&self, source: R, destination: &str, chunk_size: usize) -> Result<StoreReceipt>
    where
        R: AsyncRead + Unpin + Send,
    {
        if !is_valid_chunk_size(chunk_size) {
            return Err(StoreError::InvalidChunkSize(chunk_size));
        }
        self.bounded("store", async {
            self.ensure_absent(destination).await?;
            self.write_chunks(source, destination, destination, chunk_size).await
        })
        .await
    }

    /// Store the local file at `path` as `destination`.
    pub async fn store_path(&self, path: &Path, destination: &str, sizing: ChunkSizing) -> Result<StoreReceipt> {
        if let ChunkSizing::Fixed(n) = sizing {
            if !is_valid_chunk_size(n) {
                return Err(StoreError::InvalidChunkSize(n));
            }
        }
        let name = path.display().to_string();
        self.bounded("store", async {
            self.ensure_absent(destination).await?;

            let unreadable = |source| StoreError::SourceUnreadable { name: name.clone(), source };
            let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
            let len = file.metadata().await.map_err(unreadable)?.len();
            let chunk_size = sizing.resolve(len);
            if sizing == ChunkSizing::Adaptive {
                info!(source = %name, bytes = len, chunk_size, "Using calculated chunk size");
            }

            self.write_chunks(file, &name, destination, chunk_size).await
        })
        .await
    }

    async fn write_chunks<R>(&self, mut source: R, source_name: &str, destination: &str, chunk_size: usize) -> Result<StoreReceipt>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut chunk_ids: Vec<String> = Vec::new();
        let mut filesize: u64 = 0;

        loop {
            let data = match read_chunk(&mut source, chunk_size).await {
                Ok(data) => data,
                Err(e) => {
                    warn_orphans(destination, &chunk_ids, "source read failed");
                    return Err(StoreError::SourceUnreadable { name: source_name.to_string(), source: e });
                }
            };
            let n = data.len();
            if n == 0 {
                break;
            }

            let chunk = ChunkModel::new(data);
            match self.index.put_chunk(&chunk).await {
                Ok(id) => {
                    debug!(filename = destination, seq = chunk_ids.len(), chunk_id = %id, bytes = n, "Chunk written");
                    chunk_ids.push(id);
                }
                Err(e) => {
                    warn_orphans(destination, &chunk_ids, "chunk write failed");
                    return Err(e.into());
                }
            }
            filesize += n as u64;

            if n < chunk_size {
                break;
            }
        }

        let file = FileModel::new(destination, filesize, chunk_size, chunk_ids);
        let file_id = match self.index.create_file(&metadata_id(destination), &file).await {
            Ok(id) => id,
            Err(BackendError::Conflict { .. }) => {
                warn_orphans(destination, &file.chunk_list, "concurrent store committed first");
                return Err(StoreError::DuplicateName(destination.to_string()));
            }
            Err(e) => {
                warn_orphans(destination, &file.chunk_list, "metadata write failed");
                return Err(e.into());
            }
        };

        info!(
            source = source_name,
            filename = destination,
            file_id = %file_id,
            bytes = filesize,
            chunks = file.chunk_count(),
            chunk_size,
            "File stored"
        );

        Ok(StoreReceipt {
            file_id,
            filename: destination.to_string(),
            filesize,
            chunk_size,
            chunk_count: file.chunk_count(),
        })
    }

    // ──────────────── read ─────────────────────────────────────────────────

    /// Reassemble `name` from its chunks, in `chunkList` order. Fails as a
    /// whole if any chunk is missing or corrupt.
    pub async fn get_file(&self, name: &str) -> Result<Bytes> {
        self.bounded("get", async {
            let file = self.find(name).await?;
            let mut out = BytesMut::with_capacity(file.filesize.min(MAX_PREALLOC) as usize);

            for chunk_id in &file.chunk_list {
                let chunk = self.index.get_chunk(chunk_id).await?.ok_or_else(|| {
                    warn!(filename = name, chunk_id = %chunk_id, "Chunk not found");
                    StoreError::ChunkMissing { filename: name.to_string(), chunk_id: chunk_id.clone() }
                })?;
                let payload = chunk.payload().ok_or_else(|| StoreError::CorruptChunk {
                    chunk_id: chunk_id.clone(),
                    reason: format!("length {} exceeds {} bytes of data", chunk.length, chunk.data.len()),
                })?;
                out.extend_from_slice(payload);
            }

            debug!(filename = name, bytes = out.len(), chunks = file.chunk_count(), "File reassembled");
            Ok(out.freeze())
        })
        .await
    }

    /// All file metadata, optionally sorted by filename.
    pub async fn list_files(&self, order: SortOrder) -> Result<Vec<FileModel>> {
        self.bounded("list", async {
            let mut files = self.index.all_files().await?;
            match order {
                SortOrder::None => {}
                SortOrder::Asc => files.sort_by(|a, b| a.filename.cmp(&b.filename)),
                SortOrder::Desc => files.sort_by(|a, b| b.filename.cmp(&a.filename)),
            }
            Ok(files)
        })
        .await
    }

    // ──────────────── delete ───────────────────────────────────────────────

    /// Delete `name`: chunks first, then the metadata document.
    pub async fn delete_file(&self, name: &str) -> Result<DeleteReport> {
        self.bounded("delete", async {
            let file = self.find(name).await?;

            let chunks = self.index.delete_chunks(&file.chunk_list).await?;
            info!(filename = name, deleted = chunks.succeeded, failed = chunks.failed, "Chunk entries deleted");
            if chunks.failed > 0 {
                warn!(filename = name, failed = chunks.failed, "Some chunk deletions failed");
            }

            let metadata_deleted = self.index.delete_file(&file.id).await?;
            info!(filename = name, file_id = %file.id, "File entry deleted");

            Ok(DeleteReport { filename: name.to_string(), chunks, metadata_deleted })
        })
        .await
    }

    /// Remove every chunk and then every file entry.
    pub async fn purge(&self) -> Result<PurgeReport> {
        self.bounded("purge", async {
            let chunk_ids = self.index.all_chunk_ids().await?;
            let chunks = self.index.delete_chunks(&chunk_ids).await?;
            info!(deleted = chunks.succeeded, failed = chunks.failed, "Chunk entries purged");

            let file_ids = self.index.all_file_ids().await?;
            let files = self.index.delete_files(&file_ids).await?;
            info!(deleted = files.succeeded, failed = files.failed, "File entries purged");

            Ok(PurgeReport { chunks, files })
        })
        .await
    }

    // ──────────────── integrity ────────────────────────────────────────────

    /// Check every file against its chunks and list unreferenced chunks.
    /// Read-only.
    pub async fn integrity_check(&self) -> Result<IntegrityReport> {
        self.bounded("integrity", async {
            let files = self.index.all_files().await?;
            let mut referenced: HashSet<&str> = HashSet::new();
            let mut names: HashMap<&str, usize> = HashMap::new();
            let mut report = IntegrityReport::default();

            for file in &files {
                *names.entry(file.filename.as_str()).or_default() += 1;
                let verdict = self.check_file(file).await?;
                if !verdict.passed {
                    warn!(
                        filename = %file.filename,
                        missing = verdict.missing,
                        mismatched = verdict.mismatched,
                        expected = verdict.expected_size,
                        actual = verdict.actual_size,
                        "Integrity check failed"
                    );
                }
                report.files.push(verdict);
                referenced.extend(file.chunk_list.iter().map(String::as_str));
            }

            report.orphan_chunks = self
                .index
                .all_chunk_ids()
                .await?
                .into_iter()
                .filter(|id| !referenced.contains(id.as_str()))
                .collect();

            report.duplicate_names = names
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(name, _)| name.to_string())
                .collect();
            report.duplicate_names.sort();

            info!(
                files = report.files.len(),
                failed = report.failed_files().count(),
                orphans = report.orphan_chunks.len(),
                duplicates = report.duplicate_names.len(),
                "Integrity check complete"
            );
            Ok(report)
        })
        .await
    }

    async fn check_file(&self, file: &FileModel) -> Result<FileIntegrity> {
        let mut missing = 0;
        let mut mismatched = 0;
        let mut actual_size: u64 = 0;

        for chunk_id in &file.chunk_list {
            match self.index.get_chunk(chunk_id).await {
                Ok(None) => missing += 1,
                Ok(Some(chunk)) => {
                    actual_size += chunk.length as u64;
                    if chunk.payload().is_none() || chunk.length > file.chunk_size {
                        mismatched += 1;
                    }
                }
                Err(BackendError::Decode(reason)) => {
                    debug!(chunk_id = %chunk_id, %reason, "Undecodable chunk");
                    mismatched += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(FileIntegrity {
            file_id: file.id.clone(),
            filename: file.filename.clone(),
            chunk_count: file.chunk_count(),
            missing,
            mismatched,
            expected_size: file.filesize,
            actual_size,
            passed: missing == 0 && mismatched == 0 && actual_size == file.filesize,
        })
    }
}

/// Read up to `limit` bytes, stopping early only at the end of the source.
/// The buffer grows with what is actually read.
async fn read_chunk<R: AsyncRead + Unpin>(source: &mut R, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    source.take(limit as u64).read_to_end(&mut data).await?;
    Ok(data)
}

fn warn_orphans(filename: &str, chunk_ids: &[String], reason: &str) {
    if !chunk_ids.is_empty() {
        warn!(filename, orphaned = chunk_ids.len(), reason, "Store aborted; written chunks left unreferenced");
    }
}
