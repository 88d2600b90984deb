// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Elasticsearch REST client implementing [`DocumentStore`].
//!
//! Requests used:
//!
//! ```text
//!   HEAD   /{index}                           → collection exists?
//!   PUT    /{index}                           → create (shards + keyword mapping)
//!   POST   /{index}/_doc                      → write, id assigned by the server
//!   PUT    /{index}/_doc/{id}                 → write with explicit id
//!   PUT    /{index}/_create/{id}?refresh=...  → conditional write (409 = taken)
//!   GET    /{index}/_doc/{id}                 → realtime fetch (404 = absent)
//!   POST   /{index}/_search?scroll=...        → term / match_all, first page
//!   POST   /_search/scroll                    → following pages
//!   DELETE /_search/scroll                    → release the scroll context
//!   POST   /_bulk?refresh=...                 → NDJSON delete actions
//!   DELETE /{index}/_doc/{id}?refresh=...
//! ```
//!
//! Plain writes are not refreshed: chunks are only ever read back by id,
//! which is realtime. Conditional creates and deletes wait for a refresh so
//! the next search observes them; the duplicate-name guard depends on that.
//!
//! Searches walk a scroll context rather than `from`/`size`, which the
//! server caps at `index.max_result_window` (10 000 by default).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Config;
use crate::storage::backend::{BackendError, BackendResult, BulkOutcome, Document, DocumentStore};

const REFRESH: (&str, &str) = ("refresh", "wait_for");
/// Keep-alive of a scroll context between two pages.
const SCROLL: (&str, &str) = ("scroll", "1m");

/// HTTP handle to one Elasticsearch node. The connection pool is released
/// when the last clone is dropped.
#[derive(Clone)]
pub struct ElasticStore {
    http: Client,
    base: Url,
    shards: u32,
    page_size: usize,
}

// ──────────────── response shapes ──────────────────────────────────────────

#[derive(Deserialize)]
struct WriteResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct AckResponse {
    #[serde(default)]
    acknowledged: bool,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Deserialize)]
struct BulkItem {
    status: u16,
}

// ──────────────── construction ─────────────────────────────────────────────

impl ElasticStore {
    /// Build a client for `base_url` (e.g. `http://localhost:9200`).
    /// No request is made until the first operation.
    pub fn new(base_url: &str, timeout: Duration, shards: u32, page_size: usize) -> BackendResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| BackendError::Unreachable(format!("invalid address '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Unreachable(format!("invalid address '{base_url}'")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(format!("http client: {e}")))?;
        Ok(Self { http, base, shards, page_size: page_size.max(1) })
    }

    pub fn from_config(cfg: &Config) -> BackendResult<Self> {
        Self::new(
            &cfg.base_url(),
            Duration::from_secs(cfg.backend.timeout_secs),
            cfg.backend.shards,
            cfg.backend.page_size,
        )
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was ruled out in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Settings and mapping applied when a collection is created. Both
    /// collections share it; each only populates its own fields.
    fn create_body(&self) -> Value {
        json!({
            "settings": { "index": { "number_of_shards": self.shards } },
            "mappings": {
                "properties": {
                    "filename":  { "type": "keyword" },
                    "filesize":  { "type": "long" },
                    "chunkSize": { "type": "integer" },
                    "chunkList": { "type": "keyword" },
                    "data":      { "type": "binary" },
                    "length":    { "type": "integer" }
                }
            }
        })
    }

    async fn search_pages(&self, collection: &str, query: Value, with_source: bool) -> BackendResult<Vec<SearchHit>> {
        let body = json!({
            "query": query,
            "size": self.page_size,
            "sort": ["_doc"],
            "_source": with_source,
        });
        let resp = self
            .http
            .post(self.url(&[collection, "_search"]))
            .query(&[SCROLL])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let mut page: SearchResponse = check(resp).await?.json().await.map_err(decode)?;

        let mut hits = Vec::new();
        let mut scroll_id = page.scroll_id.take();
        let walked = loop {
            let n = page.hits.hits.len();
            hits.append(&mut page.hits.hits);
            debug!(collection, page = n, total = hits.len(), "search page");
            if n < self.page_size {
                break Ok(());
            }
            let Some(id) = scroll_id.as_deref() else {
                break Err(BackendError::Decode("search response without _scroll_id".to_string()));
            };
            match self.next_page(id).await {
                Ok(mut next) => {
                    if let Some(id) = next.scroll_id.take() {
                        scroll_id = Some(id);
                    }
                    page = next;
                }
                Err(e) => break Err(e),
            }
        };

        if let Some(id) = scroll_id {
            self.clear_scroll(&id).await;
        }
        walked.map(|()| hits)
    }

    async fn next_page(&self, scroll_id: &str) -> BackendResult<SearchResponse> {
        let body = json!({ "scroll": SCROLL.1, "scroll_id": scroll_id });
        let resp = self
            .http
            .post(self.url(&["_search", "scroll"]))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check(resp).await?.json().await.map_err(decode)
    }

    /// Best effort: an unreleased context expires after its keep-alive.
    async fn clear_scroll(&self, scroll_id: &str) {
        let body = json!({ "scroll_id": scroll_id });
        let cleared = match self.http.delete(self.url(&["_search", "scroll"])).json(&body).send().await {
            Ok(resp) => check(resp).await.map(drop),
            Err(e) => Err(transport(e)),
        };
        if let Err(e) = cleared {
            debug!(error = %e, "scroll context not released");
        }
    }

    async fn write(&self, req: reqwest::RequestBuilder) -> BackendResult<String> {
        let resp = req.send().await.map_err(transport)?;
        let written: WriteResponse = check(resp).await?.json().await.map_err(decode)?;
        Ok(written.id)
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else {
        BackendError::Unreachable(e.to_string())
    }
}

fn decode(e: reqwest::Error) -> BackendError {
    BackendError::Decode(e.to_string())
}

async fn check(resp: Response) -> BackendResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(BackendError::Status { status: status.as_u16(), message })
}

fn bulk_delete_body(collection: &str, ids: &[String]) -> String {
    let mut body = String::new();
    for id in ids {
        body.push_str(&json!({ "delete": { "_index": collection, "_id": id } }).to_string());
        body.push('\n');
    }
    body
}

// ──────────────── contract ─────────────────────────────────────────────────

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn ensure_collection(&self, collection: &str) -> BackendResult<bool> {
        let url = self.url(&[collection]);
        let resp = self.http.head(url.clone()).send().await.map_err(transport)?;
        match resp.status() {
            StatusCode::OK => return Ok(false),
            StatusCode::NOT_FOUND => {}
            other => {
                return Err(BackendError::Status {
                    status: other.as_u16(),
                    message: format!("HEAD /{collection}"),
                })
            }
        }

        let resp = self.http.put(url).json(&self.create_body()).send().await.map_err(transport)?;
        if resp.status() == StatusCode::BAD_REQUEST {
            let message = resp.text().await.unwrap_or_default();
            // Lost a creation race with another client: the collection exists.
            if message.contains("resource_already_exists_exception") {
                return Ok(false);
            }
            return Err(BackendError::Status { status: 400, message });
        }
        let ack: AckResponse = check(resp).await?.json().await.map_err(decode)?;
        if !ack.acknowledged {
            return Err(BackendError::Status {
                status: 200,
                message: format!("creation of '{collection}' not acknowledged"),
            });
        }
        info!(collection, shards = self.shards, "Created collection");
        Ok(true)
    }

    async fn put(&self, collection: &str, id: Option<&str>, doc: &Value) -> BackendResult<String> {
        let req = match id {
            Some(id) => self.http.put(self.url(&[collection, "_doc", id])),
            None => self.http.post(self.url(&[collection, "_doc"])),
        };
        self.write(req.json(doc)).await
    }

    async fn create(&self, collection: &str, id: &str, doc: &Value) -> BackendResult<String> {
        let resp = self
            .http
            .put(self.url(&[collection, "_create", id]))
            .query(&[REFRESH])
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(BackendError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let written: WriteResponse = check(resp).await?.json().await.map_err(decode)?;
        Ok(written.id)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> BackendResult<Option<Document>> {
        let resp = self
            .http
            .get(self.url(&[collection, "_doc", id]))
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let got: GetResponse = check(resp).await?.json().await.map_err(decode)?;
        match (got.found, got.source) {
            (true, Some(source)) => Ok(Some(Document { id: got.id, source })),
            _ => Ok(None),
        }
    }

    async fn search_by_term(&self, collection: &str, field: &str, value: &str) -> BackendResult<Vec<Document>> {
        let mut term = serde_json::Map::new();
        term.insert(field.to_string(), Value::from(value));
        let query = json!({ "term": term });
        let hits = self.search_pages(collection, query, true).await?;
        Ok(hits.into_iter().map(|h| Document { id: h.id, source: h.source }).collect())
    }

    async fn search_all(&self, collection: &str) -> BackendResult<Vec<Document>> {
        let hits = self.search_pages(collection, json!({ "match_all": {} }), true).await?;
        Ok(hits.into_iter().map(|h| Document { id: h.id, source: h.source }).collect())
    }

    async fn list_ids(&self, collection: &str) -> BackendResult<Vec<String>> {
        let hits = self.search_pages(collection, json!({ "match_all": {} }), false).await?;
        Ok(hits.into_iter().map(|h| h.id).collect())
    }

    async fn bulk_delete(&self, collection: &str, ids: &[String]) -> BackendResult<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let resp = self
            .http
            .post(self.url(&["_bulk"]))
            .query(&[REFRESH])
            .header("content-type", "application/x-ndjson")
            .body(bulk_delete_body(collection, ids))
            .send()
            .await
            .map_err(transport)?;
        let bulk: BulkResponse = check(resp).await?.json().await.map_err(decode)?;

        let mut outcome = BulkOutcome::default();
        for item in bulk.items.iter().flat_map(|m| m.values()) {
            if (200..300).contains(&item.status) {
                outcome.succeeded += 1;
            } else {
                outcome.failed += 1;
            }
        }
        // Items the server did not report on did not succeed.
        outcome.failed += ids.len().saturating_sub(outcome.total());
        Ok(outcome)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> BackendResult<bool> {
        let resp = self
            .http
            .delete(self.url(&[collection, "_doc", id]))
            .query(&[REFRESH])
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(resp).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> ElasticStore {
        ElasticStore::new(base, Duration::from_secs(1), 3, 100).unwrap()
    }

    #[test]
    fn test_url_joins_and_escapes_segments() {
        let s = store("http://localhost:9200");
        assert_eq!(s.url(&["file_index", "_doc", "abc"]).as_str(), "http://localhost:9200/file_index/_doc/abc");
        assert_eq!(s.url(&["c", "_doc", "a/b"]).as_str(), "http://localhost:9200/c/_doc/a%2Fb");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let s = store("http://proxy:8080/es/");
        assert_eq!(s.url(&["_bulk"]).as_str(), "http://proxy:8080/es/_bulk");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ElasticStore::new("not a url", Duration::from_secs(1), 1, 1),
            Err(BackendError::Unreachable(_))
        ));
        assert!(ElasticStore::new("mailto:x@y", Duration::from_secs(1), 1, 1).is_err());
    }

    #[test]
    fn test_create_body_carries_shards_and_keyword_fields() {
        let body = store("http://localhost:9200").create_body();
        assert_eq!(body["settings"]["index"]["number_of_shards"], 3);
        assert_eq!(body["mappings"]["properties"]["filename"]["type"], "keyword");
        assert_eq!(body["mappings"]["properties"]["chunkList"]["type"], "keyword");
    }

    #[test]
    fn test_bulk_delete_body_is_ndjson() {
        let body = bulk_delete_body("chunk_index", &["a".into(), "b".into()]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, json!({"delete": {"_index": "chunk_index", "_id": "a"}}));
        assert!(body.ends_with('\n'));
    }
}
