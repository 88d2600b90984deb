// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, StoreError};
use crate::storage::sizing::{is_valid_chunk_size, ChunkSizing, MAX_CHUNK_SIZE};

/// Top-level configuration, optionally loaded from a TOML file.
/// Every field has a default so an empty file (or no file) is valid.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Document store connection.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Chunking and collection naming.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where the document store lives and how to talk to it.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Shard count used when a collection has to be created.
    #[serde(default = "default_shards")]
    pub shards: u32,
    /// Hits fetched per search round trip.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            timeout_secs: default_timeout_secs(),
            shards: default_shards(),
            page_size: default_page_size(),
        }
    }
}

/// Chunking parameters and collection names.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Collection holding one metadata document per file.
    #[serde(default = "default_file_collection")]
    pub file_collection: String,
    /// Collection holding chunk documents.
    #[serde(default = "default_chunk_collection")]
    pub chunk_collection: String,
    /// Chunk capacity in bytes used when no size is given on the command line.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Pick the chunk size from the source length instead.
    #[serde(default)]
    pub auto_size: bool,
    /// Upper bound on a whole engine operation (unset = unbounded).
    #[serde(default)]
    pub op_timeout_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_collection: default_file_collection(),
            chunk_collection: default_chunk_collection(),
            chunk_size: default_chunk_size(),
            auto_size: false,
            op_timeout_secs: None,
        }
    }
}

impl StorageConfig {
    pub fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout_secs.map(Duration::from_secs)
    }

    /// Sizing for one store. Command-line choices win over the file:
    /// `auto`, then an explicit `size`, then `auto_size`, then `chunk_size`.
    pub fn sizing(&self, size: Option<usize>, auto: bool) -> ChunkSizing {
        match (auto, size) {
            (true, _) => ChunkSizing::Adaptive,
            (false, Some(n)) => ChunkSizing::Fixed(n),
            (false, None) if self.auto_size => ChunkSizing::Adaptive,
            (false, None) => ChunkSizing::Fixed(self.chunk_size),
        }
    }
}

fn default_host() -> String { "localhost".into() }
fn default_port() -> u16 { 9200 }
fn default_scheme() -> String { "http".into() }
fn default_timeout_secs() -> u64 { 30 }
fn default_shards() -> u32 { 3 }
fn default_page_size() -> usize { 500 }
fn default_file_collection() -> String { "file_index".into() }
fn default_chunk_collection() -> String { "chunk_index".into() }
fn default_chunk_size() -> usize { 2048 }

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Cannot read config file: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| StoreError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Override host and port from a `host:port` string.
    pub fn set_host_port(&mut self, host_port: &str) -> Result<()> {
        let (host, port) = parse_host_port(host_port)?;
        self.backend.host = host;
        self.backend.port = port;
        Ok(())
    }

    /// Base URL of the document store, e.g. `http://localhost:9200`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.backend.scheme, self.backend.host, self.backend.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.host.trim().is_empty() {
            return Err(StoreError::Config("backend.host must not be empty".into()));
        }
        if self.backend.port == 0 {
            return Err(StoreError::Config("backend.port must be > 0".into()));
        }
        if !matches!(self.backend.scheme.as_str(), "http" | "https") {
            return Err(StoreError::Config(format!(
                "backend.scheme must be http or https (got '{}')",
                self.backend.scheme
            )));
        }
        if self.backend.page_size == 0 {
            return Err(StoreError::Config("backend.page_size must be > 0".into()));
        }
        if !is_valid_chunk_size(self.storage.chunk_size) {
            return Err(StoreError::Config(format!(
                "storage.chunk_size must be between 1 and {MAX_CHUNK_SIZE} (got {})",
                self.storage.chunk_size
            )));
        }
        if self.storage.file_collection == self.storage.chunk_collection {
            return Err(StoreError::Config(
                "file_collection and chunk_collection must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Split `host:port`; both halves are required.
pub fn parse_host_port(s: &str) -> Result<(String, u16)> {
    let s = s.trim();
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| StoreError::Config(format!("Please provide a host and a port (got '{s}')")))?;
    if host.is_empty() {
        return Err(StoreError::Config(format!("Missing host in '{s}'")));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| StoreError::Config(format!("Invalid port in '{s}'")))?;
    if port == 0 {
        return Err(StoreError::Config(format!("Invalid port in '{s}'")));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.backend.port, 9200);
        assert_eq!(cfg.storage.chunk_size, 2048);
        assert_eq!(cfg.storage.file_collection, "file_index");
        assert_eq!(cfg.storage.chunk_collection, "chunk_index");
        assert_eq!(cfg.base_url(), "http://localhost:9200");
        assert!(cfg.storage.op_timeout().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let cfg = Config::from_toml(
            r#"
            [backend]
            host = "es.internal"
            scheme = "https"

            [storage]
            chunk_size = 65536
            op_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.base_url(), "https://es.internal:9200");
        assert_eq!(cfg.storage.chunk_size, 65536);
        assert_eq!(cfg.storage.op_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_validation_rejects_zero_chunk_size() {
        let err = Config::from_toml("[storage]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_validation_rejects_oversized_chunk_size() {
        let toml = format!("[storage]\nchunk_size = {}\n", MAX_CHUNK_SIZE + 1);
        assert!(matches!(Config::from_toml(&toml), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_sizing_command_line_wins() {
        let mut storage = StorageConfig { auto_size: true, ..StorageConfig::default() };
        assert_eq!(storage.sizing(Some(512), false), ChunkSizing::Fixed(512));
        assert_eq!(storage.sizing(None, false), ChunkSizing::Adaptive);
        assert_eq!(storage.sizing(Some(512), true), ChunkSizing::Adaptive);

        storage.auto_size = false;
        assert_eq!(storage.sizing(None, false), ChunkSizing::Fixed(2048));
        assert_eq!(storage.sizing(None, true), ChunkSizing::Adaptive);
    }

    #[test]
    fn test_validation_rejects_same_collections() {
        let toml = "[storage]\nfile_collection = \"x\"\nchunk_collection = \"x\"\n";
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(parse_host_port("10.0.0.5:9200").unwrap(), ("10.0.0.5".to_string(), 9200));
        assert_eq!(parse_host_port(" es:9201 ").unwrap(), ("es".to_string(), 9201));
        assert!(parse_host_port("localhost").is_err());
        assert!(parse_host_port(":9200").is_err());
        assert!(parse_host_port("host:http").is_err());
        assert!(parse_host_port("host:0").is_err());
    }

    #[test]
    fn test_set_host_port_overrides() {
        let mut cfg = Config::default();
        cfg.set_host_port("search:9300").unwrap();
        assert_eq!(cfg.base_url(), "http://search:9300");
    }
}
