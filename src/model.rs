// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Stored records: one metadata document per file, one document per chunk.
//!
//! ```text
//! file_index/<id>  { filename, filesize, chunkSize, chunkList: [c0, c1, …] }
//!                                                       │
//! chunk_index/<c0> { data: <base64>, length }  ◄────────┘
//! ```
//!
//! The document id is not part of the JSON source; it is filled in from the
//! backend's hit when a record is read back.

use serde::{Deserialize, Serialize};

/// Metadata for one stored logical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModel {
    #[serde(skip)]
    pub id: String,
    pub filename: String,
    /// Sum of the chunk lengths.
    pub filesize: u64,
    /// Nominal capacity requested for the store. The last chunk may be shorter.
    pub chunk_size: usize,
    /// Chunk ids in write order; the only input to reconstruction.
    #[serde(default)]
    pub chunk_list: Vec<String>,
}

impl FileModel {
    pub fn new(filename: &str, filesize: u64, chunk_size: usize, chunk_list: Vec<String>) -> Self {
        Self {
            id: String::new(),
            filename: filename.to_string(),
            filesize,
            chunk_size,
            chunk_list,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_list.len()
    }
}

/// One contiguous slice of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkModel {
    #[serde(skip)]
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Valid bytes at the front of `data`.
    pub length: usize,
}

impl ChunkModel {
    /// Build a chunk holding exactly `data`.
    pub fn new(data: Vec<u8>) -> Self {
        let length = data.len();
        Self { id: String::new(), data, length }
    }

    /// The valid prefix of `data`, or `None` if `length` overruns it.
    pub fn payload(&self) -> Option<&[u8]> {
        self.data.get(..self.length)
    }
}

/// Chunk payloads travel as standard base64 strings inside JSON.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
