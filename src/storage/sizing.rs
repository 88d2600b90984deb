// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Chunk size selection from the source length.

/// Sources below this size get a single chunk of exactly this capacity.
pub const SMALL_FILE_CHUNK: usize = 4096;
pub const MIN_CHUNK: usize = 128;
pub const MAX_CHUNK: usize = 64 * 1024;
/// Doubling stops once the chunk count drops to this.
pub const TARGET_CHUNKS: u64 = 25;

/// Largest chunk capacity accepted for a store. One base64-encoded chunk has
/// to fit in a single request under the server's default 100 MB body limit.
pub const MAX_CHUNK_SIZE: usize = 32 * 1024 * 1024;

pub fn is_valid_chunk_size(n: usize) -> bool {
    (1..=MAX_CHUNK_SIZE).contains(&n)
}

/// Pick a chunk capacity keeping large files at roughly 25 chunks or fewer,
/// capped at 64 KiB.
pub fn adaptive_chunk_size(source_size: u64) -> usize {
    if source_size < SMALL_FILE_CHUNK as u64 {
        return SMALL_FILE_CHUNK;
    }
    let mut size = MIN_CHUNK;
    while source_size / size as u64 > TARGET_CHUNKS && size < MAX_CHUNK {
        size *= 2;
    }
    size
}

/// How a store picks its chunk capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSizing {
    Fixed(usize),
    Adaptive,
}

impl ChunkSizing {
    pub fn resolve(self, source_size: u64) -> usize {
        match self {
            ChunkSizing::Fixed(n) => n,
            ChunkSizing::Adaptive => adaptive_chunk_size(source_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_bounds() {
        assert!(!is_valid_chunk_size(0));
        assert!(is_valid_chunk_size(1));
        assert!(is_valid_chunk_size(MAX_CHUNK_SIZE));
        assert!(!is_valid_chunk_size(MAX_CHUNK_SIZE + 1));
        assert!(is_valid_chunk_size(adaptive_chunk_size(u64::MAX)));
    }

    #[test]
    fn test_small_sources_get_4k() {
        assert_eq!(adaptive_chunk_size(0), 4096);
        assert_eq!(adaptive_chunk_size(1), 4096);
        assert_eq!(adaptive_chunk_size(4095), 4096);
    }

    #[test]
    fn test_3201_is_above_minimum() {
        assert!(adaptive_chunk_size(3201) > 128);
    }

    #[test]
    fn test_doubling_from_128() {
        // 4096 / 128 = 32 > 25 → 256; 4096 / 256 = 16.
        assert_eq!(adaptive_chunk_size(4096), 256);
        // 25 * 128 + a bit still fits after one doubling.
        assert_eq!(adaptive_chunk_size(6400), 256);
        assert_eq!(adaptive_chunk_size(1024 * 1024), 65536);
    }

    #[test]
    fn test_never_exceeds_64k() {
        for size in [65536u64, 10 << 20, 1 << 30, u64::MAX] {
            assert!(adaptive_chunk_size(size) <= MAX_CHUNK, "size {size}");
        }
        assert_eq!(adaptive_chunk_size(1 << 40), MAX_CHUNK);
    }

    #[test]
    fn test_chunk_count_bounded_below_cap() {
        for size in [4096u64, 10_000, 100_000, 1_000_000] {
            let chunk = adaptive_chunk_size(size) as u64;
            assert!(size / chunk <= TARGET_CHUNKS, "size {size} chunk {chunk}");
        }
    }

    #[test]
    fn test_sizing_resolve() {
        assert_eq!(ChunkSizing::Fixed(10).resolve(1 << 20), 10);
        assert_eq!(ChunkSizing::Adaptive.resolve(100), 4096);
    }
}
