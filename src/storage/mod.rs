// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Storage subsystem: document-store backends, typed index access and the
//! chunking engine.

pub mod backend;
pub mod elastic;
pub mod engine;
pub mod index;
pub mod memory;
pub mod sizing;
