//! Configuration structures for Strata.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default block size in bytes (4 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Configuration for a file-backed block store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the backing file.
    pub path: PathBuf,
    /// Block size in bytes.
    pub block_size: usize,
    /// Total number of blocks in the image.
    pub num_blocks: u64,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/index.blk"),
            block_size: DEFAULT_BLOCK_SIZE,
            num_blocks: 1024,
            fsync_enabled: true,
        }
    }
}

impl StoreConfig {
    /// Returns the total image size in bytes.
    pub fn image_size_bytes(&self) -> u64 {
        self.num_blocks * self.block_size as u64
    }
}

/// Configuration for the frame-based caching layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of block frames held in memory.
    pub num_frames: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Key and value geometry for a B-Tree index.
///
/// Both widths are fixed for the lifetime of an index and are recorded in
/// every node header, so an existing image carries its own geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Key width in bytes.
    pub keysize: usize,
    /// Value width in bytes.
    pub valuesize: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            keysize: 8,
            valuesize: 8,
        }
    }
}
