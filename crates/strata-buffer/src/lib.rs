//! Block cache implementations for Strata.
//!
//! This crate provides the concrete stores behind the `BlockCache` contract:
//! - In-memory block store with notification counters
//! - File-backed block store with synchronous whole-block I/O
//! - Frame-based caching layer with clock eviction and dirty write-back

mod file;
mod memory;
mod pool;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use pool::BufferCache;
