//! In-memory block store.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use strata_common::{BlockCache, BlockId, Result, StrataError};

/// In-memory block store with a fixed geometry.
///
/// All blocks live in RAM; block ids map directly to vector indices. The
/// advisory allocation hooks are counted so tests can observe them.
pub struct MemoryStore {
    /// Block size in bytes.
    block_size: usize,
    /// Blocks stored by block id.
    blocks: Mutex<Vec<Box<[u8]>>>,
    /// Number of allocate notifications received.
    allocations: AtomicU64,
    /// Number of deallocate notifications received.
    deallocations: AtomicU64,
}

impl MemoryStore {
    /// Creates a zero-filled store of `num_blocks` blocks.
    pub fn new(block_size: usize, num_blocks: u64) -> Self {
        let blocks = (0..num_blocks)
            .map(|_| vec![0u8; block_size].into_boxed_slice())
            .collect();

        Self {
            block_size,
            blocks: Mutex::new(blocks),
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    /// Returns the number of allocate notifications received.
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Returns the number of deallocate notifications received.
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::Relaxed)
    }

    fn check_access(&self, block: BlockId, buf_len: usize) -> Result<()> {
        let limit = self.num_blocks();
        if block >= limit {
            return Err(StrataError::BlockOutOfRange { block, limit });
        }
        if buf_len != self.block_size {
            return Err(StrataError::BlockSizeMismatch {
                expected: self.block_size,
                actual: buf_len,
            });
        }
        Ok(())
    }
}

impl BlockCache for MemoryStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> u64 {
        self.blocks.lock().len() as u64
    }

    fn read_block(&self, block: BlockId, buf: &mut [u8]) -> Result<()> {
        self.check_access(block, buf.len())?;
        let blocks = self.blocks.lock();
        buf.copy_from_slice(&blocks[block as usize]);
        Ok(())
    }

    fn write_block(&self, block: BlockId, buf: &[u8]) -> Result<()> {
        self.check_access(block, buf.len())?;
        let mut blocks = self.blocks.lock();
        blocks[block as usize].copy_from_slice(buf);
        Ok(())
    }

    fn notify_allocate(&self, _block: BlockId) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    fn notify_deallocate(&self, _block: BlockId) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
    }
}
