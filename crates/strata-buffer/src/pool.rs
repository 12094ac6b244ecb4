//! Frame-based caching layer over a block store.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use sysinfo::System;
use strata_common::{BlockCache, BlockId, CacheConfig, Result, StrataError};

/// A block frame holding one cached block image.
struct Frame {
    /// The block currently held, if any.
    block: Option<BlockId>,
    /// Block data buffer.
    data: Box<[u8]>,
    /// Whether the frame has been modified since it was loaded.
    dirty: bool,
    /// Reference bit for clock replacement.
    referenced: bool,
}

impl Frame {
    fn new(block_size: usize) -> Self {
        Self {
            block: None,
            data: vec![0u8; block_size].into_boxed_slice(),
            dirty: false,
            referenced: false,
        }
    }
}

/// Internal pool state guarded by a single mutex.
struct PoolInner {
    /// Fixed array of frames.
    frames: Vec<Frame>,
    /// Block id to frame index mapping.
    map: HashMap<BlockId, usize>,
    /// Frames never used so far.
    free: Vec<usize>,
    /// Clock hand position.
    hand: usize,
}

/// Write-back caching layer implementing [`BlockCache`] over any store.
///
/// Reads are served from frames when possible; writes land in frames and are
/// marked dirty. Dirty frames reach the store on eviction (clock
/// second-chance policy), on [`flush`](BufferCache::flush), and on drop.
pub struct BufferCache<S: BlockCache> {
    /// The backing store.
    store: S,
    /// Pool state.
    inner: Mutex<PoolInner>,
    /// Number of reads served from a frame.
    hits: AtomicU64,
    /// Number of reads that went to the store.
    misses: AtomicU64,
}

impl<S: BlockCache> BufferCache<S> {
    /// Creates a caching layer with the configured number of frames.
    pub fn new(store: S, config: CacheConfig) -> Self {
        let num_frames = config.num_frames.max(1);
        let block_size = store.block_size();

        let frames = (0..num_frames).map(|_| Frame::new(block_size)).collect();
        let free = (0..num_frames).rev().collect();

        Self {
            store,
            inner: Mutex::new(PoolInner {
                frames,
                map: HashMap::with_capacity(num_frames),
                free,
                hand: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a caching layer sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 frames so small systems still get useful caching.
    pub fn auto_sized(store: S) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_frames = (target_bytes / store.block_size()).max(1_000);

        Self::new(store, CacheConfig { num_frames })
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Returns the number of reads served from a frame.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of reads that had to go to the store.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Writes every dirty frame back to the store.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        for frame in inner.frames.iter_mut() {
            if frame.dirty {
                if let Some(block) = frame.block {
                    self.store.write_block(block, &frame.data)?;
                }
                frame.dirty = false;
            }
        }
        Ok(())
    }

    /// Returns a reference to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn check_access(&self, block: BlockId, buf_len: usize) -> Result<()> {
        let limit = self.store.num_blocks();
        if block >= limit {
            return Err(StrataError::BlockOutOfRange { block, limit });
        }
        let expected = self.store.block_size();
        if buf_len != expected {
            return Err(StrataError::BlockSizeMismatch {
                expected,
                actual: buf_len,
            });
        }
        Ok(())
    }

    /// Picks a frame for a new block, evicting a victim if necessary.
    ///
    /// The victim's dirty contents are written back before the frame is
    /// handed out. The returned frame is unmapped and clean.
    fn take_frame(&self, inner: &mut PoolInner) -> Result<usize> {
        if let Some(idx) = inner.free.pop() {
            return Ok(idx);
        }

        // Clock scan: two full rotations always find a victim because every
        // referenced bit seen is cleared on the way past.
        let n = inner.frames.len();
        for _ in 0..(2 * n) {
            let idx = inner.hand;
            inner.hand = (inner.hand + 1) % n;

            if inner.frames[idx].referenced {
                inner.frames[idx].referenced = false;
                continue;
            }

            let frame = &mut inner.frames[idx];
            if let Some(block) = frame.block.take() {
                if frame.dirty {
                    self.store.write_block(block, &frame.data)?;
                    frame.dirty = false;
                }
                inner.map.remove(&block);
            }
            return Ok(idx);
        }

        Err(StrataError::Insane(
            "clock scan found no evictable frame".to_string(),
        ))
    }
}

impl<S: BlockCache> BlockCache for BufferCache<S> {
    fn block_size(&self) -> usize {
        self.store.block_size()
    }

    fn num_blocks(&self) -> u64 {
        self.store.num_blocks()
    }

    fn read_block(&self, block: BlockId, buf: &mut [u8]) -> Result<()> {
        self.check_access(block, buf.len())?;

        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.map.get(&block) {
            let frame = &mut inner.frames[idx];
            frame.referenced = true;
            buf.copy_from_slice(&frame.data);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let idx = self.take_frame(&mut inner)?;
        let frame = &mut inner.frames[idx];
        self.store.read_block(block, &mut frame.data)?;
        frame.block = Some(block);
        frame.referenced = true;
        buf.copy_from_slice(&frame.data);
        inner.map.insert(block, idx);
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, block: BlockId, buf: &[u8]) -> Result<()> {
        self.check_access(block, buf.len())?;

        let mut inner = self.inner.lock();
        let idx = match inner.map.get(&block) {
            Some(&idx) => idx,
            None => {
                let idx = self.take_frame(&mut inner)?;
                inner.map.insert(block, idx);
                idx
            }
        };

        let frame = &mut inner.frames[idx];
        frame.block = Some(block);
        frame.data.copy_from_slice(buf);
        frame.dirty = true;
        frame.referenced = true;
        Ok(())
    }

    fn notify_allocate(&self, block: BlockId) {
        self.store.notify_allocate(block);
    }

    fn notify_deallocate(&self, block: BlockId) {
        self.store.notify_deallocate(block);
    }
}

impl<S: BlockCache> Drop for BufferCache<S> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
