//! File-backed block store.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use strata_common::{BlockCache, BlockId, Result, StoreConfig, StrataError};

/// A single preallocated file of fixed-size blocks.
///
/// The file holds `num_blocks * block_size` bytes; block ids map to byte
/// offsets. Reads and writes are synchronous and whole-block, with optional
/// fsync after each write.
pub struct FileStore {
    /// Configuration.
    config: StoreConfig,
    /// The backing file handle.
    file: Mutex<File>,
}

impl FileStore {
    /// Opens or creates the backing file described by `config`.
    ///
    /// A fresh file is extended to the full image size; an existing file
    /// keeps its contents and is extended if it is shorter than the
    /// configured geometry.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&config.path)?;

        let image_size = config.image_size_bytes();
        if file.metadata()?.len() < image_size {
            file.set_len(image_size)?;
        }

        Ok(Self {
            config,
            file: Mutex::new(file),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn check_access(&self, block: BlockId, buf_len: usize) -> Result<()> {
        if block >= self.config.num_blocks {
            return Err(StrataError::BlockOutOfRange {
                block,
                limit: self.config.num_blocks,
            });
        }
        if buf_len != self.config.block_size {
            return Err(StrataError::BlockSizeMismatch {
                expected: self.config.block_size,
                actual: buf_len,
            });
        }
        Ok(())
    }

    fn block_offset(&self, block: BlockId) -> u64 {
        block * self.config.block_size as u64
    }
}

impl BlockCache for FileStore {
    fn block_size(&self) -> usize {
        self.config.block_size
    }

    fn num_blocks(&self) -> u64 {
        self.config.num_blocks
    }

    fn read_block(&self, block: BlockId, buf: &mut [u8]) -> Result<()> {
        self.check_access(block, buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.block_offset(block)))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block: BlockId, buf: &[u8]) -> Result<()> {
        self.check_access(block, buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.block_offset(block)))?;
        file.write_all(buf)?;

        if self.config.fsync_enabled {
            file.sync_all()?;
        }
        Ok(())
    }
}
