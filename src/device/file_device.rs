//! File-backed block device.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Result};
use crate::device::{Block, BlockDevice};

/// A block device backed by a single file.
///
/// # File Layout
/// Blocks are laid out sequentially; block `n` lives at file offset
/// `n * BLOCK_SIZE`:
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬──────────┐
/// │ Block 0  │ Block 1  │ Block 2  │  ...    │ Block N  │
/// │ (1KB)    │ (1KB)    │ (1KB)    │         │ (1KB)    │
/// └──────────┴──────────┴──────────┴─────────┴──────────┘
/// Offset:  0      1024      2048      ...      N×1024
/// ```
///
/// One `FileDevice` backs one device; the `dev` field of incoming
/// [`BlockId`]s is not interpreted. A caller with multiple devices routes
/// to multiple `FileDevice`s (or implements [`BlockDevice`] over them).
///
/// Reads past the end of the file yield a zeroed block, and writes extend
/// the file as needed, so the device behaves like fresh storage of
/// unbounded size. Every write is followed by `fsync`.
pub struct FileDevice {
    file: File,
}

impl FileDevice {
    /// Create a new device file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self { file })
    }

    /// Open an existing device file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Open an existing device file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Number of whole blocks currently stored in the file.
    pub fn block_count(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len() / BLOCK_SIZE as u64)
    }
}

impl BlockDevice for FileDevice {
    fn read_block(&mut self, block: BlockId, buf: &mut Block) -> Result<()> {
        let offset = (block.blockno as u64) * (BLOCK_SIZE as u64);
        let len = self.file.metadata()?.len();

        buf.reset();
        if offset >= len {
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let avail = ((len - offset).min(BLOCK_SIZE as u64)) as usize;
        self.file.read_exact(&mut buf.as_mut_slice()[..avail])?;

        Ok(())
    }

    fn write_block(&mut self, block: BlockId, buf: &Block) -> Result<()> {
        let offset = (block.blockno as u64) * (BLOCK_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_device() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        let dev = FileDevice::create(&path).unwrap();
        assert_eq!(dev.block_count().unwrap(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        FileDevice::create(&path).unwrap();
        assert!(FileDevice::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.img");

        assert!(FileDevice::open(&path).is_err());
    }

    #[test]
    fn test_read_past_eof_is_zeroed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        let mut dev = FileDevice::create(&path).unwrap();
        let mut block = Block::new();
        block.as_mut_slice().fill(0xEE);

        dev.read_block(BlockId::new(0, 9), &mut block).unwrap();
        assert!(block.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        let mut dev = FileDevice::create(&path).unwrap();

        let mut block = Block::new();
        block.as_mut_slice()[0] = 0xAB;
        block.as_mut_slice()[100] = 0xCD;
        block.as_mut_slice()[BLOCK_SIZE - 1] = 0xEF;

        dev.write_block(BlockId::new(0, 3), &block).unwrap();
        assert_eq!(dev.block_count().unwrap(), 4);

        let mut read = Block::new();
        dev.read_block(BlockId::new(0, 3), &mut read).unwrap();
        assert_eq!(read.as_slice()[0], 0xAB);
        assert_eq!(read.as_slice()[100], 0xCD);
        assert_eq!(read.as_slice()[BLOCK_SIZE - 1], 0xEF);
    }

    #[test]
    fn test_write_extends_with_zeroed_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        let mut dev = FileDevice::create(&path).unwrap();

        let mut block = Block::new();
        block.as_mut_slice()[0] = 0x42;
        dev.write_block(BlockId::new(0, 2), &block).unwrap();

        // Blocks 0 and 1 were never written and must read as zeros.
        let mut read = Block::new();
        dev.read_block(BlockId::new(0, 1), &mut read).unwrap();
        assert!(read.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        {
            let mut dev = FileDevice::create(&path).unwrap();
            let mut block = Block::new();
            block.as_mut_slice()[0] = 0x42;
            dev.write_block(BlockId::new(0, 0), &block).unwrap();
        }

        {
            let mut dev = FileDevice::open(&path).unwrap();
            assert_eq!(dev.block_count().unwrap(), 1);

            let mut block = Block::new();
            dev.read_block(BlockId::new(0, 0), &mut block).unwrap();
            assert_eq!(block.as_slice()[0], 0x42);
        }
    }

    #[test]
    fn test_open_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.img");

        {
            let mut dev = FileDevice::open_or_create(&path).unwrap();
            let block = Block::new();
            dev.write_block(BlockId::new(0, 0), &block).unwrap();
        }

        {
            let dev = FileDevice::open_or_create(&path).unwrap();
            assert_eq!(dev.block_count().unwrap(), 1);
        }
    }
}
