//! In-memory block device.

use std::collections::HashMap;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Result};
use crate::device::{Block, BlockDevice};

/// A block device held entirely in memory.
///
/// Each device id gets its own growable byte store, so blocks with equal
/// numbers on different devices do not alias. Unwritten blocks read as
/// zeros. Useful for tests and examples that don't want a file on disk.
pub struct MemDevice {
    devs: HashMap<u32, Vec<u8>>,
}

impl MemDevice {
    /// Create a new empty in-memory device.
    pub fn new() -> Self {
        Self {
            devs: HashMap::new(),
        }
    }
}

impl Default for MemDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for MemDevice {
    fn read_block(&mut self, block: BlockId, buf: &mut Block) -> Result<()> {
        buf.reset();
        if let Some(store) = self.devs.get(&block.dev) {
            let offset = block.blockno as usize * BLOCK_SIZE;
            if offset < store.len() {
                let avail = (store.len() - offset).min(BLOCK_SIZE);
                buf.as_mut_slice()[..avail].copy_from_slice(&store[offset..offset + avail]);
            }
        }
        Ok(())
    }

    fn write_block(&mut self, block: BlockId, buf: &Block) -> Result<()> {
        let store = self.devs.entry(block.dev).or_default();
        let offset = block.blockno as usize * BLOCK_SIZE;
        if store.len() < offset + BLOCK_SIZE {
            store.resize(offset + BLOCK_SIZE, 0);
        }
        store[offset..offset + BLOCK_SIZE].copy_from_slice(buf.as_slice());
        Ok(())
    }
}
