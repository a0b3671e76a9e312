//! The block device interface consumed by the cache.

use crate::common::{BlockId, Result};
use crate::device::Block;

/// A synchronous block device.
///
/// The cache calls these methods while holding the exclusive lock of the
/// slot whose payload is being transferred, and serializes all device
/// access behind one lock. Implementations therefore see one call at a
/// time and may keep internal state without their own synchronization.
///
/// Both operations transfer exactly one fixed-size block and block the
/// calling thread until the transfer completes. There are no partial
/// transfers: a call either moves the whole block or fails.
pub trait BlockDevice: Send {
    /// Read the block identified by `block` into `buf`.
    fn read_block(&mut self, block: BlockId, buf: &mut Block) -> Result<()>;

    /// Write `buf` to the block identified by `block`.
    fn write_block(&mut self, block: BlockId, buf: &Block) -> Result<()>;
}
