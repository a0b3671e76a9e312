//! RAII guards for block access.
//!
//! - [`BlockGuard`] - exclusive access to one cached block's payload;
//!   releasing is dropping the guard.
//! - [`PinnedBlock`] - a residency token that keeps a slot's reference
//!   count raised without holding the exclusive lock.
//!
//! Holding the guard *is* holding the slot's exclusive lock, so operations
//! that require the lock (`persist`, release, `pin`) are methods here and
//! cannot be called without it.

use std::ops::{Deref, DerefMut};

use parking_lot::MutexGuard;

use crate::common::{BlockId, Result, SlotId};
use crate::device::{Block, BlockDevice};

use super::block_cache::BlockCache;

/// Exclusive access to one cached block.
///
/// Returned by [`BlockCache::acquire`] with the payload already matching
/// device contents. `Deref`/`DerefMut` expose the payload. Dropping the
/// guard releases the exclusive lock and then gives back the reference;
/// when the count reaches zero the slot is stamped and becomes an eviction
/// candidate.
///
/// # Example
/// ```ignore
/// let mut guard = cache.acquire(block)?;
/// guard.as_mut_slice()[0] = 0xFF;
/// guard.persist()?;
/// // guard drops here: lock released, reference returned
/// ```
pub struct BlockGuard<'a, D: BlockDevice> {
    /// Cache to report the release to.
    cache: &'a BlockCache<D>,
    /// Slot holding this block.
    slot_id: SlotId,
    /// Identity of the block, stable while this guard exists.
    block_id: BlockId,
    /// The payload lock. `Some` until drop, which must let go of it before
    /// touching the bucket.
    payload: Option<MutexGuard<'a, Block>>,
}

impl<'a, D: BlockDevice> BlockGuard<'a, D> {
    /// Create a new guard. Called by `BlockCache::acquire` with the
    /// reference count already incremented and the payload lock held.
    pub(crate) fn new(
        cache: &'a BlockCache<D>,
        slot_id: SlotId,
        block_id: BlockId,
        payload: MutexGuard<'a, Block>,
    ) -> Self {
        Self {
            cache,
            slot_id,
            block_id,
            payload: Some(payload),
        }
    }

    /// Get the block identity.
    #[inline]
    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Get the slot this block currently occupies.
    #[inline]
    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    /// Write the payload through to the device.
    ///
    /// Synchronous. Leaves the lock held and the reference count unchanged,
    /// so the caller can keep mutating and persist again.
    pub fn persist(&self) -> Result<()> {
        self.cache.write_through(self.block_id, self.payload())
    }

    /// Raise the slot's reference count so it stays resident after this
    /// guard drops. The returned token holds no lock; other threads can
    /// acquire the block while it exists.
    pub fn pin(&self) -> PinnedBlock<'a, D> {
        self.cache.pin_slot(self.slot_id, self.block_id);
        PinnedBlock {
            cache: self.cache,
            slot_id: self.slot_id,
            block_id: self.block_id,
        }
    }

    fn payload(&self) -> &Block {
        match &self.payload {
            Some(guard) => guard,
            // Only None during drop, after take().
            None => unreachable!("payload lock already released"),
        }
    }
}

impl<D: BlockDevice> Deref for BlockGuard<'_, D> {
    type Target = Block;

    #[inline]
    fn deref(&self) -> &Block {
        self.payload()
    }
}

impl<D: BlockDevice> DerefMut for BlockGuard<'_, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Block {
        match &mut self.payload {
            Some(guard) => guard,
            None => unreachable!("payload lock already released"),
        }
    }
}

impl<D: BlockDevice> Drop for BlockGuard<'_, D> {
    fn drop(&mut self) {
        // The exclusive lock goes first; only then the bucket-side
        // bookkeeping.
        self.payload.take();
        self.cache.release_slot(self.slot_id, self.block_id);
    }
}

/// A residency token for one cached block.
///
/// Keeps the slot's reference count raised, so the slot cannot be chosen
/// as an eviction victim, across any number of acquire/release cycles by
/// any thread. Created by [`BlockGuard::pin`]; dropping the token (or
/// calling [`unpin`](PinnedBlock::unpin)) gives the reference back.
pub struct PinnedBlock<'a, D: BlockDevice> {
    pub(crate) cache: &'a BlockCache<D>,
    pub(crate) slot_id: SlotId,
    pub(crate) block_id: BlockId,
}

impl<D: BlockDevice> PinnedBlock<'_, D> {
    /// Get the block identity.
    #[inline]
    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Give the reference back, making the slot evictable again once no
    /// other references remain.
    pub fn unpin(self) {
        // Drop does the work.
    }
}

impl<D: BlockDevice> Drop for PinnedBlock<'_, D> {
    fn drop(&mut self) {
        self.cache.unpin_slot(self.slot_id, self.block_id);
    }
}
