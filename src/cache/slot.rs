//! Slot - one descriptor in the cache pool.
//!
//! A [`Slot`] caches one block's contents plus the metadata needed to find,
//! reuse, and evict it:
//! - Which block is loaded (if any)
//! - Whether the payload reflects device contents
//! - Reference count and last-release stamp
//! - The blocking exclusive lock around the payload

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::common::BlockId;
use crate::device::Block;

/// A slot in the cache pool.
///
/// Slots are allocated once at construction and reassigned to new block
/// identities thereafter; they are never freed.
///
/// # Thread Safety
/// The payload is guarded by its own blocking `Mutex`, held across device
/// I/O. The metadata fields use interior mutability (`Mutex` for the
/// identity, atomics for the rest), but atomicity alone is not the
/// protocol: identity, `refcnt`, and `stamp` may only be *mutated* while
/// holding the lock of the bucket that currently owns this slot, and
/// identity may only change while `refcnt == 0`. The bucket lock is what
/// makes a reassignment appear whole to every other thread.
pub(crate) struct Slot {
    /// Which block is currently cached, or None if the slot was never used.
    ident: Mutex<Option<BlockId>>,

    /// Whether the payload has been read from the device.
    valid: AtomicBool,

    /// Outstanding references (acquires plus pins).
    refcnt: AtomicU32,

    /// Logical-clock value recorded when `refcnt` last dropped to zero.
    /// Victim selection prefers the smallest stamp.
    stamp: AtomicU64,

    /// The block payload, behind the slot's exclusive lock.
    data: Mutex<Block>,
}

impl Slot {
    /// Create a new empty slot.
    pub(crate) fn new() -> Self {
        Self {
            ident: Mutex::new(None),
            valid: AtomicBool::new(false),
            refcnt: AtomicU32::new(0),
            stamp: AtomicU64::new(0),
            data: Mutex::new(Block::new()),
        }
    }

    // ========================================================================
    // Payload access (blocking exclusive lock)
    // ========================================================================

    /// Block-acquire the exclusive lock on the payload.
    ///
    /// May suspend the calling thread. Never call while holding any bucket
    /// lock.
    #[inline]
    pub(crate) fn lock_data(&self) -> MutexGuard<'_, Block> {
        self.data.lock()
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Get the identity of the cached block.
    #[inline]
    pub(crate) fn ident(&self) -> Option<BlockId> {
        *self.ident.lock()
    }

    /// Set the identity.
    #[inline]
    pub(crate) fn set_ident(&self, ident: Option<BlockId>) {
        *self.ident.lock() = ident;
    }

    /// Whether this slot currently caches `block`.
    #[inline]
    pub(crate) fn is_block(&self, block: BlockId) -> bool {
        self.ident() == Some(block)
    }

    // ========================================================================
    // Validity
    // ========================================================================

    /// Whether the payload reflects device contents.
    #[inline]
    pub(crate) fn valid(&self) -> bool {
        self.valid.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::Relaxed);
    }

    // ========================================================================
    // Reference count
    // ========================================================================

    /// Increment the reference count. Returns the new count.
    #[inline]
    pub(crate) fn incr_ref(&self) -> u32 {
        self.refcnt.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the reference count. Returns the new count.
    ///
    /// # Panics
    /// Panics if the count is already 0.
    #[inline]
    pub(crate) fn decr_ref(&self) -> u32 {
        let old = self.refcnt.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "refcnt underflow");
        old - 1
    }

    /// Get the current reference count.
    #[inline]
    pub(crate) fn refcnt(&self) -> u32 {
        self.refcnt.load(Ordering::Relaxed)
    }

    /// Set the reference count outright. Only used when reassigning a slot
    /// whose count is known to be zero.
    #[inline]
    pub(crate) fn set_refcnt(&self, refcnt: u32) {
        self.refcnt.store(refcnt, Ordering::Relaxed);
    }

    // ========================================================================
    // Release stamp
    // ========================================================================

    /// Get the last-release stamp.
    #[inline]
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Relaxed)
    }

    /// Record the release stamp.
    #[inline]
    pub(crate) fn set_stamp(&self, stamp: u64) {
        self.stamp.store(stamp, Ordering::Relaxed);
    }
}
