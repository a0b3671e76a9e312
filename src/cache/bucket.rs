//! Bucket table - sharded ownership of slot membership.
//!
//! The pool is partitioned into buckets. Each bucket's short
//! critical-section lock owns one thing: the membership list of the slots
//! currently homed there (arena indices into the slot pool). The bucket
//! never owns payload; the slot's own exclusive lock does.
//!
//! Bucket locks are held only for bounded metadata sections and never
//! across device I/O or a blocking payload-lock acquisition.

use parking_lot::{Mutex, MutexGuard};

use crate::common::SlotId;

/// One shard: a lock plus the list of member slots.
struct Bucket {
    members: Mutex<Vec<SlotId>>,
}

/// A fixed array of buckets plus the hash that picks one.
pub(crate) struct BucketTable {
    buckets: Vec<Bucket>,
}

impl BucketTable {
    /// Create a table of `nbucket` buckets over a pool of `nbuf` slots.
    ///
    /// Slots are seeded round-robin, so every bucket starts with its share
    /// of fresh slots. A requester can always reach its own bucket, which
    /// keeps a cold cache from exhausting before misses have redistributed
    /// the slots to the buckets of the blocks they cache.
    pub(crate) fn new(nbucket: usize, nbuf: usize) -> Self {
        let mut buckets: Vec<Bucket> = (0..nbucket)
            .map(|_| Bucket {
                members: Mutex::new(Vec::new()),
            })
            .collect();

        for slot in 0..nbuf {
            buckets[slot % nbucket].members.get_mut().push(SlotId::new(slot));
        }

        Self { buckets }
    }

    /// Number of buckets.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Which bucket a block number hashes to.
    #[inline]
    pub(crate) fn index_for(&self, blockno: u32) -> usize {
        blockno as usize % self.buckets.len()
    }

    /// Lock bucket `index` and return its membership list.
    #[inline]
    pub(crate) fn lock(&self, index: usize) -> MutexGuard<'_, Vec<SlotId>> {
        self.buckets[index].members.lock()
    }
}

/// Remove `slot` from a locked membership list.
///
/// The caller must hold the lock of the bucket that currently owns `slot`.
pub(crate) fn unlink(members: &mut Vec<SlotId>, slot: SlotId) {
    let pos = members
        .iter()
        .position(|&s| s == slot)
        .unwrap_or_else(|| panic!("{slot} not in its home bucket"));
    members.remove(pos);
}
