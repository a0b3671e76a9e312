//! Block Cache - the core block caching layer.
//!
//! The [`BlockCache`] provides:
//! - Block caching between a device and memory
//! - Per-block mutual exclusion via a blocking lock per slot
//! - Sharded bucket locks so lookups on different blocks don't contend
//! - Least-recently-released eviction within the buckets a requester may
//!   scan under the cross-shard ordering rule

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

use crate::cache::bucket::{self, BucketTable};
use crate::cache::guard::BlockGuard;
use crate::cache::scan_order;
use crate::cache::slot::Slot;
use crate::cache::stats::CacheStats;
use crate::common::{BlockId, Result, SlotId};
use crate::device::{Block, BlockDevice};

/// A fixed pool of slots caching blocks of a device.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BlockCache                          │
/// │  ┌──────────────────────┐  ┌─────────────────────────────┐  │
/// │  │ buckets: BucketTable │  │      slots: Vec<Slot>       │  │
/// │  │ [b0] [b1] ... [bN]   │─▶│ [Slot0] [Slot1] [Slot2] ... │  │
/// │  │ blockno % N          │  └─────────────────────────────┘  │
/// │  └──────────────────────┘                                   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
/// │  │    device    │  │    clock     │  │    stats     │       │
/// │  │    Mutex     │  │  AtomicU64   │  │  CacheStats  │       │
/// │  └──────────────┘  └──────────────┘  └──────────────┘       │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// Two tiers. Bucket locks are short: they guard membership lists and the
/// `refcnt`/stamp/identity of current members, and are never held across
/// device I/O or a blocking payload-lock acquisition. Slot payload locks
/// are long: one holder per block at a time, held across device I/O.
///
/// A miss scans foreign buckets for a victim while the home bucket lock is
/// held. Which foreign buckets may be locked is fixed per requester by the
/// rule in `scan_order`, identical for all threads, which rules out cyclic
/// waits between bucket locks. The selected victim is therefore the
/// least-recently-released slot *among the visible buckets*, which is not
/// always the global minimum. That weakening is deliberate; scanning every
/// bucket would reintroduce the cross-shard deadlock the rule exists to
/// prevent.
///
/// # Usage
/// ```
/// use shardcache::{BlockCache, BlockId, MemDevice};
///
/// let cache = BlockCache::new(4, 2, MemDevice::new());
///
/// let mut guard = cache.acquire(BlockId::new(0, 7)).unwrap();
/// guard.as_mut_slice()[0] = 0xAB;
/// guard.persist().unwrap();
/// drop(guard);
/// ```
pub struct BlockCache<D: BlockDevice> {
    /// Fixed pool of slots allocated at construction.
    slots: Vec<Slot>,

    /// Shard locks and membership lists.
    buckets: BucketTable,

    /// Handles all device I/O.
    device: Mutex<D>,

    /// Logical clock for release stamps. Strictly increasing, so stamps
    /// order releases exactly. Starts at 1: stamp 0 marks a slot that has
    /// never been released and sorts older than every real release.
    clock: AtomicU64,

    /// Performance statistics.
    stats: CacheStats,
}

impl<D: BlockDevice> BlockCache<D> {
    /// Create a cache of `nbuf` slots partitioned into `nbucket` buckets
    /// over `device`.
    ///
    /// Defaults for the two counts live in
    /// [`config`](crate::common::config). Prefer a bucket count that is not
    /// a small power of two, so regular block-number strides spread out.
    ///
    /// # Panics
    /// Panics if `nbuf` or `nbucket` is 0.
    pub fn new(nbuf: usize, nbucket: usize, device: D) -> Self {
        assert!(nbuf > 0, "nbuf must be > 0");
        assert!(nbucket > 0, "nbucket must be > 0");

        Self {
            slots: (0..nbuf).map(|_| Slot::new()).collect(),
            buckets: BucketTable::new(nbucket, nbuf),
            device: Mutex::new(device),
            clock: AtomicU64::new(1),
            stats: CacheStats::new(),
        }
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Acquire exclusive access to a block, reading it from the device if
    /// it isn't cached.
    ///
    /// Returns with the slot's exclusive lock held, the reference count
    /// incremented, and the payload matching device contents. Concurrent
    /// acquires of the same block serialize on the exclusive lock in
    /// unspecified order; acquires of blocks in different buckets don't
    /// contend at all.
    ///
    /// # Errors
    /// Device I/O errors from the read-through.
    ///
    /// # Panics
    /// Panics if every slot in the buckets this requester may scan is in
    /// use. That is pool exhaustion, a sizing bug, not a retryable
    /// condition.
    pub fn acquire(&self, block: BlockId) -> Result<BlockGuard<'_, D>> {
        let slot_id = self.lookup_or_allocate(block);
        let slot = &self.slots[slot_id.0];

        // Blocking acquisition; no bucket lock is held here.
        let mut payload = slot.lock_data();

        // Each acquirer checks validity under the exclusive lock, so when
        // several race a miss on one block exactly one reads the device.
        if !slot.valid() {
            let res = self.device.lock().read_block(block, &mut payload);
            if let Err(err) = res {
                drop(payload);
                self.release_slot(slot_id, block);
                return Err(err);
            }
            slot.set_valid(true);
            self.stats.blocks_read.fetch_add(1, Ordering::Relaxed);
        }

        Ok(BlockGuard::new(self, slot_id, block, payload))
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Total number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of buckets the pool is partitioned into.
    pub fn shard_count(&self) -> usize {
        self.buckets.len()
    }

    // ========================================================================
    // Internal: called by the guards
    // ========================================================================

    /// Give back one reference after the exclusive lock has been released.
    ///
    /// If the count reaches zero the slot is stamped with the current
    /// logical clock, which both makes it an eviction candidate and records
    /// its recency.
    pub(crate) fn release_slot(&self, slot_id: SlotId, block: BlockId) {
        let home = self.buckets.index_for(block.blockno);
        let _members = self.buckets.lock(home);

        let slot = &self.slots[slot_id.0];
        if slot.decr_ref() == 0 {
            slot.set_stamp(self.clock.fetch_add(1, Ordering::Relaxed));
        }
    }

    /// Raise the reference count without touching the exclusive lock.
    pub(crate) fn pin_slot(&self, slot_id: SlotId, block: BlockId) {
        let home = self.buckets.index_for(block.blockno);
        let _members = self.buckets.lock(home);

        self.slots[slot_id.0].incr_ref();
    }

    /// Counterpart of `pin_slot`. Does not stamp the slot: only an
    /// exclusive-lock release records recency.
    pub(crate) fn unpin_slot(&self, slot_id: SlotId, block: BlockId) {
        let home = self.buckets.index_for(block.blockno);
        let _members = self.buckets.lock(home);

        self.slots[slot_id.0].decr_ref();
    }

    /// Write a payload through to the device.
    pub(crate) fn write_through(&self, block: BlockId, payload: &Block) -> Result<()> {
        self.device.lock().write_block(block, payload)?;
        self.stats.blocks_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    // ========================================================================
    // Internal: lookup and eviction
    // ========================================================================

    /// Find the slot caching `block`, or claim a victim slot for it.
    ///
    /// Returns with the reference count already incremented and no locks
    /// held. The home bucket lock is held from the first probe until the
    /// hit or until the victim has been relinked, so two racing misses on
    /// one block cannot both claim a slot: the second sees the first's
    /// relink as a hit.
    fn lookup_or_allocate(&self, block: BlockId) -> SlotId {
        let home = self.buckets.index_for(block.blockno);
        let mut home_members = self.buckets.lock(home);

        // Already cached?
        let hit = home_members
            .iter()
            .copied()
            .find(|&s| self.slots[s.0].is_block(block));
        if let Some(slot_id) = hit {
            self.slots[slot_id.0].incr_ref();
            drop(home_members);

            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            trace!("hit for {block} in {slot_id}");
            return slot_id;
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!("miss for {block}, scanning buckets for a victim");

        // Victim scan. Visit buckets in index order; foreign buckets only
        // if the ordering rule allows locking them from here. A foreign
        // bucket's lock is kept only while it holds the current best
        // candidate, so at most three bucket locks are ever held at once:
        // home, current best, and the one being scanned.
        let nbucket = self.buckets.len();
        let mut best: Option<(SlotId, u64)> = None;
        let mut best_foreign: Option<MutexGuard<'_, Vec<SlotId>>> = None;

        for i in 0..nbucket {
            if i == home {
                if let Some(found) = Self::oldest_free(&self.slots, &home_members, best) {
                    best = Some(found);
                    best_foreign = None;
                }
                continue;
            }
            if !scan_order::may_scan(home, i, nbucket) {
                continue;
            }

            let members = self.buckets.lock(i);
            if let Some(found) = Self::oldest_free(&self.slots, &members, best) {
                best = Some(found);
                best_foreign = Some(members);
            }
        }

        let Some((victim, stamp)) = best else {
            panic!("block cache: no unpinned slots, cannot cache {block}");
        };

        // Unlink the victim from the bucket that owns it. Its refcnt is
        // zero and we hold that bucket's lock, so nothing else can reach
        // it between here and the relink below.
        match best_foreign {
            Some(mut members) => bucket::unlink(&mut members, victim),
            None => bucket::unlink(&mut home_members, victim),
        }

        // Reassign under the home bucket lock.
        let slot = &self.slots[victim.0];
        let evicted = slot.ident();
        slot.set_ident(Some(block));
        slot.set_valid(false);
        slot.set_refcnt(1);
        home_members.push(victim);
        drop(home_members);

        if let Some(old) = evicted {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("evicted {old} (stamp {stamp}) from {victim}, now caching {block}");
        } else {
            trace!("claimed fresh {victim} for {block}");
        }

        victim
    }

    /// The oldest-released free slot in one locked membership list, if it
    /// beats `best`. Strict comparison: ties keep the earlier find.
    fn oldest_free(
        slots: &[Slot],
        members: &[SlotId],
        best: Option<(SlotId, u64)>,
    ) -> Option<(SlotId, u64)> {
        let mut found: Option<(SlotId, u64)> = None;
        for &s in members {
            let slot = &slots[s.0];
            if slot.refcnt() != 0 {
                continue;
            }
            let stamp = slot.stamp();
            let current = found.or(best).map(|(_, st)| st);
            if current.map_or(true, |st| stamp < st) {
                found = Some((s, stamp));
            }
        }
        found
    }
}
