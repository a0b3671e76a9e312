//! shardcache - a sharded, fixed-capacity block cache.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      storage layer (caller)                     │
//! │                 acquire / persist / pin / unpin                 │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Block Cache (cache/)                        │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │  BucketTable: blockno % NBUCKET → short lock + members    │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │  Slot pool: identity | refcnt | stamp | exclusive payload │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │       scan_order: which buckets an eviction scan may lock       │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Block Device (device/)                        │
//! │            BlockDevice trait · FileDevice · MemDevice           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache keeps a fixed pool of block-sized slots and serves them to
//! many threads at once. A lookup hashes the block number to a bucket,
//! takes that bucket's short lock, and either finds the block cached or
//! claims the least-recently-released free slot among the buckets its
//! shard id permits it to scan. The returned [`BlockGuard`] holds the
//! slot's blocking exclusive lock: one holder per block, reads and writes
//! of the payload included, until the guard drops.
//!
//! Writes are explicit: mutate the payload through the guard, then call
//! [`BlockGuard::persist`] to push it to the device. Dropping the guard
//! without persisting discards the changes whenever the slot is next
//! evicted. A transactional layer that needs a block kept resident without
//! holding it exclusively can take a [`PinnedBlock`] token.
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, SlotId, Error, config)
//! - [`cache`] - The cache manager, guards, and eviction machinery
//! - [`device`] - Block devices and the fixed-size block they transfer
//!
//! # Quick Start
//! ```
//! use shardcache::{BlockCache, BlockId, MemDevice, DEFAULT_NBUF, DEFAULT_NBUCKET};
//!
//! let cache = BlockCache::new(DEFAULT_NBUF, DEFAULT_NBUCKET, MemDevice::new());
//!
//! let mut guard = cache.acquire(BlockId::new(0, 7)).unwrap();
//! guard.as_mut_slice()[0] = 0xAB;
//! guard.persist().unwrap();
//! drop(guard); // releases the block; it stays cached until evicted
//!
//! let guard = cache.acquire(BlockId::new(0, 7)).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod cache;
pub mod common;
pub mod device;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BLOCK_SIZE, DEFAULT_NBUCKET, DEFAULT_NBUF};
pub use common::{BlockId, Error, Result, SlotId};

pub use cache::{BlockCache, BlockGuard, CacheStats, PinnedBlock, StatsSnapshot};
pub use device::{Block, BlockDevice, FileDevice, MemDevice};
