//! Block cache management.
//!
//! The cache is the in-memory layer between storage logic and a block
//! device. It manages a fixed pool of slots, each caching one block.
//!
//! # Components
//! - [`BlockCache`] - The cache manager and public contract
//! - [`BlockGuard`] / [`PinnedBlock`] - RAII handles for access and residency
//! - [`CacheStats`] - Performance statistics
//! - `slot` - Per-block descriptor: metadata plus the exclusive lock
//! - `bucket` - Sharded short locks over slot membership
//! - `scan_order` - Which foreign buckets an eviction scan may lock

mod block_cache;
mod bucket;
mod guard;
mod scan_order;
mod slot;
mod stats;

pub use block_cache::BlockCache;
pub use guard::{BlockGuard, PinnedBlock};
pub use stats::{CacheStats, StatsSnapshot};
