//! Cross-shard scan eligibility.
//!
//! A requester that misses in its home bucket scans other buckets for a
//! victim while still holding its own bucket lock. Left uncontrolled, two
//! requesters could each hold their own bucket and wait on the other's, so
//! cross-locking is restricted: every requester applies the identical rule
//! below, under which for any two distinct buckets at most one direction
//! of cross-locking is permitted. The cost is that a scan only sees
//! roughly half of all buckets, so victim selection is least-recently-
//! released within that visible subset, not globally.

/// Whether a requester scanning from bucket `requester` may lock bucket
/// `candidate`, out of `nbucket` buckets total.
///
/// The forward half-ring `(requester, requester + nbucket/2]` (indices mod
/// `nbucket`) is off-limits; everything else, including the requester's own
/// bucket, is fair game.
pub(crate) fn may_scan(requester: usize, candidate: usize, nbucket: usize) -> bool {
    debug_assert!(requester < nbucket && candidate < nbucket);
    let half = nbucket / 2;
    let dist = (candidate + nbucket - requester) % nbucket;
    dist == 0 || dist > half
}
