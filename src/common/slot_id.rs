//! Slot identifier type.

use std::fmt;

/// Identifies a slot in the cache pool.
///
/// Using `usize` because slots live in a `Vec<Slot>` arena and a `SlotId`
/// indexes it directly: `slots[slot_id.0]`. Bucket membership lists hold
/// these indices rather than pointers, which keeps cross-bucket moves
/// explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

impl SlotId {
    /// Create a new SlotId.
    #[inline]
    pub fn new(id: usize) -> Self {
        SlotId(id)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_new() {
        let sid = SlotId::new(10);
        assert_eq!(sid.0, 10);
    }

    #[test]
    fn test_slot_id_equality() {
        assert_eq!(SlotId::new(5), SlotId::new(5));
        assert_ne!(SlotId::new(5), SlotId::new(6));
    }

    #[test]
    fn test_slot_id_display() {
        assert_eq!(format!("{}", SlotId::new(3)), "Slot(3)");
    }
}
