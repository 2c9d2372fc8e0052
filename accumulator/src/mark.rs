//! Mark (checkpoint) policy.
//!
//! A mark is keyed by a multiple `B` of [`MARK_INTERVAL`]. It holds the
//! accumulator at `B - 1` leaves together with leaf number `B - 1` itself
//! (the "mark-next"). Restoring the mark and appending its mark-next yields
//! the accumulator at `B` leaves, including the carry into every level that
//! completes at `B`.

/// Marks are taken every `2^MARK_POWER` leaves.
pub const MARK_POWER: u32 = 10;

/// Leaves between two marks.
pub const MARK_INTERVAL: u64 = 1 << MARK_POWER;

/// The mark key crossed by the next append, if any.
///
/// `count` is the number of leaves held before the append.
pub fn crossing_boundary(count: u64) -> Option<u64> {
    let next = count.checked_add(1)?;
    (next % MARK_INTERVAL == 0).then_some(next)
}

/// Whether `count` sits on a mark boundary.
pub fn is_boundary(count: u64) -> bool {
    count != 0 && count % MARK_INTERVAL == 0
}

/// The leaf count at which a node resting at `level` is next carried upward.
///
/// Bit `level` of `count` must be set. Returns `None` on overflow.
pub fn next_carry_boundary(count: u64, level: usize) -> Option<u64> {
    let level = u32::try_from(level).ok()?;
    if level >= u64::BITS {
        return None;
    }
    let base = count.checked_shr(level)?.checked_add(1)?;
    base.checked_mul(1u64.checked_shl(level)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_only_on_last_leaf_of_interval() {
        assert_eq!(crossing_boundary(0), None);
        assert_eq!(crossing_boundary(1022), None);
        assert_eq!(crossing_boundary(1023), Some(1024));
        assert_eq!(crossing_boundary(1024), None);
        assert_eq!(crossing_boundary(2047), Some(2048));
        assert_eq!(crossing_boundary(u64::MAX), None);
    }

    #[test]
    fn carry_boundary_is_next_flip_of_the_bit() {
        assert_eq!(next_carry_boundary(1024, 10), Some(2048));
        assert_eq!(next_carry_boundary(3 * 1024, 10), Some(4096));
        assert_eq!(next_carry_boundary(3 * 1024, 11), Some(4096));
        assert_eq!(next_carry_boundary(5 * 1024, 12), Some(8192));
        assert_eq!(next_carry_boundary(1 << 63, 63), None);
        assert_eq!(next_carry_boundary(1, 64), None);
    }

    #[test]
    fn boundaries() {
        assert!(!is_boundary(0));
        assert!(is_boundary(MARK_INTERVAL));
        assert!(!is_boundary(MARK_INTERVAL + 1));
    }
}
