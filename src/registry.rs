//! Per-allocator bookkeeping of outstanding blocks.
//!
//! Slots are append-only: a released slot stays behind as a tombstone and is
//! never handed out again, so slot `i` refers to the same logical block in
//! every registry driven by the same step sequence.

use crate::error::BenchError;

#[derive(Debug)]
pub struct LiveBlockRegistry<H> {
    slots: Vec<Option<H>>,
    capacity: usize,
    live: usize,
}

impl<H> LiveBlockRegistry<H> {
    /// Creates a registry that can hold `capacity` allocations over its lifetime.
    pub fn with_capacity(capacity: usize) -> Self {
        LiveBlockRegistry {
            slots: Vec::with_capacity(capacity),
            capacity,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn has_live_blocks(&self) -> bool {
        self.live != 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Index the next appended block will land at.
    pub fn cursor(&self) -> usize {
        self.slots.len()
    }

    /// Stores `handle` in the next unused slot and returns that slot's index.
    pub fn append(&mut self, handle: H) -> Result<usize, BenchError> {
        if self.is_full() {
            return Err(BenchError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let index = self.slots.len();
        self.slots.push(Some(handle));
        self.live += 1;
        Ok(index)
    }

    /// Returns the slot index of the `rank`-th live block, counting live slots
    /// in increasing index order from zero.
    ///
    /// This walks every slot ever appended, tombstones included.
    pub fn rank_to_index(&self, rank: usize) -> Result<usize, BenchError> {
        let out_of_range = BenchError::RankOutOfRange {
            rank,
            live: self.live,
        };
        if rank >= self.live {
            return Err(out_of_range);
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .nth(rank)
            .map(|(index, _)| index)
            .ok_or(out_of_range)
    }

    pub fn is_live(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Tombstones `index` and hands back the block it held.
    ///
    /// Returns `None` if the slot was never written or is already a tombstone;
    /// the live count is untouched in that case.
    pub fn release(&mut self, index: usize) -> Option<H> {
        let handle = self.slots.get_mut(index)?.take()?;
        self.live -= 1;
        Some(handle)
    }

    /// Tombstones every live slot, yielding the blocks in slot order.
    pub fn drain(&mut self) -> impl Iterator<Item = H> + '_ {
        self.live = 0;
        self.slots.iter_mut().filter_map(Option::take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(n: usize) -> LiveBlockRegistry<usize> {
        let mut r = LiveBlockRegistry::with_capacity(n);
        for i in 0..n {
            assert_eq!(r.append(i * 10).unwrap(), i);
        }
        r
    }

    #[test]
    fn append_advances_cursor() {
        let mut r = LiveBlockRegistry::with_capacity(3);
        assert!(!r.has_live_blocks());
        assert_eq!(r.append('a').unwrap(), 0);
        assert_eq!(r.append('b').unwrap(), 1);
        assert_eq!(r.cursor(), 2);
        assert_eq!(r.live_count(), 2);
    }

    #[test]
    fn append_past_capacity() {
        let mut r = filled(2);
        assert_eq!(r.append(0), Err(BenchError::CapacityExceeded { capacity: 2 }));
        assert_eq!(r.live_count(), 2);
    }

    #[test]
    fn rank_skips_tombstones() {
        let mut r = filled(5);
        assert_eq!(r.release(0), Some(0));
        assert_eq!(r.release(2), Some(20));

        assert_eq!(r.rank_to_index(0).unwrap(), 1);
        assert_eq!(r.rank_to_index(1).unwrap(), 3);
        assert_eq!(r.rank_to_index(2).unwrap(), 4);
    }

    #[test]
    fn rank_out_of_range() {
        let r = filled(2);
        assert_eq!(
            r.rank_to_index(3),
            Err(BenchError::RankOutOfRange { rank: 3, live: 2 })
        );
        assert_eq!(
            r.rank_to_index(2),
            Err(BenchError::RankOutOfRange { rank: 2, live: 2 })
        );
        println!("{}", r.rank_to_index(3).unwrap_err());
    }

    #[test]
    fn released_slot_is_never_selected_again() {
        let mut r = filled(5);
        let freed = r.rank_to_index(2).unwrap();
        r.release(freed).unwrap();
        assert_eq!(r.live_count(), 4);
        for rank in 0..4 {
            assert_ne!(r.rank_to_index(rank).unwrap(), freed);
        }
        assert_eq!(r.release(freed), None);
        assert_eq!(r.live_count(), 4);
    }

    #[test]
    fn tombstones_still_consume_capacity() {
        let mut r = filled(2);
        r.release(1).unwrap();
        assert!(r.append(7).is_err());
        assert_eq!(r.cursor(), 2);
    }

    #[test]
    fn drain_empties_everything() {
        let mut r = filled(4);
        r.release(1).unwrap();
        let rest: Vec<_> = r.drain().collect();
        assert_eq!(rest, vec![0, 20, 30]);
        assert_eq!(r.live_count(), 0);
        assert!(!r.is_live(0));
        assert_eq!(r.drain().count(), 0);
    }

    proptest! {
        #[test]
        fn rank_bounds_match_live_extremes(
            ops in proptest::collection::vec(any::<(bool, u8)>(), 1..200)
        ) {
            let mut r = LiveBlockRegistry::with_capacity(ops.len());
            let mut appended = 0usize;
            let mut released = 0usize;
            for (alloc, pick) in ops {
                if alloc || !r.has_live_blocks() {
                    r.append(()).unwrap();
                    appended += 1;
                } else {
                    let rank = pick as usize % r.live_count();
                    let index = r.rank_to_index(rank).unwrap();
                    prop_assert!(r.is_live(index));
                    r.release(index).unwrap();
                    released += 1;
                }
                prop_assert_eq!(r.live_count(), appended - released);

                let live: Vec<usize> = (0..r.cursor()).filter(|&i| r.is_live(i)).collect();
                if let (Some(first), Some(last)) = (live.first(), live.last()) {
                    prop_assert_eq!(r.rank_to_index(0).unwrap(), *first);
                    prop_assert_eq!(r.rank_to_index(r.live_count() - 1).unwrap(), *last);
                }
            }
        }
    }
}
