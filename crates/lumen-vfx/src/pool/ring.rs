use std::ops::Range;

/// Up to two slot spans touched since the last flush, in upload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRanges {
    spans: [Range<usize>; 2],
    len: usize,
}

impl DirtyRanges {
    fn single(range: Range<usize>) -> Self {
        Self {
            spans: [range, 0..0],
            len: 1,
        }
    }

    /// Wrapped write: the head `[0, cursor)` and the tail `[last, capacity)`.
    /// Empty spans are dropped.
    fn wrapped(head: Range<usize>, tail: Range<usize>) -> Self {
        match (head.is_empty(), tail.is_empty()) {
            (true, _) => Self::single(tail),
            (false, true) => Self::single(head),
            (false, false) => Self {
                spans: [head, tail],
                len: 2,
            },
        }
    }

    pub fn as_slice(&self) -> &[Range<usize>] {
        &self.spans[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + Clone + '_ {
        self.as_slice().iter().cloned()
    }

    /// Number of slots covered.
    pub fn slot_count(&self) -> usize {
        self.iter().map(|r| r.len()).sum()
    }
}

/// Write cursor of the ring buffer plus the bookkeeping needed to upload only
/// what changed.
///
/// `cursor` is the next slot to (over)write and `last_cursor` the cursor at
/// the previous flush; both stay in `[0, capacity)`. Any number of
/// [`RingCursor::advance`] calls between two flushes coalesce into one set of
/// dirty ranges derived from the net movement.
#[derive(Debug, Clone)]
pub struct RingCursor {
    capacity: usize,
    cursor: usize,
    last_cursor: usize,
    /// Slots written since the last flush, saturating at `capacity`.
    pending: usize,
    needs_update: bool,
}

impl RingCursor {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            cursor: 0,
            last_cursor: 0,
            pending: 0,
            needs_update: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_cursor(&self) -> usize {
        self.last_cursor
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Claim the slot at the cursor and move the cursor on, wrapping silently.
    pub fn advance(&mut self) -> usize {
        let slot = self.cursor;
        self.cursor = (self.cursor + 1) % self.capacity;
        self.pending = (self.pending + 1).min(self.capacity);
        self.needs_update = true;
        slot
    }

    /// Force the next flush to upload every slot.
    pub fn mark_all_dirty(&mut self) {
        self.pending = self.capacity;
        self.needs_update = true;
    }

    /// The ranges the next flush would upload, without consuming them.
    pub fn dirty_ranges(&self) -> Option<DirtyRanges> {
        if !self.needs_update {
            return None;
        }
        if self.pending >= self.capacity {
            return Some(DirtyRanges::single(0..self.capacity));
        }
        if self.cursor > self.last_cursor {
            Some(DirtyRanges::single(self.last_cursor..self.cursor))
        } else {
            Some(DirtyRanges::wrapped(
                0..self.cursor,
                self.last_cursor..self.capacity,
            ))
        }
    }

    /// Consume the dirty state: returns the ranges to upload and moves
    /// `last_cursor` up to `cursor`. `None` when nothing changed.
    pub fn take_dirty(&mut self) -> Option<DirtyRanges> {
        let ranges = self.dirty_ranges()?;
        self.last_cursor = self.cursor;
        self.pending = 0;
        self.needs_update = false;
        Some(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance_n(ring: &mut RingCursor, n: usize) {
        for _ in 0..n {
            ring.advance();
        }
    }

    #[test]
    fn fresh_ring_has_nothing_to_flush() {
        let mut ring = RingCursor::new(8);
        assert!(!ring.needs_update());
        assert_eq!(ring.take_dirty(), None);
    }

    #[test]
    fn advance_returns_consecutive_slots_and_wraps() {
        let mut ring = RingCursor::new(3);
        let slots: Vec<usize> = (0..5).map(|_| ring.advance()).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1]);
        assert_eq!(ring.cursor(), 2);
    }

    #[test]
    fn contiguous_write_is_one_range() {
        let mut ring = RingCursor::new(10);
        advance_n(&mut ring, 3);
        ring.take_dirty();
        advance_n(&mut ring, 4);
        let ranges = ring.take_dirty().unwrap();
        assert_eq!(ranges.as_slice(), &[3..7]);
        assert_eq!(ring.last_cursor(), 7);
    }

    #[test]
    fn wrapped_write_is_head_then_tail() {
        let mut ring = RingCursor::new(10);
        advance_n(&mut ring, 8);
        ring.take_dirty();
        advance_n(&mut ring, 5);
        let ranges = ring.take_dirty().unwrap();
        assert_eq!(ranges.as_slice(), &[0..3, 8..10]);
        assert_eq!(ranges.slot_count(), 5);
    }

    #[test]
    fn write_ending_exactly_at_capacity_has_no_empty_head() {
        let mut ring = RingCursor::new(10);
        advance_n(&mut ring, 6);
        ring.take_dirty();
        advance_n(&mut ring, 4);
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.take_dirty().unwrap().as_slice(), &[6..10]);
    }

    #[test]
    fn several_advances_coalesce_into_one_flush() {
        let mut ring = RingCursor::new(16);
        advance_n(&mut ring, 2);
        advance_n(&mut ring, 3);
        advance_n(&mut ring, 1);
        assert_eq!(ring.take_dirty().unwrap().as_slice(), &[0..6]);
        assert_eq!(ring.take_dirty(), None);
    }

    #[test]
    fn full_lap_uploads_everything() {
        let mut ring = RingCursor::new(4);
        advance_n(&mut ring, 1);
        ring.take_dirty();
        advance_n(&mut ring, 4);
        assert_eq!(ring.cursor(), ring.last_cursor());
        assert_eq!(ring.take_dirty().unwrap().as_slice(), &[0..4]);
    }

    #[test]
    fn more_than_a_lap_uploads_everything() {
        let mut ring = RingCursor::new(5);
        advance_n(&mut ring, 1);
        ring.take_dirty();
        advance_n(&mut ring, 7);
        assert_eq!(ring.cursor(), 3);
        assert_eq!(ring.take_dirty().unwrap().as_slice(), &[0..5]);
    }

    #[test]
    fn mark_all_dirty_covers_capacity() {
        let mut ring = RingCursor::new(6);
        ring.mark_all_dirty();
        assert_eq!(ring.dirty_ranges().unwrap().as_slice(), &[0..6]);
    }

    #[test]
    fn cursors_stay_in_bounds() {
        let mut ring = RingCursor::new(7);
        for step in 1..50 {
            advance_n(&mut ring, step % 5);
            if step % 3 == 0 {
                ring.take_dirty();
            }
            assert!(ring.cursor() < 7);
            assert!(ring.last_cursor() < 7);
        }
    }
}
