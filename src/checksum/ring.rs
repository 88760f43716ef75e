//! Fixed-capacity history of per-frame checksums.
//!
//! [`ChecksumRing`] keeps the most recent `capacity` `(frame, checksum)`
//! pairs. The write position is monotonically increasing; the slot index is
//! `pos % capacity`, so the oldest entry is always the one evicted.

/// A `(frame, checksum)` pair.
pub type ChecksumEntry = (u32, u32);

/// Ring buffer of frame checksums with strict FIFO eviction.
#[derive(Clone, Debug)]
pub struct ChecksumRing {
    slots: Box<[Option<ChecksumEntry>]>,
    write_pos: u64,
}

impl ChecksumRing {
    /// Ring holding up to `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)].into_boxed_slice(),
            write_pos: 0,
        }
    }

    /// Record the checksum for `frame`, evicting the oldest entry when full.
    ///
    /// Returns the evicted entry, if any.
    pub fn record(&mut self, frame: u32, checksum: u32) -> Option<ChecksumEntry> {
        let idx = (self.write_pos % self.slots.len() as u64) as usize;
        let evicted = self.slots[idx].replace((frame, checksum));
        self.write_pos += 1;
        evicted
    }

    /// Checksum recorded for `frame`.
    ///
    /// Returns `None` if the frame was never recorded or has been evicted.
    /// If a frame was recorded more than once, the newest entry wins.
    pub fn lookup(&self, frame: u32) -> Option<u32> {
        self.iter()
            .rev()
            .find(|&(f, _)| f == frame)
            .map(|(_, checksum)| checksum)
    }

    /// Most recently recorded entry.
    pub fn latest(&self) -> Option<ChecksumEntry> {
        if self.write_pos == 0 {
            return None;
        }
        let idx = ((self.write_pos - 1) % self.slots.len() as u64) as usize;
        self.slots[idx]
    }

    /// Oldest retained entry.
    pub fn oldest(&self) -> Option<ChecksumEntry> {
        self.iter().next()
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ChecksumEntry> + '_ {
        let cap = self.slots.len() as u64;
        let start = self.write_pos.saturating_sub(cap);
        (start..self.write_pos).filter_map(move |pos| self.slots[(pos % cap) as usize])
    }

    /// Number of entries currently stored (up to `capacity`).
    pub fn len(&self) -> usize {
        (self.write_pos as usize).min(self.slots.len())
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// The ring capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total entries ever recorded.
    pub fn write_pos(&self) -> u64 {
        self.write_pos
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty() {
        let ring = ChecksumRing::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.latest(), None);
        assert_eq!(ring.lookup(0), None);
    }

    #[test]
    fn test_record_and_lookup() {
        let mut ring = ChecksumRing::new(4);
        for frame in 0..3 {
            assert_eq!(ring.record(frame, frame * 10), None);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.lookup(1), Some(10));
        assert_eq!(ring.latest(), Some((2, 20)));
        assert_eq!(ring.lookup(3), None);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut ring = ChecksumRing::new(3);
        for frame in 0..3 {
            ring.record(frame, frame + 100);
        }
        assert_eq!(ring.record(3, 103), Some((0, 100)));
        assert_eq!(ring.lookup(0), None);
        assert_eq!(ring.oldest(), Some((1, 101)));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut ring = ChecksumRing::new(0);
        assert_eq!(ring.capacity(), 1);
        ring.record(5, 1);
        ring.record(6, 2);
        assert_eq!(ring.lookup(5), None);
        assert_eq!(ring.lookup(6), Some(2));
    }

    #[test]
    fn test_clear() {
        let mut ring = ChecksumRing::new(2);
        ring.record(1, 1);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.lookup(1), None);
    }

    proptest! {
        #[test]
        fn test_retains_exactly_last_capacity(cap in 1usize..16, n in 0u32..64) {
            let mut ring = ChecksumRing::new(cap);
            for frame in 0..n {
                ring.record(frame, frame.wrapping_mul(31));
            }
            let kept = (n as usize).min(cap) as u32;
            for frame in 0..n {
                let expected = (frame >= n - kept).then(|| frame.wrapping_mul(31));
                prop_assert_eq!(ring.lookup(frame), expected);
            }
            let frames: Vec<u32> = ring.iter().map(|(f, _)| f).collect();
            prop_assert_eq!(frames, (n - kept..n).collect::<Vec<_>>());
        }
    }
}
