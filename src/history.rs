//! Fixed-capacity history of probe outcomes.
//!
//! The ring never allocates after construction. Its write cursor only grows;
//! the storage slot is the cursor modulo the capacity. The ring does no
//! locking of its own, callers serialize `record` and `snapshot`.

use crate::outcome::Outcome;

/// Number of outcomes kept for display.
pub const HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct HistoryRing<const N: usize = HISTORY_CAPACITY> {
    slots: [Outcome; N],
    w_idx: u64,
}

impl<const N: usize> Default for HistoryRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HistoryRing<N> {
    pub fn new() -> Self {
        assert!(N > 0, "history capacity must be greater than 0");
        Self {
            slots: [Outcome::default(); N],
            w_idx: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of valid entries, `min(w_idx, N)`.
    pub fn len(&self) -> usize {
        self.w_idx.min(N as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.w_idx == 0
    }

    pub fn record(&mut self, outcome: Outcome) {
        let slot = (self.w_idx % N as u64) as usize;
        self.slots[slot] = outcome;
        self.w_idx += 1;
    }

    /// Valid entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> + '_ {
        let len = self.len();
        // Once wrapped, the oldest entry sits where the next write will land.
        let start = if self.w_idx < N as u64 {
            0
        } else {
            (self.w_idx % N as u64) as usize
        };
        (0..len).map(move |i| &self.slots[(start + i) % N])
    }

    pub fn snapshot(&self) -> Vec<Outcome> {
        self.iter().copied().collect()
    }
}
