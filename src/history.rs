//! Fixed-capacity circular history of per-cycle mean distances.

pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer {
    slots: Box<[f64]>,
    cursor: usize,
    written: usize,
}

/// Owned copy of every slot plus the cursor at the time of the copy.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub values: Vec<f64>,
    pub cursor: usize,
    /// Slots holding a real value; the rest are still at their initial zero.
    pub written: usize,
}

impl RingBuffer {
    /// Create an empty buffer. A zero capacity is bumped to one slot so the
    /// cursor invariant `cursor < capacity` always holds.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)].into_boxed_slice(),
            cursor: 0,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot the next push will overwrite.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of slots written so far, saturating at capacity.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn push(&mut self, value: f64) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.written = (self.written + 1).min(self.slots.len());
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            values: self.slots.to_vec(),
            cursor: self.cursor,
            written: self.written,
        }
    }

    /// Written slots, oldest first.
    pub fn chronological(&self) -> Vec<f64> {
        chronological(&self.slots[..], self.cursor, self.written)
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistorySnapshot {
    /// Written slots, oldest first.
    pub fn chronological(&self) -> Vec<f64> {
        chronological(&self.values, self.cursor, self.written.min(self.values.len()))
    }
}

fn chronological(slots: &[f64], cursor: usize, written: usize) -> Vec<f64> {
    let capacity = slots.len();
    if capacity == 0 {
        return Vec::new();
    }
    let start = if written < capacity { 0 } else { cursor };
    (0..written).map(|i| slots[(start + i) % capacity]).collect()
}
