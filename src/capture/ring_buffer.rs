// RingBuffer - fixed-capacity pre-trigger window
//
// Holds the most recent samples seen while the detector is armed. Slots start
// empty and are only ever filled by `push`, so a fresh buffer never yields
// values from an earlier session. Chronological order is
// [cursor, cursor + 1, ..., cursor - 1] modulo capacity.

/// Circular store that overwrites its oldest entry once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    cursor: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create an empty buffer
    ///
    /// A capacity of 0 is allowed and disables the window: pushes are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Next slot to be written
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Store `item`, overwriting the oldest entry when full. Never fails.
    pub fn push(&mut self, item: T) {
        if self.slots.is_empty() {
            return;
        }
        self.slots[self.cursor] = Some(item);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Filled slots, oldest first
    pub fn iter_ordered(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer.iter()).filter_map(Option::as_ref)
    }

    /// Copy of the filled slots, oldest first
    pub fn read_ordered(&self) -> Vec<T> {
        self.iter_ordered().cloned().collect()
    }

    /// Drain into an oldest-first vector, leaving every slot empty
    pub fn take_ordered(&mut self) -> Vec<T> {
        let cursor = self.cursor;
        let mut ordered = Vec::with_capacity(self.slots.len());
        ordered.extend(self.slots[cursor..].iter_mut().filter_map(Option::take));
        ordered.extend(self.slots[..cursor].iter_mut().filter_map(Option::take));
        self.cursor = 0;
        ordered
    }

    /// Empty every slot and rewind the cursor
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
    }
}
