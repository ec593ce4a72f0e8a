//! Growable resource table indexed by slot.
//!
//! Backends keep their native objects here, keyed by the slot the producer
//! allocated. Only the consumer thread touches a pool, and it grows the table
//! on the same thread that writes the record, strictly before anything about
//! that slot is published elsewhere.

/// Slot-indexed table of default-initialised records.
#[derive(Debug, Clone)]
pub struct ResPool<T> {
    records: Vec<T>,
}

impl<T: Default> ResPool<T> {
    /// Allocates `reserved` default records.
    pub fn with_capacity(reserved: usize) -> Self {
        let mut records = Vec::with_capacity(reserved);
        records.resize_with(reserved, T::default);
        Self { records }
    }

    /// Ensures `min_capacity` is a valid index.
    ///
    /// A no-op while the capacity exceeds `min_capacity`; otherwise the table
    /// grows to twice the requested minimum, keeping existing records in place
    /// and default-filling the new tail.
    pub fn grow(&mut self, min_capacity: usize) {
        if self.records.len() > min_capacity {
            return;
        }
        let target = min_capacity.saturating_mul(2).max(1);
        self.records.resize_with(target, T::default);
    }

    /// Stores `record` at `slot`, growing first when needed.
    pub fn insert(&mut self, record: T, slot: u32) {
        self.grow(slot as usize);
        self.records[slot as usize] = record;
    }

    /// Resets `slot` to its default record and returns the previous one.
    pub fn take(&mut self, slot: u32) -> Option<T> {
        self.records.get_mut(slot as usize).map(std::mem::take)
    }

    /// Mutable access that grows the table so `slot` is always addressable.
    pub fn get_or_grow(&mut self, slot: u32) -> &mut T {
        self.grow(slot as usize);
        &mut self.records[slot as usize]
    }
}

impl<T> ResPool<T> {
    /// Number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Record at `slot`, or `None` when the slot lies beyond the table.
    pub fn get(&self, slot: u32) -> Option<&T> {
        self.records.get(slot as usize)
    }

    /// Mutable record at `slot`, or `None` when the slot lies beyond the table.
    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.records.get_mut(slot as usize)
    }

    /// Iterates `(slot, record)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.records
            .iter()
            .enumerate()
            .map(|(slot, record)| (slot as u32, record))
    }
}

impl<T: Default> Default for ResPool<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
