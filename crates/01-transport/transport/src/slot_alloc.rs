//! Handle allocator backed by an intrusive free list.
//!
//! Every resource handed out by a subsystem front end is identified by a
//! `u32` slot. Slot 0 is the null slot: it is never allocated and doubles as
//! the free-list terminator. Freed slots are reused LIFO.
//!
//! The allocator is single-owner. It lives on the producer side of a
//! subsystem and every mutating method takes `&mut self`; sharing it between
//! producers requires external serialization.

/// Reserved slot value that never identifies a live resource.
pub const NULL_SLOT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlotEntry {
    next: u32,
    used: bool,
}

/// Free-list slot allocator with transparent doubling growth.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    entries: Vec<SlotEntry>,
    head: u32,
    used: usize,
}

impl SlotAllocator {
    /// Creates an allocator covering slots `1..capacity`.
    ///
    /// Capacities below 2 are raised to 2 so the first allocation succeeds
    /// without growing.
    pub fn new(capacity: u32) -> Self {
        let mut alloc = Self {
            entries: vec![SlotEntry {
                next: NULL_SLOT,
                used: true,
            }],
            head: NULL_SLOT,
            used: 0,
        };
        alloc.extend_to(capacity.max(2));
        alloc
    }

    /// Number of slots tracked, including the reserved null slot.
    pub fn capacity(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Number of slots currently handed out.
    pub fn used_count(&self) -> usize {
        self.used
    }

    /// Returns `true` when `slot` is currently allocated.
    pub fn is_used(&self, slot: u32) -> bool {
        slot != NULL_SLOT
            && self
                .entries
                .get(slot as usize)
                .map(|entry| entry.used)
                .unwrap_or(false)
    }

    /// Pops the head of the free list, doubling the table when it is empty.
    pub fn allocate(&mut self) -> u32 {
        if self.head == NULL_SLOT {
            let grown = self.capacity().saturating_mul(2);
            assert!(
                grown > self.capacity(),
                "slot allocator exhausted the u32 slot space"
            );
            self.extend_to(grown);
        }

        let slot = self.head;
        let entry = &mut self.entries[slot as usize];
        debug_assert!(!entry.used, "free list head {slot} is marked used");
        self.head = entry.next;
        entry.next = NULL_SLOT;
        entry.used = true;
        self.used += 1;
        slot
    }

    /// Returns `slot` to the free list.
    ///
    /// Releasing the null slot, an out-of-range slot or a slot that is already
    /// free returns `false` and leaves the allocator untouched.
    pub fn release(&mut self, slot: u32) -> bool {
        if slot == NULL_SLOT {
            return false;
        }
        let head = self.head;
        let Some(entry) = self.entries.get_mut(slot as usize) else {
            return false;
        };
        if !entry.used {
            return false;
        }
        entry.used = false;
        entry.next = head;
        self.head = slot;
        self.used -= 1;
        true
    }

    fn extend_to(&mut self, capacity: u32) {
        let old = self.capacity();
        if capacity <= old {
            return;
        }
        // Link the new region in ascending order ahead of the current head so
        // fresh tables hand out 1, 2, 3, ...
        for slot in old..capacity {
            let next = if slot + 1 < capacity {
                slot + 1
            } else {
                self.head
            };
            self.entries.push(SlotEntry { next, used: false });
        }
        self.head = old;
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new(64)
    }
}
