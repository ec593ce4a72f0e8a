//! Fixed-capacity single-producer/single-consumer command ring.
//!
//! The ring carries typed, move-only records from one producer thread to one
//! consumer thread. `put_pos` (head) is written only by the producer and
//! `get_pos` (tail) only by the consumer; both are free-running counters
//! reduced modulo the capacity on access, so a full ring
//! (`head - tail == capacity`) is distinguishable from an empty one.
//!
//! Publication order: the producer writes the record into its slot before the
//! Release store of `head`; the consumer's Acquire load of `head` therefore
//! observes the complete record. The consumer moves the record out before its
//! Release store of `tail`, which the producer Acquire-loads before reusing
//! the slot.

use crate::{TransportError, TransportResult};
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;

#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(feature = "loom")]
use loom::sync::Arc;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::Arc;

/// Result of a non-blocking put.
#[derive(Debug, PartialEq, Eq)]
pub enum RingPush<T> {
    /// The record was enqueued.
    Ok,
    /// The ring is full; the record is handed back untouched.
    WouldBlock(T),
}

struct Shared<T> {
    capacity: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: each slot is accessed by exactly one side at a time, as arbitrated by
// the head/tail protocol described in the module docs. Records only cross
// threads by value, so `T: Send` is sufficient.
unsafe impl<T: Send> Send for Shared<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    fn slot(&self, pos: usize) -> *mut MaybeUninit<T> {
        self.slots[pos % self.capacity].get()
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        let mut tail = self.tail.load(Ordering::Relaxed);
        while tail != head {
            // SAFETY: positions in `tail..head` hold initialised records that
            // were never moved out, and no other handle to the ring remains.
            unsafe { (*self.slot(tail)).assume_init_drop() };
            tail = tail.wrapping_add(1);
        }
    }
}

/// Unsplit command ring; call [`CmdRing::split`] to obtain the two endpoints.
pub struct CmdRing<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CmdRing<T> {
    /// Allocates a ring holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> TransportResult<Self> {
        if capacity == 0 {
            return Err(TransportError::InvalidCapacity {
                requested: capacity,
                minimum: 1,
            });
        }
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            shared: Arc::new(Shared {
                capacity,
                head: AtomicUsize::new(0),
                tail: AtomicUsize::new(0),
                slots,
            }),
        })
    }

    /// Splits the ring into its producer and consumer halves.
    pub fn split(self) -> (RingProducer<T>, RingConsumer<T>) {
        (
            RingProducer {
                shared: Arc::clone(&self.shared),
            },
            RingConsumer {
                shared: self.shared,
            },
        )
    }
}

/// Producer half of a [`CmdRing`].
pub struct RingProducer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> RingProducer<T> {
    /// Maximum number of records in flight.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Records written but not yet taken by the consumer.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` when the consumer has drained every record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues `item` unless the ring is full.
    pub fn try_put(&mut self, item: T) -> RingPush<T> {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        let tail = shared.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= shared.capacity {
            return RingPush::WouldBlock(item);
        }

        // SAFETY: `head - tail < capacity`, so the slot at `head` is not
        // visible to the consumer and holds no live record.
        unsafe { (*shared.slot(head)).write(item) };
        shared.head.store(head.wrapping_add(1), Ordering::Release);
        RingPush::Ok
    }

    /// Enqueues `item`, yielding the thread until the consumer frees a slot.
    ///
    /// Never overwrites an unread record.
    pub fn put(&mut self, item: T) {
        let mut pending = item;
        let mut backoff = Backoff::default();
        loop {
            match self.try_put(pending) {
                RingPush::Ok => return,
                RingPush::WouldBlock(item) => {
                    pending = item;
                    backoff.snooze();
                }
            }
        }
    }
}

/// Consumer half of a [`CmdRing`].
pub struct RingConsumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> RingConsumer<T> {
    /// Maximum number of records in flight.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Records ready to be taken.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` when no record is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the oldest record, or `None` when the ring is empty.
    pub fn get(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);
        let head = shared.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        // SAFETY: `tail != head`, so the slot holds a record published by the
        // producer's Release store of `head`, and it is moved out exactly once.
        let item = unsafe { (*shared.slot(tail)).assume_init_read() };
        shared.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Peeks at the oldest record without taking it.
    pub fn check(&self) -> Option<&T> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);
        let head = shared.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        // SAFETY: the record stays in place until this consumer advances
        // `tail`, which requires `&mut self`.
        Some(unsafe { (*shared.slot(tail)).assume_init_ref() })
    }
}

impl<T> fmt::Debug for RingProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

impl<T> fmt::Debug for RingConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[derive(Default)]
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    fn snooze(&mut self) {
        #[cfg(feature = "loom")]
        {
            loom::thread::yield_now();
        }
        #[cfg(not(feature = "loom"))]
        {
            if self.step <= Self::SPIN_LIMIT {
                for _ in 0..(1 << self.step) {
                    std::hint::spin_loop();
                }
            } else if self.step <= Self::YIELD_LIMIT {
                std::thread::yield_now();
            } else {
                std::thread::sleep(std::time::Duration::from_micros(50));
            }
        }
        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }
}
