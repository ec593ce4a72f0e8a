//! N-way rotating storage separating written state from published state.
//!
//! The owning thread writes the back buffer and calls `swap_buffers` once per
//! tick; the buffer it just wrote becomes the front buffer that any thread may
//! read, and the back index moves on to the next slot. With `N = 2` the
//! buffers strictly alternate: the writer always receives the buffer that was
//! published two swaps ago.
//!
//! Each slot sits behind a `parking_lot::RwLock`. In steady state the writer
//! and readers hold different slots so the locks are uncontended; a reader
//! that keeps a front guard across a swap only delays the writer when the
//! rotation comes back to that slot.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug)]
struct SwapIndices<const N: usize> {
    front: AtomicUsize,
    back: AtomicUsize,
    swaps: AtomicU64,
}

impl<const N: usize> SwapIndices<N> {
    fn new() -> Self {
        assert!(N >= 2, "multi buffers need at least two slots");
        Self {
            front: AtomicUsize::new(1),
            back: AtomicUsize::new(0),
            swaps: AtomicU64::new(0),
        }
    }

    fn front(&self) -> usize {
        self.front.load(Ordering::Acquire)
    }

    fn back(&self) -> usize {
        self.back.load(Ordering::Relaxed)
    }

    fn swap(&self) -> u64 {
        let written = self.back.load(Ordering::Relaxed);
        self.back.store((written + 1) % N, Ordering::Relaxed);
        self.front.store(written, Ordering::Release);
        self.swaps.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn swaps(&self) -> u64 {
        self.swaps.load(Ordering::Acquire)
    }
}

/// Rotating set of `N` values of type `T`.
#[derive(Debug)]
pub struct MultiBuffer<T, const N: usize = 2> {
    slots: [RwLock<T>; N],
    indices: SwapIndices<N>,
}

impl<T: Clone, const N: usize> MultiBuffer<T, N> {
    /// Fills every slot with `value`.
    pub fn new(value: T) -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(value.clone())),
            indices: SwapIndices::new(),
        }
    }
}

impl<T, const N: usize> MultiBuffer<T, N> {
    /// Write access to the slot being filled this tick. Owner thread only.
    pub fn backbuffer(&self) -> RwLockWriteGuard<'_, T> {
        self.slots[self.indices.back()].write()
    }

    /// Read access to the most recently published slot.
    pub fn frontbuffer(&self) -> RwLockReadGuard<'_, T> {
        self.slots[self.indices.front()].read()
    }

    /// Publishes the back buffer and returns the new swap count. Owner thread only.
    pub fn swap_buffers(&self) -> u64 {
        self.indices.swap()
    }

    /// Number of swaps performed so far.
    pub fn swaps(&self) -> u64 {
        self.indices.swaps()
    }
}

impl<T: Default, const N: usize> Default for MultiBuffer<T, N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(T::default())),
            indices: SwapIndices::new(),
        }
    }
}

/// Rotating set of `N` independently growable arrays.
#[derive(Debug)]
pub struct MultiArrayBuffer<T, const N: usize = 2> {
    slots: [RwLock<Vec<T>>; N],
    indices: SwapIndices<N>,
}

impl<T: Default + Clone, const N: usize> MultiArrayBuffer<T, N> {
    /// Creates the buffer with every slot sized to `size` default elements.
    pub fn with_len(size: usize) -> Self {
        let buffer = Self::default();
        buffer.init(size);
        buffer
    }

    /// Resizes every slot to `size`, default-filling any new tail.
    pub fn init(&self, size: usize) {
        for slot in &self.slots {
            slot.write().resize(size, T::default());
        }
    }

    /// Grows only the back buffer to at least `size` elements.
    pub fn grow(&self, size: usize) {
        let mut back = self.backbuffer();
        if back.len() < size {
            back.resize(size, T::default());
        }
    }
}

impl<T, const N: usize> MultiArrayBuffer<T, N> {
    /// Write access to the array being filled this tick. Owner thread only.
    pub fn backbuffer(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.slots[self.indices.back()].write()
    }

    /// Read access to the most recently published array.
    pub fn frontbuffer(&self) -> MappedRwLockReadGuard<'_, [T]> {
        RwLockReadGuard::map(self.slots[self.indices.front()].read(), |v| v.as_slice())
    }

    /// Publishes the back array and returns the new swap count. Owner thread only.
    pub fn swap_buffers(&self) -> u64 {
        self.indices.swap()
    }

    /// Number of swaps performed so far.
    pub fn swaps(&self) -> u64 {
        self.indices.swaps()
    }
}

impl<T, const N: usize> Default for MultiArrayBuffer<T, N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(Vec::new())),
            indices: SwapIndices::new(),
        }
    }
}
