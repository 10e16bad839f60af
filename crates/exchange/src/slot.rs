//! Single-value exchange cell.
//!
//! A [`Slot`] holds the latest value of one channel. The producer overwrites
//! it in place under the slot lock and raises the readiness flag; the
//! consumer copies it out under the same lock and lowers the flag. Holding
//! the lock across both copies is what rules out torn reads. The flag is
//! also read without the lock so that a poll with nothing new never
//! contends with the producer.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ChannelKind, Shape};

use crate::{BridgeError, ReduceError, Result};

/// Owned element buffer sized exactly to its shape
#[derive(Debug, Default)]
pub struct SlotBuffer<T> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Copy + Default> SlotBuffer<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            shape: Shape::default(),
        }
    }

    /// Adopt `shape`, reallocating only when the element count changes.
    ///
    /// Returns `true` if the buffer was reallocated.
    pub fn ensure_shape(&mut self, shape: Shape) -> bool {
        let len = shape.len();
        self.shape = shape;
        if self.data.len() == len {
            return false;
        }
        // Exact size, no headroom
        self.data = vec![T::default(); len];
        true
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Heap bytes currently held
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    /// Free the buffer and forget the shape
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.shape = Shape::default();
    }
}

/// Per-slot counters
#[derive(Debug, Default)]
pub struct SlotStats {
    pub stored: AtomicU64,
    pub taken: AtomicU64,
    /// Values replaced before anyone took them
    pub overwritten: AtomicU64,
    pub reallocations: AtomicU64,
    pub too_small: AtomicU64,
}

impl SlotStats {
    pub fn snapshot(&self) -> SlotStatsSnapshot {
        SlotStatsSnapshot {
            stored: self.stored.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            reallocations: self.reallocations.load(Ordering::Relaxed),
            too_small: self.too_small.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.stored.store(0, Ordering::Relaxed);
        self.taken.store(0, Ordering::Relaxed);
        self.overwritten.store(0, Ordering::Relaxed);
        self.reallocations.store(0, Ordering::Relaxed);
        self.too_small.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`SlotStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStatsSnapshot {
    pub stored: u64,
    pub taken: u64,
    pub overwritten: u64,
    pub reallocations: u64,
    pub too_small: u64,
}

/// Latest-value exchange cell for one channel
pub struct Slot<T> {
    kind: ChannelKind,
    ready: AtomicBool,
    inner: Mutex<SlotBuffer<T>>,
    stats: SlotStats,
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("kind", &self.kind)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl<T: Copy + Default> Slot<T> {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            ready: AtomicBool::new(false),
            inner: Mutex::new(SlotBuffer::new()),
            stats: SlotStats::default(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Copy `data` into the slot and mark it ready.
    ///
    /// `data.len()` must equal `shape.len()`; a mismatch is rejected before
    /// the slot is touched.
    pub fn store(&self, data: &[T], shape: Shape) -> Result<()> {
        if data.len() != shape.len() {
            return Err(BridgeError::InvalidSample {
                channel: self.kind,
                source: ReduceError::LengthMismatch {
                    expected: shape.len(),
                    actual: data.len(),
                },
            });
        }
        self.store_with(shape, |dst| dst.copy_from_slice(data));
        Ok(())
    }

    /// Fill the slot in place under the lock and mark it ready.
    ///
    /// `fill` receives a buffer of exactly `shape.len()` elements and must
    /// not fail; validate the sample before calling.
    pub fn store_with<F>(&self, shape: Shape, fill: F)
    where
        F: FnOnce(&mut [T]),
    {
        let (reallocated, bytes, was_ready) = {
            let mut buf = self.lock();
            let reallocated = buf.ensure_shape(shape);
            fill(buf.as_mut_slice());
            // Raised after the copy and before unlocking, so a take never
            // sees the flag for a value it already consumed.
            let was_ready = self.ready.swap(true, Ordering::AcqRel);
            (reallocated, buf.byte_len(), was_ready)
        };

        self.stats.stored.fetch_add(1, Ordering::Relaxed);
        observability::record_sample_stored(self.kind);
        if was_ready {
            self.stats.overwritten.fetch_add(1, Ordering::Relaxed);
            observability::record_sample_overwritten(self.kind);
        }
        if reallocated {
            self.stats.reallocations.fetch_add(1, Ordering::Relaxed);
            observability::record_reallocation(self.kind, bytes);
            tracing::debug!(channel = %self.kind, %shape, bytes, "slot buffer reallocated");
        }
    }

    /// Copy the latest value into `dst` and clear readiness.
    ///
    /// Returns the number of elements written. Nothing is written on error.
    pub fn try_take(&self, dst: &mut [T]) -> Result<usize> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(self.not_ready());
        }

        let copied = {
            let buf = self.lock();
            let src = buf.as_slice();
            if src.is_empty() {
                return Err(self.not_ready());
            }
            if dst.len() < src.len() {
                self.stats.too_small.fetch_add(1, Ordering::Relaxed);
                return Err(BridgeError::DestinationTooSmall {
                    channel: self.kind,
                    required: src.len(),
                    capacity: dst.len(),
                });
            }
            dst[..src.len()].copy_from_slice(src);
            self.ready.store(false, Ordering::Release);
            src.len()
        };

        self.stats.taken.fetch_add(1, Ordering::Relaxed);
        observability::record_sample_taken(self.kind, copied);
        tracing::trace!(channel = %self.kind, copied, "slot taken");
        Ok(copied)
    }

    /// Shape of the last stored value (zero if never stored)
    pub fn dimensions(&self) -> Shape {
        self.lock().shape()
    }

    /// Lock-free readiness check
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Free the buffer, clear readiness and counters
    pub fn reset(&self) {
        let mut buf = self.lock();
        buf.release();
        self.ready.store(false, Ordering::Release);
        self.stats.reset();
    }

    pub fn stats(&self) -> SlotStatsSnapshot {
        self.stats.snapshot()
    }

    #[inline]
    fn not_ready(&self) -> BridgeError {
        BridgeError::NotReady { channel: self.kind }
    }

    // The buffer holds plain elements that are valid after any partial
    // write, so a panic while holding the lock leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, SlotBuffer<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
