//! Fixed-capacity IMU sample ring.
//!
//! Appending to a full ring overwrites the oldest sample. A drain returns
//! the newest `min(max, count)` samples oldest first and then empties the
//! ring; samples beyond `max` are discarded, not kept for the next drain.

use std::fmt;

use contracts::{ImuSample, IMU_WIRE_LEN};
use ringbuf::{traits::*, HeapRb};

pub struct ImuRing {
    rb: HeapRb<ImuSample>,
    overwritten_count: u64,
    discarded_count: u64,
}

impl fmt::Debug for ImuRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImuRing")
            .field("len", &self.rb.occupied_len())
            .field("capacity", &self.capacity())
            .field("overwritten", &self.overwritten_count)
            .field("discarded", &self.discarded_count)
            .finish()
    }
}

impl ImuRing {
    /// Create a ring holding up to `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            rb: HeapRb::new(capacity.max(1)),
            overwritten_count: 0,
            discarded_count: 0,
        }
    }

    /// Append one sample, overwriting the oldest when full
    #[inline]
    pub fn append(&mut self, sample: ImuSample) {
        if self.rb.push_overwrite(sample).is_some() {
            self.overwritten_count += 1;
            observability::record_imu_overwritten(1);
        }
    }

    /// Return up to `max` of the newest samples, oldest first, and empty
    /// the ring.
    pub fn drain(&mut self, max: usize) -> Vec<ImuSample> {
        let count = self.rb.occupied_len();
        let n = max.min(count);
        let skip = count - n;
        let samples: Vec<ImuSample> = self.rb.iter().skip(skip).copied().collect();
        self.finish_drain(n, skip);
        samples
    }

    /// Drain into the 7-value wire layout.
    ///
    /// Writes at most `max` samples and never more than `dst` can hold;
    /// returns the number of samples written.
    pub fn drain_into(&mut self, dst: &mut [f64], max: usize) -> usize {
        let count = self.rb.occupied_len();
        let n = max.min(dst.len() / IMU_WIRE_LEN).min(count);
        let skip = count - n;
        for (sample, out) in self
            .rb
            .iter()
            .skip(skip)
            .zip(dst.chunks_exact_mut(IMU_WIRE_LEN))
        {
            sample.write_wire(out);
        }
        self.finish_drain(n, skip);
        n
    }

    fn finish_drain(&mut self, returned: usize, discarded: usize) {
        self.rb.clear();
        if discarded > 0 {
            self.discarded_count += discarded as u64;
            tracing::debug!(returned, discarded, "imu drain discarded older samples");
        }
        observability::record_imu_drain(returned, discarded);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.rb.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.rb.capacity().get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rb.is_empty()
    }

    /// Samples lost to overwrite since creation or the last `clear`
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten_count
    }

    /// Samples lost to short drains since creation or the last `clear`
    pub fn discarded_count(&self) -> u64 {
        self.discarded_count
    }

    /// Empty the ring and reset its counters
    pub fn clear(&mut self) {
        self.rb.clear();
        self.overwritten_count = 0;
        self.discarded_count = 0;
    }
}
