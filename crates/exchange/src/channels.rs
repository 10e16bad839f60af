//! Shared channel state
//!
//! One instance per bridge, shared between the bridge (consumer side) and
//! the channel drivers (producer side) through an `Arc`. Every field has its
//! own synchronization; there is no lock spanning channels.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::ChannelKind;

use crate::{ChannelRegistry, DetectionStore, ImuRing, Slot};

#[derive(Debug)]
pub struct Channels {
    pub(crate) registry: ChannelRegistry,
    /// Raw stereo frame, side-by-side luma
    pub(crate) frame: Slot<u8>,
    /// Millimeters
    pub(crate) depth: Slot<u16>,
    pub(crate) disparity: Slot<f32>,
    /// Rectified pair, side-by-side luma
    pub(crate) rectified: Slot<u8>,
    /// Interleaved XYZ
    pub(crate) points: Slot<f32>,
    pub(crate) detection: DetectionStore,
    pub(crate) imu: Mutex<ImuRing>,
    callbacks: AtomicU64,
}

impl Channels {
    pub fn new(imu_capacity: usize, max_boxes: usize) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            frame: Slot::new(ChannelKind::Frame),
            depth: Slot::new(ChannelKind::Depth),
            disparity: Slot::new(ChannelKind::Disparity),
            rectified: Slot::new(ChannelKind::Rectified),
            points: Slot::new(ChannelKind::Points),
            detection: DetectionStore::new(max_boxes),
            imu: Mutex::new(ImuRing::new(imu_capacity)),
            callbacks: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub(crate) fn lock_imu(&self) -> MutexGuard<'_, ImuRing> {
        self.imu.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn record_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Camera callbacks since the last reset
    pub fn callback_count(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    /// Disable every channel and free every buffer
    pub(crate) fn reset(&self) {
        self.registry.reset();
        self.frame.reset();
        self.depth.reset();
        self.disparity.reset();
        self.rectified.reset();
        self.points.reset();
        self.detection.reset();
        self.lock_imu().clear();
        self.callbacks.store(0, Ordering::Relaxed);
    }
}
