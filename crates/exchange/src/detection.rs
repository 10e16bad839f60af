//! Detection boxes plus the image they were computed on.
//!
//! Boxes and image share one readiness flag. Taking the boxes clears it,
//! which also makes the image unavailable until the next event; reading the
//! image requires the flag but leaves it set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ChannelKind, DetectionBox, DetectionEvent, Shape, BOX_WIRE_LEN, MAX_DETECTION_BOXES};

use crate::slot::SlotBuffer;
use crate::{BridgeError, ReduceError, Result};

const CHANNEL: ChannelKind = ChannelKind::Detection;

#[derive(Debug, Default)]
struct DetectionState {
    boxes: Vec<DetectionBox>,
    image: SlotBuffer<u8>,
}

#[derive(Debug)]
pub struct DetectionStore {
    max_boxes: usize,
    ready: AtomicBool,
    state: Mutex<DetectionState>,
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new(MAX_DETECTION_BOXES)
    }
}

impl DetectionStore {
    /// `max_boxes` is clamped to `1..=256`
    pub fn new(max_boxes: usize) -> Self {
        let max_boxes = max_boxes.clamp(1, MAX_DETECTION_BOXES);
        Self {
            max_boxes,
            ready: AtomicBool::new(false),
            state: Mutex::new(DetectionState {
                boxes: Vec::with_capacity(max_boxes),
                image: SlotBuffer::new(),
            }),
        }
    }

    pub fn max_boxes(&self) -> usize {
        self.max_boxes
    }

    /// Replace the stored boxes with `event`'s and mark the store ready.
    ///
    /// Boxes beyond `max_boxes` are dropped. An event without an image
    /// keeps the previous image.
    pub fn store(&self, event: &DetectionEvent) -> Result<()> {
        let image_shape = match &event.image {
            Some(image) => {
                let shape = Shape::new(image.width, image.height, image.channels);
                if image.data.len() != shape.len() {
                    return Err(BridgeError::InvalidSample {
                        channel: CHANNEL,
                        source: ReduceError::LengthMismatch {
                            expected: shape.len(),
                            actual: image.data.len(),
                        },
                    });
                }
                Some(shape)
            }
            None => None,
        };

        let kept = event.boxes.len().min(self.max_boxes);
        let truncated = kept < event.boxes.len();
        {
            let mut state = self.lock();
            state.boxes.clear();
            state.boxes.extend_from_slice(&event.boxes[..kept]);

            if let (Some(image), Some(shape)) = (&event.image, image_shape) {
                if state.image.ensure_shape(shape) {
                    observability::record_reallocation(CHANNEL, state.image.byte_len());
                }
                state.image.as_mut_slice().copy_from_slice(&image.data);
            }
            if self.ready.swap(true, Ordering::AcqRel) {
                observability::record_sample_overwritten(CHANNEL);
            }
        }

        observability::record_sample_stored(CHANNEL);
        observability::record_detection_boxes(kept, truncated);
        if truncated {
            tracing::debug!(
                received = event.boxes.len(),
                kept,
                "detection boxes truncated"
            );
        }
        Ok(())
    }

    /// Copy up to `dst.len()` boxes and clear readiness.
    ///
    /// A short destination truncates instead of failing.
    pub fn take_boxes(&self, dst: &mut [DetectionBox]) -> Result<usize> {
        self.take_with(|boxes| {
            let n = boxes.len().min(dst.len());
            dst[..n].copy_from_slice(&boxes[..n]);
            n
        })
    }

    /// Copy up to `max` boxes in the 6-integer wire layout and clear
    /// readiness. Never writes past `dst`.
    pub fn take_boxes_wire(&self, dst: &mut [i32], max: usize) -> Result<usize> {
        self.take_with(|boxes| {
            let n = boxes.len().min(max).min(dst.len() / BOX_WIRE_LEN);
            for (b, out) in boxes[..n].iter().zip(dst.chunks_exact_mut(BOX_WIRE_LEN)) {
                out.copy_from_slice(&b.to_wire());
            }
            n
        })
    }

    fn take_with<F>(&self, copy: F) -> Result<usize>
    where
        F: FnOnce(&[DetectionBox]) -> usize,
    {
        if !self.ready.load(Ordering::Acquire) {
            return Err(BridgeError::NotReady { channel: CHANNEL });
        }
        let n = {
            let state = self.lock();
            let n = copy(&state.boxes);
            self.ready.store(false, Ordering::Release);
            n
        };
        observability::record_sample_taken(CHANNEL, n);
        Ok(n)
    }

    /// Copy the snapshot image into `dst` without clearing readiness.
    pub fn read_image(&self, dst: &mut [u8]) -> Result<usize> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(BridgeError::NotReady { channel: CHANNEL });
        }
        let state = self.lock();
        let src = state.image.as_slice();
        if src.is_empty() {
            return Err(BridgeError::NotReady { channel: CHANNEL });
        }
        if dst.len() < src.len() {
            return Err(BridgeError::DestinationTooSmall {
                channel: CHANNEL,
                required: src.len(),
                capacity: dst.len(),
            });
        }
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }

    /// Shape of the last stored image (zero if none)
    pub fn image_shape(&self) -> Shape {
        self.lock().image.shape()
    }

    /// Boxes held by the last event
    pub fn box_count(&self) -> usize {
        self.lock().boxes.len()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.boxes.clear();
        state.image.release();
        self.ready.store(false, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, DetectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
