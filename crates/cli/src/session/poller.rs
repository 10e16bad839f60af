//! Consumer-side polling of every enabled channel.

use std::time::Instant;

use contracts::{ChannelKind, DetectionBox, DeviceSettings, IMU_WIRE_LEN, MAX_DETECTION_BOXES};
use exchange::{Bridge, BridgeError};
use observability::{record_poll, PollOutcome, PollStatsAggregator, PollSummary};
use tracing::{debug, trace};

/// Classify one poll result
pub fn poll_outcome(result: &exchange::Result<usize>) -> PollOutcome {
    match result {
        Ok(n) => PollOutcome::Delivered(*n),
        Err(e) if e.is_not_ready() => PollOutcome::NotReady,
        Err(e) if e.is_too_small() => PollOutcome::TooSmall,
        Err(_) => PollOutcome::Failed,
    }
}

/// Run `take` on `buf`; when the bridge reports the buffer too small, grow
/// it to the required size and try once more.
pub fn take_resizing<T, F>(buf: &mut Vec<T>, mut take: F) -> exchange::Result<usize>
where
    T: Copy + Default,
    F: FnMut(&mut [T]) -> exchange::Result<usize>,
{
    match take(buf.as_mut_slice()) {
        Err(BridgeError::DestinationTooSmall {
            channel, required, ..
        }) => {
            debug!(channel = %channel, from = buf.len(), to = required, "growing poll buffer");
            buf.resize(required, T::default());
            take(buf.as_mut_slice())
        }
        other => other,
    }
}

/// Owns one destination buffer per channel and aggregates poll results
pub struct ChannelPoller {
    frame: Vec<u8>,
    depth: Vec<u16>,
    disparity: Vec<f32>,
    rectified: Vec<u8>,
    points: Vec<f32>,
    imu: Vec<f64>,
    imu_max: usize,
    boxes: Vec<DetectionBox>,
    aggregator: PollStatsAggregator,
    start: Instant,
}

impl ChannelPoller {
    /// Buffers are sized for `settings`; larger samples grow them on demand.
    pub fn new(settings: &DeviceSettings, imu_capacity: usize) -> Self {
        let (w, h) = settings.resolution.dimensions();
        let pixels = (w * h) as usize;
        let imu_max = imu_capacity.max(1);
        Self {
            frame: vec![0; pixels * 2],
            depth: vec![0; pixels],
            disparity: vec![0.0; pixels],
            rectified: vec![0; pixels * 2],
            points: vec![0.0; pixels * 3],
            imu: vec![0.0; imu_max * IMU_WIRE_LEN],
            imu_max,
            boxes: vec![DetectionBox::default(); MAX_DETECTION_BOXES],
            aggregator: PollStatsAggregator::new(),
            start: Instant::now(),
        }
    }

    /// Poll each of `channels` once
    pub fn poll_all(&mut self, bridge: &Bridge, channels: &[ChannelKind]) {
        for &kind in channels {
            let outcome = self.poll(bridge, kind);
            record_poll(kind, outcome);
            let now = self.start.elapsed().as_secs_f64();
            self.aggregator.update(kind, outcome, now);
            trace!(channel = %kind, outcome = outcome.as_str(), "poll");
        }
    }

    fn poll(&mut self, bridge: &Bridge, kind: ChannelKind) -> PollOutcome {
        let result = match kind {
            ChannelKind::Frame => take_resizing(&mut self.frame, |dst| bridge.take_frame(dst)),
            ChannelKind::Depth => take_resizing(&mut self.depth, |dst| bridge.take_depth(dst)),
            ChannelKind::Disparity => {
                take_resizing(&mut self.disparity, |dst| bridge.take_disparity(dst))
            }
            ChannelKind::Rectified => {
                take_resizing(&mut self.rectified, |dst| bridge.take_rectified(dst))
            }
            ChannelKind::Points => take_resizing(&mut self.points, |dst| bridge.take_points(dst)),
            ChannelKind::Detection => bridge.take_detection_boxes(&mut self.boxes),
            ChannelKind::Imu => {
                let result = bridge.take_imu_into(&mut self.imu, self.imu_max);
                if let Ok(n) = result {
                    self.aggregator.add_imu_samples(n);
                    if n == 0 {
                        return PollOutcome::NotReady;
                    }
                }
                result
            }
        };
        poll_outcome(&result)
    }

    /// Aggregated results since the poller was created
    pub fn summary(&self) -> PollSummary {
        self.aggregator.summary(self.start.elapsed().as_secs_f64())
    }
}
