//! Channel drivers
//!
//! A driver turns one producer sample into one store: validate, reduce,
//! write into the channel's slot. Drivers run on the device's threads and
//! never block beyond the slot lock. Rejected samples are logged and
//! counted; they never reach the consumer.

use std::sync::Arc;

use contracts::{
    ChannelKind, DetectionEvent, FrameHandler, ImuSample, PlaneImage, StereoFrame,
};

use crate::channels::Channels;
use crate::{reducer, BridgeError, Result};

/// Per-channel store logic
pub trait ChannelDriver: Send + Sync + 'static {
    /// Sample type delivered by the device
    type Sample: 'static;

    const KIND: ChannelKind;

    /// Reduce `sample` and store it
    fn drive(channels: &Channels, sample: &Self::Sample) -> Result<()>;
}

/// Wrap driver `D` into a device handler bound to `channels`.
///
/// Samples arriving while the channel is disabled are dropped.
pub fn handler<D: ChannelDriver>(channels: Arc<Channels>) -> FrameHandler<D::Sample> {
    Arc::new(move |sample: &D::Sample| {
        if !channels.registry.is_enabled(D::KIND) {
            tracing::trace!(channel = %D::KIND, "sample dropped, channel disabled");
            return;
        }
        if let Err(err) = D::drive(&channels, sample) {
            report_rejection(D::KIND, &err);
        }
    })
}

fn report_rejection(kind: ChannelKind, err: &BridgeError) {
    let reason = match err {
        BridgeError::InvalidSample { source, .. } => source.label(),
        _ => "other",
    };
    observability::record_sample_rejected(kind, reason);
    tracing::warn!(channel = %kind, error = %err, reason, "producer sample rejected");
}

fn invalid(kind: ChannelKind) -> impl FnOnce(crate::ReduceError) -> BridgeError {
    move |source| BridgeError::InvalidSample {
        channel: kind,
        source,
    }
}

/// Raw camera frame, merged side by side
pub struct FrameDriver;

impl ChannelDriver for FrameDriver {
    type Sample = StereoFrame;
    const KIND: ChannelKind = ChannelKind::Frame;

    fn drive(channels: &Channels, frame: &StereoFrame) -> Result<()> {
        channels.record_callback();
        let shape = reducer::stereo_shape(frame).map_err(invalid(Self::KIND))?;
        channels
            .frame
            .store_with(shape, |dst| reducer::merge_stereo(frame, dst));
        tracing::trace!(timestamp = frame.timestamp, %shape, "frame stored");
        Ok(())
    }
}

/// Rectified pair, merged side by side
pub struct RectifiedDriver;

impl ChannelDriver for RectifiedDriver {
    type Sample = StereoFrame;
    const KIND: ChannelKind = ChannelKind::Rectified;

    fn drive(channels: &Channels, frame: &StereoFrame) -> Result<()> {
        let shape = reducer::stereo_shape(frame).map_err(invalid(Self::KIND))?;
        channels
            .rectified
            .store_with(shape, |dst| reducer::merge_stereo(frame, dst));
        tracing::trace!(timestamp = frame.timestamp, %shape, "rectified stored");
        Ok(())
    }
}

/// Depth in meters to millimeters
pub struct DepthDriver;

impl ChannelDriver for DepthDriver {
    type Sample = PlaneImage;
    const KIND: ChannelKind = ChannelKind::Depth;

    fn drive(channels: &Channels, image: &PlaneImage) -> Result<()> {
        let shape = reducer::plane_shape(image, 1).map_err(invalid(Self::KIND))?;
        channels
            .depth
            .store_with(shape, |dst| reducer::depth_to_millimeters(&image.data, dst));
        tracing::trace!(timestamp = image.timestamp, %shape, "depth stored");
        Ok(())
    }
}

/// Disparity narrowed to `f32`
pub struct DisparityDriver;

impl ChannelDriver for DisparityDriver {
    type Sample = PlaneImage;
    const KIND: ChannelKind = ChannelKind::Disparity;

    fn drive(channels: &Channels, image: &PlaneImage) -> Result<()> {
        let shape = reducer::plane_shape(image, 1).map_err(invalid(Self::KIND))?;
        channels
            .disparity
            .store_with(shape, |dst| reducer::narrow_to_f32(&image.data, dst));
        tracing::trace!(timestamp = image.timestamp, %shape, "disparity stored");
        Ok(())
    }
}

/// Point cloud as XYZ `f32` triples
pub struct PointsDriver;

impl ChannelDriver for PointsDriver {
    type Sample = PlaneImage;
    const KIND: ChannelKind = ChannelKind::Points;

    fn drive(channels: &Channels, image: &PlaneImage) -> Result<()> {
        let shape = reducer::plane_shape(image, 3).map_err(invalid(Self::KIND))?;
        channels.points.store_with(shape, |dst| {
            reducer::points_to_xyz(&image.data, image.channels, dst)
        });
        tracing::trace!(timestamp = image.timestamp, points = shape.pixels(), "points stored");
        Ok(())
    }
}

/// IMU samples into the ring
pub struct ImuDriver;

impl ChannelDriver for ImuDriver {
    type Sample = ImuSample;
    const KIND: ChannelKind = ChannelKind::Imu;

    fn drive(channels: &Channels, sample: &ImuSample) -> Result<()> {
        channels.lock_imu().append(*sample);
        Ok(())
    }
}

/// Detection boxes and snapshot image
pub struct DetectionDriver;

impl ChannelDriver for DetectionDriver {
    type Sample = DetectionEvent;
    const KIND: ChannelKind = ChannelKind::Detection;

    fn drive(channels: &Channels, event: &DetectionEvent) -> Result<()> {
        channels.detection.store(event)?;
        tracing::trace!(timestamp = event.timestamp, boxes = event.boxes.len(), "detection stored");
        Ok(())
    }
}
