//! Bridge context
//!
//! Owns the device handle and all channel state. Lifecycle operations
//! (initialize, enable, release) are serialized by one lock; consumer polls
//! never take it and only contend with the producer of their own channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    BridgeConfig, ChannelKind, ChannelsConfig, DepthMode, DetectionBox, DeviceError, DeviceInfo,
    DeviceSettings, DisparityMode, ImuSample, Resolution, Shape, StereoCalibration, StereoDevice,
    DEFAULT_IMU_CAPACITY, MAX_DETECTION_BOXES,
};
use tracing::{debug, info, instrument, warn};

use crate::channels::Channels;
use crate::drivers::{
    handler, DepthDriver, DetectionDriver, DisparityDriver, FrameDriver, ImuDriver, PointsDriver,
    RectifiedDriver,
};
use crate::stats::BridgeStats;
use crate::{BridgeError, Result, Slot};

/// Reply of [`Bridge::module_summary`] before initialization
pub const NOT_INITIALIZED_SUMMARY: &str = "Camera not initialized";

#[derive(Debug, Default)]
struct Lifecycle {
    settings: Option<DeviceSettings>,
    calibration: Option<StereoCalibration>,
}

pub struct Bridge {
    device: Arc<dyn StereoDevice>,
    channels: Arc<Channels>,
    initialized: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("initialized", &self.is_initialized())
            .field("enabled", &self.channels.registry.enabled())
            .finish()
    }
}

impl Bridge {
    /// Bridge with the default IMU capacity (2000) and box limit (256)
    pub fn new(device: Arc<dyn StereoDevice>) -> Self {
        Self::with_limits(device, DEFAULT_IMU_CAPACITY, MAX_DETECTION_BOXES)
    }

    pub fn with_limits(device: Arc<dyn StereoDevice>, imu_capacity: usize, max_boxes: usize) -> Self {
        Self {
            device,
            channels: Arc::new(Channels::new(imu_capacity, max_boxes)),
            initialized: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Bridge sized from `config.imu` and `config.detection`
    pub fn from_config(device: Arc<dyn StereoDevice>, config: &BridgeConfig) -> Self {
        Self::with_limits(device, config.imu.capacity, config.detection.max_boxes)
    }

    // ===== Lifecycle =====

    /// Open the device. `resolution_selector == 2` selects 1280x800,
    /// anything else 640x400.
    pub fn initialize(&self, resolution_selector: i32, fps: u32) -> Result<()> {
        self.initialize_with(DeviceSettings {
            resolution: Resolution::from_selector(resolution_selector),
            fps,
            ..DeviceSettings::default()
        })
    }

    /// Open the device and start the raw frame channel
    #[instrument(
        name = "bridge_initialize",
        skip_all,
        fields(resolution = %settings.resolution, fps = settings.fps)
    )]
    pub fn initialize_with(&self, settings: DeviceSettings) -> Result<()> {
        let mut lifecycle = self.lock_lifecycle();
        if self.is_initialized() {
            return Err(BridgeError::AlreadyInitialized);
        }

        self.device
            .open(&settings)
            .map_err(|source| BridgeError::DeviceOpen { source })?;

        self.device.on_camera(handler::<FrameDriver>(self.channels.clone()));
        // Fresh after reset; cannot already be enabled
        let _ = self.channels.registry.enable(ChannelKind::Frame);

        lifecycle.settings = Some(settings);
        self.initialized.store(true, Ordering::Release);
        info!("bridge initialized");
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Settings passed to the last successful initialize
    pub fn settings(&self) -> Option<DeviceSettings> {
        self.lock_lifecycle().settings
    }

    /// Close the device and return every channel to empty/disabled.
    ///
    /// Safe to call repeatedly and before initialize; the bridge can be
    /// initialized again afterwards.
    #[instrument(name = "bridge_release", skip(self))]
    pub fn release(&self) {
        let mut lifecycle = self.lock_lifecycle();
        let was_initialized = self.initialized.swap(false, Ordering::AcqRel);
        if was_initialized {
            self.device.close();
        }
        self.channels.reset();
        *lifecycle = Lifecycle::default();
        if was_initialized {
            info!("bridge released");
        } else {
            debug!("release on uninitialized bridge");
        }
    }

    // ===== Channel enable =====

    /// `flags >= 1` selects high accuracy with left/right check
    pub fn enable_depth(&self, flags: i32) -> Result<()> {
        let mode = DepthMode::from_flags(flags);
        self.enable_channel(ChannelKind::Depth, |device, channels| {
            device.enable_depth(mode, handler::<DepthDriver>(channels))
        })
    }

    /// Bit 0 high accuracy, bit 1 left/right check
    pub fn enable_disparity(&self, flags: i32) -> Result<()> {
        let mode = DisparityMode::from_flags(flags);
        self.enable_channel(ChannelKind::Disparity, |device, channels| {
            device.enable_disparity(mode, handler::<DisparityDriver>(channels))
        })
    }

    pub fn enable_rectify(&self) -> Result<()> {
        self.enable_channel(ChannelKind::Rectified, |device, channels| {
            device.enable_rectify(handler::<RectifiedDriver>(channels))
        })
    }

    pub fn enable_points(&self) -> Result<()> {
        self.enable_channel(ChannelKind::Points, |device, channels| {
            device.enable_points(handler::<PointsDriver>(channels))
        })
    }

    pub fn enable_imu(&self) -> Result<()> {
        self.enable_channel(ChannelKind::Imu, |device, channels| {
            device.enable_imu(handler::<ImuDriver>(channels))
        })
    }

    pub fn enable_detector(&self) -> Result<()> {
        self.enable_channel(ChannelKind::Detection, |device, channels| {
            device.enable_detector(handler::<DetectionDriver>(channels))
        })
    }

    /// Enable every channel switched on in `config`.
    ///
    /// Stops at the first failure. Returns the channels enabled by this call.
    pub fn enable_from_config(&self, config: &ChannelsConfig) -> Result<Vec<ChannelKind>> {
        let mut enabled = Vec::new();
        if config.depth.enabled {
            self.enable_depth(config.depth.flags())?;
            enabled.push(ChannelKind::Depth);
        }
        if config.disparity.enabled {
            self.enable_disparity(config.disparity.flags())?;
            enabled.push(ChannelKind::Disparity);
        }
        if config.rectified.enabled {
            self.enable_rectify()?;
            enabled.push(ChannelKind::Rectified);
        }
        if config.points.enabled {
            self.enable_points()?;
            enabled.push(ChannelKind::Points);
        }
        if config.imu.enabled {
            self.enable_imu()?;
            enabled.push(ChannelKind::Imu);
        }
        if config.detection.enabled {
            self.enable_detector()?;
            enabled.push(ChannelKind::Detection);
        }
        Ok(enabled)
    }

    #[instrument(name = "bridge_enable", skip_all, fields(channel = %kind))]
    fn enable_channel<F>(&self, kind: ChannelKind, install: F) -> Result<()>
    where
        F: FnOnce(&dyn StereoDevice, Arc<Channels>) -> std::result::Result<(), DeviceError>,
    {
        let _lifecycle = self.lock_lifecycle();
        self.ensure_initialized()?;
        if self.channels.registry.is_enabled(kind) {
            return Err(BridgeError::ChannelAlreadyEnabled { channel: kind });
        }

        if let Err(source) = install(self.device.as_ref(), self.channels.clone()) {
            warn!(error = %source, "device refused to enable channel");
            return Err(BridgeError::ProducerFailure {
                channel: kind,
                source,
            });
        }
        self.channels.registry.enable(kind)?;
        info!("channel enabled");
        Ok(())
    }

    pub fn is_enabled(&self, kind: ChannelKind) -> bool {
        self.channels.registry.is_enabled(kind)
    }

    pub fn enabled_channels(&self) -> Vec<ChannelKind> {
        self.channels.registry.enabled()
    }

    // ===== Consumer polls =====

    /// Side-by-side luma frame
    pub fn take_frame(&self, dst: &mut [u8]) -> Result<usize> {
        self.take(&self.channels.frame, dst)
    }

    /// Depth in millimeters
    pub fn take_depth(&self, dst: &mut [u16]) -> Result<usize> {
        self.take(&self.channels.depth, dst)
    }

    pub fn take_disparity(&self, dst: &mut [f32]) -> Result<usize> {
        self.take(&self.channels.disparity, dst)
    }

    /// Side-by-side luma rectified pair
    pub fn take_rectified(&self, dst: &mut [u8]) -> Result<usize> {
        self.take(&self.channels.rectified, dst)
    }

    /// Copy XYZ triples into `dst`; returns the number of points.
    ///
    /// `dst` must hold `3 * count` floats.
    pub fn take_points(&self, dst: &mut [f32]) -> Result<usize> {
        self.take(&self.channels.points, dst).map(|n| n / 3)
    }

    fn take<T: Copy + Default>(&self, slot: &Slot<T>, dst: &mut [T]) -> Result<usize> {
        self.ensure_initialized()?;
        self.channels.registry.require(slot.kind())?;
        slot.try_take(dst)
    }

    /// Drain up to `max_samples` of the newest IMU samples, oldest first.
    ///
    /// The ring is emptied even when more samples were buffered.
    pub fn take_imu(&self, max_samples: usize) -> Result<Vec<ImuSample>> {
        self.ensure_consumable(ChannelKind::Imu)?;
        Ok(self.channels.lock_imu().drain(max_samples))
    }

    /// Drain into the 7-`f64` wire layout; returns samples written
    pub fn take_imu_into(&self, dst: &mut [f64], max_samples: usize) -> Result<usize> {
        self.ensure_consumable(ChannelKind::Imu)?;
        Ok(self.channels.lock_imu().drain_into(dst, max_samples))
    }

    /// Copy up to `dst.len()` boxes; clears detection readiness
    pub fn take_detection_boxes(&self, dst: &mut [DetectionBox]) -> Result<usize> {
        self.ensure_consumable(ChannelKind::Detection)?;
        self.channels.detection.take_boxes(dst)
    }

    /// Boxes in the 6-`i32` wire layout; clears detection readiness
    pub fn take_detection_wire(&self, dst: &mut [i32], max_boxes: usize) -> Result<usize> {
        self.ensure_consumable(ChannelKind::Detection)?;
        self.channels.detection.take_boxes_wire(dst, max_boxes)
    }

    /// Snapshot image of the pending detection; readiness is kept
    pub fn read_detection_image(&self, dst: &mut [u8]) -> Result<usize> {
        self.ensure_consumable(ChannelKind::Detection)?;
        self.channels.detection.read_image(dst)
    }

    fn ensure_consumable(&self, kind: ChannelKind) -> Result<()> {
        self.ensure_initialized()?;
        self.channels.registry.require(kind)
    }

    #[inline]
    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(BridgeError::NotInitialized)
        }
    }

    // ===== Sizes =====

    /// `(2W or W) x H x 1`
    pub fn frame_info(&self) -> Shape {
        self.channels.frame.dimensions()
    }

    pub fn depth_size(&self) -> (u32, u32) {
        let shape = self.channels.depth.dimensions();
        (shape.width, shape.height)
    }

    pub fn disparity_size(&self) -> (u32, u32) {
        let shape = self.channels.disparity.dimensions();
        (shape.width, shape.height)
    }

    pub fn rectified_info(&self) -> Shape {
        self.channels.rectified.dimensions()
    }

    /// `(width, height, point count)`
    pub fn points_size(&self) -> (u32, u32, usize) {
        let shape = self.channels.points.dimensions();
        (shape.width, shape.height, shape.pixels())
    }

    pub fn detection_image_info(&self) -> Shape {
        self.channels.detection.image_shape()
    }

    /// Buffered IMU samples
    pub fn imu_count(&self) -> usize {
        self.channels.lock_imu().count()
    }

    /// Camera callbacks since initialize
    pub fn callback_count(&self) -> u64 {
        self.channels.callback_count()
    }

    // ===== Device helpers =====

    /// Stereo calibration, looked up once and cached until release
    pub fn calibration(&self) -> Option<StereoCalibration> {
        let mut lifecycle = self.lock_lifecycle();
        if !self.is_initialized() {
            return None;
        }
        if lifecycle.calibration.is_none() {
            lifecycle.calibration = self
                .device
                .module_params()
                .and_then(|params| StereoCalibration::lookup(&params));
            if lifecycle.calibration.is_none() {
                debug!("no calibration available for a supported resolution");
            }
        }
        lifecycle.calibration
    }

    /// Calibration in its textual form, `{}` when unavailable
    pub fn calibration_json(&self) -> String {
        self.calibration()
            .and_then(|calibration| serde_json::to_string(&calibration).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        if !self.is_initialized() {
            return None;
        }
        let module = self.device.module_info()?;
        let params = self.device.module_params().unwrap_or_default();
        Some(DeviceInfo {
            module,
            baseline_m: params.baseline,
            camera_channel: params.camera_channel,
        })
    }

    /// Device info as JSON, `{}` when unavailable
    pub fn device_info_json(&self) -> String {
        self.device_info()
            .and_then(|info| serde_json::to_string(&info).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    /// `ID: <id>, FW: <firmware>`
    pub fn module_summary(&self) -> String {
        if !self.is_initialized() {
            return NOT_INITIALIZED_SUMMARY.to_string();
        }
        match self.device.module_info() {
            Some(info) => format!("ID: {}, FW: {}", info.id, info.firmware),
            None => NOT_INITIALIZED_SUMMARY.to_string(),
        }
    }

    // ===== Statistics =====

    pub fn stats(&self) -> BridgeStats {
        let (imu_count, imu_overwritten, imu_discarded) = {
            let ring = self.channels.lock_imu();
            (ring.count(), ring.overwritten_count(), ring.discarded_count())
        };
        BridgeStats {
            initialized: self.is_initialized(),
            enabled: self.channels.registry.enabled(),
            slots: vec![
                (ChannelKind::Frame, self.channels.frame.stats()),
                (ChannelKind::Depth, self.channels.depth.stats()),
                (ChannelKind::Disparity, self.channels.disparity.stats()),
                (ChannelKind::Rectified, self.channels.rectified.stats()),
                (ChannelKind::Points, self.channels.points.stats()),
            ],
            imu_count,
            imu_overwritten,
            imu_discarded,
            detection_boxes: self.channels.detection.box_count(),
            callbacks: self.channels.callback_count(),
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.is_initialized() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DetectionEvent, PixelData, PlaneImage, RawImage, StereoFrame};
    use device::{MockConfig, MockDevice};

    use crate::reducer;

    fn bridge() -> (Arc<MockDevice>, Bridge) {
        let device = Arc::new(MockDevice::new());
        let bridge = Bridge::new(device.clone());
        (device, bridge)
    }

    fn depth(width: u32, height: u32, meters: f32) -> PlaneImage {
        PlaneImage {
            timestamp: 0.0,
            width,
            height,
            channels: 1,
            data: PixelData::F32(vec![meters; (width * height) as usize]),
        }
    }

    #[test]
    fn test_polls_before_initialize() {
        let (_device, bridge) = bridge();
        let mut buf = [0u16; 4];
        assert!(matches!(bridge.take_depth(&mut buf), Err(BridgeError::NotInitialized)));
        assert!(matches!(bridge.enable_depth(0), Err(BridgeError::NotInitialized)));
        assert!(matches!(bridge.take_imu(10), Err(BridgeError::NotInitialized)));
        assert_eq!(bridge.depth_size(), (0, 0));
        assert_eq!(bridge.module_summary(), NOT_INITIALIZED_SUMMARY);
        assert_eq!(bridge.calibration_json(), "{}");
    }

    #[test]
    fn test_initialize_twice() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        assert!(bridge.is_initialized());
        assert!(device.is_open());
        assert!(bridge.is_enabled(ChannelKind::Frame));
        assert!(matches!(bridge.initialize(1, 25), Err(BridgeError::AlreadyInitialized)));
    }

    #[test]
    fn test_initialize_open_failure() {
        let device = Arc::new(MockDevice::with_config(MockConfig {
            fail_open: true,
            ..Default::default()
        }));
        let bridge = Bridge::new(device);
        assert!(matches!(bridge.initialize(1, 25), Err(BridgeError::DeviceOpen { .. })));
        assert!(!bridge.is_initialized());
    }

    #[test]
    fn test_resolution_selector() {
        let (device, bridge) = bridge();
        bridge.initialize(2, 30).unwrap();
        let settings = device.settings().unwrap();
        assert_eq!(settings.resolution, Resolution::Hd1280x800);
        assert_eq!(settings.fps, 30);
        assert_eq!(bridge.settings(), Some(settings));
    }

    #[test]
    fn test_depth_scenario_1_5_meters() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_depth(0).unwrap();
        assert_eq!(device.depth_mode(), Some(DepthMode::Default));

        device.emit_depth(&depth(640, 400, 1.5));
        assert_eq!(bridge.depth_size(), (640, 400));

        let mut buf = vec![0u16; 640 * 400];
        assert_eq!(bridge.take_depth(&mut buf).unwrap(), 256_000);
        assert!(buf.iter().all(|&v| v == 1500));
        assert!(bridge.take_depth(&mut buf).unwrap_err().is_not_ready());
    }

    #[test]
    fn test_enable_twice_and_not_enabled() {
        let (_device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        let mut buf = [0.0f32; 3];
        assert!(matches!(
            bridge.take_points(&mut buf),
            Err(BridgeError::ChannelNotEnabled {
                channel: ChannelKind::Points
            })
        ));
        bridge.enable_points().unwrap();
        assert!(matches!(
            bridge.enable_points(),
            Err(BridgeError::ChannelAlreadyEnabled { .. })
        ));
    }

    #[test]
    fn test_producer_failure() {
        let device = Arc::new(MockDevice::with_config(MockConfig {
            fail_channels: vec![ChannelKind::Disparity],
            ..Default::default()
        }));
        let bridge = Bridge::new(device);
        bridge.initialize(1, 25).unwrap();
        assert!(matches!(
            bridge.enable_disparity(3),
            Err(BridgeError::ProducerFailure {
                channel: ChannelKind::Disparity,
                ..
            })
        ));
        assert!(!bridge.is_enabled(ChannelKind::Disparity));
        bridge.enable_depth(1).unwrap();
    }

    #[test]
    fn test_frame_and_callback_count() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        let frame = StereoFrame {
            timestamp: 0.1,
            left: RawImage::new(4, 2, 1, vec![1u8; 8]),
            right: Some(RawImage::new(4, 2, 1, vec![2u8; 8])),
        };
        device.emit_camera(&frame);
        device.emit_camera(&frame);

        assert_eq!(bridge.callback_count(), 2);
        assert_eq!(bridge.frame_info(), Shape::new(8, 2, 1));
        let mut buf = [0u8; 16];
        assert_eq!(bridge.take_frame(&mut buf).unwrap(), 16);
        assert_eq!(&buf[..8], &[1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_points_returns_point_count() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_points().unwrap();
        device.emit_points(&PlaneImage {
            timestamp: 0.0,
            width: 2,
            height: 2,
            channels: 3,
            data: PixelData::F32(vec![0.5; 12]),
        });
        assert_eq!(bridge.points_size(), (2, 2, 4));

        let mut short = [0.0f32; 11];
        assert!(bridge.take_points(&mut short).unwrap_err().is_too_small());
        let mut buf = [0.0f32; 12];
        assert_eq!(bridge.take_points(&mut buf).unwrap(), 4);
    }

    #[test]
    fn test_disparity_narrowed_to_f32() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_disparity(0).unwrap();

        device.emit_disparity(&PlaneImage {
            timestamp: 0.0,
            width: 2,
            height: 1,
            channels: 1,
            data: PixelData::I16(vec![16, -4]),
        });
        assert_eq!(bridge.disparity_size(), (2, 1));
        let mut buf = [0.0f32; 2];
        assert_eq!(bridge.take_disparity(&mut buf).unwrap(), 2);
        assert_eq!(buf, [16.0, -4.0]);
        assert!(bridge.take_disparity(&mut buf).unwrap_err().is_not_ready());

        device.emit_disparity(&PlaneImage {
            timestamp: 0.1,
            width: 1,
            height: 2,
            channels: 1,
            data: PixelData::F64(vec![0.5, 96.25]),
        });
        assert_eq!(bridge.disparity_size(), (1, 2));
        assert_eq!(bridge.take_disparity(&mut buf).unwrap(), 2);
        assert_eq!(buf, [0.5, 96.25]);
    }

    #[test]
    fn test_rectified_pair_reduced_and_merged() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_rectify().unwrap();

        // BGR rows: left [white, red] / [black, black], right [black, blue] / [white, white]
        let left = vec![255, 255, 255, 0, 0, 255, 0, 0, 0, 0, 0, 0];
        let right = vec![0, 0, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255];
        device.emit_rectified(&StereoFrame {
            timestamp: 0.0,
            left: RawImage::new(2, 2, 3, left),
            right: Some(RawImage::new(2, 2, 3, right)),
        });
        assert_eq!(bridge.rectified_info(), Shape::new(4, 2, 1));

        let mut short = [0u8; 7];
        let err = bridge.take_rectified(&mut short).unwrap_err();
        assert!(err.is_too_small());
        assert_eq!(short, [0u8; 7]);

        let mut buf = [0u8; 8];
        assert_eq!(bridge.take_rectified(&mut buf).unwrap(), 8);
        let white = reducer::luma(255, 255, 255);
        let red = reducer::luma(0, 0, 255);
        let blue = reducer::luma(255, 0, 0);
        assert_eq!(red, 76);
        assert_eq!(blue, 29);
        assert_eq!(buf, [white, red, 0, blue, 0, 0, white, white]);
        // frame channel untouched by rectified samples
        assert_eq!(bridge.callback_count(), 0);
    }

    #[test]
    fn test_imu_through_bridge() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_imu().unwrap();
        for t in 0..10 {
            device.emit_imu(&ImuSample {
                timestamp: t as f64,
                ..Default::default()
            });
        }
        assert_eq!(bridge.imu_count(), 10);
        let mut wire = vec![0.0f64; 4 * 7];
        assert_eq!(bridge.take_imu_into(&mut wire, 4).unwrap(), 4);
        assert_eq!(wire[0], 6.0);
        assert_eq!(bridge.imu_count(), 0);
        assert_eq!(bridge.stats().imu_discarded, 6);
    }

    #[test]
    fn test_detection_through_bridge() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_detector().unwrap();
        device.emit_detection(&DetectionEvent {
            timestamp: 0.0,
            boxes: vec![DetectionBox {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
                score: 0.9,
                class_id: 1,
            }],
            image: Some(RawImage::new(2, 2, 3, vec![5u8; 12])),
        });
        assert_eq!(bridge.detection_image_info(), Shape::new(2, 2, 3));

        let mut image = [0u8; 12];
        assert_eq!(bridge.read_detection_image(&mut image).unwrap(), 12);
        let mut wire = [0i32; 6];
        assert_eq!(bridge.take_detection_wire(&mut wire, 1).unwrap(), 1);
        assert_eq!(wire, [1, 2, 3, 4, 1, 900]);
        assert!(bridge.read_detection_image(&mut image).unwrap_err().is_not_ready());
    }

    #[test]
    fn test_release_resets_and_allows_reinit() {
        let (device, bridge) = bridge();
        bridge.release();
        bridge.initialize(1, 25).unwrap();
        bridge.enable_depth(0).unwrap();
        device.emit_depth(&depth(2, 2, 1.0));

        bridge.release();
        bridge.release();
        assert!(!bridge.is_initialized());
        assert!(!device.is_open());
        assert_eq!(bridge.depth_size(), (0, 0));
        assert!(bridge.enabled_channels().is_empty());
        assert_eq!(bridge.callback_count(), 0);

        bridge.initialize(1, 25).unwrap();
        let mut buf = [0u16; 4];
        assert!(matches!(
            bridge.take_depth(&mut buf),
            Err(BridgeError::ChannelNotEnabled { .. })
        ));
        bridge.enable_depth(0).unwrap();
    }

    #[test]
    fn test_calibration_cached_until_release() {
        let (_device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        let calibration = bridge.calibration().unwrap();
        assert_eq!(calibration.left.w, 640);

        let json: serde_json::Value = serde_json::from_str(&bridge.calibration_json()).unwrap();
        assert!(json["baseline"].as_f64().unwrap() > 0.0);
        assert_eq!(json["right"]["P"].as_array().unwrap().len(), 12);

        bridge.release();
        assert!(bridge.calibration().is_none());
    }

    #[test]
    fn test_calibration_unavailable() {
        let device = Arc::new(MockDevice::with_config(MockConfig {
            with_calibration: false,
            ..Default::default()
        }));
        let bridge = Bridge::new(device);
        bridge.initialize(1, 25).unwrap();
        assert!(bridge.calibration().is_none());
        assert_eq!(bridge.calibration_json(), "{}");
    }

    #[test]
    fn test_device_info() {
        let (_device, bridge) = bridge();
        assert!(bridge.device_info().is_none());
        assert_eq!(bridge.device_info_json(), "{}");

        bridge.initialize(1, 25).unwrap();
        let info = bridge.device_info().unwrap();
        assert!(info.baseline_m > 0.0);
        assert!(bridge.module_summary().starts_with("ID: "));
        assert!(bridge.module_summary().contains(", FW: "));

        let json: serde_json::Value = serde_json::from_str(&bridge.device_info_json()).unwrap();
        assert_eq!(json["id"], info.module.id.as_str());
    }

    #[test]
    fn test_enable_from_config() {
        let (device, bridge) = bridge();
        bridge.initialize(1, 25).unwrap();
        let mut config = ChannelsConfig::default();
        config.depth.enabled = true;
        config.disparity.enabled = true;
        config.disparity.lr_check = true;
        config.imu.enabled = true;

        let enabled = bridge.enable_from_config(&config).unwrap();
        assert_eq!(
            enabled,
            vec![ChannelKind::Depth, ChannelKind::Disparity, ChannelKind::Imu]
        );
        assert_eq!(
            device.disparity_mode(),
            Some(DisparityMode {
                high_accuracy: false,
                lr_check: true
            })
        );
    }

    #[test]
    fn test_limits_from_config() {
        let mut config = BridgeConfig::default();
        config.imu.capacity = 3;
        let device = Arc::new(MockDevice::new());
        let bridge = Bridge::from_config(device.clone(), &config);
        bridge.initialize(1, 25).unwrap();
        bridge.enable_imu().unwrap();
        for t in 0..5 {
            device.emit_imu(&ImuSample {
                timestamp: t as f64,
                ..Default::default()
            });
        }
        let samples = bridge.take_imu(10).unwrap();
        let ts: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![2.0, 3.0, 4.0]);
    }
}
