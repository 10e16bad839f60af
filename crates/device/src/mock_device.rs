//! Mock stereo device
//!
//! Implements `StereoDevice` without hardware. Two modes:
//! - manual (`MockDevice::new`): handlers only run when a test calls
//!   `emit_*`, so every sample is deterministic;
//! - streaming (`MockDevice::streaming`): each processor gets a background
//!   thread producing synthetic samples at the configured rate, like the
//!   real SDK's callback threads.
//!
//! Failures can be injected for `open` and for individual processors.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    ChannelKind, DepthMode, DetectionEvent, DeviceError, DeviceSettings, DisparityMode,
    FrameHandler, ImuSample, MockSettings, ModuleInfo, ModuleParams, PlaneImage, StereoDevice,
    StereoFrame,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::synthetic;

/// Rate overrides for streaming mode; `None` uses the open settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamRates {
    /// Camera and processor rate (Hz)
    pub frame_hz: Option<f64>,
    /// IMU rate (Hz)
    pub imu_hz: Option<f64>,
}

/// Mock device configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// `open` fails
    pub fail_open: bool,
    /// Processors whose enable call fails
    pub fail_channels: Vec<ChannelKind>,
    /// Report factory calibration
    pub with_calibration: bool,
    /// Emit a right image with each camera frame
    pub stereo: bool,
    /// Emit BGR instead of gray camera images
    pub color: bool,
    /// Distance of the synthetic scene (meters)
    pub depth_m: f32,
    /// Boxes per synthetic detection event
    pub detection_boxes: usize,
    /// Background producer threads; `None` = manual mode
    pub stream: Option<StreamRates>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_open: false,
            fail_channels: Vec::new(),
            with_calibration: true,
            stereo: true,
            color: false,
            depth_m: 1.5,
            detection_boxes: 2,
            stream: None,
        }
    }
}

impl From<&MockSettings> for MockConfig {
    fn from(settings: &MockSettings) -> Self {
        Self {
            with_calibration: settings.with_calibration,
            stereo: settings.stereo,
            color: settings.color,
            depth_m: settings.depth_m,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Handlers {
    camera: Option<FrameHandler<StereoFrame>>,
    depth: Option<FrameHandler<PlaneImage>>,
    disparity: Option<FrameHandler<PlaneImage>>,
    rectified: Option<FrameHandler<StereoFrame>>,
    points: Option<FrameHandler<PlaneImage>>,
    imu: Option<FrameHandler<ImuSample>>,
    detection: Option<FrameHandler<DetectionEvent>>,
}

#[derive(Default)]
struct DeviceState {
    settings: Option<DeviceSettings>,
    depth_mode: Option<DepthMode>,
    disparity_mode: Option<DisparityMode>,
    epoch: Option<Instant>,
    handlers: Handlers,
    workers: Vec<JoinHandle<()>>,
    /// Manual `emit_*` calls currently inside a handler
    in_flight: usize,
}

/// Mock stereo camera with IMU
pub struct MockDevice {
    config: MockConfig,
    open: AtomicBool,
    /// Cleared by `close` to stop the producer threads
    running: Arc<AtomicBool>,
    open_count: AtomicU32,
    state: Mutex<DeviceState>,
    /// Signalled when `in_flight` drops to zero
    idle: Condvar,
}

impl MockDevice {
    /// Manual-mode device with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            open: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            open_count: AtomicU32::new(0),
            state: Mutex::new(DeviceState::default()),
            idle: Condvar::new(),
        }
    }

    /// Streaming-mode device; rates default to the open settings
    pub fn streaming(mut config: MockConfig) -> Self {
        if config.stream.is_none() {
            config.stream = Some(StreamRates::default());
        }
        Self::with_config(config)
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Successful `open` calls so far
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> Option<DeviceSettings> {
        self.lock().settings
    }

    pub fn depth_mode(&self) -> Option<DepthMode> {
        self.lock().depth_mode
    }

    pub fn disparity_mode(&self) -> Option<DisparityMode> {
        self.lock().disparity_mode
    }

    /// Live producer threads
    pub fn worker_count(&self) -> usize {
        self.lock().workers.len()
    }

    // ===== Manual emission =====
    //
    // Each returns whether a handler was installed. The handler runs on the
    // caller's thread, outside the device lock; `close` waits for it.

    pub fn emit_camera(&self, frame: &StereoFrame) -> bool {
        self.emit(|h| h.camera.clone(), frame)
    }

    pub fn emit_depth(&self, image: &PlaneImage) -> bool {
        self.emit(|h| h.depth.clone(), image)
    }

    pub fn emit_disparity(&self, image: &PlaneImage) -> bool {
        self.emit(|h| h.disparity.clone(), image)
    }

    pub fn emit_rectified(&self, frame: &StereoFrame) -> bool {
        self.emit(|h| h.rectified.clone(), frame)
    }

    pub fn emit_points(&self, image: &PlaneImage) -> bool {
        self.emit(|h| h.points.clone(), image)
    }

    pub fn emit_imu(&self, sample: &ImuSample) -> bool {
        self.emit(|h| h.imu.clone(), sample)
    }

    pub fn emit_detection(&self, event: &DetectionEvent) -> bool {
        self.emit(|h| h.detection.clone(), event)
    }

    fn emit<S, F>(&self, pick: F, sample: &S) -> bool
    where
        F: FnOnce(&Handlers) -> Option<FrameHandler<S>>,
    {
        // Picked and counted under one lock so `close` cannot slip in between
        let handler = {
            let mut state = self.lock();
            let handler = pick(&state.handlers);
            if handler.is_some() {
                state.in_flight += 1;
            }
            handler
        };
        let Some(handler) = handler else {
            return false;
        };
        let _in_flight = InFlight(self);
        handler(sample);
        true
    }

    // ===== Internals =====

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_enable(&self, kind: ChannelKind) -> Result<(), DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }
        if self.config.fail_channels.contains(&kind) {
            return Err(DeviceError::processor_unavailable(kind, "injected failure"));
        }
        Ok(())
    }

    fn frame_hz(&self, settings: &DeviceSettings) -> f64 {
        self.config
            .stream
            .and_then(|rates| rates.frame_hz)
            .unwrap_or(f64::from(settings.fps))
    }

    fn imu_hz(&self, settings: &DeviceSettings) -> f64 {
        self.config
            .stream
            .and_then(|rates| rates.imu_hz)
            .unwrap_or(f64::from(settings.imu_frequency_hz))
    }

    /// Start a producer thread in streaming mode; no-op in manual mode.
    ///
    /// `generate(seq, timestamp)` builds one sample per tick.
    fn spawn_producer<S, G>(
        &self,
        state: &mut DeviceState,
        kind: ChannelKind,
        hz: f64,
        handler: FrameHandler<S>,
        mut generate: G,
    ) -> Result<(), DeviceError>
    where
        S: 'static,
        G: FnMut(u64, f64) -> S + Send + 'static,
    {
        if self.config.stream.is_none() {
            return Ok(());
        }

        let running = self.running.clone();
        let epoch = state.epoch.unwrap_or_else(Instant::now);
        let interval = Duration::from_secs_f64(1.0 / hz.max(0.1));

        let worker = thread::Builder::new()
            .name(format!("mock-{kind}"))
            .spawn(move || {
                debug!(channel = %kind, hz, "mock producer started");
                let mut seq: u64 = 0;
                while running.load(Ordering::Relaxed) {
                    let sample = generate(seq, epoch.elapsed().as_secs_f64());
                    handler(&sample);
                    trace!(channel = %kind, seq, "mock sample emitted");
                    seq += 1;
                    thread::sleep(interval);
                }
                debug!(channel = %kind, emitted = seq, "mock producer stopped");
            })
            .map_err(|e| DeviceError::processor_unavailable(kind, e.to_string()))?;

        state.workers.push(worker);
        Ok(())
    }
}

/// Decrements the in-flight count when a manual emit leaves its handler,
/// also on unwind
struct InFlight<'a>(&'a MockDevice);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.0.idle.notify_all();
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl StereoDevice for MockDevice {
    #[instrument(name = "mock_device_open", skip(self), fields(resolution = %settings.resolution))]
    fn open(&self, settings: &DeviceSettings) -> Result<(), DeviceError> {
        if self.config.fail_open {
            return Err(DeviceError::open_failed("injected failure"));
        }
        let mut state = self.lock();
        state.settings = Some(*settings);
        state.epoch = Some(Instant::now());
        self.running.store(true, Ordering::Release);
        self.open.store(true, Ordering::Release);
        self.open_count.fetch_add(1, Ordering::Relaxed);
        info!(fps = settings.fps, streaming = self.config.stream.is_some(), "mock device opened");
        Ok(())
    }

    fn close(&self) {
        self.running.store(false, Ordering::Release);
        let workers = {
            let mut state = self.lock();
            let workers = std::mem::take(&mut state.workers);
            let in_flight = state.in_flight;
            *state = DeviceState {
                in_flight,
                ..DeviceState::default()
            };
            workers
        };
        // Joined outside the lock: a producer may be inside emit code paths
        for worker in workers {
            if worker.join().is_err() {
                warn!("mock producer thread panicked");
            }
        }
        let state = self.lock();
        if state.in_flight > 0 {
            debug!(in_flight = state.in_flight, "waiting for manual emits to finish");
        }
        drop(
            self.idle
                .wait_while(state, |state| state.in_flight > 0)
                .unwrap_or_else(PoisonError::into_inner),
        );
        if self.open.swap(false, Ordering::AcqRel) {
            info!("mock device closed");
        }
    }

    fn on_camera(&self, handler: FrameHandler<StereoFrame>) {
        let mut state = self.lock();
        state.handlers.camera = Some(handler.clone());
        let Some(settings) = state.settings else {
            return;
        };
        let (width, height) = settings.resolution.dimensions();
        let (stereo, color) = (self.config.stereo, self.config.color);
        let hz = self.frame_hz(&settings);
        if let Err(e) = self.spawn_producer(&mut state, ChannelKind::Frame, hz, handler, move |seq, t| {
            synthetic::synthetic_stereo(width, height, stereo, color, seq, t)
        }) {
            warn!(error = %e, "camera producer not started");
        }
    }

    fn enable_depth(&self, mode: DepthMode, handler: FrameHandler<PlaneImage>) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Depth)?;
        let mut state = self.lock();
        state.depth_mode = Some(mode);
        state.handlers.depth = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let (width, height) = settings.resolution.dimensions();
        let meters = self.config.depth_m;
        let hz = self.frame_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Depth, hz, handler, move |_, t| {
            synthetic::synthetic_depth(width, height, meters, t)
        })
    }

    fn enable_disparity(
        &self,
        mode: DisparityMode,
        handler: FrameHandler<PlaneImage>,
    ) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Disparity)?;
        let mut state = self.lock();
        state.disparity_mode = Some(mode);
        state.handlers.disparity = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let (width, height) = settings.resolution.dimensions();
        let fx = 400.0 * f64::from(width) / 640.0;
        let meters = self.config.depth_m;
        let hz = self.frame_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Disparity, hz, handler, move |_, t| {
            synthetic::synthetic_disparity(width, height, meters, fx, t)
        })
    }

    fn enable_rectify(&self, handler: FrameHandler<StereoFrame>) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Rectified)?;
        let mut state = self.lock();
        state.handlers.rectified = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let (width, height) = settings.resolution.dimensions();
        let (stereo, color) = (self.config.stereo, self.config.color);
        let hz = self.frame_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Rectified, hz, handler, move |seq, t| {
            synthetic::synthetic_stereo(width, height, stereo, color, seq, t)
        })
    }

    fn enable_points(&self, handler: FrameHandler<PlaneImage>) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Points)?;
        let mut state = self.lock();
        state.handlers.points = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let (width, height) = settings.resolution.dimensions();
        let fx = 400.0 * width as f32 / 640.0;
        let meters = self.config.depth_m;
        let hz = self.frame_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Points, hz, handler, move |_, t| {
            synthetic::synthetic_points(width, height, meters, fx, t)
        })
    }

    fn enable_imu(&self, handler: FrameHandler<ImuSample>) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Imu)?;
        let mut state = self.lock();
        state.handlers.imu = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let hz = self.imu_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Imu, hz, handler, |_, t| {
            synthetic::synthetic_imu(t)
        })
    }

    fn enable_detector(&self, handler: FrameHandler<DetectionEvent>) -> Result<(), DeviceError> {
        self.check_enable(ChannelKind::Detection)?;
        let mut state = self.lock();
        state.handlers.detection = Some(handler.clone());
        let settings = state.settings.unwrap_or_default();
        let (width, height) = settings.resolution.dimensions();
        let boxes = self.config.detection_boxes;
        let hz = self.frame_hz(&settings);
        self.spawn_producer(&mut state, ChannelKind::Detection, hz, handler, move |seq, t| {
            synthetic::synthetic_detection(width, height, boxes, seq, t)
        })
    }

    fn module_params(&self) -> Option<ModuleParams> {
        self.config
            .with_calibration
            .then(synthetic::synthetic_module_params)
    }

    fn module_info(&self) -> Option<ModuleInfo> {
        Some(synthetic::synthetic_module_info())
    }
}
