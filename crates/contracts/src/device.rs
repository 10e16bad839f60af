//! StereoDevice trait - producer collaborator abstraction
//!
//! Decouples the exchange from the concrete camera SDK. A device delivers
//! samples by invoking registered handlers on its own threads; the bridge
//! installs one handler per channel.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{DetectionEvent, DeviceError, ImuSample, ModuleInfo, ModuleParams, PlaneImage, StereoFrame};

/// Channel handler invoked by the device on its producer thread.
///
/// The device never calls the same handler concurrently with itself, but
/// handlers of different channels may run in parallel.
pub type FrameHandler<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Sensor resolution supported by the module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "640x400")]
    Vga640x400,
    #[serde(rename = "1280x800")]
    Hd1280x800,
}

impl Resolution {
    /// Map the integer selector used by callers: `2` selects 1280x800,
    /// anything else 640x400.
    pub fn from_selector(selector: i32) -> Self {
        if selector == 2 {
            Resolution::Hd1280x800
        } else {
            Resolution::Vga640x400
        }
    }

    /// Single-lens `(width, height)`
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Vga640x400 => (640, 400),
            Resolution::Hd1280x800 => (1280, 800),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{w}x{h}")
    }
}

/// Settings passed to the device when the bridge initializes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub resolution: Resolution,
    /// Image frame rate (Hz)
    pub fps: u32,
    /// IMU sample rate (Hz)
    pub imu_frequency_hz: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Vga640x400,
            fps: 25,
            imu_frequency_hz: 1000,
        }
    }
}

/// Depth processor mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    #[default]
    Default,
    /// High-accuracy matching with left/right consistency check
    HighAccuracy,
}

impl DepthMode {
    /// `0` = default, `>= 1` = high accuracy
    pub fn from_flags(flags: i32) -> Self {
        if flags >= 1 {
            DepthMode::HighAccuracy
        } else {
            DepthMode::Default
        }
    }
}

/// Disparity processor options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisparityMode {
    pub high_accuracy: bool,
    pub lr_check: bool,
}

impl DisparityMode {
    /// `1` = high accuracy, `2` = LR check, `3` = both, anything else = default
    pub fn from_flags(flags: i32) -> Self {
        Self {
            high_accuracy: flags == 1 || flags == 3,
            lr_check: flags == 2 || flags == 3,
        }
    }
}

/// Stereo camera / IMU device
///
/// # Contract
///
/// 1. `open` must succeed before any `on_*`/`enable_*` call.
/// 2. Each `enable_*` installs the handler and starts the matching processor;
///    the device may reject it with [`DeviceError::ProcessorUnavailable`].
/// 3. `close` stops every producer and drops every handler. After `close`
///    returns no handler is invoked again.
pub trait StereoDevice: Send + Sync {
    /// Open the device with the given settings
    fn open(&self, settings: &DeviceSettings) -> Result<(), DeviceError>;

    /// Stop all producers and drop all handlers (idempotent)
    fn close(&self);

    /// Register the raw camera handler (installed by initialize)
    fn on_camera(&self, handler: FrameHandler<StereoFrame>);

    fn enable_depth(&self, mode: DepthMode, handler: FrameHandler<PlaneImage>) -> Result<(), DeviceError>;

    fn enable_disparity(
        &self,
        mode: DisparityMode,
        handler: FrameHandler<PlaneImage>,
    ) -> Result<(), DeviceError>;

    fn enable_rectify(&self, handler: FrameHandler<StereoFrame>) -> Result<(), DeviceError>;

    fn enable_points(&self, handler: FrameHandler<PlaneImage>) -> Result<(), DeviceError>;

    fn enable_imu(&self, handler: FrameHandler<ImuSample>) -> Result<(), DeviceError>;

    fn enable_detector(&self, handler: FrameHandler<DetectionEvent>) -> Result<(), DeviceError>;

    /// Factory calibration, if the module carries one
    fn module_params(&self) -> Option<ModuleParams>;

    /// Module identification, `None` when the device is not open
    fn module_info(&self) -> Option<ModuleInfo>;
}
