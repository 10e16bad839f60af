//! Bridge configuration contracts
//!
//! Every field has a default so a partial file (or an empty one) is a valid
//! configuration. Range checks are declared with `validator`; cross-field
//! checks live in `config_loader`.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DepthMode, DeviceSettings, DisparityMode, Resolution};

/// Default IMU ring capacity (samples)
pub const DEFAULT_IMU_CAPACITY: usize = 2000;

/// Maximum number of boxes kept per detection event
pub const MAX_DETECTION_BOXES: usize = 256;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BridgeConfig {
    #[validate(nested)]
    pub device: DeviceConfig,
    pub channels: ChannelsConfig,
    #[validate(nested)]
    pub imu: ImuConfig,
    #[validate(nested)]
    pub detection: DetectionConfig,
    #[validate(nested)]
    pub mock: MockSettings,
}

/// Device open parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceConfig {
    pub resolution: Resolution,
    #[validate(range(min = 1, max = 120))]
    pub fps: u32,
    #[validate(range(min = 1, max = 4000))]
    pub imu_frequency_hz: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let settings = DeviceSettings::default();
        Self {
            resolution: settings.resolution,
            fps: settings.fps,
            imu_frequency_hz: settings.imu_frequency_hz,
        }
    }
}

impl DeviceConfig {
    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            resolution: self.resolution,
            fps: self.fps,
            imu_frequency_hz: self.imu_frequency_hz,
        }
    }
}

/// Channel selection
///
/// The frame channel is always on once the device is open, so it has no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub depth: DepthChannelConfig,
    pub disparity: DisparityChannelConfig,
    pub rectified: ToggleConfig,
    pub points: ToggleConfig,
    pub imu: ToggleConfig,
    pub detection: ToggleConfig,
}

/// On/off switch for a channel without mode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthChannelConfig {
    pub enabled: bool,
    pub high_accuracy: bool,
}

impl DepthChannelConfig {
    pub fn mode(&self) -> DepthMode {
        if self.high_accuracy {
            DepthMode::HighAccuracy
        } else {
            DepthMode::Default
        }
    }

    /// Mode flags in the integer form accepted by `enable_depth`
    pub fn flags(&self) -> i32 {
        i32::from(self.high_accuracy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisparityChannelConfig {
    pub enabled: bool,
    pub high_accuracy: bool,
    pub lr_check: bool,
}

impl DisparityChannelConfig {
    pub fn mode(&self) -> DisparityMode {
        DisparityMode {
            high_accuracy: self.high_accuracy,
            lr_check: self.lr_check,
        }
    }

    /// Bit 0 = high accuracy, bit 1 = left/right check
    pub fn flags(&self) -> i32 {
        i32::from(self.high_accuracy) | (i32::from(self.lr_check) << 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImuConfig {
    /// Ring capacity in samples
    #[validate(range(min = 1, max = 1_000_000))]
    pub capacity: usize,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_IMU_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DetectionConfig {
    #[validate(range(min = 1, max = 256))]
    pub max_boxes: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_boxes: MAX_DETECTION_BOXES,
        }
    }
}

/// Synthetic producer settings used by the mock device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MockSettings {
    /// Constant distance reported by the synthetic depth map (meters)
    #[validate(range(min = 0.0, max = 65.0))]
    pub depth_m: f32,
    /// Emit a right image with every camera frame
    pub stereo: bool,
    /// Emit 3-channel camera images
    pub color: bool,
    pub with_calibration: bool,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            depth_m: 1.5,
            stereo: true,
            color: false,
            with_calibration: true,
        }
    }
}
