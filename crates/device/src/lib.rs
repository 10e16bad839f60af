//! # Device
//!
//! Producer-side implementations of `contracts::StereoDevice`.
//!
//! - `MockDevice`: hardware-free device with manual or streaming emission
//!   and failure injection
//! - `synthetic`: deterministic sample and calibration generators

pub mod mock_device;
pub mod synthetic;

pub use contracts::{DeviceError, StereoDevice};
pub use mock_device::{MockConfig, MockDevice, StreamRates};
pub use synthetic::{
    synthetic_depth, synthetic_detection, synthetic_disparity, synthetic_imu,
    synthetic_module_info, synthetic_module_params, synthetic_points, synthetic_stereo,
    GRAVITY, SYNTHETIC_BASELINE_M,
};
