//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Data model
//! - A *channel* is one independently enabled, produced and consumed stream
//!   (frame, depth, disparity, rectified pair, point cloud, detection, IMU).
//! - Producer samples arrive through [`StereoDevice`] handlers on device threads.
//! - Timestamps are the device's monotonic clock in seconds (`f64`).

mod calibration;
mod channel;
mod config;
mod device;
mod error;
mod sample;

pub use calibration::*;
pub use channel::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use sample::*;
