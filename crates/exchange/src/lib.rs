//! # Exchange
//!
//! Multi-channel latest-value exchange between a stereo camera/IMU device
//! and a polling consumer.
//!
//! Responsibilities:
//! - One [`Slot`] per image channel: latest value wins, exactly-once take
//! - [`ImuRing`] for the IMU stream: fixed capacity, drain on read
//! - [`DetectionStore`] for detector boxes plus snapshot image
//! - Format reduction on the producer thread ([`reducer`])
//! - The [`Bridge`] context with explicit initialize / release
//!
//! ## Usage Example
//!
//! ```ignore
//! use exchange::{status_code, Bridge};
//!
//! let bridge = Bridge::new(device);
//! bridge.initialize(1, 25)?;
//! bridge.enable_depth(0)?;
//!
//! let (w, h) = bridge.depth_size();
//! let mut depth = vec![0u16; (w * h) as usize];
//! match status_code(&bridge.take_depth(&mut depth)) {
//!     -1 => { /* grow the buffer and retry */ }
//!     0 => { /* nothing new */ }
//!     n => { /* n millimeter values */ }
//! }
//! ```

mod bridge;
mod channels;
mod detection;
pub mod drivers;
mod error;
mod imu_ring;
pub mod reducer;
mod registry;
mod slot;
mod stats;
mod status;

// Re-exports
pub use bridge::{Bridge, NOT_INITIALIZED_SUMMARY};
pub use channels::Channels;
pub use detection::DetectionStore;
pub use error::{BridgeError, ReduceError, Result};
pub use imu_ring::ImuRing;
pub use registry::ChannelRegistry;
pub use slot::{Slot, SlotBuffer, SlotStats, SlotStatsSnapshot};
pub use stats::BridgeStats;
pub use status::{
    enable_status_code, init_status_code, status_code, STATUS_DEVICE_FAILURE, STATUS_LIFECYCLE,
    STATUS_TOO_SMALL,
};
