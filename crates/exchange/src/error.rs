//! Exchange error types

use contracts::{ChannelKind, DeviceError, Shape};
use thiserror::Error;

/// Errors returned by bridge lifecycle and consumer calls.
///
/// Every variant is recoverable; the bridge stays in a well-defined state.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Never initialized, or already released
    #[error("bridge is not initialized")]
    NotInitialized,

    #[error("bridge is already initialized")]
    AlreadyInitialized,

    #[error("channel {channel} is not enabled")]
    ChannelNotEnabled { channel: ChannelKind },

    #[error("channel {channel} is already enabled")]
    ChannelAlreadyEnabled { channel: ChannelKind },

    /// No new value since the last successful take
    #[error("no new data on channel {channel}")]
    NotReady { channel: ChannelKind },

    /// Caller buffer below the required size; nothing was written
    #[error("destination too small for channel {channel}: required {required}, capacity {capacity}")]
    DestinationTooSmall {
        channel: ChannelKind,
        required: usize,
        capacity: usize,
    },

    /// The producer rejected the enable request
    #[error("producer failed to enable channel {channel}")]
    ProducerFailure {
        channel: ChannelKind,
        #[source]
        source: DeviceError,
    },

    #[error("failed to open device")]
    DeviceOpen {
        #[source]
        source: DeviceError,
    },

    /// Producer sample rejected by a channel driver
    #[error("invalid sample on channel {channel}")]
    InvalidSample {
        channel: ChannelKind,
        #[source]
        source: ReduceError,
    },
}

impl BridgeError {
    #[inline]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, BridgeError::NotReady { .. })
    }

    #[inline]
    pub fn is_too_small(&self) -> bool {
        matches!(self, BridgeError::DestinationTooSmall { .. })
    }
}

/// Rejections raised while validating a producer sample
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReduceError {
    #[error("empty image")]
    EmptyImage,

    #[error("unsupported channel count {channels}")]
    UnsupportedChannels { channels: u32 },

    #[error("data length {actual} does not match dimensions (expected {expected})")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("left image {left} and right image {right} differ")]
    DimensionMismatch { left: Shape, right: Shape },
}

impl ReduceError {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            ReduceError::EmptyImage => "empty",
            ReduceError::UnsupportedChannels { .. } => "channels",
            ReduceError::LengthMismatch { .. } => "length",
            ReduceError::DimensionMismatch { .. } => "dimensions",
        }
    }
}

/// Exchange Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;
