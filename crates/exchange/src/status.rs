//! Integer status codes for callers across a process or language boundary.
//!
//! Polls return the element count on success. `-1` means the destination was
//! too small and must be retried with a larger buffer; `0` covers "nothing
//! new", "not enabled" and "not initialized".

use crate::BridgeError;

/// Destination buffer below the required size
pub const STATUS_TOO_SMALL: i32 = -1;
/// Subsystem already initialized (init) or not initialized (enable)
pub const STATUS_LIFECYCLE: i32 = -1;
/// Device or processor failure
pub const STATUS_DEVICE_FAILURE: i32 = -2;

/// Map a poll result to its status code
pub fn status_code(result: &Result<usize, BridgeError>) -> i32 {
    match result {
        Ok(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        Err(BridgeError::DestinationTooSmall { .. }) => STATUS_TOO_SMALL,
        Err(_) => 0,
    }
}

/// Map an `initialize` result to its status code
pub fn init_status_code(result: &Result<(), BridgeError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(BridgeError::AlreadyInitialized) => STATUS_LIFECYCLE,
        Err(_) => STATUS_DEVICE_FAILURE,
    }
}

/// Map an `enable_*` result to its status code
///
/// Enabling is idempotent at this level: a second enable of the same channel
/// maps to `0` since the channel is already in the requested state. The
/// `Result` still carries `ChannelAlreadyEnabled` for callers that care.
pub fn enable_status_code(result: &Result<(), BridgeError>) -> i32 {
    match result {
        Ok(()) | Err(BridgeError::ChannelAlreadyEnabled { .. }) => 0,
        Err(BridgeError::NotInitialized) => STATUS_LIFECYCLE,
        Err(_) => STATUS_DEVICE_FAILURE,
    }
}
