//! Error types for CLI operations.

use contracts::{ChannelKind, ContractError};
use exchange::BridgeError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse / validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// Bridge lifecycle or poll error
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// No sample arrived in time
    #[error("No {channel} data after {waited_ms} ms")]
    NoData { channel: ChannelKind, waited_ms: u64 },

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn no_data(channel: ChannelKind, waited_ms: u64) -> Self {
        Self::NoData { channel, waited_ms }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
