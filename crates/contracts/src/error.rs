//! Layered error definitions
//!
//! Categorized by source: config / device

use thiserror::Error;

use crate::ChannelKind;

/// Configuration and I/O errors shared across crates
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration parse error keeping the underlying cause
    pub fn config_parse_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures reported by the producer collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be opened
    #[error("device open failed: {message}")]
    OpenFailed { message: String },

    /// The device refused to start a processor
    #[error("processor '{processor}' unavailable: {message}")]
    ProcessorUnavailable { processor: ChannelKind, message: String },

    /// A processor was requested before `open`
    #[error("device is not open")]
    NotOpen,
}

impl DeviceError {
    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed {
            message: message.into(),
        }
    }

    pub fn processor_unavailable(processor: ChannelKind, message: impl Into<String>) -> Self {
        Self::ProcessorUnavailable {
            processor,
            message: message.into(),
        }
    }
}
