//! Channel enable state

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{ChannelKind, ChannelState};

use crate::{BridgeError, Result};

/// Enable flag per channel kind, readable from any thread without locking.
#[derive(Debug)]
pub struct ChannelRegistry {
    enabled: [AtomicBool; ChannelKind::ALL.len()],
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            enabled: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    /// `Disabled -> Enabled`. A second call for the same channel fails.
    pub fn enable(&self, kind: ChannelKind) -> Result<()> {
        if self.flag(kind).swap(true, Ordering::AcqRel) {
            return Err(BridgeError::ChannelAlreadyEnabled { channel: kind });
        }
        tracing::debug!(channel = %kind, "channel enabled");
        Ok(())
    }

    pub fn state(&self, kind: ChannelKind) -> ChannelState {
        if self.is_enabled(kind) {
            ChannelState::Enabled
        } else {
            ChannelState::Disabled
        }
    }

    #[inline]
    pub fn is_enabled(&self, kind: ChannelKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    /// `Ok` if enabled, `ChannelNotEnabled` otherwise
    #[inline]
    pub fn require(&self, kind: ChannelKind) -> Result<()> {
        if self.is_enabled(kind) {
            Ok(())
        } else {
            Err(BridgeError::ChannelNotEnabled { channel: kind })
        }
    }

    /// Enabled channels in registry order
    pub fn enabled(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Back to all-disabled
    pub fn reset(&self) {
        for flag in &self.enabled {
            flag.store(false, Ordering::Release);
        }
    }

    #[inline]
    fn flag(&self, kind: ChannelKind) -> &AtomicBool {
        &self.enabled[kind.index()]
    }
}
