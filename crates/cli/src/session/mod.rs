//! Device session - mock device, bridge and consumer-side polling.

mod poller;
mod stats;

pub use poller::{poll_outcome, take_resizing, ChannelPoller};
pub use stats::RunStats;

use std::sync::Arc;

use contracts::{BridgeConfig, ChannelKind, ChannelsConfig, DeviceSettings, StereoDevice};
use device::{MockConfig, MockDevice};
use exchange::Bridge;
use tracing::info;

use crate::error::Result;

/// An initialized bridge over a mock device.
///
/// Releasing happens on drop.
pub struct Session {
    bridge: Bridge,
    settings: DeviceSettings,
}

impl Session {
    /// Open the device and initialize the bridge.
    ///
    /// `streaming` starts background producers; otherwise the device only
    /// answers metadata queries.
    pub fn open(config: &BridgeConfig, streaming: bool) -> Result<Self> {
        let mock = MockConfig::from(&config.mock);
        let device: Arc<dyn StereoDevice> = if streaming {
            Arc::new(MockDevice::streaming(mock))
        } else {
            Arc::new(MockDevice::with_config(mock))
        };

        let bridge = Bridge::from_config(device, config);
        let settings = config.device.settings();
        bridge.initialize_with(settings)?;
        info!(
            resolution = %settings.resolution,
            fps = settings.fps,
            streaming,
            "session opened"
        );

        Ok(Self { bridge, settings })
    }

    /// Enable every channel switched on in `channels`
    pub fn enable(&self, channels: &ChannelsConfig) -> Result<Vec<ChannelKind>> {
        Ok(self.bridge.enable_from_config(channels)?)
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Release explicitly (also done on drop)
    pub fn close(self) {
        self.bridge.release();
    }
}
