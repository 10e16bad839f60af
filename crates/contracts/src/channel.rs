//! Channel identity, enable state and buffer shape.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One independently produced and consumed data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Raw stereo frame, merged side by side as luma
    Frame,
    /// Depth map in millimeters (u16)
    Depth,
    /// Disparity map (f32)
    Disparity,
    /// Rectified stereo pair, merged side by side as luma
    Rectified,
    /// Point cloud as interleaved X,Y,Z f32 triples
    Points,
    /// Detection boxes plus snapshot image
    Detection,
    /// IMU sample stream
    Imu,
}

impl ChannelKind {
    /// Every channel, in registry order
    pub const ALL: [ChannelKind; 7] = [
        ChannelKind::Frame,
        ChannelKind::Depth,
        ChannelKind::Disparity,
        ChannelKind::Rectified,
        ChannelKind::Points,
        ChannelKind::Detection,
        ChannelKind::Imu,
    ];

    /// Stable lowercase name, used as a metrics label
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Frame => "frame",
            ChannelKind::Depth => "depth",
            ChannelKind::Disparity => "disparity",
            ChannelKind::Rectified => "rectified",
            ChannelKind::Points => "points",
            ChannelKind::Detection => "detection",
            ChannelKind::Imu => "imu",
        }
    }

    /// Position in [`ChannelKind::ALL`]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enable state of a channel. Only `Disabled -> Enabled` is a legal transition
/// while the bridge is initialized; release resets everything to `Disabled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Disabled,
    Enabled,
}

/// Dimensions of a stored buffer.
///
/// `channels` is the number of interleaved elements per pixel (1 for luma,
/// depth and disparity, 3 for XYZ points).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Shape {
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Number of pixels (`width * height`)
    #[inline]
    pub const fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of elements required to hold one value of this shape
    #[inline]
    pub const fn len(&self) -> usize {
        self.pixels() * self.channels as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}
