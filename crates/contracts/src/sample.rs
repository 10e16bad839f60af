//! Producer samples and consumer-facing records.
//!
//! Producer samples are what the device hands to a channel handler. They own
//! their data; the handler borrows them for the duration of the callback.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Number of `f64` values one IMU sample occupies on the wire
pub const IMU_WIRE_LEN: usize = 7;

/// Number of `i32` values one detection box occupies on the wire
pub const BOX_WIRE_LEN: usize = 6;

/// Detector class names, indexed by `class_id`
pub const CLASS_NAMES: [&str; 10] = [
    "BG",
    "PERSON",
    "PET_CAT",
    "PET_DOG",
    "SOFA",
    "TABLE",
    "BED",
    "EXCREMENT",
    "WIRE",
    "KEY",
];

/// Single 8-bit image plane (1 = gray, 3 = BGR interleaved)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Bytes,
}

impl RawImage {
    pub fn new(width: u32, height: u32, channels: u32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            channels,
            data: data.into(),
        }
    }

    /// Bytes required by the declared dimensions
    #[inline]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

/// Left/right image pair from one exposure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoFrame {
    /// Device timestamp (seconds)
    pub timestamp: f64,
    pub left: RawImage,
    /// Absent on mono modules
    pub right: Option<RawImage>,
}

/// Typed element buffer produced by the device's processing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
            PixelData::I16(v) => v.len(),
            PixelData::F32(v) => v.len(),
            PixelData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PixelData::U8(_) => "u8",
            PixelData::U16(_) => "u16",
            PixelData::I16(_) => "i16",
            PixelData::F32(_) => "f32",
            PixelData::F64(_) => "f64",
        }
    }
}

/// Depth, disparity or point-cloud plane (`channels` elements per pixel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneImage {
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: PixelData,
}

impl PlaneImage {
    #[inline]
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

/// One inertial measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Device clock (seconds)
    pub timestamp: f64,
    /// Accelerometer (m/s²)
    pub accel: [f32; 3],
    /// Gyroscope (rad/s)
    pub gyro: [f32; 3],
}

impl ImuSample {
    /// Write `[timestamp, ax, ay, az, gx, gy, gz]` into `out[..7]`
    #[inline]
    pub fn write_wire(&self, out: &mut [f64]) {
        out[0] = self.timestamp;
        out[1] = f64::from(self.accel[0]);
        out[2] = f64::from(self.accel[1]);
        out[3] = f64::from(self.accel[2]);
        out[4] = f64::from(self.gyro[0]);
        out[5] = f64::from(self.gyro[1]);
        out[6] = f64::from(self.gyro[2]);
    }
}

/// One detector output box in image pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Confidence in `[0, 1]`
    pub score: f32,
    pub class_id: i32,
}

impl DetectionBox {
    /// `[x, y, width, height, class_id, score * 1000]`, score in fixed point
    #[inline]
    pub fn to_wire(&self) -> [i32; BOX_WIRE_LEN] {
        [
            self.x,
            self.y,
            self.width,
            self.height,
            self.class_id,
            (self.score * 1000.0) as i32,
        ]
    }

    pub fn class_name(&self) -> &'static str {
        usize::try_from(self.class_id)
            .ok()
            .and_then(|i| CLASS_NAMES.get(i).copied())
            .unwrap_or("UNKNOWN")
    }
}

/// One detector event: the boxes plus the image they were computed on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp: f64,
    pub boxes: Vec<DetectionBox>,
    pub image: Option<RawImage>,
}
