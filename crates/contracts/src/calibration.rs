//! Calibration and module identification
//!
//! Owned by the device; the bridge only reads them. The textual form of
//! [`StereoCalibration`] uses the short keys callers already parse
//! (`w`, `h`, `fx`, ..., `P`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Resolution;

/// Intrinsics of one lens at one resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraParameter {
    pub width: u32,
    pub height: u32,
    /// `[fx, fy]`
    pub focal: [f64; 2],
    /// `[cx, cy]`
    pub principal: [f64; 2],
    /// `[k1, k2, t1, t2]`
    pub distortion: [f64; 4],
    /// 3x4 projection matrix, row major
    pub projection: [f64; 12],
}

/// Full factory parameter set of a module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleParams {
    /// Stereo baseline (meters)
    pub baseline: f64,
    /// Channels per camera image
    pub camera_channel: u32,
    pub left: HashMap<Resolution, CameraParameter>,
    pub right: HashMap<Resolution, CameraParameter>,
}

/// Lens calibration in its serialized form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LensCalibration {
    pub w: u32,
    pub h: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub k1: f64,
    pub k2: f64,
    pub t1: f64,
    pub t2: f64,
    #[serde(rename = "P")]
    pub p: [f64; 12],
}

impl From<&CameraParameter> for LensCalibration {
    fn from(c: &CameraParameter) -> Self {
        Self {
            w: c.width,
            h: c.height,
            fx: c.focal[0],
            fy: c.focal[1],
            cx: c.principal[0],
            cy: c.principal[1],
            k1: c.distortion[0],
            k2: c.distortion[1],
            t1: c.distortion[2],
            t2: c.distortion[3],
            p: c.projection,
        }
    }
}

/// Stereo calibration for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    pub baseline: f64,
    pub left: LensCalibration,
    pub right: LensCalibration,
}

impl StereoCalibration {
    /// Resolution keys tried in order
    pub const LOOKUP_ORDER: [Resolution; 2] = [Resolution::Vga640x400, Resolution::Hd1280x800];

    /// Pick the first resolution present for both lenses
    pub fn lookup(params: &ModuleParams) -> Option<Self> {
        Self::LOOKUP_ORDER.iter().find_map(|res| {
            let left = params.left.get(res)?;
            let right = params.right.get(res)?;
            Some(Self {
                baseline: params.baseline,
                left: left.into(),
                right: right.into(),
            })
        })
    }
}

/// Module identification strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    pub designer: String,
    pub firmware: String,
    pub hardware: String,
    pub lens: String,
    pub imu: String,
    pub viewing_angle: String,
    /// Baseline as printed on the module label
    pub baseline: String,
}

/// Module identification plus calibration-derived facts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(flatten)]
    pub module: ModuleInfo,
    pub baseline_m: f64,
    pub camera_channel: u32,
}
