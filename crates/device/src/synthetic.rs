//! Synthetic samples and module parameters
//!
//! Deterministic generators shared by the mock device and tests. Sizes
//! follow the caller; content depends only on the arguments.

use std::collections::HashMap;

use bytes::Bytes;
use contracts::{
    CameraParameter, DetectionBox, DetectionEvent, ImuSample, ModuleInfo, ModuleParams,
    PixelData, PlaneImage, RawImage, Resolution, StereoFrame,
};

/// Stereo baseline reported by the synthetic module (meters)
pub const SYNTHETIC_BASELINE_M: f64 = 0.12;

/// Gravity on the Z axis of synthetic IMU samples (m/s²)
pub const GRAVITY: f32 = 9.81;

/// Gradient test pattern shifted by `seq` columns.
///
/// `color` produces BGR images, otherwise gray. The right image is the left
/// one shifted by a fixed disparity of 8 pixels.
pub fn synthetic_stereo(
    width: u32,
    height: u32,
    stereo: bool,
    color: bool,
    seq: u64,
    timestamp: f64,
) -> StereoFrame {
    let left = pattern(width, height, color, seq);
    let right = stereo.then(|| pattern(width, height, color, seq + 8));
    StereoFrame {
        timestamp,
        left,
        right,
    }
}

fn pattern(width: u32, height: u32, color: bool, shift: u64) -> RawImage {
    let channels: u32 = if color { 3 } else { 1 };
    let mut data = Vec::with_capacity((width * height * channels) as usize);
    for y in 0..height as u64 {
        for x in 0..width as u64 {
            let v = ((x + y + shift) % 256) as u8;
            if color {
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            } else {
                data.push(v);
            }
        }
    }
    RawImage::new(width, height, channels, Bytes::from(data))
}

/// Constant-distance depth map in meters
pub fn synthetic_depth(width: u32, height: u32, meters: f32, timestamp: f64) -> PlaneImage {
    PlaneImage {
        timestamp,
        width,
        height,
        channels: 1,
        data: PixelData::F32(vec![meters; (width * height) as usize]),
    }
}

/// Disparity matching a constant depth for focal length `fx`
pub fn synthetic_disparity(width: u32, height: u32, meters: f32, fx: f64, timestamp: f64) -> PlaneImage {
    let disparity = if meters > 0.0 {
        fx * SYNTHETIC_BASELINE_M / f64::from(meters)
    } else {
        0.0
    };
    PlaneImage {
        timestamp,
        width,
        height,
        channels: 1,
        data: PixelData::F64(vec![disparity; (width * height) as usize]),
    }
}

/// Flat wall at `meters`, one point per pixel
pub fn synthetic_points(width: u32, height: u32, meters: f32, fx: f32, timestamp: f64) -> PlaneImage {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x as f32 - cx) * meters / fx);
            data.push((y as f32 - cy) * meters / fx);
            data.push(meters);
        }
    }
    PlaneImage {
        timestamp,
        width,
        height,
        channels: 3,
        data: PixelData::F32(data),
    }
}

/// Stationary IMU with a slow yaw oscillation
pub fn synthetic_imu(timestamp: f64) -> ImuSample {
    ImuSample {
        timestamp,
        accel: [0.0, 0.0, GRAVITY],
        gyro: [0.0, 0.0, (timestamp.sin() * 0.01) as f32],
    }
}

/// `boxes` boxes laid out on a diagonal, plus a BGR snapshot image
pub fn synthetic_detection(width: u32, height: u32, boxes: usize, seq: u64, timestamp: f64) -> DetectionEvent {
    let boxes = (0..boxes)
        .map(|i| {
            let i = i as i32;
            DetectionBox {
                x: 20 * i,
                y: 10 * i,
                width: 40,
                height: 30,
                score: 0.5 + 0.05 * (i % 10) as f32,
                class_id: 1 + i % 9,
            }
        })
        .collect();
    DetectionEvent {
        timestamp,
        boxes,
        image: Some(pattern(width, height, true, seq)),
    }
}

fn camera_parameter(resolution: Resolution) -> CameraParameter {
    let (width, height) = resolution.dimensions();
    let scale = f64::from(width) / 640.0;
    let fx = 400.0 * scale;
    let fy = 400.0 * scale;
    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    CameraParameter {
        width,
        height,
        focal: [fx, fy],
        principal: [cx, cy],
        distortion: [0.01, -0.002, 0.0, 0.0],
        projection: [fx, 0.0, cx, 0.0, 0.0, fy, cy, 0.0, 0.0, 0.0, 1.0, 0.0],
    }
}

/// Factory parameters for both resolutions
pub fn synthetic_module_params() -> ModuleParams {
    let resolutions = [Resolution::Vga640x400, Resolution::Hd1280x800];
    let lenses: HashMap<Resolution, CameraParameter> = resolutions
        .into_iter()
        .map(|r| (r, camera_parameter(r)))
        .collect();
    let mut right = lenses.clone();
    for param in right.values_mut() {
        // Tx = -fx * baseline
        param.projection[3] = -param.focal[0] * SYNTHETIC_BASELINE_M;
    }
    ModuleParams {
        baseline: SYNTHETIC_BASELINE_M,
        camera_channel: 1,
        left: lenses,
        right,
    }
}

pub fn synthetic_module_info() -> ModuleInfo {
    ModuleInfo {
        id: "MOCK-0001".to_string(),
        designer: "imsee".to_string(),
        firmware: "1.0.0-mock".to_string(),
        hardware: "mock".to_string(),
        lens: "2.1mm".to_string(),
        imu: "6-axis".to_string(),
        viewing_angle: "120".to_string(),
        baseline: "120mm".to_string(),
    }
}
