//! File writers: PNG images, IMU CSV, binary PLY point clouds.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use contracts::{ImuSample, IMU_WIRE_LEN};

use crate::error::Result;

/// CSV header of an IMU recording
pub const IMU_CSV_HEADER: &str = "timestamp,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z";

/// Write an 8-bit gray image
pub fn write_gray_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    image::save_buffer(path, data, width, height, image::ColorType::L8)?;
    Ok(())
}

/// Write an 8-bit RGB image
pub fn write_rgb_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    image::save_buffer(path, data, width, height, image::ColorType::Rgb8)?;
    Ok(())
}

/// Copy the left half of each row of a side-by-side `width x height` image
pub fn left_half(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let half = width / 2;
    data.chunks_exact(width)
        .take(height)
        .flat_map(|row| &row[..half])
        .copied()
        .collect()
}

/// Write IMU samples as CSV with six decimals per value
pub fn write_imu_csv(path: &Path, samples: &[ImuSample]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(IMU_CSV_HEADER.split(','))?;
    for s in samples {
        let mut values = [0.0; IMU_WIRE_LEN];
        s.write_wire(&mut values);
        wtr.write_record(values.iter().map(|v| format!("{v:.6}")))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write XYZ triples as a little-endian binary PLY
pub fn write_ply(path: &Path, xyz: &[f32]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ply")?;
    writeln!(out, "format binary_little_endian 1.0")?;
    writeln!(out, "element vertex {}", xyz.len() / 3)?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "end_header")?;
    for v in &xyz[..xyz.len() / 3 * 3] {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}
