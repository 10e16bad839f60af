//! Format reduction applied on the producer thread before storage.
//!
//! Shape functions validate a sample and return the stored shape; conversion
//! functions assume a validated sample and a destination of exactly that
//! shape. Conversions are explicit numeric casts, never byte reinterpretation.

use contracts::{PixelData, PlaneImage, RawImage, Shape, StereoFrame};

use crate::ReduceError;

/// Luma weights in BGR order
pub const LUMA_WEIGHTS: [f32; 3] = [0.114, 0.587, 0.299];

/// Depth scale from meters to millimeters
pub const DEPTH_SCALE: f64 = 1000.0;

/// BGR pixel to 8-bit luma (truncating)
#[inline]
pub fn luma(b: u8, g: u8, r: u8) -> u8 {
    (LUMA_WEIGHTS[0] * f32::from(b) + LUMA_WEIGHTS[1] * f32::from(g) + LUMA_WEIGHTS[2] * f32::from(r))
        as u8
}

/// Stored shape of a stereo frame: single-channel, `2W x H` when the right
/// image is present, `W x H` otherwise.
pub fn stereo_shape(frame: &StereoFrame) -> Result<Shape, ReduceError> {
    let left = image_shape(&frame.left)?;
    let width = match &frame.right {
        Some(right) => {
            let right = image_shape(right)?;
            if right != left {
                return Err(ReduceError::DimensionMismatch { left, right });
            }
            left.width * 2
        }
        None => left.width,
    };
    Ok(Shape::new(width, left.height, 1))
}

fn image_shape(image: &RawImage) -> Result<Shape, ReduceError> {
    if image.width == 0 || image.height == 0 {
        return Err(ReduceError::EmptyImage);
    }
    if !matches!(image.channels, 1 | 3) {
        return Err(ReduceError::UnsupportedChannels {
            channels: image.channels,
        });
    }
    if image.data.len() != image.expected_len() {
        return Err(ReduceError::LengthMismatch {
            expected: image.expected_len(),
            actual: image.data.len(),
        });
    }
    Ok(Shape::new(image.width, image.height, image.channels))
}

/// Merge a validated stereo frame side by side, row by row: each output row
/// is the left row followed by the right row. 3-channel input is reduced to
/// luma first.
pub fn merge_stereo(frame: &StereoFrame, dst: &mut [u8]) {
    let width = frame.left.width as usize;
    let out_width = if frame.right.is_some() { width * 2 } else { width };
    if width == 0 {
        return;
    }

    for (row, out) in dst.chunks_exact_mut(out_width).enumerate() {
        let (left_out, right_out) = out.split_at_mut(width);
        reduce_row(&frame.left, row, left_out);
        if let Some(right) = &frame.right {
            reduce_row(right, row, right_out);
        }
    }
}

fn reduce_row(image: &RawImage, row: usize, out: &mut [u8]) {
    let width = image.width as usize;
    match image.channels {
        3 => {
            let start = row * width * 3;
            let src = &image.data[start..start + width * 3];
            for (px, o) in src.chunks_exact(3).zip(out.iter_mut()) {
                *o = luma(px[0], px[1], px[2]);
            }
        }
        _ => {
            let start = row * width;
            out.copy_from_slice(&image.data[start..start + width]);
        }
    }
}

/// Stored shape of a depth, disparity or point plane.
///
/// `out_channels == 1` requires a single-channel plane; otherwise the plane
/// needs at least `out_channels` components per pixel (extras are dropped).
pub fn plane_shape(image: &PlaneImage, out_channels: u32) -> Result<Shape, ReduceError> {
    if image.width == 0 || image.height == 0 || image.data.is_empty() {
        return Err(ReduceError::EmptyImage);
    }
    let supported = if out_channels == 1 {
        image.channels == 1
    } else {
        image.channels >= out_channels
    };
    if !supported {
        return Err(ReduceError::UnsupportedChannels {
            channels: image.channels,
        });
    }
    let expected = image.pixels() * image.channels as usize;
    if image.data.len() != expected {
        return Err(ReduceError::LengthMismatch {
            expected,
            actual: image.data.len(),
        });
    }
    Ok(Shape::new(image.width, image.height, out_channels))
}

/// Run `$body` with `$s` bound to the element slice of any `PixelData` variant
macro_rules! with_elements {
    ($data:expr, |$s:ident| $body:expr) => {
        match $data {
            PixelData::U8($s) => $body,
            PixelData::U16($s) => $body,
            PixelData::I16($s) => $body,
            PixelData::F32($s) => $body,
            PixelData::F64($s) => $body,
        }
    };
}

/// Meters to millimeters: scale by 1000 and cast to `u16`.
///
/// The cast truncates toward zero and saturates: distances beyond 65.535 m
/// clamp to `u16::MAX`, negative and NaN values become 0.
pub fn depth_to_millimeters(src: &PixelData, dst: &mut [u16]) {
    with_elements!(src, |s| {
        for (d, &v) in dst.iter_mut().zip(s.iter()) {
            *d = (v as f64 * DEPTH_SCALE) as u16;
        }
    })
}

/// Any single-channel plane to `f32`
pub fn narrow_to_f32(src: &PixelData, dst: &mut [f32]) {
    with_elements!(src, |s| {
        for (d, &v) in dst.iter_mut().zip(s.iter()) {
            *d = v as f32;
        }
    })
}

/// Interleaved points with `channels` components to XYZ `f32` triples
pub fn points_to_xyz(src: &PixelData, channels: u32, dst: &mut [f32]) {
    let stride = channels as usize;
    if stride < 3 {
        return;
    }
    with_elements!(src, |s| {
        for (p, d) in s.chunks_exact(stride).zip(dst.chunks_exact_mut(3)) {
            d[0] = p[0] as f32;
            d[1] = p[1] as f32;
            d[2] = p[2] as f32;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, fill: impl Fn(usize) -> u8) -> RawImage {
        let data: Vec<u8> = (0..(width * height) as usize).map(fill).collect();
        RawImage::new(width, height, 1, data)
    }

    fn plane(width: u32, height: u32, channels: u32, data: PixelData) -> PlaneImage {
        PlaneImage {
            timestamp: 0.0,
            width,
            height,
            channels,
            data,
        }
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        // Pure blue / green / red
        assert_eq!(luma(255, 0, 0), 29);
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 76);
    }

    #[test]
    fn test_merge_rows_left_then_right() {
        let frame = StereoFrame {
            timestamp: 0.0,
            left: gray(3, 2, |i| i as u8),
            right: Some(gray(3, 2, |i| 100 + i as u8)),
        };
        let shape = stereo_shape(&frame).unwrap();
        assert_eq!(shape, Shape::new(6, 2, 1));

        let mut out = vec![0u8; shape.len()];
        merge_stereo(&frame, &mut out);
        assert_eq!(out, [0, 1, 2, 100, 101, 102, 3, 4, 5, 103, 104, 105]);
    }

    #[test]
    fn test_merge_mono() {
        let frame = StereoFrame {
            timestamp: 0.0,
            left: gray(2, 2, |i| i as u8 * 10),
            right: None,
        };
        let shape = stereo_shape(&frame).unwrap();
        assert_eq!(shape, Shape::new(2, 2, 1));
        let mut out = vec![0u8; shape.len()];
        merge_stereo(&frame, &mut out);
        assert_eq!(out, [0, 10, 20, 30]);
    }

    #[test]
    fn test_merge_color_reduced_to_luma() {
        // 2x1 BGR: white, pure red
        let left = RawImage::new(2, 1, 3, vec![255, 255, 255, 0, 0, 255]);
        let right = RawImage::new(2, 1, 3, vec![0, 0, 0, 255, 0, 0]);
        let frame = StereoFrame {
            timestamp: 0.0,
            left,
            right: Some(right),
        };
        let shape = stereo_shape(&frame).unwrap();
        assert_eq!(shape, Shape::new(4, 1, 1));
        let mut out = vec![0u8; 4];
        merge_stereo(&frame, &mut out);
        assert_eq!(out, [255, 76, 0, 29]);
    }

    #[test]
    fn test_stereo_rejections() {
        let mismatched = StereoFrame {
            timestamp: 0.0,
            left: gray(4, 2, |_| 0),
            right: Some(gray(2, 2, |_| 0)),
        };
        assert!(matches!(
            stereo_shape(&mismatched),
            Err(ReduceError::DimensionMismatch { .. })
        ));

        let four_channel = StereoFrame {
            timestamp: 0.0,
            left: RawImage::new(1, 1, 4, vec![0u8; 4]),
            right: None,
        };
        assert_eq!(
            stereo_shape(&four_channel),
            Err(ReduceError::UnsupportedChannels { channels: 4 })
        );

        let short = StereoFrame {
            timestamp: 0.0,
            left: RawImage::new(2, 2, 1, vec![0u8; 3]),
            right: None,
        };
        assert_eq!(
            stereo_shape(&short),
            Err(ReduceError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );

        let empty = StereoFrame {
            timestamp: 0.0,
            left: RawImage::new(0, 0, 1, Vec::new()),
            right: None,
        };
        assert_eq!(stereo_shape(&empty), Err(ReduceError::EmptyImage));
    }

    #[test]
    fn test_depth_meters_to_millimeters() {
        let src = PixelData::F32(vec![1.5, 0.0, 0.2505, 65.535, 70.0, -1.0, f32::NAN]);
        let mut dst = vec![0u16; src.len()];
        depth_to_millimeters(&src, &mut dst);
        assert_eq!(dst[0], 1500);
        assert_eq!(dst[1], 0);
        assert_eq!(dst[2], 250);
        assert_eq!(dst[4], u16::MAX);
        assert_eq!(dst[5], 0);
        assert_eq!(dst[6], 0);
    }

    #[test]
    fn test_depth_plane_shape() {
        let image = plane(4, 2, 1, PixelData::F32(vec![1.0; 8]));
        assert_eq!(plane_shape(&image, 1).unwrap(), Shape::new(4, 2, 1));

        let three = plane(4, 2, 3, PixelData::F32(vec![1.0; 24]));
        assert_eq!(
            plane_shape(&three, 1),
            Err(ReduceError::UnsupportedChannels { channels: 3 })
        );
    }

    #[test]
    fn test_disparity_narrowing() {
        let src = PixelData::F64(vec![0.5, 12.25, -3.0]);
        let mut dst = [0.0f32; 3];
        narrow_to_f32(&src, &mut dst);
        assert_eq!(dst, [0.5, 12.25, -3.0]);

        let src = PixelData::I16(vec![16, -32]);
        let mut dst = [0.0f32; 2];
        narrow_to_f32(&src, &mut dst);
        assert_eq!(dst, [16.0, -32.0]);
    }

    #[test]
    fn test_points_drop_extra_components() {
        // Two points with 4 components each (X, Y, Z, W)
        let image = plane(2, 1, 4, PixelData::F64(vec![1.0, 2.0, 3.0, 9.0, 4.0, 5.0, 6.0, 9.0]));
        let shape = plane_shape(&image, 3).unwrap();
        assert_eq!(shape, Shape::new(2, 1, 3));

        let mut dst = vec![0.0f32; shape.len()];
        points_to_xyz(&image.data, image.channels, &mut dst);
        assert_eq!(dst, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_points_need_three_components() {
        let image = plane(2, 1, 2, PixelData::F32(vec![0.0; 4]));
        assert_eq!(
            plane_shape(&image, 3),
            Err(ReduceError::UnsupportedChannels { channels: 2 })
        );
    }
}
