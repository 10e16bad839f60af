//! Depth and disparity visualisation: jet colouring, region distances and
//! the depth-over-camera overlay.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_cross_mut;

/// Default display range (mm)
pub const DEFAULT_MAX_RANGE_MM: u16 = 4000;

/// Default overlay opacity of the depth colours
pub const DEFAULT_OVERLAY_ALPHA: f32 = 0.5;

/// Disparity at this percentile of the valid pixels maps to the top colour
const DISPARITY_PERCENTILE: f64 = 0.95;

const MARKER: Rgb<u8> = Rgb([255, 255, 255]);

/// Jet colour map: 0 = dark blue, 255 = dark red
pub fn jet(value: u8) -> [u8; 3] {
    let v = f32::from(value) / 255.0;
    let channel = |center: f32| ((1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Colourise a millimeter depth map as RGB.
///
/// Near is red, far is blue; `0` and anything beyond `max_range_mm` is black.
pub fn colorize_depth(depth_mm: &[u16], max_range_mm: u16) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(depth_mm.len() * 3);
    for &d in depth_mm {
        rgb.extend_from_slice(&depth_color(d, max_range_mm).unwrap_or([0, 0, 0]));
    }
    rgb
}

/// Jet colour of one depth value, `None` when invalid for `max_range_mm`
fn depth_color(d: u16, max_range_mm: u16) -> Option<[u8; 3]> {
    if d == 0 || d > max_range_mm {
        return None;
    }
    let norm = (255.0 - f32::from(d) / f32::from(max_range_mm.max(1)) * 255.0) as u8;
    Some(jet(norm))
}

/// Linear-interpolated percentile of the positive values, `None` if there
/// are none
fn positive_percentile(values: &[f32], q: f64) -> Option<f32> {
    let mut valid: Vec<f32> = values.iter().copied().filter(|v| *v > 0.0).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f32::total_cmp);
    let rank = q * (valid.len() - 1) as f64;
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    let frac = (rank - lo as f64) as f32;
    Some(valid[lo] + (valid[hi] - valid[lo]) * frac)
}

/// Colourise a disparity map as RGB.
///
/// Scaled so the 95th percentile of the positive values is the top of the
/// colour map; non-positive disparity is black.
pub fn colorize_disparity(disparity: &[f32]) -> Vec<u8> {
    let mut rgb = vec![0u8; disparity.len() * 3];
    let Some(scale) = positive_percentile(disparity, DISPARITY_PERCENTILE) else {
        return rgb;
    };
    for (px, &v) in rgb.chunks_exact_mut(3).zip(disparity) {
        if v > 0.0 {
            let norm = (v / scale * 255.0).clamp(0.0, 255.0) as u8;
            px.copy_from_slice(&jet(norm));
        }
    }
    rgb
}

/// Value at the centre pixel of a `width x height` map
pub fn center_value<T: Copy>(values: &[T], width: usize, height: usize) -> Option<T> {
    values.get(height / 2 * width + width / 2).copied()
}

/// Distance (meters) at the centre of a depth map; `None` when the centre
/// is invalid for `max_range_mm`
pub fn center_distance(
    depth_mm: &[u16],
    width: usize,
    height: usize,
    max_range_mm: u16,
) -> Option<f64> {
    center_value(depth_mm, width, height)
        .filter(|&d| d > 0 && d <= max_range_mm)
        .map(|d| f64::from(d) / 1000.0)
}

/// Millimeter depth map with its dimensions
#[derive(Debug, Clone, Copy)]
pub struct DepthMap<'a> {
    pub data: &'a [u16],
    pub width: u32,
    pub height: u32,
}

impl DepthMap<'_> {
    /// Nearest sample for pixel `(x, y)` of a `view_w x view_h` view
    fn sample(&self, x: u32, y: u32, view_w: u32, view_h: u32) -> u16 {
        let dx = u64::from(x) * u64::from(self.width) / u64::from(view_w.max(1));
        let dy = u64::from(y) * u64::from(self.height) / u64::from(view_h.max(1));
        self.data
            .get((dy * u64::from(self.width) + dx) as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Blend coloured depth over a gray `width x height` camera view.
///
/// The depth map is scaled to the view with nearest-neighbour sampling and
/// only pixels with valid depth are blended, at `alpha` opacity. A cross marks
/// the centre.
pub fn overlay_depth(
    gray: &[u8],
    width: u32,
    height: u32,
    depth: DepthMap<'_>,
    max_range_mm: u16,
    alpha: f32,
) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = RgbImage::from_fn(width, height, |x, y| {
        let g = gray.get((y * width + x) as usize).copied().unwrap_or(0);
        match depth_color(depth.sample(x, y, width, height), max_range_mm) {
            Some(color) => Rgb(color.map(|c| {
                (f32::from(g) * (1.0 - alpha) + f32::from(c) * alpha).round() as u8
            })),
            None => Rgb([g, g, g]),
        }
    });
    if width > 0 && height > 0 {
        draw_cross_mut(&mut out, MARKER, (width / 2) as i32, (height / 2) as i32);
    }
    out
}

/// Mean distance (meters) of valid pixels in each cell of a `rows x cols`
/// grid, row-major. `None` when a cell has no valid pixel.
pub fn region_means(
    depth_mm: &[u16],
    width: usize,
    height: usize,
    rows: usize,
    cols: usize,
) -> Vec<Option<f64>> {
    let (rh, rw) = (height / rows.max(1), width / cols.max(1));
    let mut means = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let (mut sum, mut count) = (0u64, 0u64);
            for y in r * rh..(r + 1) * rh {
                let row = &depth_mm[y * width..(y + 1) * width];
                for &d in &row[c * rw..(c + 1) * rw] {
                    if d > 0 {
                        sum += u64::from(d);
                        count += 1;
                    }
                }
            }
            means.push((count > 0).then(|| sum as f64 / count as f64 / 1000.0));
        }
    }
    means
}

/// `"1.50m"` or `"N/A"`
pub fn format_distance(mean_m: Option<f64>) -> String {
    match mean_m {
        Some(m) => format!("{m:.2}m"),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        // far end is blue, near end is red
        let far = jet(0);
        assert_eq!(far[0], 0);
        assert!(far[2] > 100);
        let near = jet(255);
        assert!(near[0] > 100);
        assert_eq!(near[2], 0);
    }

    #[test]
    fn test_colorize_invalid_is_black() {
        let rgb = colorize_depth(&[0, 5000, 1000], DEFAULT_MAX_RANGE_MM);
        assert_eq!(&rgb[..6], &[0; 6]);
        assert_ne!(&rgb[6..9], &[0, 0, 0]);
    }

    #[test]
    fn test_colorize_near_is_red() {
        let rgb = colorize_depth(&[100, 3900], DEFAULT_MAX_RANGE_MM);
        // near: red dominates; far: blue dominates
        assert!(rgb[0] > rgb[2]);
        assert!(rgb[5] > rgb[3]);
    }

    #[test]
    fn test_region_means() {
        // 3x3 image, one pixel per cell; centre cell invalid
        let depth = [1500, 1500, 1500, 1500, 0, 1500, 1000, 2000, 3000];
        let means = region_means(&depth, 3, 3, 3, 3);
        assert_eq!(means.len(), 9);
        assert_eq!(means[0], Some(1.5));
        assert_eq!(means[4], None);
        assert_eq!(means[8], Some(3.0));
        assert_eq!(format_distance(means[0]), "1.50m");
        assert_eq!(format_distance(means[4]), "N/A");
    }

    #[test]
    fn test_region_means_ignores_zero() {
        // 6x3 image, 1x2 grid: left cell mixes zeros and 2000
        let mut depth = vec![0u16; 18];
        depth[0] = 2000;
        depth[7] = 2000;
        let means = region_means(&depth, 6, 3, 1, 2);
        assert_eq!(means, vec![Some(2.0), None]);
    }

    #[test]
    fn test_disparity_scaled_to_percentile() {
        // 20 values 1..=20: 95th percentile = 19.05, so 20 saturates
        let disp: Vec<f32> = (1..=20).map(|v| v as f32).collect();
        let rgb = colorize_disparity(&disp);
        assert_eq!(&rgb[57..60], &jet(255));
        assert_eq!(&rgb[0..3], &jet((1.0 / 19.05 * 255.0) as u8));
    }

    #[test]
    fn test_disparity_invalid_is_black() {
        assert_eq!(colorize_disparity(&[0.0, -1.0]), vec![0; 6]);
        let rgb = colorize_disparity(&[0.0, 8.0]);
        assert_eq!(&rgb[..3], &[0, 0, 0]);
        assert_eq!(&rgb[3..], &jet(255));
    }

    #[test]
    fn test_center_distance() {
        let depth = [0, 0, 0, 0, 1500, 0, 0, 0, 0];
        assert_eq!(center_distance(&depth, 3, 3, DEFAULT_MAX_RANGE_MM), Some(1.5));
        assert_eq!(center_distance(&depth, 3, 3, 1000), None);
        assert_eq!(center_distance(&[0; 4], 2, 2, DEFAULT_MAX_RANGE_MM), None);
        assert_eq!(center_value(&[1.0f32, 2.0, 3.0, 4.0], 2, 2), Some(4.0));
    }

    #[test]
    fn test_overlay_blends_valid_depth_only() {
        // 4x2 view over a 2x1 depth map: left half invalid, right half 1 m
        let gray = [100u8; 8];
        let depth = [0u16, 1000];
        let map = DepthMap {
            data: &depth,
            width: 2,
            height: 1,
        };
        let img = overlay_depth(&gray, 4, 2, map, DEFAULT_MAX_RANGE_MM, 0.5);
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(0, 0).0, [100, 100, 100]);

        let color = depth_color(1000, DEFAULT_MAX_RANGE_MM).unwrap();
        let expected = color.map(|c| ((100.0 + f32::from(c)) * 0.5).round() as u8);
        assert_eq!(img.get_pixel(3, 0).0, expected);
        // centre marker
        assert_eq!(img.get_pixel(2, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_overlay_alpha_zero_keeps_camera() {
        let gray = [42u8; 4];
        let depth = [1000u16; 4];
        let map = DepthMap {
            data: &depth,
            width: 2,
            height: 2,
        };
        let img = overlay_depth(&gray, 2, 2, map, DEFAULT_MAX_RANGE_MM, 0.0);
        assert_eq!(img.get_pixel(0, 0).0, [42, 42, 42]);
    }
}
