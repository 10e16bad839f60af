//! `snapshot` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{ChannelKind, DetectionBox, DisparityMode, Shape};
use exchange::Bridge;
use image::RgbImage;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use super::load_config;
use crate::cli::SnapshotArgs;
use crate::depth_view::{
    center_distance, center_value, colorize_depth, colorize_disparity, format_distance,
    overlay_depth, region_means, DepthMap,
};
use crate::detection_view::{box_label, canvas, draw_boxes};
use crate::error::CliError;
use crate::export::{left_half, write_gray_png, write_ply, write_rgb_png};
use crate::session::{take_resizing, Session};

const WAIT_STEP: Duration = Duration::from_millis(20);
const GRID: usize = 3;

/// Channels captured on top of the frame and the depth map
#[derive(Debug, Clone, Copy, Default)]
struct Extras {
    points: bool,
    disparity: bool,
    detection: bool,
}

impl From<&SnapshotArgs> for Extras {
    fn from(args: &SnapshotArgs) -> Self {
        Self {
            points: args.points,
            disparity: args.disparity,
            detection: args.detection,
        }
    }
}

/// One detection event: boxes plus the detector image when it had one
struct DetectionCapture {
    boxes: Vec<DetectionBox>,
    image: Option<(Vec<u8>, Shape)>,
}

/// Samples captured by one snapshot
#[derive(Default)]
struct Capture {
    frame: Option<(Vec<u8>, Shape)>,
    depth: Option<(Vec<u16>, u32, u32)>,
    points: Option<Vec<f32>>,
    disparity: Option<(Vec<f32>, u32, u32)>,
    detection: Option<DetectionCapture>,
}

impl Capture {
    fn complete(&self, extras: Extras) -> bool {
        self.missing(extras).is_none()
    }

    /// First channel still missing
    fn missing(&self, extras: Extras) -> Option<ChannelKind> {
        if self.frame.is_none() {
            Some(ChannelKind::Frame)
        } else if self.depth.is_none() {
            Some(ChannelKind::Depth)
        } else if extras.points && self.points.is_none() {
            Some(ChannelKind::Points)
        } else if extras.disparity && self.disparity.is_none() {
            Some(ChannelKind::Disparity)
        } else if extras.detection && self.detection.is_none() {
            Some(ChannelKind::Detection)
        } else {
            None
        }
    }

    fn poll(&mut self, bridge: &Bridge, extras: Extras, max_boxes: usize) -> exchange::Result<()> {
        if self.frame.is_none() {
            let mut buf = Vec::new();
            if let Some(n) = ready(take_resizing(&mut buf, |dst| bridge.take_frame(dst)))? {
                buf.truncate(n);
                self.frame = Some((buf, bridge.frame_info()));
            }
        }
        if self.depth.is_none() {
            let mut buf = Vec::new();
            if let Some(n) = ready(take_resizing(&mut buf, |dst| bridge.take_depth(dst)))? {
                buf.truncate(n);
                let (w, h) = bridge.depth_size();
                self.depth = Some((buf, w, h));
            }
        }
        if extras.points && self.points.is_none() {
            let mut buf = Vec::new();
            if let Some(n) = ready(take_resizing(&mut buf, |dst| bridge.take_points(dst)))? {
                buf.truncate(n * 3);
                self.points = Some(buf);
            }
        }
        if extras.disparity && self.disparity.is_none() {
            let mut buf = Vec::new();
            if let Some(n) = ready(take_resizing(&mut buf, |dst| bridge.take_disparity(dst)))? {
                buf.truncate(n);
                let (w, h) = bridge.disparity_size();
                self.disparity = Some((buf, w, h));
            }
        }
        if extras.detection && self.detection.is_none() {
            // The image read keeps readiness; taking the boxes clears it
            let mut buf = Vec::new();
            let image = ready(take_resizing(&mut buf, |dst| bridge.read_detection_image(dst)))?
                .map(|n| {
                    buf.truncate(n);
                    (buf, bridge.detection_image_info())
                });
            let mut boxes = vec![DetectionBox::default(); max_boxes];
            if let Some(n) = ready(bridge.take_detection_boxes(&mut boxes))? {
                boxes.truncate(n);
                self.detection = Some(DetectionCapture { boxes, image });
            }
        }
        Ok(())
    }
}

/// `NotReady` is not an error while waiting
fn ready(result: exchange::Result<usize>) -> exchange::Result<Option<usize>> {
    match result {
        Ok(n) => Ok(Some(n)),
        Err(e) if e.is_not_ready() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Execute the `snapshot` command
pub async fn run_snapshot(args: &SnapshotArgs) -> Result<()> {
    let config = load_config(&args.device)?;
    let extras = Extras::from(args);
    let session = Session::open(&config, true).context("Failed to open device session")?;
    let bridge = session.bridge();
    bridge
        .enable_depth(config.channels.depth.flags())
        .context("Failed to enable depth")?;
    if extras.points {
        bridge.enable_points().context("Failed to enable points")?;
    }
    let disparity_mode = args
        .disparity_mode
        .map_or(config.channels.disparity.flags(), |mode| mode.flags());
    if extras.disparity {
        bridge
            .enable_disparity(disparity_mode)
            .context("Failed to enable disparity")?;
    }
    if extras.detection {
        bridge.enable_detector().context("Failed to enable detector")?;
    }

    let started = Instant::now();
    let timeout = Duration::from_millis(args.timeout_ms);
    let mut capture = Capture::default();
    while let Some(missing) = capture.missing(extras) {
        if started.elapsed() >= timeout {
            return Err(CliError::no_data(missing, args.timeout_ms).into());
        }
        capture.poll(bridge, extras, config.detection.max_boxes)?;
        if !capture.complete(extras) {
            sleep(WAIT_STEP).await;
        }
    }
    debug!(waited_ms = started.elapsed().as_millis() as u64, "snapshot captured");

    let single_width = session.settings().resolution.dimensions().0;
    session.close();

    let out = &args.output_dir;
    std::fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let left = capture
        .frame
        .as_ref()
        .map(|(frame, shape)| left_view(frame, *shape, single_width));
    if let Some((gray, w, h)) = &left {
        save(&out.join("left.png"), |path| write_gray_png(path, gray, *w, *h))?;
    }
    if let Some((depth, w, h)) = &capture.depth {
        save(&out.join("depth.png"), |path| {
            write_rgb_png(path, &colorize_depth(depth, args.max_range_mm), *w, *h)
        })?;
        print_regions(depth, *w as usize, *h as usize);

        if args.overlay {
            if let Some((gray, lw, lh)) = &left {
                let map = DepthMap {
                    data: depth,
                    width: *w,
                    height: *h,
                };
                let img = overlay_depth(gray, *lw, *lh, map, args.max_range_mm, args.alpha);
                save(&out.join("overlay.png"), |path| write_rgb(path, &img))?;
                let centre = center_distance(depth, *w as usize, *h as usize, args.max_range_mm);
                println!(
                    "  overlay {:.0}%, centre distance {}",
                    args.alpha * 100.0,
                    format_distance(centre)
                );
            }
        }
    }
    if let Some(points) = &capture.points {
        let path = out.join("points.ply");
        write_ply(&path, points)?;
        println!("Saved {} ({} points)", path.display(), points.len() / 3);
    }
    if let Some((disparity, w, h)) = &capture.disparity {
        save(&out.join("disparity.png"), |path| {
            write_rgb_png(path, &colorize_disparity(disparity), *w, *h)
        })?;
        let centre = center_value(disparity, *w as usize, *h as usize).filter(|v| *v > 0.0);
        println!(
            "  mode {}, centre disparity {}",
            mode_label(DisparityMode::from_flags(disparity_mode)),
            centre.map_or("N/A".to_string(), |v| format!("{v:.1}"))
        );
    }
    if let Some(detection) = &capture.detection {
        let fallback = left.as_ref().map(|(gray, w, h)| (gray.as_slice(), Shape::new(*w, *h, 1)));
        if let Some(img) = detection_image(detection, fallback) {
            save(&out.join("detection.png"), |path| write_rgb(path, &img))?;
        }
        print_detections(&detection.boxes);
    }

    info!(output_dir = %out.display(), "Snapshot written");
    Ok(())
}

fn save<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> crate::error::Result<()>,
{
    write(path)?;
    println!("Saved {}", path.display());
    Ok(())
}

fn write_rgb(path: &Path, img: &RgbImage) -> crate::error::Result<()> {
    write_rgb_png(path, img.as_raw(), img.width(), img.height())
}

/// Left view of a frame; side-by-side frames are cropped to their left half
fn left_view(frame: &[u8], shape: Shape, single_width: u32) -> (Vec<u8>, u32, u32) {
    if shape.width == single_width * 2 {
        let left = left_half(frame, shape.width as usize, shape.height as usize);
        (left, single_width, shape.height)
    } else {
        (frame.to_vec(), shape.width, shape.height)
    }
}

/// Boxes drawn over the detector image, or over `fallback` when the event
/// carried no usable image
fn detection_image(
    detection: &DetectionCapture,
    fallback: Option<(&[u8], Shape)>,
) -> Option<RgbImage> {
    let mut img = detection
        .image
        .as_ref()
        .and_then(|(data, shape)| canvas(data, *shape))
        .or_else(|| fallback.and_then(|(data, shape)| canvas(data, shape)))?;
    draw_boxes(&mut img, &detection.boxes);
    Some(img)
}

fn mode_label(mode: DisparityMode) -> &'static str {
    match (mode.high_accuracy, mode.lr_check) {
        (false, false) => "DEFAULT",
        (true, false) => "HIGH_ACCURACY",
        (false, true) => "LR_CHECK",
        (true, true) => "HIGH_ACCURACY+LR_CHECK",
    }
}

fn print_regions(depth: &[u16], width: usize, height: usize) {
    let means = region_means(depth, width, height, GRID, GRID);
    println!("\nRegion distances ({GRID}x{GRID}):");
    for row in means.chunks(GRID) {
        let cells: Vec<String> = row.iter().map(|m| format!("{:>8}", format_distance(*m))).collect();
        println!("  {}", cells.join(" "));
    }
}

fn print_detections(boxes: &[DetectionBox]) {
    println!("\ndetections: {}", boxes.len());
    for b in boxes {
        println!(
            "  {:<16} at ({}, {}) {}x{}",
            box_label(b),
            b.x,
            b.y,
            b.width,
            b.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_args(dir: &Path) -> SnapshotArgs {
        SnapshotArgs {
            device: crate::cli::DeviceArgs {
                config: None,
                resolution: None,
                fps: Some(60),
            },
            output_dir: dir.to_path_buf(),
            timeout_ms: 5000,
            max_range_mm: 4000,
            points: false,
            disparity: false,
            disparity_mode: None,
            detection: false,
            overlay: false,
            alpha: 0.5,
        }
    }

    #[test]
    fn test_ready_maps_not_ready() {
        assert_eq!(ready(Ok(3)).unwrap(), Some(3));
        let not_ready = Err(exchange::BridgeError::NotReady {
            channel: ChannelKind::Depth,
        });
        assert_eq!(ready(not_ready).unwrap(), None);
        assert!(ready(Err(exchange::BridgeError::NotInitialized)).is_err());
    }

    #[test]
    fn test_capture_missing_order() {
        let all = Extras {
            points: true,
            disparity: true,
            detection: true,
        };
        let mut capture = Capture::default();
        assert!(!capture.complete(Extras::default()));
        assert_eq!(capture.missing(all), Some(ChannelKind::Frame));
        capture.frame = Some((vec![0; 4], Shape::new(2, 2, 1)));
        assert_eq!(capture.missing(all), Some(ChannelKind::Depth));
        capture.depth = Some((vec![0; 4], 2, 2));
        assert!(capture.complete(Extras::default()));
        assert_eq!(capture.missing(all), Some(ChannelKind::Points));
        capture.points = Some(vec![0.0; 3]);
        assert_eq!(capture.missing(all), Some(ChannelKind::Disparity));
        capture.disparity = Some((vec![0.0; 4], 2, 2));
        assert_eq!(capture.missing(all), Some(ChannelKind::Detection));
        capture.detection = Some(DetectionCapture {
            boxes: Vec::new(),
            image: None,
        });
        assert!(capture.complete(all));
    }

    #[test]
    fn test_left_view_crops_side_by_side() {
        // 4x1 side-by-side of two 2x1 views
        let (left, w, h) = left_view(&[10, 20, 30, 40], Shape::new(4, 1, 1), 2);
        assert_eq!((left, w, h), (vec![10, 20], 2, 1));
        let (mono, w, _) = left_view(&[10, 20], Shape::new(2, 1, 1), 2);
        assert_eq!((mono, w), (vec![10, 20], 2));
    }

    #[test]
    fn test_detection_image_falls_back_to_left_view() {
        let detection = DetectionCapture {
            boxes: vec![DetectionBox {
                x: 0,
                y: 0,
                width: 6,
                height: 6,
                score: 0.8,
                class_id: 7,
            }],
            image: None,
        };
        let gray = [50u8; 64];
        let img = detection_image(&detection, Some((&gray, Shape::new(8, 8, 1)))).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(2, 2).0, [50, 50, 50]);
        assert!(detection_image(&detection, None).is_none());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(mode_label(DisparityMode::from_flags(0)), "DEFAULT");
        assert_eq!(mode_label(DisparityMode::from_flags(2)), "LR_CHECK");
        assert_eq!(mode_label(DisparityMode::from_flags(3)), "HIGH_ACCURACY+LR_CHECK");
    }

    #[tokio::test]
    async fn test_snapshot_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let args = SnapshotArgs {
            points: true,
            ..snapshot_args(dir.path())
        };
        run_snapshot(&args).await.unwrap();
        for name in ["left.png", "depth.png", "points.ply"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        assert!(!dir.path().join("overlay.png").exists());
        let left = image::open(dir.path().join("left.png")).unwrap();
        assert_eq!((left.width(), left.height()), (640, 400));
    }

    #[tokio::test]
    async fn test_snapshot_disparity_detection_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let args = SnapshotArgs {
            disparity: true,
            disparity_mode: Some(crate::cli::DisparityModeArg::Both),
            detection: true,
            overlay: true,
            alpha: 0.7,
            ..snapshot_args(dir.path())
        };
        run_snapshot(&args).await.unwrap();

        let disparity = image::open(dir.path().join("disparity.png")).unwrap().to_rgb8();
        assert_eq!(disparity.dimensions(), (640, 400));
        // flat synthetic scene: every pixel sits at the top of the colour map
        assert_eq!(disparity.get_pixel(10, 10).0, crate::depth_view::jet(255));

        let overlay = image::open(dir.path().join("overlay.png")).unwrap().to_rgb8();
        assert_eq!(overlay.dimensions(), (640, 400));
        assert_eq!(overlay.get_pixel(320, 200).0, [255, 255, 255]);

        let detection = image::open(dir.path().join("detection.png")).unwrap();
        assert!(detection.width() > 0);
    }
}
