//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DeviceInfo, DeviceSettings, LensCalibration, StereoCalibration};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;
use crate::session::Session;

/// Device report for JSON output
#[derive(Serialize)]
struct InfoReport {
    summary: String,
    settings: DeviceSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration: Option<StereoCalibration>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(&args.device)?;
    let session = Session::open(&config, false).context("Failed to open device session")?;
    let bridge = session.bridge();

    let report = InfoReport {
        summary: bridge.module_summary(),
        settings: *session.settings(),
        device: bridge.device_info(),
        calibration: bridge.calibration(),
    };
    session.close();
    info!(
        calibrated = report.calibration.is_some(),
        "Device information collected"
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize device info")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &InfoReport) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Device Information                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📷 {}", report.summary);
    println!(
        "   └─ Settings: {} @ {} fps, IMU {} Hz",
        report.settings.resolution, report.settings.fps, report.settings.imu_frequency_hz
    );

    match &report.device {
        Some(device) => {
            let m = &device.module;
            println!("\n🔧 Module");
            println!("   ├─ ID: {}", m.id);
            println!("   ├─ Designer: {}", m.designer);
            println!("   ├─ Firmware: {}", m.firmware);
            println!("   ├─ Hardware: {}", m.hardware);
            println!("   ├─ Lens: {}", m.lens);
            println!("   ├─ IMU: {}", m.imu);
            println!("   ├─ Viewing angle: {}", m.viewing_angle);
            println!("   ├─ Baseline: {} ({} m)", m.baseline, device.baseline_m);
            println!("   └─ Camera channel: {}", device.camera_channel);
        }
        None => println!("\n🔧 Module: unavailable"),
    }

    match &report.calibration {
        Some(calib) => {
            println!("\n📐 Calibration (baseline {:.4} m)", calib.baseline);
            print_lens("├─", "Left", &calib.left);
            print_lens("└─", "Right", &calib.right);
        }
        None => println!("\n📐 Calibration: unavailable"),
    }

    println!();
}

fn print_lens(prefix: &str, name: &str, lens: &LensCalibration) {
    println!(
        "   {} {}: {}x{} fx={:.2} fy={:.2} cx={:.2} cy={:.2} k=[{:.4}, {:.4}] t=[{:.4}, {:.4}]",
        prefix, name, lens.w, lens.h, lens.fx, lens.fy, lens.cx, lens.cy, lens.k1, lens.k2, lens.t1, lens.t2
    );
}
