//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::depth_view::DEFAULT_MAX_RANGE_MM;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    resolution: String,
    fps: u32,
    imu_frequency_hz: u32,
    channels: Vec<&'static str>,
    imu_capacity: usize,
    max_boxes: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &BridgeConfig) -> ConfigSummary {
    let c = &config.channels;
    let channels = [
        (c.depth.enabled, "depth"),
        (c.disparity.enabled, "disparity"),
        (c.rectified.enabled, "rectified"),
        (c.points.enabled, "points"),
        (c.imu.enabled, "imu"),
        (c.detection.enabled, "detection"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();

    ConfigSummary {
        resolution: config.device.resolution.to_string(),
        fps: config.device.fps,
        imu_frequency_hz: config.device.imu_frequency_hz,
        channels,
        imu_capacity: config.imu.capacity,
        max_boxes: config.detection.max_boxes,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let c = &config.channels;

    let any_enabled = c.depth.enabled
        || c.disparity.enabled
        || c.rectified.enabled
        || c.points.enabled
        || c.imu.enabled
        || c.detection.enabled;
    if !any_enabled {
        warnings.push("No channels enabled - only the raw frame will be delivered".to_string());
    }

    if c.imu.enabled && config.imu.capacity < config.device.imu_frequency_hz as usize {
        warnings.push(format!(
            "imu.capacity ({}) holds less than one second of IMU data at {} Hz",
            config.imu.capacity, config.device.imu_frequency_hz
        ));
    }

    if config.mock.depth_m * 1000.0 > f32::from(DEFAULT_MAX_RANGE_MM) {
        warnings.push(format!(
            "mock.depth_m ({} m) is beyond the default snapshot display range",
            config.mock.depth_m
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Resolution: {}", summary.resolution);
            println!("  FPS: {}", summary.fps);
            println!("  IMU: {} Hz, capacity {}", summary.imu_frequency_hz, summary.imu_capacity);
            println!("  Channels: {}", summary.channels.join(", "));
            println!("  Max boxes: {}", summary.max_boxes);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
