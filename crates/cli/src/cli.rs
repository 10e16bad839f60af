//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{ChannelKind, ChannelsConfig, Resolution};
use std::path::PathBuf;

use crate::depth_view::DEFAULT_OVERLAY_ALPHA;

/// imsee - stereo camera / IMU frame exchange tools
#[derive(Parser, Debug)]
#[command(
    name = "imsee",
    author,
    version,
    about = "Stereo camera and IMU frame exchange tools",
    long_about = "Drives the latest-value frame exchange from a (mock) stereo camera with IMU.\n\n\
                  Streams and polls channels, records IMU data, captures snapshots \n\
                  and inspects device calibration."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "IMSEE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "IMSEE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level from `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream from the mock device and poll every enabled channel
    Run(RunArgs),

    /// Record IMU samples to a CSV file
    RecordImu(RecordImuArgs),

    /// Capture one frame and depth map as PNG files
    Snapshot(SnapshotArgs),

    /// Show module information and calibration
    Info(InfoArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Options shared by every command that opens the device
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "IMSEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override sensor resolution
    #[arg(long, value_enum)]
    pub resolution: Option<ResolutionArg>,

    /// Override image frame rate (Hz)
    #[arg(long)]
    pub fps: Option<u32>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Enable extra channels on top of the configuration
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub enable: Vec<ChannelArg>,

    /// Consumer poll rate (Hz)
    #[arg(long, default_value = "30")]
    pub poll_hz: f64,

    /// Run time in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "10")]
    pub duration: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "IMSEE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `record-imu` command
#[derive(Parser, Debug, Clone)]
pub struct RecordImuArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Recording time in seconds
    #[arg(long, default_value = "10")]
    pub duration: f64,

    /// Output CSV path
    #[arg(short, long, default_value = "imu_record.csv")]
    pub output: PathBuf,
}

/// Arguments for the `snapshot` command
#[derive(Parser, Debug, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum wait for the first frame and depth map (ms)
    #[arg(long, default_value = "3000")]
    pub timeout_ms: u64,

    /// Depth beyond this range (mm) is drawn black
    #[arg(long, default_value = "4000")]
    pub max_range_mm: u16,

    /// Also capture the point cloud as binary PLY
    #[arg(long)]
    pub points: bool,

    /// Also capture a colourised disparity map
    #[arg(long)]
    pub disparity: bool,

    /// Disparity processor mode; defaults to the configured flags
    #[arg(long, value_enum, requires = "disparity")]
    pub disparity_mode: Option<DisparityModeArg>,

    /// Also capture detector boxes drawn over the detector image
    #[arg(long)]
    pub detection: bool,

    /// Also write the depth map blended over the left view
    #[arg(long)]
    pub overlay: bool,

    /// Opacity of the depth colours in the overlay (0.0 - 1.0)
    #[arg(long, default_value_t = DEFAULT_OVERLAY_ALPHA, value_parser = parse_alpha)]
    pub alpha: f32,
}

fn parse_alpha(s: &str) -> Result<f32, String> {
    let alpha: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&alpha) {
        Ok(alpha)
    } else {
        Err(format!("{alpha} is outside 0.0 - 1.0"))
    }
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "imsee.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionArg {
    #[value(name = "640x400")]
    Vga,
    #[value(name = "1280x800")]
    Hd,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Vga => Resolution::Vga640x400,
            ResolutionArg::Hd => Resolution::Hd1280x800,
        }
    }
}

/// Disparity processor modes
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisparityModeArg {
    Default,
    HighAccuracy,
    LrCheck,
    /// High accuracy with left/right check
    Both,
}

impl DisparityModeArg {
    /// Flag bits accepted by `Bridge::enable_disparity`
    pub fn flags(self) -> i32 {
        match self {
            DisparityModeArg::Default => 0,
            DisparityModeArg::HighAccuracy => 1,
            DisparityModeArg::LrCheck => 2,
            DisparityModeArg::Both => 3,
        }
    }
}

/// Channels that can be switched on from the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelArg {
    Depth,
    Disparity,
    Rectified,
    Points,
    Imu,
    Detection,
}

impl ChannelArg {
    pub fn kind(self) -> ChannelKind {
        match self {
            ChannelArg::Depth => ChannelKind::Depth,
            ChannelArg::Disparity => ChannelKind::Disparity,
            ChannelArg::Rectified => ChannelKind::Rectified,
            ChannelArg::Points => ChannelKind::Points,
            ChannelArg::Imu => ChannelKind::Imu,
            ChannelArg::Detection => ChannelKind::Detection,
        }
    }

    /// Switch the channel on in `channels`, keeping its mode flags
    pub fn apply(self, channels: &mut ChannelsConfig) {
        match self {
            ChannelArg::Depth => channels.depth.enabled = true,
            ChannelArg::Disparity => channels.disparity.enabled = true,
            ChannelArg::Rectified => channels.rectified.enabled = true,
            ChannelArg::Points => channels.points.enabled = true,
            ChannelArg::Imu => channels.imu.enabled = true,
            ChannelArg::Detection => channels.detection.enabled = true,
        }
    }
}
