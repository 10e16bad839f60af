//! # imsee CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 通道轮询、IMU 录制与快照
//! - 优雅关闭处理

mod cli;
mod commands;
mod depth_view;
mod detection_view;
mod error;
mod export;
mod session;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_record_imu, run_snapshot, run_stream, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: cli.log_level().to_string(),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "imsee CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_stream(args).await,
        Commands::RecordImu(args) => run_record_imu(args).await,
        Commands::Snapshot(args) => run_snapshot(args).await,
        Commands::Info(args) => run_info(args),
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
