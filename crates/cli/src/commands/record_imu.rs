//! `record-imu` command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::{deadline_after, load_config, shutdown_signal, sleep_until_deadline};
use crate::cli::RecordImuArgs;
use crate::export::write_imu_csv;
use crate::session::Session;

/// IMU poll period
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Execute the `record-imu` command
pub async fn run_record_imu(args: &RecordImuArgs) -> Result<()> {
    let config = load_config(&args.device)?;
    let session = Session::open(&config, true).context("Failed to open device session")?;
    session.bridge().enable_imu().context("Failed to enable IMU")?;

    info!(
        duration_s = args.duration,
        output = %args.output.display(),
        "Recording IMU"
    );

    let mut samples = Vec::new();
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = sleep_until_deadline(deadline_after(args.duration));
    let shutdown = shutdown_signal();
    tokio::pin!(deadline, shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let batch = session.bridge().take_imu(config.imu.capacity)?;
                samples.extend(batch);
                print!("\r  recorded {} samples", samples.len());
                std::io::stdout().flush().ok();
            }
            _ = &mut deadline => break,
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping recording");
                break;
            }
        }
    }
    println!();
    session.close();

    write_imu_csv(&args.output, &samples)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(samples = samples.len(), output = %args.output.display(), "IMU recording saved");
    println!("Saved {} samples to {}", samples.len(), args.output.display());
    Ok(())
}
