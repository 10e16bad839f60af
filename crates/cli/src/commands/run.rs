//! `run` command implementation.

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::{deadline_after, load_config, shutdown_signal, sleep_until_deadline};
use crate::cli::RunArgs;
use crate::session::{ChannelPoller, RunStats, Session};

/// Execute the `run` command
pub async fn run_stream(args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.device)?;
    for channel in &args.enable {
        info!(channel = %channel.kind(), "Enabling channel from CLI");
        channel.apply(&mut config.channels);
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let session = Session::open(&config, true).context("Failed to open device session")?;
    session
        .enable(&config.channels)
        .context("Failed to enable channels")?;
    let channels = session.bridge().enabled_channels();
    info!(
        channels = ?channels,
        poll_hz = args.poll_hz,
        duration_s = args.duration,
        "Polling started"
    );

    let mut poller = ChannelPoller::new(session.settings(), config.imu.capacity);
    let mut ticker = interval(Duration::from_secs_f64(1.0 / args.poll_hz.max(0.1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = sleep_until_deadline(deadline_after(args.duration));
    let shutdown = shutdown_signal();
    tokio::pin!(deadline, shutdown);

    let started = Instant::now();
    loop {
        tokio::select! {
            _ = ticker.tick() => poller.poll_all(session.bridge(), &channels),
            _ = &mut deadline => {
                info!("Run duration reached");
                break;
            }
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping...");
                break;
            }
        }
    }

    let stats = RunStats {
        duration: started.elapsed(),
        polls: poller.summary(),
        bridge: session.bridge().stats(),
    };
    session.close();

    info!(
        duration_secs = stats.duration.as_secs_f64(),
        callbacks = stats.bridge.callbacks,
        imu_samples = stats.polls.imu_samples,
        "Run finished"
    );
    stats.print_summary();
    Ok(())
}
