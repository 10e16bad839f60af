//! Run statistics.

use std::time::Duration;

use contracts::ChannelKind;
use exchange::BridgeStats;
use observability::PollSummary;

/// Statistics from a `run` session
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Wall time of the poll loop
    pub duration: Duration,

    /// Consumer-side poll results
    pub polls: PollSummary,

    /// Producer-side counters from the bridge
    pub bridge: BridgeStats,
}

impl RunStats {
    /// Camera callbacks per second seen by the bridge
    pub fn camera_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bridge.callbacks as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of produced frames that were never taken (percent)
    pub fn frame_loss(&self) -> f64 {
        match self.bridge.slot(ChannelKind::Frame) {
            Some(s) if s.stored > 0 => s.overwritten as f64 / s.stored as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Run Statistics                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Camera callbacks: {}", self.bridge.callbacks);
        println!("   ├─ Camera rate: {:.2} Hz", self.camera_rate());
        println!("   ├─ Frames overwritten unread: {:.1}%", self.frame_loss());
        println!("   └─ IMU samples drained: {}", self.polls.imu_samples);

        println!("\n📈 Polls");
        let last = self.polls.channels.len().saturating_sub(1);
        for (i, ch) in self.polls.channels.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!(
                "   {} {:<10} delivered {}/{} ({:.1} Hz), not ready {}, too small {}, failed {}",
                prefix,
                ch.channel.as_str(),
                ch.delivered,
                ch.polls,
                ch.rate_hz,
                ch.not_ready,
                ch.too_small,
                ch.failed
            );
        }

        println!("\n{}", self.bridge);
        println!();
    }
}
