//! Bridge-wide statistics snapshot

use std::fmt;

use contracts::ChannelKind;

use crate::SlotStatsSnapshot;

#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    pub initialized: bool,
    pub enabled: Vec<ChannelKind>,
    /// Counters of every slot-backed channel
    pub slots: Vec<(ChannelKind, SlotStatsSnapshot)>,
    pub imu_count: usize,
    /// IMU samples overwritten in the full ring
    pub imu_overwritten: u64,
    /// IMU samples dropped by short drains
    pub imu_discarded: u64,
    pub detection_boxes: usize,
    pub callbacks: u64,
}

impl BridgeStats {
    pub fn slot(&self, kind: ChannelKind) -> Option<SlotStatsSnapshot> {
        self.slots
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, stats)| *stats)
    }
}

impl fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Bridge Stats ===")?;
        writeln!(f, "Initialized: {}", self.initialized)?;
        let enabled: Vec<&str> = self.enabled.iter().map(|k| k.as_str()).collect();
        writeln!(f, "Enabled: {}", enabled.join(", "))?;
        for (kind, s) in &self.slots {
            if !self.enabled.contains(kind) {
                continue;
            }
            writeln!(
                f,
                "{:<10} stored={} taken={} overwritten={} realloc={} too_small={}",
                kind.as_str(),
                s.stored,
                s.taken,
                s.overwritten,
                s.reallocations,
                s.too_small
            )?;
        }
        writeln!(
            f,
            "IMU: buffered={} overwritten={} discarded={}",
            self.imu_count, self.imu_overwritten, self.imu_discarded
        )?;
        writeln!(f, "Detection boxes: {}", self.detection_boxes)?;
        write!(f, "Camera callbacks: {}", self.callbacks)
    }
}
