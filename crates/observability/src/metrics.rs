//! 桥接层指标收集模块
//!
//! 所有指标以 `imsee_` 为前缀，按 `channel` 标签区分通道。

use std::collections::BTreeMap;

use contracts::ChannelKind;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 记录生产者写入一个样本
pub fn record_sample_stored(channel: ChannelKind) {
    counter!("imsee_samples_stored_total", "channel" => channel.as_str()).increment(1);
}

/// 记录消费者取走一个样本
pub fn record_sample_taken(channel: ChannelKind, elements: usize) {
    counter!("imsee_samples_taken_total", "channel" => channel.as_str()).increment(1);
    histogram!("imsee_take_elements", "channel" => channel.as_str()).record(elements as f64);
}

/// 记录未被消费即被覆盖的样本 (latest-wins)
pub fn record_sample_overwritten(channel: ChannelKind) {
    counter!("imsee_samples_overwritten_total", "channel" => channel.as_str()).increment(1);
}

/// 记录被驱动拒绝的生产者样本
pub fn record_sample_rejected(channel: ChannelKind, reason: &'static str) {
    counter!(
        "imsee_samples_rejected_total",
        "channel" => channel.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录缓冲区重新分配
pub fn record_reallocation(channel: ChannelKind, bytes: usize) {
    counter!("imsee_buffer_reallocations_total", "channel" => channel.as_str()).increment(1);
    gauge!("imsee_buffer_bytes", "channel" => channel.as_str()).set(bytes as f64);
}

/// 记录 IMU 环形缓冲区满后覆盖的最旧样本
pub fn record_imu_overwritten(count: u64) {
    if count > 0 {
        counter!("imsee_imu_overwritten_total").increment(count);
    }
}

/// 记录一次 IMU 读取
///
/// `discarded` 为超出 `max_samples` 而被丢弃的样本数。
pub fn record_imu_drain(returned: usize, discarded: usize) {
    histogram!("imsee_imu_drain_samples").record(returned as f64);
    if discarded > 0 {
        counter!("imsee_imu_discarded_total").increment(discarded as u64);
    }
}

/// 记录检测事件的框数量
pub fn record_detection_boxes(count: usize, truncated: bool) {
    gauge!("imsee_detection_boxes").set(count as f64);
    if truncated {
        counter!("imsee_detection_truncated_total").increment(1);
    }
}

/// 记录一次轮询的结果
pub fn record_poll(channel: ChannelKind, outcome: PollOutcome) {
    counter!(
        "imsee_polls_total",
        "channel" => channel.as_str(),
        "result" => outcome.as_str()
    )
    .increment(1);
}

/// 为导出器注册指标说明
pub fn describe_metrics() {
    describe_counter!(
        "imsee_samples_stored_total",
        Unit::Count,
        "Samples written into a channel slot by the device callback"
    );
    describe_counter!(
        "imsee_samples_taken_total",
        Unit::Count,
        "Samples copied out by the consumer"
    );
    describe_histogram!(
        "imsee_take_elements",
        Unit::Count,
        "Elements copied per successful take"
    );
    describe_counter!(
        "imsee_samples_overwritten_total",
        Unit::Count,
        "Samples replaced before the consumer read them"
    );
    describe_counter!(
        "imsee_samples_rejected_total",
        Unit::Count,
        "Producer samples rejected by a channel driver"
    );
    describe_counter!(
        "imsee_buffer_reallocations_total",
        Unit::Count,
        "Slot buffer reallocations after a shape change"
    );
    describe_gauge!("imsee_buffer_bytes", Unit::Bytes, "Current slot buffer size");
    describe_counter!(
        "imsee_imu_overwritten_total",
        Unit::Count,
        "IMU samples evicted from a full ring"
    );
    describe_histogram!(
        "imsee_imu_drain_samples",
        Unit::Count,
        "IMU samples returned per drain"
    );
    describe_counter!(
        "imsee_imu_discarded_total",
        Unit::Count,
        "Buffered IMU samples dropped by a drain smaller than the ring"
    );
    describe_gauge!(
        "imsee_detection_boxes",
        Unit::Count,
        "Boxes in the latest detection event"
    );
    describe_counter!(
        "imsee_detection_truncated_total",
        Unit::Count,
        "Detection events truncated to the box limit"
    );
    describe_counter!("imsee_polls_total", Unit::Count, "Consumer polls by result");
}

/// 单次轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 拷贝了 n 个元素
    Delivered(usize),
    /// 没有新数据
    NotReady,
    /// 目标缓冲区过小
    TooSmall,
    /// 其它错误 (未初始化、通道未启用)
    Failed,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Delivered(_) => "delivered",
            PollOutcome::NotReady => "not_ready",
            PollOutcome::TooSmall => "too_small",
            PollOutcome::Failed => "failed",
        }
    }
}

/// 单通道轮询统计
#[derive(Debug, Clone, Default)]
pub struct ChannelPollStats {
    pub polls: u64,
    pub delivered: u64,
    pub not_ready: u64,
    pub too_small: u64,
    pub failed: u64,
    /// 累计拷贝元素数
    pub elements: u64,
    /// 两次成功读取之间的间隔 (毫秒)
    pub interval_ms: RunningStats,
    last_delivery_s: Option<f64>,
}

/// 轮询指标聚合器
///
/// 在内存中聚合轮询结果，便于 CLI 输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PollStatsAggregator {
    channels: BTreeMap<ChannelKind, ChannelPollStats>,
    /// IMU 累计读出样本数
    pub imu_samples: u64,
}

impl PollStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    ///
    /// `now_s` 为调用方的单调时钟 (秒)，用于计算读取间隔。
    pub fn update(&mut self, channel: ChannelKind, outcome: PollOutcome, now_s: f64) {
        let stats = self.channels.entry(channel).or_default();
        stats.polls += 1;
        match outcome {
            PollOutcome::Delivered(n) => {
                stats.delivered += 1;
                stats.elements += n as u64;
                if let Some(last) = stats.last_delivery_s {
                    stats.interval_ms.push((now_s - last) * 1000.0);
                }
                stats.last_delivery_s = Some(now_s);
            }
            PollOutcome::NotReady => stats.not_ready += 1,
            PollOutcome::TooSmall => stats.too_small += 1,
            PollOutcome::Failed => stats.failed += 1,
        }
    }

    /// 累加 IMU 读出样本数
    pub fn add_imu_samples(&mut self, count: usize) {
        self.imu_samples += count as u64;
    }

    pub fn channel(&self, channel: ChannelKind) -> Option<&ChannelPollStats> {
        self.channels.get(&channel)
    }

    /// 生成摘要报告
    pub fn summary(&self, elapsed_s: f64) -> PollSummary {
        let channels = self
            .channels
            .iter()
            .map(|(kind, stats)| ChannelSummary {
                channel: *kind,
                polls: stats.polls,
                delivered: stats.delivered,
                not_ready: stats.not_ready,
                too_small: stats.too_small,
                failed: stats.failed,
                rate_hz: if elapsed_s > 0.0 {
                    stats.delivered as f64 / elapsed_s
                } else {
                    0.0
                },
                interval_ms: StatsSummary::from(&stats.interval_ms),
            })
            .collect();

        PollSummary {
            elapsed_s,
            imu_samples: self.imu_samples,
            channels,
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 单通道摘要
#[derive(Debug, Clone)]
pub struct ChannelSummary {
    pub channel: ChannelKind,
    pub polls: u64,
    pub delivered: u64,
    pub not_ready: u64,
    pub too_small: u64,
    pub failed: u64,
    pub rate_hz: f64,
    pub interval_ms: StatsSummary,
}

/// 轮询摘要
#[derive(Debug, Clone, Default)]
pub struct PollSummary {
    pub elapsed_s: f64,
    pub imu_samples: u64,
    pub channels: Vec<ChannelSummary>,
}

impl std::fmt::Display for PollSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Poll Summary ({:.1}s) ===", self.elapsed_s)?;
        for ch in &self.channels {
            writeln!(
                f,
                "{:<10} polls={} delivered={} ({:.1} Hz) not_ready={} too_small={} failed={}",
                ch.channel.as_str(),
                ch.polls,
                ch.delivered,
                ch.rate_hz,
                ch.not_ready,
                ch.too_small,
                ch.failed
            )?;
            writeln!(f, "           interval (ms): {}", ch.interval_ms)?;
        }
        writeln!(f, "IMU samples drained: {}", self.imu_samples)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
