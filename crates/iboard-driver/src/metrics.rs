//! 协调器性能指标模块
//!
//! 零开销的原子计数器，用于监控控制循环的健康状态。所有计数器都使用
//! 原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 协调器实时指标
///
/// 周期内的设备故障不会中断循环，只会体现在这些计数器（和日志）里；
/// 运维侧通过 [`snapshot`](BoardMetrics::snapshot) 观察。
#[derive(Debug, Default)]
pub struct BoardMetrics {
    /// 已执行的控制周期总数
    pub cycles: AtomicU64,

    /// 设备调用失败总数（所有操作合计）
    pub device_errors: AtomicU64,

    /// 批量位置读取失败次数（失败的周期不发布快照）
    pub position_read_failures: AtomicU64,

    /// 周期超限次数（本周期耗时超过节拍，下一拍立即开始）
    pub cycle_overruns: AtomicU64,

    /// 因订阅通道已满而丢弃的快照数
    pub snapshots_dropped: AtomicU64,
}

impl BoardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取人类可读的指标快照
    ///
    /// 原子读取（`Relaxed`），不同计数器之间可能有微小时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            position_read_failures: self.position_read_failures.load(Ordering::Relaxed),
            cycle_overruns: self.cycle_overruns.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器（用于测试）
    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
        self.position_read_failures.store(0, Ordering::Relaxed);
        self.cycle_overruns.store(0, Ordering::Relaxed);
        self.snapshots_dropped.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub device_errors: u64,
    pub position_read_failures: u64,
    pub cycle_overruns: u64,
    pub snapshots_dropped: u64,
}

impl MetricsSnapshot {
    /// 平均每周期设备错误率（百分比）
    ///
    /// `cycles` 为 0 时返回 0.0。
    pub fn device_error_rate(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        (self.device_errors as f64 / self.cycles as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_default_zero() {
        let metrics = BoardMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles, 0);
        assert_eq!(snapshot.device_errors, 0);
        assert_eq!(snapshot.device_error_rate(), 0.0);
    }

    #[test]
    fn test_metrics_increment_and_reset() {
        let metrics = BoardMetrics::new();
        metrics.cycles.fetch_add(200, Ordering::Relaxed);
        metrics.device_errors.fetch_add(3, Ordering::Relaxed);
        metrics.cycle_overruns.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles, 200);
        assert_eq!(snapshot.device_errors, 3);
        assert_eq!(snapshot.cycle_overruns, 1);
        assert_eq!(snapshot.device_error_rate(), 1.5);

        metrics.reset();
        assert_eq!(metrics.snapshot().cycles, 0);
    }
}
