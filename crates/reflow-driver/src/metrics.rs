//! 读取链路指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 读取链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use reflow_driver::ReaderMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = ReaderMetrics::new();
/// metrics.lines_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.lines_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// 读到的总行数（含格式错误的行）
    pub lines_total: AtomicU64,

    /// 成功解析并发布的报文数
    pub samples_published: AtomicU64,

    /// 格式错误被丢弃的行数（启动阶段和线路噪声时属于正常现象）
    pub malformed_frames: AtomicU64,

    /// 读超时次数（控制器未发送数据时会超时）
    pub read_timeouts: AtomicU64,

    /// 订阅者回调失败次数（返回错误或 panic）
    pub handler_failures: AtomicU64,
}

impl ReaderMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_total: self.lines_total.load(Ordering::Relaxed),
            samples_published: self.samples_published.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.lines_total.store(0, Ordering::Relaxed);
        self.samples_published.store(0, Ordering::Relaxed);
        self.malformed_frames.store(0, Ordering::Relaxed);
        self.read_timeouts.store(0, Ordering::Relaxed);
        self.handler_failures.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_total: u64,
    pub samples_published: u64,
    pub malformed_frames: u64,
    pub read_timeouts: u64,
    pub handler_failures: u64,
}

impl MetricsSnapshot {
    /// 格式错误行占比（百分比）
    ///
    /// 返回 0.0 到 100.0 之间的值。如果 `lines_total` 为 0，返回 0.0。
    pub fn malformed_rate(&self) -> f64 {
        if self.lines_total == 0 {
            return 0.0;
        }
        (self.malformed_frames as f64 / self.lines_total as f64) * 100.0
    }
}
