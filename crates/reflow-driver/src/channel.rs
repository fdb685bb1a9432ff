//! Channel 订阅者
//!
//! 把报文转发到 channel，让耗时的消费者（写日志、刷新曲线）在自己的线程上运行，
//! 读取线程只付出一次 `try_send` 的开销。
//!
//! - **无界队列**（[`ChannelSubscriber::unbounded`]）: 不丢报文，消费者落后时队列增长
//! - **有界队列**（[`ChannelSubscriber::new`]）: 队列满时丢弃报文并计数，只适合允许丢帧的显示类消费者
//! - **非阻塞**: 两种模式都不会阻塞读取线程
//!
//! # 使用示例
//!
//! ```rust
//! use reflow_driver::{Broadcaster, ChannelSubscriber};
//! use reflow_protocol::Sample;
//! use std::sync::Arc;
//!
//! let broadcaster = Broadcaster::new();
//! let (subscriber, rx) = ChannelSubscriber::new(64);
//! let dropped = subscriber.dropped_samples().clone();
//! broadcaster.subscribe(Arc::new(subscriber));
//!
//! broadcaster.publish(&Sample::default());
//! assert!(rx.try_recv().is_ok());
//! assert_eq!(dropped.load(std::sync::atomic::Ordering::Relaxed), 0);
//! ```

use crate::error::HandlerError;
use crate::hooks::SampleHandler;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use reflow_protocol::Sample;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 默认队列容量（约 4 分钟 @ 1 条/秒）
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// 转发到 channel 的订阅者
pub struct ChannelSubscriber {
    tx: Sender<Sample>,

    /// 队列满时丢弃的报文数
    dropped_samples: Arc<AtomicU64>,

    /// 成功入队的报文数
    forwarded_samples: Arc<AtomicU64>,
}

impl ChannelSubscriber {
    /// 创建有界订阅者和对应的接收端（队列满时丢弃）
    ///
    /// `capacity` 为 0 时使用 [`DEFAULT_QUEUE_CAPACITY`]。
    pub fn new(capacity: usize) -> (Self, Receiver<Sample>) {
        let capacity = if capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            capacity
        };
        Self::from_channel(bounded(capacity))
    }

    /// 创建无界订阅者：每条报文都会入队，直到接收端关闭
    pub fn unbounded() -> (Self, Receiver<Sample>) {
        Self::from_channel(unbounded())
    }

    fn from_channel((tx, rx): (Sender<Sample>, Receiver<Sample>)) -> (Self, Receiver<Sample>) {
        let subscriber = Self {
            tx,
            dropped_samples: Arc::new(AtomicU64::new(0)),
            forwarded_samples: Arc::new(AtomicU64::new(0)),
        };
        (subscriber, rx)
    }

    /// 丢弃计数器（可以在注册前克隆出来用于监控）
    pub fn dropped_samples(&self) -> &Arc<AtomicU64> {
        &self.dropped_samples
    }

    /// 入队计数器
    pub fn forwarded_samples(&self) -> &Arc<AtomicU64> {
        &self.forwarded_samples
    }
}

impl SampleHandler for ChannelSubscriber {
    fn on_sample(&self, sample: &Sample) -> Result<(), HandlerError> {
        match self.tx.try_send(sample.clone()) {
            Ok(()) => {
                self.forwarded_samples.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(TrySendError::Full(_)) => {
                self.dropped_samples.fetch_add(1, Ordering::Relaxed);
                Err(HandlerError::QueueFull)
            },
            Err(TrySendError::Disconnected(_)) => Err(HandlerError::Disconnected),
        }
    }
}
