//! 报文广播（Broadcaster）
//!
//! 把读取线程解析出的每条 [`Sample`] 同步分发给任意数量的订阅者。
//!
//! # 设计原则
//!
//! - **快照分发**: 每次 `publish` 开始时加载一次订阅者列表快照（`ArcSwap`），
//!   发布过程中新加入的订阅者不会收到这条报文，退订不会打断正在进行的分发
//! - **无锁发布**: `publish` 只做一次原子加载，订阅/退订使用 RCU 更新列表
//! - **故障隔离**: 单个订阅者返回错误或 panic 只记录日志，不影响其他订阅者和读取线程
//! - **非阻塞**: 回调运行在读取线程上，必须快速返回；耗时处理应使用
//!   [`ChannelSubscriber`](crate::ChannelSubscriber) 转到其他线程
//!
//! # 使用示例
//!
//! ```rust
//! use reflow_driver::{Broadcaster, HandlerError};
//! use reflow_protocol::Sample;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let broadcaster = Broadcaster::new();
//! let count = Arc::new(AtomicU64::new(0));
//!
//! let counter = count.clone();
//! let id = broadcaster.subscribe(Arc::new(move |_: &Sample| -> Result<(), HandlerError> {
//!     counter.fetch_add(1, Ordering::Relaxed);
//!     Ok(())
//! }));
//!
//! broadcaster.publish(&Sample::default());
//! assert_eq!(count.load(Ordering::Relaxed), 1);
//!
//! assert!(broadcaster.unsubscribe(id));
//! ```

use crate::error::HandlerError;
use crate::metrics::ReaderMetrics;
use arc_swap::ArcSwap;
use reflow_protocol::Sample;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// 报文回调 Trait
///
/// # 性能要求
///
/// - **非阻塞**: 回调在读取线程上同步执行，禁止慢速 I/O
/// - **Channel 模式**: 需要落盘或刷新界面时，推荐 `try_send` 到其他线程处理
pub trait SampleHandler: Send + Sync {
    /// 收到一条报文时调用
    fn on_sample(&self, sample: &Sample) -> Result<(), HandlerError>;
}

impl<F> SampleHandler for F
where
    F: Fn(&Sample) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_sample(&self, sample: &Sample) -> Result<(), HandlerError> {
        self(sample)
    }
}

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: Arc<dyn SampleHandler>,
}

/// 单次发布的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// 成功处理的订阅者数
    pub delivered: usize,
    /// 返回错误或 panic 的订阅者数
    pub failed: usize,
}

/// 报文广播器
pub struct Broadcaster {
    subscribers: ArcSwap<Vec<Subscriber>>,
    next_id: AtomicU64,
    metrics: Option<Arc<ReaderMetrics>>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// 创建空的广播器
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
            metrics: None,
        }
    }

    /// 创建广播器，并把回调失败计入 `metrics.handler_failures`
    pub fn with_metrics(metrics: Arc<ReaderMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new()
        }
    }

    /// 注册订阅者
    ///
    /// 只会收到注册之后开始的 `publish` 调用中的报文。
    pub fn subscribe(&self, handler: Arc<dyn SampleHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber { id, handler };

        self.subscribers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(subscriber.clone());
            next
        });

        id
    }

    /// 注销订阅者；句柄不存在时返回 `false`
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.subscribers.rcu(|current| {
            let next: Vec<Subscriber> = current.iter().filter(|s| s.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// 移除所有订阅者
    pub fn clear(&self) {
        self.subscribers.store(Arc::new(Vec::new()));
    }

    /// 订阅者数量
    pub fn len(&self) -> usize {
        self.subscribers.load().len()
    }

    /// 是否没有订阅者
    pub fn is_empty(&self) -> bool {
        self.subscribers.load().is_empty()
    }

    /// 把一条报文同步分发给发布开始时的全部订阅者（按注册顺序）
    pub fn publish(&self, sample: &Sample) -> PublishReport {
        let snapshot = self.subscribers.load_full();
        let mut report = PublishReport::default();

        for subscriber in snapshot.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.handler.on_sample(sample)))
                .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))));

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.handler_failures.fetch_add(1, Ordering::Relaxed);
                    }
                    warn!(
                        "Subscriber {:?} failed at t={:.2}s: {}",
                        subscriber.id, sample.time, e
                    );
                },
            }
        }

        report
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
