//! 回流焊炉门面（Oven）
//!
//! 把链路的读半部交给后台 [`Reader`]，写半部交给加锁的 [`CommandSink`]，
//! 报文通过共享的 [`Broadcaster`] 分发给订阅者。

use crate::channel::ChannelSubscriber;
use crate::command::CommandSink;
use crate::error::DriverError;
use crate::hooks::{Broadcaster, SampleHandler, SubscriptionId};
use crate::metrics::{MetricsSnapshot, ReaderMetrics};
use crate::reader::{Reader, ReaderStopHandle};
use crate::state::ReaderState;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use reflow_link::{LineWriter, SplittableLink};
use reflow_protocol::{OvenCommand, Sample};
use std::sync::Arc;
use tracing::{info, warn};

type BoxedWriter = Box<dyn LineWriter + Send>;

/// 回流焊炉控制器连接
///
/// # 关闭顺序
///
/// [`shutdown`](Self::shutdown) 和 `Drop` 都保证：请求停止 → 等待读取线程退出 →
/// 释放写半部（以及底层串口）。
///
/// # Example
///
/// ```rust
/// use reflow_driver::Oven;
/// use reflow_link::mock::MockLink;
/// use std::time::Duration;
///
/// let (link, feeder, sent) = MockLink::new(Duration::from_millis(20));
/// let oven = Oven::new(link).unwrap();
///
/// let (_id, rx) = oven.subscribe_channel(16);
/// feeder.push("idle,0,0,250,248,0,0,0");
/// let sample = rx.recv_timeout(Duration::from_secs(2)).unwrap();
/// assert_eq!(sample.sense_top, 62.5);
///
/// oven.go().unwrap();
/// assert_eq!(sent.lines(), vec!["reset", "go"]);
///
/// oven.shutdown().unwrap();
/// ```
pub struct Oven {
    reader: Reader,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<ReaderMetrics>,
    commands: Mutex<CommandSink<BoxedWriter>>,
    link_name: String,
}

impl Oven {
    /// 拆分链路并启动读取线程
    pub fn new<L: SplittableLink>(link: L) -> Result<Self, DriverError> {
        let link_name = link.name().to_string();
        let (source, writer) = link.split()?;

        let metrics = Arc::new(ReaderMetrics::new());
        let broadcaster = Arc::new(Broadcaster::with_metrics(metrics.clone()));

        let publisher = broadcaster.clone();
        let mut reader = Reader::with_metrics(
            source,
            move |sample: &Sample| {
                publisher.publish(sample);
            },
            metrics.clone(),
        );
        reader.start()?;

        info!("Oven connected on {}", link_name);

        Ok(Self {
            reader,
            broadcaster,
            metrics,
            commands: Mutex::new(CommandSink::new(Box::new(writer))),
            link_name,
        })
    }

    /// 链路名称（串口路径）
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// 注册订阅者（回调在读取线程上运行，必须快速返回）
    pub fn subscribe(&self, handler: Arc<dyn SampleHandler>) -> SubscriptionId {
        self.broadcaster.subscribe(handler)
    }

    /// 注册一个有界 channel 订阅者，在调用方线程上消费报文（队列满时丢弃）
    pub fn subscribe_channel(&self, capacity: usize) -> (SubscriptionId, Receiver<Sample>) {
        let (subscriber, rx) = ChannelSubscriber::new(capacity);
        (self.subscribe(Arc::new(subscriber)), rx)
    }

    /// 注册一个无界 channel 订阅者，不会丢失任何报文
    ///
    /// 日志等需要完整数据的消费者使用这个接口。
    pub fn subscribe_unbounded(&self) -> (SubscriptionId, Receiver<Sample>) {
        let (subscriber, rx) = ChannelSubscriber::unbounded();
        (self.subscribe(Arc::new(subscriber)), rx)
    }

    /// 注销订阅者
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    /// 共享的广播器
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn go(&self) -> Result<(), DriverError> {
        self.commands.lock().go()
    }

    pub fn reset(&self) -> Result<(), DriverError> {
        self.commands.lock().reset()
    }

    pub fn pause(&self) -> Result<(), DriverError> {
        self.commands.lock().pause()
    }

    pub fn resume(&self) -> Result<(), DriverError> {
        self.commands.lock().resume()
    }

    pub fn set_manual(&self, enabled: bool) -> Result<(), DriverError> {
        self.commands.lock().set_manual(enabled)
    }

    /// 上加热管手动功率（百分比）
    pub fn set_manual_top(&self, percent: f64) -> Result<(), DriverError> {
        self.commands.lock().set_manual_top(percent)
    }

    /// 下加热管手动功率（百分比）
    pub fn set_manual_bottom(&self, percent: f64) -> Result<(), DriverError> {
        self.commands.lock().set_manual_bottom(percent)
    }

    /// 目标温度（摄氏度）
    pub fn set_target(&self, celsius: f64) -> Result<(), DriverError> {
        self.commands.lock().set_target(celsius)
    }

    /// 发送任意命令
    pub fn send(&self, command: &OvenCommand) -> Result<(), DriverError> {
        self.commands.lock().send(command)
    }

    /// 当前缓存的手动功率 `(top, bottom)`（原始字节）
    pub fn manual_power(&self) -> (u8, u8) {
        self.commands.lock().manual_power()
    }

    /// 读取链路指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 读取线程状态
    pub fn reader_state(&self) -> ReaderState {
        self.reader.state()
    }

    /// 读取线程停止句柄
    pub fn stop_handle(&self) -> ReaderStopHandle {
        self.reader.stop_handle()
    }

    /// 读取线程是否还在运行
    ///
    /// 链路断开后返回 `false`，调用方应调用 [`shutdown`](Self::shutdown) 取得原因。
    pub fn is_healthy(&self) -> bool {
        self.reader.state().is_running() && !self.reader.is_finished()
    }

    /// 关闭连接
    ///
    /// # 错误
    ///
    /// 读取线程此前因链路断开退出时返回 `DriverError::StreamLost`。
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        self.reader.stop();
        let result = self.reader.join();
        info!("Oven on {} shut down", self.link_name);
        result
    }
}

impl Drop for Oven {
    fn drop(&mut self) {
        // 字段在 drop 之后才释放，写半部一定晚于读取线程退出
        self.reader.stop();
        if let Err(e) = self.reader.join() {
            warn!("Reader on {} ended with error: {}", self.link_name, e);
        }
        self.broadcaster.clear();
    }
}
