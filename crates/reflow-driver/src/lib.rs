//! 驱动层模块
//!
//! 本模块提供回流焊炉控制器的遥测采集与命令发送，包括：
//! - 后台读取线程（带超时的按行读取，协作式停止）
//! - 报文广播（ArcSwap 快照，订阅者故障隔离）
//! - Channel 订阅者（把耗时消费转到其他线程）
//! - 命令发送（钳位、格式化，加锁后可多来源使用）
//!
//! # 使用场景
//!
//! 大多数用户只需要 [`OvenBuilder`] 打开串口，再通过 [`Oven`] 订阅报文、发送命令。
//! 需要自定义链路时使用 [`Oven::new`]，需要单独的读取线程时使用 [`Reader`]。

#[cfg(feature = "serial")]
mod builder;
pub mod channel;
pub mod command;
mod error;
pub mod hooks;
pub mod metrics;
mod oven;
pub mod pipeline;
mod reader;
pub mod state;

#[cfg(feature = "serial")]
pub use builder::OvenBuilder;
pub use channel::{ChannelSubscriber, DEFAULT_QUEUE_CAPACITY};
pub use command::CommandSink;
pub use error::{DriverError, HandlerError};
pub use hooks::{Broadcaster, PublishReport, SampleHandler, SubscriptionId};
pub use metrics::{MetricsSnapshot, ReaderMetrics};
pub use oven::Oven;
pub use pipeline::{ReaderExit, reader_loop};
pub use reader::{READER_THREAD_NAME, Reader, ReaderStopHandle};
pub use state::{AtomicReaderState, ReaderState};
