//! # Reflow Tools - 报文消费者
//!
//! **依赖原则**: 只依赖 `reflow-protocol`，不依赖驱动层，可以离线处理报文
//!
//! ## 包含模块
//!
//! - `window` - 带空闲重新对齐的滑动时间窗口
//! - `plot` - 温度曲线和功率曲线的数据模型
//! - `logger` - CSV 会话日志
//!
//! 这些类型都只在一个线程上使用，不需要同步；从读取线程接收报文时
//! 通过 `reflow_driver::ChannelSubscriber` 转到自己的线程。

pub mod logger;
pub mod plot;
pub mod window;

pub use logger::SessionLogger;
pub use plot::{CommandPoint, DEFAULT_IDLE_WINDOW, PlotWindows, TemperaturePoint};
pub use window::WindowBuffer;
