//! # Reflow Link Layer
//!
//! 串口链路抽象层：把无可靠性保证的字节流封装为"按行读 / 按行写"的接口。
//!
//! - [`LineReader`]：读一行（带超时），由后台读取线程独占
//! - [`LineWriter`]：写一行，由控制线程独占
//! - [`SplittableLink`]：把一条全双工链路拆成独立的读、写两半
//!
//! 读写方向互相独立，因此读线程和控制线程可以同时使用同一个串口；
//! 但同一方向上不能有两个使用者。

use std::io;
use std::time::Duration;
use thiserror::Error;

mod lines;
pub use lines::{LineAssembler, MAX_LINE_BYTES};

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::{SerialLineWriter, SerialLink};

#[cfg(feature = "mock")]
pub mod mock;

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    /// 打开串口失败（启动阶段的致命错误）
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    /// 读超时（正常现象，调用方应重试）
    #[error("Read timeout")]
    Timeout,

    /// 字节流结束（设备断开）
    #[error("End of stream")]
    Eof,

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
}

impl LinkError {
    /// 是否为可恢复的读超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// 串口链路配置
///
/// # Example
///
/// ```
/// use reflow_link::LinkConfig;
/// use std::time::Duration;
///
/// let config = LinkConfig {
///     port: "/dev/ttyACM0".to_string(),
///     ..LinkConfig::default()
/// };
/// assert_eq!(config.read_timeout, Duration::from_millis(700));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// 串口设备路径（如 `/dev/ttyUSB0`、`COM3`）
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 单次读一行的超时
    ///
    /// 决定了读取线程响应 `stop()` 的最长延迟。
    pub read_timeout: Duration,
    /// 打开串口后等待控制器稳定的时间（之后清空输入缓冲区）
    pub settle_delay: Duration,
}

/// 默认串口设备
pub const DEFAULT_PORT: &str = "/dev/ttyUSB000";

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(700),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// 按行读取
pub trait LineReader {
    /// 读取一行（不含行结束符）
    ///
    /// # 错误
    ///
    /// - `LinkError::Timeout`: 超时内没有读到完整的一行（已读到的部分字节会保留到下次调用）
    /// - `LinkError::Eof` / `LinkError::Io`: 链路已不可用
    fn read_line(&mut self) -> Result<String, LinkError>;
}

/// 按行写入
pub trait LineWriter {
    /// 写入一行文本（`line` 必须自带行结束符）
    fn write_line(&mut self, line: &str) -> Result<(), LinkError>;
}

impl<T: LineReader + ?Sized> LineReader for Box<T> {
    fn read_line(&mut self) -> Result<String, LinkError> {
        (**self).read_line()
    }
}

impl<T: LineWriter + ?Sized> LineWriter for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        (**self).write_line(line)
    }
}

/// 可拆分为读、写两半的链路
pub trait SplittableLink {
    type Reader: LineReader + Send + 'static;
    type Writer: LineWriter + Send + 'static;

    /// 链路名称（用于日志）
    fn name(&self) -> &str;

    /// 拆分为独立的读、写两半
    fn split(self) -> Result<(Self::Reader, Self::Writer), LinkError>;
}
