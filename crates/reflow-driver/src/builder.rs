//! Builder 模式实现
//!
//! 提供链式构造串口 `Oven` 实例的便捷方式。

use crate::error::DriverError;
use crate::oven::Oven;
use reflow_link::{LinkConfig, SerialLink};
use std::time::Duration;
use tracing::info;

/// Oven Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use reflow_driver::OvenBuilder;
/// use std::time::Duration;
///
/// // 使用默认配置（/dev/ttyUSB000，9600 波特）
/// let oven = OvenBuilder::new().build().unwrap();
///
/// // 自定义串口和超时
/// let oven = OvenBuilder::new()
///     .port("/dev/ttyACM0")
///     .baud_rate(115_200)
///     .read_timeout(Duration::from_millis(300))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct OvenBuilder {
    config: LinkConfig,
}

impl OvenBuilder {
    /// 创建新的 Builder（默认链路配置）
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有的链路配置开始
    pub fn from_config(config: LinkConfig) -> Self {
        Self { config }
    }

    /// 设置串口设备路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    /// 设置波特率
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// 设置读一行的超时（决定停止响应延迟）
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// 设置打开串口后的稳定等待时间
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// 当前链路配置
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// 打开串口并启动读取线程
    ///
    /// # 错误
    ///
    /// 打开失败时返回 `DriverError::Link(LinkError::Open { .. })`，属于启动阶段的致命错误。
    pub fn build(self) -> Result<Oven, DriverError> {
        info!(
            "Opening {} at {} baud (read timeout {:?})",
            self.config.port, self.config.baud_rate, self.config.read_timeout
        );
        let link = SerialLink::open(&self.config)?;
        Oven::new(link)
    }
}
