//! 命令发送（CommandSink）
//!
//! 把操作员命令钳位、格式化后写到链路的写半部。
//!
//! - 所有命令统一通过 [`OvenCommand::to_line`] 格式化，只有一条写入路径
//! - 写入失败直接返回给调用方，不重试
//! - 上下加热管的手动功率缓存在本地：修改任何一个都会把两个值作为一条
//!   `cmd:` 命令一起发出

use crate::error::DriverError;
use reflow_link::LineWriter;
use reflow_protocol::{OvenCommand, percent_to_duty};
use tracing::debug;

/// 命令发送器
///
/// 只能由一个控制线程使用；多个命令来源时由 [`Oven`](crate::Oven) 加锁保护。
///
/// # Example
///
/// ```rust
/// use reflow_driver::CommandSink;
/// use reflow_link::mock::MockLink;
/// use reflow_link::SplittableLink;
/// use std::time::Duration;
///
/// let (link, _feeder, sent) = MockLink::new(Duration::from_millis(10));
/// let (_reader, writer) = link.split().unwrap();
///
/// let mut sink = CommandSink::new(writer);
/// sink.set_target(1200.0).unwrap();
/// sink.set_manual_top(150.0).unwrap();
///
/// assert_eq!(sent.lines(), vec!["target: 4095", "cmd: 255, 0"]);
/// ```
pub struct CommandSink<W: LineWriter> {
    writer: W,
    /// 上加热管手动功率（原始字节）
    manual_top: u8,
    /// 下加热管手动功率（原始字节）
    manual_bottom: u8,
}

impl<W: LineWriter> CommandSink<W> {
    /// 创建命令发送器，手动功率缓存初始为 0
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            manual_top: 0,
            manual_bottom: 0,
        }
    }

    /// 发送一条命令
    pub fn send(&mut self, command: &OvenCommand) -> Result<(), DriverError> {
        debug!("Sending command: {}", command);
        self.writer.write_line(&command.to_line())?;
        Ok(())
    }

    /// 开始执行回流曲线（先复位，再开始）
    pub fn go(&mut self) -> Result<(), DriverError> {
        self.send(&OvenCommand::Reset)?;
        self.send(&OvenCommand::Go)
    }

    /// 复位控制器
    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.send(&OvenCommand::Reset)
    }

    /// 暂停
    pub fn pause(&mut self) -> Result<(), DriverError> {
        self.send(&OvenCommand::Pause)
    }

    /// 从暂停恢复
    pub fn resume(&mut self) -> Result<(), DriverError> {
        self.send(&OvenCommand::Resume)
    }

    /// 开关手动模式
    pub fn set_manual(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.send(&OvenCommand::Manual(enabled))
    }

    /// 设置上加热管手动功率（百分比），与当前下加热管功率一起发送
    pub fn set_manual_top(&mut self, percent: f64) -> Result<(), DriverError> {
        self.manual_top = percent_to_duty(percent);
        self.send_power()
    }

    /// 设置下加热管手动功率（百分比），与当前上加热管功率一起发送
    pub fn set_manual_bottom(&mut self, percent: f64) -> Result<(), DriverError> {
        self.manual_bottom = percent_to_duty(percent);
        self.send_power()
    }

    /// 设置目标温度（摄氏度），钳位到 [0, 1023.75] ℃
    pub fn set_target(&mut self, celsius: f64) -> Result<(), DriverError> {
        self.send(&OvenCommand::target_celsius(celsius))
    }

    /// 当前缓存的手动功率 `(top, bottom)`（原始字节）
    pub fn manual_power(&self) -> (u8, u8) {
        (self.manual_top, self.manual_bottom)
    }

    /// 取回写半部
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send_power(&mut self) -> Result<(), DriverError> {
        self.send(&OvenCommand::Power {
            top: self.manual_top,
            bottom: self.manual_bottom,
        })
    }
}
