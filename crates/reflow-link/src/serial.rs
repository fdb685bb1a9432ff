//! 基于 `serialport` 的真实串口后端

use crate::{LineAssembler, LineReader, LineWriter, LinkConfig, LinkError, SplittableLink};
use serialport::{ClearBuffer, SerialPort};
use std::io::Write;
use std::thread;
use tracing::{debug, info};

/// 串口链路
///
/// 打开后先等待控制器稳定、清空输入缓冲区并丢弃一行（可能是半行），
/// 保证交给上层的第一行从报文边界开始。
pub struct SerialLink {
    reader: LineAssembler<Box<dyn SerialPort>>,
    name: String,
}

impl SerialLink {
    /// 打开串口
    ///
    /// # 错误
    ///
    /// - `LinkError::Open`: 设备不存在、无权限或被占用
    pub fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        info!(
            "Opening serial port {} @ {} baud",
            config.port, config.baud_rate
        );

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| LinkError::Open {
                port: config.port.clone(),
                source: e.into(),
            })?;

        let mut link = Self {
            reader: LineAssembler::new(port),
            name: config.port.clone(),
        };
        link.settle(config)?;
        Ok(link)
    }

    /// 丢弃程序启动前积压在缓冲区里的旧数据
    fn settle(&mut self, config: &LinkConfig) -> Result<(), LinkError> {
        thread::sleep(config.settle_delay);

        self.reader
            .get_ref()
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::Io(e.into()))?;

        match self.reader.read_line() {
            Ok(line) => debug!("Discarded leading line: {:?}", line),
            Err(LinkError::Timeout) => debug!("No leading line within read timeout"),
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl SplittableLink for SerialLink {
    type Reader = LineAssembler<Box<dyn SerialPort>>;
    type Writer = SerialLineWriter;

    fn name(&self) -> &str {
        &self.name
    }

    fn split(self) -> Result<(Self::Reader, Self::Writer), LinkError> {
        let port = self
            .reader
            .get_ref()
            .try_clone()
            .map_err(|e| LinkError::Io(e.into()))?;
        Ok((self.reader, SerialLineWriter { port }))
    }
}

/// 串口写半部
pub struct SerialLineWriter {
    port: Box<dyn SerialPort>,
}

impl LineWriter for SerialLineWriter {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialLineWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLineWriter")
            .field("port", &self.port.name())
            .finish()
    }
}

// 打开不存在的设备应返回结构化的 Open 错误，而不是 panic
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        let config = LinkConfig {
            port: "/dev/reflow-does-not-exist".to_string(),
            ..LinkConfig::default()
        };
        match SerialLink::open(&config) {
            Err(LinkError::Open { port, source }) => {
                assert_eq!(port, "/dev/reflow-does-not-exist");
                assert_ne!(source.kind(), std::io::ErrorKind::TimedOut);
            },
            Err(other) => panic!("Expected Open error, got {other}"),
            Ok(_) => panic!("Opening a missing port must fail"),
        }
    }
}
