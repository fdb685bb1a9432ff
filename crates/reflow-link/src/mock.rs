//! Mock 链路（无硬件依赖）
//!
//! 读半部由 channel 驱动：[`MockFeeder`] 推送的每一行就是控制器发来的一条报文，
//! 通道为空时按配置的超时返回 `Timeout`，所有 `MockFeeder` 被 drop 后返回 `Eof`。
//! 写半部把每一行记录到 [`MockSentLog`]。
//!
//! ```
//! use reflow_link::mock::MockLink;
//! use reflow_link::{LineReader, LineWriter, SplittableLink};
//! use std::time::Duration;
//!
//! let (link, feeder, sent) = MockLink::new(Duration::from_millis(10));
//! let (mut reader, mut writer) = link.split().unwrap();
//!
//! feeder.push("idle,0,0,250,248,0,0,0");
//! assert_eq!(reader.read_line().unwrap(), "idle,0,0,250,248,0,0,0");
//!
//! writer.write_line("go\n").unwrap();
//! assert_eq!(sent.lines(), vec!["go".to_string()]);
//! ```

use crate::{LineReader, LineWriter, LinkError, SplittableLink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Mock 全双工链路
pub struct MockLink {
    reader: MockLineReader,
    writer: MockLineWriter,
}

impl MockLink {
    /// 创建 Mock 链路
    ///
    /// # 返回
    ///
    /// - `(link, feeder, sent)`: 链路、报文推送端、已发送命令记录
    pub fn new(read_timeout: Duration) -> (Self, MockFeeder, MockSentLog) {
        let (tx, rx) = unbounded();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let link = Self {
            reader: MockLineReader {
                rx,
                timeout: read_timeout,
            },
            writer: MockLineWriter {
                sent: sent.clone(),
                fail_writes: fail_writes.clone(),
            },
        };

        (link, MockFeeder { tx }, MockSentLog { sent, fail_writes })
    }

    /// 创建按脚本回放的链路：依次返回 `lines`，之后返回 `Eof`
    pub fn scripted<I, S>(lines: I, read_timeout: Duration) -> (Self, MockSentLog)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (link, feeder, sent) = Self::new(read_timeout);
        for line in lines {
            feeder.push(line);
        }
        (link, sent)
    }
}

impl SplittableLink for MockLink {
    type Reader = MockLineReader;
    type Writer = MockLineWriter;

    fn name(&self) -> &str {
        "mock"
    }

    fn split(self) -> Result<(Self::Reader, Self::Writer), LinkError> {
        Ok((self.reader, self.writer))
    }
}

/// 报文推送端（模拟控制器发送）
#[derive(Clone)]
pub struct MockFeeder {
    tx: Sender<String>,
}

impl MockFeeder {
    /// 推送一行；读半部已被 drop 时返回 `false`
    pub fn push(&self, line: impl Into<String>) -> bool {
        self.tx.send(line.into()).is_ok()
    }
}

/// Mock 读半部
pub struct MockLineReader {
    rx: Receiver<String>,
    timeout: Duration,
}

impl LineReader for MockLineReader {
    fn read_line(&mut self) -> Result<String, LinkError> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(line) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(RecvTimeoutError::Timeout) => Err(LinkError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Eof),
        }
    }
}

/// Mock 写半部
pub struct MockLineWriter {
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl LineWriter for MockLineWriter {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock link write failure",
            )));
        }
        // 一次写入可能包含多行（例如 "reset\ngo\n"）
        let mut sent = self.sent.lock();
        sent.extend(line.lines().map(str::to_string));
        Ok(())
    }
}

/// 已发送命令记录
#[derive(Clone)]
pub struct MockSentLog {
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockSentLog {
    /// 已发送的全部行（不含行结束符）
    pub fn lines(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// 取出并清空已发送记录
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// 让后续写入失败（模拟设备断开）
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_times_out_when_idle() {
        let (link, _feeder, _sent) = MockLink::new(Duration::from_millis(5));
        let (mut reader, _writer) = link.split().unwrap();
        assert!(matches!(reader.read_line(), Err(LinkError::Timeout)));
    }

    #[test]
    fn test_scripted_link_ends_with_eof() {
        let (link, _sent) = MockLink::scripted(["a", "b\n"], Duration::from_millis(5));
        let (mut reader, _writer) = link.split().unwrap();
        assert_eq!(reader.read_line().unwrap(), "a");
        assert_eq!(reader.read_line().unwrap(), "b");
        assert!(matches!(reader.read_line(), Err(LinkError::Eof)));
    }

    #[test]
    fn test_writer_records_and_fails_on_demand() {
        let (link, _feeder, sent) = MockLink::new(Duration::from_millis(5));
        let (_reader, mut writer) = link.split().unwrap();

        writer.write_line("reset\ngo\n").unwrap();
        assert_eq!(sent.lines(), vec!["reset", "go"]);

        sent.set_fail_writes(true);
        assert!(matches!(writer.write_line("pause\n"), Err(LinkError::Io(_))));
        assert_eq!(sent.take(), vec!["reset", "go"]);
        assert!(sent.lines().is_empty());
    }
}
