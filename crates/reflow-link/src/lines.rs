//! 字节流到文本行的组装

use crate::{LineReader, LinkError};
use std::io::{self, Read};
use tracing::warn;

/// 单行最大字节数
///
/// 控制器报文远小于此值；超过即视为线路噪声，丢弃已缓存的字节。
pub const MAX_LINE_BYTES: usize = 1024;

/// 把 `Read` 字节流组装成文本行
///
/// 底层 `read` 超时（`TimedOut` / `WouldBlock`）映射为 `LinkError::Timeout`，
/// 已读到的半行保留在内部缓冲区，由后续调用补全。
pub struct LineAssembler<R> {
    inner: R,
    pending: Vec<u8>,
    chunk: [u8; 128],
}

impl<R: Read> LineAssembler<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(128),
            chunk: [0u8; 128],
        }
    }

    /// 底层字节流
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// 当前缓存的半行字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self, end: usize) -> String {
        let rest = self.pending.split_off(end);
        let line = std::mem::replace(&mut self.pending, rest);
        let text = String::from_utf8_lossy(&line);
        text.trim_end_matches(['\r', '\n']).to_string()
    }
}

impl<R: Read> LineReader for LineAssembler<R> {
    fn read_line(&mut self) -> Result<String, LinkError> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                return Ok(self.take_line(pos + 1));
            }

            if self.pending.len() > MAX_LINE_BYTES {
                warn!(
                    "Discarding {} bytes without line terminator",
                    self.pending.len()
                );
                self.pending.clear();
            }

            match self.inner.read(&mut self.chunk) {
                Ok(0) => {
                    // 流结束前的最后半行仍然交给上层（通常会被判为格式错误）
                    if self.pending.is_empty() {
                        return Err(LinkError::Eof);
                    }
                    let end = self.pending.len();
                    return Ok(self.take_line(end));
                },
                Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    return Err(LinkError::Timeout);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
    }
}
