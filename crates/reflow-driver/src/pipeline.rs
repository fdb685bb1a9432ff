//! 读取循环
//!
//! 从 [`LineReader`] 持续读行、解析并发布报文，直到收到停止请求或链路断开。
//!
//! ```text
//! loop {
//!     检查停止标志 ──(已请求)──▶ 退出
//!     read_line()
//!       ├─ Timeout      ─▶ 计数，继续
//!       ├─ Eof / Io     ─▶ 退出（StreamLost）
//!       └─ Ok(line)     ─▶ decode
//!                            ├─ Err ─▶ 计数，丢弃
//!                            └─ Ok  ─▶ 再次检查停止标志 ─▶ publish
//! }
//! ```

use crate::metrics::ReaderMetrics;
use crate::state::{AtomicReaderState, ReaderState};
use reflow_link::{LineReader, LinkError};
use reflow_protocol::{FrameDecoder, Sample};
use std::sync::atomic::Ordering;
use tracing::{error, trace};

/// 读取循环的退出原因
#[derive(Debug)]
pub enum ReaderExit {
    /// 收到停止请求后正常退出
    Stopped,
    /// 链路断开（EOF 或 IO 错误）
    StreamLost(LinkError),
}

impl ReaderExit {
    pub fn is_stream_lost(&self) -> bool {
        matches!(self, Self::StreamLost(_))
    }
}

/// 读取循环主体
///
/// 调用方负责在进入循环之前把 `state` 置为 [`ReaderState::Running`]；
/// 循环退出时总会把 `state` 置为 [`ReaderState::Stopped`]。
///
/// # 参数
///
/// - `reader`: 读半部，读超时决定了响应停止请求的最长延迟
/// - `publish`: 每条有效报文调用一次，按到达顺序
/// - `state`: 共享的读取线程状态（停止标志）
/// - `metrics`: 指标计数器
pub fn reader_loop<R, P>(
    mut reader: R,
    mut publish: P,
    state: &AtomicReaderState,
    metrics: &ReaderMetrics,
) -> ReaderExit
where
    R: LineReader,
    P: FnMut(&Sample),
{
    let exit = loop {
        if !state.get().is_running() {
            trace!("Reader: stop requested, exiting");
            break ReaderExit::Stopped;
        }

        let line = match reader.read_line() {
            Ok(line) => {
                metrics.lines_total.fetch_add(1, Ordering::Relaxed);
                line
            },
            Err(LinkError::Timeout) => {
                // 控制器没有发数据，回到循环顶部检查停止标志
                metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                error!("Reader: serial stream lost: {}", e);
                break ReaderExit::StreamLost(e);
            },
        };

        let sample = match FrameDecoder::decode(&line) {
            Ok(sample) => sample,
            Err(e) => {
                // 启动阶段和线路噪声时常见，不上报
                metrics.malformed_frames.fetch_add(1, Ordering::Relaxed);
                trace!("Reader: dropping line {:?}: {}", line, e);
                continue;
            },
        };

        // 读操作期间可能已经请求停止
        if !state.get().is_running() {
            trace!("Reader: stop requested during read, discarding sample");
            break ReaderExit::Stopped;
        }

        publish(&sample);
        metrics.samples_published.fetch_add(1, Ordering::Relaxed);
    };

    state.set(ReaderState::Stopped);
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflow_protocol::DeviceState;
    use std::collections::VecDeque;
    use std::io;

    /// 按脚本返回结果的读半部
    struct ScriptedReader {
        script: VecDeque<Result<String, LinkError>>,
    }

    impl ScriptedReader {
        fn new(script: Vec<Result<&str, LinkError>>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            }
        }
    }

    impl LineReader for ScriptedReader {
        fn read_line(&mut self) -> Result<String, LinkError> {
            self.script.pop_front().unwrap_or(Err(LinkError::Eof))
        }
    }

    fn running() -> AtomicReaderState {
        AtomicReaderState::new(ReaderState::Running)
    }

    #[test]
    fn test_publishes_valid_lines_in_order() {
        let reader = ScriptedReader::new(vec![
            Ok("idle,0,0,250,248,0,0,0"),
            Err(LinkError::Timeout),
            Ok("run,4,1000,251,249,10,10,10"),
        ]);
        let state = running();
        let metrics = ReaderMetrics::new();
        let mut seen = Vec::new();

        let exit = reader_loop(reader, |s: &Sample| seen.push(s.clone()), &state, &metrics);

        assert!(exit.is_stream_lost());
        assert_eq!(state.get(), ReaderState::Stopped);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].state, DeviceState::Idle);
        assert_eq!(seen[1].state, DeviceState::Run);
        assert_eq!(seen[1].time, 1.0);
        assert_eq!(seen[1].target, 250.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines_total, 2);
        assert_eq!(snapshot.samples_published, 2);
        assert_eq!(snapshot.read_timeouts, 1);
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        let reader = ScriptedReader::new(vec![
            Ok("garbage"),
            Ok("idle,0,0,x,248,0,0,0"),
            Ok(""),
            Ok("idle,4,0,250,248,0,0,0"),
        ]);
        let state = running();
        let metrics = ReaderMetrics::new();
        let mut times = Vec::new();

        reader_loop(reader, |s: &Sample| times.push(s.time), &state, &metrics);

        assert_eq!(times, vec![1.0]);
        assert_eq!(metrics.snapshot().malformed_frames, 3);
    }

    #[test]
    fn test_io_error_ends_with_stream_lost() {
        let reader = ScriptedReader::new(vec![
            Ok("idle,0,0,250,248,0,0,0"),
            Err(LinkError::Io(io::Error::other("device unplugged"))),
            Ok("idle,4,0,250,248,0,0,0"),
        ]);
        let state = running();
        let metrics = ReaderMetrics::new();
        let mut count = 0;

        let exit = reader_loop(reader, |_: &Sample| count += 1, &state, &metrics);

        assert!(matches!(exit, ReaderExit::StreamLost(LinkError::Io(_))));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_not_running_exits_before_reading() {
        let reader = ScriptedReader::new(vec![Ok("idle,0,0,250,248,0,0,0")]);
        let state = AtomicReaderState::new(ReaderState::StopRequested);
        let metrics = ReaderMetrics::new();

        let exit = reader_loop(reader, |_: &Sample| panic!("must not publish"), &state, &metrics);

        assert!(matches!(exit, ReaderExit::Stopped));
        assert_eq!(metrics.snapshot().lines_total, 0);
    }

    #[test]
    fn test_stop_during_read_discards_sample() {
        /// 读到一行的同时请求停止
        struct StopOnRead<'a> {
            state: &'a AtomicReaderState,
        }

        impl LineReader for StopOnRead<'_> {
            fn read_line(&mut self) -> Result<String, LinkError> {
                self.state.request_stop();
                Ok("run,4,1000,251,249,10,10,10".to_string())
            }
        }

        let state = running();
        let metrics = ReaderMetrics::new();
        let exit = reader_loop(
            StopOnRead { state: &state },
            |_: &Sample| panic!("must not publish after stop"),
            &state,
            &metrics,
        );

        assert!(matches!(exit, ReaderExit::Stopped));
        assert_eq!(state.get(), ReaderState::Stopped);
        assert_eq!(metrics.snapshot().samples_published, 0);
    }
}
