//! 后台读取线程
//!
//! [`Reader`] 独占链路的读半部，在名为 `reflow-reader` 的线程上运行
//! [`reader_loop`](crate::pipeline::reader_loop)。
//!
//! # 关闭顺序
//!
//! 必须先 `stop()`，再 `join()` 确认线程退出，之后才能释放底层串口，
//! 否则读取线程可能在已关闭的句柄上读数据。`Reader` 被 drop 时会自动执行前两步。

use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, ReaderMetrics};
use crate::pipeline::{ReaderExit, reader_loop};
use crate::state::{AtomicReaderState, ReaderState};
use parking_lot::Mutex;
use reflow_link::LineReader;
use reflow_protocol::Sample;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// 读取线程名称
pub const READER_THREAD_NAME: &str = "reflow-reader";

type BoxedSource = Box<dyn LineReader + Send>;
type BoxedPublish = Box<dyn FnMut(&Sample) + Send>;

/// 后台读取线程
///
/// # Example
///
/// ```rust
/// use reflow_driver::Reader;
/// use reflow_link::mock::MockLink;
/// use reflow_link::SplittableLink;
/// use std::time::Duration;
///
/// let (link, _sent) = MockLink::scripted(["idle,0,0,250,248,0,0,0"], Duration::from_millis(20));
/// let (source, _writer) = link.split().unwrap();
///
/// let mut reader = Reader::new(source, |sample: &reflow_protocol::Sample| {
///     println!("{:.1} °C", sample.sense_top);
/// });
/// reader.start().unwrap();
///
/// // 脚本读完后链路返回 EOF
/// assert!(reader.join().is_err());
/// ```
pub struct Reader {
    /// 启动前暂存的读半部和发布回调
    pending: Mutex<Option<(BoxedSource, BoxedPublish)>>,
    state: Arc<AtomicReaderState>,
    metrics: Arc<ReaderMetrics>,
    handle: Option<JoinHandle<ReaderExit>>,
}

impl Reader {
    /// 创建读取器（尚未启动）
    pub fn new<R, P>(source: R, publish: P) -> Self
    where
        R: LineReader + Send + 'static,
        P: FnMut(&Sample) + Send + 'static,
    {
        Self::with_metrics(source, publish, Arc::new(ReaderMetrics::new()))
    }

    /// 创建读取器，使用外部共享的指标
    pub fn with_metrics<R, P>(source: R, publish: P, metrics: Arc<ReaderMetrics>) -> Self
    where
        R: LineReader + Send + 'static,
        P: FnMut(&Sample) + Send + 'static,
    {
        Self {
            pending: Mutex::new(Some((Box::new(source), Box::new(publish)))),
            state: Arc::new(AtomicReaderState::new(ReaderState::NotStarted)),
            metrics,
            handle: None,
        }
    }

    /// 启动读取线程
    ///
    /// # 错误
    ///
    /// - `DriverError::AlreadyStarted`: 已经启动过（读取器不能重启）
    /// - `DriverError::StoppedBeforeStart`: 启动前已经调用过 [`stop`](Self::stop)
    /// - `DriverError::IoThread`: 线程创建失败
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.state
            .transition(ReaderState::NotStarted, ReaderState::Running)
            .map_err(|actual| {
                // 读半部还在说明线程从未启动过
                if actual == ReaderState::Stopped && self.pending.lock().is_some() {
                    DriverError::StoppedBeforeStart
                } else {
                    DriverError::AlreadyStarted
                }
            })?;

        let Some((source, publish)) = self.pending.lock().take() else {
            self.state.set(ReaderState::Stopped);
            return Err(DriverError::AlreadyStarted);
        };

        let state = self.state.clone();
        let metrics = self.metrics.clone();
        let spawned = thread::Builder::new()
            .name(READER_THREAD_NAME.to_string())
            .spawn(move || {
                let exit = reader_loop(source, publish, &state, &metrics);
                debug!("Reader thread exiting: {:?}", exit);
                exit
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!("Reader thread started");
                Ok(())
            },
            Err(e) => {
                self.state.set(ReaderState::Stopped);
                Err(DriverError::IoThread(e.to_string()))
            },
        }
    }

    /// 请求停止（幂等，可以在任意线程调用）
    ///
    /// 只设置标志，不等待：线程会在一个读超时周期内退出。
    /// 在 `start()` 之前调用时读取器直接进入 `Stopped`，不会再启动。
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// 获取可以跨线程传递的停止句柄
    pub fn stop_handle(&self) -> ReaderStopHandle {
        ReaderStopHandle {
            state: self.state.clone(),
        }
    }

    /// 当前状态
    pub fn state(&self) -> ReaderState {
        self.state.get()
    }

    /// 读取线程是否已经退出
    pub fn is_finished(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.is_finished(),
            None => self.state.get() == ReaderState::Stopped,
        }
    }

    /// 等待读取线程退出
    ///
    /// 不会自动请求停止；需要主动关闭时先调用 [`stop`](Self::stop)。
    /// 未启动或已经 join 过时直接返回 `Ok(())`。
    ///
    /// # 错误
    ///
    /// - `DriverError::StreamLost`: 线程因链路断开而退出
    /// - `DriverError::ReaderPanicked`: 线程 panic
    pub fn join(&mut self) -> Result<(), DriverError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        match handle.join() {
            Ok(ReaderExit::Stopped) => Ok(()),
            Ok(ReaderExit::StreamLost(e)) => Err(DriverError::StreamLost(e)),
            Err(_) => {
                // 发布回调 panic 时循环来不及更新状态
                self.state.set(ReaderState::Stopped);
                error!("Reader thread panicked");
                Err(DriverError::ReaderPanicked)
            },
        }
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.join() {
            debug!("Reader finished with error during drop: {}", e);
        }
    }
}

/// 停止句柄
///
/// 持有者可以在其他线程请求停止（例如 Ctrl-C 处理函数）。
#[derive(Clone)]
pub struct ReaderStopHandle {
    state: Arc<AtomicReaderState>,
}

impl ReaderStopHandle {
    /// 请求停止（幂等）
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// 当前状态
    pub fn state(&self) -> ReaderState {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use reflow_link::mock::MockLink;
    use reflow_link::{LinkError, SplittableLink};
    use std::time::{Duration, Instant};

    const READ_TIMEOUT: Duration = Duration::from_millis(50);

    #[test]
    fn test_reader_publishes_and_stops() {
        let (link, feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let (tx, rx) = unbounded();

        let mut reader = Reader::new(source, move |s: &Sample| {
            let _ = tx.send(s.time);
        });
        assert_eq!(reader.state(), ReaderState::NotStarted);
        reader.start().unwrap();
        assert_eq!(reader.state(), ReaderState::Running);

        feeder.push("idle,0,0,250,248,0,0,0");
        feeder.push("idle,4,0,250,248,0,0,0");
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 0.0);
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1.0);

        reader.stop();
        reader.join().unwrap();
        assert_eq!(reader.state(), ReaderState::Stopped);
        assert!(reader.is_finished());
        assert_eq!(reader.metrics().samples_published, 2);
    }

    #[test]
    fn test_start_twice_fails() {
        let (link, _feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let mut reader = Reader::new(source, |_: &Sample| {});

        reader.start().unwrap();
        assert!(matches!(reader.start(), Err(DriverError::AlreadyStarted)));
    }

    #[test]
    fn test_stop_observed_within_one_timeout() {
        let (link, _feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let mut reader = Reader::new(source, |_: &Sample| {});
        reader.start().unwrap();

        let stop = reader.stop_handle();
        let started = Instant::now();
        stop.stop();
        stop.stop();
        reader.join().unwrap();

        assert!(started.elapsed() < READ_TIMEOUT * 4);
        assert_eq!(stop.state(), ReaderState::Stopped);
    }

    #[test]
    fn test_eof_surfaces_stream_lost() {
        let (link, _sent) = MockLink::scripted(["idle,0,0,250,248,0,0,0"], READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let mut reader = Reader::new(source, |_: &Sample| {});
        reader.start().unwrap();

        let result = reader.join();
        assert!(matches!(
            result,
            Err(DriverError::StreamLost(LinkError::Eof))
        ));
        assert_eq!(reader.state(), ReaderState::Stopped);
        // 再次 join 不报错
        assert!(reader.join().is_ok());
        // 运行过的读取器不能重启
        assert!(matches!(reader.start(), Err(DriverError::AlreadyStarted)));
    }

    #[test]
    fn test_panicking_publish_is_reported() {
        let (link, feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let mut reader = Reader::new(source, |_: &Sample| panic!("publish bug"));
        reader.start().unwrap();

        feeder.push("idle,0,0,250,248,0,0,0");
        assert!(matches!(reader.join(), Err(DriverError::ReaderPanicked)));
        assert_eq!(reader.state(), ReaderState::Stopped);
    }

    #[test]
    fn test_unstarted_reader_drops_cleanly() {
        let (link, _feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let reader = Reader::new(source, |_: &Sample| {});
        assert!(!reader.is_finished());
        drop(reader);
    }

    #[test]
    fn test_stop_before_start_prevents_reading() {
        let (link, feeder, _sent) = MockLink::new(READ_TIMEOUT);
        let (source, _writer) = link.split().unwrap();
        let (tx, rx) = unbounded();
        let mut reader = Reader::new(source, move |s: &Sample| {
            let _ = tx.send(s.time);
        });

        reader.stop();
        assert_eq!(reader.state(), ReaderState::Stopped);
        assert!(reader.is_finished());

        feeder.push("idle,0,0,250,248,0,0,0");
        assert!(matches!(
            reader.start(),
            Err(DriverError::StoppedBeforeStart)
        ));
        assert!(rx.recv_timeout(READ_TIMEOUT * 2).is_err());
        assert_eq!(reader.metrics().lines_total, 0);
        assert!(reader.join().is_ok());
    }
}
