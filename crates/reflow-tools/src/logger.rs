//! CSV 会话日志
//!
//! 每次控制器由非空闲进入空闲（或还没有打开文件）时开始一个新文件，
//! 文件内的时间从该条报文开始计 0。控制器时钟只增不减，因此每个文件都从 0 开始。

use anyhow::{Context, Result};
use chrono::Local;
use csv::{Writer, WriterBuilder};
use reflow_protocol::{DeviceState, Sample};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 日志文件名格式（本地时间）
pub const FILE_NAME_FORMAT: &str = "ovenlog_%Y%m%d%H%M%S.csv";

/// 表头
pub const HEADER: [&str; 8] = [
    "state", "time", "target", "sense_t", "sense_b", "cmd", "cmd_t", "cmd_b",
];

/// CSV 会话日志
///
/// 只能在一个线程上使用；通过 channel 订阅报文，不要在读取线程的回调里直接写文件。
///
/// # Example
///
/// ```rust
/// use reflow_protocol::FrameDecoder;
/// use reflow_tools::SessionLogger;
///
/// let dir = std::env::temp_dir();
/// let mut logger = SessionLogger::new(&dir);
/// logger.log_sample(&FrameDecoder::decode("idle,40,0,100,100,0,0,0").unwrap()).unwrap();
///
/// let path = logger.current_path().unwrap().to_path_buf();
/// logger.close().unwrap();
/// # std::fs::remove_file(path).unwrap();
/// ```
pub struct SessionLogger {
    dir: PathBuf,
    writer: Option<Writer<File>>,
    path: Option<PathBuf>,
    time_offset: f64,
    previous_state: DeviceState,
}

impl SessionLogger {
    /// 在 `dir` 下创建日志文件（第一条报文到达时才真正创建）
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            writer: None,
            path: None,
            time_offset: 0.0,
            previous_state: DeviceState::Idle,
        }
    }

    /// 记录一条报文，必要时先开始新文件
    pub fn log_sample(&mut self, sample: &Sample) -> Result<()> {
        if self.writer.is_none() || (sample.is_idle() && !self.previous_state.is_idle()) {
            self.create_session_file()?;
            self.time_offset = sample.time;
        }

        if self.previous_state != sample.state {
            self.previous_state = sample.state.clone();
        }
        self.write_row(sample)
    }

    /// 关闭当前文件并开始一个带时间戳的新文件，写入表头
    ///
    /// 同一秒内重复创建时追加到同一个文件。
    pub fn create_session_file(&mut self) -> Result<PathBuf> {
        self.close()?;

        let name = Local::now().format(FILE_NAME_FORMAT).to_string();
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(HEADER)
            .context("Failed to write log header")?;
        writer.flush().context("Failed to flush log file")?;

        info!("Logging to {}", path.display());
        self.writer = Some(writer);
        self.path = Some(path.clone());
        Ok(path)
    }

    /// 写入一行（时间为相对时间，数值保留 6 位小数）
    pub fn write_row(&mut self, sample: &Sample) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("No session log file is open")?;

        let numbers = [
            sample.time - self.time_offset,
            sample.target,
            sample.sense_top,
            sample.sense_bottom,
            sample.cmd,
            sample.cmd_top,
            sample.cmd_bottom,
        ];
        let mut record = Vec::with_capacity(HEADER.len());
        record.push(sample.state.as_tag().to_string());
        record.extend(numbers.iter().map(|value| format!("{value:.6}")));

        writer
            .write_record(&record)
            .context("Failed to write log row")?;
        writer.flush().context("Failed to flush log file")?;
        Ok(())
    }

    /// 刷新并关闭当前文件
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().context("Failed to flush log file")?;
            if let Some(path) = &self.path {
                debug!("Closed log file {}", path.display());
            }
        }
        Ok(())
    }

    /// 当前日志文件路径
    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 当前文件中相对时间 0 对应的设备时间
    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// 日志目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
