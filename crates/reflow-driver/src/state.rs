//! 读取线程状态定义

use std::sync::atomic::{AtomicU8, Ordering};

/// 读取线程状态
///
/// ```text
/// NotStarted ──start()──▶ Running ──stop()──▶ StopRequested ──(循环退出)──▶ Stopped
///                            │                                               ▲
///                            └──────────────(链路断开)────────────────────────┘
/// ```
///
/// 停止标志是电平触发的：正在进行的读操作会先完成（或超时），
/// 循环在下一个检查点看到标志后退出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReaderState {
    /// 尚未启动
    #[default]
    NotStarted = 0,
    /// 正在读取
    Running = 1,
    /// 已请求停止，等待当前读操作结束
    StopRequested = 2,
    /// 已退出
    Stopped = 3,
}

impl ReaderState {
    /// 从 u8 转换（无效值视为 Stopped）
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::StopRequested,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 读取循环是否应当继续
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// 读取线程状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicReaderState {
    inner: AtomicU8,
}

impl AtomicReaderState {
    pub fn new(state: ReaderState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self) -> ReaderState {
        ReaderState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 设置状态
    pub fn set(&self, state: ReaderState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换；成功返回 `Ok(current)`，失败返回 `Err(actual)`
    pub fn transition(&self, current: ReaderState, new: ReaderState) -> Result<ReaderState, ReaderState> {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(ReaderState::from_u8)
            .map_err(ReaderState::from_u8)
    }

    /// 请求停止
    ///
    /// 幂等：`Running` 变为 `StopRequested`；`NotStarted` 直接锁定为 `Stopped`，
    /// 之后的启动会失败；其他状态保持不变。
    pub fn request_stop(&self) {
        let mut current = ReaderState::Running;
        loop {
            let next = match current {
                ReaderState::Running => ReaderState::StopRequested,
                ReaderState::NotStarted => ReaderState::Stopped,
                ReaderState::StopRequested | ReaderState::Stopped => return,
            };
            match self.transition(current, next) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}
