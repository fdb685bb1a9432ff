//! 滑动时间窗口（WindowBuffer）
//!
//! 按时间顺序保存 `(相对时间, 值)`，在控制器进入空闲状态时重新对齐时间轴。
//!
//! # 重新对齐规则（每次 push）
//!
//! 1. 由非空闲进入空闲：`time_offset = time`，清空全部数据
//! 2. 追加 `(time - time_offset, values)`
//! 3. 空闲时：`time_offset = time`，最新一条始终位于相对时间 0
//! 4. 空闲且超过容量时：丢弃最旧的数据（运行中从不丢弃）
//! 5. `previous_state = state`
//!
//! 内部保存设备绝对时间，读出时减去 `time_offset`，因此第 3 步是 O(1) 的。

use reflow_protocol::{DeviceState, Sample};
use std::collections::VecDeque;

/// 有界/无界时间窗口
///
/// # Example
///
/// ```rust
/// use reflow_protocol::DeviceState;
/// use reflow_tools::WindowBuffer;
///
/// let mut window = WindowBuffer::bounded(3);
/// window.push(&DeviceState::Idle, 0.0, 25.0);
/// window.push(&DeviceState::Idle, 1.0, 25.5);
///
/// // 空闲时最新一条位于 0
/// assert_eq!(window.snapshot(), vec![(-1.0, 25.0), (0.0, 25.5)]);
/// ```
#[derive(Debug, Clone)]
pub struct WindowBuffer<T> {
    /// `(设备绝对时间, 值)`
    entries: VecDeque<(f64, T)>,
    /// 相对时间 0 对应的设备时间
    time_offset: f64,
    previous_state: DeviceState,
    /// `None` 表示无界
    capacity: Option<usize>,
}

impl<T> WindowBuffer<T> {
    /// 空闲时最多保留 `capacity` 条
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    /// 从不丢弃数据
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.map_or(0, |c| c.saturating_add(1))),
            time_offset: 0.0,
            previous_state: DeviceState::Idle,
            capacity,
        }
    }

    /// 追加一条数据
    pub fn push(&mut self, state: &DeviceState, time: f64, values: T) {
        let idle = state.is_idle();

        if idle && !self.previous_state.is_idle() {
            // 进入空闲：下一次运行从相对时间 0 开始
            self.time_offset = time;
            self.entries.clear();
        }

        self.entries.push_back((time, values));

        if idle {
            self.time_offset = time;

            if let Some(capacity) = self.capacity {
                while self.entries.len() > capacity {
                    self.entries.pop_front();
                }
            }
        }

        if self.previous_state != *state {
            self.previous_state = state.clone();
        }
    }

    /// 由报文追加一条数据，`f` 从报文中提取要保存的值
    pub fn push_sample<F>(&mut self, sample: &Sample, f: F)
    where
        F: FnOnce(&Sample) -> T,
    {
        let values = f(sample);
        self.push(&sample.state, sample.time, values);
    }

    /// 清空，回到新会话的初始状态
    pub fn reset(&mut self) {
        self.entries.clear();
        self.time_offset = 0.0;
        self.previous_state = DeviceState::Idle;
    }

    /// 按时间顺序遍历 `(相对时间, &值)`
    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> + '_ {
        let offset = self.time_offset;
        self.entries.iter().map(move |(time, values)| (time - offset, values))
    }

    /// 相对时间序列
    pub fn times(&self) -> Vec<f64> {
        self.iter().map(|(time, _)| time).collect()
    }

    /// 最新一条
    pub fn latest(&self) -> Option<(f64, &T)> {
        self.entries
            .back()
            .map(|(time, values)| (time - self.time_offset, values))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 容量（`None` 表示无界）
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// 相对时间 0 对应的设备时间
    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// 最近一次 push 的设备状态
    pub fn previous_state(&self) -> &DeviceState {
        &self.previous_state
    }
}

impl<T: Clone> WindowBuffer<T> {
    /// 按时间顺序复制出 `(相对时间, 值)`
    pub fn snapshot(&self) -> Vec<(f64, T)> {
        self.iter().map(|(time, values)| (time, values.clone())).collect()
    }
}

impl<T> Default for WindowBuffer<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
