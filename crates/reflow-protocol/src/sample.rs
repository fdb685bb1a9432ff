//! 状态报文数据模型

use std::fmt;

/// 时间 / 温度字段的缩放系数（1 tick = 0.25 秒或 0.25 ℃）
pub const TICK_SCALE: f64 = 0.25;

/// 占空比字段的满量程（原始字节 / 255 = 占空比）
pub const DUTY_FULL_SCALE: f64 = 255.0;

/// 控制器工作状态
///
/// 固件状态集合是封闭的（`fault`/`idle`/`run`/`done`/`pause`），
/// 但解析时不拒绝未知标签：未知标签原样保存在 `Other` 中，兼容未来固件。
///
/// 序列化为报文中的状态标签（如 `"run"`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum DeviceState {
    /// 传感器故障
    Fault,
    /// 空闲（未执行回流曲线），也是时间轴重新对齐的触发状态
    #[default]
    Idle,
    /// 正在执行回流曲线
    Run,
    /// 曲线执行完成
    Done,
    /// 暂停（曲线时间不前进）
    Pause,
    /// 未知标签（原样保存）
    Other(String),
}

impl DeviceState {
    /// 从报文中的状态标签构造
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "fault" => Self::Fault,
            "idle" => Self::Idle,
            "run" => Self::Run,
            "done" => Self::Done,
            "pause" => Self::Pause,
            other => Self::Other(other.to_string()),
        }
    }

    /// 报文中的状态标签
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Fault => "fault",
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Done => "done",
            Self::Pause => "pause",
            Self::Other(tag) => tag,
        }
    }

    /// 是否为空闲状态
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl From<&str> for DeviceState {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

impl From<String> for DeviceState {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        state.as_tag().to_string()
    }
}

/// 一条已解析的状态报文
///
/// 只能由 [`FrameDecoder`](crate::FrameDecoder) 从一行文本构造，构造后不再修改，
/// 所有订阅者共享同一份只读数据。
///
/// # 字段单位
///
/// | 字段 | 单位 | 精度 |
/// |---|---|---|
/// | `time` | 秒（控制器时钟） | 0.25 |
/// | `target`、`sense_top`、`sense_bottom` | ℃ | 0.25 |
/// | `cmd`、`cmd_top`、`cmd_bottom` | 占空比 [0, 1] | 1/255 |
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// 控制器工作状态
    pub state: DeviceState,
    /// 控制器时钟（秒），同一会话内单调不减
    pub time: f64,
    /// 目标温度（℃）
    pub target: f64,
    /// 上加热管温度（℃）
    pub sense_top: f64,
    /// 下加热管温度（℃）
    pub sense_bottom: f64,
    /// PID 总输出占空比
    pub cmd: f64,
    /// 上加热管占空比
    pub cmd_top: f64,
    /// 下加热管占空比
    pub cmd_bottom: f64,
}

impl Sample {
    /// 是否处于空闲状态
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }
}
