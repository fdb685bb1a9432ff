//! # Reflow Protocol
//!
//! 回流焊炉控制器串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `sample`: 状态报文的数据模型（`Sample`、`DeviceState`）
//! - `decode`: 状态报文解析（`FrameDecoder`）
//! - `command`: 上位机命令构建与数值换算
//!
//! ## 报文格式
//!
//! 控制器以约 4Hz 的频率发送一行 ASCII 状态报文（逗号分隔，固定 8 个字段）：
//!
//! ```text
//! <state>,<time>,<target>,<sense_top>,<sense_bottom>,<cmd>,<cmd_top>,<cmd_bottom>\n
//! ```
//!
//! - 字段 1-4：整数，乘以 0.25 得到秒 / 摄氏度
//! - 字段 5-7：整数（0-255），除以 255 得到占空比

pub mod command;
pub mod decode;
pub mod sample;

// 重新导出常用类型
pub use command::*;
pub use decode::*;
pub use sample::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 状态报文格式错误（启动阶段或线路噪声时属于正常现象）
    #[error("Malformed frame: {0}")]
    MalformedFrame(FrameFault),

    /// 无法识别的命令文本
    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),
}

impl ProtocolError {
    /// 是否为报文格式错误
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, Self::MalformedFrame(_))
    }
}

/// 报文格式错误的具体原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameFault {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("field `{field}` is not an integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
}

impl From<FrameFault> for ProtocolError {
    fn from(fault: FrameFault) -> Self {
        Self::MalformedFrame(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::from(FrameFault::FieldCount {
            expected: 8,
            actual: 3,
        });
        assert_eq!(
            err.to_string(),
            "Malformed frame: expected 8 fields, got 3"
        );
        assert!(err.is_malformed_frame());

        let err = ProtocolError::from(FrameFault::InvalidInteger {
            field: "time",
            value: "x1".to_string(),
        });
        assert!(err.to_string().contains("`time`"));

        let err = ProtocolError::InvalidCommand("launch".to_string());
        assert!(!err.is_malformed_frame());
        assert!(err.to_string().contains("launch"));
    }
}
