//! 上位机命令构建
//!
//! 所有出站命令都是以 `\n` 结尾的单行 ASCII 文本，统一通过 [`OvenCommand`]
//! 的格式化输出生成。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 手动功率的最大原始值（100% 占空比）
pub const MAX_DUTY: u8 = 255;

/// 目标温度的最大原始值（0.25 ℃ 为单位，12 位）
pub const MAX_TARGET_TICKS: u16 = 4095;

/// 百分比转换为功率字节
///
/// `round(percent * 255 / 100)`，钳位到 [0, 255]。NaN 视为 0。
pub fn percent_to_duty(percent: f64) -> u8 {
    let raw = (percent * f64::from(MAX_DUTY) / 100.0).round();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(MAX_DUTY)) as u8
}

/// 摄氏度转换为目标温度原始值
///
/// `round(celsius * 4)`，钳位到 [0, 4095]。NaN 视为 0。
pub fn celsius_to_target(celsius: f64) -> u16 {
    let raw = (celsius * 4.0).round();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(MAX_TARGET_TICKS)) as u16
}

/// 上位机命令
///
/// # 线路格式
///
/// | 命令 | 文本 |
/// |---|---|
/// | `Reset` | `reset` |
/// | `Go` | `go` |
/// | `Pause` | `pause` |
/// | `Resume` | `resume` |
/// | `Manual(on)` | `manual: <0\|1>` |
/// | `Power { top, bottom }` | `cmd: <top>, <bottom>` |
/// | `Target(ticks)` | `target: <0-4095>` |
///
/// 上下加热管的手动功率在协议里是一条成对命令，不能单独发送其中一个。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvenCommand {
    /// 复位控制器（中止正在执行的曲线）
    Reset,
    /// 开始执行回流曲线
    Go,
    /// 暂停（曲线时间不前进）
    Pause,
    /// 从暂停恢复
    Resume,
    /// 开关手动模式（绕过控制器 PID）
    Manual(bool),
    /// 手动模式下的上下加热管功率（原始字节）
    Power { top: u8, bottom: u8 },
    /// 空闲状态下的目标温度（0.25 ℃ 为单位）
    Target(u16),
}

impl OvenCommand {
    /// 由百分比构造手动功率命令
    pub fn power_percent(top: f64, bottom: f64) -> Self {
        Self::Power {
            top: percent_to_duty(top),
            bottom: percent_to_duty(bottom),
        }
    }

    /// 由摄氏度构造目标温度命令
    pub fn target_celsius(celsius: f64) -> Self {
        Self::Target(celsius_to_target(celsius))
    }

    /// 带行结束符的线路文本
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for OvenCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => f.write_str("reset"),
            Self::Go => f.write_str("go"),
            Self::Pause => f.write_str("pause"),
            Self::Resume => f.write_str("resume"),
            Self::Manual(on) => write!(f, "manual: {}", u8::from(*on)),
            Self::Power { top, bottom } => write!(f, "cmd: {top}, {bottom}"),
            Self::Target(ticks) => write!(f, "target: {ticks}"),
        }
    }
}

impl FromStr for OvenCommand {
    type Err = ProtocolError;

    /// 按控制器固件的语法解析一行命令
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let invalid = || ProtocolError::InvalidCommand(line.to_string());

        match line {
            "reset" => return Ok(Self::Reset),
            "go" => return Ok(Self::Go),
            "pause" => return Ok(Self::Pause),
            "resume" => return Ok(Self::Resume),
            _ => {},
        }

        let (key, value) = line.split_once(':').ok_or_else(invalid)?;
        let value = value.trim();
        match key {
            "manual" => match value {
                "0" => Ok(Self::Manual(false)),
                "1" => Ok(Self::Manual(true)),
                _ => Err(invalid()),
            },
            "cmd" => {
                let (top, bottom) = value.split_once(',').ok_or_else(invalid)?;
                Ok(Self::Power {
                    top: top.trim().parse().map_err(|_| invalid())?,
                    bottom: bottom.trim().parse().map_err(|_| invalid())?,
                })
            },
            "target" => {
                let ticks: u16 = value.parse().map_err(|_| invalid())?;
                if ticks > MAX_TARGET_TICKS {
                    return Err(invalid());
                }
                Ok(Self::Target(ticks))
            },
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_to_duty() {
        assert_eq!(percent_to_duty(0.0), 0);
        assert_eq!(percent_to_duty(100.0), 255);
        assert_eq!(percent_to_duty(50.0), 128); // 127.5 四舍五入
        assert_eq!(percent_to_duty(1.0), 3); // 2.55
        assert_eq!(percent_to_duty(150.0), 255);
        assert_eq!(percent_to_duty(-20.0), 0);
        assert_eq!(percent_to_duty(f64::NAN), 0);
    }

    #[test]
    fn test_celsius_to_target() {
        assert_eq!(celsius_to_target(0.0), 0);
        assert_eq!(celsius_to_target(250.0), 1000);
        assert_eq!(celsius_to_target(100.1), 400);
        assert_eq!(celsius_to_target(100.2), 401);
        assert_eq!(celsius_to_target(-5.0), 0);
        assert_eq!(celsius_to_target(1200.0), 4095);
        assert_eq!(celsius_to_target(f64::INFINITY), 4095);
        assert_eq!(celsius_to_target(f64::NAN), 0);
    }

    #[test]
    fn test_command_lines() {
        assert_eq!(OvenCommand::Reset.to_line(), "reset\n");
        assert_eq!(OvenCommand::Go.to_line(), "go\n");
        assert_eq!(OvenCommand::Pause.to_line(), "pause\n");
        assert_eq!(OvenCommand::Resume.to_line(), "resume\n");
        assert_eq!(OvenCommand::Manual(true).to_line(), "manual: 1\n");
        assert_eq!(OvenCommand::Manual(false).to_line(), "manual: 0\n");
        assert_eq!(
            OvenCommand::Power { top: 255, bottom: 12 }.to_line(),
            "cmd: 255, 12\n"
        );
        assert_eq!(OvenCommand::Target(4095).to_line(), "target: 4095\n");
    }

    #[test]
    fn test_command_constructors_clamp() {
        assert_eq!(OvenCommand::target_celsius(-5.0), OvenCommand::Target(0));
        assert_eq!(OvenCommand::target_celsius(1200.0), OvenCommand::Target(4095));
        assert_eq!(
            OvenCommand::power_percent(150.0, 10.0),
            OvenCommand::Power {
                top: 255,
                bottom: 26
            }
        );
    }

    #[test]
    fn test_parse_device_grammar() {
        assert_eq!("reset\n".parse::<OvenCommand>().unwrap(), OvenCommand::Reset);
        assert_eq!("go".parse::<OvenCommand>().unwrap(), OvenCommand::Go);
        assert_eq!(
            "manual: 1".parse::<OvenCommand>().unwrap(),
            OvenCommand::Manual(true)
        );
        assert_eq!(
            "cmd: 10, 200\n".parse::<OvenCommand>().unwrap(),
            OvenCommand::Power {
                top: 10,
                bottom: 200
            }
        );
        assert_eq!(
            "target: 800".parse::<OvenCommand>().unwrap(),
            OvenCommand::Target(800)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["", "stop", "manual: 2", "cmd: 300, 1", "cmd: 1", "target: 5000", "target:"] {
            let err = text.parse::<OvenCommand>().unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidCommand(_)), "{text}");
        }
    }
}
