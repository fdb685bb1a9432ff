//! 操作员控制台
//!
//! 专用输入线程逐行读取 stdin，主循环解析为 [`OperatorCommand`] 后执行。

use anyhow::Result;
use crossbeam_channel::{Receiver, bounded};
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;
use thiserror::Error;

/// 控制台命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    /// 复位并开始回流曲线
    Go,
    Reset,
    Pause,
    Resume,
    /// 开关手动模式
    Manual(bool),
    /// 目标温度（℃）
    Target(f64),
    /// 上加热管手动功率（%）
    Top(f64),
    /// 下加热管手动功率（%）
    Bottom(f64),
    Status,
    Help,
    Quit,
}

/// 控制台输入错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Expected 'on' or 'off', got '{0}'")]
    InvalidSwitch(String),

    #[error("Unexpected extra input '{0}'")]
    TrailingInput(String),
}

impl FromStr for OperatorCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Err(ConsoleError::Unknown(String::new()));
        };
        let argument = parts.next();
        if let Some(extra) = parts.next() {
            return Err(ConsoleError::TrailingInput(extra.to_string()));
        }

        let command = match keyword.to_ascii_lowercase().as_str() {
            "go" | "start" => Self::Go,
            "reset" => Self::Reset,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "manual" => Self::Manual(parse_switch(argument)?),
            "target" => Self::Target(parse_number("target", "a temperature in °C", argument)?),
            "top" => Self::Top(parse_number("top", "a power in %", argument)?),
            "bottom" => Self::Bottom(parse_number("bottom", "a power in %", argument)?),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ConsoleError::Unknown(other.to_string())),
        };

        let takes_argument = matches!(
            command,
            Self::Manual(_) | Self::Target(_) | Self::Top(_) | Self::Bottom(_)
        );
        match argument {
            Some(extra) if !takes_argument => Err(ConsoleError::TrailingInput(extra.to_string())),
            _ => Ok(command),
        }
    }
}

fn parse_switch(argument: Option<&str>) -> Result<bool, ConsoleError> {
    let value = argument.ok_or(ConsoleError::MissingArgument {
        command: "manual",
        expected: "'on' or 'off'",
    })?;
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        _ => Err(ConsoleError::InvalidSwitch(value.to_string())),
    }
}

fn parse_number(
    command: &'static str,
    expected: &'static str,
    argument: Option<&str>,
) -> Result<f64, ConsoleError> {
    let value = argument.ok_or(ConsoleError::MissingArgument { command, expected })?;
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(ConsoleError::InvalidNumber(value.to_string())),
    }
}

/// 启动专用输入线程
///
/// 返回的接收端在 stdin 结束（EOF）时断开。
pub fn spawn_input_thread() -> Result<Receiver<String>> {
    let (line_tx, line_rx) = bounded::<String>(16);

    thread::Builder::new()
        .name("reflow-console".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line_tx.send(line).is_err() {
                    break; // 主线程已退出
                }
            }
        })?;

    Ok(line_rx)
}

/// 打印帮助信息
pub fn print_help() {
    println!("Commands:");
    println!("  go                  reset the controller and start the reflow profile");
    println!("  reset               abort the running profile");
    println!("  pause / resume      hold or continue the profile clock");
    println!("  manual on|off       enable or disable manual heater control");
    println!("  target <°C>         set the idle target temperature");
    println!("  top <%>             set the top heater manual power");
    println!("  bottom <%>          set the bottom heater manual power");
    println!("  status              show the latest reading and link statistics");
    println!("  help                show this help");
    println!("  quit                exit");
    println!();
}
