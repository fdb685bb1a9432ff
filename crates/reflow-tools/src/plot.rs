//! 曲线数据模型
//!
//! 温度曲线和功率曲线各用一个有界 [`WindowBuffer`]，渲染层只读取快照。

use crate::window::WindowBuffer;
use reflow_protocol::Sample;

/// 空闲时保留的窗口：120 秒 × 每秒 4 条
pub const DEFAULT_IDLE_WINDOW: usize = 120 * 4;

/// 温度曲线上的一个点（℃）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TemperaturePoint {
    pub target: f64,
    pub top: f64,
    pub bottom: f64,
}

impl From<&Sample> for TemperaturePoint {
    fn from(sample: &Sample) -> Self {
        Self {
            target: sample.target,
            top: sample.sense_top,
            bottom: sample.sense_bottom,
        }
    }
}

/// 功率曲线上的一个点（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandPoint {
    pub cmd: f64,
    pub top: f64,
    pub bottom: f64,
}

impl From<&Sample> for CommandPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            cmd: sample.cmd * 100.0,
            top: sample.cmd_top * 100.0,
            bottom: sample.cmd_bottom * 100.0,
        }
    }
}

/// 温度曲线和功率曲线
#[derive(Debug, Clone)]
pub struct PlotWindows {
    temperatures: WindowBuffer<TemperaturePoint>,
    commands: WindowBuffer<CommandPoint>,
}

impl Default for PlotWindows {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_WINDOW)
    }
}

impl PlotWindows {
    /// 空闲时每条曲线最多保留 `idle_window` 条
    pub fn new(idle_window: usize) -> Self {
        Self {
            temperatures: WindowBuffer::bounded(idle_window),
            commands: WindowBuffer::bounded(idle_window),
        }
    }

    /// 追加一条报文到两条曲线
    pub fn push(&mut self, sample: &Sample) {
        self.temperatures.push_sample(sample, |s| TemperaturePoint::from(s));
        self.commands.push_sample(sample, |s| CommandPoint::from(s));
    }

    pub fn reset(&mut self) {
        self.temperatures.reset();
        self.commands.reset();
    }

    pub fn temperatures(&self) -> &WindowBuffer<TemperaturePoint> {
        &self.temperatures
    }

    pub fn commands(&self) -> &WindowBuffer<CommandPoint> {
        &self.commands
    }
}
