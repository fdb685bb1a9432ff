//! 状态报文解析

use crate::sample::{DUTY_FULL_SCALE, DeviceState, Sample, TICK_SCALE};
use crate::{FrameFault, ProtocolError};
use std::str::FromStr;

/// 报文字段分隔符
pub const FIELD_DELIMITER: char = ',';

/// 每条报文的字段数
pub const FIELD_COUNT: usize = 8;

/// 数值字段名（按报文顺序，字段 0 为状态标签）
const NUMERIC_FIELDS: [&str; FIELD_COUNT - 1] = [
    "time",
    "target",
    "sense_top",
    "sense_bottom",
    "cmd",
    "cmd_top",
    "cmd_bottom",
];

/// 状态报文解析器
///
/// 纯函数，无 I/O、无共享状态，可以在任意线程调用。
///
/// 只做格式检查，不做语义检查：超出范围的数值原样透传，
/// 钳位只发生在出站命令一侧。
///
/// # Example
///
/// ```
/// use reflow_protocol::{DeviceState, FrameDecoder};
///
/// let sample = FrameDecoder::decode("run,4,1000,251,249,10,10,10\n").unwrap();
/// assert_eq!(sample.state, DeviceState::Run);
/// assert_eq!(sample.time, 1.0);
/// assert_eq!(sample.target, 250.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    /// 解析一行状态报文
    ///
    /// # 错误
    ///
    /// - `FrameFault::FieldCount`: 字段数不等于 8
    /// - `FrameFault::InvalidInteger`: 任一数值字段不是合法整数
    pub fn decode(line: &str) -> Result<Sample, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);

        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(FrameFault::FieldCount {
                expected: FIELD_COUNT,
                actual: fields.len(),
            }
            .into());
        }

        let mut raw = [0i64; FIELD_COUNT - 1];
        for (slot, (&name, &text)) in raw
            .iter_mut()
            .zip(NUMERIC_FIELDS.iter().zip(&fields[1..]))
        {
            *slot = parse_integer(name, text)?;
        }

        Ok(Sample {
            state: DeviceState::from_tag(fields[0]),
            time: raw[0] as f64 * TICK_SCALE,
            target: raw[1] as f64 * TICK_SCALE,
            sense_top: raw[2] as f64 * TICK_SCALE,
            sense_bottom: raw[3] as f64 * TICK_SCALE,
            cmd: raw[4] as f64 / DUTY_FULL_SCALE,
            cmd_top: raw[5] as f64 / DUTY_FULL_SCALE,
            cmd_bottom: raw[6] as f64 / DUTY_FULL_SCALE,
        })
    }
}

fn parse_integer(field: &'static str, text: &str) -> Result<i64, ProtocolError> {
    text.trim().parse::<i64>().map_err(|_| {
        FrameFault::InvalidInteger {
            field,
            value: text.to_string(),
        }
        .into()
    })
}

impl FromStr for Sample {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameDecoder::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scales_fields() {
        let sample = FrameDecoder::decode("idle,0,0,250,248,0,0,0").unwrap();
        assert_eq!(sample.state, DeviceState::Idle);
        assert_eq!(sample.time, 0.0);
        assert_eq!(sample.target, 0.0);
        assert_eq!(sample.sense_top, 62.5);
        assert_eq!(sample.sense_bottom, 62.0);
        assert_eq!(sample.cmd, 0.0);

        let sample = FrameDecoder::decode("run,4,1000,251,249,255,51,0\n").unwrap();
        assert_eq!(sample.state, DeviceState::Run);
        assert_eq!(sample.time, 1.0);
        assert_eq!(sample.target, 250.0);
        assert_eq!(sample.sense_top, 62.75);
        assert_eq!(sample.sense_bottom, 62.25);
        assert_eq!(sample.cmd, 1.0);
        assert!((sample.cmd_top - 0.2).abs() < 1e-12);
        assert_eq!(sample.cmd_bottom, 0.0);
    }

    #[test]
    fn test_decode_strips_crlf() {
        let sample = FrameDecoder::decode("pause,8,0,0,0,0,0,0\r\n").unwrap();
        assert_eq!(sample.state, DeviceState::Pause);
        assert_eq!(sample.time, 2.0);
    }

    #[test]
    fn test_decode_wrong_field_count() {
        let err = FrameDecoder::decode("idle,0,0,250,248,0,0").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedFrame(FrameFault::FieldCount {
                expected: 8,
                actual: 7
            })
        );

        let err = FrameDecoder::decode("idle,0,0,250,248,0,0,0,0").unwrap_err();
        assert!(err.is_malformed_frame());

        assert!(FrameDecoder::decode("").is_err());
    }

    #[test]
    fn test_decode_firmware_diagnostics_are_malformed() {
        assert!(FrameDecoder::decode("FAULT\n").unwrap_err().is_malformed_frame());
        assert!(FrameDecoder::decode("TFAULT: 3\n").unwrap_err().is_malformed_frame());
    }

    #[test]
    fn test_decode_non_integer_field() {
        let err = FrameDecoder::decode("run,4,1000,25x,249,10,10,10").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedFrame(FrameFault::InvalidInteger {
                field: "sense_top",
                value: "25x".to_string()
            })
        );

        // 小数不是合法整数
        assert!(FrameDecoder::decode("run,4.5,1000,251,249,10,10,10").is_err());
        // 空字段
        assert!(FrameDecoder::decode("run,,1000,251,249,10,10,10").is_err());
    }

    #[test]
    fn test_decode_passes_out_of_range_values_through() {
        let sample = FrameDecoder::decode("run,-4,-8,0,0,510,300,-255").unwrap();
        assert_eq!(sample.time, -1.0);
        assert_eq!(sample.target, -2.0);
        assert_eq!(sample.cmd, 2.0);
        assert_eq!(sample.cmd_bottom, -1.0);
    }

    #[test]
    fn test_decode_preserves_unknown_state() {
        let sample = FrameDecoder::decode("soak,4,0,0,0,0,0,0").unwrap();
        assert_eq!(sample.state, DeviceState::Other("soak".to_string()));
    }

    #[test]
    fn test_from_str() {
        let sample: Sample = "done,40,0,400,400,0,0,0".parse().unwrap();
        assert_eq!(sample.state, DeviceState::Done);
        assert_eq!(sample.time, 10.0);
        assert_eq!(sample.sense_top, 100.0);
    }
}
