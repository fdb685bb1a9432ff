//! 配置文件与命令行参数合并
//!
//! 优先级：命令行参数 > 配置文件 > 默认值。

use anyhow::{Context, Result};
use reflow_link::LinkConfig;
use reflow_tools::DEFAULT_IDLE_WINDOW;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径（`<config_dir>/reflow/config.toml`）
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push("reflow");
        path.push("config.toml");
        path
    })
}

/// 配置文件内容（所有字段可选）
///
/// ```toml
/// port = "/dev/ttyUSB0"
/// baud_rate = 9600
/// read_timeout_ms = 700
/// log_dir = "/var/log/reflow"
/// idle_window = 480
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// 串口设备路径
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    /// 读一行的超时（毫秒）
    pub read_timeout_ms: Option<u64>,
    /// 打开串口后的稳定等待（毫秒）
    pub settle_delay_ms: Option<u64>,
    /// CSV 日志目录
    pub log_dir: Option<PathBuf>,
    /// 是否写 CSV 日志
    pub logging: Option<bool>,
    /// 空闲时曲线保留的条数
    pub idle_window: Option<usize>,
    /// 订阅队列容量；不设置时使用无界队列（不丢报文）
    pub queue_capacity: Option<usize>,
}

impl CliConfig {
    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// 加载配置
    ///
    /// - 显式指定的文件必须存在
    /// - 未指定时读取默认位置，文件不存在则使用默认配置
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub log_dir: Option<PathBuf>,
    pub no_log: bool,
    pub idle_window: Option<usize>,
}

/// 合并后的运行配置
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub settle_delay: Duration,
    /// `None` 表示不写日志
    pub log_dir: Option<PathBuf>,
    pub idle_window: usize,
    /// `None` 表示无界队列；`Some(n)` 时队列满会丢弃报文
    pub queue_capacity: Option<usize>,
}

impl Settings {
    pub fn resolve(file: CliConfig, overrides: Overrides) -> Self {
        let link = LinkConfig::default();
        let logging = !overrides.no_log && file.logging.unwrap_or(true);
        let log_dir = overrides
            .log_dir
            .or(file.log_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            port: overrides.port.or(file.port).unwrap_or(link.port),
            baud_rate: overrides
                .baud_rate
                .or(file.baud_rate)
                .unwrap_or(link.baud_rate),
            read_timeout: file
                .read_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(link.read_timeout),
            settle_delay: file
                .settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(link.settle_delay),
            log_dir: logging.then_some(log_dir),
            idle_window: overrides
                .idle_window
                .or(file.idle_window)
                .unwrap_or(DEFAULT_IDLE_WINDOW),
            queue_capacity: file.queue_capacity,
        }
    }

    /// 串口链路配置
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
            settle_delay: self.settle_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflow_link::DEFAULT_PORT;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = CliConfig::from_toml_str(
            r#"
            port = "/dev/ttyACM0"
            baud_rate = 19200
            read_timeout_ms = 300
            settle_delay_ms = 0
            log_dir = "/tmp/reflow"
            logging = false
            idle_window = 240
            queue_capacity = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.baud_rate, Some(19200));
        assert_eq!(config.logging, Some(false));
        assert_eq!(config.idle_window, Some(240));

        let settings = Settings::resolve(config, Overrides::default());
        assert_eq!(settings.queue_capacity, Some(32));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(CliConfig::from_toml_str("prot = \"/dev/ttyUSB0\"").is_err());
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::resolve(CliConfig::default(), Overrides::default());
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_millis(700));
        assert_eq!(settings.log_dir, Some(PathBuf::from(".")));
        assert_eq!(settings.idle_window, 480);
        assert_eq!(settings.queue_capacity, None);
        assert_eq!(settings.link_config(), LinkConfig::default());
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = CliConfig {
            port: Some("/dev/ttyS1".to_string()),
            baud_rate: Some(4800),
            log_dir: Some(PathBuf::from("/var/log/reflow")),
            ..CliConfig::default()
        };
        let overrides = Overrides {
            port: Some("/dev/ttyUSB3".to_string()),
            idle_window: Some(60),
            ..Overrides::default()
        };

        let settings = Settings::resolve(file, overrides);
        assert_eq!(settings.port, "/dev/ttyUSB3");
        assert_eq!(settings.baud_rate, 4800);
        assert_eq!(settings.log_dir, Some(PathBuf::from("/var/log/reflow")));
        assert_eq!(settings.idle_window, 60);
    }

    #[test]
    fn test_logging_can_be_disabled() {
        let settings = Settings::resolve(
            CliConfig::default(),
            Overrides {
                no_log: true,
                ..Overrides::default()
            },
        );
        assert!(settings.log_dir.is_none());

        let file = CliConfig {
            logging: Some(false),
            ..CliConfig::default()
        };
        assert!(Settings::resolve(file, Overrides::default()).log_dir.is_none());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"/dev/ttyUSB7\"").unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB7"));

        let missing = file.path().with_extension("missing");
        let err = CliConfig::load(Some(&missing)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
