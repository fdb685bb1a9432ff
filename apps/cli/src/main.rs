//! # Reflow CLI
//!
//! 回流焊炉控制器的命令行监控程序。
//!
//! ```bash
//! # 默认串口
//! reflow-cli
//!
//! # 指定串口，日志写到 ./logs
//! reflow-cli /dev/ttyUSB0 --log-dir logs
//! ```
//!
//! 运行后从 stdin 读取控制台命令（`help` 查看列表），Ctrl-C 退出。

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{Receiver, bounded, never, select, tick};
use reflow_driver::{DriverError, Oven, OvenBuilder};
use reflow_link::LinkError;
use reflow_protocol::Sample;
use reflow_tools::{PlotWindows, SessionLogger};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;
mod console;
mod display;

use config::{CliConfig, Overrides, Settings};
use console::OperatorCommand;

/// 链路健康检查周期
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// 运行中链路丢失时的退出码
const EXIT_STREAM_LOST: u8 = 2;

/// Reflow CLI - 回流焊炉监控工具
#[derive(Parser, Debug)]
#[command(name = "reflow-cli")]
#[command(about = "Serial telemetry supervisor for the reflow oven controller", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备路径（默认 /dev/ttyUSB000）
    port: Option<String>,

    /// 波特率
    #[arg(short, long)]
    baud: Option<u32>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV 日志目录
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 不写 CSV 日志
    #[arg(long)]
    no_log: bool,

    /// 空闲时曲线保留的条数
    #[arg(short, long)]
    window: Option<usize>,

    /// 每条报文输出一行 JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reflow_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let file = CliConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(
        file,
        Overrides {
            port: cli.port,
            baud_rate: cli.baud,
            log_dir: cli.log_dir,
            no_log: cli.no_log,
            idle_window: cli.window,
        },
    );

    let oven = match OvenBuilder::from_config(settings.link_config()).build() {
        Ok(oven) => oven,
        Err(DriverError::Link(LinkError::Open { source, .. })) => {
            eprintln!("failed to open serial port - \"{source}\"");
            return Ok(ExitCode::FAILURE);
        },
        Err(e) => return Err(e.into()),
    };
    info!("Connected to {}", oven.link_name());

    // 日志需要完整数据，默认使用无界队列
    let (_subscription, samples) = match settings.queue_capacity {
        Some(capacity) => {
            warn!("Bounded sample queue ({capacity}): samples are dropped if the console falls behind");
            oven.subscribe_channel(capacity)
        },
        None => oven.subscribe_unbounded(),
    };
    let mut session = Session {
        logger: settings.log_dir.as_ref().map(SessionLogger::new),
        plots: PlotWindows::new(settings.idle_window),
        latest: None,
        json: cli.json,
    };

    let mut console_rx = console::spawn_input_thread()?;
    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;
    let health = tick(HEALTH_CHECK_INTERVAL);

    println!("Type 'help' for a list of commands.");

    loop {
        let mut console_closed = false;
        select! {
            recv(samples) -> sample => match sample {
                Ok(sample) => session.on_sample(sample),
                Err(_) => break,
            },
            recv(console_rx) -> line => match line {
                Ok(line) => {
                    if !session.on_console_line(&oven, &line) {
                        break;
                    }
                },
                Err(_) => console_closed = true,
            },
            recv(interrupt_rx) -> _ => {
                info!("Interrupted, shutting down");
                break;
            },
            recv(health) -> _ => {
                if !oven.is_healthy() {
                    break;
                }
            },
        }

        if console_closed {
            // stdin 已关闭，只继续监控
            console_rx = never();
        }
    }

    drain(&samples, &mut session);
    session.close();

    match oven.shutdown() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(DriverError::StreamLost(reason)) => {
            error!("Lost connection to the oven: {}", reason);
            Ok(ExitCode::from(EXIT_STREAM_LOST))
        },
        Err(e) => {
            error!("Shutdown failed: {}", e);
            Ok(ExitCode::FAILURE)
        },
    }
}

/// 主线程上的消费者状态
struct Session {
    logger: Option<SessionLogger>,
    plots: PlotWindows,
    latest: Option<Sample>,
    json: bool,
}

impl Session {
    fn on_sample(&mut self, sample: Sample) {
        if let Some(logger) = self.logger.as_mut()
            && let Err(e) = logger.log_sample(&sample)
        {
            warn!("Disabling CSV log: {:#}", e);
            self.logger = None;
        }

        self.plots.push(&sample);

        if self.json {
            match serde_json::to_string(&sample) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to encode sample: {}", e),
            }
        } else {
            println!("{}", display::format_sample(&sample));
        }

        self.latest = Some(sample);
    }

    /// 执行一行控制台输入；返回 `false` 表示退出
    fn on_console_line(&mut self, oven: &Oven, line: &str) -> bool {
        let command = match line.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                return true;
            },
        };

        let result = match command {
            OperatorCommand::Go => oven.go(),
            OperatorCommand::Reset => oven.reset(),
            OperatorCommand::Pause => oven.pause(),
            OperatorCommand::Resume => oven.resume(),
            OperatorCommand::Manual(enabled) => oven.set_manual(enabled),
            OperatorCommand::Target(celsius) => oven.set_target(celsius),
            OperatorCommand::Top(percent) => oven.set_manual_top(percent),
            OperatorCommand::Bottom(percent) => oven.set_manual_bottom(percent),
            OperatorCommand::Status => {
                let log_file = self
                    .logger
                    .as_ref()
                    .and_then(|logger| logger.current_path())
                    .map(|path| path.display().to_string());
                println!(
                    "{}",
                    display::format_status(
                        self.latest.as_ref(),
                        &self.plots,
                        &oven.metrics(),
                        oven.manual_power(),
                        log_file.as_deref(),
                    )
                );
                Ok(())
            },
            OperatorCommand::Help => {
                console::print_help();
                Ok(())
            },
            OperatorCommand::Quit => return false,
        };

        if let Err(e) = result {
            error!("Command '{}' failed: {}", line, e);
        }
        true
    }

    fn close(&mut self) {
        if let Some(logger) = self.logger.as_mut()
            && let Err(e) = logger.close()
        {
            warn!("Failed to close CSV log: {:#}", e);
        }
    }
}

/// 处理队列中剩余的报文
fn drain(samples: &Receiver<Sample>, session: &mut Session) {
    while let Ok(sample) = samples.try_recv() {
        session.on_sample(sample);
    }
}
