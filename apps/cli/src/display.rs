//! 数值显示

use reflow_driver::MetricsSnapshot;
use reflow_protocol::Sample;
use reflow_tools::PlotWindows;

/// 一条报文的单行显示
pub fn format_sample(sample: &Sample) -> String {
    format!(
        "[{:<5}] t={:>8.2}s  target {:>7.2}°C  top {:>7.2}°C  bottom {:>7.2}°C  duty {:>3.0}% (top {:>3.0}%, bottom {:>3.0}%)",
        sample.state.as_tag(),
        sample.time,
        sample.target,
        sample.sense_top,
        sample.sense_bottom,
        sample.cmd * 100.0,
        sample.cmd_top * 100.0,
        sample.cmd_bottom * 100.0,
    )
}

/// `status` 命令的输出
pub fn format_status(
    latest: Option<&Sample>,
    plots: &PlotWindows,
    metrics: &MetricsSnapshot,
    manual_power: (u8, u8),
    log_file: Option<&str>,
) -> String {
    let mut lines = Vec::new();

    match latest {
        Some(sample) => lines.push(format_sample(sample)),
        None => lines.push("no reading received yet".to_string()),
    }

    let window_span = plots
        .temperatures()
        .iter()
        .next()
        .map_or(0.0, |(first, _)| -first);
    lines.push(format!(
        "plot window: {} points ({:.2}s before newest)",
        plots.temperatures().len(),
        window_span.max(0.0)
    ));
    lines.push(format!(
        "manual power: top {}/255, bottom {}/255",
        manual_power.0, manual_power.1
    ));
    lines.push(format!(
        "link: {} lines, {} samples, {} malformed ({:.1}%), {} timeouts, {} subscriber failures",
        metrics.lines_total,
        metrics.samples_published,
        metrics.malformed_frames,
        metrics.malformed_rate(),
        metrics.read_timeouts,
        metrics.handler_failures
    ));
    lines.push(format!("log file: {}", log_file.unwrap_or("(disabled)")));

    lines.join("\n")
}
