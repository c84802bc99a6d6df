//! Config latency percentiles as a horizontal bar chart

use ratatui::{
    prelude::*,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
};

use libroadbench_parallel::MetricsSnapshot;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot) {
    let latencies = &snapshot.latencies;
    let percentiles = [
        ("p50", latencies.p50_ms(), Color::Green),
        ("p95", latencies.p95_ms(), Color::Yellow),
        ("p99", latencies.p99_ms(), Color::Red),
        ("max", latencies.max_ms(), Color::Magenta),
    ];

    let bars: Vec<Bar> = percentiles
        .iter()
        .map(|&(label, ms, color)| {
            Bar::default()
                .label(Line::from(label))
                .value((ms * 1000.0).round() as u64)
                .text_value(format_latency(ms))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(" Episode Latency ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

/// Human-readable duration for a latency in milliseconds
pub fn format_latency(value_ms: f64) -> String {
    match value_ms {
        ms if ms < 1.0 => format!("{:.1}us", ms * 1000.0),
        ms if ms < 1000.0 => format!("{:.1}ms", ms),
        ms => format!("{:.2}s", ms / 1000.0),
    }
}
