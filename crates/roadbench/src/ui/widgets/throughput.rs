//! Configs finished per second

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Sparkline},
};

use libroadbench_parallel::MetricsSnapshot;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot) {
    // Title carries the numbers so the sparkline gets the whole inner area
    let title = format!(
        " Throughput  now {:.0}/s  peak {:.0}/s  avg {:.1}/s ",
        snapshot.current_throughput,
        snapshot.peak_throughput,
        snapshot.configs_per_second()
    );

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .data(&snapshot.throughput_history)
        .style(Style::default().fg(Color::Green));
    frame.render_widget(sparkline, area);
}
