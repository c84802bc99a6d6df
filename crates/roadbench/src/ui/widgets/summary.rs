//! Episode outcome counters

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use libroadbench_parallel::MetricsSnapshot;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot) {
    let mean_steps = if snapshot.configs_completed == 0 {
        0.0
    } else {
        snapshot.total_steps as f64 / snapshot.configs_completed as f64
    };
    let max_steps_color = if snapshot.max_step_configs > 0 {
        Color::Yellow
    } else {
        Color::White
    };

    let separator = Span::styled("  |  ", Style::default().fg(Color::DarkGray));
    let line = Line::from(vec![
        Span::raw(format!(
            "{}/{} configs",
            snapshot.configs_completed, snapshot.total_configs
        )),
        separator.clone(),
        Span::styled(
            format!(
                "{} terminal ({:.1}%)",
                snapshot.terminal_configs,
                snapshot.terminal_rate()
            ),
            Style::default().fg(Color::Green),
        ),
        separator.clone(),
        Span::styled(
            format!("{} hit max steps", snapshot.max_step_configs),
            Style::default().fg(max_steps_color),
        ),
        separator,
        Span::styled(
            format!("{} steps, {:.1} per episode", snapshot.total_steps, mean_steps),
            Style::default().fg(Color::Cyan),
        ),
    ]);

    let paragraph = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .title(" Outcomes ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(paragraph, area);
}
