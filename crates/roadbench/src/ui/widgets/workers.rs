//! Worker status table widget

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Row, Table},
};

use libroadbench_parallel::{MetricsSnapshot, WorkerStatus};

/// Render the worker status table
pub fn render(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot, scroll_offset: usize) {
    let block = Block::default()
        .title(" Workers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let header = Row::new(
        ["ID", "Status", "Shard", "Done", "Terminal", "Max steps", "Progress"]
            .into_iter()
            .map(|title| Cell::from(title).style(header_style)),
    )
    .height(1);

    let rows: Vec<Row> = snapshot
        .worker_metrics
        .iter()
        .skip(scroll_offset)
        .map(|worker| {
            let status_style = match worker.status {
                WorkerStatus::Running => Style::default().fg(Color::Green),
                WorkerStatus::Complete => Style::default().fg(Color::Cyan),
                WorkerStatus::Failed => Style::default().fg(Color::Red),
                WorkerStatus::Pending => Style::default().fg(Color::Gray),
            };
            let progress = if worker.shard_size == 0 {
                100.0
            } else {
                worker.completed as f64 / worker.shard_size as f64 * 100.0
            };

            Row::new(vec![
                Cell::from(format!("#{:02}", worker.worker_id)),
                Cell::from(worker.status.as_str()).style(status_style),
                Cell::from(worker.shard_size.to_string()),
                Cell::from(worker.completed.to_string()),
                Cell::from(worker.terminal.to_string()).style(Style::default().fg(Color::Green)),
                Cell::from(worker.max_steps.to_string()).style(if worker.max_steps > 0 {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                }),
                Cell::from(format!("{:.0}%", progress)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(10),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_widget(table, inner);
}
