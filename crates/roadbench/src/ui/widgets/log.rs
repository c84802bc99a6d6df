//! Event log

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

use libroadbench_parallel::MetricsSnapshot;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot) {
    let visible = area.height.saturating_sub(2) as usize;
    let first = snapshot.event_log.len().saturating_sub(visible);

    let items: Vec<ListItem> = snapshot.event_log[first..]
        .iter()
        .map(|entry| ListItem::new(Line::styled(entry.as_str(), event_style(entry))))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Events ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    );
    frame.render_widget(list, area);
}

fn event_style(entry: &str) -> Style {
    if entry.contains("failed") {
        Style::default().fg(Color::Red)
    } else if entry.contains("complete") {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
