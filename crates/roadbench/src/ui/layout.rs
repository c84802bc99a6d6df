//! TUI layout

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use serde::Serialize;

use libroadbench_parallel::MetricsSnapshot;

use super::widgets;

/// Static description of the run shown in the header
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub suite: String,
    pub backend: &'static str,
    pub workers: usize,
    pub configs: usize,
    pub behaviors: usize,
}

/// UI state
#[derive(Default)]
pub struct UiState {
    pub worker_scroll: usize,
}

impl UiState {
    pub fn scroll_workers(&mut self, delta: i32, max: usize) {
        if delta < 0 {
            self.worker_scroll = self.worker_scroll.saturating_sub(delta.unsigned_abs() as usize);
        } else {
            self.worker_scroll = (self.worker_scroll + delta as usize).min(max.saturating_sub(1));
        }
    }
}

/// Draw the main UI
pub fn draw(frame: &mut Frame, info: &RunInfo, snapshot: &MetricsSnapshot, state: &UiState) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Run bar
            Constraint::Length(1), // Progress
            Constraint::Length(8), // Throughput + Histogram
            Constraint::Min(6),    // Worker table
            Constraint::Length(3), // Summary
            Constraint::Length(6), // Event log
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_header(frame, chunks[0]);
    render_run_bar(frame, chunks[1], info, snapshot);
    render_progress(frame, chunks[2], snapshot);

    let metrics_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);

    widgets::throughput::render(frame, metrics_chunks[0], snapshot);
    widgets::histogram::render(frame, metrics_chunks[1], snapshot);
    widgets::workers::render(frame, chunks[4], snapshot, state.worker_scroll);
    widgets::summary::render(frame, chunks[5], snapshot);
    widgets::log::render(frame, chunks[6], snapshot);

    render_help_bar(frame, chunks[7], snapshot.is_complete());
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new("ROADBENCH - Parallel Behavior Benchmark")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn render_run_bar(frame: &mut Frame, area: Rect, info: &RunInfo, snapshot: &MetricsSnapshot) {
    let text = format!(
        " Suite: {}  |  Workers: {} ({})  |  Configs: {}  |  Behaviors: {}  |  Elapsed: {:.1}s ",
        info.suite,
        info.workers,
        info.backend,
        info.configs,
        info.behaviors,
        snapshot.elapsed.as_secs_f64()
    );

    let bar = Paragraph::new(text)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(bar, area);
}

fn render_progress(frame: &mut Frame, area: Rect, snapshot: &MetricsSnapshot) {
    let color = if snapshot.is_complete() { Color::Cyan } else { Color::Green };
    let gauge = Gauge::default()
        .ratio(snapshot.progress())
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .label(format!(
            "{}/{} configs",
            snapshot.configs_completed, snapshot.total_configs
        ));
    frame.render_widget(gauge, area);
}

fn render_help_bar(frame: &mut Frame, area: Rect, complete: bool) {
    let help_text = if complete {
        " Done  [q]Quit  [r]Rerun  [↑↓]Scroll  [s]Save Report "
    } else {
        " [q]Quit  [r]Restart  [↑↓]Scroll  [s]Save Report "
    };
    let help_bar = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help_bar, area);
}
