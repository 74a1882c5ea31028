mod combat_scene;
mod defense_mode_scene;

use crate::core::clock::Clock;
use crate::core::game::{Game, LogLevel, Screen};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Main UI drawing function
pub fn draw_ui<C: Clock + Clone>(frame: &mut Frame, game: &Game<C>) {
    let size = frame.size();

    // Split vertically: status bar, main content, event log, footer
    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Connection status
            Constraint::Min(0),     // Current screen
            Constraint::Length(10), // Event log
            Constraint::Length(3),  // Footer
        ])
        .split(size);

    draw_status_bar(frame, v_chunks[0], game);

    match game.screen() {
        Screen::Combat => {
            combat_scene::draw_combat_scene(frame, v_chunks[1], &game.combat_snapshot());
        }
        Screen::DefenseMode => {
            defense_mode_scene::draw_defense_mode_scene(frame, v_chunks[1], game.mode());
        }
    }

    draw_event_log(frame, v_chunks[2], game);
    draw_footer(frame, v_chunks[3], game);
}

fn draw_status_bar<C: Clock + Clone>(frame: &mut Frame, area: Rect, game: &Game<C>) {
    let (text, color) = if game.is_connected() {
        ("● connected", Color::Green)
    } else {
        ("○ offline", Color::Red)
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            game.source_description(),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Rgb(20, 20, 30))),
        area,
    );
}

fn draw_event_log<C: Clock + Clone>(frame: &mut Frame, area: Rect, game: &Game<C>) {
    let block = Block::default().borders(Borders::ALL).title("Events");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let entries = game.log();
    let skip = entries.len().saturating_sub(visible);
    let lines: Vec<Line> = entries
        .iter()
        .skip(skip)
        .map(|entry| {
            let color = match entry.level {
                LogLevel::Info => Color::White,
                LogLevel::Good => Color::Green,
                LogLevel::Bad => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_footer<C: Clock + Clone>(frame: &mut Frame, area: Rect, game: &Game<C>) {
    let keys: &[(&str, &str)] = match game.screen() {
        Screen::Combat => &[
            ("s", "start/stop"),
            ("e", "exercise"),
            ("n", "next level"),
            ("r", "reset"),
            ("d", "defense mode"),
            ("q", "quit"),
        ],
        Screen::DefenseMode => &[
            ("s", "start/stop"),
            ("c", "difficulty"),
            ("r", "reset"),
            ("d", "combat"),
            ("q", "quit"),
        ],
    };

    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(
            format!("[{}]", key),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {}  ", action)));
    }

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

/// Gauge color by fill ratio.
fn ratio_color(ratio: f64) -> Color {
    if ratio > 0.66 {
        Color::Green
    } else if ratio > 0.33 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// `0..=1` clamp; gauges panic outside it.
fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
