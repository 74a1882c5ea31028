use super::{clamp_ratio, ratio_color};
use crate::defense_mode::logic::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::defense_mode::{ModeController, ModeStatus};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

pub fn draw_defense_mode_scene(frame: &mut Frame, area: Rect, mode: &ModeController) {
    let session = mode.session();
    let mut title = format!("Continuous Defense - {}", session.difficulty());
    if mode.is_degraded() {
        title.push_str(" (offline)");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress toward target
            Constraint::Length(3), // HP + shield
            Constraint::Min(4),    // Arena
            Constraint::Length(2), // Stats line
        ])
        .split(inner);

    let target = session.config().target_duration_ms.max(1);
    let progress = session.elapsed_valid_ms() as f64 / target as f64;
    let progress_gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Valid swing time"))
        .gauge_style(Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD))
        .label(format!(
            "{:.1}s / {}s",
            session.elapsed_valid_ms() as f64 / 1000.0,
            target / 1000
        ))
        .ratio(clamp_ratio(progress));
    frame.render_widget(progress_gauge, chunks[0]);

    let pools = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let max_hp = session.config().max_hp.max(1);
    let hp_ratio = clamp_ratio(session.hp() as f64 / max_hp as f64);
    frame.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("HP"))
            .gauge_style(Style::default().fg(ratio_color(hp_ratio)))
            .label(format!("{}/{}", session.hp(), max_hp))
            .ratio(hp_ratio),
        pools[0],
    );

    let max_shield = session.config().max_shield.max(1);
    let shield_ratio = clamp_ratio(session.shield() as f64 / max_shield as f64);
    frame.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Shield"))
            .gauge_style(Style::default().fg(Color::Cyan))
            .label(format!("{}/{}", session.shield(), max_shield))
            .ratio(shield_ratio),
        pools[1],
    );

    draw_arena(frame, chunks[2], mode);

    let stats = session.statistics();
    let status = match session.status() {
        ModeStatus::NotStarted => "press s to start".to_string(),
        ModeStatus::Active if session.is_exercising() => {
            format!("swinging (quality {:.1})", session.exercise_quality())
        }
        ModeStatus::Active => "keep swinging!".to_string(),
        ModeStatus::Completed => format!("VICTORY - score {}", session.score().unwrap_or(0)),
        ModeStatus::GameOver => format!("DEFEATED - score {}", session.score().unwrap_or(0)),
    };
    let line = Line::from(vec![
        Span::styled(status, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "  | attacks {}  combo {} (max {})  repaired {}",
            session.attack_count(),
            stats.current_combo,
            stats.max_combo,
            stats.total_shield_repaired
        )),
    ]);
    frame.render_widget(
        Paragraph::new(line).alignment(Alignment::Center),
        chunks[3],
    );
}

/// Monster position scaled into the arena box.
fn draw_arena(frame: &mut Frame, area: Rect, mode: &ModeController) {
    let block = Block::default().borders(Borders::ALL).title("Arena");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let (x, y) = mode.session().monster_position();
    let col = ((x / ARENA_WIDTH) * inner.width as f64) as u16;
    let row = ((y / ARENA_HEIGHT) * inner.height as f64) as u16;
    let col = col.min(inner.width.saturating_sub(1));
    let row = row.min(inner.height.saturating_sub(1));

    let lines: Vec<Line> = (0..inner.height)
        .map(|r| {
            if r == row {
                Line::from(vec![
                    Span::raw(" ".repeat(col as usize)),
                    Span::styled(
                        "M",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from("")
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
