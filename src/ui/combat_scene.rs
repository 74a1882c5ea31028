use super::{clamp_ratio, ratio_color};
use crate::combat::scheduler::AttackPhase;
use crate::combat::session::CombatSnapshot;
use crate::combat::types::DefensePolicy;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

/// Draws the combat scene: player pools, attack status, monsters
pub fn draw_combat_scene(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let title = format!(
        "Combat Arena - Level {} - {}",
        snapshot.level,
        snapshot.exercise.display_name()
    );
    let combat_block = Block::default().borders(Borders::ALL).title(title);

    let inner = combat_block.inner(area);
    frame.render_widget(combat_block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Player HP
            Constraint::Length(3), // Shield
            Constraint::Length(3), // Defense hold progress
            Constraint::Min(3),    // Attack status
        ])
        .split(chunks[0]);

    draw_player_hp(frame, left[0], snapshot);
    draw_shield(frame, left[1], snapshot);
    draw_defense_progress(frame, left[2], snapshot);
    draw_attack_status(frame, left[3], snapshot);
    draw_monsters(frame, chunks[1], snapshot);
}

fn draw_player_hp(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let hp_ratio = clamp_ratio(snapshot.player.hp_ratio());
    let label = format!("{}/{}", snapshot.player.hp, snapshot.player.max_hp);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("HP"))
        .gauge_style(
            Style::default()
                .fg(ratio_color(hp_ratio))
                .add_modifier(Modifier::BOLD),
        )
        .label(label)
        .ratio(hp_ratio);

    frame.render_widget(gauge, area);
}

fn draw_shield(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let ratio = clamp_ratio(snapshot.player.shield_ratio());
    let (title, color) = if snapshot.player.is_defending {
        ("Shield (UP)", Color::Cyan)
    } else {
        ("Shield", Color::DarkGray)
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .label(format!(
            "{}/{}",
            snapshot.player.shield, snapshot.player.max_shield
        ))
        .ratio(ratio);

    frame.render_widget(gauge, area);
}

fn draw_defense_progress(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let (ratio, label) = match snapshot.exercise.defense_policy() {
        DefensePolicy::Consumable => match snapshot.pulse_remaining_ms {
            Some(ms) => (1.0, format!("pulse {:.1}s", ms as f64 / 1000.0)),
            None => (0.0, "swing to raise".to_string()),
        },
        DefensePolicy::Unlimited => {
            let progress = clamp_ratio(snapshot.defense_progress);
            let quality = snapshot
                .last_quality
                .map_or("-".to_string(), |q| format!("{:.1}", q));
            (progress, format!("hold form (quality {})", quality))
        }
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Defense"))
        .gauge_style(Style::default().fg(Color::Blue))
        .label(label)
        .ratio(clamp_ratio(ratio));

    frame.render_widget(gauge, area);
}

fn draw_attack_status(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let status = if snapshot.defeated {
        Span::styled(
            "DEFEATED - press r",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if !snapshot.detecting {
        Span::styled("Paused", Style::default().fg(Color::DarkGray))
    } else {
        match snapshot.phase {
            AttackPhase::Warning { .. } => {
                let remaining = snapshot.warning_remaining_ms.unwrap_or(0);
                Span::styled(
                    format!("ATTACK IN {:.1}s - SHIELD UP!", remaining as f64 / 1000.0),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
                )
            }
            AttackPhase::Attacking { .. } => Span::styled(
                "The monster strikes!",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            AttackPhase::Idle => match snapshot.next_attack_in_ms {
                Some(ms) => Span::raw(format!("Next attack in {:.0}s", ms as f64 / 1000.0)),
                None => Span::raw("Waiting"),
            },
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
            status,
        ]),
        Line::from(format!("Attacks so far: {}", snapshot.attack_count)),
    ];
    if let Some((secs, target)) = snapshot.timer {
        let text = match target {
            Some(target) => format!("Timer: {:.1}s / {:.0}s", secs, target),
            None => format!("Timer: {:.1}s", secs),
        };
        lines.push(Line::from(text));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_monsters(frame: &mut Frame, area: Rect, snapshot: &CombatSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Monsters");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if snapshot.level_cleared {
        let text = Paragraph::new(Line::from(Span::styled(
            format!("Level {} cleared! Press n", snapshot.level),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(text, inner);
        return;
    }

    let constraints: Vec<Constraint> = snapshot
        .monsters
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (monster, row) in snapshot.monsters.iter().zip(rows.iter()) {
        let ratio = if monster.max_hp == 0 {
            0.0
        } else {
            monster.hp as f64 / monster.max_hp as f64
        };
        let mut label = format!("{}/{}", monster.hp, monster.max_hp);
        if monster.shield > 0 {
            label.push_str(&format!(" [shield {}]", monster.shield));
        }
        let color = if monster.is_alive() {
            Color::Red
        } else {
            Color::DarkGray
        };
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(monster.name.as_str()),
            )
            .gauge_style(Style::default().fg(color))
            .label(label)
            .ratio(clamp_ratio(ratio));
        frame.render_widget(gauge, *row);
    }
}
