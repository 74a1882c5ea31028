//! Top-level game state: the combat session, continuous defense mode and
//! the backend link, glued to one tick.

use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::combat::session::{CombatEvent, CombatSession, CombatSnapshot};
use crate::combat::types::ExerciseKind;
use crate::core::clock::Clock;
use crate::core::config::AppConfig;
use crate::core::constants::EVENT_LOG_CAPACITY;
use crate::defense_mode::authority::AuthorityWorker;
use crate::defense_mode::controller::ModeController;
use crate::defense_mode::types::{ModeEvent, MotionSample};
use crate::protocol::{parse_inbound, EventSource, InboundEvent, LinkEvent, OutboundCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Combat,
    DefenseMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Good,
    Bad,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    pub level: LogLevel,
}

fn combat_level(event: &CombatEvent) -> LogLevel {
    match event {
        CombatEvent::ShieldRaised
        | CombatEvent::MonsterDefeated { .. }
        | CombatEvent::LevelCleared { .. }
        | CombatEvent::ExerciseCompleted { .. } => LogLevel::Good,
        CombatEvent::WarningStarted { .. }
        | CombatEvent::PlayerDefeated
        | CombatEvent::ConnectionLost { .. }
        | CombatEvent::DetectionRejected { .. }
        | CombatEvent::BackendError { .. } => LogLevel::Bad,
        CombatEvent::AttackResolved { hp_damage, .. } if *hp_damage > 0 => LogLevel::Bad,
        _ => LogLevel::Info,
    }
}

fn mode_level(event: &ModeEvent) -> LogLevel {
    match event {
        ModeEvent::ShieldRepaired { .. } | ModeEvent::Completed { .. } => LogLevel::Good,
        ModeEvent::GameOver { .. } | ModeEvent::AuthorityDegraded { .. } => LogLevel::Bad,
        ModeEvent::MonsterAttack { hp_damage, .. } if *hp_damage > 0 => LogLevel::Bad,
        _ => LogLevel::Info,
    }
}

pub struct Game<C: Clock + Clone> {
    clock: C,
    combat: CombatSession<C>,
    mode: ModeController,
    source: Box<dyn EventSource>,
    config: AppConfig,
    screen: Screen,
    selected_exercise: ExerciseKind,
    connected: bool,
    /// Backend detection is running for the defense mode.
    mode_detecting: bool,
    log: VecDeque<LogEntry>,
    rng: StdRng,
}

impl<C: Clock + Clone> Game<C> {
    pub fn new(
        config: AppConfig,
        source: Box<dyn EventSource>,
        authority: Option<AuthorityWorker>,
        clock: C,
    ) -> Self {
        let exercise = ExerciseKind::from_label(&config.default_exercise);
        let combat = CombatSession::new(config.combat.clone(), exercise.clone(), clock.clone())
            .with_camera(config.camera_index, config.detection_line);
        let mode = ModeController::new(config.difficulty, authority);

        let mut game = Self {
            clock,
            combat,
            mode,
            source,
            config,
            screen: Screen::Combat,
            selected_exercise: exercise,
            connected: false,
            mode_detecting: false,
            log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            rng: StdRng::from_entropy(),
        };
        let greeting = format!("Backend: {}", game.source.describe());
        game.push_log(greeting, LogLevel::Info);
        game
    }

    /// Deterministic monster wander, for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn combat(&self) -> &CombatSession<C> {
        &self.combat
    }

    pub fn combat_snapshot(&self) -> CombatSnapshot {
        self.combat.snapshot()
    }

    pub fn mode(&self) -> &ModeController {
        &self.mode
    }

    pub fn selected_exercise(&self) -> &ExerciseKind {
        &self.selected_exercise
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Newest last.
    pub fn log(&self) -> &VecDeque<LogEntry> {
        &self.log
    }

    fn push_log(&mut self, message: String, level: LogLevel) {
        if self.log.len() == EVENT_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message,
            level,
        });
    }

    fn log_combat(&mut self, events: Vec<CombatEvent>) {
        for event in events {
            let level = combat_level(&event);
            self.push_log(event.message(), level);
        }
    }

    fn log_mode(&mut self, events: Vec<ModeEvent>) {
        for event in events {
            // Wander fires every few seconds; keep it off the log.
            if matches!(event, ModeEvent::MonsterMoved { .. }) {
                continue;
            }
            let level = mode_level(&event);
            self.push_log(event.message(), level);
        }
    }

    fn send(&mut self, command: OutboundCommand) {
        if !self.source.send(&command) {
            log::warn!("could not deliver {:?} to backend", command);
        }
    }

    /// One game-loop step: drain the backend, then advance both rulesets.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        for link_event in self.source.poll(now) {
            self.on_link_event(link_event, now);
        }

        let combat_events = self.combat.tick();
        self.log_combat(combat_events);

        let mode_events = self.mode.tick(now, &mut self.rng);
        self.after_mode_events(&mode_events);
        self.log_mode(mode_events);
    }

    fn on_link_event(&mut self, event: LinkEvent, now: u64) {
        match event {
            LinkEvent::Connected => {
                self.connected = true;
                self.push_log("Connected to backend".to_string(), LogLevel::Good);
            }
            LinkEvent::Frame(text) => match parse_inbound(&text) {
                Ok(inbound) => self.on_inbound(inbound, now),
                Err(e) => log::warn!("dropping backend frame: {}", e),
            },
            LinkEvent::Disconnected { reason } => {
                self.connected = false;
                let events = self.combat.force_stop(&reason);
                if events.is_empty() {
                    self.push_log(format!("Backend unavailable: {}", reason), LogLevel::Bad);
                }
                self.log_combat(events);
                if self.mode_detecting {
                    self.mode_detecting = false;
                    let events = self.mode.stop();
                    self.log_mode(events);
                }
            }
        }
    }

    fn on_inbound(&mut self, inbound: InboundEvent, now: u64) {
        if !self.mode_detecting {
            let events = self.combat.handle_event(inbound);
            self.log_combat(events);
            return;
        }

        let events = match inbound {
            InboundEvent::Quality { score, exercise } => {
                let exercise = exercise.unwrap_or(ExerciseKind::AlternatingArmSwing);
                let Some(score) = score else {
                    return;
                };
                let threshold = self.mode.session().config().quality_threshold;
                let sample = MotionSample::new(exercise, score, score >= threshold);
                self.mode.on_motion_sample(sample, now)
            }
            InboundEvent::TimerUpdate {
                accumulated_secs,
                completed,
                ..
            } => self.mode.on_timer_update(accumulated_secs, completed, now),
            InboundEvent::ExerciseCompleted { .. } => self.mode.on_exercise_completed(),
            InboundEvent::DetectionStarted {
                success: false,
                message,
            } => {
                self.mode_detecting = false;
                self.push_log(
                    format!(
                        "Backend refused detection: {}",
                        message.unwrap_or_else(|| "no reason given".to_string())
                    ),
                    LogLevel::Bad,
                );
                self.mode.stop()
            }
            InboundEvent::BackendError { message } => {
                self.push_log(format!("Backend error: {}", message), LogLevel::Bad);
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.after_mode_events(&events);
        self.log_mode(events);
    }

    /// A finished run no longer needs the camera.
    fn after_mode_events(&mut self, events: &[ModeEvent]) {
        let finished = events
            .iter()
            .any(|e| matches!(e, ModeEvent::Completed { .. } | ModeEvent::GameOver { .. }));
        if finished && self.mode_detecting {
            self.mode_detecting = false;
            self.send(OutboundCommand::StopDetection);
        }
    }

    /// `s`: start or stop whatever the current screen runs.
    pub fn toggle_detection(&mut self) {
        match self.screen {
            Screen::Combat => {
                if self.combat.is_detecting() {
                    if let Some(command) = self.combat.stop_detection() {
                        self.send(command);
                        self.log_combat(vec![CombatEvent::DetectionStopped]);
                    }
                } else {
                    let exercise = self.selected_exercise.clone();
                    match self.combat.start_detection(exercise.clone()) {
                        Some(command) => {
                            self.send(command);
                            self.log_combat(vec![CombatEvent::DetectionStarted { exercise }]);
                        }
                        None => self.push_log(
                            "You are defeated. Press r to reset.".to_string(),
                            LogLevel::Bad,
                        ),
                    }
                }
            }
            Screen::DefenseMode => {
                if self.mode.is_active() {
                    let events = self.mode.stop();
                    self.log_mode(events);
                    if self.mode_detecting {
                        self.mode_detecting = false;
                        self.send(OutboundCommand::StopDetection);
                    }
                } else if self.mode.session().status().is_terminal() {
                    self.push_log("Run finished. Press r to reset.".to_string(), LogLevel::Info);
                } else {
                    let now = self.clock.now_ms();
                    let events = self.mode.start(now);
                    if !events.is_empty() {
                        self.mode_detecting = true;
                        self.send(OutboundCommand::ResetCount);
                        self.send(OutboundCommand::StartDetection {
                            exercise_type: ExerciseKind::AlternatingArmSwing.label().to_string(),
                            camera_index: self.config.camera_index,
                            detection_line: self.config.detection_line,
                        });
                    }
                    self.log_mode(events);
                }
            }
        }
    }

    /// `r`: fresh state for the current screen.
    pub fn reset(&mut self) {
        match self.screen {
            Screen::Combat => {
                for command in self.combat.reset() {
                    self.send(command);
                }
                self.push_log("Combat reset".to_string(), LogLevel::Info);
            }
            Screen::DefenseMode => {
                if self.mode_detecting {
                    self.mode_detecting = false;
                    self.send(OutboundCommand::StopDetection);
                }
                self.mode.reset();
                self.push_log("Continuous defense reset".to_string(), LogLevel::Info);
            }
        }
    }

    /// `e`: next exercise. Only between detections.
    pub fn cycle_exercise(&mut self) {
        if self.screen != Screen::Combat || self.combat.is_detecting() {
            return;
        }
        self.selected_exercise = self.selected_exercise.next_selectable();
        let message = format!("Exercise: {}", self.selected_exercise.display_name());
        self.push_log(message, LogLevel::Info);
    }

    /// `c`: next difficulty. Only while no run is active.
    pub fn cycle_difficulty(&mut self) {
        if self.screen != Screen::DefenseMode {
            return;
        }
        let next = self.mode.session().difficulty().next();
        if self.mode.set_difficulty(next) {
            self.push_log(format!("Difficulty: {}", next), LogLevel::Info);
        }
    }

    /// `n`: next level after clearing one.
    pub fn advance_level(&mut self) {
        if self.screen != Screen::Combat {
            return;
        }
        if let Some(event) = self.combat.advance_level() {
            self.log_combat(vec![event]);
        }
    }

    /// `d`: switch between combat and continuous defense. Whatever the old
    /// screen was running is stopped first.
    pub fn toggle_screen(&mut self) {
        match self.screen {
            Screen::Combat => {
                if let Some(command) = self.combat.stop_detection() {
                    self.send(command);
                }
                self.screen = Screen::DefenseMode;
            }
            Screen::DefenseMode => {
                if self.mode.is_active() {
                    let events = self.mode.stop();
                    self.log_mode(events);
                }
                if self.mode_detecting {
                    self.mode_detecting = false;
                    self.send(OutboundCommand::StopDetection);
                }
                self.screen = Screen::Combat;
            }
        }
    }

    /// Stop everything before exit.
    pub fn shutdown(&mut self) {
        if let Some(command) = self.combat.stop_detection() {
            self.send(command);
        }
        if self.mode.is_active() {
            self.mode.stop();
        }
        if self.mode_detecting {
            self.mode_detecting = false;
            self.send(OutboundCommand::StopDetection);
        }
    }
}
