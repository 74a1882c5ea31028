//! The combat session owns every piece of mutable combat state.
//!
//! Inbound backend events and the game-loop tick are the only ways in;
//! both return [`CombatEvent`]s for the UI log.

use crate::combat::defense::{DefenseTracker, DefenseTransition};
use crate::combat::monster::{Monster, MonsterRoster};
use crate::combat::resolver::{resolve_attack, AttackOutcome};
use crate::combat::scheduler::{AttackPhase, AttackScheduler, SchedulerEvent};
use crate::combat::types::{ExerciseKind, PlayerCombatState};
use crate::core::clock::Clock;
use crate::core::config::DefenseConfig;
use crate::protocol::{InboundEvent, OutboundCommand};

#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    DetectionStarted { exercise: ExerciseKind },
    DetectionStopped,
    DetectionRejected { message: String },
    ConnectionLost { reason: String },
    ShieldRaised,
    ShieldLowered,
    ShieldExpired,
    WarningStarted { attack_number: u32, warning_ms: u64 },
    AttackResolved {
        attack_number: u32,
        outcome: AttackOutcome,
        absorbed: u32,
        hp_damage: u32,
    },
    PlayerDefeated,
    MonsterHit { monster: String, damage: u32, absorbed: u32 },
    MonsterDefeated { monster: String },
    LevelCleared { level: u32 },
    LevelStarted { level: u32 },
    ExerciseCompleted { message: Option<String> },
    BackendError { message: String },
}

impl CombatEvent {
    /// One-line text for the event log.
    pub fn message(&self) -> String {
        match self {
            Self::DetectionStarted { exercise } => format!("Detection started: {}", exercise),
            Self::DetectionStopped => "Detection stopped".to_string(),
            Self::DetectionRejected { message } => format!("Backend refused detection: {}", message),
            Self::ConnectionLost { reason } => format!("Connection lost: {}", reason),
            Self::ShieldRaised => "Shield up!".to_string(),
            Self::ShieldLowered => "Form slipped, shield down".to_string(),
            Self::ShieldExpired => "Arm swing shield faded".to_string(),
            Self::WarningStarted {
                attack_number,
                warning_ms,
            } => format!(
                "Monster attack #{} incoming in {}s! Raise your shield!",
                attack_number,
                warning_ms / 1000
            ),
            Self::AttackResolved {
                attack_number,
                outcome,
                absorbed,
                hp_damage,
            } => match outcome {
                AttackOutcome::Blocked => format!("Attack #{} blocked", attack_number),
                AttackOutcome::Absorbed => {
                    format!("Attack #{}: shield absorbed {}", attack_number, absorbed)
                }
                AttackOutcome::Damaged | AttackOutcome::Defeated => format!(
                    "Attack #{} hit for {} ({} absorbed)",
                    attack_number, hp_damage, absorbed
                ),
                AttackOutcome::Suppressed => format!("Attack #{} glanced off", attack_number),
                AttackOutcome::Ignored => format!("Attack #{} ignored", attack_number),
            },
            Self::PlayerDefeated => "You were defeated. Press r to reset.".to_string(),
            Self::MonsterHit {
                monster,
                damage,
                absorbed,
            } => {
                if *absorbed > 0 {
                    format!("Hit {} for {} ({} blocked by its shield)", monster, damage, absorbed)
                } else {
                    format!("Hit {} for {}", monster, damage)
                }
            }
            Self::MonsterDefeated { monster } => format!("{} defeated!", monster),
            Self::LevelCleared { level } => format!("Level {} cleared! Press n to continue.", level),
            Self::LevelStarted { level } => format!("Level {} begins", level),
            Self::ExerciseCompleted { message } => match message {
                Some(m) => format!("Exercise complete: {}", m),
                None => "Exercise complete".to_string(),
            },
            Self::BackendError { message } => format!("Backend error: {}", message),
        }
    }
}

/// Read-only view for rendering.
#[derive(Debug, Clone)]
pub struct CombatSnapshot {
    pub player: PlayerCombatState,
    pub phase: AttackPhase,
    pub attack_count: u32,
    pub warning_remaining_ms: Option<u64>,
    pub next_attack_in_ms: Option<u64>,
    pub defense_progress: f64,
    pub pulse_remaining_ms: Option<u64>,
    pub exercise: ExerciseKind,
    pub detecting: bool,
    pub defeated: bool,
    pub level: u32,
    pub monsters: Vec<Monster>,
    pub level_cleared: bool,
    pub last_quality: Option<f64>,
    pub frames_received: u64,
    /// Accumulated and target seconds for timed exercises.
    pub timer: Option<(f64, Option<f64>)>,
}

pub struct CombatSession<C: Clock> {
    clock: C,
    config: DefenseConfig,
    player: PlayerCombatState,
    scheduler: AttackScheduler,
    defense: DefenseTracker,
    roster: MonsterRoster,
    exercise: ExerciseKind,
    camera_index: u32,
    detection_line: f64,
    detecting: bool,
    defeated: bool,
    last_tick_at: Option<u64>,
    last_quality: Option<f64>,
    frames_received: u64,
    timer: Option<(f64, Option<f64>)>,
}

impl<C: Clock> CombatSession<C> {
    pub fn new(config: DefenseConfig, exercise: ExerciseKind, clock: C) -> Self {
        Self {
            player: PlayerCombatState::from_config(&config),
            scheduler: AttackScheduler::new(&config),
            defense: DefenseTracker::new(&config),
            roster: MonsterRoster::new(config.rep_damage),
            clock,
            config,
            exercise,
            camera_index: 0,
            detection_line: crate::core::constants::DEFAULT_DETECTION_LINE,
            detecting: false,
            defeated: false,
            last_tick_at: None,
            last_quality: None,
            frames_received: 0,
            timer: None,
        }
    }

    /// Camera selector and detection line sent with `start_detection`.
    pub fn with_camera(mut self, camera_index: u32, detection_line: f64) -> Self {
        self.camera_index = camera_index;
        self.detection_line = detection_line;
        self
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn player(&self) -> &PlayerCombatState {
        &self.player
    }

    pub fn scheduler(&self) -> &AttackScheduler {
        &self.scheduler
    }

    pub fn exercise(&self) -> &ExerciseKind {
        &self.exercise
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub fn handle_event(&mut self, event: InboundEvent) -> Vec<CombatEvent> {
        let now = self.now();
        let mut events = Vec::new();

        match event {
            InboundEvent::RepCount { count } => {
                if !self.detecting || self.defeated {
                    return events;
                }
                if let Some(hit) = self.roster.on_rep_count(count) {
                    events.push(CombatEvent::MonsterHit {
                        monster: hit.monster.clone(),
                        damage: hit.damage,
                        absorbed: hit.absorbed,
                    });
                    if hit.defeated {
                        events.push(CombatEvent::MonsterDefeated {
                            monster: hit.monster,
                        });
                    }
                    if hit.level_cleared {
                        log::info!("level {} cleared", self.roster.level());
                        events.push(CombatEvent::LevelCleared {
                            level: self.roster.level(),
                        });
                    }
                }
            }
            // The active exercise picks the shield policy; the sample's own
            // label is not trusted for that.
            InboundEvent::Quality { score, .. } => {
                self.last_quality = score;
                if !self.detecting || self.defeated {
                    return events;
                }
                let transition =
                    self.defense
                        .on_quality_sample(&mut self.player, score, &self.exercise, now);
                events.extend(transition.map(Self::transition_event));
            }
            InboundEvent::VideoFrame { .. } => {
                self.frames_received += 1;
            }
            InboundEvent::TimerUpdate {
                accumulated_secs,
                completed,
                target_secs,
            } => {
                self.timer = Some((accumulated_secs, target_secs));
                if completed {
                    events.push(CombatEvent::ExerciseCompleted { message: None });
                }
            }
            InboundEvent::ExerciseCompleted { message } => {
                events.push(CombatEvent::ExerciseCompleted { message });
            }
            InboundEvent::DetectionStarted { success, message } => {
                if !success {
                    self.halt();
                    events.push(CombatEvent::DetectionRejected {
                        message: message.unwrap_or_else(|| "no reason given".to_string()),
                    });
                }
            }
            InboundEvent::DetectionStopped => {}
            InboundEvent::BackendError { message } => {
                log::warn!("backend error: {}", message);
                events.push(CombatEvent::BackendError { message });
            }
        }

        events
    }

    fn transition_event(transition: DefenseTransition) -> CombatEvent {
        match transition {
            DefenseTransition::Raised => CombatEvent::ShieldRaised,
            DefenseTransition::Lowered => CombatEvent::ShieldLowered,
            DefenseTransition::PulseExpired => CombatEvent::ShieldExpired,
        }
    }

    /// One game-loop step.
    pub fn tick(&mut self) -> Vec<CombatEvent> {
        let now = self.now();
        let elapsed = self
            .last_tick_at
            .map_or(0, |last| now.saturating_sub(last));
        self.last_tick_at = Some(now);

        let mut events = Vec::new();
        if self.defeated {
            return events;
        }

        if let Some(transition) = self.defense.tick(&mut self.player, now) {
            events.push(Self::transition_event(transition));
        }
        let policy = self.exercise.defense_policy();
        self.defense.regenerate(&mut self.player, policy, elapsed);

        for scheduled in self.scheduler.tick(now) {
            match scheduled {
                SchedulerEvent::WarningStarted { attack_number, .. } => {
                    events.push(CombatEvent::WarningStarted {
                        attack_number,
                        warning_ms: self.config.attack_warning_ms,
                    });
                }
                SchedulerEvent::AttackDue { attack_number } => {
                    let resolution = resolve_attack(
                        &self.player,
                        self.config.attack_damage,
                        policy,
                        now,
                        self.config.invulnerability_ms,
                    );
                    let was_defending = self.player.is_defending;
                    self.player = resolution.state;
                    events.push(CombatEvent::AttackResolved {
                        attack_number,
                        outcome: resolution.outcome,
                        absorbed: resolution.absorbed,
                        hp_damage: resolution.hp_damage,
                    });
                    if was_defending && !self.player.is_defending {
                        events.push(CombatEvent::ShieldLowered);
                    }
                    if resolution.outcome == AttackOutcome::Defeated {
                        log::info!("player defeated by attack {}", attack_number);
                        self.defeated = true;
                        self.scheduler.pause();
                        self.defense.reset();
                        events.push(CombatEvent::PlayerDefeated);
                    }
                }
                SchedulerEvent::AttackCycleFinished => {}
            }
        }

        events
    }

    /// Begin detecting `exercise`. Refused while defeated.
    pub fn start_detection(&mut self, exercise: ExerciseKind) -> Option<OutboundCommand> {
        if self.defeated {
            log::debug!("start_detection ignored while defeated");
            return None;
        }
        let now = self.now();
        self.exercise = exercise;
        self.detecting = true;
        self.defense.reset();
        self.player.drop_shield();
        self.player.defense_started_at = None;
        self.roster.reset_rep_baseline();
        self.timer = None;
        self.scheduler.resume(now);
        log::info!("detection started for {}", self.exercise.label());
        Some(OutboundCommand::StartDetection {
            exercise_type: self.exercise.label().to_string(),
            camera_index: self.camera_index,
            detection_line: self.detection_line,
        })
    }

    pub fn stop_detection(&mut self) -> Option<OutboundCommand> {
        if !self.detecting {
            return None;
        }
        self.halt();
        log::info!("detection stopped");
        Some(OutboundCommand::StopDetection)
    }

    /// The link dropped: stop locally, nothing to send.
    pub fn force_stop(&mut self, reason: &str) -> Vec<CombatEvent> {
        let was_detecting = self.detecting;
        self.halt();
        log::warn!("combat stopped: {}", reason);
        if was_detecting {
            vec![CombatEvent::ConnectionLost {
                reason: reason.to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    fn halt(&mut self) {
        self.detecting = false;
        self.scheduler.pause();
        self.defense.reset();
        self.player.drop_shield();
        self.player.defense_started_at = None;
    }

    /// Fresh player, monsters and schedule. Returns the commands the backend
    /// needs to match.
    pub fn reset(&mut self) -> Vec<OutboundCommand> {
        let mut commands = Vec::new();
        if self.detecting {
            commands.push(OutboundCommand::StopDetection);
        }
        commands.push(OutboundCommand::ResetCount);

        self.player = PlayerCombatState::from_config(&self.config);
        self.scheduler.reset();
        self.defense.reset();
        self.roster.reset();
        self.detecting = false;
        self.defeated = false;
        self.last_tick_at = None;
        self.last_quality = None;
        self.timer = None;
        log::info!("combat session reset");
        commands
    }

    /// Move on after a cleared level.
    pub fn advance_level(&mut self) -> Option<CombatEvent> {
        if self.roster.advance_level() {
            Some(CombatEvent::LevelStarted {
                level: self.roster.level(),
            })
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> CombatSnapshot {
        let now = self.now();
        CombatSnapshot {
            player: self.player.clone(),
            phase: self.scheduler.phase(),
            attack_count: self.scheduler.attack_count(),
            warning_remaining_ms: self.scheduler.warning_remaining_ms(now),
            next_attack_in_ms: self.scheduler.next_attack_in_ms(now),
            defense_progress: self.defense.progress(&self.player, now),
            pulse_remaining_ms: self.defense.pulse_remaining_ms(now),
            exercise: self.exercise.clone(),
            detecting: self.detecting,
            defeated: self.defeated,
            level: self.roster.level(),
            monsters: self.roster.monsters().to_vec(),
            level_cleared: self.roster.is_level_cleared(),
            last_quality: self.last_quality,
            frames_received: self.frames_received,
            timer: self.timer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    fn session() -> (CombatSession<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let session = CombatSession::new(
            DefenseConfig::default(),
            ExerciseKind::Squat,
            clock.clone(),
        );
        (session, clock)
    }

    fn quality(score: f64) -> InboundEvent {
        InboundEvent::Quality {
            score: Some(score),
            exercise: None,
        }
    }

    #[test]
    fn test_start_detection_builds_command() {
        let (mut s, _) = session();
        let cmd = s.start_detection(ExerciseKind::BicepCurl);
        assert_eq!(
            cmd,
            Some(OutboundCommand::StartDetection {
                exercise_type: "bicep-curl".to_string(),
                camera_index: 0,
                detection_line: 0.5,
            })
        );
        assert!(s.is_detecting());
        assert!(!s.scheduler().is_paused());
    }

    #[test]
    fn test_quality_ignored_when_not_detecting() {
        let (mut s, clock) = session();
        s.handle_event(quality(5.0));
        clock.advance(2000);
        assert!(s.handle_event(quality(5.0)).is_empty());
        assert!(!s.player().is_defending);
    }

    #[test]
    fn test_sample_label_does_not_pick_policy() {
        let (mut s, clock) = session();
        s.start_detection(ExerciseKind::Squat);
        let swing_labelled = || InboundEvent::Quality {
            score: Some(4.5),
            exercise: Some(ExerciseKind::AlternatingArmSwing),
        };

        // Squat gate applies: no instant pulse shield.
        assert!(s.handle_event(swing_labelled()).is_empty());
        assert!(!s.player().is_defending);
        assert_eq!(s.player().defense_started_at, Some(0));

        let mut raised = false;
        while clock.now_ms() < 1_000 {
            clock.advance(100);
            raised |= s.handle_event(swing_labelled()).contains(&CombatEvent::ShieldRaised);
            s.tick();
        }
        assert!(raised);
        assert!(s.player().is_defending);
        assert!(s.snapshot().pulse_remaining_ms.is_none());
    }

    #[test]
    fn test_held_shield_stays_full_through_attack() {
        let (mut s, clock) = session();
        s.start_detection(ExerciseKind::Squat);
        let mut outcome = None;
        while outcome.is_none() && clock.now_ms() < 40_000 {
            clock.advance(100);
            s.handle_event(quality(4.5));
            for event in s.tick() {
                if let CombatEvent::AttackResolved { outcome: o, .. } = event {
                    outcome = Some(o);
                }
            }
        }
        assert_eq!(outcome, Some(AttackOutcome::Blocked));
        assert_eq!(s.player().shield, s.player().max_shield);
        assert!(s.player().defense_started_at.is_some());
    }

    #[test]
    fn test_reps_damage_monster() {
        let (mut s, _) = session();
        s.start_detection(ExerciseKind::Squat);
        let events = s.handle_event(InboundEvent::RepCount { count: 1 });
        assert_eq!(
            events,
            vec![CombatEvent::MonsterHit {
                monster: "Slime".to_string(),
                damage: 10,
                absorbed: 0
            }]
        );
        assert!(s.handle_event(InboundEvent::RepCount { count: 1 }).is_empty());
    }

    #[test]
    fn test_stop_detection_only_once() {
        let (mut s, _) = session();
        assert!(s.stop_detection().is_none());
        s.start_detection(ExerciseKind::Squat);
        assert_eq!(s.stop_detection(), Some(OutboundCommand::StopDetection));
        assert!(s.stop_detection().is_none());
        assert!(s.scheduler().is_paused());
    }

    #[test]
    fn test_force_stop_reports_lost_link() {
        let (mut s, _) = session();
        s.start_detection(ExerciseKind::Squat);
        let events = s.force_stop("socket closed");
        assert!(matches!(events.as_slice(), [CombatEvent::ConnectionLost { .. }]));
        assert!(!s.is_detecting());
        assert!(s.force_stop("again").is_empty());
    }

    #[test]
    fn test_rejected_detection_halts() {
        let (mut s, _) = session();
        s.start_detection(ExerciseKind::Squat);
        let events = s.handle_event(InboundEvent::DetectionStarted {
            success: false,
            message: Some("camera busy".into()),
        });
        assert!(matches!(events.as_slice(), [CombatEvent::DetectionRejected { .. }]));
        assert!(!s.is_detecting());
    }

    #[test]
    fn test_reset_returns_backend_commands() {
        let (mut s, _) = session();
        s.start_detection(ExerciseKind::Squat);
        s.handle_event(InboundEvent::RepCount { count: 3 });
        assert_eq!(
            s.reset(),
            vec![OutboundCommand::StopDetection, OutboundCommand::ResetCount]
        );
        let snap = s.snapshot();
        assert_eq!(snap.player.hp, 150);
        assert_eq!(snap.attack_count, 0);
        assert_eq!(snap.monsters[0].hp, snap.monsters[0].max_hp);
        assert_eq!(s.reset(), vec![OutboundCommand::ResetCount]);
    }

    #[test]
    fn test_event_messages_are_readable() {
        let warning = CombatEvent::WarningStarted {
            attack_number: 2,
            warning_ms: 8000,
        };
        assert!(warning.message().contains("#2"));
        assert!(warning.message().contains("8s"));
        assert_eq!(CombatEvent::ShieldRaised.message(), "Shield up!");
    }
}
