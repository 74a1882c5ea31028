//! Continuous defense mode: survive a fixed amount of valid arm-swing time
//! while a monster attacks on a short fixed interval.

use rand::Rng;

use crate::combat::types::ExerciseKind;
use crate::core::constants::{
    MONSTER_WANDER_INTERVAL_MS, SCORE_BASE, SCORE_HP_WEIGHT, SCORE_PER_ATTACK_SURVIVED,
    SCORE_PER_COMBO, SCORE_PER_VALID_SAMPLE, SCORE_SHIELD_WEIGHT,
};
use crate::defense_mode::types::*;

/// Monster wander area, in arena cells.
pub const ARENA_WIDTH: f64 = 40.0;
pub const ARENA_HEIGHT: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct ContinuousDefenseSession {
    config: ModeConfig,
    difficulty: Difficulty,
    status: ModeStatus,
    hp: u32,
    shield: u32,
    started_at: Option<u64>,
    last_update_at: Option<u64>,
    elapsed_valid_ms: u64,
    is_exercising: bool,
    /// First sample of the current unbroken run of valid samples.
    valid_run_started_at: Option<u64>,
    last_valid_sample_at: Option<u64>,
    exercise_quality: f64,
    last_repair_at: Option<u64>,
    next_attack_at: Option<u64>,
    next_wander_at: Option<u64>,
    attack_count: u32,
    stats: ModeStatistics,
    score: Option<u32>,
    monster_position: (f64, f64),
}

impl ContinuousDefenseSession {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_config(difficulty, difficulty.config())
    }

    pub fn with_config(difficulty: Difficulty, config: ModeConfig) -> Self {
        Self {
            hp: config.max_hp,
            shield: config.max_shield,
            config,
            difficulty,
            status: ModeStatus::NotStarted,
            started_at: None,
            last_update_at: None,
            elapsed_valid_ms: 0,
            is_exercising: false,
            valid_run_started_at: None,
            last_valid_sample_at: None,
            exercise_quality: 0.0,
            last_repair_at: None,
            next_attack_at: None,
            next_wander_at: None,
            attack_count: 0,
            stats: ModeStatistics::default(),
            score: None,
            monster_position: (ARENA_WIDTH / 2.0, ARENA_HEIGHT / 2.0),
        }
    }

    pub fn config(&self) -> &ModeConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn status(&self) -> ModeStatus {
        self.status
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn shield(&self) -> u32 {
        self.shield
    }

    pub fn elapsed_valid_ms(&self) -> u64 {
        self.elapsed_valid_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.config
            .target_duration_ms
            .saturating_sub(self.elapsed_valid_ms)
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn attack_count(&self) -> u32 {
        self.attack_count
    }

    pub fn is_exercising(&self) -> bool {
        self.is_exercising
    }

    pub fn exercise_quality(&self) -> f64 {
        self.exercise_quality
    }

    pub fn statistics(&self) -> &ModeStatistics {
        &self.stats
    }

    /// Final score, set once the run ends.
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    pub fn monster_position(&self) -> (f64, f64) {
        self.monster_position
    }

    /// True while the attack timer is armed.
    pub fn attacks_scheduled(&self) -> bool {
        self.next_attack_at.is_some()
    }

    /// Begin a run. Only valid from `NotStarted`; terminal states need
    /// [`Self::reset`] first.
    pub fn start(&mut self, now: u64) -> Option<ModeEvent> {
        if self.status != ModeStatus::NotStarted {
            log::debug!("continuous mode start ignored in {:?}", self.status);
            return None;
        }
        self.hp = self.config.max_hp;
        self.shield = self.config.max_shield;
        self.status = ModeStatus::Active;
        self.started_at = Some(now);
        self.last_update_at = Some(now);
        self.elapsed_valid_ms = 0;
        self.is_exercising = false;
        self.valid_run_started_at = None;
        self.last_valid_sample_at = None;
        self.last_repair_at = None;
        self.next_attack_at = Some(now + self.config.monster_attack_interval_ms);
        self.next_wander_at = Some(now + MONSTER_WANDER_INTERVAL_MS);
        self.attack_count = 0;
        self.stats = ModeStatistics::default();
        self.score = None;
        log::info!(
            "continuous defense started ({}, target {}ms)",
            self.difficulty,
            self.config.target_duration_ms
        );
        Some(ModeEvent::Started {
            difficulty: self.difficulty,
            target_ms: self.config.target_duration_ms,
        })
    }

    fn is_fresh(&self, now: u64) -> bool {
        self.last_valid_sample_at
            .is_some_and(|at| now.saturating_sub(at) < self.config.staleness_ms)
    }

    pub fn on_motion_sample(&mut self, sample: &MotionSample, now: u64) -> Vec<ModeEvent> {
        let mut events = Vec::new();
        if self.status != ModeStatus::Active {
            return events;
        }
        if sample.exercise != ExerciseKind::AlternatingArmSwing {
            self.is_exercising = false;
            self.valid_run_started_at = None;
            return events;
        }

        let valid = sample.is_correct
            && sample.quality.is_finite()
            && sample.quality >= self.config.quality_threshold;
        if !valid {
            self.is_exercising = false;
            self.valid_run_started_at = None;
            self.stats.current_combo = self.stats.current_combo.saturating_sub(1);
            return events;
        }

        if !self.is_exercising || !self.is_fresh(now) {
            self.valid_run_started_at = Some(now);
        }
        self.is_exercising = true;
        self.last_valid_sample_at = Some(now);
        self.exercise_quality = sample.quality;
        self.stats.exercise_sessions += 1;

        let repair_ready = self
            .last_repair_at
            .map_or(true, |at| now.saturating_sub(at) >= self.config.shield_repair_interval_ms);
        if repair_ready {
            self.last_repair_at = Some(now);
            let amount = (self.config.shield_repair_rate as f64 * (sample.quality / 10.0)
                * self.config.repair_quality_multiplier)
                .floor()
                .max(0.0) as u32;
            let before = self.shield;
            self.shield = (self.shield + amount).min(self.config.max_shield);
            let repaired = self.shield - before;
            if repaired > 0 {
                self.stats.total_shield_repaired += repaired;
                self.stats.current_combo += 1;
                self.stats.max_combo = self.stats.max_combo.max(self.stats.current_combo);
                events.push(ModeEvent::ShieldRepaired {
                    amount: repaired,
                    combo: self.stats.current_combo,
                });
            }
        }
        events
    }

    /// One loop step: accrue valid time, check for the win, fire at most one
    /// attack, check for the loss.
    pub fn tick(&mut self, now: u64) -> Vec<ModeEvent> {
        let mut events = Vec::new();
        if self.status != ModeStatus::Active {
            return events;
        }
        let Some(started) = self.started_at else {
            return events;
        };

        let last_update = self.last_update_at.unwrap_or(started);
        if self.is_exercising && self.is_fresh(now) {
            let from = last_update.max(self.valid_run_started_at.unwrap_or(last_update));
            self.elapsed_valid_ms += now.saturating_sub(from);
            self.elapsed_valid_ms = self.elapsed_valid_ms.min(now.saturating_sub(started));
        }
        self.last_update_at = Some(now);

        if self.elapsed_valid_ms >= self.config.target_duration_ms {
            events.extend(self.finish(ModeStatus::Completed));
            return events;
        }

        if let Some(due) = self.next_attack_at {
            if now >= due {
                events.push(self.monster_attack());
                let interval = self.config.monster_attack_interval_ms;
                let next = due + interval;
                // Fell behind: skip missed attacks rather than bursting them.
                self.next_attack_at = Some(if next <= now { now + interval } else { next });
            }
        }

        if self.hp == 0 {
            events.extend(self.finish(ModeStatus::GameOver));
        }
        events
    }

    fn monster_attack(&mut self) -> ModeEvent {
        self.attack_count += 1;
        let damage = self.config.monster_damage;
        let shield_damage = damage.min(self.shield);
        self.shield -= shield_damage;
        let hp_damage = (damage - shield_damage).min(self.hp);
        self.hp -= hp_damage;
        if hp_damage > 0 {
            self.stats.total_damage_taken += hp_damage;
            self.stats.current_combo = 0;
        }
        self.stats.total_attacks_survived = self.attack_count;
        log::debug!(
            "continuous attack {}: shield -{} hp -{}",
            self.attack_count,
            shield_damage,
            hp_damage
        );
        ModeEvent::MonsterAttack {
            attack_number: self.attack_count,
            shield_damage,
            hp_damage,
        }
    }

    /// Move the monster to a random spot every few seconds.
    pub fn wander<R: Rng>(&mut self, now: u64, rng: &mut R) -> Option<ModeEvent> {
        if self.status != ModeStatus::Active {
            return None;
        }
        let due = self.next_wander_at?;
        if now < due {
            return None;
        }
        self.next_wander_at = Some(now + MONSTER_WANDER_INTERVAL_MS);
        let x = rng.gen_range(0.0..ARENA_WIDTH);
        let y = rng.gen_range(0.0..ARENA_HEIGHT);
        self.monster_position = (x, y);
        Some(ModeEvent::MonsterMoved { x, y })
    }

    /// Enter a terminal state. Every caller (local prediction, authority
    /// snapshot, backend completion message) goes through here; only the
    /// first call tears down and scores.
    pub fn finish(&mut self, outcome: ModeStatus) -> Option<ModeEvent> {
        if self.status != ModeStatus::Active || !outcome.is_terminal() {
            return None;
        }
        self.status = outcome;
        self.next_attack_at = None;
        self.next_wander_at = None;
        self.is_exercising = false;
        let score = self.compute_score();
        self.score = Some(score);
        log::info!("continuous defense ended {:?}, score {}", outcome, score);
        Some(match outcome {
            ModeStatus::Completed => ModeEvent::Completed { score },
            _ => ModeEvent::GameOver { score },
        })
    }

    /// Manual stop: timers torn down, back to `NotStarted`. Stats stay
    /// visible until the next start.
    pub fn stop(&mut self) -> Option<ModeEvent> {
        if self.status != ModeStatus::Active {
            return None;
        }
        self.status = ModeStatus::NotStarted;
        self.next_attack_at = None;
        self.next_wander_at = None;
        self.is_exercising = false;
        log::info!("continuous defense stopped at {}ms", self.elapsed_valid_ms);
        Some(ModeEvent::Stopped {
            elapsed_valid_ms: self.elapsed_valid_ms,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::with_config(self.difficulty, self.config.clone());
    }

    /// Switch difficulty. Only allowed while no run is active.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.status == ModeStatus::Active {
            return false;
        }
        *self = Self::new(difficulty);
        true
    }

    /// Adopt the authority's view of pools and counters (last write wins).
    /// Valid time stays local: the authority only measures wall time.
    pub fn reconcile(&mut self, snapshot: &SessionSnapshot) -> Option<ModeEvent> {
        if self.status != ModeStatus::Active {
            return None;
        }
        let remote = &snapshot.player_state;
        if remote.max_hp > 0 {
            self.hp = remote.hp.min(self.config.max_hp);
        }
        if remote.max_shield > 0 {
            self.shield = remote.shield.min(self.config.max_shield);
        }
        self.attack_count = self.attack_count.max(snapshot.monster_state.attack_count);
        self.stats = snapshot.statistics.clone();

        let game = &snapshot.game_state;
        if game.is_completed {
            self.finish(ModeStatus::Completed)
        } else if game.is_game_over || (remote.max_hp > 0 && self.hp == 0) {
            self.finish(ModeStatus::GameOver)
        } else {
            None
        }
    }

    /// Backend timed-exercise progress. Accumulated seconds only ever move
    /// valid time forward; `completed` ends the run.
    pub fn on_timer_update(
        &mut self,
        accumulated_secs: f64,
        completed: bool,
        now: u64,
    ) -> Option<ModeEvent> {
        if self.status != ModeStatus::Active {
            return None;
        }
        if let Some(started) = self.started_at {
            let reported = (accumulated_secs.max(0.0) * 1000.0) as u64;
            let ceiling = now.saturating_sub(started);
            self.elapsed_valid_ms = self.elapsed_valid_ms.max(reported.min(ceiling));
        }
        if completed || self.elapsed_valid_ms >= self.config.target_duration_ms {
            self.finish(ModeStatus::Completed)
        } else {
            None
        }
    }

    fn compute_score(&self) -> u32 {
        let target = self.config.target_duration_ms.max(1) as f64;
        let completion = (self.elapsed_valid_ms as f64 / target).min(1.0);
        let time_bonus = (SCORE_BASE * completion).floor();
        let hp_bonus = if self.config.max_hp > 0 {
            (self.hp as f64 / self.config.max_hp as f64 * SCORE_HP_WEIGHT).floor()
        } else {
            0.0
        };
        let shield_bonus = if self.config.max_shield > 0 {
            (self.shield as f64 / self.config.max_shield as f64 * SCORE_SHIELD_WEIGHT).floor()
        } else {
            0.0
        };
        let counters = self.stats.max_combo * SCORE_PER_COMBO
            + self.stats.total_attacks_survived * SCORE_PER_ATTACK_SURVIVED
            + self.stats.exercise_sessions * SCORE_PER_VALID_SAMPLE;
        let total = time_bonus + hp_bonus + shield_bonus + counters as f64;
        (total * self.difficulty.score_multiplier()).max(0.0) as u32
    }
}
