//! Defense activation: turns form-quality samples into shield state.
//!
//! Two gates exist. Most exercises need an unbroken run of qualifying
//! samples lasting `required_defense_ms` before the full shield goes up.
//! The alternating arm swing raises the shield on any single qualifying
//! sample and drops it `pulse_shield_ms` after the latest one.

use crate::combat::types::{DefensePolicy, ExerciseKind, PlayerCombatState};
use crate::core::config::DefenseConfig;
use crate::core::constants::QUALITY_SCORE_MAX;

/// Shield change produced by a sample or a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenseTransition {
    Raised,
    Lowered,
    PulseExpired,
}

#[derive(Debug, Clone)]
pub struct DefenseTracker {
    quality_threshold: f64,
    required_defense_ms: u64,
    pulse_shield_ms: u64,
    shield_regen_rate: f64,
    /// Arm-swing shield drops at this time unless another sample re-arms it.
    pulse_deadline: Option<u64>,
    /// Fractional regen points not yet applied.
    regen_carry: f64,
}

impl DefenseTracker {
    pub fn new(config: &DefenseConfig) -> Self {
        Self {
            quality_threshold: config.quality_threshold,
            required_defense_ms: config.required_defense_ms,
            pulse_shield_ms: config.pulse_shield_ms,
            shield_regen_rate: config.shield_regen_rate,
            pulse_deadline: None,
            regen_carry: 0.0,
        }
    }

    /// True when `score` is a usable reading at or above the threshold.
    /// Missing, non-finite and out-of-range scores never qualify.
    pub fn meets_threshold(&self, score: Option<f64>) -> bool {
        match score {
            Some(s) if s.is_finite() && (0.0..=QUALITY_SCORE_MAX).contains(&s) => {
                s >= self.quality_threshold
            }
            _ => false,
        }
    }

    pub fn on_quality_sample(
        &mut self,
        player: &mut PlayerCombatState,
        score: Option<f64>,
        exercise: &ExerciseKind,
        now: u64,
    ) -> Option<DefenseTransition> {
        let was_defending = player.is_defending;
        let qualifies = self.meets_threshold(score);

        match exercise.defense_policy() {
            DefensePolicy::Consumable => {
                if qualifies {
                    player.raise_shield();
                    self.pulse_deadline = Some(now + self.pulse_shield_ms);
                }
                // A miss leaves a running pulse alone; it expires on its own.
            }
            DefensePolicy::Unlimited => {
                self.pulse_deadline = None;
                if qualifies {
                    let started = *player.defense_started_at.get_or_insert(now);
                    if now.saturating_sub(started) >= self.required_defense_ms {
                        player.raise_shield();
                    } else {
                        player.drop_shield();
                    }
                } else {
                    player.defense_started_at = None;
                    player.drop_shield();
                }
            }
        }

        match (was_defending, player.is_defending) {
            (false, true) => Some(DefenseTransition::Raised),
            (true, false) => Some(DefenseTransition::Lowered),
            _ => None,
        }
    }

    /// Expire the arm-swing pulse shield once its deadline passes.
    pub fn tick(&mut self, player: &mut PlayerCombatState, now: u64) -> Option<DefenseTransition> {
        match self.pulse_deadline {
            Some(deadline) if now >= deadline => {
                self.pulse_deadline = None;
                let was_up = player.is_defending || player.shield > 0;
                player.drop_shield();
                was_up.then_some(DefenseTransition::PulseExpired)
            }
            _ => None,
        }
    }

    /// Top up an unlimited shield that is up but below max.
    ///
    /// `raise_shield` always fills the shield and an unlimited shield never
    /// loses points to an attack, so in normal play this finds nothing to do.
    /// It restores the invariant if anything else leaves the shield short.
    pub fn regenerate(
        &mut self,
        player: &mut PlayerCombatState,
        policy: DefensePolicy,
        elapsed_ms: u64,
    ) {
        if policy != DefensePolicy::Unlimited
            || !player.is_defending
            || player.shield >= player.max_shield
        {
            self.regen_carry = 0.0;
            return;
        }
        self.regen_carry += self.shield_regen_rate * elapsed_ms as f64 / 1000.0;
        let whole = self.regen_carry.floor();
        if whole >= 1.0 {
            self.regen_carry -= whole;
            player.shield = (player.shield + whole as u32).min(player.max_shield);
        }
    }

    /// Progress through the sustained-form gate, 0.0 to 1.0.
    pub fn progress(&self, player: &PlayerCombatState, now: u64) -> f64 {
        if player.is_defending {
            return 1.0;
        }
        match player.defense_started_at {
            Some(started) if self.required_defense_ms > 0 => {
                (now.saturating_sub(started) as f64 / self.required_defense_ms as f64).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Remaining pulse time, if an arm-swing shield is running.
    pub fn pulse_remaining_ms(&self, now: u64) -> Option<u64> {
        self.pulse_deadline.map(|deadline| deadline.saturating_sub(now))
    }

    /// Drop all pending deadlines.
    pub fn reset(&mut self) {
        self.pulse_deadline = None;
        self.regen_carry = 0.0;
    }
}
