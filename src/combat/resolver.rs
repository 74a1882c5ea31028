//! Monster attack resolution against the player's current defense.

use crate::combat::types::{DefensePolicy, PlayerCombatState};

/// What happened when an attack resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Unlimited shield took the hit without losing points.
    Blocked,
    /// Consumable shield soaked all of the damage.
    Absorbed,
    /// Some damage reached hp.
    Damaged,
    /// hp reached zero on this attack.
    Defeated,
    /// Inside the invulnerability window; nothing applied.
    Suppressed,
    /// Player already defeated.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackResolution {
    pub state: PlayerCombatState,
    pub absorbed: u32,
    pub hp_damage: u32,
    pub outcome: AttackOutcome,
}

impl AttackResolution {
    fn unchanged(state: &PlayerCombatState, outcome: AttackOutcome) -> Self {
        Self {
            state: state.clone(),
            absorbed: 0,
            hp_damage: 0,
            outcome,
        }
    }
}

/// Resolve one attack of `damage` against `state`.
///
/// Pure: the caller decides whether to commit `resolution.state`.
/// Damage that lands (on shield or hp) opens an invulnerability window of
/// `invulnerability_ms` during which later resolutions are suppressed.
pub fn resolve_attack(
    state: &PlayerCombatState,
    damage: u32,
    policy: DefensePolicy,
    now: u64,
    invulnerability_ms: u64,
) -> AttackResolution {
    if !state.is_alive() {
        return AttackResolution::unchanged(state, AttackOutcome::Ignored);
    }
    if let Some(last_hit) = state.last_hit_at {
        if now.saturating_sub(last_hit) < invulnerability_ms {
            return AttackResolution::unchanged(state, AttackOutcome::Suppressed);
        }
    }

    let mut next = state.clone();
    let mut remaining = damage;
    let mut absorbed = 0;

    if next.is_defending && next.shield > 0 {
        match policy {
            DefensePolicy::Unlimited => {
                return AttackResolution {
                    state: next,
                    absorbed: damage,
                    hp_damage: 0,
                    outcome: AttackOutcome::Blocked,
                };
            }
            DefensePolicy::Consumable => {
                absorbed = remaining.min(next.shield);
                next.shield -= absorbed;
                remaining -= absorbed;
                if next.shield == 0 {
                    next.is_defending = false;
                }
            }
        }
    }

    let hp_damage = remaining.min(next.hp);
    next.hp -= hp_damage;
    if absorbed > 0 || hp_damage > 0 {
        next.last_hit_at = Some(now);
    }

    let outcome = if !next.is_alive() {
        AttackOutcome::Defeated
    } else if hp_damage > 0 {
        AttackOutcome::Damaged
    } else {
        AttackOutcome::Absorbed
    };

    AttackResolution {
        state: next,
        absorbed,
        hp_damage,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerCombatState {
        PlayerCombatState::new(150, 50)
    }

    #[test]
    fn test_undefended_attack_hits_hp() {
        let result = resolve_attack(&player(), 25, DefensePolicy::Unlimited, 0, 1000);
        assert_eq!(result.state.hp, 125);
        assert_eq!(result.state.shield, 0);
        assert_eq!(result.hp_damage, 25);
        assert_eq!(result.outcome, AttackOutcome::Damaged);
    }

    #[test]
    fn test_consumable_shield_drains_then_drops() {
        let mut state = player();
        state.raise_shield();

        let first = resolve_attack(&state, 25, DefensePolicy::Consumable, 0, 1000);
        assert_eq!(first.state.shield, 25);
        assert_eq!(first.state.hp, 150);
        assert!(first.state.is_defending);
        assert_eq!(first.outcome, AttackOutcome::Absorbed);

        let second = resolve_attack(&first.state, 25, DefensePolicy::Consumable, 2000, 1000);
        assert_eq!(second.state.shield, 0);
        assert_eq!(second.state.hp, 150);
        assert!(!second.state.is_defending);
        assert_eq!(second.absorbed, 25);
    }

    #[test]
    fn test_consumable_overflow_reaches_hp() {
        let mut state = player();
        state.raise_shield();
        state.shield = 10;

        let result = resolve_attack(&state, 25, DefensePolicy::Consumable, 0, 1000);
        assert_eq!(result.absorbed, 10);
        assert_eq!(result.hp_damage, 15);
        assert_eq!(result.state.hp, 135);
        assert!(!result.state.is_defending);
    }

    #[test]
    fn test_unlimited_shield_is_not_consumed() {
        let mut state = player();
        state.raise_shield();

        let result = resolve_attack(&state, 25, DefensePolicy::Unlimited, 0, 1000);
        assert_eq!(result.state.shield, 50);
        assert_eq!(result.state.hp, 150);
        assert!(result.state.is_defending);
        assert_eq!(result.outcome, AttackOutcome::Blocked);
        assert!(result.state.last_hit_at.is_none());
    }

    #[test]
    fn test_invulnerability_applies_damage_once() {
        let first = resolve_attack(&player(), 20, DefensePolicy::Unlimited, 5000, 1000);
        let second = resolve_attack(&first.state, 20, DefensePolicy::Unlimited, 5999, 1000);
        assert_eq!(second.outcome, AttackOutcome::Suppressed);
        assert_eq!(second.state, first.state);

        let third = resolve_attack(&second.state, 20, DefensePolicy::Unlimited, 6000, 1000);
        assert_eq!(third.state.hp, 110);
    }

    #[test]
    fn test_lethal_hit_clamps_and_defeats() {
        let mut state = player();
        state.hp = 10;
        let result = resolve_attack(&state, 25, DefensePolicy::Unlimited, 0, 1000);
        assert_eq!(result.state.hp, 0);
        assert_eq!(result.hp_damage, 10);
        assert_eq!(result.outcome, AttackOutcome::Defeated);

        let after = resolve_attack(&result.state, 25, DefensePolicy::Unlimited, 10_000, 1000);
        assert_eq!(after.outcome, AttackOutcome::Ignored);
    }
}
