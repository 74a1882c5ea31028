//! Monsters the player fights by doing repetitions.

use crate::core::constants::{LEVEL_HP_STEP, LEVEL_START_SHIELD, MAX_LEVEL, MONSTER_ROSTER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monster {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub shield: u32,
    pub max_shield: u32,
}

impl Monster {
    pub fn new(name: &str, max_hp: u32, shield: u32) -> Self {
        Self {
            name: name.to_string(),
            hp: max_hp,
            max_hp,
            shield,
            max_shield: shield,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Shield soaks first, remainder hits hp. Returns `(absorbed, hp_damage)`.
    pub fn take_damage(&mut self, damage: u32) -> (u32, u32) {
        let absorbed = damage.min(self.shield);
        self.shield -= absorbed;
        let hp_damage = (damage - absorbed).min(self.hp);
        self.hp -= hp_damage;
        (absorbed, hp_damage)
    }
}

/// Result of a repetition-count update that landed on a monster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepHit {
    pub monster: String,
    pub new_reps: u32,
    pub absorbed: u32,
    pub damage: u32,
    pub defeated: bool,
    pub level_cleared: bool,
}

/// Monsters for one level, fought in order.
pub fn level_monsters(level: u32) -> Vec<Monster> {
    let level = level.clamp(1, MAX_LEVEL);
    let count = 2 + level as usize;
    let bonus_hp = LEVEL_HP_STEP * (level - 1);
    let shield = LEVEL_START_SHIELD[(level - 1) as usize];
    MONSTER_ROSTER
        .iter()
        .cycle()
        .take(count)
        .map(|(name, hp)| Monster::new(name, hp + bonus_hp, shield))
        .collect()
}

#[derive(Debug, Clone)]
pub struct MonsterRoster {
    level: u32,
    monsters: Vec<Monster>,
    current: usize,
    last_rep_count: u32,
    rep_damage: u32,
}

impl MonsterRoster {
    pub fn new(rep_damage: u32) -> Self {
        Self {
            level: 1,
            monsters: level_monsters(1),
            current: 0,
            last_rep_count: 0,
            rep_damage,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    /// Monster currently being fought, `None` once the level is cleared.
    pub fn current(&self) -> Option<&Monster> {
        self.monsters.get(self.current)
    }

    pub fn is_level_cleared(&self) -> bool {
        self.current >= self.monsters.len()
    }

    pub fn has_next_level(&self) -> bool {
        self.level < MAX_LEVEL
    }

    /// Apply a repetition count from the backend. Counts that do not
    /// increase are ignored.
    pub fn on_rep_count(&mut self, count: u32) -> Option<RepHit> {
        if count <= self.last_rep_count {
            return None;
        }
        let new_reps = count - self.last_rep_count;
        self.last_rep_count = count;

        let index = self.current;
        let monster = self.monsters.get_mut(index)?;
        let (absorbed, damage) = monster.take_damage(new_reps.saturating_mul(self.rep_damage));
        let defeated = !monster.is_alive();
        let name = monster.name.clone();
        if defeated {
            self.current += 1;
        }

        Some(RepHit {
            monster: name,
            new_reps,
            absorbed,
            damage,
            defeated,
            level_cleared: self.is_level_cleared(),
        })
    }

    /// Count restarts from zero after the backend counter is reset.
    pub fn reset_rep_baseline(&mut self) {
        self.last_rep_count = 0;
    }

    /// Move to the next level. Returns false at the last level or if the
    /// current one is not cleared.
    pub fn advance_level(&mut self) -> bool {
        if !self.is_level_cleared() || !self.has_next_level() {
            return false;
        }
        self.level += 1;
        self.monsters = level_monsters(self.level);
        self.current = 0;
        self.last_rep_count = 0;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.rep_damage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_layout() {
        let one = level_monsters(1);
        let names: Vec<_> = one.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Slime", "Goblin", "Orc"]);
        assert_eq!(one[0].shield, 0);

        let three = level_monsters(3);
        assert_eq!(three.len(), 5);
        assert_eq!(three[3].name, "Slime");
        assert_eq!(three[3].max_hp, 200);
        assert_eq!(three[0].shield, 40);
    }

    #[test]
    fn test_non_increasing_counts_are_ignored() {
        let mut roster = MonsterRoster::new(10);
        assert!(roster.on_rep_count(0).is_none());
        let hit = roster.on_rep_count(2).expect("hit");
        assert_eq!(hit.damage, 20);
        assert!(roster.on_rep_count(2).is_none());
        assert!(roster.on_rep_count(1).is_none());
        assert_eq!(roster.current().map(|m| m.hp), Some(80));
    }

    #[test]
    fn test_shield_absorbs_before_hp() {
        let mut monster = Monster::new("Orc", 100, 15);
        assert_eq!(monster.take_damage(10), (10, 0));
        assert_eq!(monster.take_damage(10), (5, 5));
        assert_eq!(monster.hp, 95);
    }

    #[test]
    fn test_clearing_level_and_advancing() {
        let mut roster = MonsterRoster::new(1000);
        assert!(!roster.advance_level());
        roster.on_rep_count(1);
        roster.on_rep_count(2);
        let hit = roster.on_rep_count(3).expect("hit");
        assert!(hit.defeated);
        assert!(hit.level_cleared);
        assert!(roster.current().is_none());
        assert!(roster.on_rep_count(4).is_none());

        assert!(roster.advance_level());
        assert_eq!(roster.level(), 2);
        assert_eq!(roster.monsters().len(), 4);
        assert!(roster.on_rep_count(1).is_some());
    }

    #[test]
    fn test_last_level_does_not_advance() {
        let mut roster = MonsterRoster::new(10_000);
        for level in 1..MAX_LEVEL {
            for rep in 1..=(2 + level) {
                roster.on_rep_count(rep);
            }
            assert!(roster.advance_level());
        }
        for rep in 1..=(2 + MAX_LEVEL) {
            roster.on_rep_count(rep);
        }
        assert!(roster.is_level_cleared());
        assert!(!roster.advance_level());
        assert_eq!(roster.level(), MAX_LEVEL);
    }
}
