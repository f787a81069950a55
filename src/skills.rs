//! Player skills
//!
//! Five cooldown-gated abilities. The manager tracks readiness on the
//! simulation clock and decides auto-use under autopilot; the engine applies
//! the actual effects.

use serde::{Deserialize, Serialize};

use crate::sim::events::SkillStatus;

/// Situation snapshot used by the auto-use rules
#[derive(Debug, Clone, Copy)]
pub struct SkillContext {
    pub player_health: f32,
    pub enemy_count: usize,
    /// Hostiles within close range of the player
    pub nearby_enemies: usize,
}

/// Skill identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillId {
    Shield,
    TimeSlow,
    Blast,
    Teleport,
    Heal,
}

impl SkillId {
    pub const ALL: [SkillId; 5] = [
        SkillId::Shield,
        SkillId::TimeSlow,
        SkillId::Blast,
        SkillId::Teleport,
        SkillId::Heal,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SkillId::Shield => "shield",
            SkillId::TimeSlow => "time_slow",
            SkillId::Blast => "blast",
            SkillId::Teleport => "teleport",
            SkillId::Heal => "heal",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillId::Shield => "Shield",
            SkillId::TimeSlow => "Time Slow",
            SkillId::Blast => "Blast",
            SkillId::Teleport => "Teleport",
            SkillId::Heal => "Heal",
        }
    }

    /// Cooldown in seconds
    fn cooldown(self) -> f64 {
        match self {
            SkillId::Shield => 15.0,
            SkillId::TimeSlow => 20.0,
            SkillId::Blast => 12.0,
            SkillId::Teleport => 10.0,
            SkillId::Heal => 25.0,
        }
    }

    /// Threshold rules for autopilot use
    fn should_auto_use(self, ctx: &SkillContext) -> bool {
        match self {
            SkillId::Shield => ctx.player_health < 40.0 && ctx.enemy_count > 3,
            SkillId::TimeSlow => ctx.enemy_count > 6 || ctx.player_health < 30.0,
            SkillId::Blast => ctx.nearby_enemies > 4,
            SkillId::Teleport => ctx.player_health < 25.0 && ctx.nearby_enemies > 2,
            SkillId::Heal => ctx.player_health < 50.0,
        }
    }
}

/// Cooldown tracking for every skill
#[derive(Debug)]
pub struct SkillManager {
    last_used: [f64; 5],
}

impl SkillManager {
    pub fn new() -> Self {
        // All skills start ready
        Self {
            last_used: [f64::NEG_INFINITY; 5],
        }
    }

    pub fn is_ready(&self, skill: SkillId, now: f64) -> bool {
        now - self.last_used[skill as usize] >= skill.cooldown()
    }

    /// Try to consume a skill; returns whether it fired
    pub fn use_skill(&mut self, skill: SkillId, now: f64) -> bool {
        if !self.is_ready(skill, now) {
            return false;
        }
        self.last_used[skill as usize] = now;
        true
    }

    /// Fire every ready skill whose auto-use rule matches
    pub fn auto_use(&mut self, ctx: &SkillContext, now: f64) -> Vec<SkillId> {
        let mut used = Vec::new();
        for skill in SkillId::ALL {
            if skill.should_auto_use(ctx) && self.use_skill(skill, now) {
                used.push(skill);
            }
        }
        used
    }

    /// 0.0 right after use, 1.0 once ready again
    pub fn ready_fraction(&self, skill: SkillId, now: f64) -> f32 {
        let elapsed = now - self.last_used[skill as usize];
        (elapsed / skill.cooldown()).clamp(0.0, 1.0) as f32
    }

    pub fn remaining_cooldown(&self, skill: SkillId, now: f64) -> f64 {
        (skill.cooldown() - (now - self.last_used[skill as usize])).max(0.0)
    }

    /// Status list for the cooldown UI event
    pub fn statuses(&self, now: f64) -> Vec<SkillStatus> {
        SkillId::ALL
            .iter()
            .map(|&skill| SkillStatus {
                id: skill.key(),
                name: skill.name(),
                ready_fraction: self.ready_fraction(skill, now),
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.last_used = [f64::NEG_INFINITY; 5];
    }
}

impl Default for SkillManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skills_start_ready() {
        let skills = SkillManager::new();
        for skill in SkillId::ALL {
            assert!(skills.is_ready(skill, 0.0));
            assert_eq!(skills.ready_fraction(skill, 0.0), 1.0);
        }
    }

    #[test]
    fn test_use_starts_cooldown() {
        let mut skills = SkillManager::new();
        assert!(skills.use_skill(SkillId::Teleport, 100.0));
        assert!(!skills.use_skill(SkillId::Teleport, 100.1));
        assert!(skills.remaining_cooldown(SkillId::Teleport, 105.0) > 0.0);
        // Ready again after the 10s cooldown
        assert!(skills.use_skill(SkillId::Teleport, 110.0));
    }

    #[test]
    fn test_ready_fraction_progresses() {
        let mut skills = SkillManager::new();
        skills.use_skill(SkillId::Blast, 0.0);
        assert_eq!(skills.ready_fraction(SkillId::Blast, 0.0), 0.0);
        let halfway = skills.ready_fraction(SkillId::Blast, 6.0);
        assert!((halfway - 0.5).abs() < 1e-6);
        assert_eq!(skills.ready_fraction(SkillId::Blast, 60.0), 1.0);
    }

    #[test]
    fn test_auto_use_rules() {
        let mut skills = SkillManager::new();
        // Desperate situation: low health, big crowd
        let ctx = SkillContext {
            player_health: 20.0,
            enemy_count: 8,
            nearby_enemies: 5,
        };
        let used = skills.auto_use(&ctx, 50.0);
        assert!(used.contains(&SkillId::Shield));
        assert!(used.contains(&SkillId::TimeSlow));
        assert!(used.contains(&SkillId::Blast));
        assert!(used.contains(&SkillId::Teleport));
        assert!(used.contains(&SkillId::Heal));

        // Calm situation: nothing fires even though everything cooled down
        let calm = SkillContext {
            player_health: 100.0,
            enemy_count: 1,
            nearby_enemies: 0,
        };
        assert!(skills.auto_use(&calm, 500.0).is_empty());
    }

    #[test]
    fn test_statuses_cover_all_skills() {
        let skills = SkillManager::new();
        let statuses = skills.statuses(0.0);
        assert_eq!(statuses.len(), SkillId::ALL.len());
        assert!(statuses.iter().any(|s| s.id == "time_slow"));
    }
}
