//! Dynamic difficulty controller
//!
//! Watches combat telemetry and retunes spawn/behavior parameters. The
//! session K/D blends discrete deaths with fractional health loss so the
//! controller reacts before the first actual death. Difficulty always glides
//! toward its target instead of jumping, which keeps spikes invisible.

use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: f32 = 0.3;
pub const MAX_DIFFICULTY: f32 = 3.0;
/// Fraction of the target gap covered per recompute
const ADJUST_SPEED: f32 = 0.1;
/// Recent-death analysis window
const DEATH_HISTORY_WINDOW: usize = 5;

/// Snapshot pushed into the death history on every recorded death
#[derive(Debug, Clone, Copy)]
struct DeathSnapshot {
    kills: u32,
    deaths: u32,
}

/// Cumulative performance counters
#[derive(Debug, Clone, Copy, Default)]
struct Performance {
    kills: u32,
    deaths: u32,
    /// Hit fraction, 0-1
    accuracy: f32,
    health_lost: f32,
    total_damage: f32,
}

/// Templated performance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub kills: u32,
    pub deaths: u32,
    pub kd_ratio: f32,
    /// Percent, 0-100
    pub accuracy: f32,
    pub difficulty: f32,
    pub suggestion: String,
}

/// Feedback-driven difficulty state
#[derive(Debug)]
pub struct DifficultyManager {
    performance: Performance,
    death_history: Vec<DeathSnapshot>,
    current: f32,
}

impl DifficultyManager {
    pub fn new() -> Self {
        Self {
            performance: Performance::default(),
            death_history: Vec::new(),
            current: 1.0,
        }
    }

    pub fn record_kill(&mut self) {
        self.performance.kills += 1;
        self.recompute();
    }

    pub fn record_death(&mut self) {
        self.performance.deaths += 1;
        self.death_history.push(DeathSnapshot {
            kills: self.performance.kills,
            deaths: self.performance.deaths,
        });
        self.recompute();
    }

    pub fn update_accuracy(&mut self, hits: u32, total: u32) {
        if total > 0 {
            self.performance.accuracy = hits as f32 / total as f32;
            self.recompute();
        }
    }

    pub fn record_damage(&mut self, damage: f32) {
        self.performance.total_damage += damage;
    }

    /// Health loss feeds the fractional-death component of the session K/D
    pub fn record_health_loss(&mut self, health_lost: f32) {
        self.performance.health_lost += health_lost;
    }

    /// Session K/D: fractional health loss counts as partial deaths
    pub fn session_kd(&self) -> f32 {
        let effective_deaths =
            self.performance.deaths as f32 + self.performance.health_lost / 100.0;
        if effective_deaths == 0.0 {
            self.performance.kills as f32
        } else {
            self.performance.kills as f32 / effective_deaths
        }
    }

    /// Deaths within the recent history window
    fn recent_deaths(&self) -> u32 {
        let window = self
            .death_history
            .iter()
            .rev()
            .take(DEATH_HISTORY_WINDOW)
            .collect::<Vec<_>>();
        match (window.last(), window.first()) {
            (Some(oldest), Some(newest)) => newest.deaths - oldest.deaths + 1,
            _ => 0,
        }
    }

    /// Derive the target and glide toward it
    fn recompute(&mut self) {
        let kd = self.session_kd();
        let accuracy = self.performance.accuracy;

        // Strong play raises the target; the highest tier is checked first
        let mut target = 1.0;
        if kd > 8.0 {
            target = 2.5;
        } else if kd > 5.0 {
            target = 2.0;
        } else if kd > 3.0 && accuracy > 0.7 {
            target = 1.5;
        }

        // Struggling play overrides upward pressure
        let recent = self.recent_deaths();
        if recent >= 5 {
            target = 0.3;
        } else if recent >= 3 {
            target = 0.5;
        } else if kd < 0.5 {
            target = 0.7;
        }

        self.current += (target - self.current) * ADJUST_SPEED;
        self.current = self.current.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    }

    pub fn difficulty(&self) -> f32 {
        self.current
    }

    /// Enemy count scaled by difficulty
    pub fn recommended_enemy_count(&self, base: usize) -> usize {
        (base as f32 * self.current) as usize
    }

    /// Enemy speed multiplier: 0.92x at the floor up to 2.0x at the ceiling
    pub fn speed_multiplier(&self) -> f32 {
        0.8 + self.current * 0.4
    }

    /// Enemy health multiplier: 0.88x at the floor up to 2.5x at the ceiling
    pub fn health_multiplier(&self) -> f32 {
        0.7 + self.current * 0.6
    }

    /// Deterministic templated report; the suggestion is a threshold lookup
    pub fn performance_report(&self) -> PerformanceReport {
        let suggestion = if self.current < 0.5 {
            "Difficulty lowered. Practice positioning and aim fundamentals."
        } else if self.current > 1.8 {
            "Difficulty is very high. You are playing exceptionally well."
        } else if self.performance.accuracy < 0.5 {
            "Accuracy is low. Consider enabling aim assist."
        } else {
            "Keep up the current pace."
        };

        PerformanceReport {
            kills: self.performance.kills,
            deaths: self.performance.deaths,
            kd_ratio: self.session_kd(),
            accuracy: self.performance.accuracy * 100.0,
            difficulty: self.current,
            suggestion: suggestion.to_owned(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DifficultyManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_at_normal() {
        let manager = DifficultyManager::new();
        assert_eq!(manager.difficulty(), 1.0);
    }

    #[test]
    fn test_kill_streak_raises_difficulty() {
        let mut manager = DifficultyManager::new();
        for _ in 0..10 {
            manager.record_kill();
        }
        // Ten kills, zero deaths: strictly above the 1.0 start, never past max
        assert!(manager.difficulty() > 1.0);
        assert!(manager.difficulty() <= MAX_DIFFICULTY);
    }

    #[test]
    fn test_death_spiral_lowers_difficulty() {
        let mut manager = DifficultyManager::new();
        for _ in 0..5 {
            manager.record_death();
        }
        assert!(manager.difficulty() < 1.0);
        assert!(manager.difficulty() >= MIN_DIFFICULTY);
    }

    #[test]
    fn test_health_loss_counts_as_partial_death() {
        let mut manager = DifficultyManager::new();
        manager.record_kill();
        manager.record_kill();
        manager.record_health_loss(100.0);
        // 2 kills / (0 deaths + 1.0 fractional) = 2.0
        assert!((manager.session_kd() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_difficulty_moves_smoothly() {
        let mut manager = DifficultyManager::new();
        let before = manager.difficulty();
        manager.record_kill();
        let after = manager.difficulty();
        // One recompute covers at most 10% of the gap to any target
        assert!((after - before).abs() <= (MAX_DIFFICULTY - before) * ADJUST_SPEED + 1e-5);
    }

    #[test]
    fn test_multipliers_track_difficulty() {
        let manager = DifficultyManager::new();
        assert!((manager.speed_multiplier() - 1.2).abs() < 1e-5);
        assert!((manager.health_multiplier() - 1.3).abs() < 1e-5);
        assert_eq!(manager.recommended_enemy_count(6), 6);
    }

    #[test]
    fn test_report_suggestion_rules() {
        let mut manager = DifficultyManager::new();
        manager.update_accuracy(1, 10);
        let report = manager.performance_report();
        assert!(report.suggestion.contains("aim assist"));
    }

    proptest! {
        #[test]
        fn prop_difficulty_always_clamped(kills in 0u32..500, deaths in 0u32..500, health in 0.0f32..10_000.0) {
            let mut manager = DifficultyManager::new();
            manager.record_health_loss(health);
            for _ in 0..kills {
                manager.record_kill();
            }
            for _ in 0..deaths {
                manager.record_death();
            }
            prop_assert!(manager.difficulty() >= MIN_DIFFICULTY);
            prop_assert!(manager.difficulty() <= MAX_DIFFICULTY);
        }
    }
}
