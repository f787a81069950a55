//! Player behavior modeling
//!
//! Keeps a bounded ring of recent player positions plus shot counters and
//! derives a movement profile on demand. Analysis always recomputes from the
//! buffer contents, never incrementally, so running it twice over a frozen
//! buffer yields identical results.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::movement::Trail;

/// Ring buffer capacity
const HISTORY_CAPACITY: usize = 300;
/// Analysis is meaningless below this sample count
const MIN_SAMPLES: usize = 50;
/// Tendency analysis looks at this many recent samples
const TENDENCY_WINDOW: usize = 100;
/// Position samples are recorded at simulation cadence
const SAMPLE_DT: f32 = 1.0 / 60.0;
/// Recommendation list cap
const MAX_RECOMMENDATIONS: usize = 8;

/// Movement pattern classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementPattern {
    Aggressive,
    Defensive,
    Balanced,
    Evasive,
}

impl MovementPattern {
    pub fn playstyle(self) -> &'static str {
        match self {
            MovementPattern::Aggressive => "Aggressive - presses the attack",
            MovementPattern::Defensive => "Defensive - holds ground",
            MovementPattern::Evasive => "Evasive - mobile and slippery",
            MovementPattern::Balanced => "Balanced - adapts to the fight",
        }
    }
}

/// Derived behavior statistics, recomputed by `analyze`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorStats {
    /// Average speed in units/sec
    pub avg_speed: f32,
    pub pattern: MovementPattern,
    /// Mean distance from the arena center
    pub preferred_distance: f32,
    /// 0-1
    pub circling_tendency: f32,
    /// 0-1
    pub camping_tendency: f32,
}

impl Default for BehaviorStats {
    fn default() -> Self {
        Self {
            avg_speed: 0.0,
            pattern: MovementPattern::Balanced,
            preferred_distance: 0.0,
            circling_tendency: 0.0,
            camping_tendency: 0.0,
        }
    }
}

/// Templated behavior report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorReport {
    /// Percent, 0-100
    pub accuracy: f32,
    pub pattern: MovementPattern,
    pub playstyle: String,
    pub recommendations: Vec<String>,
}

/// Bounded position history plus shot accounting
#[derive(Debug)]
pub struct PlayerProfile {
    history: Trail,
    stats: BehaviorStats,
    arena_center: Vec2,
    shots_fired: u32,
    shots_hit: u32,
}

impl PlayerProfile {
    pub fn new(arena_center: Vec2) -> Self {
        Self {
            history: Trail::new(HISTORY_CAPACITY),
            stats: BehaviorStats::default(),
            arena_center,
            shots_fired: 0,
            shots_hit: 0,
        }
    }

    pub fn record_position(&mut self, pos: Vec2) {
        self.history.record(pos);
    }

    pub fn record_shot(&mut self, hit: bool) {
        self.shots_fired += 1;
        if hit {
            self.shots_hit += 1;
        }
    }

    /// Upgrade the most recent shot from miss to hit once it connects
    pub fn confirm_hit(&mut self) {
        self.shots_hit = (self.shots_hit + 1).min(self.shots_fired);
    }

    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_hit as f32 / self.shots_fired as f32
        }
    }

    pub fn shots(&self) -> (u32, u32) {
        (self.shots_fired, self.shots_hit)
    }

    pub fn stats(&self) -> BehaviorStats {
        self.stats
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    /// Recompute every derived statistic from the buffer. No-op until enough
    /// samples exist. Idempotent for a frozen buffer.
    pub fn analyze(&mut self) {
        let points = self.history.points();
        if points.len() < MIN_SAMPLES {
            return;
        }

        // Average movement speed over the whole buffer
        let mut total_speed = 0.0;
        for i in 0..points.len() - 1 {
            total_speed += points[i].distance(points[i + 1]) / SAMPLE_DT;
        }
        let avg_speed = total_speed / (points.len() - 1) as f32;

        // Distance-from-center preference
        let preferred_distance = points
            .iter()
            .map(|p| p.distance(self.arena_center))
            .sum::<f32>()
            / points.len() as f32;

        let (circling, camping) = self.movement_tendencies();

        // Classification thresholds operate on units/sec
        let pattern = if camping > 0.7 {
            MovementPattern::Defensive
        } else if avg_speed > 120.0 && circling > 0.5 {
            MovementPattern::Evasive
        } else if avg_speed > 180.0 {
            MovementPattern::Aggressive
        } else {
            MovementPattern::Balanced
        };

        self.stats = BehaviorStats {
            avg_speed,
            pattern,
            preferred_distance,
            circling_tendency: circling,
            camping_tendency: camping,
        };
    }

    /// Circling: low radius variance around the window centroid.
    /// Camping: small maximum drift from the newest sample.
    fn movement_tendencies(&self) -> (f32, f32) {
        let points = self.history.points();
        let recent = &points[..points.len().min(TENDENCY_WINDOW)];
        if recent.len() < 2 {
            return (0.0, 0.0);
        }
        let n = recent.len() as f32;

        let centroid = recent.iter().copied().sum::<Vec2>() / n;
        let radii: Vec<f32> = recent.iter().map(|p| p.distance(centroid)).collect();
        let mean_radius = radii.iter().sum::<f32>() / n;
        let variance = radii.iter().map(|r| (r - mean_radius).abs()).sum::<f32>() / n;
        let circling = if mean_radius > 1.0 && variance < mean_radius * 0.3 {
            0.8
        } else {
            0.0
        };

        let anchor = recent[0];
        let max_drift = recent
            .iter()
            .map(|p| p.distance(anchor))
            .fold(0.0f32, f32::max);
        let camping = if max_drift < 100.0 {
            0.9
        } else if max_drift < 200.0 {
            0.5
        } else {
            0.1
        };

        (circling, camping)
    }

    /// Playstyle label plus a prioritized, capped recommendation list
    pub fn behavior_report(&self) -> BehaviorReport {
        let accuracy = self.accuracy() * 100.0;
        let stats = self.stats;
        let mut recommendations = Vec::new();

        if accuracy < 30.0 {
            recommendations
                .push("Accuracy under 30%: enable aim assist until tracking improves".to_owned());
            recommendations
                .push("Lead moving targets; fire at where they will be, not where they are".to_owned());
        } else if accuracy < 50.0 {
            recommendations
                .push("Accuracy is below half; practice smooth tracking before bursts".to_owned());
        } else if accuracy > 70.0 {
            recommendations.push("Excellent accuracy; keep the precise fire up".to_owned());
        }

        match stats.pattern {
            MovementPattern::Defensive => {
                if stats.camping_tendency > 0.7 {
                    recommendations.push(
                        "Holding one spot invites encirclement; fall back, fire, sidestep".to_owned(),
                    );
                    recommendations
                        .push("Work the arena edges to keep escape lanes open".to_owned());
                } else {
                    recommendations
                        .push("Solid defensive play; good against heavy pressure".to_owned());
                }
            }
            MovementPattern::Aggressive => {
                recommendations
                    .push("Aggressive play: keep an escape skill ready in dense packs".to_owned());
                if accuracy > 60.0 {
                    recommendations
                        .push("Aggression plus precision is the strongest combination".to_owned());
                } else {
                    recommendations
                        .push("Close-range pushes demand focused fire; commit to one target".to_owned());
                }
            }
            MovementPattern::Evasive => {
                recommendations
                    .push("Evasive movement excels in duels against heavy enemies".to_owned());
                recommendations
                    .push("Zigzag plus tight circles maximizes survival under fire".to_owned());
            }
            MovementPattern::Balanced => {}
        }

        if stats.circling_tendency > 0.7 {
            recommendations
                .push("Strong circling; effective against single targets".to_owned());
            recommendations
                .push("Against packs, watch your back while orbiting".to_owned());
        }

        if stats.preferred_distance < 150.0 {
            recommendations
                .push("Close-range style is risky; keep shield and heal ready".to_owned());
        } else if stats.preferred_distance > 300.0 {
            recommendations
                .push("Long-range style is safe, but assassins will close the gap".to_owned());
        }

        recommendations.push("Skill chain worth learning: slow, blast, then shield".to_owned());
        recommendations
            .push("Below 30% health, heal and teleport out immediately".to_owned());

        recommendations.truncate(MAX_RECOMMENDATIONS);

        BehaviorReport {
            accuracy,
            pattern: stats.pattern,
            playstyle: stats.pattern.playstyle().to_owned(),
            recommendations,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.stats = BehaviorStats::default();
        self.shots_fired = 0;
        self.shots_hit = 0;
    }
}
