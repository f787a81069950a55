//! Tactical advice seam
//!
//! The engine periodically snapshots the game state and asks a provider for
//! a short coach tip. A real provider proxies an external text-advice
//! service; requests are fire-and-forget and the engine polls for whatever
//! has arrived. When nothing has (slow service, failure, or no provider at
//! all), the built-in heuristic coach supplies a deterministic fallback so
//! the tick loop never blocks or goes silent.

use serde::{Deserialize, Serialize};

use crate::sim::events::{CoachTip, TipSeverity};

/// Game state snapshot shipped with an advice request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub health: f32,
    pub enemy_count: usize,
    pub kills: u32,
    pub deaths: u32,
    /// Percent, 0-100
    pub accuracy: f32,
    pub wave: u32,
    pub difficulty_multiplier: f32,
}

/// Asynchronous advice source. `request` must never block; results surface
/// later through `poll`.
pub trait CoachAdviceProvider {
    fn request(&mut self, snapshot: &GameSnapshot);
    fn poll(&mut self) -> Option<CoachTip>;
}

/// Deterministic threshold-rule coach; also the fallback when an external
/// provider has nothing ready.
#[derive(Debug, Default)]
pub struct HeuristicCoach {
    pending: Option<CoachTip>,
}

impl HeuristicCoach {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template lookup by threshold rules; not generative
    pub fn tip_for(snapshot: &GameSnapshot) -> CoachTip {
        if snapshot.health < 30.0 {
            CoachTip {
                message: "Health critical: keep your distance and kill the closest chaser first"
                    .to_owned(),
                severity: TipSeverity::Critical,
            }
        } else if snapshot.enemy_count >= 5 {
            CoachTip {
                message: "Heavy enemy presence: keep moving so the ring never closes".to_owned(),
                severity: TipSeverity::Warning,
            }
        } else if snapshot.deaths > 0
            && snapshot.kills as f32 / snapshot.deaths as f32 > 3.0
        {
            CoachTip {
                message: "Strong run: hold this tempo".to_owned(),
                severity: TipSeverity::Positive,
            }
        } else if snapshot.accuracy < 40.0 {
            CoachTip {
                message: "Accuracy is dropping: try aim assist".to_owned(),
                severity: TipSeverity::Info,
            }
        } else {
            CoachTip {
                message: "Good tactical execution: stay focused".to_owned(),
                severity: TipSeverity::Positive,
            }
        }
    }
}

impl CoachAdviceProvider for HeuristicCoach {
    fn request(&mut self, snapshot: &GameSnapshot) {
        self.pending = Some(Self::tip_for(snapshot));
    }

    fn poll(&mut self) -> Option<CoachTip> {
        self.pending.take()
    }
}
