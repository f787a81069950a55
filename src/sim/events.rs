//! Outbound event contract
//!
//! The engine never draws, plays audio or persists anything; it reports
//! state deltas through this contract and external collaborators react.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Severity of a structured AI log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// Severity of a coach tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipSeverity {
    Positive,
    Info,
    Warning,
    Critical,
}

/// A short, actionable tactical tip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachTip {
    pub message: String,
    pub severity: TipSeverity,
}

/// Per-skill readiness, exposed for cooldown UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStatus {
    pub id: &'static str,
    pub name: &'static str,
    /// 0.0 = just used, 1.0 = ready
    pub ready_fraction: f32,
}

/// End-of-session totals handed to the persistence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSummary {
    pub kills: u32,
    pub deaths: u32,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub final_score: u32,
}

/// Everything the engine reports outward
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ScoreChanged(u32),
    EnemyDestroyed,
    GameOver,
    AutoAimToggled(bool),
    /// Aggregate crowd-control debuff, 0-100
    SlowDebuffChanged(f32),
    Log {
        /// Simulation clock, seconds since engine creation
        t: f64,
        message: String,
        severity: LogSeverity,
    },
    /// Throttled to ~10 Hz
    PlayerStats {
        speed: f32,
        position: Vec2,
    },
    /// Current lock-on target, or None when nothing is hovered
    LockTarget(Option<Vec2>),
    CoachTip(CoachTip),
    Skills(Vec<SkillStatus>),
    SessionEnded(SessionSummary),
}

/// Receives engine events; implemented by the embedding layer
pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

/// Collects events into a vector. Used by tests and the headless demo.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<EngineEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<F: Fn(&EngineEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}

/// Drops everything. Handy when a caller has no interest in a given update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: EngineEvent) {}
}
