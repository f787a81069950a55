//! Game review
//!
//! Append-only combat event log with a sliding-window critical-moment
//! detector and an end-of-run summary. Pure observer: nothing here ever
//! mutates simulation state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Damage events inside this window count toward "surrounded"
const SURROUNDED_WINDOW: f64 = 3.0;
const SURROUNDED_DAMAGE_COUNT: usize = 3;
/// A kill this soon after a perfect dodge is a counterattack
const COUNTERATTACK_WINDOW: f64 = 2.0;
/// Events within this radius of the latest damage indicate a static player
const STATIC_POSITION_RADIUS: f32 = 50.0;
const STATIC_POSITION_COUNT: usize = 5;
/// Sliding analysis window length
const RECENT_EVENTS: usize = 10;
const MAX_KEY_LESSONS: usize = 5;

/// Combat event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Kill,
    Death,
    DamageTaken,
    NearMiss,
    PerfectDodge,
}

/// One logged combat event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    /// Seconds since the run started
    pub t: f64,
    pub kind: EventKind,
    pub position: Vec2,
    pub details: String,
}

/// Outcome of a critical moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// A detected turning point worth reviewing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalMoment {
    pub t: f64,
    pub situation: String,
    pub player_action: String,
    pub outcome: Outcome,
    pub lesson: String,
}

/// Overall performance tier, from the session K/D
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

/// End-of-run review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub duration: f64,
    pub total_kills: u32,
    pub total_deaths: u32,
    pub critical_moments: Vec<CriticalMoment>,
    pub key_lessons: Vec<String>,
    pub tier: PerformanceTier,
    pub summary: String,
}

/// Append-only event log and critical-moment detector
#[derive(Debug, Default)]
pub struct GameReview {
    events: Vec<GameEvent>,
    moments: Vec<CriticalMoment>,
    started_at: f64,
}

impl GameReview {
    pub fn new(now: f64) -> Self {
        Self {
            events: Vec::new(),
            moments: Vec::new(),
            started_at: now,
        }
    }

    pub fn record(&mut self, now: f64, kind: EventKind, position: Vec2, details: &str) {
        let t = now - self.started_at;
        self.events.push(GameEvent {
            t,
            kind,
            position,
            details: details.to_owned(),
        });
        self.detect_critical_moment(t, kind, position);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Most recent critical moment if it happened within the last 5 seconds
    pub fn recent_critical_moment(&self, now: f64) -> Option<&CriticalMoment> {
        let moment = self.moments.last()?;
        if now - self.started_at - moment.t < 5.0 {
            Some(moment)
        } else {
            None
        }
    }

    fn detect_critical_moment(&mut self, t: f64, kind: EventKind, position: Vec2) {
        let recent: Vec<&GameEvent> = self
            .events
            .iter()
            .rev()
            .take(RECENT_EVENTS)
            .collect();

        // Sustained damage in a short window means the player is surrounded
        let recent_damage = recent
            .iter()
            .filter(|e| e.kind == EventKind::DamageTaken && t - e.t < SURROUNDED_WINDOW)
            .count();
        if recent_damage >= SURROUNDED_DAMAGE_COUNT {
            let died = kind == EventKind::Death;
            self.moments.push(CriticalMoment {
                t,
                situation: "Surrounded by multiple enemies".to_owned(),
                player_action: if died {
                    "Failed to break out".to_owned()
                } else {
                    "Fought back under pressure".to_owned()
                },
                outcome: if died { Outcome::Failure } else { Outcome::Success },
                lesson: "When surrounded, retreat through the weakest point of the ring instead of trading hits."
                    .to_owned(),
            });
        }

        // A kill right after a perfect dodge is the ideal counterattack
        if kind == EventKind::Kill {
            let dodged_recently = recent.iter().any(|e| {
                e.kind == EventKind::PerfectDodge && t - e.t < COUNTERATTACK_WINDOW
            });
            if dodged_recently {
                self.moments.push(CriticalMoment {
                    t,
                    situation: "Counterattack after a perfect dodge".to_owned(),
                    player_action: "Dodged and immediately returned fire".to_owned(),
                    outcome: Outcome::Success,
                    lesson: "Dodge-then-punish is the strongest exchange; keep taking it.".to_owned(),
                });
            }
        }

        // Taking damage while parked in one spot
        if kind == EventKind::DamageTaken {
            let stationary = recent
                .iter()
                .filter(|e| e.position.distance(position) < STATIC_POSITION_RADIUS)
                .count();
            if stationary >= STATIC_POSITION_COUNT {
                self.moments.push(CriticalMoment {
                    t,
                    situation: "Extended time in one position".to_owned(),
                    player_action: "Stayed put under fire".to_owned(),
                    outcome: Outcome::Failure,
                    lesson: "Keep moving; a static player collects focused fire.".to_owned(),
                });
            }
        }
    }

    /// Build the end-of-run review
    pub fn generate_review(&self, now: f64) -> Review {
        let duration = now - self.started_at;
        let total_kills = self
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Kill)
            .count() as u32;
        let total_deaths = self
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Death)
            .count() as u32;

        // Distinct lessons from failures only
        let mut key_lessons: Vec<String> = Vec::new();
        for moment in self.moments.iter().filter(|m| m.outcome == Outcome::Failure) {
            if !key_lessons.contains(&moment.lesson) {
                key_lessons.push(moment.lesson.clone());
            }
        }
        key_lessons.truncate(MAX_KEY_LESSONS);

        let kd = if total_deaths == 0 {
            total_kills as f64
        } else {
            total_kills as f64 / total_deaths as f64
        };
        let tier = if kd >= 5.0 {
            PerformanceTier::Excellent
        } else if kd >= 2.0 {
            PerformanceTier::Good
        } else if kd >= 0.8 {
            PerformanceTier::Average
        } else {
            PerformanceTier::NeedsImprovement
        };

        Review {
            duration,
            total_kills,
            total_deaths,
            critical_moments: self.moments.clone(),
            key_lessons,
            tier,
            summary: self.summary_text(total_kills, total_deaths, duration),
        }
    }

    fn summary_text(&self, kills: u32, deaths: u32, duration: f64) -> String {
        let minutes = duration / 60.0;
        let kd = if deaths == 0 {
            kills as f64
        } else {
            kills as f64 / deaths as f64
        };
        let mut text = format!(
            "Run length: {minutes:.1} min\nKills: {kills} | Deaths: {deaths} | K/D: {kd:.2}\n"
        );

        let failures: Vec<&CriticalMoment> = self
            .moments
            .iter()
            .filter(|m| m.outcome == Outcome::Failure)
            .collect();
        if !failures.is_empty() {
            text.push_str("\nMain mistakes:\n");
            let mut counted: Vec<(String, usize)> = Vec::new();
            for moment in &failures {
                match counted.iter_mut().find(|(s, _)| *s == moment.situation) {
                    Some((_, count)) => *count += 1,
                    None => counted.push((moment.situation.clone(), 1)),
                }
            }
            for (situation, count) in counted {
                text.push_str(&format!("- {situation} (x{count})\n"));
            }
        }

        let successes: Vec<&CriticalMoment> = self
            .moments
            .iter()
            .filter(|m| m.outcome == Outcome::Success)
            .collect();
        if !successes.is_empty() {
            text.push_str("\nHighlights:\n");
            for moment in successes.iter().rev().take(3) {
                text.push_str(&format!("- {}: {}\n", moment.situation, moment.player_action));
            }
        }

        text
    }

    pub fn reset(&mut self, now: f64) {
        self.events.clear();
        self.moments.clear();
        self.started_at = now;
    }
}
