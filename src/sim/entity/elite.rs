//! Elite (boss) behavior
//!
//! The most elaborate unit. It classifies the player's recent motion and
//! predicts accordingly, runs a multi-frame bullet-trajectory lookahead to
//! pick dodge directions, and switches between aggression strategies based on
//! its own condition. When two or more elites are alive the engine places all
//! but one of them into a rotating shielded formation; the formation fields
//! here are written wholesale by `Engine::update_formation_and_control`.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::sim::engine::Bounds;
use crate::sim::movement::Trail;
use crate::{normalize_angle, perpendicular};

use super::{Body, BulletInfo, WorldView};

const BASE_SPEED: f32 = 300.0;
pub const MAX_HEALTH: f32 = 10.0;
pub const MAX_SHIELD: f32 = 100.0;

/// Formation ring around the player
pub const FORMATION_RADIUS: f32 = 350.0;
/// Slow angular drift of the formation ring (rad/s)
const FORMATION_DRIFT: f32 = 0.5;
const FORMATION_SPEED_BONUS: f32 = 1.3;

/// Bullet lookahead horizon in 60 Hz frames
const LOOKAHEAD_FRAMES: u32 = 30;
/// Predicted approach closer than this triggers an evasive burst
const DODGE_TRIGGER_DISTANCE: f32 = 60.0;
const DODGE_BURST_SPEED: f32 = 900.0;
const DODGE_DURATION: f32 = 0.3;
/// Jitter injected into the dodge direction to stay unpredictable (radians)
const DODGE_JITTER: f32 = 0.15;

/// Seconds of lookahead used for player prediction
const PREDICT_SECS: f32 = 0.5;
const SAMPLE_DT: f32 = 1.0 / 60.0;

/// Classification of the player's recent motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionClass {
    Stationary,
    Linear,
    Circular,
    Erratic,
}

/// Aggression strategy selected from the elite's own condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Balanced,
    Aggressive,
    Evasive,
}

#[derive(Debug, Clone, Copy)]
struct MotionAnalysis {
    predicted: Vec2,
    confidence: f32,
    class: MotionClass,
}

/// Per-elite AI state
#[derive(Debug, Clone)]
pub struct EliteAi {
    pub shield: f32,
    pub in_formation: bool,
    /// Slot in the formation ring; None while attacking
    pub formation_index: Option<usize>,
    /// Directed control graph among live elites, rebuilt wholesale by the
    /// engine whenever the elite population changes
    pub controlled_by: Option<u32>,
    pub controlled: Vec<u32>,

    pub strategy: Strategy,
    aggressiveness: f32,
    pub dodge_success_count: u32,
    dodging: bool,
    dodge_timer: f32,
    evasion_pattern: u32,
    player_trail: Trail,
    /// Confidence-scaled blend between actual and predicted position
    learning_weight: f32,
    spawned_at: f64,
}

impl EliteAi {
    pub fn new(now: f64) -> Self {
        Self {
            shield: 0.0,
            in_formation: false,
            formation_index: None,
            controlled_by: None,
            controlled: Vec::new(),
            strategy: Strategy::Balanced,
            aggressiveness: 0.85,
            dodge_success_count: 0,
            dodging: false,
            dodge_timer: 0.0,
            evasion_pattern: 0,
            player_trail: Trail::new(120),
            learning_weight: 0.99,
            spawned_at: now,
        }
    }
}

/// Classify the player's motion from recent history and predict ahead.
/// Falls back to the current position with low confidence when the history
/// is too short.
fn analyze_player(ai: &EliteAi, player_pos: Vec2) -> MotionAnalysis {
    let points = ai.player_trail.points();
    if points.len() < 10 {
        return MotionAnalysis {
            predicted: player_pos,
            confidence: 0.3,
            class: MotionClass::Stationary,
        };
    }

    let recent = &points[..points.len().min(30)];
    let mut avg_vel = Vec2::ZERO;
    let mut total_speed = 0.0;
    let mut vel_change = 0.0;
    for i in 0..recent.len() - 1 {
        let vel = (recent[i] - recent[i + 1]) / SAMPLE_DT;
        avg_vel += vel;
        total_speed += vel.length();
        if i > 0 {
            let prev = (recent[i - 1] - recent[i]) / SAMPLE_DT;
            vel_change += (vel.x - prev.x).abs() + (vel.y - prev.y).abs();
        }
    }
    let n = recent.len() as f32;
    avg_vel /= n;
    let avg_speed = total_speed / n;
    let avg_change = vel_change / (n - 1.0);

    let centroid = recent.iter().copied().sum::<Vec2>() / n;

    let (class, confidence) = if avg_speed < 30.0 {
        (MotionClass::Stationary, 0.9)
    } else if avg_change < 60.0 {
        (MotionClass::Linear, 0.85)
    } else if avg_change < 180.0 {
        // Steady turn rate: circular if the radius barely varies
        let radii: Vec<f32> = recent.iter().map(|p| p.distance(centroid)).collect();
        let mean_radius = radii.iter().sum::<f32>() / n;
        let variance = radii.iter().map(|r| (r - mean_radius).abs()).sum::<f32>() / n;
        if mean_radius > 1.0 && variance < mean_radius * 0.3 {
            (MotionClass::Circular, 0.8)
        } else {
            (MotionClass::Erratic, 0.6)
        }
    } else {
        (MotionClass::Erratic, 0.5)
    };

    let predicted = match class {
        MotionClass::Stationary => player_pos,
        MotionClass::Linear => player_pos + avg_vel * PREDICT_SECS,
        MotionClass::Circular => {
            let offset = player_pos - centroid;
            let radius = offset.length();
            if radius < 1.0 {
                player_pos
            } else {
                let angular_vel = avg_speed / radius;
                let angle = offset.y.atan2(offset.x) + angular_vel * PREDICT_SECS;
                centroid + Vec2::new(angle.cos(), angle.sin()) * radius
            }
        }
        MotionClass::Erratic => player_pos + avg_vel * PREDICT_SECS * 0.5,
    };

    MotionAnalysis {
        predicted,
        confidence,
        class,
    }
}

/// Multi-frame trajectory lookahead over every bullet. Returns the dodge
/// direction when any bullet's predicted path comes dangerously close: a
/// weighted blend of the escape perpendicular and the arena center, with a
/// jittered rotation so the dodge never becomes a predictable cycle.
fn plan_dodge(
    body: &Body,
    bullets: &[BulletInfo],
    bounds: &Bounds,
    rng: &mut Pcg32,
) -> Option<Vec2> {
    let center = Vec2::new(bounds.width / 2.0, bounds.height / 2.0);
    let mut best_threat = 0.0f32;
    let mut best_dir: Option<Vec2> = None;

    for bullet in bullets {
        let mut min_distance = f32::MAX;
        let mut min_frame = 1u32;
        for frame in 1..=LOOKAHEAD_FRAMES {
            let t = frame as f32 * SAMPLE_DT;
            let future = bullet.pos + bullet.dir * crate::consts::BULLET_SPEED * t;
            let distance = future.distance(body.pos);
            if distance < min_distance {
                min_distance = distance;
                min_frame = frame;
            }
        }

        if min_distance >= DODGE_TRIGGER_DISTANCE {
            continue;
        }
        let threat = (DODGE_TRIGGER_DISTANCE - min_distance) / min_frame as f32;
        if threat <= best_threat {
            continue;
        }
        best_threat = threat;

        let to_center = center - body.pos;
        let center_dir = if to_center.length_squared() < 1.0 {
            Vec2::ZERO
        } else {
            to_center.normalize()
        };
        let perp = perpendicular(bullet.dir);
        let sign = if perp.dot(center_dir) > 0.0 { 1.0 } else { -1.0 };

        let jitter = rng.random_range(-DODGE_JITTER..DODGE_JITTER);
        let (sin, cos) = jitter.sin_cos();
        let rotated = Vec2::new(
            perp.x * cos - perp.y * sin,
            perp.x * sin + perp.y * cos,
        ) * sign;

        best_dir = Some(rotated * 0.7 + center_dir * 0.3);
    }
    best_dir
}

fn select_strategy(body: &Body, ai: &mut EliteAi, view: &WorldView) {
    let health_ratio = body.health / MAX_HEALTH;
    let distance = body.pos.distance(view.player_pos);

    let (strategy, aggressiveness) = if health_ratio < 0.3 && ai.shield <= 0.0 {
        // Nothing left to protect: all-in
        (Strategy::Aggressive, 1.0)
    } else if distance < 100.0 && view.player_score > 100 {
        (Strategy::Aggressive, 0.95)
    } else if ai.dodge_success_count > 5 && health_ratio > 0.7 {
        (Strategy::Aggressive, 0.9)
    } else if health_ratio < 0.5 {
        (Strategy::Evasive, 0.7)
    } else {
        (Strategy::Balanced, 0.85)
    };
    ai.strategy = strategy;
    ai.aggressiveness = aggressiveness;
}

pub(crate) fn update(
    body: &mut Body,
    ai: &mut EliteAi,
    view: &WorldView,
    dt: f32,
    bounds: &Bounds,
    rng: &mut Pcg32,
) {
    ai.player_trail.record(view.player_pos);
    select_strategy(body, ai, view);

    if ai.dodging {
        ai.dodge_timer += dt;
        if ai.dodge_timer >= DODGE_DURATION {
            ai.dodging = false;
            ai.dodge_timer = 0.0;
        }
    }

    // Evasive burst preempts everything else
    if !ai.dodging {
        if let Some(dodge_dir) = plan_dodge(body, view.bullets, bounds, rng) {
            ai.dodging = true;
            ai.dodge_timer = 0.0;
            ai.evasion_pattern = (ai.evasion_pattern + 1) % 3;
            let burst = match ai.evasion_pattern {
                1 => DODGE_BURST_SPEED * 1.1,
                2 => DODGE_BURST_SPEED * 1.2,
                _ => DODGE_BURST_SPEED,
            };
            let magnitude = dodge_dir.length();
            if magnitude > 1e-3 {
                body.vel = (dodge_dir / magnitude) * burst;
            }
            ai.dodge_success_count += 1;
        }
    }

    if ai.dodging {
        body.integrate(dt, bounds);
        return;
    }

    // Score-adaptive speed: stronger players face faster elites
    let mut speed_multiplier = 1.0 + (view.player_score as f32 / 500.0) * 0.5;
    if view.player_score >= 200 {
        speed_multiplier *= 1.3;
    }
    speed_multiplier *= ai.aggressiveness;

    if ai.in_formation {
        // Hold a rotating slot on the formation ring
        let slot = ai.formation_index.unwrap_or(0);
        let formation_size = view
            .peers
            .iter()
            .filter(|p| p.kind == super::PeerKind::Elite)
            .count()
            .max(1);
        let angle_step = std::f32::consts::TAU / formation_size as f32;
        let angle = normalize_angle(
            angle_step * slot as f32 + (view.now - ai.spawned_at) as f32 * FORMATION_DRIFT,
        );
        let target = view.player_pos + Vec2::new(angle.cos(), angle.sin()) * FORMATION_RADIUS;
        let delta = target - body.pos;
        let distance = delta.length();
        if distance > 10.0 {
            body.vel = (delta / distance)
                * BASE_SPEED
                * view.speed_scale
                * FORMATION_SPEED_BONUS
                * speed_multiplier;
        }
    } else {
        // Attack run toward the confidence-blended prediction
        let analysis = analyze_player(ai, view.player_pos);
        let blend = ai.learning_weight * analysis.confidence;
        let target = view.player_pos.lerp(analysis.predicted, blend);

        // Close bullets still get a cheap perpendicular nudge
        for bullet in view.bullets {
            if bullet.pos.distance(body.pos) < 150.0 {
                body.vel += perpendicular(bullet.dir) * 120.0 * dt;
                ai.dodge_success_count += 1;
            }
        }

        let delta = target - body.pos;
        let distance = delta.length();
        if distance > 5.0 {
            let dir = delta / distance;
            // Zigzag across the approach axis so the run isn't a straight lane
            let zigzag = ((view.now - ai.spawned_at) as f32 * 3.0).sin() * 40.0;
            let weave = perpendicular(dir) * zigzag * 0.08;
            body.vel = (dir * BASE_SPEED * view.speed_scale + weave) * speed_multiplier;
            if ai.strategy == Strategy::Evasive {
                body.vel *= 0.8;
            }
        }
    }

    body.integrate(dt, bounds);
}
