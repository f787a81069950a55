//! Fast assassin behavior
//!
//! Alternates a slow orbit around the player with periodic charge bursts at
//! a linearly-extrapolated predicted position. Assassins are fragile (1 HP)
//! and carry a hard lifetime after which the engine despawns and reschedules
//! them.

use glam::Vec2;

use crate::predict_ahead;
use crate::sim::engine::Bounds;
use crate::sim::movement::Trail;

use super::{Body, BulletInfo, WorldView};

const BASE_SPEED: f32 = 180.0;
const ORBIT_RADIUS: f32 = 200.0;
const ORBIT_ANGULAR_SPEED: f32 = 0.5;
/// A charge fires on this cadence even if orbits haven't completed
const CHARGE_INTERVAL: f32 = 5.0;
/// Charges also trigger after this many completed orbits
const ORBITS_BEFORE_CHARGE: u32 = 2;
/// Charge is abandoned once this close to the player
const CHARGE_BREAK_DISTANCE: f32 = 50.0;
const DANGER_RADIUS: f32 = 350.0;
const DODGE_DURATION: f32 = 0.3;
/// Charges aim well ahead of the player's current motion
const CHARGE_PREDICT_SECS: f32 = 1.0;
/// Velocity smoothing factor
const SMOOTHING: f32 = 0.15;

/// Hard lifetime (seconds); the engine despawns expired assassins
pub const MAX_LIFETIME: f32 = 30.0;

/// Per-assassin AI state
#[derive(Debug, Clone)]
pub struct AssassinAi {
    orbit_angle: f32,
    accumulated_angle: f32,
    orbit_count: u32,
    charge_mode: bool,
    charge_timer: f32,
    dodge_angle: f32,
    dodge_timer: f32,
    /// Set when a charge breaks off at close range; drained by the engine
    pub(crate) charge_evaded: bool,
    pub(crate) life_timer: f32,
    player_trail: Trail,
    pub trail: Trail,
}

impl AssassinAi {
    pub fn new(initial_angle: f32) -> Self {
        Self {
            orbit_angle: initial_angle,
            accumulated_angle: 0.0,
            orbit_count: 0,
            charge_mode: false,
            charge_timer: 0.0,
            dodge_angle: 0.0,
            dodge_timer: 0.0,
            charge_evaded: false,
            life_timer: 0.0,
            player_trail: Trail::new(30),
            trail: Trail::new(20),
        }
    }

    /// Lifetime check; expiry at exactly the limit counts as expired
    pub fn is_expired(&self) -> bool {
        self.life_timer >= MAX_LIFETIME
    }

    pub fn is_charging(&self) -> bool {
        self.charge_mode
    }
}

fn incoming_threat(body: &Body, bullets: &[BulletInfo]) -> Option<Vec2> {
    for bullet in bullets {
        let to_self = body.pos - bullet.pos;
        let distance = to_self.length();
        if distance < 1e-3 || distance >= DANGER_RADIUS {
            continue;
        }
        if to_self.dot(bullet.dir) / distance > 0.5 {
            return Some(bullet.dir);
        }
    }
    None
}

pub(crate) fn update(body: &mut Body, ai: &mut AssassinAi, view: &WorldView, dt: f32, bounds: &Bounds) {
    ai.player_trail.record(view.player_pos);
    ai.life_timer += dt;
    ai.charge_timer += dt;

    // Count completed orbits
    if ai.accumulated_angle >= std::f32::consts::TAU {
        ai.orbit_count += 1;
        ai.accumulated_angle = 0.0;
    }
    if ai.orbit_count >= ORBITS_BEFORE_CHARGE && !ai.charge_mode {
        ai.charge_mode = true;
        ai.orbit_count = 0;
    }

    let dodging = ai.dodge_timer > 0.0;
    if dodging {
        ai.dodge_timer -= dt;
    }

    if let Some(bullet_dir) = incoming_threat(body, view.bullets) {
        ai.dodge_angle = (-bullet_dir.x).atan2(bullet_dir.y);
        ai.dodge_timer = DODGE_DURATION;
    }

    if ai.charge_timer >= CHARGE_INTERVAL && !dodging {
        ai.charge_mode = true;
        ai.charge_timer = 0.0;
    }

    let (target, speed_multiplier) = if ai.dodge_timer > 0.0 {
        (
            body.pos + Vec2::new(ai.dodge_angle.cos(), ai.dodge_angle.sin()) * 150.0,
            1.1,
        )
    } else if ai.charge_mode {
        if body.pos.distance(view.player_pos) < CHARGE_BREAK_DISTANCE {
            // Reached the player without landing a hit
            ai.charge_mode = false;
            ai.charge_evaded = true;
        }
        let vel = ai.player_trail.weighted_velocity(5, 1.0 / 60.0);
        (predict_ahead(view.player_pos, vel, CHARGE_PREDICT_SECS), 1.05)
    } else {
        ai.orbit_angle += ORBIT_ANGULAR_SPEED * dt;
        ai.accumulated_angle += ORBIT_ANGULAR_SPEED * dt;
        (
            view.player_pos
                + Vec2::new(ai.orbit_angle.cos(), ai.orbit_angle.sin()) * ORBIT_RADIUS,
            1.0,
        )
    };

    // Smoothed velocity interpolation instead of snapping to the new heading
    let delta = target - body.pos;
    let distance = delta.length();
    if distance > 5.0 {
        let target_vel = (delta / distance) * BASE_SPEED * view.speed_scale * speed_multiplier;
        body.vel += (target_vel - body.vel) * SMOOTHING;
    } else {
        body.vel *= 0.9;
    }
    body.integrate(dt, bounds);
    ai.trail.record(body.pos);
}
