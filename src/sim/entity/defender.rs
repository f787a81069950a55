//! Crowd-control defender behavior
//!
//! Defenders never attack. They lock onto the player inside a wide detection
//! radius and apply a flat speed debuff while locked; several simultaneous
//! locks stack additively, capped by the engine at 100%.

use glam::Vec2;

use crate::sim::engine::Bounds;

use super::{Body, WorldView};

const BASE_SPEED: f32 = 220.0;
const ORBIT_RADIUS: f32 = 400.0;
const ORBIT_ANGULAR_SPEED: f32 = 0.8;
const LOCK_RADIUS: f32 = 700.0;
/// Seconds for lock strength to ramp from 0 to full
const LOCK_RAMP_SECS: f32 = 10.0;
const LOCK_DECAY_SECS: f32 = 5.0;

pub const DEFENDER_HEALTH: f32 = 30.0;
/// Speed debuff contributed per locked defender
pub const SLOW_PER_LOCK: f32 = 0.5;

/// Per-defender AI state
#[derive(Debug, Clone)]
pub struct DefenderAi {
    orbit_angle: f32,
    pub is_locked: bool,
    /// 0-1, grows while locked and decays otherwise
    pub lock_strength: f32,
}

impl DefenderAi {
    pub fn new(initial_angle: f32) -> Self {
        Self {
            orbit_angle: initial_angle,
            is_locked: false,
            lock_strength: 0.0,
        }
    }

    /// Flat slow contribution while locked
    pub fn slow_contribution(&self) -> f32 {
        if self.is_locked { SLOW_PER_LOCK } else { 0.0 }
    }
}

pub(crate) fn update(body: &mut Body, ai: &mut DefenderAi, view: &WorldView, dt: f32, bounds: &Bounds) {
    let distance = body.pos.distance(view.player_pos);
    ai.is_locked = distance <= LOCK_RADIUS;
    if ai.is_locked {
        ai.lock_strength = (ai.lock_strength + dt / LOCK_RAMP_SECS).min(1.0);
    } else {
        ai.lock_strength = (ai.lock_strength - dt / LOCK_DECAY_SECS).max(0.0);
    }

    // Orbit the player at a fixed radius
    ai.orbit_angle += ORBIT_ANGULAR_SPEED * dt;
    let target = view.player_pos
        + Vec2::new(ai.orbit_angle.cos(), ai.orbit_angle.sin()) * ORBIT_RADIUS;

    let delta = target - body.pos;
    let target_distance = delta.length();
    if target_distance > 5.0 {
        body.vel = (delta / target_distance) * BASE_SPEED * view.speed_scale;
    } else {
        body.vel = Vec2::ZERO;
    }
    body.integrate(dt, bounds);
}
