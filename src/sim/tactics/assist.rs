//! Player-assist AI
//!
//! Covers the player's weaknesses: support fire when they stop shooting,
//! blind-spot warnings, and a full autopilot steering heuristic when movement
//! is delegated to the AI.

use glam::Vec2;

use crate::sim::engine::Bounds;
use crate::sim::entity::{BulletInfo, PeerInfo};

/// Support fire kicks in after this much player inactivity (seconds)
const IDLE_FIRE_DELAY: f64 = 2.0;
/// Hostiles inside this radius count as attacking the player
const ATTACKER_RANGE: f32 = 150.0;
/// Blind-spot warnings consider hostiles inside this radius
const BLIND_SPOT_RANGE: f32 = 100.0;

/// Assist posture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistMode {
    Normal,
    Burst,
    Cover,
}

/// One assist decision per tick
#[derive(Debug, Clone, Copy)]
pub struct AssistDecision {
    pub should_shoot: bool,
    pub target: Option<Vec2>,
    pub mode: AssistMode,
}

/// Support-fire and autopilot heuristics
#[derive(Debug)]
pub struct PlayerAssist {
    last_player_shot_at: f64,
    mode: AssistMode,
    /// Seconds between support shots, scaled by the current mode
    fire_interval: f64,
}

impl PlayerAssist {
    pub fn new() -> Self {
        Self {
            last_player_shot_at: 0.0,
            mode: AssistMode::Normal,
            fire_interval: 1.0,
        }
    }

    pub fn mode(&self) -> AssistMode {
        self.mode
    }

    pub fn fire_interval(&self) -> f64 {
        self.fire_interval
    }

    pub fn record_player_shot(&mut self, now: f64) {
        self.last_player_shot_at = now;
    }

    /// Evaluate the assist posture and pick a support-fire target
    pub fn update(
        &mut self,
        player_pos: Vec2,
        player_health: f32,
        peers: &[PeerInfo],
        now: f64,
    ) -> AssistDecision {
        // Mode from player condition and population pressure
        if player_health < 20.0 {
            self.mode = AssistMode::Burst;
            self.fire_interval = 0.5;
        } else if peers.len() > 8 {
            self.mode = AssistMode::Burst;
            self.fire_interval = 0.667;
        } else if peers.len() < 3 {
            self.mode = AssistMode::Normal;
            self.fire_interval = 1.43;
        } else {
            self.mode = AssistMode::Normal;
            self.fire_interval = 1.0;
        }

        // Heavily pressured players get cover fire regardless of counts
        let exposure = (peers
            .iter()
            .filter(|p| p.pos.distance(player_pos) < 200.0)
            .count() as f32
            * 0.2)
            .min(1.0);
        if exposure >= 1.0 {
            self.mode = AssistMode::Cover;
        }

        let target = self.select_target(player_pos, peers);
        let idle = now - self.last_player_shot_at > IDLE_FIRE_DELAY;

        AssistDecision {
            should_shoot: idle && target.is_some(),
            target,
            mode: self.mode,
        }
    }

    /// Nearest hostile, preferring anything already pressing the player
    fn select_target(&self, player_pos: Vec2, peers: &[PeerInfo]) -> Option<Vec2> {
        let attacker = peers
            .iter()
            .filter(|p| p.pos.distance(player_pos) < ATTACKER_RANGE)
            .min_by(|a, b| {
                a.pos
                    .distance_squared(player_pos)
                    .partial_cmp(&b.pos.distance_squared(player_pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        if let Some(peer) = attacker {
            return Some(peer.pos);
        }
        peers
            .iter()
            .min_by(|a, b| {
                a.pos
                    .distance_squared(player_pos)
                    .partial_cmp(&b.pos.distance_squared(player_pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|p| p.pos)
    }

    /// Hostiles closing in from behind the player's facing direction
    pub fn blind_spot_threats(
        &self,
        player_pos: Vec2,
        player_vel: Vec2,
        peers: &[PeerInfo],
    ) -> Vec<u32> {
        let facing = if player_vel.length_squared() > 1.0 {
            player_vel.normalize()
        } else {
            Vec2::X
        };
        peers
            .iter()
            .filter(|p| {
                let offset = p.pos - player_pos;
                offset.length() < BLIND_SPOT_RANGE && offset.dot(facing) < 0.0
            })
            .map(|p| p.id)
            .collect()
    }

    /// Autopilot steering: a weighted escape vector away from nearby hostiles
    /// and incoming bullets, biased toward the arena center so the player is
    /// never herded into a corner.
    pub fn autopilot_target(
        &self,
        player_pos: Vec2,
        peers: &[PeerInfo],
        bullets: &[BulletInfo],
        bounds: &Bounds,
    ) -> Vec2 {
        let center = Vec2::new(bounds.width / 2.0, bounds.height / 2.0);
        let mut steering = Vec2::ZERO;

        for peer in peers {
            let away = player_pos - peer.pos;
            let distance = away.length();
            if distance < 1.0 || distance > 300.0 {
                continue;
            }
            // Closer threats push harder
            steering += (away / distance) * (1.0 - distance / 300.0);
        }

        for bullet in bullets {
            let to_player = player_pos - bullet.pos;
            let distance = to_player.length();
            if distance < 1.0 || distance > 250.0 {
                continue;
            }
            // Only bullets actually approaching matter
            if to_player.dot(bullet.dir) / distance > 0.3 {
                let escape = crate::perpendicular(bullet.dir);
                let sign = if escape.dot(to_player) > 0.0 { 1.0 } else { -1.0 };
                steering += escape * sign * 1.5;
            }
        }

        let to_center = center - player_pos;
        if to_center.length() > 100.0 {
            steering += to_center.normalize() * 0.4;
        }

        if steering.length_squared() < 1e-3 {
            // Nothing threatening: drift toward center
            return center;
        }
        player_pos + steering.normalize() * 200.0
    }
}

impl Default for PlayerAssist {
    fn default() -> Self {
        Self::new()
    }
}
