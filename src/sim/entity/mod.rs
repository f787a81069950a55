//! Entity types and behavior dispatch
//!
//! Hostiles share a common body (id, position, velocity, radius, health) with
//! a kind-specific AI payload. Behavior dispatch is a `match` over the kind;
//! each kind's update mutates only its own body and reads the rest of the
//! world through a snapshot, so no update can observe a half-updated peer.

pub mod assassin;
pub mod defender;
pub mod elite;
pub mod grunt;

use glam::Vec2;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::sim::collision::clamp_to_bounds;
use crate::sim::engine::Bounds;
use crate::sim::movement::Trail;

pub use assassin::AssassinAi;
pub use defender::DefenderAi;
pub use elite::EliteAi;
pub use grunt::GruntAi;

/// Snapshot of a bullet visible to enemy AI
#[derive(Debug, Clone, Copy)]
pub struct BulletInfo {
    pub pos: Vec2,
    pub dir: Vec2,
}

/// Coarse kind tag carried in peer snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    Grunt,
    Assassin,
    Elite,
    Defender,
}

/// Snapshot of a peer hostile visible to enemy AI
#[derive(Debug, Clone, Copy)]
pub struct PeerInfo {
    pub id: u32,
    pub kind: PeerKind,
    pub pos: Vec2,
}

/// Read-only world snapshot handed to every behavior update
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    pub player_pos: Vec2,
    pub player_vel: Vec2,
    pub player_health: f32,
    pub player_score: u32,
    pub bullets: &'a [BulletInfo],
    pub peers: &'a [PeerInfo],
    /// Global speed multiplier applied to hostile base speeds (difficulty,
    /// wave scaling, time-slow)
    pub speed_scale: f32,
    /// Simulation clock, seconds
    pub now: f64,
}

/// Shared mutable header of every hostile
#[derive(Debug, Clone)]
pub struct Body {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
}

impl Body {
    /// Integrate velocity and keep the body inside the arena
    pub fn integrate(&mut self, dt: f32, bounds: &Bounds) {
        self.pos += self.vel * dt;
        self.pos = clamp_to_bounds(self.pos, self.radius, bounds);
    }
}

/// Kind-specific AI payload
#[derive(Debug, Clone)]
pub enum HostileKind {
    Grunt(GruntAi),
    Assassin(AssassinAi),
    Elite(EliteAi),
    Defender(DefenderAi),
}

/// A hostile entity: shared body + kind payload
#[derive(Debug, Clone)]
pub struct Hostile {
    pub body: Body,
    pub kind: HostileKind,
}

impl Hostile {
    pub fn peer_kind(&self) -> PeerKind {
        match self.kind {
            HostileKind::Grunt(_) => PeerKind::Grunt,
            HostileKind::Assassin(_) => PeerKind::Assassin,
            HostileKind::Elite(_) => PeerKind::Elite,
            HostileKind::Defender(_) => PeerKind::Defender,
        }
    }

    /// Apply damage. Elite shields absorb before health; health never goes
    /// below zero. Returns true when the hostile died from this hit.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if let HostileKind::Elite(ai) = &mut self.kind {
            if ai.shield > 0.0 {
                ai.shield = (ai.shield - amount).max(0.0);
                return false;
            }
        }
        self.body.health = (self.body.health - amount).max(0.0);
        self.body.health <= 0.0
    }

    /// One-shot grunt shield: consumes the shield and reports the block when
    /// a bullet comes inside the guard radius while the shield is up.
    pub fn try_block_bullet(&mut self, bullet_pos: Vec2) -> bool {
        if let HostileKind::Grunt(ai) = &mut self.kind {
            if ai.shield_active
                && bullet_pos.distance(self.body.pos) < self.body.radius * 6.0
            {
                ai.shield_active = false;
                ai.has_shield = false;
                return true;
            }
        }
        false
    }

    /// Advance this hostile's behavior by one tick
    pub fn update(&mut self, view: &WorldView, dt: f32, bounds: &Bounds, rng: &mut Pcg32) {
        let Self { body, kind } = self;
        match kind {
            HostileKind::Grunt(ai) => grunt::update(body, ai, view, dt, bounds, rng),
            HostileKind::Assassin(ai) => assassin::update(body, ai, view, dt, bounds),
            HostileKind::Elite(ai) => elite::update(body, ai, view, dt, bounds, rng),
            HostileKind::Defender(ai) => defender::update(body, ai, view, dt, bounds),
        }
    }
}

/// Player trail length
const PLAYER_TRAIL_LEN: usize = 15;

/// The player-controlled agent
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub slow_factor: f32,
    pub auto_aim: bool,
    pub autopilot: bool,
    base_speed: f32,
    trail: Trail,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            shield: 0.0,
            slow_factor: 1.0,
            auto_aim: false,
            autopilot: false,
            base_speed: PLAYER_BASE_SPEED,
            trail: Trail::new(PLAYER_TRAIL_LEN),
        }
    }

    pub fn speed(&self) -> f32 {
        self.base_speed * self.slow_factor
    }

    /// Chase a target point with interpolated velocity
    pub fn update(&mut self, target: Vec2, dt: f32, bounds: &Bounds) {
        let delta = target - self.pos;
        let distance = delta.length();
        if distance > 3.0 {
            let target_vel = (delta / distance) * self.speed();
            self.vel += (target_vel - self.vel) * 0.3;
        } else {
            self.vel *= 0.85;
        }
        self.pos += self.vel * dt;
        self.pos = clamp_to_bounds(self.pos, self.radius, bounds);
        self.trail.record(self.pos);
    }

    /// Crowd-control slow, floored so the player is never fully rooted
    pub fn set_slow_factor(&mut self, factor: f32) {
        self.slow_factor = factor.max(PLAYER_MIN_SLOW_FACTOR);
    }

    /// Shield absorbs before health. Returns true when the player died.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.shield > 0.0 {
            self.shield = (self.shield - amount).max(0.0);
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        self.health <= 0.0
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn shoot_position(&self) -> Vec2 {
        self.pos
    }
}

/// A projectile fired by the player or an orbiter
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub dir: Vec2,
    pub radius: f32,
    pub damage: f32,
    /// Player shots count toward accuracy; orbiter shots do not
    pub from_player: bool,
}

impl Bullet {
    pub fn new(id: u32, pos: Vec2, dir: Vec2, radius: f32, damage: f32) -> Self {
        Self {
            id,
            pos,
            vel: dir * BULLET_SPEED,
            dir,
            radius,
            damage,
            from_player: true,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }
}

/// Short-lived visual burst fragment
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub alpha: f32,
}

impl Particle {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel,
            radius,
            alpha: 1.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.vel *= 0.95;
        self.alpha -= 1.2 * dt;
        self.radius *= 0.98;
    }

    pub fn alive(&self) -> bool {
        self.alpha > 0.0
    }
}

/// Orbiter fire rate (seconds between shots)
const ORBITER_COOLDOWN: f64 = 0.25;
const ORBITER_DISTANCE: f32 = 40.0;
const ORBITER_ANGULAR_SPEED: f32 = 3.0;

/// Allied auto-turret circling the player while aim-assist is active
#[derive(Debug, Clone)]
pub struct Orbiter {
    pub angle: f32,
    pub radius: f32,
    next_shot_at: f64,
}

impl Orbiter {
    pub fn new(initial_angle: f32, player_radius: f32) -> Self {
        Self {
            angle: initial_angle,
            radius: player_radius * 0.5,
            next_shot_at: 0.0,
        }
    }

    pub fn position(&self, player_pos: Vec2) -> Vec2 {
        player_pos + Vec2::new(self.angle.cos(), self.angle.sin()) * ORBITER_DISTANCE
    }

    /// Advance the orbit and fire at the nearest hostile when off cooldown.
    /// Returns the muzzle position and direction of the requested shot.
    pub fn update(
        &mut self,
        dt: f32,
        now: f64,
        player_pos: Vec2,
        hostiles: &[Vec2],
    ) -> Option<(Vec2, Vec2)> {
        self.angle = crate::normalize_angle(self.angle + ORBITER_ANGULAR_SPEED * dt);

        if now < self.next_shot_at || hostiles.is_empty() {
            return None;
        }

        let muzzle = self.position(player_pos);
        let nearest = hostiles.iter().min_by(|a, b| {
            a.distance_squared(muzzle)
                .partial_cmp(&b.distance_squared(muzzle))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        let delta = *nearest - muzzle;
        if delta.length_squared() < 1e-6 {
            return None;
        }
        self.next_shot_at = now + ORBITER_COOLDOWN;
        Some((muzzle, delta.normalize()))
    }
}
