//! Regular enemy behavior
//!
//! A finite-state pattern selector drives movement; the active pattern is
//! re-chosen only when its duration timer elapses, which keeps the unit from
//! thrashing between behaviors frame to frame. On top of the continuous
//! patterns sit two reactive abilities: a cooldown-gated lateral teleport and
//! a one-shot shield.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::sim::engine::Bounds;
use crate::sim::movement::Trail;
use crate::{angular_sector, perpendicular, predict_ahead};

use super::{Body, BulletInfo, WorldView};

const BASE_SPEED: f32 = 260.0;
/// Incoming bullets are considered inside this radius
const DANGER_RADIUS: f32 = 350.0;
/// Teleport distance of the dodge ability
const DODGE_ABILITY_DISTANCE: f32 = 120.0;
const DODGE_ABILITY_COOLDOWN: f64 = 5.0;
/// A threat this close can trigger the dodge ability and the shield
const CLOSE_THREAT_DISTANCE: f32 = 150.0;
const SHIELD_TRIGGER_DISTANCE: f32 = 100.0;
/// Sector count for team coverage analysis
const COVERAGE_SECTORS: usize = 12;
/// Preferred attack ring around the player
const ATTACK_DISTANCE: f32 = 180.0;
/// Seconds of player history used for prediction lookahead
const PREDICT_SECS: f32 = 0.25;

/// Movement pattern states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Dodge,
    Retreat,
    Flank,
    Predict,
    Aggressive,
}

impl Pattern {
    /// How long the pattern runs before re-selection (seconds)
    fn duration(self) -> f32 {
        match self {
            Pattern::Dodge => 0.6,
            Pattern::Retreat => 1.0,
            Pattern::Flank => 1.5,
            Pattern::Predict => 1.8,
            Pattern::Aggressive => 1.2,
        }
    }
}

/// Movement override injected by the command system
#[derive(Debug, Clone, Copy)]
pub struct Directive {
    pub target: Vec2,
    pub speed_multiplier: f32,
}

/// Per-grunt AI state
#[derive(Debug, Clone)]
pub struct GruntAi {
    pub pattern: Pattern,
    pattern_timer: f32,
    player_trail: Trail,
    dodge_dir: Vec2,
    /// Command-system override, refreshed by the engine each tick
    pub directive: Option<Directive>,
    pub has_shield: bool,
    pub shield_active: bool,
    dodge_ability_ready: bool,
    last_dodge_ability_at: f64,
    pub survival_time: f32,
}

impl GruntAi {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::Aggressive,
            pattern_timer: 0.0,
            player_trail: Trail::new(50),
            dodge_dir: Vec2::ZERO,
            directive: None,
            has_shield: true,
            shield_active: false,
            dodge_ability_ready: true,
            last_dodge_ability_at: f64::NEG_INFINITY,
            survival_time: 0.0,
        }
    }
}

impl Default for GruntAi {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the most dangerous incoming bullet: inside the danger radius and
/// heading toward us (positive dot of its direction with the bullet→self
/// vector).
fn incoming_bullet<'a>(body: &Body, bullets: &'a [BulletInfo]) -> Option<&'a BulletInfo> {
    for bullet in bullets {
        let to_self = body.pos - bullet.pos;
        let distance = to_self.length();
        if distance < 1e-3 || distance >= DANGER_RADIUS {
            continue;
        }
        let dot = to_self.dot(bullet.dir) / distance;
        if dot > 0.3 {
            return Some(bullet);
        }
    }
    None
}

/// Pick the flanking side with fewer peers and return the flank position
fn flank_position(body: &Body, view: &WorldView) -> Vec2 {
    let to_player = view.player_pos - body.pos;
    let distance = to_player.length();
    if distance < 1e-3 {
        return view.player_pos;
    }
    let axis = perpendicular(to_player / distance);

    let mut far_side = 0usize;
    for peer in view.peers {
        if peer.id == body.id {
            continue;
        }
        let to_peer = peer.pos - view.player_pos;
        if axis.perp_dot(to_peer) < 0.0 {
            far_side += 1;
        }
    }
    let side = if far_side > view.peers.len() / 2 {
        -1.0
    } else {
        1.0
    };
    view.player_pos + axis * 150.0 * side
}

/// Angle of the least-covered of 12 sectors around the player, so the pack
/// spreads out instead of stacking on one approach lane.
fn team_attack_angle(body: &Body, view: &WorldView) -> f32 {
    let mut coverage = [0u32; COVERAGE_SECTORS];
    for peer in view.peers {
        if peer.id == body.id {
            continue;
        }
        let offset = peer.pos - view.player_pos;
        if offset.length_squared() < 1e-6 {
            continue;
        }
        coverage[angular_sector(offset.y.atan2(offset.x), COVERAGE_SECTORS)] += 1;
    }

    let mut best_sector = 0;
    let mut min_coverage = u32::MAX;
    for (sector, &count) in coverage.iter().enumerate() {
        if count < min_coverage {
            min_coverage = count;
            best_sector = sector;
        }
    }
    (best_sector as f32 + 0.5) * (std::f32::consts::TAU / COVERAGE_SECTORS as f32)
        - std::f32::consts::PI
}

fn select_pattern(body: &Body, view: &WorldView) -> Pattern {
    if incoming_bullet(body, view.bullets).is_some() {
        return Pattern::Dodge;
    }

    let distance = body.pos.distance(view.player_pos);
    if distance < 150.0 {
        return Pattern::Retreat;
    }
    if distance < 350.0 && view.peers.len() > 1 {
        return Pattern::Flank;
    }
    if distance < 400.0 {
        return Pattern::Predict;
    }
    Pattern::Aggressive
}

/// Teleport laterally away from a bullet's line of travel
fn dodge_ability(
    body: &mut Body,
    ai: &mut GruntAi,
    bullet: &BulletInfo,
    view: &WorldView,
    rng: &mut Pcg32,
) {
    let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    body.pos += perpendicular(bullet.dir) * DODGE_ABILITY_DISTANCE * side;
    ai.dodge_ability_ready = false;
    ai.last_dodge_ability_at = view.now;
    log::debug!("grunt {} used dodge ability", body.id);
}

pub(crate) fn update(
    body: &mut Body,
    ai: &mut GruntAi,
    view: &WorldView,
    dt: f32,
    bounds: &Bounds,
    rng: &mut Pcg32,
) {
    ai.player_trail.record(view.player_pos);
    ai.survival_time += dt;

    // Cooldown recovery for the dodge ability
    if !ai.dodge_ability_ready && view.now - ai.last_dodge_ability_at >= DODGE_ABILITY_COOLDOWN {
        ai.dodge_ability_ready = true;
    }

    // Reactive abilities run regardless of the active movement pattern
    if let Some(bullet) = incoming_bullet(body, view.bullets) {
        let distance = body.pos.distance(bullet.pos);
        if ai.dodge_ability_ready && distance < CLOSE_THREAT_DISTANCE {
            dodge_ability(body, ai, bullet, view, rng);
        }
        if ai.has_shield && !ai.shield_active && distance < SHIELD_TRIGGER_DISTANCE {
            ai.shield_active = true;
        }
    }

    // Re-select the pattern only when its timer elapses
    ai.pattern_timer += dt;
    if ai.pattern_timer >= ai.pattern.duration() {
        ai.pattern = select_pattern(body, view);
        ai.pattern_timer = 0.0;
    }

    // A command overrides pattern movement for its duration
    let (target, speed_multiplier) = if let Some(directive) = ai.directive {
        (directive.target, directive.speed_multiplier)
    } else {
        pattern_target(body, ai, view)
    };

    let delta = target - body.pos;
    let distance = delta.length();
    if distance > 5.0 {
        body.vel = (delta / distance) * BASE_SPEED * view.speed_scale * speed_multiplier;
    }
    body.integrate(dt, bounds);
}

fn pattern_target(body: &Body, ai: &mut GruntAi, view: &WorldView) -> (Vec2, f32) {
    match ai.pattern {
        Pattern::Dodge => {
            if let Some(bullet) = incoming_bullet(body, view.bullets) {
                // Perpendicular that also opens distance from the player
                let perp = perpendicular(bullet.dir);
                let to_player = view.player_pos - body.pos;
                let sign = if perp.dot(to_player) > 0.0 { -1.0 } else { 1.0 };
                ai.dodge_dir = perp * sign;
            }
            (body.pos + ai.dodge_dir * 120.0, 2.0)
        }
        Pattern::Retreat => {
            let away = body.pos - view.player_pos;
            let distance = away.length();
            if distance < 1e-3 {
                (body.pos + Vec2::X * 150.0, 1.5)
            } else {
                (body.pos + (away / distance) * 150.0, 1.5)
            }
        }
        Pattern::Flank => (flank_position(body, view), 1.2),
        Pattern::Predict => {
            let vel = ai.player_trail.weighted_velocity(8, 1.0 / 60.0);
            (predict_ahead(view.player_pos, vel, PREDICT_SECS), 1.1)
        }
        Pattern::Aggressive => {
            // Approach through the least-covered sector, biased by prediction
            let angle = team_attack_angle(body, view);
            let ring = view.player_pos + Vec2::new(angle.cos(), angle.sin()) * ATTACK_DISTANCE;
            let vel = ai.player_trail.weighted_velocity(8, 1.0 / 60.0);
            let predicted = predict_ahead(view.player_pos, vel, PREDICT_SECS);
            (ring * 0.6 + predicted * 0.4, 1.1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
    use rand::SeedableRng;

    fn bounds() -> Bounds {
        Bounds {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }

    fn body_at(pos: Vec2) -> Body {
        Body {
            id: 1,
            pos,
            vel: Vec2::ZERO,
            radius: 10.0,
            health: 10.0,
        }
    }

    fn view_with<'a>(
        player_pos: Vec2,
        bullets: &'a [BulletInfo],
        peers: &'a [super::super::PeerInfo],
    ) -> WorldView<'a> {
        WorldView {
            player_pos,
            player_vel: Vec2::ZERO,
            player_health: 100.0,
            player_score: 0,
            bullets,
            peers,
            speed_scale: 1.0,
            now: 10.0,
        }
    }

    #[test]
    fn test_incoming_bullet_requires_approach() {
        let body = body_at(Vec2::new(400.0, 300.0));
        // Bullet heading straight at the grunt
        let toward = [BulletInfo {
            pos: Vec2::new(300.0, 300.0),
            dir: Vec2::X,
        }];
        assert!(incoming_bullet(&body, &toward).is_some());
        // Same spot, heading away
        let away = [BulletInfo {
            pos: Vec2::new(300.0, 300.0),
            dir: -Vec2::X,
        }];
        assert!(incoming_bullet(&body, &away).is_none());
    }

    #[test]
    fn test_dodge_ability_teleports_and_cools_down() {
        let mut body = body_at(Vec2::new(400.0, 300.0));
        let mut ai = GruntAi::new();
        let bullets = [BulletInfo {
            pos: Vec2::new(350.0, 300.0),
            dir: Vec2::X,
        }];
        let view = view_with(Vec2::new(700.0, 300.0), &bullets, &[]);
        let mut rng = Pcg32::seed_from_u64(7);

        let before = body.pos;
        update(&mut body, &mut ai, &view, 1.0 / 60.0, &bounds(), &mut rng);
        // The teleport displaces laterally (perpendicular to +X bullet travel)
        assert!((body.pos.y - before.y).abs() > 60.0);
        assert!(!ai.dodge_ability_ready);
    }

    #[test]
    fn test_pattern_persists_until_timer_elapses() {
        let mut body = body_at(Vec2::new(100.0, 100.0));
        let mut ai = GruntAi::new();
        let view = view_with(Vec2::new(1000.0, 600.0), &[], &[]);
        let mut rng = Pcg32::seed_from_u64(1);

        let first = ai.pattern;
        // Far less than any pattern duration
        update(&mut body, &mut ai, &view, 0.01, &bounds(), &mut rng);
        assert_eq!(ai.pattern, first);
    }

    #[test]
    fn test_retreat_when_player_close() {
        let player = Vec2::new(420.0, 300.0);
        let mut body = body_at(Vec2::new(400.0, 300.0));
        let mut ai = GruntAi::new();
        // Force re-selection
        ai.pattern_timer = 100.0;
        let view = view_with(player, &[], &[]);
        let mut rng = Pcg32::seed_from_u64(2);
        update(&mut body, &mut ai, &view, 1.0 / 60.0, &bounds(), &mut rng);
        assert_eq!(ai.pattern, Pattern::Retreat);
        // Moving away from the player
        assert!(body.vel.x < 0.0);
    }

    #[test]
    fn test_directive_overrides_pattern() {
        let mut body = body_at(Vec2::new(400.0, 300.0));
        let mut ai = GruntAi::new();
        ai.directive = Some(Directive {
            target: Vec2::new(400.0, 600.0),
            speed_multiplier: 1.5,
        });
        let view = view_with(Vec2::new(100.0, 300.0), &[], &[]);
        let mut rng = Pcg32::seed_from_u64(3);
        update(&mut body, &mut ai, &view, 1.0 / 60.0, &bounds(), &mut rng);
        // Heads toward the commanded target, not the player
        assert!(body.vel.y > 0.0);
        assert!((body.vel.length() - BASE_SPEED * 1.5).abs() < 1.0);
    }

    #[test]
    fn test_team_attack_angle_picks_empty_sector() {
        let player = Vec2::new(400.0, 300.0);
        let body = body_at(Vec2::new(700.0, 300.0));
        // Crowd every peer to the east of the player
        let peers: Vec<super::super::PeerInfo> = (0..6)
            .map(|i| super::super::PeerInfo {
                id: 100 + i,
                kind: super::super::PeerKind::Grunt,
                pos: player + Vec2::new(200.0, (i as f32 - 3.0) * 10.0),
            })
            .collect();
        let view = view_with(player, &[], &peers);
        let angle = team_attack_angle(&body, &view);
        // Least covered direction should not point east
        assert!(angle.cos() < 0.9);
    }
}
