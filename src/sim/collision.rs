//! Circle collision helpers
//!
//! Everything in the arena is a circle, so collision detection stays simple:
//! overlap tests plus a knockback direction that tolerates degenerate
//! (zero-distance) geometry.

use glam::Vec2;

use crate::consts::EDGE_PADDING;

use super::engine::Bounds;

/// True when two circles overlap
#[inline]
pub fn circles_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let limit = a_radius + b_radius;
    a_pos.distance_squared(b_pos) < limit * limit
}

/// Bullet cores are smaller than their glow; only the core counts for hits
#[inline]
pub fn bullet_hits(bullet_pos: Vec2, bullet_radius: f32, target_pos: Vec2, target_radius: f32) -> bool {
    circles_overlap(bullet_pos, bullet_radius * 0.6, target_pos, target_radius)
}

/// True when a position has left the arena entirely
#[inline]
pub fn out_of_bounds(pos: Vec2, bounds: &Bounds) -> bool {
    pos.x < 0.0 || pos.x > bounds.width || pos.y < 0.0 || pos.y > bounds.height
}

/// Clamp a position inside the arena, keeping `radius + EDGE_PADDING` of margin
#[inline]
pub fn clamp_to_bounds(pos: Vec2, radius: f32, bounds: &Bounds) -> Vec2 {
    let pad = radius + EDGE_PADDING;
    Vec2::new(
        pos.x.clamp(pad, (bounds.width - pad).max(pad)),
        pos.y.clamp(pad, (bounds.height - pad).max(pad)),
    )
}

/// Direction pushing `target` away from `source`. Falls back to +X when the
/// two coincide so a degenerate overlap never produces NaN.
#[inline]
pub fn knockback_dir(source: Vec2, target: Vec2) -> Vec2 {
    let delta = target - source;
    if delta.length_squared() < 1e-6 {
        Vec2::X
    } else {
        delta.normalize()
    }
}
