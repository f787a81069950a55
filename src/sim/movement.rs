//! Movement smoothing and trail bookkeeping
//!
//! Shared by several entity kinds: exponential-smoothing interpolation toward
//! a target (avoids teleport-looking motion), cubic easing, and short
//! position trails kept newest-first.

use glam::Vec2;

/// Smoothing factor: fraction of the remaining gap covered per step
const SMOOTHING_FACTOR: f32 = 0.15;

/// Stop moving once this close to the target
const ARRIVE_DISTANCE: f32 = 5.0;

/// Exponential-smoothing position stepper
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    factor: f32,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}

impl Smoother {
    pub fn new() -> Self {
        Self {
            factor: SMOOTHING_FACTOR,
        }
    }

    /// Step `current` toward `target` at `speed` (units/sec), covering only a
    /// smoothed fraction of the step. Returns the unchanged position once
    /// within arrival distance.
    pub fn step(&self, current: Vec2, target: Vec2, speed: f32, dt: f32) -> Vec2 {
        let delta = target - current;
        let distance = delta.length();
        if distance < ARRIVE_DISTANCE {
            return current;
        }
        let step = (delta / distance) * speed * self.factor * dt;
        // Never overshoot
        if step.length() >= distance {
            target
        } else {
            current + step
        }
    }

    /// Smoothly interpolate a velocity toward a target velocity
    pub fn blend_velocity(&self, current: Vec2, target: Vec2) -> Vec2 {
        current + (target - current) * self.factor
    }
}

/// Cubic ease-in-out over progress in [0, 1]
pub fn ease_in_out_cubic(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
    }
}

/// Bounded position history, newest first
#[derive(Debug, Clone)]
pub struct Trail {
    points: Vec<Vec2>,
    capacity: usize,
}

impl Trail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, pos: Vec2) {
        self.points.insert(0, pos);
        if self.points.len() > self.capacity {
            self.points.pop();
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Average velocity over the newest `samples` points, weighted toward the
    /// most recent movement. Returns zero until at least 3 samples exist.
    pub fn weighted_velocity(&self, samples: usize, sample_dt: f32) -> Vec2 {
        if self.points.len() < 3 || sample_dt <= 0.0 {
            return Vec2::ZERO;
        }
        let recent = &self.points[..samples.min(self.points.len())];
        let mut sum = Vec2::ZERO;
        let mut total_weight = 0.0;
        for i in 0..recent.len() - 1 {
            let weight = 1.0 - (i as f32 / recent.len() as f32);
            sum += (recent[i] - recent[i + 1]) * weight;
            total_weight += weight;
        }
        if total_weight <= 0.0 {
            return Vec2::ZERO;
        }
        sum / (total_weight * sample_dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoother_converges_without_overshoot() {
        let smoother = Smoother::new();
        let target = Vec2::new(100.0, 0.0);
        let mut pos = Vec2::ZERO;
        for _ in 0..2000 {
            pos = smoother.step(pos, target, 300.0, 1.0 / 60.0);
            assert!(pos.x <= 100.0);
        }
        assert!(pos.distance(target) < ARRIVE_DISTANCE + 1.0);
    }

    #[test]
    fn test_smoother_holds_at_arrival() {
        let smoother = Smoother::new();
        let near = Vec2::new(99.0, 0.0);
        let stepped = smoother.step(near, Vec2::new(100.0, 0.0), 300.0, 1.0 / 60.0);
        assert_eq!(stepped, near);
    }

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_trail_is_bounded_and_newest_first() {
        let mut trail = Trail::new(3);
        for i in 0..5 {
            trail.record(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.points()[0], Vec2::new(4.0, 0.0));
        assert_eq!(trail.points()[2], Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_weighted_velocity_tracks_motion() {
        let mut trail = Trail::new(10);
        // Constant +X motion, one unit per sample
        for i in 0..8 {
            trail.record(Vec2::new(i as f32, 0.0));
        }
        let vel = trail.weighted_velocity(8, 1.0);
        assert!((vel.x - 1.0).abs() < 1e-4);
        assert!(vel.y.abs() < 1e-6);
    }
}
