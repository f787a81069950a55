//! Wave management
//!
//! Tracks the wave counter and its difficulty multiplier, scores perimeter
//! spawn points, and enforces the hard population ceiling.

use glam::Vec2;

use crate::sim::engine::Bounds;

/// Hard ceiling on simultaneously-alive hostiles
pub const POPULATION_CEILING: usize = 10;
/// Perimeter spawn point count
const SPAWN_POINTS: usize = 8;
/// A peer inside this radius makes a spawn point less attractive
const CROWD_RADIUS: f32 = 150.0;
/// Score penalty per nearby peer when ranking spawn points
const CROWD_PENALTY: f32 = 100.0;

/// Wave counter, difficulty scaling and spawn placement
#[derive(Debug)]
pub struct WaveManager {
    current_wave: u32,
    in_progress: bool,
    spawned_this_wave: u32,
    spawn_points: Vec<Vec2>,
    max_alive: usize,
}

impl WaveManager {
    pub fn new(bounds: &Bounds) -> Self {
        let margin = 50.0;
        let center = Vec2::new(bounds.width / 2.0, bounds.height / 2.0);
        let radius = bounds.width.min(bounds.height) / 2.0 - margin;
        let spawn_points = (0..SPAWN_POINTS)
            .map(|i| {
                let angle = (i as f32 / SPAWN_POINTS as f32) * std::f32::consts::TAU;
                center + Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        Self {
            current_wave: 1,
            in_progress: false,
            spawned_this_wave: 0,
            spawn_points,
            max_alive: POPULATION_CEILING,
        }
    }

    pub fn current_wave(&self) -> u32 {
        self.current_wave
    }

    pub fn is_wave_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn start_wave(&mut self) {
        self.in_progress = true;
        self.spawned_this_wave = 0;
    }

    pub fn end_wave(&mut self) {
        self.in_progress = false;
        self.current_wave += 1;
    }

    pub fn record_spawn(&mut self) {
        self.spawned_this_wave += 1;
    }

    pub fn spawned_this_wave(&self) -> u32 {
        self.spawned_this_wave
    }

    /// Per-wave difficulty multiplier: +10% per completed wave
    pub fn difficulty_multiplier(&self) -> f32 {
        1.0 + (self.current_wave - 1) as f32 * 0.1
    }

    pub fn can_spawn_more(&self, alive: usize) -> bool {
        alive < self.max_alive
    }

    /// Retain only the `max_alive` entries nearest the coordinate origin.
    /// Ranked by raw distance from the origin, not from the player; see the
    /// design notes before changing this.
    pub fn enforce_population_limit(&self, positions: &[(u32, Vec2)]) -> Vec<u32> {
        if positions.len() <= self.max_alive {
            return positions.iter().map(|(id, _)| *id).collect();
        }
        let mut sorted: Vec<&(u32, Vec2)> = positions.iter().collect();
        sorted.sort_by(|a, b| {
            a.1.length_squared()
                .partial_cmp(&b.1.length_squared())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
            .iter()
            .take(self.max_alive)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Greedy single-pass spawn point selection: far from the player and
    /// sparse in nearby peers wins. Not globally optimal, just good enough.
    pub fn best_spawn_point(&self, player_pos: Vec2, peers: &[Vec2]) -> Vec2 {
        let mut best = self.spawn_points[0];
        let mut best_score = f32::NEG_INFINITY;
        for &point in &self.spawn_points {
            let crowd = peers
                .iter()
                .filter(|p| p.distance(point) < CROWD_RADIUS)
                .count() as f32;
            let score = point.distance(player_pos) - crowd * CROWD_PENALTY;
            if score > best_score {
                best_score = score;
                best = point;
            }
        }
        best
    }

    pub fn reset(&mut self) {
        self.current_wave = 1;
        self.in_progress = false;
        self.spawned_this_wave = 0;
    }
}
