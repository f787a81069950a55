//! Combat coordinator façade
//!
//! Composes the assist AI, the tactical doctrine, the movement smoother and
//! the wave manager into one per-tick coordination pass for the engine.

use std::collections::HashMap;

use glam::Vec2;

use crate::sim::engine::Bounds;
use crate::sim::entity::{BulletInfo, PeerInfo};
use crate::sim::movement::Smoother;

use super::assist::{AssistDecision, PlayerAssist};
use super::doctrine::{DoctrineState, TacticalDoctrine};
use super::wave::WaveManager;

/// Wave status snapshot carried in the combat state
#[derive(Debug, Clone, Copy)]
pub struct WaveInfo {
    pub current_wave: u32,
    pub population_ceiling: usize,
    pub alive: usize,
}

/// Result of one coordination pass
#[derive(Debug)]
pub struct CombatState {
    pub assist: AssistDecision,
    pub doctrine: DoctrineState,
    /// Smoothed movement override per entity, from doctrine orders
    pub movements: HashMap<u32, Vec2>,
    pub wave: WaveInfo,
}

/// Top-level tactical façade
#[derive(Debug)]
pub struct CombatCoordinator {
    assist: PlayerAssist,
    doctrine: TacticalDoctrine,
    smoother: Smoother,
    waves: WaveManager,
}

impl CombatCoordinator {
    pub fn new(bounds: &Bounds) -> Self {
        Self {
            assist: PlayerAssist::new(),
            doctrine: TacticalDoctrine::new(),
            smoother: Smoother::new(),
            waves: WaveManager::new(bounds),
        }
    }

    pub fn assist(&mut self) -> &mut PlayerAssist {
        &mut self.assist
    }

    pub fn waves(&mut self) -> &mut WaveManager {
        &mut self.waves
    }

    pub fn waves_ref(&self) -> &WaveManager {
        &self.waves
    }

    /// Run one coordination pass over the full hostile population
    pub fn update(
        &mut self,
        player_pos: Vec2,
        player_health: f32,
        peers: &[PeerInfo],
        dt: f32,
        now: f64,
    ) -> CombatState {
        let assist = self.assist.update(player_pos, player_health, peers, now);

        let doctrine_peers: Vec<(u32, Vec2)> = peers.iter().map(|p| (p.id, p.pos)).collect();
        let doctrine = self.doctrine.update(player_pos, player_health, &doctrine_peers);

        // Enforce the hard ceiling, then smooth doctrine orders into
        // per-entity movement overrides for the survivors
        let kept = self.waves.enforce_population_limit(&doctrine_peers);
        let mut movements = HashMap::new();
        for peer in peers {
            if !kept.contains(&peer.id) {
                continue;
            }
            if let Some(order) = doctrine.orders.get(&peer.id) {
                let smoothed = self.smoother.step(
                    peer.pos,
                    order.target,
                    order.speed_multiplier * 100.0,
                    dt,
                );
                movements.insert(peer.id, smoothed);
            }
        }

        CombatState {
            assist,
            doctrine,
            movements,
            wave: WaveInfo {
                current_wave: self.waves.current_wave(),
                population_ceiling: super::wave::POPULATION_CEILING,
                alive: kept.len(),
            },
        }
    }

    /// Autopilot steering passthrough
    pub fn autopilot_target(
        &self,
        player_pos: Vec2,
        peers: &[PeerInfo],
        bullets: &[BulletInfo],
        bounds: &Bounds,
    ) -> Vec2 {
        self.assist.autopilot_target(player_pos, peers, bullets, bounds)
    }

    pub fn reset(&mut self) {
        self.assist = PlayerAssist::new();
        self.waves.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
    use crate::sim::entity::PeerKind;
    use crate::sim::tactics::wave::POPULATION_CEILING;

    fn bounds() -> Bounds {
        Bounds {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }

    fn ring(count: usize, center: Vec2) -> Vec<PeerInfo> {
        (0..count)
            .map(|i| {
                let angle = i as f32 * 0.7;
                PeerInfo {
                    id: i as u32,
                    kind: PeerKind::Grunt,
                    pos: center + Vec2::new(angle.cos(), angle.sin()) * 400.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_update_reports_wave_info() {
        let mut coordinator = CombatCoordinator::new(&bounds());
        let player = Vec2::new(640.0, 360.0);
        let peers = ring(4, player);
        let state = coordinator.update(player, 100.0, &peers, 1.0 / 60.0, 1.0);
        assert_eq!(state.wave.current_wave, 1);
        assert_eq!(state.wave.alive, 4);
        assert_eq!(state.wave.population_ceiling, POPULATION_CEILING);
    }

    #[test]
    fn test_surround_orders_produce_movements() {
        let mut coordinator = CombatCoordinator::new(&bounds());
        let player = Vec2::new(640.0, 360.0);
        let peers = ring(9, player);
        let state = coordinator.update(player, 100.0, &peers, 1.0 / 60.0, 1.0);
        // Nine peers trigger the surround doctrine; every survivor gets a
        // smoothed movement override
        assert_eq!(state.movements.len(), 9);
    }

    #[test]
    fn test_overflow_population_is_trimmed() {
        let mut coordinator = CombatCoordinator::new(&bounds());
        let player = Vec2::new(640.0, 360.0);
        let peers = ring(POPULATION_CEILING + 4, player);
        let state = coordinator.update(player, 100.0, &peers, 1.0 / 60.0, 1.0);
        assert_eq!(state.wave.alive, POPULATION_CEILING);
    }
}
