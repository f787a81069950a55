//! Tactical doctrine: rule-based formation selection
//!
//! Chooses a pack-level posture from population size and player health, then
//! assigns per-entity movement orders. Aggression scales up once the player
//! is badly hurt.

use std::collections::HashMap;

use glam::Vec2;

/// Aggression multiplier once the player drops below the health threshold
const WOUNDED_PLAYER_AGGRESSION: f32 = 1.6;
const WOUNDED_PLAYER_HEALTH: f32 = 40.0;

/// Peer count that triggers a full 360° surround
const SURROUND_THRESHOLD: usize = 8;
/// Peer count that triggers the decoy/flank split
const SPLIT_COUNT: usize = 5;
/// Any peer inside this range triggers a full charge
const CHARGE_RANGE: f32 = 200.0;

const SURROUND_RADIUS: f32 = 250.0;

/// Pack-level posture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationMode {
    Surround,
    Flank,
    Charge,
}

/// Per-entity order kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    MoveToPosition,
    Distract,
    Flank,
    Charge,
}

/// A movement order for one entity
#[derive(Debug, Clone, Copy)]
pub struct TacticOrder {
    pub kind: OrderKind,
    pub target: Vec2,
    pub speed_multiplier: f32,
}

/// Result of a doctrine pass
#[derive(Debug)]
pub struct DoctrineState {
    pub mode: FormationMode,
    pub aggression: f32,
    pub orders: HashMap<u32, TacticOrder>,
}

/// Rule-based formation selector
#[derive(Debug)]
pub struct TacticalDoctrine {
    mode: FormationMode,
    aggression: f32,
}

impl Default for TacticalDoctrine {
    fn default() -> Self {
        Self::new()
    }
}

impl TacticalDoctrine {
    pub fn new() -> Self {
        Self {
            mode: FormationMode::Surround,
            aggression: 1.0,
        }
    }

    pub fn mode(&self) -> FormationMode {
        self.mode
    }

    /// Evaluate the battlefield and produce per-entity orders.
    /// `peers` is every hostile (id, position) eligible for doctrine orders.
    pub fn update(
        &mut self,
        player_pos: Vec2,
        player_health: f32,
        peers: &[(u32, Vec2)],
    ) -> DoctrineState {
        self.aggression = if player_health < WOUNDED_PLAYER_HEALTH {
            WOUNDED_PLAYER_AGGRESSION
        } else {
            1.0
        };

        let mut orders = HashMap::new();

        if peers.len() > SURROUND_THRESHOLD {
            self.mode = FormationMode::Surround;
            self.assign_surround(player_pos, peers, &mut orders);
        } else if peers.len() == SPLIT_COUNT {
            self.mode = FormationMode::Flank;
            self.assign_split(player_pos, peers, &mut orders);
        } else {
            let near: Vec<&(u32, Vec2)> = peers
                .iter()
                .filter(|(_, pos)| pos.distance(player_pos) < CHARGE_RANGE)
                .collect();
            if !near.is_empty() {
                self.mode = FormationMode::Charge;
                for (id, _) in near {
                    orders.insert(
                        *id,
                        TacticOrder {
                            kind: OrderKind::Charge,
                            target: player_pos,
                            speed_multiplier: 1.6 * self.aggression,
                        },
                    );
                }
            }
        }

        DoctrineState {
            mode: self.mode,
            aggression: self.aggression,
            orders,
        }
    }

    /// Even angular spacing on a fixed ring around the player
    fn assign_surround(
        &self,
        player_pos: Vec2,
        peers: &[(u32, Vec2)],
        orders: &mut HashMap<u32, TacticOrder>,
    ) {
        let angle_step = std::f32::consts::TAU / peers.len() as f32;
        for (index, (id, _)) in peers.iter().enumerate() {
            let angle = angle_step * index as f32;
            orders.insert(
                *id,
                TacticOrder {
                    kind: OrderKind::MoveToPosition,
                    target: player_pos
                        + Vec2::new(angle.cos(), angle.sin()) * SURROUND_RADIUS,
                    speed_multiplier: 1.2,
                },
            );
        }
    }

    /// Three decoys fan out in front while two swing behind
    fn assign_split(
        &self,
        player_pos: Vec2,
        peers: &[(u32, Vec2)],
        orders: &mut HashMap<u32, TacticOrder>,
    ) {
        for (index, (id, _)) in peers.iter().enumerate() {
            let order = if index < 3 {
                let angle = (index as f32 - 1.0) * std::f32::consts::FRAC_PI_4;
                TacticOrder {
                    kind: OrderKind::Distract,
                    target: player_pos + Vec2::new(angle.cos(), angle.sin()) * 200.0,
                    speed_multiplier: 0.8,
                }
            } else {
                let angle =
                    std::f32::consts::PI + (index as f32 - 3.0) * std::f32::consts::FRAC_PI_3;
                TacticOrder {
                    kind: OrderKind::Flank,
                    target: player_pos + Vec2::new(angle.cos(), angle.sin()) * 150.0,
                    speed_multiplier: 1.4,
                }
            };
            orders.insert(*id, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(count: usize, center: Vec2, radius: f32) -> Vec<(u32, Vec2)> {
        (0..count)
            .map(|i| {
                let angle = i as f32;
                (
                    i as u32,
                    center + Vec2::new(angle.cos(), angle.sin()) * radius,
                )
            })
            .collect()
    }

    #[test]
    fn test_large_pack_surrounds() {
        let mut doctrine = TacticalDoctrine::new();
        let player = Vec2::new(640.0, 360.0);
        let peers = ring_of(9, player, 500.0);
        let state = doctrine.update(player, 100.0, &peers);
        assert_eq!(state.mode, FormationMode::Surround);
        assert_eq!(state.orders.len(), 9);
        for order in state.orders.values() {
            assert!((order.target.distance(player) - SURROUND_RADIUS).abs() < 1.0);
        }
    }

    #[test]
    fn test_five_peers_split_decoys_and_flankers() {
        let mut doctrine = TacticalDoctrine::new();
        let player = Vec2::new(640.0, 360.0);
        let peers = ring_of(5, player, 500.0);
        let state = doctrine.update(player, 100.0, &peers);
        assert_eq!(state.mode, FormationMode::Flank);
        let distract = state
            .orders
            .values()
            .filter(|o| o.kind == OrderKind::Distract)
            .count();
        let flank = state
            .orders
            .values()
            .filter(|o| o.kind == OrderKind::Flank)
            .count();
        assert_eq!(distract, 3);
        assert_eq!(flank, 2);
    }

    #[test]
    fn test_proximity_triggers_charge() {
        let mut doctrine = TacticalDoctrine::new();
        let player = Vec2::new(640.0, 360.0);
        let peers = vec![(1, player + Vec2::new(100.0, 0.0)), (2, player + Vec2::new(600.0, 0.0))];
        let state = doctrine.update(player, 100.0, &peers);
        assert_eq!(state.mode, FormationMode::Charge);
        // Only the near peer receives a charge order
        assert!(state.orders.contains_key(&1));
        assert!(!state.orders.contains_key(&2));
    }

    #[test]
    fn test_wounded_player_raises_aggression() {
        let mut doctrine = TacticalDoctrine::new();
        let player = Vec2::new(640.0, 360.0);
        let peers = vec![(1, player + Vec2::new(100.0, 0.0))];
        let state = doctrine.update(player, 30.0, &peers);
        assert_eq!(state.aggression, WOUNDED_PLAYER_AGGRESSION);
        let order = state.orders.get(&1).expect("charge order expected");
        assert!((order.speed_multiplier - 1.6 * WOUNDED_PLAYER_AGGRESSION).abs() < 1e-5);
    }
}
