//! Team coordination: roles, formation geometry, encirclement analysis
//!
//! Assigns abstract combat roles, computes role-scaled formation positions,
//! and measures how completely the pack encircles the player. The analysis
//! feeds reporting and the assist AI; it never moves entities directly.

use std::collections::HashMap;

use glam::Vec2;

use crate::angular_sector;
use crate::sim::entity::{PeerInfo, PeerKind};

/// Angular bins used for encirclement coverage
pub const COVERAGE_SECTORS: usize = 12;
/// Radius at which weak/strong spots are reported
const SPOT_RADIUS: f32 = 250.0;
/// Base formation ring radius, scaled per role
const FORMATION_RADIUS: f32 = 300.0;

/// Abstract combat roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Tank,
    Assassin,
    Flanker,
    Support,
}

impl Role {
    /// Ring-distance multiplier: tanks crowd in, assassins lurk outside
    fn distance_multiplier(self) -> f32 {
        match self {
            Role::Tank => 0.6,
            Role::Assassin => 1.2,
            Role::Flanker => 0.9,
            Role::Support => 1.1,
        }
    }
}

/// Encirclement analysis result
#[derive(Debug, Clone)]
pub struct Encirclement {
    /// Fraction of sectors containing at least one hostile, 0-1
    pub coverage: f32,
    /// Escape directions: centers of empty sectors
    pub weak_spots: Vec<Vec2>,
    /// Centers of sectors holding two or more hostiles
    pub strong_spots: Vec<Vec2>,
}

/// Attack/retreat split from a coordination pass
#[derive(Debug, Default)]
pub struct AttackPlan {
    pub should_attack: Vec<u32>,
    pub should_retreat: Vec<u32>,
}

/// Role assignment and formation geometry
#[derive(Debug, Default)]
pub struct TeamCoordinator {
    roles: HashMap<u32, Role>,
}

impl TeamCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every role from the current population. Elites alternate
    /// tank/support, assassins keep their own role, grunts alternate
    /// flanker/support.
    pub fn assign_roles(&mut self, peers: &[PeerInfo]) {
        self.roles.clear();
        let mut elite_index = 0usize;
        let mut grunt_index = 0usize;
        for peer in peers {
            let role = match peer.kind {
                PeerKind::Elite => {
                    let role = if elite_index % 2 == 0 {
                        Role::Tank
                    } else {
                        Role::Support
                    };
                    elite_index += 1;
                    role
                }
                PeerKind::Assassin => Role::Assassin,
                PeerKind::Grunt | PeerKind::Defender => {
                    let role = if grunt_index % 2 == 0 {
                        Role::Flanker
                    } else {
                        Role::Support
                    };
                    grunt_index += 1;
                    role
                }
            };
            self.roles.insert(peer.id, role);
        }
    }

    pub fn role(&self, id: u32) -> Option<Role> {
        self.roles.get(&id).copied()
    }

    /// Formation targets on a ring around the player, distance scaled by role
    pub fn formation_positions(&self, player_pos: Vec2, peers: &[PeerInfo]) -> HashMap<u32, Vec2> {
        let mut positions = HashMap::new();
        if peers.is_empty() {
            return positions;
        }
        let angle_step = std::f32::consts::TAU / peers.len() as f32;
        for (index, peer) in peers.iter().enumerate() {
            let role = self.role(peer.id).unwrap_or(Role::Support);
            let distance = FORMATION_RADIUS * role.distance_multiplier();
            let angle = angle_step * index as f32;
            positions.insert(
                peer.id,
                player_pos + Vec2::new(angle.cos(), angle.sin()) * distance,
            );
        }
        positions
    }

    /// Decide who presses and who backs off, by role and distance
    pub fn coordinate_attack(&self, player_pos: Vec2, peers: &[PeerInfo]) -> AttackPlan {
        let nearby_threats = peers
            .iter()
            .filter(|p| p.pos.distance(player_pos) < 200.0)
            .count();

        let mut plan = AttackPlan::default();
        for peer in peers {
            let distance = peer.pos.distance(player_pos);
            match self.role(peer.id) {
                Some(Role::Tank) if distance > 100.0 => plan.should_attack.push(peer.id),
                Some(Role::Assassin) if nearby_threats >= 2 && distance > 150.0 => {
                    // Strike while something else is holding attention
                    plan.should_attack.push(peer.id);
                }
                Some(Role::Flanker) if distance > 120.0 => plan.should_attack.push(peer.id),
                Some(role) if role != Role::Tank && distance < 50.0 => {
                    plan.should_retreat.push(peer.id);
                }
                _ => {}
            }
        }
        plan
    }

    /// Sector-based encirclement coverage around the player
    pub fn analyze_encirclement(&self, player_pos: Vec2, peers: &[PeerInfo]) -> Encirclement {
        let mut bins = [0u32; COVERAGE_SECTORS];
        for peer in peers {
            let offset = peer.pos - player_pos;
            if offset.length_squared() < 1e-6 {
                continue;
            }
            bins[angular_sector(offset.y.atan2(offset.x), COVERAGE_SECTORS)] += 1;
        }

        let covered = bins.iter().filter(|&&count| count > 0).count();
        let mut weak_spots = Vec::new();
        let mut strong_spots = Vec::new();
        for (sector, &count) in bins.iter().enumerate() {
            let angle = (sector as f32 + 0.5) * (std::f32::consts::TAU / COVERAGE_SECTORS as f32)
                - std::f32::consts::PI;
            let spot = player_pos + Vec2::new(angle.cos(), angle.sin()) * SPOT_RADIUS;
            if count == 0 {
                weak_spots.push(spot);
            } else if count >= 2 {
                strong_spots.push(spot);
            }
        }

        Encirclement {
            coverage: covered as f32 / COVERAGE_SECTORS as f32,
            weak_spots,
            strong_spots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u32, kind: PeerKind, pos: Vec2) -> PeerInfo {
        PeerInfo { id, kind, pos }
    }

    #[test]
    fn test_roles_by_kind_and_parity() {
        let mut team = TeamCoordinator::new();
        let peers = vec![
            peer(1, PeerKind::Elite, Vec2::ZERO),
            peer(2, PeerKind::Elite, Vec2::ZERO),
            peer(3, PeerKind::Assassin, Vec2::ZERO),
            peer(4, PeerKind::Grunt, Vec2::ZERO),
            peer(5, PeerKind::Grunt, Vec2::ZERO),
        ];
        team.assign_roles(&peers);
        assert_eq!(team.role(1), Some(Role::Tank));
        assert_eq!(team.role(2), Some(Role::Support));
        assert_eq!(team.role(3), Some(Role::Assassin));
        assert_eq!(team.role(4), Some(Role::Flanker));
        assert_eq!(team.role(5), Some(Role::Support));
    }

    #[test]
    fn test_assignment_is_full_rebuild() {
        let mut team = TeamCoordinator::new();
        team.assign_roles(&[peer(1, PeerKind::Grunt, Vec2::ZERO)]);
        assert!(team.role(1).is_some());
        // Entity 1 died; a rebuild must not keep its stale role
        team.assign_roles(&[peer(2, PeerKind::Grunt, Vec2::ZERO)]);
        assert!(team.role(1).is_none());
        assert!(team.role(2).is_some());
    }

    #[test]
    fn test_formation_distance_scales_with_role() {
        let mut team = TeamCoordinator::new();
        let player = Vec2::new(640.0, 360.0);
        let peers = vec![
            peer(1, PeerKind::Elite, Vec2::ZERO),    // tank: 0.6x
            peer(3, PeerKind::Assassin, Vec2::ZERO), // assassin: 1.2x
        ];
        team.assign_roles(&peers);
        let positions = team.formation_positions(player, &peers);
        let tank_distance = positions[&1].distance(player);
        let assassin_distance = positions[&3].distance(player);
        assert!((tank_distance - FORMATION_RADIUS * 0.6).abs() < 1.0);
        assert!((assassin_distance - FORMATION_RADIUS * 1.2).abs() < 1.0);
    }

    #[test]
    fn test_encirclement_full_ring() {
        let team = TeamCoordinator::new();
        let player = Vec2::new(640.0, 360.0);
        let peers: Vec<PeerInfo> = (0..COVERAGE_SECTORS)
            .map(|i| {
                let angle = (i as f32 + 0.5) * std::f32::consts::TAU / COVERAGE_SECTORS as f32
                    - std::f32::consts::PI;
                peer(
                    i as u32,
                    PeerKind::Grunt,
                    player + Vec2::new(angle.cos(), angle.sin()) * 200.0,
                )
            })
            .collect();
        let analysis = team.analyze_encirclement(player, &peers);
        assert!((analysis.coverage - 1.0).abs() < 1e-6);
        assert!(analysis.weak_spots.is_empty());
    }

    #[test]
    fn test_encirclement_weak_and_strong_spots() {
        let team = TeamCoordinator::new();
        let player = Vec2::new(640.0, 360.0);
        // Two hostiles stacked due east, nothing anywhere else
        let peers = vec![
            peer(1, PeerKind::Grunt, player + Vec2::new(200.0, 1.0)),
            peer(2, PeerKind::Grunt, player + Vec2::new(210.0, 2.0)),
        ];
        let analysis = team.analyze_encirclement(player, &peers);
        assert!(analysis.coverage <= 2.0 / COVERAGE_SECTORS as f32 + 1e-6);
        // Eleven empty sectors plus the one doubly-occupied sector
        assert_eq!(analysis.weak_spots.len(), COVERAGE_SECTORS - 1);
        assert_eq!(analysis.strong_spots.len(), 1);
    }
}
