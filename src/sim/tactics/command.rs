//! Elite command system
//!
//! An elite may issue a time-boxed command to its nearest regular enemies.
//! Commands are ephemeral: looked up per-entity per-tick and lazily purged
//! once past their expiry on the simulation clock.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::perpendicular;
use crate::sim::entity::grunt::Directive;

/// Commands expire this long after being issued (seconds)
pub const COMMAND_TTL: f64 = 5.0;
/// A command targets at most this many grunts
pub const MAX_COMMAND_TARGETS: usize = 3;

/// Command kinds an elite can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Rush,
    Flank,
    Retreat,
    Surround,
}

/// A time-boxed directive from an elite to a set of grunts
#[derive(Debug, Clone)]
pub struct Command {
    pub id: u64,
    pub kind: CommandKind,
    pub issuer: u32,
    pub targets: Vec<u32>,
    pub target_position: Option<Vec2>,
    pub priority: i32,
    pub expires_at: f64,
}

/// Issues, stores and expires commands
#[derive(Debug, Default)]
pub struct CommandSystem {
    active: Vec<Command>,
    next_id: u64,
    issued_total: u64,
}

impl CommandSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a command from an elite to its `MAX_COMMAND_TARGETS` nearest
    /// grunts. Returns None when there is nobody to command.
    pub fn issue(
        &mut self,
        issuer: u32,
        issuer_pos: Vec2,
        kind: CommandKind,
        grunts: &[(u32, Vec2)],
        player_pos: Vec2,
        priority: i32,
        now: f64,
    ) -> Option<&Command> {
        if grunts.is_empty() {
            return None;
        }

        let mut by_distance: Vec<&(u32, Vec2)> = grunts.iter().collect();
        by_distance.sort_by(|a, b| {
            a.1.distance_squared(issuer_pos)
                .partial_cmp(&b.1.distance_squared(issuer_pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let targets: Vec<u32> = by_distance
            .iter()
            .take(MAX_COMMAND_TARGETS)
            .map(|(id, _)| *id)
            .collect();

        let target_position = match kind {
            CommandKind::Rush | CommandKind::Surround => Some(player_pos),
            _ => None,
        };

        self.next_id += 1;
        self.issued_total += 1;
        self.active.push(Command {
            id: self.next_id,
            kind,
            issuer,
            targets,
            target_position,
            priority,
            expires_at: now + COMMAND_TTL,
        });
        self.active.last()
    }

    /// Active commands addressing `entity_id`, highest priority first.
    /// Expired commands are purged on the way through and never returned.
    pub fn commands_for(&mut self, entity_id: u32, now: f64) -> Vec<&Command> {
        self.active.retain(|c| c.expires_at > now);
        let mut matching: Vec<&Command> = self
            .active
            .iter()
            .filter(|c| c.targets.contains(&entity_id))
            .collect();
        matching.sort_by_key(|c| std::cmp::Reverse(c.priority));
        matching
    }

    /// Translate a command into a movement directive for one grunt
    pub fn directive_for(
        command: &Command,
        grunt_pos: Vec2,
        player_pos: Vec2,
        rng: &mut Pcg32,
    ) -> Directive {
        match command.kind {
            CommandKind::Rush => Directive {
                target: command.target_position.unwrap_or(player_pos),
                speed_multiplier: 1.5,
            },
            CommandKind::Flank => {
                // Swing to a random angle off the direct approach line
                let offset = rng.random_range(-std::f32::consts::FRAC_PI_4..std::f32::consts::FRAC_PI_4);
                let to_player = player_pos - grunt_pos;
                let base = to_player.y.atan2(to_player.x) + offset + std::f32::consts::PI;
                Directive {
                    target: player_pos + Vec2::new(base.cos(), base.sin()) * 100.0,
                    speed_multiplier: 1.2,
                }
            }
            CommandKind::Retreat => {
                let away = grunt_pos - player_pos;
                let distance = away.length();
                let dir = if distance < 1e-3 {
                    perpendicular(Vec2::X)
                } else {
                    away / distance
                };
                Directive {
                    target: grunt_pos + dir * 200.0,
                    speed_multiplier: 1.3,
                }
            }
            CommandKind::Surround => {
                let anchor = command.target_position.unwrap_or(player_pos);
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                Directive {
                    target: anchor + Vec2::new(angle.cos(), angle.sin()) * 150.0,
                    speed_multiplier: 1.0,
                }
            }
        }
    }

    /// Drop expired commands
    pub fn cleanup(&mut self, now: f64) {
        self.active.retain(|c| c.expires_at > now);
    }

    pub fn active_count(&mut self, now: f64) -> usize {
        self.cleanup(now);
        self.active.len()
    }

    pub fn issued_total(&self) -> u64 {
        self.issued_total
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn grunts() -> Vec<(u32, Vec2)> {
        vec![
            (1, Vec2::new(10.0, 0.0)),
            (2, Vec2::new(20.0, 0.0)),
            (3, Vec2::new(30.0, 0.0)),
            (4, Vec2::new(500.0, 0.0)),
        ]
    }

    #[test]
    fn test_issue_targets_three_nearest() {
        let mut system = CommandSystem::new();
        let command = system
            .issue(
                99,
                Vec2::ZERO,
                CommandKind::Rush,
                &grunts(),
                Vec2::new(100.0, 100.0),
                2,
                0.0,
            )
            .expect("command should be issued");
        assert_eq!(command.targets, vec![1, 2, 3]);
        assert_eq!(command.target_position, Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_expired_commands_never_returned() {
        let mut system = CommandSystem::new();
        system.issue(
            99,
            Vec2::ZERO,
            CommandKind::Rush,
            &grunts(),
            Vec2::ZERO,
            1,
            0.0,
        );
        assert_eq!(system.commands_for(1, 0.1).len(), 1);
        // At exactly the TTL boundary the command is gone
        assert!(system.commands_for(1, COMMAND_TTL).is_empty());
        assert_eq!(system.active_count(COMMAND_TTL), 0);
    }

    #[test]
    fn test_commands_sorted_by_priority() {
        let mut system = CommandSystem::new();
        system.issue(99, Vec2::ZERO, CommandKind::Rush, &grunts(), Vec2::ZERO, 1, 0.0);
        system.issue(98, Vec2::ZERO, CommandKind::Retreat, &grunts(), Vec2::ZERO, 5, 0.0);
        let commands = system.commands_for(1, 0.1);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].priority, 5);
        assert_eq!(commands[0].kind, CommandKind::Retreat);
    }

    #[test]
    fn test_no_command_without_grunts() {
        let mut system = CommandSystem::new();
        assert!(system
            .issue(99, Vec2::ZERO, CommandKind::Rush, &[], Vec2::ZERO, 1, 0.0)
            .is_none());
    }

    #[test]
    fn test_rush_directive_speeds_up() {
        let mut rng = Pcg32::seed_from_u64(5);
        let command = Command {
            id: 1,
            kind: CommandKind::Rush,
            issuer: 99,
            targets: vec![1],
            target_position: Some(Vec2::new(50.0, 50.0)),
            priority: 1,
            expires_at: 5.0,
        };
        let directive =
            CommandSystem::directive_for(&command, Vec2::ZERO, Vec2::new(50.0, 50.0), &mut rng);
        assert_eq!(directive.speed_multiplier, 1.5);
        assert_eq!(directive.target, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_retreat_directive_moves_away() {
        let mut rng = Pcg32::seed_from_u64(5);
        let command = Command {
            id: 1,
            kind: CommandKind::Retreat,
            issuer: 99,
            targets: vec![1],
            target_position: None,
            priority: 1,
            expires_at: 5.0,
        };
        let grunt_pos = Vec2::new(100.0, 0.0);
        let player_pos = Vec2::ZERO;
        let directive = CommandSystem::directive_for(&command, grunt_pos, player_pos, &mut rng);
        assert!(directive.target.x > grunt_pos.x);
    }
}
