//! Tactical coordination layer
//!
//! Everything above individual entity AI: commands from elites to grunts,
//! pack-level doctrine, team roles and encirclement analysis, wave
//! management, and the player-assist AI. The combat coordinator composes
//! them for the engine.

pub mod assist;
pub mod command;
pub mod coordinator;
pub mod doctrine;
pub mod team;
pub mod wave;

pub use assist::{AssistDecision, AssistMode, PlayerAssist};
pub use command::{Command, CommandKind, CommandSystem, COMMAND_TTL};
pub use coordinator::{CombatCoordinator, CombatState};
pub use doctrine::{FormationMode, TacticalDoctrine, TacticOrder};
pub use team::{Encirclement, Role, TeamCoordinator};
pub use wave::{WaveManager, POPULATION_CEILING};
