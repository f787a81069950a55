//! Frame-driven simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Clamped per-frame timestep only
//! - Seeded RNG only, owned by the engine state
//! - No rendering or platform dependencies
//!
//! The engine owns every entity collection and is the only writer of
//! membership. Behavior units read a snapshot of the world and mutate only
//! their own entity.

pub mod adaptive;
pub mod collision;
pub mod engine;
pub mod entity;
pub mod events;
pub mod movement;
pub mod tactics;

pub use collision::{circles_overlap, out_of_bounds};
pub use engine::{Bounds, Engine, TickInput};
pub use events::{
    CoachTip, EngineEvent, EventSink, LogSeverity, SessionSummary, TipSeverity, VecSink,
};
pub use movement::{Smoother, Trail};
