//! # Skirmish Core
//!
//! Per-frame simulation core of a top-down action game.
//!
//! This crate provides:
//! - Geometry, line-of-sight and circle-vs-rectangle movement
//! - View-cone perception with an idle vision sweep
//! - Enemy and boss AI state machines
//! - Aggro propagation between enemies that see an ally get hit
//! - Projectile and melee combat with stat-driven damage
//! - The player controller (movement, dash, attacks, leveling, equipment)
//! - [`Simulation`], which steps every phase in a fixed order
//!
//! Rendering, menus, inventory UI, world generation and persistence are the
//! caller's business: the core takes a [`World`] and a [`FrameIntent`] per
//! frame and exposes agent state, live projectiles and melee volumes, effect
//! requests and a [`SimEvent`] stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod aggro;
pub mod boss;
pub mod combat;
pub mod config;
pub mod damage;
pub mod effects;
pub mod enemy;
pub mod events;
pub mod geometry;
pub mod input;
pub mod movement;
pub mod perception;
pub mod player;
pub mod simulation;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::aggro::*;
    pub use crate::boss::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::effects::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::geometry::*;
    pub use crate::input::*;
    pub use crate::movement::*;
    pub use crate::perception::*;
    pub use crate::player::*;
    pub use crate::simulation::*;
    pub use crate::world::*;
}

pub use prelude::*;
