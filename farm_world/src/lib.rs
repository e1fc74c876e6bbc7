//! # Farm World
//!
//! The host-facing world model for Homestead - snapshots of the player, pets, enemies and
//! carried items, the consumable supply catalogue, and the host bridge contract the decision
//! core reads from and acts through.
//! This crate never decides anything; it only describes the world and how to talk to the host.

pub mod entities;
pub mod host;
pub mod sim;
pub mod supplies;

pub use entities::*;
pub use host::*;
pub use sim::*;
pub use supplies::*;
