//! # Skirmish Core
//!
//! Authoritative match simulation for a two-player AR skirmish game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (apart from explicit config and match-log files)
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - A single authoritative server with read-only client mirrors
//! - Headless server builds
//! - Match logs that replay bit-for-bit
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`simulation`] - The authoritative match and its tick loop
//! - [`match_state`] - Match phases and their guards
//! - [`economy`] - Home bases: gold, income and upgrades
//! - [`spawner`] - The spawn gate and spawn placement
//! - [`ai`] / [`troop`] - Troop combat state machine
//! - [`health`] - Hit points and one-shot death
//! - [`registry`] - Client, team and base lookups
//! - [`replicated`] - Versioned single-writer state and observer mirrors
//! - [`view`] - The client-side participant
//! - [`replay`] - Match logs
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod authority;
pub mod components;
pub mod config;
pub mod economy;
pub mod error;
pub mod events;
pub mod health;
pub mod match_state;
pub mod math;
pub mod navigation;
pub mod registry;
pub mod replay;
pub mod replicated;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod spawner;
pub mod team;
pub mod troop;
pub mod view;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::authority::Role;
    pub use crate::components::*;
    pub use crate::config::{GameConfig, TroopKind, UpgradeTier};
    pub use crate::economy::HomeBase;
    pub use crate::error::{GameError, Result};
    pub use crate::events::{GameEvent, RejectReason, TickEvents};
    pub use crate::match_state::MatchPhase;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{MatchLog, MatchRecorder};
    pub use crate::simulation::{ClientRequest, MatchInput, Simulation, WorldSnapshot, TICK_RATE};
    pub use crate::team::Team;
    pub use crate::troop::{AiState, Troop};
    pub use crate::view::{ClientView, UiCommand};
}
