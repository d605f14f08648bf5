//! Shared identifiers and small component types.

use serde::{Deserialize, Serialize};

/// Unique identifier for simulated entities (bases and troops).
pub type EntityId = u64;

/// Identifier assigned to a connected client by the transport layer.
pub type ClientId = u64;

/// Standing order a player gives to all of their troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AiMode {
    /// Push toward enemy troops and, failing that, the enemy base.
    Attack,
    /// Patrol around the spawn point and fall back when straying.
    #[default]
    Defend,
}

/// What kind of entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A team's home base.
    Base,
    /// A combat unit.
    Troop,
}
