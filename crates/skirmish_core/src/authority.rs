//! Authority roles.
//!
//! Exactly one participant in a match holds [`Role::Authority`] and may
//! mutate shared state (gold, hit points, match phase, troop targets).
//! Everyone else is a [`Role::Replica`]: protected mutations attempted from
//! a replica are silently ignored rather than reported.

use serde::{Deserialize, Serialize};

/// Which side of the single-writer boundary a participant sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The server: the only writer of shared match state.
    Authority,
    /// A client holding read-only mirrors.
    Replica,
}

impl Role {
    /// Check whether this role may mutate shared state.
    #[must_use]
    pub const fn is_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}
