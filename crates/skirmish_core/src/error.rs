//! Error types for the match simulation.
//!
//! Expected gameplay outcomes (not enough gold, already at the top upgrade
//! tier) are reported as rejection events, not as errors. `GameError`
//! covers broken references, bad data and IO around the simulation.

use thiserror::Error;

use crate::components::{ClientId, EntityId};
use crate::team::Team;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all match simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Troop kind index outside the configured roster.
    #[error("Unknown troop kind index: {0}")]
    UnknownTroopKind(usize),

    /// No home base has been registered for the team.
    #[error("No home base registered for team {0}")]
    MissingBase(Team),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Client id that never connected.
    #[error("Unknown client: {0}")]
    UnknownClient(ClientId),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration '{path}': {message}")]
    ConfigLoad {
        /// Path to the file that failed to load.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid match state.
    #[error("Invalid match state: {0}")]
    InvalidState(String),

    /// Binary encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A replayed match ended in a different state than it was recorded in.
    #[error("Replay diverged at tick {tick}: recorded hash {recorded}, replayed hash {replayed}")]
    ReplayMismatch {
        /// Tick at which the hashes were compared.
        tick: u64,
        /// Hash stored in the log.
        recorded: u64,
        /// Hash produced by the replay.
        replayed: u64,
    },
}
