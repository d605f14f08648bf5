//! Match phase tracking.
//!
//! The phase only ever moves one step forward along
//! `Initializing -> PlacingMap -> WaitingForPlayers -> Gameplay -> GameOver`.
//! The guards here decide *whether* a step may happen; the simulation
//! decides *when* to ask.

use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::replicated::{Replicated, Snapshot};
use crate::team::Team;

/// Number of players a match needs before leaving map placement.
pub const REQUIRED_PLAYERS: usize = Team::ALL.len();

/// Lifecycle phase of a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum MatchPhase {
    /// Authority has not started yet.
    #[default]
    Initializing,
    /// Players are anchoring the map in their physical space.
    PlacingMap,
    /// Everyone has placed the map; bases are being set up.
    WaitingForPlayers,
    /// The match is live: income flows and troops fight.
    Gameplay,
    /// A base has fallen. Terminal.
    GameOver,
}

impl MatchPhase {
    /// The phase that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Initializing => Some(Self::PlacingMap),
            Self::PlacingMap => Some(Self::WaitingForPlayers),
            Self::WaitingForPlayers => Some(Self::Gameplay),
            Self::Gameplay => Some(Self::GameOver),
            Self::GameOver => None,
        }
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "Initializing",
            Self::PlacingMap => "PlacingMap",
            Self::WaitingForPlayers => "WaitingForPlayers",
            Self::Gameplay => "Gameplay",
            Self::GameOver => "GameOver",
        };
        f.write_str(name)
    }
}

/// A committed phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Phase before the change.
    pub from: MatchPhase,
    /// Phase after the change.
    pub to: MatchPhase,
}

/// Authority-owned match phase plus the outcome once decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    phase: Replicated<MatchPhase>,
    losing_team: Option<Team>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    /// New match in [`MatchPhase::Initializing`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Replicated::new(MatchPhase::Initializing),
            losing_team: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        *self.phase.get()
    }

    /// Versioned copy of the phase for observers.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<MatchPhase> {
        self.phase.snapshot()
    }

    /// Team whose base fell, once the match is over.
    #[must_use]
    pub const fn losing_team(&self) -> Option<Team> {
        self.losing_team
    }

    /// Whether income and combat are running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase() == MatchPhase::Gameplay
    }

    /// `Initializing -> PlacingMap`, taken as soon as the authority starts.
    pub fn start(&mut self, role: Role) -> Option<PhaseTransition> {
        self.step(role, MatchPhase::Initializing)
    }

    /// `PlacingMap -> WaitingForPlayers` once enough players placed the map.
    pub fn try_begin_waiting(
        &mut self,
        role: Role,
        placed_players: usize,
    ) -> Option<PhaseTransition> {
        if placed_players < REQUIRED_PLAYERS {
            return None;
        }
        self.step(role, MatchPhase::PlacingMap)
    }

    /// `WaitingForPlayers -> Gameplay` once every team's base is registered.
    pub fn try_begin_gameplay(&mut self, role: Role, bases_ready: bool) -> Option<PhaseTransition> {
        if !bases_ready {
            return None;
        }
        self.step(role, MatchPhase::WaitingForPlayers)
    }

    /// `Gameplay -> GameOver`, recording the team that lost.
    pub fn end(&mut self, role: Role, losing_team: Team) -> Option<PhaseTransition> {
        let transition = self.step(role, MatchPhase::Gameplay)?;
        self.losing_team = Some(losing_team);
        Some(transition)
    }

    fn step(&mut self, role: Role, expected: MatchPhase) -> Option<PhaseTransition> {
        let from = self.phase();
        if from != expected {
            return None;
        }
        let to = from.next()?;
        if !self.phase.set(role, to) {
            return None;
        }
        tracing::info!(%from, %to, "Match phase changed");
        Some(PhaseTransition { from, to })
    }
}
