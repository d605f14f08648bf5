//! Events produced by a simulation tick.
//!
//! Every state change the authority commits is also published here, in the
//! order it happened. Observers (client views, the server's outbound
//! stream, tests) react to this queue instead of subscribing to individual
//! entities.

use serde::{Deserialize, Serialize};

use crate::components::{AiMode, ClientId, EntityId, EntityKind};
use crate::math::{fixed_serde, option_fixed, Fixed, Vec2Fixed};
use crate::match_state::MatchPhase;
use crate::team::Team;

/// Why a spawn or upgrade request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// The requested troop kind is not in the roster.
    UnknownTroopKind(usize),
    /// The team has no home base yet.
    MissingBase,
    /// The base cannot pay for the request.
    InsufficientGold {
        /// Gold the request costs.
        #[serde(with = "fixed_serde")]
        required: Fixed,
        /// Gold the base holds.
        #[serde(with = "fixed_serde")]
        available: Fixed,
    },
    /// The base is already at the top of the upgrade ladder.
    MaxTier,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTroopKind(index) => write!(f, "unknown troop kind {index}"),
            Self::MissingBase => f.write_str("no home base"),
            Self::InsufficientGold {
                required,
                available,
            } => write!(f, "needs {required} gold, has {available}"),
            Self::MaxTier => f.write_str("already at max tier"),
        }
    }
}

/// A single committed change, in tick order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Match phase moved forward.
    PhaseChanged {
        /// Previous phase.
        from: MatchPhase,
        /// New phase.
        to: MatchPhase,
    },
    /// A client was assigned a team.
    PlayerRegistered {
        /// Client id from the transport.
        client: ClientId,
        /// Assigned team.
        team: Team,
    },
    /// A client confirmed it anchored the map.
    MapPlaced {
        /// Client that placed the map.
        client: ClientId,
        /// Distinct clients that have placed so far.
        placed: usize,
    },
    /// A home base was created.
    BaseCreated {
        /// Owning team.
        team: Team,
        /// Base entity.
        base: EntityId,
        /// Where it stands.
        position: Vec2Fixed,
    },
    /// A base's gold changed.
    GoldChanged {
        /// Owning team.
        team: Team,
        /// New balance.
        #[serde(with = "fixed_serde")]
        gold: Fixed,
    },
    /// A base advanced one upgrade tier.
    UpgradeApplied {
        /// Owning team.
        team: Team,
        /// New tier.
        tier: usize,
        /// Income per payout at the new tier.
        #[serde(with = "fixed_serde")]
        income: Fixed,
        /// Cost of the following tier, `None` at the top.
        #[serde(with = "option_fixed")]
        next_cost: Option<Fixed>,
    },
    /// An upgrade request was turned down. Nothing changed.
    UpgradeRejected {
        /// Requesting team.
        team: Team,
        /// Why.
        reason: RejectReason,
    },
    /// A spawn was paid for and is casting.
    SpawnApproved {
        /// Requesting team.
        team: Team,
        /// Roster index.
        kind: usize,
        /// Tick on which the troop appears.
        ready_tick: u64,
    },
    /// A spawn request was turned down. Nothing changed.
    SpawnRejected {
        /// Requesting team.
        team: Team,
        /// Roster index that was asked for.
        kind: usize,
        /// Why.
        reason: RejectReason,
    },
    /// A troop finished casting and entered the map.
    TroopSpawned {
        /// New troop entity.
        troop: EntityId,
        /// Owning team.
        team: Team,
        /// Roster index.
        kind: usize,
        /// Spawn point.
        position: Vec2Fixed,
    },
    /// An attack landed.
    DamageDealt {
        /// Attacking troop.
        attacker: EntityId,
        /// Entity that was hit.
        target: EntityId,
        /// Hit points removed.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Target hit points after the hit.
        #[serde(with = "fixed_serde")]
        remaining: Fixed,
    },
    /// An entity's health reached zero. Published once per entity.
    EntityDied {
        /// The dead entity.
        entity: EntityId,
        /// Base or troop.
        kind: EntityKind,
        /// Owning team.
        team: Team,
    },
    /// Gold paid to a base for killing an enemy troop.
    KillReward {
        /// Team receiving the reward.
        team: Team,
        /// Troop that died.
        victim: EntityId,
        /// Gold paid.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// A dead troop was removed from the map.
    TroopDespawned {
        /// Removed troop.
        troop: EntityId,
    },
    /// A player switched their troops' standing order.
    ModeChanged {
        /// Player's team.
        team: Team,
        /// New order.
        mode: AiMode,
    },
    /// The match is decided.
    MatchEnded {
        /// Team whose base fell.
        losing_team: Team,
    },
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick the events belong to.
    pub tick: u64,
    /// Events in the order they were committed.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// Empty event list for `tick`.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self {
            tick,
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Move all of `other`'s events onto the end of this list.
    pub fn append(&mut self, other: &mut Self) {
        self.events.append(&mut other.events);
    }

    /// Check if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over the events in order.
    pub fn iter(&self) -> std::slice::Iter<'_, GameEvent> {
        self.events.iter()
    }

    /// Entities that died this tick.
    pub fn deaths(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            GameEvent::EntityDied { entity, .. } => Some(*entity),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a TickEvents {
    type Item = &'a GameEvent;
    type IntoIter = std::slice::Iter<'a, GameEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
