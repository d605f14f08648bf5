//! Team and ownership registry.
//!
//! Maps connected clients to teams and teams to their home base, and
//! answers "who is the enemy of X" for the rest of the simulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{AiMode, ClientId, EntityId};
use crate::team::Team;

/// What the authority knows about one connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Transport-level client id.
    pub client: ClientId,
    /// Team assigned at connection time.
    pub team: Team,
    /// Whether the client has confirmed placing the map.
    pub placed_map: bool,
    /// Standing order for this player's troops.
    pub mode: AiMode,
    /// Whether the transport still reports the client as connected.
    pub connected: bool,
}

/// Client → team and team → base lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Registry {
    players: BTreeMap<ClientId, PlayerRecord>,
    bases: BTreeMap<Team, EntityId>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connecting client, assigning the next free team.
    ///
    /// Registering a known client again returns its existing team. Returns
    /// `None` when both teams are already taken.
    pub fn register_player(&mut self, client: ClientId) -> Option<Team> {
        if let Some(record) = self.players.get_mut(&client) {
            record.connected = true;
            return Some(record.team);
        }
        let team = Team::for_join_order(self.players.len())?;
        self.players.insert(
            client,
            PlayerRecord {
                client,
                team,
                placed_map: false,
                mode: AiMode::default(),
                connected: true,
            },
        );
        Some(team)
    }

    /// Mark a client as disconnected. The team slot stays reserved.
    pub fn mark_disconnected(&mut self, client: ClientId) -> Option<Team> {
        let record = self.players.get_mut(&client)?;
        record.connected = false;
        Some(record.team)
    }

    /// Record that `client` placed the map.
    ///
    /// Returns `true` only the first time for a given client.
    pub fn mark_placed(&mut self, client: ClientId) -> bool {
        match self.players.get_mut(&client) {
            Some(record) if !record.placed_map => {
                record.placed_map = true;
                true
            }
            _ => false,
        }
    }

    /// Number of distinct clients that placed the map.
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.players.values().filter(|p| p.placed_map).count()
    }

    /// Number of registered players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, client: ClientId) -> Option<&PlayerRecord> {
        self.players.get(&client)
    }

    /// All players in client-id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Team of a client.
    #[must_use]
    pub fn team_of(&self, client: ClientId) -> Option<Team> {
        self.players.get(&client).map(|p| p.team)
    }

    /// Client playing `team`.
    #[must_use]
    pub fn client_of(&self, team: Team) -> Option<ClientId> {
        self.players.values().find(|p| p.team == team).map(|p| p.client)
    }

    /// Standing order for `team`'s troops. Defend until the player says otherwise.
    #[must_use]
    pub fn mode_of(&self, team: Team) -> AiMode {
        self.players
            .values()
            .find(|p| p.team == team)
            .map_or(AiMode::default(), |p| p.mode)
    }

    /// Change a player's standing order. Returns `true` if it changed.
    pub fn set_mode(&mut self, client: ClientId, mode: AiMode) -> bool {
        match self.players.get_mut(&client) {
            Some(record) if record.mode != mode => {
                record.mode = mode;
                true
            }
            _ => false,
        }
    }

    /// Register `team`'s home base. A team keeps its first base.
    pub fn register_base(&mut self, team: Team, base: EntityId) -> bool {
        if self.bases.contains_key(&team) {
            return false;
        }
        self.bases.insert(team, base);
        true
    }

    /// Home base of `team`.
    #[must_use]
    pub fn base_of(&self, team: Team) -> Option<EntityId> {
        self.bases.get(&team).copied()
    }

    /// Home base of `team`'s opponent.
    #[must_use]
    pub fn enemy_base(&self, team: Team) -> Option<EntityId> {
        self.base_of(team.enemy())
    }

    /// Whether every team has a base.
    #[must_use]
    pub fn all_bases_registered(&self) -> bool {
        Team::ALL.iter().all(|team| self.bases.contains_key(team))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_gets_red_joiner_gets_blue() {
        let mut registry = Registry::new();
        assert_eq!(registry.register_player(10), Some(Team::Red));
        assert_eq!(registry.register_player(20), Some(Team::Blue));
        assert_eq!(registry.register_player(30), None);
        assert_eq!(registry.player_count(), 2);
    }

    #[test]
    fn re_registering_keeps_team() {
        let mut registry = Registry::new();
        registry.register_player(1);
        registry.register_player(2);
        registry.mark_disconnected(2);
        assert_eq!(registry.register_player(2), Some(Team::Blue));
        assert!(registry.player(2).unwrap().connected);
    }

    #[test]
    fn placement_counts_each_client_once() {
        let mut registry = Registry::new();
        registry.register_player(1);
        registry.register_player(2);
        assert!(registry.mark_placed(1));
        assert!(!registry.mark_placed(1));
        assert!(registry.mark_placed(2));
        assert!(!registry.mark_placed(99));
        assert_eq!(registry.placed_count(), 2);
    }

    #[test]
    fn bases_register_once_per_team() {
        let mut registry = Registry::new();
        assert!(registry.register_base(Team::Red, 1));
        assert!(!registry.register_base(Team::Red, 5));
        assert!(!registry.all_bases_registered());
        assert!(registry.register_base(Team::Blue, 2));
        assert!(registry.all_bases_registered());
        assert_eq!(registry.base_of(Team::Red), Some(1));
        assert_eq!(registry.enemy_base(Team::Red), Some(2));
    }

    #[test]
    fn mode_defaults_to_defend() {
        let mut registry = Registry::new();
        registry.register_player(1);
        assert_eq!(registry.mode_of(Team::Red), AiMode::Defend);
        assert!(registry.set_mode(1, AiMode::Attack));
        assert!(!registry.set_mode(1, AiMode::Attack));
        assert_eq!(registry.mode_of(Team::Red), AiMode::Attack);
        assert_eq!(registry.mode_of(Team::Blue), AiMode::Defend);
    }
}
