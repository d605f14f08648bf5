//! The non-authoritative participant.
//!
//! A [`ClientView`] is what a player's device runs: it never mutates match
//! state. Local collaborator events (the map was placed, a button was
//! pressed) become [`ClientRequest`]s for the authority, and published
//! snapshots and tick events become [`UiCommand`]s for the UI layer.

use crate::components::{AiMode, ClientId, EntityId, EntityKind};
use crate::events::{GameEvent, RejectReason, TickEvents};
use crate::match_state::MatchPhase;
use crate::math::Fixed;
use crate::replicated::{Mirror, MirrorUpdate, Snapshot};
use crate::simulation::{BaseView, ClientRequest, WorldSnapshot};
use crate::team::Team;

/// Command for the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    /// Our team won.
    ShowVictoryScreen,
    /// Our team lost.
    ShowGameOverScreen,
    /// Our base's gold changed.
    UpdateGoldLabel(Fixed),
    /// Our base's hit points changed.
    UpdateHealthLabel(Fixed),
    /// The next upgrade's price changed. Zero at the top tier.
    UpdateUpgradeCostLabel(Fixed),
    /// Turn AR map placement on or off.
    SetPlacementEnabled(bool),
    /// A troop died.
    PlayDeathAnimation(EntityId),
    /// One of our spawn requests was turned down.
    ShowSpawnRejected(RejectReason),
}

/// One player's read-only view of the match.
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    client: ClientId,
    team: Option<Team>,
    placed_map: bool,
    mirror: Mirror<WorldSnapshot>,
}

impl ClientView {
    /// View for `client`, whose team is learned from the authority.
    #[must_use]
    pub fn new(client: ClientId) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// Client id.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// Our team, once registered.
    #[must_use]
    pub const fn team(&self) -> Option<Team> {
        self.team
    }

    /// Latest accepted snapshot.
    #[must_use]
    pub fn world(&self) -> Option<&WorldSnapshot> {
        self.mirror.value()
    }

    /// Version of the latest accepted snapshot.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.mirror.version()
    }

    /// Our base as of the latest snapshot.
    #[must_use]
    pub fn own_base(&self) -> Option<&BaseView> {
        let team = self.team?;
        self.world()?.base(team)
    }

    /// Gold we can see, zero before our base exists.
    #[must_use]
    pub fn gold(&self) -> Fixed {
        self.own_base().map_or(Fixed::ZERO, |base| base.gold)
    }

    /// Whether our gold covers `price`, as of the latest snapshot.
    ///
    /// Only a prediction; the authority decides.
    #[must_use]
    pub fn can_afford(&self, price: Fixed) -> bool {
        self.gold() >= price
    }

    /// The placement collaborator reports the map was anchored.
    ///
    /// Produces a request the first time only.
    pub fn local_player_placed_map(&mut self) -> Option<ClientRequest> {
        if self.placed_map {
            return None;
        }
        self.placed_map = true;
        Some(ClientRequest::PlaceMap)
    }

    /// Ask for a troop of roster entry `kind`.
    #[must_use]
    pub const fn request_spawn(&self, kind: usize) -> ClientRequest {
        ClientRequest::Spawn { kind }
    }

    /// Ask for the next base upgrade.
    #[must_use]
    pub const fn request_upgrade(&self) -> ClientRequest {
        ClientRequest::Upgrade
    }

    /// Change our troops' standing order.
    #[must_use]
    pub const fn set_mode(&self, mode: AiMode) -> ClientRequest {
        ClientRequest::SetMode { mode }
    }

    /// Offer a published snapshot. Stale snapshots are dropped silently.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot<WorldSnapshot>) -> Vec<UiCommand> {
        let previous = self.mirror.value().cloned();
        match self.mirror.apply(snapshot) {
            MirrorUpdate::Stale { current, received } => {
                tracing::trace!(client = self.client, current, received, "Dropping stale snapshot");
                Vec::new()
            }
            MirrorUpdate::Applied { .. } => match self.mirror.value() {
                Some(latest) => self.diff(previous.as_ref(), latest),
                None => Vec::new(),
            },
        }
    }

    fn diff(&self, previous: Option<&WorldSnapshot>, latest: &WorldSnapshot) -> Vec<UiCommand> {
        let mut commands = Vec::new();

        let old_phase = previous.map(|w| w.phase);
        if old_phase != Some(latest.phase) {
            match latest.phase {
                MatchPhase::PlacingMap => commands.push(UiCommand::SetPlacementEnabled(true)),
                _ if old_phase == Some(MatchPhase::PlacingMap) => {
                    commands.push(UiCommand::SetPlacementEnabled(false));
                }
                _ => {}
            }
            if latest.phase == MatchPhase::GameOver {
                match (latest.losing_team, self.team) {
                    (Some(losing), Some(ours)) if losing == ours => {
                        commands.push(UiCommand::ShowGameOverScreen);
                    }
                    (Some(_), Some(_)) => commands.push(UiCommand::ShowVictoryScreen),
                    _ => {}
                }
            }
        }

        let Some(team) = self.team else {
            return commands;
        };
        let Some(base) = latest.base(team) else {
            return commands;
        };
        let old_base = previous.and_then(|w| w.base(team));

        if old_base.map(|b| b.gold) != Some(base.gold) {
            commands.push(UiCommand::UpdateGoldLabel(base.gold));
        }
        if old_base.map(|b| b.health) != Some(base.health) {
            commands.push(UiCommand::UpdateHealthLabel(base.health));
        }
        if old_base.map(|b| b.next_upgrade_cost) != Some(base.next_upgrade_cost) {
            commands.push(UiCommand::UpdateUpgradeCostLabel(
                base.next_upgrade_cost.unwrap_or(Fixed::ZERO),
            ));
        }
        commands
    }

    /// React to the events of a tick.
    pub fn observe_events(&mut self, events: &TickEvents) -> Vec<UiCommand> {
        let mut commands = Vec::new();
        for event in events {
            match event {
                GameEvent::PlayerRegistered { client, team } if *client == self.client => {
                    self.team = Some(*team);
                }
                GameEvent::EntityDied {
                    entity,
                    kind: EntityKind::Troop,
                    ..
                } => commands.push(UiCommand::PlayDeathAnimation(*entity)),
                GameEvent::SpawnRejected { team, reason, .. } if Some(*team) == self.team => {
                    commands.push(UiCommand::ShowSpawnRejected(*reason));
                }
                _ => {}
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Role;
    use crate::replicated::Replicated;
    use crate::simulation::BaseView;

    fn world(phase: MatchPhase, gold: i32) -> WorldSnapshot {
        WorldSnapshot {
            tick: 0,
            phase,
            losing_team: None,
            bases: vec![BaseView {
                id: 1,
                team: Team::Red,
                position: crate::math::Vec2Fixed::ZERO,
                gold: Fixed::from_num(gold),
                income_rate: Fixed::from_num(5),
                tier: 0,
                next_upgrade_cost: Some(Fixed::from_num(50)),
                health: Fixed::from_num(100),
                max_health: Fixed::from_num(100),
                alive: true,
            }],
            troops: Vec::new(),
        }
    }

    fn registered_view() -> ClientView {
        let mut view = ClientView::new(7);
        let mut events = TickEvents::new(0);
        events.push(GameEvent::PlayerRegistered {
            client: 7,
            team: Team::Red,
        });
        view.observe_events(&events);
        view
    }

    #[test]
    fn placement_request_is_sent_once() {
        let mut view = ClientView::new(1);
        assert_eq!(view.local_player_placed_map(), Some(ClientRequest::PlaceMap));
        assert_eq!(view.local_player_placed_map(), None);
    }

    #[test]
    fn first_snapshot_fills_labels() {
        let mut view = registered_view();
        let source = Replicated::new(world(MatchPhase::Gameplay, 100));
        let commands = view.apply_snapshot(source.snapshot());
        assert!(commands.contains(&UiCommand::UpdateGoldLabel(Fixed::from_num(100))));
        assert!(commands.contains(&UiCommand::UpdateHealthLabel(Fixed::from_num(100))));
        assert!(commands.contains(&UiCommand::UpdateUpgradeCostLabel(Fixed::from_num(50))));
    }

    #[test]
    fn only_changes_produce_commands() {
        let mut view = registered_view();
        let mut source = Replicated::new(world(MatchPhase::Gameplay, 100));
        view.apply_snapshot(source.snapshot());
        source.set(Role::Authority, world(MatchPhase::Gameplay, 105));
        assert_eq!(
            view.apply_snapshot(source.snapshot()),
            vec![UiCommand::UpdateGoldLabel(Fixed::from_num(105))]
        );
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let mut view = registered_view();
        let mut source = Replicated::new(world(MatchPhase::Gameplay, 100));
        let old = source.snapshot();
        source.set(Role::Authority, world(MatchPhase::Gameplay, 120));
        view.apply_snapshot(source.snapshot());
        assert!(view.apply_snapshot(old).is_empty());
        assert_eq!(view.gold(), Fixed::from_num(120));
    }

    #[test]
    fn game_over_shows_outcome_for_own_team() {
        let mut view = registered_view();
        let mut source = Replicated::new(world(MatchPhase::Gameplay, 0));
        view.apply_snapshot(source.snapshot());

        let mut lost = world(MatchPhase::GameOver, 0);
        lost.losing_team = Some(Team::Red);
        source.set(Role::Authority, lost);
        assert!(view
            .apply_snapshot(source.snapshot())
            .contains(&UiCommand::ShowGameOverScreen));

        let mut other = registered_view();
        other.team = Some(Team::Blue);
        assert!(other
            .apply_snapshot(source.snapshot())
            .contains(&UiCommand::ShowVictoryScreen));
    }

    #[test]
    fn placement_toggles_with_phase() {
        let mut view = registered_view();
        let mut source = Replicated::new(world(MatchPhase::PlacingMap, 0));
        assert!(view
            .apply_snapshot(source.snapshot())
            .contains(&UiCommand::SetPlacementEnabled(true)));
        source.set(Role::Authority, world(MatchPhase::WaitingForPlayers, 0));
        assert!(view
            .apply_snapshot(source.snapshot())
            .contains(&UiCommand::SetPlacementEnabled(false)));
    }

    #[test]
    fn own_spawn_rejections_are_surfaced() {
        let mut view = registered_view();
        let mut events = TickEvents::new(3);
        events.push(GameEvent::SpawnRejected {
            team: Team::Red,
            kind: 9,
            reason: RejectReason::UnknownTroopKind(9),
        });
        events.push(GameEvent::SpawnRejected {
            team: Team::Blue,
            kind: 0,
            reason: RejectReason::MissingBase,
        });
        assert_eq!(
            view.observe_events(&events),
            vec![UiCommand::ShowSpawnRejected(RejectReason::UnknownTroopKind(9))]
        );
    }
}
