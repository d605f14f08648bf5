//! Scripted bot players for headless matches.
//!
//! A bot sees the match only through its own [`ClientView`], exactly like a
//! human client would: it reads published snapshots and events and answers
//! with [`ClientRequest`]s that the authority may still reject.

use serde::{Deserialize, Serialize};

use skirmish_core::components::{AiMode, ClientId};
use skirmish_core::config::GameConfig;
use skirmish_core::events::TickEvents;
use skirmish_core::match_state::MatchPhase;
use skirmish_core::math::Fixed;
use skirmish_core::replicated::Snapshot;
use skirmish_core::simulation::{ClientRequest, WorldSnapshot, TICK_RATE};
use skirmish_core::view::ClientView;

/// How a bot spends its gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BotStrategy {
    /// Cheap troops as soon as affordable, attack early.
    Rusher,
    /// Ranged troops held at home; attacks only with a large army.
    Turtle,
    /// Climbs the upgrade ladder first, then buys heavy troops.
    Economist,
}

impl BotStrategy {
    /// Preferred roster index.
    const fn preferred_kind(self) -> usize {
        match self {
            Self::Rusher => 0,
            Self::Turtle => 1,
            Self::Economist => 2,
        }
    }

    /// Army size at which the bot switches to Attack.
    const fn attack_threshold(self) -> usize {
        match self {
            Self::Rusher => 3,
            Self::Turtle => 8,
            Self::Economist => 4,
        }
    }

    /// Highest tier the bot buys before it starts spending on troops.
    fn upgrade_goal(self, max_tier: usize) -> usize {
        match self {
            Self::Rusher => 0,
            Self::Turtle => max_tier.min(1),
            Self::Economist => max_tier,
        }
    }
}

impl std::fmt::Display for BotStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rusher => "rusher",
            Self::Turtle => "turtle",
            Self::Economist => "economist",
        };
        f.write_str(name)
    }
}

/// A scripted participant.
#[derive(Debug, Clone)]
pub struct BotPlayer {
    strategy: BotStrategy,
    view: ClientView,
    prices: Vec<Fixed>,
    max_tier: usize,
    think_interval: u64,
    next_think: u64,
    mode: AiMode,
}

impl BotPlayer {
    /// Create a bot for `client` that knows the roster prices of `config`.
    #[must_use]
    pub fn new(client: ClientId, strategy: BotStrategy, config: &GameConfig) -> Self {
        Self {
            strategy,
            view: ClientView::new(client),
            prices: config.troop_kinds.iter().map(|kind| kind.price).collect(),
            max_tier: config.max_tier(),
            think_interval: u64::from(TICK_RATE / 2),
            next_think: 0,
            mode: AiMode::default(),
        }
    }

    /// The bot's strategy.
    #[must_use]
    pub const fn strategy(&self) -> BotStrategy {
        self.strategy
    }

    /// The bot's client id.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.view.client()
    }

    /// What the bot currently believes about the match.
    #[must_use]
    pub const fn view(&self) -> &ClientView {
        &self.view
    }

    /// Feed the bot a tick's events and the latest published snapshot.
    pub fn observe(&mut self, events: &TickEvents, snapshot: Snapshot<WorldSnapshot>) {
        self.view.observe_events(events);
        self.view.apply_snapshot(snapshot);
    }

    /// Decide what to ask for at `tick`. At most one purchase per decision.
    pub fn decide(&mut self, tick: u64) -> Vec<ClientRequest> {
        let Some(world) = self.view.world() else {
            return Vec::new();
        };
        if world.phase == MatchPhase::PlacingMap {
            return self.view.local_player_placed_map().into_iter().collect();
        }
        if world.phase != MatchPhase::Gameplay || tick < self.next_think {
            return Vec::new();
        }
        self.next_think = tick + self.think_interval;

        let Some(team) = self.view.team() else {
            return Vec::new();
        };
        let army = world.troops_of(team).filter(|t| t.alive).count();
        let tier = self.view.own_base().map_or(0, |base| base.tier);
        let upgrade_cost = self.view.own_base().and_then(|base| base.next_upgrade_cost);

        let mut requests = Vec::new();
        if army >= self.strategy.attack_threshold() && self.mode != AiMode::Attack {
            self.mode = AiMode::Attack;
            requests.push(self.view.set_mode(AiMode::Attack));
        }

        let wants_upgrade = tier < self.strategy.upgrade_goal(self.max_tier);
        match upgrade_cost {
            Some(cost) if wants_upgrade => {
                if self.view.can_afford(cost) {
                    requests.push(self.view.request_upgrade());
                }
            }
            _ => {
                let kind = self.affordable_kind();
                if let Some(kind) = kind {
                    requests.push(self.view.request_spawn(kind));
                }
            }
        }
        requests
    }

    /// The preferred troop if affordable, otherwise the cheapest one that is.
    fn affordable_kind(&self) -> Option<usize> {
        let preferred = self.strategy.preferred_kind().min(self.prices.len().saturating_sub(1));
        if self.prices.get(preferred).is_some_and(|p| self.view.can_afford(*p)) {
            return Some(preferred);
        }
        if self.strategy == BotStrategy::Economist {
            // Saves up for the heavy troop instead of buying filler.
            return None;
        }
        self.prices
            .iter()
            .enumerate()
            .filter(|(_, price)| self.view.can_afford(**price))
            .min_by_key(|(_, price)| **price)
            .map(|(kind, _)| kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::events::GameEvent;
    use skirmish_core::simulation::BaseView;
    use skirmish_core::team::Team;

    fn world(phase: MatchPhase, gold: i32, tier: usize) -> WorldSnapshot {
        let upgrades = GameConfig::default().upgrades;
        WorldSnapshot {
            tick: 0,
            phase,
            losing_team: None,
            bases: vec![BaseView {
                id: 1,
                team: Team::Red,
                position: skirmish_core::math::Vec2Fixed::ZERO,
                gold: Fixed::from_num(gold),
                income_rate: upgrades[tier].income,
                tier,
                next_upgrade_cost: upgrades.get(tier + 1).map(|t| t.cost),
                health: Fixed::from_num(100),
                max_health: Fixed::from_num(100),
                alive: true,
            }],
            troops: Vec::new(),
        }
    }

    fn bot(strategy: BotStrategy, snapshot: WorldSnapshot) -> BotPlayer {
        let mut bot = BotPlayer::new(1, strategy, &GameConfig::default());
        let mut registered = TickEvents::new(0);
        registered.push(GameEvent::PlayerRegistered {
            client: 1,
            team: Team::Red,
        });
        bot.observe(
            &registered,
            Snapshot {
                version: 1,
                value: snapshot,
            },
        );
        bot
    }

    #[test]
    fn places_map_once() {
        let mut bot = bot(BotStrategy::Rusher, world(MatchPhase::PlacingMap, 100, 0));
        assert_eq!(bot.decide(0), vec![ClientRequest::PlaceMap]);
        assert!(bot.decide(1).is_empty());
    }

    #[test]
    fn rusher_buys_knights() {
        let mut bot = bot(BotStrategy::Rusher, world(MatchPhase::Gameplay, 100, 0));
        assert_eq!(bot.decide(0), vec![ClientRequest::Spawn { kind: 0 }]);
    }

    #[test]
    fn economist_upgrades_first() {
        let mut bot = bot(BotStrategy::Economist, world(MatchPhase::Gameplay, 100, 0));
        assert_eq!(bot.decide(0), vec![ClientRequest::Upgrade]);
    }

    #[test]
    fn economist_saves_for_giants() {
        let mut bot = bot(BotStrategy::Economist, world(MatchPhase::Gameplay, 60, 3));
        assert!(bot.decide(0).is_empty());
    }

    #[test]
    fn turtle_falls_back_to_cheapest_troop() {
        let mut bot = bot(BotStrategy::Turtle, world(MatchPhase::Gameplay, 35, 1));
        assert_eq!(bot.decide(0), vec![ClientRequest::Spawn { kind: 0 }]);
    }

    #[test]
    fn decisions_are_throttled() {
        let mut bot = bot(BotStrategy::Rusher, world(MatchPhase::Gameplay, 500, 0));
        assert!(!bot.decide(0).is_empty());
        assert!(bot.decide(1).is_empty());
        assert!(!bot.decide(10).is_empty());
    }

    #[test]
    fn idle_outside_gameplay() {
        let mut bot = bot(BotStrategy::Rusher, world(MatchPhase::GameOver, 500, 0));
        assert!(bot.decide(0).is_empty());
    }
}
