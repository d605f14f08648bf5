//! Authoritative match simulation.
//!
//! [`Simulation`] owns every piece of shared match state: the phase, the
//! registry, both home bases, all troops and the deferred-task queue.
//! External collaborators feed it [`MatchInput`]s (connections and client
//! requests) and advance it with [`Simulation::tick`], which returns the
//! ordered [`TickEvents`] that happened.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - Randomness only from the seeded [`SimRng`]
//! - Consistent iteration order (sorted entity IDs, fixed team order)
//! - Same config, seed and inputs always produce the same [`state_hash`](Simulation::state_hash)
//!
//! # Tick order
//!
//! 1. Deferred tasks due this tick (spawn casts finishing, despawns)
//! 2. Phase checks (base setup and the move into Gameplay)
//! 3. Income for each base while the match is live
//! 4. Troop AI decisions and the attacks they produce
//! 5. Troop movement
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::GameConfig;
//! use skirmish_core::match_state::MatchPhase;
//! use skirmish_core::simulation::{ClientRequest, MatchInput, Simulation};
//!
//! let mut sim = Simulation::new(GameConfig::default()).unwrap();
//! for client in [1, 2] {
//!     sim.submit(MatchInput::Connect { client });
//!     sim.submit(MatchInput::Request { client, request: ClientRequest::PlaceMap });
//! }
//! sim.tick();
//! assert_eq!(sim.phase(), MatchPhase::Gameplay);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{self, AiContext, Battlefield, Strike, TargetInfo};
use crate::authority::Role;
use crate::components::{AiMode, ClientId, EntityId, EntityKind};
use crate::config::GameConfig;
use crate::economy::{HomeBase, UpgradeOutcome};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, RejectReason, TickEvents};
use crate::health::DamageOutcome;
use crate::match_state::{MatchPhase, MatchState, PhaseTransition};
use crate::math::{fixed_serde, option_fixed, Fixed, Vec2Fixed};
use crate::navigation::ArenaNavMesh;
use crate::registry::Registry;
use crate::replicated::{Replicated, Snapshot};
use crate::rng::SimRng;
use crate::scheduler::Scheduler;
use crate::spawner::{approve_spawn, choose_spawn_point, SpawnDecision, SpawnOrder};
use crate::team::Team;
use crate::troop::{AiState, Troop};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Something a client asks the authority to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRequest {
    /// The client finished anchoring the map.
    PlaceMap,
    /// Spawn a troop of roster entry `kind` at the client's base.
    Spawn {
        /// Roster index.
        kind: usize,
    },
    /// Advance the client's base one upgrade tier.
    Upgrade,
    /// Change the standing order of the client's troops.
    SetMode {
        /// New order.
        mode: AiMode,
    },
}

/// An input from the outside world, applied in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchInput {
    /// The transport reports a new client.
    Connect {
        /// Client id.
        client: ClientId,
    },
    /// The transport lost a client.
    Disconnect {
        /// Client id.
        client: ClientId,
    },
    /// A client request.
    Request {
        /// Requesting client.
        client: ClientId,
        /// What it asked for.
        request: ClientRequest,
    },
}

/// Published state of a home base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseView {
    /// Base entity.
    pub id: EntityId,
    /// Owning team.
    pub team: Team,
    /// Where it stands.
    pub position: Vec2Fixed,
    /// Gold held.
    #[serde(with = "fixed_serde")]
    pub gold: Fixed,
    /// Gold per income payout.
    #[serde(with = "fixed_serde")]
    pub income_rate: Fixed,
    /// Upgrade tier.
    pub tier: usize,
    /// Cost of the next tier, `None` at the top.
    #[serde(with = "option_fixed")]
    pub next_upgrade_cost: Option<Fixed>,
    /// Hit points left.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Hit point maximum.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Whether the base still stands.
    pub alive: bool,
}

/// Published state of a troop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TroopView {
    /// Troop entity.
    pub id: EntityId,
    /// Owning team.
    pub team: Team,
    /// Roster index.
    pub kind: usize,
    /// Current position.
    pub position: Vec2Fixed,
    /// AI state.
    pub state: AiState,
    /// Current target.
    pub target: Option<EntityId>,
    /// Hit points left.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Hit point maximum.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Whether the troop is alive.
    pub alive: bool,
}

/// Everything observers are allowed to see, as of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Match phase.
    pub phase: MatchPhase,
    /// Losing team once the match is over.
    pub losing_team: Option<Team>,
    /// Home bases in team order.
    pub bases: Vec<BaseView>,
    /// Troops in entity-id order.
    pub troops: Vec<TroopView>,
}

impl WorldSnapshot {
    /// Base of `team`, if created.
    #[must_use]
    pub fn base(&self, team: Team) -> Option<&BaseView> {
        self.bases.iter().find(|b| b.team == team)
    }

    /// Living troops of `team`.
    pub fn troops_of(&self, team: Team) -> impl Iterator<Item = &TroopView> {
        self.troops.iter().filter(move |t| t.team == team && t.alive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Deferred {
    CompleteSpawn(SpawnOrder),
    Despawn(EntityId),
}

/// Read-only battlefield seen by one troop while it decides.
struct WorldView<'a> {
    troops: &'a BTreeMap<EntityId, Troop>,
    bases: &'a BTreeMap<Team, HomeBase>,
}

impl WorldView<'_> {
    fn troop_info(troop: &Troop) -> TargetInfo {
        TargetInfo {
            id: troop.id(),
            kind: EntityKind::Troop,
            team: troop.team(),
            position: troop.position(),
            alive: troop.is_alive(),
        }
    }

    fn base_info(base: &HomeBase) -> TargetInfo {
        TargetInfo {
            id: base.id(),
            kind: EntityKind::Base,
            team: base.team(),
            position: base.position(),
            alive: base.is_alive(),
        }
    }
}

impl Battlefield for WorldView<'_> {
    fn lookup(&self, id: EntityId) -> Option<TargetInfo> {
        if let Some(troop) = self.troops.get(&id) {
            return Some(Self::troop_info(troop));
        }
        self.bases
            .values()
            .find(|base| base.id() == id)
            .map(Self::base_info)
    }

    fn troops_within(&self, center: Vec2Fixed, range: Fixed) -> Vec<TargetInfo> {
        self.troops
            .values()
            .filter(|troop| troop.position().within(center, range))
            .map(Self::troop_info)
            .collect()
    }

    fn enemy_base(&self, team: Team) -> Option<TargetInfo> {
        self.bases.get(&team.enemy()).map(Self::base_info)
    }
}

/// The authoritative match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    role: Role,
    tick: u64,
    config: GameConfig,
    match_state: MatchState,
    registry: Registry,
    bases: BTreeMap<Team, HomeBase>,
    troops: BTreeMap<EntityId, Troop>,
    scheduler: Scheduler<Deferred>,
    rng: SimRng,
    next_entity_id: EntityId,
    pending: TickEvents,
    published: Replicated<WorldSnapshot>,
}

impl Simulation {
    /// Create the authoritative simulation and start the match.
    ///
    /// The phase moves from Initializing to PlacingMap right away; the
    /// change is reported with the first tick's events.
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_role(config, Role::Authority)
    }

    /// Create a simulation on either side of the authority boundary.
    ///
    /// A replica never mutates anything: every input and tick is ignored.
    pub fn with_role(config: GameConfig, role: Role) -> Result<Self> {
        config.validate()?;
        let mut sim = Self {
            role,
            tick: 0,
            rng: SimRng::new(config.seed),
            config,
            match_state: MatchState::new(),
            registry: Registry::new(),
            bases: BTreeMap::new(),
            troops: BTreeMap::new(),
            scheduler: Scheduler::new(),
            next_entity_id: 1,
            pending: TickEvents::new(0),
            published: Replicated::new(WorldSnapshot::default()),
        };
        if let Some(transition) = sim.match_state.start(role) {
            sim.pending.push(phase_event(transition));
        }
        Ok(sim)
    }

    /// Which side of the authority boundary this simulation runs on.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Index of the next tick to run.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Match configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.match_state.phase()
    }

    /// Phase tracker.
    #[must_use]
    pub const fn match_state(&self) -> &MatchState {
        &self.match_state
    }

    /// Player and base registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Home base of `team`.
    #[must_use]
    pub fn base(&self, team: Team) -> Option<&HomeBase> {
        self.bases.get(&team)
    }

    /// Look up a troop.
    #[must_use]
    pub fn troop(&self, id: EntityId) -> Option<&Troop> {
        self.troops.get(&id)
    }

    /// All troops on the map, dead ones included until they despawn.
    pub fn troops(&self) -> impl Iterator<Item = &Troop> {
        self.troops.values()
    }

    /// Living troops of `team`.
    #[must_use]
    pub fn alive_troops(&self, team: Team) -> usize {
        self.troops
            .values()
            .filter(|t| t.team() == team && t.is_alive())
            .count()
    }

    /// Deferred tasks still waiting (casts and despawns).
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Apply an input immediately. Its events are reported with the next tick.
    pub fn submit(&mut self, input: MatchInput) {
        match input {
            MatchInput::Connect { client } => self.client_connected(client),
            MatchInput::Disconnect { client } => self.client_disconnected(client),
            MatchInput::Request { client, request } => self.handle_request(client, request),
        }
    }

    /// A client joined. The host becomes Red, the joiner Blue.
    pub fn client_connected(&mut self, client: ClientId) {
        if !self.role.is_authority() {
            tracing::trace!(client, "Ignoring connection on non-authoritative side");
            return;
        }
        let known = self.registry.team_of(client).is_some();
        match self.registry.register_player(client) {
            Some(team) if !known => {
                tracing::info!(client, %team, "Player registered");
                self.pending
                    .push(GameEvent::PlayerRegistered { client, team });
            }
            Some(team) => tracing::info!(client, %team, "Player reconnected"),
            None => tracing::warn!(client, "Match is full, connection not registered"),
        }
    }

    /// A client left. Logged only; the match carries on.
    pub fn client_disconnected(&mut self, client: ClientId) {
        if !self.role.is_authority() {
            return;
        }
        let Some(team) = self.registry.mark_disconnected(client) else {
            tracing::warn!(client, "Disconnect from unknown client");
            return;
        };
        match self.phase() {
            MatchPhase::WaitingForPlayers | MatchPhase::Gameplay => {
                tracing::warn!(
                    client,
                    %team,
                    phase = %self.phase(),
                    "Player disconnected during live match"
                );
            }
            phase => tracing::info!(client, %team, %phase, "Player disconnected"),
        }
    }

    /// Validate and apply a client request.
    pub fn handle_request(&mut self, client: ClientId, request: ClientRequest) {
        if !self.role.is_authority() {
            tracing::trace!(client, ?request, "Ignoring request on non-authoritative side");
            return;
        }
        let Some(team) = self.registry.team_of(client) else {
            tracing::warn!(client, ?request, "{}", GameError::UnknownClient(client));
            return;
        };
        match request {
            ClientRequest::PlaceMap => self.place_map(client),
            ClientRequest::Spawn { kind } => self.request_spawn(team, kind, Some(client)),
            ClientRequest::Upgrade => self.request_upgrade(team),
            ClientRequest::SetMode { mode } => self.set_mode(client, team, mode),
        }
    }

    fn place_map(&mut self, client: ClientId) {
        if !self.registry.mark_placed(client) {
            tracing::debug!(client, "Repeated map placement ignored");
            return;
        }
        let placed = self.registry.placed_count();
        tracing::info!(client, placed, "Map placed");
        self.pending.push(GameEvent::MapPlaced { client, placed });

        if let Some(transition) = self.match_state.try_begin_waiting(self.role, placed) {
            self.pending.push(phase_event(transition));
        }
    }

    fn request_spawn(&mut self, team: Team, kind: usize, owner: Option<ClientId>) {
        let now = self.tick;
        let decision = approve_spawn(self.role, &self.config, self.bases.get_mut(&team), kind, now);
        match decision {
            SpawnDecision::Approved { ready_tick, .. } => {
                self.scheduler.schedule(
                    ready_tick,
                    None,
                    Deferred::CompleteSpawn(SpawnOrder { team, kind, owner }),
                );
                self.push_gold(team);
                self.pending.push(GameEvent::SpawnApproved {
                    team,
                    kind,
                    ready_tick,
                });
            }
            SpawnDecision::Rejected(reason) => {
                tracing::debug!(%team, kind, %reason, "Spawn rejected");
                self.pending
                    .push(GameEvent::SpawnRejected { team, kind, reason });
            }
            SpawnDecision::Ignored => {}
        }
    }

    fn request_upgrade(&mut self, team: Team) {
        let Some(base) = self.bases.get_mut(&team) else {
            tracing::warn!(%team, "{}", GameError::MissingBase(team));
            self.pending.push(GameEvent::UpgradeRejected {
                team,
                reason: RejectReason::MissingBase,
            });
            return;
        };
        match base.request_upgrade(self.role, &self.config.upgrades) {
            UpgradeOutcome::Applied { tier, income, .. } => {
                let next_cost = base.next_upgrade_cost(&self.config.upgrades);
                self.push_gold(team);
                self.pending.push(GameEvent::UpgradeApplied {
                    team,
                    tier,
                    income,
                    next_cost,
                });
            }
            UpgradeOutcome::Rejected(reason) => {
                tracing::debug!(%team, %reason, "Upgrade rejected");
                self.pending
                    .push(GameEvent::UpgradeRejected { team, reason });
            }
            UpgradeOutcome::Ignored => {}
        }
    }

    fn set_mode(&mut self, client: ClientId, team: Team, mode: AiMode) {
        if self.registry.set_mode(client, mode) {
            tracing::info!(%team, ?mode, "AI mode changed");
            self.pending.push(GameEvent::ModeChanged { team, mode });
        }
        if mode == AiMode::Defend {
            for troop in self.troops.values_mut().filter(|t| t.team() == team) {
                troop.start_retreating();
            }
        }
    }

    /// Place a troop directly, bypassing the spawn gate and its cast time.
    ///
    /// Meant for scenario setup in tests, tools and benchmarks.
    pub fn spawn_troop_at(
        &mut self,
        team: Team,
        kind: usize,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        if !self.role.is_authority() {
            return Err(GameError::InvalidState(
                "troops can only be placed on the authority".to_string(),
            ));
        }
        let troop_kind = self
            .config
            .troop_kind(kind)
            .ok_or(GameError::UnknownTroopKind(kind))?
            .clone();
        let id = self.allocate_id();
        let troop = Troop::new(id, team, kind, &troop_kind, position, None, self.tick);
        self.troops.insert(id, troop);
        self.pending.push(GameEvent::TroopSpawned {
            troop: id,
            team,
            kind,
            position,
        });
        Ok(id)
    }

    /// Advance the match by one tick and return everything that happened.
    pub fn tick(&mut self) -> TickEvents {
        let now = self.tick;
        let mut events = std::mem::replace(&mut self.pending, TickEvents::new(now + 1));
        events.tick = now;
        if !self.role.is_authority() {
            return events;
        }

        self.run_deferred(now, &mut events);
        self.run_phase_checks(&mut events);
        if self.match_state.is_live() {
            self.run_income(&mut events);
        }
        self.run_troop_ai(now, &mut events);
        for troop in self.troops.values_mut() {
            troop.advance();
        }

        // Requests issued by this tick (starter troops) belong to it.
        events.append(&mut self.pending);
        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn run_deferred(&mut self, now: u64, events: &mut TickEvents) {
        for task in self.scheduler.drain_due(now) {
            match task {
                Deferred::CompleteSpawn(order) => self.complete_spawn(order, events),
                Deferred::Despawn(id) => {
                    if self.troops.remove(&id).is_some() {
                        self.scheduler.cancel_owned_by(id);
                        tracing::debug!(troop = id, "Troop despawned");
                        events.push(GameEvent::TroopDespawned { troop: id });
                    }
                }
            }
        }
    }

    fn complete_spawn(&mut self, order: SpawnOrder, events: &mut TickEvents) {
        let Some(kind) = self.config.troop_kind(order.kind).cloned() else {
            tracing::error!(kind = order.kind, "{}", GameError::UnknownTroopKind(order.kind));
            return;
        };
        let Some(base_position) = self.bases.get(&order.team).map(HomeBase::position) else {
            tracing::error!(team = %order.team, "{}", GameError::MissingBase(order.team));
            return;
        };
        let nav = ArenaNavMesh::from_arena(&self.config.arena);
        let position = choose_spawn_point(base_position, &self.config.spawn, &nav, &mut self.rng);

        let id = self.allocate_id();
        let troop = Troop::new(id, order.team, order.kind, &kind, position, order.owner, self.tick);
        self.troops.insert(id, troop);
        tracing::debug!(troop = id, team = %order.team, kind = %kind.name, "Troop spawned");
        events.push(GameEvent::TroopSpawned {
            troop: id,
            team: order.team,
            kind: order.kind,
            position,
        });
    }

    fn run_phase_checks(&mut self, events: &mut TickEvents) {
        if self.phase() != MatchPhase::WaitingForPlayers {
            return;
        }
        self.spawn_missing_bases(events);

        let ready = self.registry.all_bases_registered();
        if let Some(transition) = self.match_state.try_begin_gameplay(self.role, ready) {
            events.push(phase_event(transition));
            self.issue_starter_troops();
        }
    }

    fn spawn_missing_bases(&mut self, events: &mut TickEvents) {
        let teams: Vec<Team> = self.registry.players().map(|p| p.team).collect();
        for team in teams {
            if self.registry.base_of(team).is_some() {
                continue;
            }
            let id = self.allocate_id();
            let position = self.config.arena.base_point(team);
            let base = HomeBase::new(
                id,
                team,
                position,
                self.config.starting_gold,
                self.config.base_max_health,
                &self.config.upgrades,
            );
            self.registry.register_base(team, id);
            self.bases.insert(team, base);
            tracing::info!(%team, base = id, "Home base created");
            events.push(GameEvent::BaseCreated {
                team,
                base: id,
                position,
            });
        }
    }

    fn issue_starter_troops(&mut self) {
        let Some(kind) = self.config.starter_troop else {
            return;
        };
        let players: Vec<(ClientId, Team)> =
            self.registry.players().map(|p| (p.client, p.team)).collect();
        for (client, team) in players {
            self.request_spawn(team, kind, Some(client));
        }
    }

    fn run_income(&mut self, events: &mut TickEvents) {
        let interval = self.config.income_interval_ticks;
        for base in self.bases.values_mut() {
            if let Some(amount) = base.accrue_income(self.role, 1, interval) {
                tracing::debug!(team = %base.team(), %amount, gold = %base.gold(), "Income paid");
                events.push(GameEvent::GoldChanged {
                    team: base.team(),
                    gold: base.gold(),
                });
            }
        }
    }

    fn run_troop_ai(&mut self, now: u64, events: &mut TickEvents) {
        let nav = ArenaNavMesh::from_arena(&self.config.arena);
        let ids: Vec<EntityId> = self.troops.keys().copied().collect();

        for id in ids {
            let Some(mut troop) = self.troops.remove(&id) else {
                continue;
            };
            let ctx = AiContext {
                tick: now,
                mode: self.registry.mode_of(troop.team()),
                config: &self.config.ai,
            };
            let view = WorldView {
                troops: &self.troops,
                bases: &self.bases,
            };
            let strike = ai::think(&mut troop, &ctx, &view, &nav, &mut self.rng);
            self.troops.insert(id, troop);

            if let Some(strike) = strike {
                self.apply_strike(strike, events);
            }
        }
    }

    fn apply_strike(&mut self, strike: Strike, events: &mut TickEvents) {
        let role = self.role;
        let hit = if let Some(troop) = self.troops.get_mut(&strike.target) {
            let outcome = troop.take_damage(role, strike.damage);
            (outcome, EntityKind::Troop, troop.team(), troop.health().current())
        } else if let Some(base) = self.bases.values_mut().find(|b| b.id() == strike.target) {
            let outcome = base.take_damage(role, strike.damage);
            (outcome, EntityKind::Base, base.team(), base.health().current())
        } else {
            tracing::warn!(
                attacker = strike.attacker,
                "{}",
                GameError::EntityNotFound(strike.target)
            );
            return;
        };

        let (outcome, kind, team, remaining) = hit;
        if outcome == DamageOutcome::Ignored {
            return;
        }
        events.push(GameEvent::DamageDealt {
            attacker: strike.attacker,
            target: strike.target,
            amount: outcome.dealt(),
            remaining,
        });
        if outcome.is_kill() {
            self.handle_death(strike.target, kind, team, events);
        }
    }

    fn handle_death(
        &mut self,
        entity: EntityId,
        kind: EntityKind,
        team: Team,
        events: &mut TickEvents,
    ) {
        tracing::debug!(entity, ?kind, %team, "Entity died");
        events.push(GameEvent::EntityDied { entity, kind, team });

        for troop in self.troops.values_mut() {
            troop.forget_if_target(entity);
        }

        match kind {
            EntityKind::Troop => {
                let price = self
                    .troops
                    .get(&entity)
                    .map_or(Fixed::ZERO, |t| t.stats().price);
                self.pay_kill_reward(team.enemy(), entity, price, events);
                let due = self.tick + u64::from(self.config.despawn_delay_ticks);
                self.scheduler
                    .schedule(due, Some(entity), Deferred::Despawn(entity));
            }
            EntityKind::Base => {
                let reported = self
                    .bases
                    .get_mut(&team)
                    .is_some_and(HomeBase::report_defeat);
                if !reported {
                    return;
                }
                if let Some(transition) = self.match_state.end(self.role, team) {
                    tracing::info!(losing_team = %team, tick = self.tick, "Match ended");
                    events.push(phase_event(transition));
                    events.push(GameEvent::MatchEnded { losing_team: team });
                }
            }
        }
    }

    fn pay_kill_reward(
        &mut self,
        team: Team,
        victim: EntityId,
        price: Fixed,
        events: &mut TickEvents,
    ) {
        let amount = price.saturating_mul(self.config.kill_reward_ratio);
        let Some(base) = self.bases.get_mut(&team) else {
            return;
        };
        if base.credit(self.role, amount) {
            tracing::debug!(%team, victim, %amount, "Kill reward paid");
            events.push(GameEvent::KillReward {
                team,
                victim,
                amount,
            });
            events.push(GameEvent::GoldChanged {
                team,
                gold: base.gold(),
            });
        }
    }

    fn push_gold(&mut self, team: Team) {
        if let Some(base) = self.bases.get(&team) {
            self.pending.push(GameEvent::GoldChanged {
                team,
                gold: base.gold(),
            });
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Build the observer-visible view of the current state.
    #[must_use]
    pub fn world_snapshot(&self) -> WorldSnapshot {
        let bases = self
            .bases
            .values()
            .map(|base| BaseView {
                id: base.id(),
                team: base.team(),
                position: base.position(),
                gold: base.gold(),
                income_rate: base.income_rate(),
                tier: base.tier(),
                next_upgrade_cost: base.next_upgrade_cost(&self.config.upgrades),
                health: base.health().current(),
                max_health: base.health().max(),
                alive: base.is_alive(),
            })
            .collect();
        let troops = self
            .troops
            .values()
            .map(|troop| TroopView {
                id: troop.id(),
                team: troop.team(),
                kind: troop.kind(),
                position: troop.position(),
                state: troop.state(),
                target: troop.target(),
                health: troop.health().current(),
                max_health: troop.health().max(),
                alive: troop.is_alive(),
            })
            .collect();
        WorldSnapshot {
            tick: self.tick,
            phase: self.phase(),
            losing_team: self.match_state.losing_team(),
            bases,
            troops,
        }
    }

    /// Publish the current state and return its versioned snapshot.
    ///
    /// The version only moves when the published state changed.
    pub fn publish(&mut self) -> Snapshot<WorldSnapshot> {
        let snapshot = self.world_snapshot();
        self.published.set(self.role, snapshot);
        self.published.snapshot()
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used to compare runs: identical config, seed and inputs must
    /// produce identical hashes on every platform.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.match_state.phase().hash(&mut hasher);
        self.match_state.losing_team().hash(&mut hasher);
        self.registry.hash(&mut hasher);

        for base in self.bases.values() {
            base.hash(&mut hasher);
        }
        self.troops.len().hash(&mut hasher);
        for troop in self.troops.values() {
            troop.hash(&mut hasher);
        }

        self.scheduler.hash(&mut hasher);
        self.rng.hash(&mut hasher);
        self.next_entity_id.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the full simulation state.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore a simulation serialized with [`serialize`](Self::serialize).
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize simulation: {e}")))
    }
}

fn phase_event(transition: PhaseTransition) -> GameEvent {
    GameEvent::PhaseChanged {
        from: transition.from,
        to: transition.to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn connect_both(sim: &mut Simulation) {
        sim.submit(MatchInput::Connect { client: 1 });
        sim.submit(MatchInput::Connect { client: 2 });
    }

    fn place(sim: &mut Simulation, client: ClientId) {
        sim.submit(MatchInput::Request {
            client,
            request: ClientRequest::PlaceMap,
        });
    }

    fn quiet_config() -> GameConfig {
        GameConfig {
            starter_troop: None,
            ..GameConfig::default()
        }
    }

    fn live_match(config: GameConfig) -> Simulation {
        let mut sim = Simulation::new(config).unwrap();
        connect_both(&mut sim);
        place(&mut sim, 1);
        place(&mut sim, 2);
        sim.tick();
        assert_eq!(sim.phase(), MatchPhase::Gameplay);
        sim
    }

    #[test]
    fn starts_in_placing_map() {
        let mut sim = Simulation::new(GameConfig::default()).unwrap();
        assert_eq!(sim.phase(), MatchPhase::PlacingMap);
        let events = sim.tick();
        assert_eq!(events.tick, 0);
        assert_eq!(
            events.events,
            vec![GameEvent::PhaseChanged {
                from: MatchPhase::Initializing,
                to: MatchPhase::PlacingMap
            }]
        );
        assert_eq!(sim.get_tick(), 1);
    }

    #[test]
    fn waiting_requires_both_placements() {
        let mut sim = Simulation::new(GameConfig::default()).unwrap();
        connect_both(&mut sim);
        place(&mut sim, 1);
        place(&mut sim, 1);
        assert_eq!(sim.registry().placed_count(), 1);
        assert_eq!(sim.phase(), MatchPhase::PlacingMap);

        place(&mut sim, 2);
        assert_eq!(sim.phase(), MatchPhase::WaitingForPlayers);
        place(&mut sim, 2);
        assert_eq!(sim.registry().placed_count(), 2);
    }

    #[test]
    fn bases_are_created_before_gameplay() {
        let sim = live_match(quiet_config());
        let red = sim.base(Team::Red).unwrap();
        let blue = sim.base(Team::Blue).unwrap();
        assert_eq!(red.gold(), fx(100));
        assert_eq!(red.position(), Vec2Fixed::from_ints(0, -6));
        assert_eq!(blue.position(), Vec2Fixed::from_ints(0, 6));
    }

    #[test]
    fn starter_troops_are_paid_for() {
        let mut sim = live_match(GameConfig::default());
        assert_eq!(sim.base(Team::Red).unwrap().gold(), fx(70));
        assert_eq!(sim.base(Team::Blue).unwrap().gold(), fx(70));
        for _ in 0..20 {
            sim.tick();
        }
        assert_eq!(sim.alive_troops(Team::Red), 1);
        assert_eq!(sim.alive_troops(Team::Blue), 1);
    }

    #[test]
    fn income_flows_only_during_gameplay() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        for _ in 0..100 {
            sim.tick();
        }
        assert!(sim.base(Team::Red).is_none());

        let mut sim = live_match(quiet_config());
        // The tick that entered Gameplay already counted one income tick.
        for _ in 0..39 {
            sim.tick();
        }
        assert_eq!(sim.base(Team::Red).unwrap().gold(), fx(105));
    }

    #[test]
    fn unknown_client_request_is_ignored() {
        let mut sim = live_match(quiet_config());
        sim.submit(MatchInput::Request {
            client: 42,
            request: ClientRequest::Upgrade,
        });
        assert!(sim.tick().is_empty());
        assert_eq!(sim.base(Team::Red).unwrap().tier(), 0);
    }

    #[test]
    fn rejected_spawn_is_reported() {
        let mut sim = live_match(quiet_config());
        sim.submit(MatchInput::Request {
            client: 1,
            request: ClientRequest::Spawn { kind: 2 },
        });
        let events = sim.tick();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::SpawnRejected {
                team: Team::Red,
                kind: 2,
                reason: RejectReason::InsufficientGold { .. }
            }
        )));
        assert_eq!(sim.base(Team::Red).unwrap().gold(), fx(100));
    }

    #[test]
    fn spawned_troop_appears_after_cast_time() {
        let mut sim = live_match(quiet_config());
        sim.submit(MatchInput::Request {
            client: 2,
            request: ClientRequest::Spawn { kind: 0 },
        });
        assert_eq!(sim.base(Team::Blue).unwrap().gold(), fx(70));

        for _ in 0..20 {
            let events = sim.tick();
            assert!(!events
                .iter()
                .any(|e| matches!(e, GameEvent::TroopSpawned { .. })));
        }
        let events = sim.tick();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::TroopSpawned {
                team: Team::Blue,
                kind: 0,
                ..
            }
        )));
        let troop = sim.troops().next().unwrap();
        assert!(troop
            .position()
            .within(Vec2Fixed::from_ints(0, 6), fx(3)));
    }

    #[test]
    fn troop_kill_pays_reward_and_despawns() {
        let mut sim = live_match(quiet_config());
        let red = sim
            .spawn_troop_at(Team::Red, 0, Vec2Fixed::from_ints(0, 0))
            .unwrap();
        let blue = sim
            .spawn_troop_at(Team::Blue, 0, Vec2Fixed::from_ints(1, 0))
            .unwrap();

        let mut died_at = None;
        for _ in 0..400 {
            let events = sim.tick();
            if events.deaths().next().is_some() {
                died_at = Some(events.tick);
                break;
            }
        }
        assert!(died_at.is_some());
        let (winner, survivor, loser) = if sim.troop(red).unwrap().is_alive() {
            (Team::Red, red, blue)
        } else {
            (Team::Blue, blue, red)
        };
        let survivor = sim.troop(survivor).unwrap();
        assert_eq!(survivor.target(), None);
        assert_ne!(survivor.state(), AiState::Attacking);
        // Knight price 30 * reward ratio 0.5, on top of income.
        assert!(sim.base(winner).unwrap().gold() >= fx(115));

        for _ in 0..100 {
            sim.tick();
        }
        assert!(sim.troop(loser).is_none());
    }

    #[test]
    fn base_death_ends_match() {
        let config = GameConfig {
            base_max_health: fx(5),
            ..quiet_config()
        };
        let mut sim = live_match(config);
        sim.submit(MatchInput::Request {
            client: 1,
            request: ClientRequest::SetMode {
                mode: AiMode::Attack,
            },
        });
        sim.spawn_troop_at(Team::Red, 0, Vec2Fixed::from_ints(0, 5))
            .unwrap();

        let mut ended = false;
        for _ in 0..200 {
            let events = sim.tick();
            if events.iter().any(|e| {
                matches!(
                    e,
                    GameEvent::MatchEnded {
                        losing_team: Team::Blue
                    }
                )
            }) {
                ended = true;
                break;
            }
        }
        assert!(ended);
        assert_eq!(sim.phase(), MatchPhase::GameOver);
        assert_eq!(sim.match_state().losing_team(), Some(Team::Blue));
    }

    #[test]
    fn defend_mode_recalls_troops() {
        let mut sim = live_match(quiet_config());
        let id = sim
            .spawn_troop_at(Team::Red, 0, Vec2Fixed::from_ints(0, 0))
            .unwrap();
        sim.submit(MatchInput::Request {
            client: 1,
            request: ClientRequest::SetMode {
                mode: AiMode::Defend,
            },
        });
        assert_eq!(sim.troop(id).unwrap().state(), AiState::Retreating);
    }

    #[test]
    fn replica_ignores_everything() {
        let mut sim = Simulation::with_role(GameConfig::default(), Role::Replica).unwrap();
        connect_both(&mut sim);
        assert_eq!(sim.phase(), MatchPhase::Initializing);
        assert_eq!(sim.registry().player_count(), 0);
        assert!(sim.tick().is_empty());
        assert_eq!(sim.get_tick(), 0);
    }

    #[test]
    fn serialization_roundtrip_preserves_hash() {
        let mut sim = live_match(GameConfig::default());
        for _ in 0..50 {
            sim.tick();
        }
        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());

        sim.tick();
        restored.tick();
        assert_eq!(sim.state_hash(), restored.state_hash());
    }

    #[test]
    fn publish_bumps_version_on_change_only() {
        let mut sim = live_match(quiet_config());
        let first = sim.publish();
        let again = sim.publish();
        assert_eq!(first.version, again.version);
        sim.tick();
        assert!(sim.publish().version > first.version);
    }
}
