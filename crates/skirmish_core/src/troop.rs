//! Troop state: combat stats, hit points and AI bookkeeping.
//!
//! Decision making lives in [`crate::ai`]; this module only holds the data
//! a troop carries between ticks and the reactions that are not decisions
//! (moving along its path, forgetting a dead target, being recalled).

use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::components::{ClientId, EntityId};
use crate::config::TroopKind;
use crate::health::{DamageOutcome, Health};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::team::Team;

/// Troop AI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AiState {
    /// Looking for something to fight; patrolling when defending.
    #[default]
    Idle,
    /// Moving toward a target.
    Chasing,
    /// Walking back to the spawn point.
    Retreating,
    /// Standing still and hitting a target in range.
    Attacking,
}

/// Combat numbers copied from the troop kind at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TroopStats {
    /// Damage per hit.
    #[serde(with = "fixed_serde")]
    pub attack_damage: Fixed,
    /// Reach of a hit.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Minimum ticks between hits.
    pub attack_cooldown_ticks: u32,
    /// Distance moved per tick.
    #[serde(with = "fixed_serde")]
    pub speed_per_tick: Fixed,
    /// What the troop cost; drives the kill reward.
    #[serde(with = "fixed_serde")]
    pub price: Fixed,
}

impl From<&TroopKind> for TroopStats {
    fn from(kind: &TroopKind) -> Self {
        Self {
            attack_damage: kind.attack_damage,
            attack_range: kind.attack_range,
            attack_cooldown_ticks: kind.attack_cooldown_ticks,
            speed_per_tick: kind.speed_per_tick(),
            price: kind.price,
        }
    }
}

/// A combat unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Troop {
    pub(crate) id: EntityId,
    pub(crate) team: Team,
    pub(crate) kind: usize,
    pub(crate) owner: Option<ClientId>,
    pub(crate) position: Vec2Fixed,
    pub(crate) home: Vec2Fixed,
    pub(crate) stats: TroopStats,
    pub(crate) health: Health,
    pub(crate) state: AiState,
    pub(crate) target: Option<EntityId>,
    pub(crate) chasing_base: bool,
    pub(crate) destination: Option<Vec2Fixed>,
    pub(crate) last_attack_tick: Option<u64>,
    pub(crate) next_think_tick: u64,
}

impl Troop {
    /// Create a troop of `kind` standing at `position`, which also becomes
    /// its home point. It first thinks on `spawn_tick`.
    #[must_use]
    pub fn new(
        id: EntityId,
        team: Team,
        kind_index: usize,
        kind: &TroopKind,
        position: Vec2Fixed,
        owner: Option<ClientId>,
        spawn_tick: u64,
    ) -> Self {
        Self {
            id,
            team,
            kind: kind_index,
            owner,
            position,
            home: position,
            stats: TroopStats::from(kind),
            health: Health::new(kind.max_health),
            state: AiState::Idle,
            target: None,
            chasing_base: false,
            destination: None,
            last_attack_tick: None,
            next_think_tick: spawn_tick,
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Roster index of the troop kind.
    #[must_use]
    pub const fn kind(&self) -> usize {
        self.kind
    }

    /// Client that requested the spawn, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<ClientId> {
        self.owner
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Spawn point the troop defends and retreats to.
    #[must_use]
    pub const fn home(&self) -> Vec2Fixed {
        self.home
    }

    /// Combat stats.
    #[must_use]
    pub const fn stats(&self) -> &TroopStats {
        &self.stats
    }

    /// Hit points.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Current AI state.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Where the troop is walking to.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec2Fixed> {
        self.destination
    }

    /// Tick of the last landed attack.
    #[must_use]
    pub const fn last_attack_tick(&self) -> Option<u64> {
        self.last_attack_tick
    }

    /// Check whether the troop is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Distance left to the current destination.
    #[must_use]
    pub fn remaining_distance(&self) -> Fixed {
        self.destination
            .map_or(Fixed::ZERO, |dest| self.position.distance(dest))
    }

    /// Apply damage. A killed troop stops where it stands.
    pub fn take_damage(&mut self, role: Role, amount: Fixed) -> DamageOutcome {
        let outcome = self.health.apply_damage(role, amount);
        if outcome.is_kill() {
            self.destination = None;
        }
        outcome
    }

    /// Drop the current target. A troop that was chasing or attacking goes idle.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.chasing_base = false;
        if matches!(self.state, AiState::Chasing | AiState::Attacking) {
            self.state = AiState::Idle;
        }
    }

    /// React to another entity's death.
    ///
    /// Returns `true` if the dead entity was this troop's target.
    pub fn forget_if_target(&mut self, dead: EntityId) -> bool {
        if self.target != Some(dead) {
            return false;
        }
        self.clear_target();
        true
    }

    /// Recall the troop to its spawn point.
    pub fn start_retreating(&mut self) {
        if !self.is_alive() {
            return;
        }
        self.target = None;
        self.chasing_base = false;
        self.state = AiState::Retreating;
        self.destination = Some(self.home);
    }

    /// Walk one tick toward the destination.
    ///
    /// Attacking and dead troops hold still. Reaching the destination clears it.
    pub fn advance(&mut self) {
        if !self.is_alive() || self.state == AiState::Attacking {
            return;
        }
        let Some(dest) = self.destination else {
            return;
        };
        self.position = self.position.move_towards(dest, self.stats.speed_per_tick);
        if self.position == dest {
            self.destination = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight_at(x: i32, y: i32) -> Troop {
        Troop::new(1, Team::Red, 0, &TroopKind::knight(), Vec2Fixed::from_ints(x, y), None, 0)
    }

    #[test]
    fn new_troop_is_idle_at_home() {
        let troop = knight_at(2, 3);
        assert_eq!(troop.state(), AiState::Idle);
        assert_eq!(troop.home(), troop.position());
        assert_eq!(troop.stats().attack_range, Fixed::from_num(1));
        assert_eq!(troop.stats().speed_per_tick, Fixed::from_num(1) / Fixed::from_num(20));
    }

    #[test]
    fn advance_reaches_destination() {
        let mut troop = knight_at(0, 0);
        troop.destination = Some(Vec2Fixed::from_ints(0, 1));
        for _ in 0..20 {
            troop.advance();
        }
        assert_eq!(troop.position(), Vec2Fixed::from_ints(0, 1));
        assert_eq!(troop.destination(), None);
    }

    #[test]
    fn attacking_troop_holds_position() {
        let mut troop = knight_at(0, 0);
        troop.state = AiState::Attacking;
        troop.destination = Some(Vec2Fixed::from_ints(5, 0));
        troop.advance();
        assert_eq!(troop.position(), Vec2Fixed::ZERO);
    }

    #[test]
    fn losing_target_while_attacking_goes_idle() {
        let mut troop = knight_at(0, 0);
        troop.state = AiState::Attacking;
        troop.target = Some(9);
        assert!(!troop.forget_if_target(8));
        assert_eq!(troop.state(), AiState::Attacking);
        assert!(troop.forget_if_target(9));
        assert_eq!(troop.state(), AiState::Idle);
        assert_eq!(troop.target(), None);
    }

    #[test]
    fn retreat_heads_home() {
        let mut troop = knight_at(1, 1);
        troop.position = Vec2Fixed::from_ints(4, 1);
        troop.target = Some(3);
        troop.state = AiState::Chasing;
        troop.start_retreating();
        assert_eq!(troop.state(), AiState::Retreating);
        assert_eq!(troop.target(), None);
        assert_eq!(troop.destination(), Some(Vec2Fixed::from_ints(1, 1)));
    }

    #[test]
    fn death_stops_movement() {
        let mut troop = knight_at(0, 0);
        troop.destination = Some(Vec2Fixed::from_ints(3, 0));
        assert!(troop.take_damage(Role::Authority, Fixed::from_num(100)).is_kill());
        troop.advance();
        assert_eq!(troop.position(), Vec2Fixed::ZERO);
        troop.start_retreating();
        assert_eq!(troop.state(), AiState::Idle);
    }
}
