//! Troop combat AI.
//!
//! A troop runs a small state machine:
//!
//! - **Idle**: scan for enemies. When defending, also patrol random points
//!   around the spawn point. When attacking, fall back to the enemy base if
//!   no enemy troop is in sight.
//! - **Chasing**: walk toward the target; drop it when it dies, leaves
//!   detection range (unless it is the base) or, when defending, when the
//!   troop strays too far from home. Switch to Attacking once in reach.
//! - **Attacking**: hit the target whenever the cooldown allows; go back to
//!   Chasing if it steps out of reach.
//! - **Retreating**: walk home, then go Idle.
//!
//! Decisions are taken every `update_interval_ticks` per troop. Movement
//! happens every tick in [`Troop::advance`].
//!
//! Target acquisition is first-match: candidates are enumerated in entity-id
//! order and the first living enemy troop wins, not the nearest one.

use crate::components::{AiMode, EntityId, EntityKind};
use crate::config::AiConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::navigation::NavMesh;
use crate::rng::SimRng;
use crate::team::Team;
use crate::troop::{AiState, Troop};

/// What the AI may know about another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    /// Entity id.
    pub id: EntityId,
    /// Base or troop.
    pub kind: EntityKind,
    /// Owning team.
    pub team: Team,
    /// Current position.
    pub position: Vec2Fixed,
    /// Whether it still has hit points.
    pub alive: bool,
}

/// Read-only view of the battlefield used while a troop decides.
pub trait Battlefield {
    /// Look up any entity.
    fn lookup(&self, id: EntityId) -> Option<TargetInfo>;

    /// Troops within `range` of `center`, in entity-id order.
    fn troops_within(&self, center: Vec2Fixed, range: Fixed) -> Vec<TargetInfo>;

    /// Home base of `team`'s opponent.
    fn enemy_base(&self, team: Team) -> Option<TargetInfo>;
}

/// Per-tick inputs shared by every troop of a team.
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    /// Current tick.
    pub tick: u64,
    /// The owning player's standing order.
    pub mode: AiMode,
    /// AI tuning.
    pub config: &'a AiConfig,
}

/// An attack the troop decided to land this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Attacking troop.
    pub attacker: EntityId,
    /// Entity to damage.
    pub target: EntityId,
    /// Damage to apply.
    pub damage: Fixed,
}

/// Run one decision step for `troop` if its update interval has elapsed.
pub fn think(
    troop: &mut Troop,
    ctx: &AiContext<'_>,
    field: &impl Battlefield,
    nav: &dyn NavMesh,
    rng: &mut SimRng,
) -> Option<Strike> {
    if !troop.is_alive() || ctx.tick < troop.next_think_tick {
        return None;
    }
    troop.next_think_tick = ctx.tick + u64::from(ctx.config.update_interval_ticks.max(1));

    let before = troop.state;
    let strike = match troop.state {
        AiState::Idle => {
            idle(troop, ctx, field, nav, rng);
            None
        }
        AiState::Chasing => chase(troop, ctx, field, nav),
        AiState::Attacking => attack(troop, ctx, field, nav),
        AiState::Retreating => {
            retreat(troop, ctx, field);
            None
        }
    };

    if troop.state != before {
        tracing::debug!(
            troop = troop.id,
            from = ?before,
            to = ?troop.state,
            target = ?troop.target,
            "Troop AI transition"
        );
    }
    strike
}

fn idle(
    troop: &mut Troop,
    ctx: &AiContext<'_>,
    field: &impl Battlefield,
    nav: &dyn NavMesh,
    rng: &mut SimRng,
) {
    if ctx.mode == AiMode::Defend && troop.remaining_distance() < ctx.config.patrol_tolerance {
        let point = rng.point_in_disk(troop.home, ctx.config.defense_radius);
        if let Some(snapped) = nav.sample_position(point, ctx.config.nav_sample_distance) {
            troop.destination = Some(snapped);
        }
    }
    detect(troop, ctx, field);
}

fn chase(
    troop: &mut Troop,
    ctx: &AiContext<'_>,
    field: &impl Battlefield,
    nav: &dyn NavMesh,
) -> Option<Strike> {
    let Some(target) = live_target(troop, field) else {
        troop.clear_target();
        return None;
    };

    let strayed = ctx.mode == AiMode::Defend
        && troop.position.distance_squared(troop.home)
            >= ctx.config.defense_radius.saturating_mul(ctx.config.defense_radius);
    let escaped =
        !troop.chasing_base && !troop.position.within(target.position, ctx.config.detection_range);
    if strayed || escaped {
        troop.clear_target();
        return None;
    }

    if troop.position.within(target.position, troop.stats.attack_range) {
        troop.state = AiState::Attacking;
        troop.destination = None;
        return try_strike(troop, ctx, target.id);
    }

    head_towards(troop, target.position, ctx, nav);
    detect(troop, ctx, field);
    None
}

fn attack(
    troop: &mut Troop,
    ctx: &AiContext<'_>,
    field: &impl Battlefield,
    nav: &dyn NavMesh,
) -> Option<Strike> {
    let Some(target) = live_target(troop, field) else {
        troop.clear_target();
        return None;
    };

    if !troop.position.within(target.position, troop.stats.attack_range) {
        troop.state = AiState::Chasing;
        head_towards(troop, target.position, ctx, nav);
        return None;
    }

    let strike = try_strike(troop, ctx, target.id);
    detect(troop, ctx, field);
    strike
}

fn retreat(troop: &mut Troop, ctx: &AiContext<'_>, field: &impl Battlefield) {
    if troop.position.distance(troop.home) < ctx.config.retreat_tolerance {
        troop.state = AiState::Idle;
        troop.destination = None;
    }
    if ctx.mode == AiMode::Attack {
        detect(troop, ctx, field);
    }
}

fn live_target(troop: &Troop, field: &impl Battlefield) -> Option<TargetInfo> {
    troop
        .target
        .and_then(|id| field.lookup(id))
        .filter(|info| info.alive)
}

fn head_towards(troop: &mut Troop, point: Vec2Fixed, ctx: &AiContext<'_>, nav: &dyn NavMesh) {
    if let Some(snapped) = nav.sample_position(point, ctx.config.nav_sample_distance) {
        troop.destination = Some(snapped);
    }
}

fn try_strike(troop: &mut Troop, ctx: &AiContext<'_>, target: EntityId) -> Option<Strike> {
    let cooldown = u64::from(troop.stats.attack_cooldown_ticks);
    let ready = troop
        .last_attack_tick
        .map_or(true, |last| ctx.tick.saturating_sub(last) >= cooldown);
    if !ready {
        return None;
    }
    troop.last_attack_tick = Some(ctx.tick);
    Some(Strike {
        attacker: troop.id,
        target,
        damage: troop.stats.attack_damage,
    })
}

/// Scan for an enemy and lock on to the first one found.
fn detect(troop: &mut Troop, ctx: &AiContext<'_>, field: &impl Battlefield) {
    let found = field
        .troops_within(troop.position, ctx.config.detection_range)
        .into_iter()
        .filter(|info| info.id != troop.id)
        .take(ctx.config.detection_capacity)
        .find(|info| info.team != troop.team && info.alive);

    if let Some(enemy) = found {
        set_target(troop, enemy.id, false);
        return;
    }

    if ctx.mode == AiMode::Attack {
        if let Some(base) = field.enemy_base(troop.team).filter(|b| b.alive) {
            set_target(troop, base.id, true);
        }
    }
}

fn set_target(troop: &mut Troop, target: EntityId, is_base: bool) {
    if troop.target == Some(target) {
        return;
    }
    troop.target = Some(target);
    troop.chasing_base = is_base;
    if troop.state != AiState::Attacking {
        troop.state = AiState::Chasing;
    }
}
