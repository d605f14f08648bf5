//! Troop spawn gate.
//!
//! A spawn request is validated and paid for the moment it arrives, then
//! the troop appears after the kind's cast time. Paying up front means two
//! requests arriving back to back can never both spend the same gold. The
//! cast cannot be cancelled: once paid, the troop is created no matter what
//! happens to the match in the meantime.

use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::components::ClientId;
use crate::config::{GameConfig, SpawnConfig};
use crate::economy::HomeBase;
use crate::events::RejectReason;
use crate::math::{Fixed, Vec2Fixed};
use crate::navigation::NavMesh;
use crate::rng::SimRng;
use crate::team::Team;

/// A paid-for troop waiting out its cast time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnOrder {
    /// Team the troop fights for.
    pub team: Team,
    /// Roster index.
    pub kind: usize,
    /// Client that asked for it.
    pub owner: Option<ClientId>,
}

/// Outcome of the spawn gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision {
    /// Gold was debited; the troop appears on `ready_tick`.
    Approved {
        /// Gold debited.
        price: Fixed,
        /// Tick on which the troop appears.
        ready_tick: u64,
    },
    /// Nothing was debited.
    Rejected(RejectReason),
    /// Issued from a replica; nothing changed.
    Ignored,
}

/// Validate and pay for a spawn of roster entry `kind`.
///
/// Checks run in order: roster index, base presence, affordability.
pub fn approve_spawn(
    role: Role,
    config: &GameConfig,
    base: Option<&mut HomeBase>,
    kind: usize,
    now: u64,
) -> SpawnDecision {
    if !role.is_authority() {
        return SpawnDecision::Ignored;
    }
    let Some(troop_kind) = config.troop_kind(kind) else {
        tracing::warn!(kind, "Spawn request for unknown troop kind");
        return SpawnDecision::Rejected(RejectReason::UnknownTroopKind(kind));
    };
    let Some(base) = base else {
        tracing::warn!(kind, "Spawn request for a team without a base");
        return SpawnDecision::Rejected(RejectReason::MissingBase);
    };

    match base.try_debit(role, troop_kind.price) {
        Ok(true) => {
            let ready_tick = now + u64::from(troop_kind.spawn_ticks);
            tracing::debug!(
                team = %base.team(),
                kind = %troop_kind.name,
                price = %troop_kind.price,
                ready_tick,
                "Spawn approved"
            );
            SpawnDecision::Approved {
                price: troop_kind.price,
                ready_tick,
            }
        }
        Ok(false) => SpawnDecision::Ignored,
        Err(reason) => SpawnDecision::Rejected(reason),
    }
}

/// Pick where a troop appears around its base.
///
/// Random points within the scatter radius are snapped onto the nav mesh;
/// if none of the attempts lands, the last raw point is used as is.
pub fn choose_spawn_point(
    base_position: Vec2Fixed,
    spawn: &SpawnConfig,
    nav: &dyn NavMesh,
    rng: &mut SimRng,
) -> Vec2Fixed {
    let mut candidate = rng.point_in_disk(base_position, spawn.scatter_radius);
    for _ in 0..spawn.max_sample_attempts {
        if let Some(snapped) = nav.sample_position(candidate, spawn.scatter_radius) {
            return snapped;
        }
        candidate = rng.point_in_disk(base_position, spawn.scatter_radius);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::ArenaNavMesh;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn base_with(gold: i32, config: &GameConfig) -> HomeBase {
        HomeBase::new(
            1,
            Team::Red,
            Vec2Fixed::ZERO,
            fx(gold),
            config.base_max_health,
            &config.upgrades,
        )
    }

    #[test]
    fn approved_spawn_debits_price() {
        let config = GameConfig::default();
        let mut base = base_with(100, &config);
        let decision = approve_spawn(Role::Authority, &config, Some(&mut base), 0, 7);
        assert_eq!(
            decision,
            SpawnDecision::Approved {
                price: fx(30),
                ready_tick: 27
            }
        );
        assert_eq!(base.gold(), fx(70));
    }

    #[test]
    fn unaffordable_spawn_keeps_gold() {
        let config = GameConfig::default();
        let mut base = base_with(20, &config);
        let decision = approve_spawn(Role::Authority, &config, Some(&mut base), 0, 0);
        assert!(matches!(
            decision,
            SpawnDecision::Rejected(RejectReason::InsufficientGold { .. })
        ));
        assert_eq!(base.gold(), fx(20));
    }

    #[test]
    fn unknown_kind_is_checked_before_funds() {
        let config = GameConfig::default();
        let mut base = base_with(0, &config);
        assert_eq!(
            approve_spawn(Role::Authority, &config, Some(&mut base), 9, 0),
            SpawnDecision::Rejected(RejectReason::UnknownTroopKind(9))
        );
        assert_eq!(
            approve_spawn(Role::Authority, &config, None, 0, 0),
            SpawnDecision::Rejected(RejectReason::MissingBase)
        );
    }

    #[test]
    fn back_to_back_requests_cannot_double_spend() {
        let config = GameConfig::default();
        let mut base = base_with(50, &config);
        let first = approve_spawn(Role::Authority, &config, Some(&mut base), 0, 0);
        let second = approve_spawn(Role::Authority, &config, Some(&mut base), 0, 0);
        assert!(matches!(first, SpawnDecision::Approved { .. }));
        assert!(matches!(second, SpawnDecision::Rejected(_)));
        assert_eq!(base.gold(), fx(20));
    }

    #[test]
    fn replica_request_is_ignored() {
        let config = GameConfig::default();
        let mut base = base_with(100, &config);
        assert_eq!(
            approve_spawn(Role::Replica, &config, Some(&mut base), 0, 0),
            SpawnDecision::Ignored
        );
        assert_eq!(base.gold(), fx(100));
    }

    #[test]
    fn spawn_point_lands_near_base() {
        let nav = ArenaNavMesh::new(Vec2Fixed::from_ints(8, 8));
        let mut rng = SimRng::new(5);
        let base = Vec2Fixed::from_ints(0, -6);
        let spawn = SpawnConfig::default();
        for _ in 0..50 {
            let point = choose_spawn_point(base, &spawn, &nav, &mut rng);
            assert!(point.within(base, spawn.scatter_radius + fx(1)));
        }
    }
}
