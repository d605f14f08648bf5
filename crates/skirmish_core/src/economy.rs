//! Home base economy.
//!
//! Each team owns one base that holds gold, earns income on a fixed
//! interval while the match is live, and climbs an upgrade ladder that
//! raises that income. All mutations are authority-only; a replica calling
//! any of them changes nothing.
//!
//! Income uses an accumulator: elapsed ticks are counted and every full
//! interval pays out exactly once, so `k` intervals always pay `k * rate`.

use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::components::EntityId;
use crate::config::UpgradeTier;
use crate::events::RejectReason;
use crate::health::{DamageOutcome, Health};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::team::Team;

/// Result of an upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Gold was debited and the tier advanced.
    Applied {
        /// New tier.
        tier: usize,
        /// Gold spent.
        cost: Fixed,
        /// Income per payout at the new tier.
        income: Fixed,
    },
    /// Nothing changed.
    Rejected(RejectReason),
    /// Issued from a replica; nothing changed.
    Ignored,
}

/// A team's home base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HomeBase {
    id: EntityId,
    team: Team,
    position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    gold: Fixed,
    #[serde(with = "fixed_serde")]
    income_rate: Fixed,
    tier: usize,
    health: Health,
    ticks_since_income: u32,
    defeat_reported: bool,
}

impl HomeBase {
    /// Create a base at tier 0 of `upgrades`.
    #[must_use]
    pub fn new(
        id: EntityId,
        team: Team,
        position: Vec2Fixed,
        starting_gold: Fixed,
        max_health: Fixed,
        upgrades: &[UpgradeTier],
    ) -> Self {
        Self {
            id,
            team,
            position,
            gold: starting_gold.max(Fixed::ZERO),
            income_rate: upgrades.first().map_or(Fixed::ZERO, |tier| tier.income),
            tier: 0,
            health: Health::new(max_health),
            ticks_since_income: 0,
            defeat_reported: false,
        }
    }

    /// Base entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Where the base stands.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Current gold.
    #[must_use]
    pub const fn gold(&self) -> Fixed {
        self.gold
    }

    /// Gold paid per income interval.
    #[must_use]
    pub const fn income_rate(&self) -> Fixed {
        self.income_rate
    }

    /// Current upgrade tier.
    #[must_use]
    pub const fn tier(&self) -> usize {
        self.tier
    }

    /// The base's hit points.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Check whether the base still stands.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Cost of the next tier, `None` at the top of the ladder.
    #[must_use]
    pub fn next_upgrade_cost(&self, upgrades: &[UpgradeTier]) -> Option<Fixed> {
        upgrades.get(self.tier + 1).map(|tier| tier.cost)
    }

    /// Count `elapsed` ticks toward income and pay out every completed interval.
    ///
    /// Returns the gold added, if any.
    pub fn accrue_income(&mut self, role: Role, elapsed: u32, interval: u32) -> Option<Fixed> {
        if !role.is_authority() || interval == 0 {
            return None;
        }
        self.ticks_since_income = self.ticks_since_income.saturating_add(elapsed);

        let mut paid = Fixed::ZERO;
        while self.ticks_since_income >= interval {
            self.ticks_since_income -= interval;
            paid = paid.saturating_add(self.income_rate);
        }
        if paid == Fixed::ZERO {
            return None;
        }
        self.gold = self.gold.saturating_add(paid);
        Some(paid)
    }

    /// Check affordability without changing anything.
    pub fn check_funds(&self, amount: Fixed) -> Result<(), RejectReason> {
        if self.gold >= amount {
            Ok(())
        } else {
            Err(RejectReason::InsufficientGold {
                required: amount,
                available: self.gold,
            })
        }
    }

    /// Debit `amount` if the base can pay for it.
    ///
    /// A replica call is reported as `Ok(false)`: nothing was debited,
    /// but there is nothing to reject either.
    pub fn try_debit(&mut self, role: Role, amount: Fixed) -> Result<bool, RejectReason> {
        if !role.is_authority() {
            tracing::trace!(team = %self.team, "Ignoring debit from non-authoritative side");
            return Ok(false);
        }
        self.check_funds(amount)?;
        self.gold -= amount;
        Ok(true)
    }

    /// Add gold, e.g. a kill reward. Non-positive amounts are ignored.
    pub fn credit(&mut self, role: Role, amount: Fixed) -> bool {
        if !role.is_authority() || amount <= Fixed::ZERO {
            return false;
        }
        self.gold = self.gold.saturating_add(amount);
        true
    }

    /// Advance one upgrade tier if affordable.
    pub fn request_upgrade(&mut self, role: Role, upgrades: &[UpgradeTier]) -> UpgradeOutcome {
        if !role.is_authority() {
            return UpgradeOutcome::Ignored;
        }
        let Some(next) = upgrades.get(self.tier + 1) else {
            return UpgradeOutcome::Rejected(RejectReason::MaxTier);
        };
        if let Err(reason) = self.check_funds(next.cost) {
            return UpgradeOutcome::Rejected(reason);
        }

        self.gold -= next.cost;
        self.tier += 1;
        self.income_rate = next.income;
        tracing::info!(
            team = %self.team,
            tier = self.tier,
            income = %self.income_rate,
            "Base upgraded"
        );
        UpgradeOutcome::Applied {
            tier: self.tier,
            cost: next.cost,
            income: next.income,
        }
    }

    /// Apply damage to the base.
    pub fn take_damage(&mut self, role: Role, amount: Fixed) -> DamageOutcome {
        self.health.apply_damage(role, amount)
    }

    /// Report this base as fallen. Returns `true` exactly once, after death.
    pub fn report_defeat(&mut self) -> bool {
        if self.health.is_alive() || self.defeat_reported {
            return false;
        }
        self.defeat_reported = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn ladder() -> Vec<UpgradeTier> {
        vec![
            UpgradeTier::new(5, 0),
            UpgradeTier::new(10, 50),
            UpgradeTier::new(20, 200),
        ]
    }

    fn base(gold: i32) -> HomeBase {
        HomeBase::new(1, Team::Red, Vec2Fixed::ZERO, fx(gold), fx(100), &ladder())
    }

    #[test]
    fn gold_saturates_instead_of_overflowing() {
        let mut base = base(0);
        assert!(base.credit(Role::Authority, Fixed::MAX));
        assert!(base.credit(Role::Authority, fx(30)));
        assert_eq!(base.gold(), Fixed::MAX);
        assert_eq!(base.accrue_income(Role::Authority, 40, 40), Some(fx(5)));
        assert_eq!(base.gold(), Fixed::MAX);
    }

    #[test]
    fn upgrade_debits_and_raises_income() {
        let mut base = base(100);
        let outcome = base.request_upgrade(Role::Authority, &ladder());
        assert_eq!(
            outcome,
            UpgradeOutcome::Applied {
                tier: 1,
                cost: fx(50),
                income: fx(10)
            }
        );
        assert_eq!(base.gold(), fx(50));
        assert_eq!(base.income_rate(), fx(10));

        let outcome = base.request_upgrade(Role::Authority, &ladder());
        assert_eq!(
            outcome,
            UpgradeOutcome::Rejected(RejectReason::InsufficientGold {
                required: fx(200),
                available: fx(50)
            })
        );
        assert_eq!(base.gold(), fx(50));
        assert_eq!(base.tier(), 1);
    }

    #[test]
    fn upgrade_stops_at_max_tier() {
        let mut base = base(1000);
        base.request_upgrade(Role::Authority, &ladder());
        base.request_upgrade(Role::Authority, &ladder());
        assert_eq!(base.tier(), 2);
        assert_eq!(base.next_upgrade_cost(&ladder()), None);
        assert_eq!(
            base.request_upgrade(Role::Authority, &ladder()),
            UpgradeOutcome::Rejected(RejectReason::MaxTier)
        );
        assert_eq!(base.gold(), fx(750));
    }

    #[test]
    fn replica_cannot_upgrade() {
        let mut base = base(100);
        assert_eq!(
            base.request_upgrade(Role::Replica, &ladder()),
            UpgradeOutcome::Ignored
        );
        assert_eq!(base.tier(), 0);
    }

    #[test]
    fn income_pays_once_per_interval() {
        let mut base = base(0);
        for _ in 0..39 {
            assert_eq!(base.accrue_income(Role::Authority, 1, 40), None);
        }
        assert_eq!(base.accrue_income(Role::Authority, 1, 40), Some(fx(5)));
        assert_eq!(base.gold(), fx(5));
    }

    #[test]
    fn income_carries_over_large_steps() {
        let mut base = base(0);
        assert_eq!(base.accrue_income(Role::Authority, 100, 40), Some(fx(10)));
        assert_eq!(base.accrue_income(Role::Authority, 20, 40), Some(fx(5)));
        assert_eq!(base.gold(), fx(15));
    }

    #[test]
    fn debit_rejects_without_change() {
        let mut base = base(20);
        assert!(base.try_debit(Role::Authority, fx(30)).is_err());
        assert_eq!(base.gold(), fx(20));
        assert_eq!(base.try_debit(Role::Authority, fx(20)), Ok(true));
        assert_eq!(base.gold(), Fixed::ZERO);
    }

    #[test]
    fn defeat_reported_once_after_death() {
        let mut base = base(0);
        assert!(!base.report_defeat());
        assert!(base.take_damage(Role::Authority, fx(100)).is_kill());
        assert!(base.report_defeat());
        assert!(!base.report_defeat());
    }
}
