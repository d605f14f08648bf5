//! Hit-point tracking with a one-shot death notification.

use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::math::{fixed_serde, Fixed};

/// Outcome of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Nothing changed: replica side, already dead, or non-positive amount.
    Ignored,
    /// Hit points dropped but the entity survived.
    Wounded {
        /// Hit points actually removed.
        dealt: Fixed,
    },
    /// This hit brought the entity to zero. Reported exactly once.
    Killed {
        /// Hit points actually removed.
        dealt: Fixed,
    },
}

impl DamageOutcome {
    /// Hit points removed by this application.
    #[must_use]
    pub fn dealt(self) -> Fixed {
        match self {
            Self::Ignored => Fixed::ZERO,
            Self::Wounded { dealt } | Self::Killed { dealt } => dealt,
        }
    }

    /// Whether this application caused the death.
    #[must_use]
    pub const fn is_kill(self) -> bool {
        matches!(self, Self::Killed { .. })
    }
}

/// Health component for damageable entities.
///
/// `current` always stays within `[0, max]` and `dead` flips to `true`
/// once, irreversibly, when `current` reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    #[serde(with = "fixed_serde")]
    current: Fixed,
    #[serde(with = "fixed_serde")]
    max: Fixed,
    dead: bool,
}

impl Health {
    /// Create a new health component at full health.
    ///
    /// A non-positive maximum is raised to the smallest representable
    /// positive value so the entity is still alive on creation.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = if max > Fixed::ZERO { max } else { Fixed::DELTA };
        Self {
            current: max,
            max,
            dead: false,
        }
    }

    /// Current hit points.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Check if the entity has died.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Check if the entity is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Apply damage on behalf of `role`.
    ///
    /// Only the authority mutates. Damage is clamped so hit points never go
    /// below zero, and the kill is reported on the hit that reaches zero.
    pub fn apply_damage(&mut self, role: Role, amount: Fixed) -> DamageOutcome {
        if !role.is_authority() {
            tracing::trace!("Ignoring damage from non-authoritative side");
            return DamageOutcome::Ignored;
        }
        if self.dead || amount <= Fixed::ZERO {
            return DamageOutcome::Ignored;
        }

        let dealt = amount.min(self.current);
        self.current -= dealt;

        if self.current == Fixed::ZERO {
            self.dead = true;
            DamageOutcome::Killed { dealt }
        } else {
            DamageOutcome::Wounded { dealt }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn damage_reduces_health() {
        let mut health = Health::new(fx(100));
        let outcome = health.apply_damage(Role::Authority, fx(30));
        assert_eq!(outcome, DamageOutcome::Wounded { dealt: fx(30) });
        assert_eq!(health.current(), fx(70));
        assert!(health.is_alive());
    }

    #[test]
    fn overkill_clamps_at_zero() {
        let mut health = Health::new(fx(10));
        let outcome = health.apply_damage(Role::Authority, fx(25));
        assert_eq!(outcome, DamageOutcome::Killed { dealt: fx(10) });
        assert_eq!(health.current(), Fixed::ZERO);
        assert!(health.is_dead());
    }

    #[test]
    fn death_is_reported_once() {
        let mut health = Health::new(fx(5));
        assert!(health.apply_damage(Role::Authority, fx(5)).is_kill());
        assert_eq!(
            health.apply_damage(Role::Authority, fx(5)),
            DamageOutcome::Ignored
        );
        assert!(health.is_dead());
    }

    #[test]
    fn replica_damage_is_silent_noop() {
        let mut health = Health::new(fx(100));
        assert_eq!(
            health.apply_damage(Role::Replica, fx(50)),
            DamageOutcome::Ignored
        );
        assert_eq!(health.current(), fx(100));
    }

    #[test]
    fn non_positive_damage_is_ignored() {
        let mut health = Health::new(fx(100));
        assert_eq!(
            health.apply_damage(Role::Authority, Fixed::ZERO),
            DamageOutcome::Ignored
        );
        assert_eq!(
            health.apply_damage(Role::Authority, fx(-3)),
            DamageOutcome::Ignored
        );
        assert_eq!(health.current(), fx(100));
    }
}
