//! Replicated state: one writable copy on the authority, versioned
//! immutable snapshots for everybody else.
//!
//! The version only moves when the value actually changes, so observers can
//! both detect staleness (an older snapshot arriving late) and skip
//! redundant notifications.

use serde::{Deserialize, Serialize};

use crate::authority::Role;

/// An immutable, versioned copy of a replicated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Monotonically increasing sequence number.
    pub version: u64,
    /// The value at that version.
    pub value: T,
}

/// Authority-owned replicated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicated<T> {
    value: T,
    version: u64,
}

impl<T: Clone + PartialEq> Replicated<T> {
    /// Wrap an initial value at version 0.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    /// Current value.
    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Current version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Replace the value.
    ///
    /// Returns `true` if the value changed. Writes from a replica and writes
    /// of an identical value leave both value and version untouched.
    pub fn set(&mut self, role: Role, value: T) -> bool {
        if !role.is_authority() {
            tracing::trace!("Ignoring replicated write from non-authoritative side");
            return false;
        }
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version += 1;
        true
    }

    /// Take an immutable snapshot of the current value.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            version: self.version,
            value: self.value.clone(),
        }
    }
}

/// Result of offering a snapshot to a [`Mirror`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorUpdate {
    /// The snapshot was newer and replaced the mirrored value.
    Applied {
        /// Version held before the update, if any.
        previous: Option<u64>,
    },
    /// The snapshot was not newer than what the mirror already holds.
    Stale {
        /// Version currently held.
        current: u64,
        /// Version that was offered.
        received: u64,
    },
}

/// Read-only observer copy of a replicated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror<T> {
    latest: Option<Snapshot<T>>,
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self { latest: None }
    }
}

impl<T> Mirror<T> {
    /// Create an empty mirror.
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: None }
    }

    /// Offer a snapshot. Only strictly newer versions are accepted.
    pub fn apply(&mut self, snapshot: Snapshot<T>) -> MirrorUpdate {
        let previous = self.latest.as_ref().map(|s| s.version);
        if let Some(current) = previous {
            if snapshot.version <= current {
                return MirrorUpdate::Stale {
                    current,
                    received: snapshot.version,
                };
            }
        }
        self.latest = Some(snapshot);
        MirrorUpdate::Applied { previous }
    }

    /// Latest accepted value.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.latest.as_ref().map(|s| &s.value)
    }

    /// Version of the latest accepted snapshot.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.latest.as_ref().map(|s| s.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_write_bumps_version() {
        let mut value = Replicated::new(10);
        assert!(value.set(Role::Authority, 20));
        assert_eq!(*value.get(), 20);
        assert_eq!(value.version(), 1);
    }

    #[test]
    fn identical_write_keeps_version() {
        let mut value = Replicated::new(10);
        assert!(!value.set(Role::Authority, 10));
        assert_eq!(value.version(), 0);
    }

    #[test]
    fn replica_write_is_ignored() {
        let mut value = Replicated::new(10);
        assert!(!value.set(Role::Replica, 99));
        assert_eq!(*value.get(), 10);
        assert_eq!(value.version(), 0);
    }

    #[test]
    fn mirror_rejects_stale_snapshots() {
        let mut source = Replicated::new("a".to_string());
        let old = source.snapshot();
        source.set(Role::Authority, "b".to_string());
        let new = source.snapshot();

        let mut mirror = Mirror::new();
        assert_eq!(
            mirror.apply(new),
            MirrorUpdate::Applied { previous: None }
        );
        assert_eq!(
            mirror.apply(old),
            MirrorUpdate::Stale {
                current: 1,
                received: 0
            }
        );
        assert_eq!(mirror.value().map(String::as_str), Some("b"));
    }

    #[test]
    fn mirror_rejects_duplicate_version() {
        let source = Replicated::new(5u32);
        let mut mirror = Mirror::new();
        mirror.apply(source.snapshot());
        assert!(matches!(
            mirror.apply(source.snapshot()),
            MirrorUpdate::Stale { .. }
        ));
    }
}
