//! Team identifiers.

use serde::{Deserialize, Serialize};

/// The two sides of a match.
///
/// Fixed for the lifetime of a match. The hosting client plays Red and the
/// joining client plays Blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The host's team.
    Red,
    /// The joiner's team.
    Blue,
}

impl Team {
    /// Both teams in registration order.
    pub const ALL: [Self; 2] = [Self::Red, Self::Blue];

    /// The opposing team.
    #[must_use]
    pub const fn enemy(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    /// Team assigned to the n-th connecting client (0 = host).
    #[must_use]
    pub const fn for_join_order(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Red),
            1 => Some(Self::Blue),
            _ => None,
        }
    }

    /// Get the display name for this team.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
