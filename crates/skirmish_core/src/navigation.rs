//! Walkable-surface queries.
//!
//! The real walkable surface comes from the AR plane the map was placed on;
//! the simulation only needs to snap candidate points onto it. [`NavMesh`]
//! is that seam, and [`ArenaNavMesh`] is the rectangular placed map.

use crate::config::ArenaConfig;
use crate::math::{Fixed, Vec2Fixed};

/// Snaps points onto the walkable surface.
pub trait NavMesh {
    /// Nearest walkable point within `max_distance` of `point`, if any.
    fn sample_position(&self, point: Vec2Fixed, max_distance: Fixed) -> Option<Vec2Fixed>;
}

/// Axis-aligned rectangle centred on the map anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaNavMesh {
    half_extent: Vec2Fixed,
}

impl ArenaNavMesh {
    /// Create a nav mesh covering `[-half_extent, half_extent]`.
    #[must_use]
    pub const fn new(half_extent: Vec2Fixed) -> Self {
        Self { half_extent }
    }

    /// Nav mesh matching an arena configuration.
    #[must_use]
    pub const fn from_arena(arena: &ArenaConfig) -> Self {
        Self::new(arena.half_extent)
    }

    fn clamp(&self, point: Vec2Fixed) -> Vec2Fixed {
        Vec2Fixed::new(
            point.x.clamp(-self.half_extent.x, self.half_extent.x),
            point.y.clamp(-self.half_extent.y, self.half_extent.y),
        )
    }
}

impl NavMesh for ArenaNavMesh {
    fn sample_position(&self, point: Vec2Fixed, max_distance: Fixed) -> Option<Vec2Fixed> {
        let snapped = self.clamp(point);
        point.within(snapped, max_distance).then_some(snapped)
    }
}
