//! Fixed-point math utilities for deterministic simulation.
//!
//! All match simulation uses fixed-point arithmetic so that the
//! authoritative server and any replaying process arrive at exactly the
//! same gold, hit points and troop positions on every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector on the ground plane of the placed map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for optional fixed-point numbers, as optional raw bits.
pub mod option_fixed {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Fixed::to_bits).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Fixed::from_bits))
    }
}

/// Serde support for hand-authored fixed-point values.
///
/// Data files write fixed-point numbers as decimal strings (`"1.5"`),
/// which are parsed exactly without passing through floating point.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal string.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim()
            .parse::<Fixed>()
            .map_err(|e| D::Error::custom(format!("invalid fixed-point value '{text}': {e}")))
    }
}

/// Serde support for hand-authored fixed-point vectors written as
/// a pair of decimal strings, e.g. `("0", "-6")`.
pub mod vec2_decimal {
    use super::{Fixed, Vec2Fixed};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a vector as a `(x, y)` tuple of decimal strings.
    pub fn serialize<S>(value: &Vec2Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (value.x.to_string(), value.y.to_string()).serialize(serializer)
    }

    /// Deserialize a vector from a `(x, y)` tuple of decimal strings.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y) = <(String, String)>::deserialize(deserializer)?;
        let parse = |text: &str| {
            text.trim()
                .parse::<Fixed>()
                .map_err(|e| D::Error::custom(format!("invalid fixed-point value '{text}': {e}")))
        };
        Ok(Vec2Fixed::new(parse(&x)?, parse(&y)?))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Lands exactly on `target` when it is within reach.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let diff = target - self;
        let dist_sq = diff.dot(diff);
        if dist_sq <= max_step.saturating_mul(max_step) {
            return target;
        }
        self + diff.normalize().scale(max_step)
    }

    /// Check whether `other` lies within `range` of `self` (inclusive).
    #[must_use]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        self.distance_squared(other) <= range.saturating_mul(range)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_fixed_sqrt_exact_square() {
        let root = fixed_sqrt(Fixed::from_num(25));
        let epsilon = Fixed::from_num(1) / Fixed::from_num(10000);
        assert!((root - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_within_is_inclusive() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(1, 0);
        assert!(a.within(b, Fixed::from_num(1)));
        assert!(!a.within(b, Fixed::from_num(0.5)));
    }

    #[test]
    fn test_move_towards_lands_on_target() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::from_ints(1, 0);
        assert_eq!(start.move_towards(target, Fixed::from_num(2)), target);
    }

    #[test]
    fn test_move_towards_partial_step() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::from_ints(10, 0);
        let next = start.move_towards(target, Fixed::from_num(2));
        let epsilon = Fixed::from_num(1) / Fixed::from_num(1000);
        assert!((next.x - Fixed::from_num(2)).abs() < epsilon);
        assert_eq!(next.y, Fixed::ZERO);
    }

    #[test]
    fn test_within_saturates_on_huge_range() {
        let far = Vec2Fixed::new(Fixed::MAX / Fixed::from_num(2), Fixed::ZERO);
        assert!(Vec2Fixed::ZERO.within(far, Fixed::MAX));
        assert!(!Vec2Fixed::ZERO.within(far, Fixed::from_num(1)));
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2Fixed::from_ints(3, 4);
        let norm = v.normalize();

        let len_sq = norm.dot(norm);
        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!(
            (len_sq - one).abs() < epsilon,
            "normalized vector length² should be ~1, got {:?}",
            len_sq
        );
    }

    #[test]
    fn test_decimal_serde_parses_exactly() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(with = "fixed_decimal")]
            value: Fixed,
        }

        let parsed: Wrapper = ron::from_str(r#"(value: "0.15")"#).unwrap();
        assert_eq!(parsed.value, "0.15".parse::<Fixed>().unwrap());
    }
}
