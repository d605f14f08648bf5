//! Data-driven match configuration.
//!
//! Everything tunable about a match (troop roster, upgrade table, AI
//! ranges, timings) lives in a [`GameConfig`], loadable from RON. All
//! durations are tick counts at [`TICK_RATE`](crate::simulation::TICK_RATE).
//!
//! # Example RON
//!
//! ```ron
//! GameConfig(
//!     seed: 7,
//!     starting_gold: "150",
//!     upgrades: [
//!         UpgradeTier(income: "5", cost: "0"),
//!         UpgradeTier(income: "10", cost: "50"),
//!     ],
//! )
//! ```
//!
//! Fields left out keep their default values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, vec2_decimal, Fixed, Vec2Fixed};
use crate::simulation::TICK_RATE;
use crate::team::Team;

/// Largest gold, hit point or damage value a config may hold.
///
/// Keeps sums and reward products well inside `I32F32`.
pub const MAX_AMOUNT: i32 = 1_000_000;

/// Largest distance, speed or radius a config may hold. Squared
/// distances must stay representable.
pub const MAX_DISTANCE: i32 = 1_000;

/// One level of the home-base upgrade ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeTier {
    /// Gold added per income tick while at this tier.
    #[serde(with = "fixed_decimal")]
    pub income: Fixed,
    /// Gold required to advance into this tier. Ignored for tier 0.
    #[serde(with = "fixed_decimal")]
    pub cost: Fixed,
}

impl UpgradeTier {
    /// Create an upgrade tier from whole-gold amounts.
    #[must_use]
    pub fn new(income: i32, cost: i32) -> Self {
        Self {
            income: Fixed::from_num(income),
            cost: Fixed::from_num(cost),
        }
    }
}

/// A spawnable troop type: price, cast time and combat stats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TroopKind {
    /// Display name.
    pub name: String,
    /// Gold debited when a spawn is approved.
    #[serde(with = "fixed_decimal")]
    pub price: Fixed,
    /// Cast delay between approval and the troop appearing.
    pub spawn_ticks: u32,
    /// Maximum hit points.
    #[serde(with = "fixed_decimal")]
    pub max_health: Fixed,
    /// Damage per successful attack.
    #[serde(with = "fixed_decimal")]
    pub attack_damage: Fixed,
    /// Reach of an attack.
    #[serde(with = "fixed_decimal")]
    pub attack_range: Fixed,
    /// Minimum ticks between two attacks.
    pub attack_cooldown_ticks: u32,
    /// Movement speed in units per second.
    #[serde(with = "fixed_decimal")]
    pub move_speed: Fixed,
}

impl TroopKind {
    /// Distance covered in one simulation tick.
    #[must_use]
    pub fn speed_per_tick(&self) -> Fixed {
        self.move_speed / Fixed::from_num(TICK_RATE)
    }

    /// Melee footsoldier. Cheap and quick to cast.
    #[must_use]
    pub fn knight() -> Self {
        Self {
            name: "Knight".to_string(),
            price: Fixed::from_num(30),
            spawn_ticks: 20,
            max_health: Fixed::from_num(40),
            attack_damage: Fixed::from_num(5),
            attack_range: Fixed::from_num(1),
            attack_cooldown_ticks: 20,
            move_speed: Fixed::from_num(1),
        }
    }

    /// Ranged unit with low hit points.
    #[must_use]
    pub fn archer() -> Self {
        Self {
            name: "Archer".to_string(),
            price: Fixed::from_num(40),
            spawn_ticks: 30,
            max_health: Fixed::from_num(25),
            attack_damage: Fixed::from_num(4),
            attack_range: Fixed::from_num(3),
            attack_cooldown_ticks: 30,
            move_speed: Fixed::from_num(1),
        }
    }

    /// Slow, heavy siege unit.
    #[must_use]
    pub fn giant() -> Self {
        Self {
            name: "Giant".to_string(),
            price: Fixed::from_num(80),
            spawn_ticks: 60,
            max_health: Fixed::from_num(120),
            attack_damage: Fixed::from_num(12),
            attack_range: Fixed::from_num(5) / Fixed::from_num(4),
            attack_cooldown_ticks: 40,
            move_speed: Fixed::from_num(5) / Fixed::from_num(8),
        }
    }
}

/// Troop AI tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Radius in which enemy troops are noticed.
    #[serde(with = "fixed_decimal")]
    pub detection_range: Fixed,
    /// Leash radius around the spawn point in Defend mode.
    #[serde(with = "fixed_decimal")]
    pub defense_radius: Fixed,
    /// Ticks between two AI evaluations of the same troop.
    pub update_interval_ticks: u32,
    /// Distance to home at which a retreat counts as finished.
    #[serde(with = "fixed_decimal")]
    pub retreat_tolerance: Fixed,
    /// Remaining distance at which a patrol leg counts as finished.
    #[serde(with = "fixed_decimal")]
    pub patrol_tolerance: Fixed,
    /// Maximum number of troops a single detection scan reports.
    pub detection_capacity: usize,
    /// Search radius when snapping a destination onto the nav mesh.
    #[serde(with = "fixed_decimal")]
    pub nav_sample_distance: Fixed,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            detection_range: Fixed::from_num(5),
            defense_radius: Fixed::from_num(3),
            update_interval_ticks: 10,
            retreat_tolerance: Fixed::from_num(15) / Fixed::from_num(100),
            patrol_tolerance: Fixed::from_num(1) / Fixed::from_num(4),
            detection_capacity: 10,
            nav_sample_distance: Fixed::from_num(2),
        }
    }
}

/// Where approved troops appear relative to their base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Troops appear at a random point within this radius of the base.
    #[serde(with = "fixed_decimal")]
    pub scatter_radius: Fixed,
    /// Random points tried before falling back to the unadjusted point.
    pub max_sample_attempts: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            scatter_radius: Fixed::from_num(2),
            max_sample_attempts: 5,
        }
    }
}

/// Geometry of the placed map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Half width and half depth of the walkable rectangle, centred on the anchor.
    #[serde(with = "vec2_decimal")]
    pub half_extent: Vec2Fixed,
    /// Red home base location.
    #[serde(with = "vec2_decimal")]
    pub red_base: Vec2Fixed,
    /// Blue home base location.
    #[serde(with = "vec2_decimal")]
    pub blue_base: Vec2Fixed,
}

impl ArenaConfig {
    /// Base location for a team.
    #[must_use]
    pub const fn base_point(&self, team: Team) -> Vec2Fixed {
        match team {
            Team::Red => self.red_base,
            Team::Blue => self.blue_base,
        }
    }

    /// Check whether a point lies on the walkable rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x.abs() <= self.half_extent.x && point.y.abs() <= self.half_extent.y
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_extent: Vec2Fixed::from_ints(8, 8),
            red_base: Vec2Fixed::from_ints(0, -6),
            blue_base: Vec2Fixed::from_ints(0, 6),
        }
    }
}

/// Complete match configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for patrol and spawn-scatter randomness.
    pub seed: u64,
    /// Gold each base starts with.
    #[serde(with = "fixed_decimal")]
    pub starting_gold: Fixed,
    /// Hit points of each home base.
    #[serde(with = "fixed_decimal")]
    pub base_max_health: Fixed,
    /// Ticks between two income payouts.
    pub income_interval_ticks: u32,
    /// Upgrade ladder. Tier 0 is the starting tier.
    pub upgrades: Vec<UpgradeTier>,
    /// Spawnable troop roster, addressed by index.
    pub troop_kinds: Vec<TroopKind>,
    /// Fraction of a dead troop's price paid to the opposing base.
    #[serde(with = "fixed_decimal")]
    pub kill_reward_ratio: Fixed,
    /// Ticks a dead troop lingers before it is removed.
    pub despawn_delay_ticks: u32,
    /// Troop kind each player is given a spawn request for when play starts.
    pub starter_troop: Option<usize>,
    /// Troop AI tuning.
    pub ai: AiConfig,
    /// Spawn placement tuning.
    pub spawn: SpawnConfig,
    /// Map geometry.
    pub arena: ArenaConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            starting_gold: Fixed::from_num(100),
            base_max_health: Fixed::from_num(100),
            income_interval_ticks: 2 * TICK_RATE,
            upgrades: vec![
                UpgradeTier::new(5, 0),
                UpgradeTier::new(10, 50),
                UpgradeTier::new(20, 200),
                UpgradeTier::new(35, 500),
            ],
            troop_kinds: vec![TroopKind::knight(), TroopKind::archer(), TroopKind::giant()],
            kill_reward_ratio: Fixed::from_num(1) / Fixed::from_num(2),
            despawn_delay_ticks: 5 * TICK_RATE,
            starter_troop: Some(0),
            ai: AiConfig::default(),
            spawn: SpawnConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load a configuration from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| GameError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::ConfigLoad {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Highest reachable upgrade tier.
    #[must_use]
    pub fn max_tier(&self) -> usize {
        self.upgrades.len().saturating_sub(1)
    }

    /// Look up a troop kind by roster index.
    #[must_use]
    pub fn troop_kind(&self, index: usize) -> Option<&TroopKind> {
        self.troop_kinds.get(index)
    }

    /// Check the configuration for values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GameError::InvalidConfig(msg));
        let max_amount = Fixed::from_num(MAX_AMOUNT);
        let max_distance = Fixed::from_num(MAX_DISTANCE);

        if self.upgrades.is_empty() {
            return invalid("upgrade table is empty".to_string());
        }
        if self.troop_kinds.is_empty() {
            return invalid("troop roster is empty".to_string());
        }
        if self.starting_gold < Fixed::ZERO {
            return invalid("starting gold is negative".to_string());
        }
        if self.base_max_health <= Fixed::ZERO {
            return invalid("base health must be positive".to_string());
        }
        if self.income_interval_ticks == 0 {
            return invalid("income interval must be at least one tick".to_string());
        }
        if self.starting_gold > max_amount || self.base_max_health > max_amount {
            return invalid(format!("starting gold and base health must not exceed {MAX_AMOUNT}"));
        }
        if self.kill_reward_ratio < Fixed::ZERO || self.kill_reward_ratio > Fixed::ONE {
            return invalid("kill reward ratio must lie between 0 and 1".to_string());
        }
        for (index, tier) in self.upgrades.iter().enumerate() {
            if tier.income < Fixed::ZERO || tier.cost < Fixed::ZERO {
                return invalid(format!("upgrade tier {index} has a negative value"));
            }
            if tier.income > max_amount || tier.cost > max_amount {
                return invalid(format!("upgrade tier {index} exceeds {MAX_AMOUNT}"));
            }
        }
        for (index, kind) in self.troop_kinds.iter().enumerate() {
            if kind.price <= Fixed::ZERO {
                return invalid(format!("troop kind {index} ({}) has no price", kind.name));
            }
            if kind.max_health <= Fixed::ZERO
                || kind.attack_damage <= Fixed::ZERO
                || kind.attack_range <= Fixed::ZERO
                || kind.move_speed <= Fixed::ZERO
            {
                return invalid(format!(
                    "troop kind {index} ({}) has a non-positive combat stat",
                    kind.name
                ));
            }
            if kind.price > max_amount
                || kind.max_health > max_amount
                || kind.attack_damage > max_amount
                || kind.attack_range > max_distance
                || kind.move_speed > max_distance
            {
                return invalid(format!(
                    "troop kind {index} ({}) has an out-of-range stat",
                    kind.name
                ));
            }
        }
        if let Some(starter) = self.starter_troop {
            if starter >= self.troop_kinds.len() {
                return invalid(format!("starter troop {starter} is not in the roster"));
            }
        }
        if self.ai.update_interval_ticks == 0 {
            return invalid("AI update interval must be at least one tick".to_string());
        }
        if self.ai.detection_range <= Fixed::ZERO || self.ai.defense_radius <= Fixed::ZERO {
            return invalid("AI ranges must be positive".to_string());
        }
        let ai_distances = [
            self.ai.detection_range,
            self.ai.defense_radius,
            self.ai.retreat_tolerance,
            self.ai.patrol_tolerance,
            self.ai.nav_sample_distance,
            self.spawn.scatter_radius,
        ];
        if ai_distances.iter().any(|d| *d > max_distance) {
            return invalid(format!("AI and spawn distances must not exceed {MAX_DISTANCE}"));
        }
        if self.arena.half_extent.x <= Fixed::ZERO || self.arena.half_extent.y <= Fixed::ZERO {
            return invalid("arena extent must be positive".to_string());
        }
        if self.arena.half_extent.x > max_distance || self.arena.half_extent.y > max_distance {
            return invalid(format!("arena extent must not exceed {MAX_DISTANCE}"));
        }
        for team in Team::ALL {
            if !self.arena.contains(self.arena.base_point(team)) {
                return invalid(format!("{team} base lies outside the arena"));
            }
        }
        Ok(())
    }
}
