//! Test fixtures and helpers.
//!
//! Pre-built matches and troop placements for consistent testing.

use fixed::types::I32F32;
use skirmish_core::components::{AiMode, ClientId, EntityId};
use skirmish_core::config::GameConfig;
use skirmish_core::match_state::MatchPhase;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::{ClientRequest, MatchInput, Simulation};
use skirmish_core::team::Team;

/// Client id of the hosting player (Red).
pub const HOST: ClientId = 1;

/// Client id of the joining player (Blue).
pub const GUEST: ClientId = 2;

/// Roster index of the knight in the default config.
pub const KNIGHT: usize = 0;

/// Roster index of the archer in the default config.
pub const ARCHER: usize = 1;

/// Roster index of the giant in the default config.
pub const GIANT: usize = 2;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Default config without starter troops, so scenarios only contain the
/// troops a test places itself.
#[must_use]
pub fn quiet_config() -> GameConfig {
    GameConfig {
        starter_troop: None,
        ..GameConfig::default()
    }
}

/// Client id that plays `team` in the fixtures.
#[must_use]
pub const fn client_for(team: Team) -> ClientId {
    match team {
        Team::Red => HOST,
        Team::Blue => GUEST,
    }
}

/// A fresh match with both players connected but no map placed yet.
///
/// # Panics
///
/// Panics if `config` fails validation.
#[must_use]
pub fn two_player_match(config: GameConfig) -> Simulation {
    let mut sim = Simulation::new(config).expect("fixture config must be valid");
    sim.submit(MatchInput::Connect { client: HOST });
    sim.submit(MatchInput::Connect { client: GUEST });
    sim
}

/// A match that has reached Gameplay: both players placed the map and
/// one tick ran to create the bases.
///
/// # Panics
///
/// Panics if `config` fails validation or the match does not start.
#[must_use]
pub fn match_in_gameplay(config: GameConfig) -> Simulation {
    let mut sim = two_player_match(config);
    for client in [HOST, GUEST] {
        sim.submit(MatchInput::Request {
            client,
            request: ClientRequest::PlaceMap,
        });
    }
    sim.tick();
    assert_eq!(sim.phase(), MatchPhase::Gameplay, "fixture match did not start");
    sim
}

/// Send a request on behalf of the player controlling `team`.
pub fn request(sim: &mut Simulation, team: Team, request: ClientRequest) {
    sim.submit(MatchInput::Request {
        client: client_for(team),
        request,
    });
}

/// Switch the standing order of a team's troops.
pub fn set_mode(sim: &mut Simulation, team: Team, mode: AiMode) {
    request(sim, team, ClientRequest::SetMode { mode });
}

/// Place one troop of each team `distance` apart on the x axis, mirrored
/// around the arena centre. Returns `(red, blue)`.
///
/// # Panics
///
/// Panics if `kind` is not in the roster.
pub fn face_off(sim: &mut Simulation, kind: usize, distance: I32F32) -> (EntityId, EntityId) {
    let half = distance / I32F32::from_num(2);
    let red = sim
        .spawn_troop_at(Team::Red, kind, Vec2Fixed::new(-half, I32F32::ZERO))
        .expect("fixture troop kind must exist");
    let blue = sim
        .spawn_troop_at(Team::Blue, kind, Vec2Fixed::new(half, I32F32::ZERO))
        .expect("fixture troop kind must exist");
    (red, blue)
}

/// Place `count` troops of `kind` for `team` in a row starting at `origin`,
/// one unit apart along x.
///
/// # Panics
///
/// Panics if `kind` is not in the roster.
pub fn place_squad(
    sim: &mut Simulation,
    team: Team,
    kind: usize,
    count: usize,
    origin: Vec2Fixed,
) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            let offset = I32F32::from_num(i);
            sim.spawn_troop_at(team, kind, Vec2Fixed::new(origin.x + offset, origin.y))
                .expect("fixture troop kind must exist")
        })
        .collect()
}

/// Tick `ticks` times, discarding events.
pub fn run_ticks(sim: &mut Simulation, ticks: u64) {
    for _ in 0..ticks {
        sim.tick();
    }
}

/// A busy match: both teams in Attack mode with a few knights each.
/// Used by determinism tests and benchmarks.
#[must_use]
pub fn skirmish_scenario(seed: u64) -> Simulation {
    let mut sim = match_in_gameplay(GameConfig {
        seed,
        ..GameConfig::default()
    });
    place_squad(&mut sim, Team::Red, KNIGHT, 4, Vec2Fixed::from_ints(-2, -3));
    place_squad(&mut sim, Team::Blue, KNIGHT, 4, Vec2Fixed::from_ints(-2, 3));
    set_mode(&mut sim, Team::Red, AiMode::Attack);
    set_mode(&mut sim, Team::Blue, AiMode::Attack);
    sim
}
