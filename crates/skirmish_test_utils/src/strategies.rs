//! Proptest strategies for match inputs and tuning values.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the simulation.

use proptest::prelude::*;
use skirmish_core::components::{AiMode, ClientId};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::simulation::{ClientRequest, MatchInput};

use crate::fixtures::{GUEST, HOST};

/// Generate a fixed-point coordinate inside the default 8x8 half-extent arena.
pub fn arb_arena_coordinate() -> impl Strategy<Value = Fixed> {
    (-8i32..=8i32).prop_map(Fixed::from_num)
}

/// Generate a point inside the default arena.
pub fn arb_arena_point() -> impl Strategy<Value = Vec2Fixed> {
    (arb_arena_coordinate(), arb_arena_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Generate a gold amount with quarter-gold precision (0..=1000).
pub fn arb_gold() -> impl Strategy<Value = Fixed> {
    (0i32..=4000i32).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
}

/// Generate hit points (1..=500).
pub fn arb_health() -> impl Strategy<Value = Fixed> {
    (1i32..=500i32).prop_map(Fixed::from_num)
}

/// Generate a damage amount with half-point precision (0..=200), including zero.
pub fn arb_damage() -> impl Strategy<Value = Fixed> {
    (0i32..=400i32).prop_map(|halves| Fixed::from_num(halves) / Fixed::from_num(2))
}

/// Generate an income interval in ticks.
pub fn arb_income_interval() -> impl Strategy<Value = u32> {
    1u32..=100u32
}

/// Generate either standing order.
pub fn arb_mode() -> impl Strategy<Value = AiMode> {
    prop_oneof![Just(AiMode::Attack), Just(AiMode::Defend)]
}

/// Generate one of the two fixture players.
pub fn arb_player() -> impl Strategy<Value = ClientId> {
    prop_oneof![Just(HOST), Just(GUEST)]
}

/// Generate a client request. Roster indices include one past the
/// default roster so rejections are exercised too.
pub fn arb_request() -> impl Strategy<Value = ClientRequest> {
    prop_oneof![
        Just(ClientRequest::PlaceMap),
        (0usize..4).prop_map(|kind| ClientRequest::Spawn { kind }),
        Just(ClientRequest::Upgrade),
        arb_mode().prop_map(|mode| ClientRequest::SetMode { mode }),
    ]
}

/// Generate any match input from the two fixture players.
pub fn arb_input() -> impl Strategy<Value = MatchInput> {
    prop_oneof![
        8 => (arb_player(), arb_request())
            .prop_map(|(client, request)| MatchInput::Request { client, request }),
        1 => arb_player().prop_map(|client| MatchInput::Connect { client }),
        1 => arb_player().prop_map(|client| MatchInput::Disconnect { client }),
    ]
}

/// Generate up to `max_len` inputs, each tagged with a tick below `max_tick`.
pub fn arb_input_script(
    max_len: usize,
    max_tick: u64,
) -> impl Strategy<Value = Vec<(u64, MatchInput)>> {
    proptest::collection::vec((0..max_tick, arb_input()), 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_arena_points_stay_inside_default_arena() {
        let arena = skirmish_core::config::ArenaConfig::default();
        let mut runner = TestRunner::deterministic();
        for _ in 0..64 {
            let point = arb_arena_point().new_tree(&mut runner).unwrap().current();
            assert!(arena.contains(point));
        }
    }
}
