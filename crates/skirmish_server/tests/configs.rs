//! The rules files shipped in `configs/` must stay loadable.

use std::path::PathBuf;

use skirmish_core::config::GameConfig;
use skirmish_server::batch::{run_match, DEFAULT_MAX_TICKS};
use skirmish_server::bot::BotStrategy;

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs")
        .join(name)
}

#[test]
fn default_rules_file_loads() {
    let config = GameConfig::load(shipped("skirmish.ron")).unwrap();
    let defaults = GameConfig::default();

    assert_eq!(config.starting_gold, defaults.starting_gold);
    assert_eq!(config.income_interval_ticks, defaults.income_interval_ticks);
    assert_eq!(config.upgrades, defaults.upgrades);
    assert_eq!(config.troop_kinds, defaults.troop_kinds);
    assert_eq!(config.kill_reward_ratio, defaults.kill_reward_ratio);
    assert_eq!(config.arena, defaults.arena);
}

#[test]
fn default_rules_file_plays_a_match() {
    let config = GameConfig::load(shipped("skirmish.ron")).unwrap();
    let summary = run_match(
        &config,
        1,
        BotStrategy::Rusher,
        BotStrategy::Turtle,
        DEFAULT_MAX_TICKS,
    )
    .unwrap();
    assert!(summary.ticks > 0);
}
