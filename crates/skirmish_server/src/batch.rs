//! Batch match runner for balance testing.
//!
//! Runs many seeded bot-vs-bot matches in parallel using rayon and
//! summarises who won and how long matches took.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use skirmish_core::config::GameConfig;
use skirmish_core::events::GameEvent;
use skirmish_core::match_state::MatchPhase;
use skirmish_core::replay::{MatchLog, MatchRecorder};
use skirmish_core::simulation::{MatchInput, TICK_RATE};
use skirmish_core::team::Team;

use crate::bot::{BotPlayer, BotStrategy};
use crate::error::Result;

/// Client id the red bot connects with.
const RED_CLIENT: u64 = 1;
/// Client id the blue bot connects with.
const BLUE_CLIENT: u64 = 2;

/// Default match length cap: 5 minutes of game time.
pub const DEFAULT_MAX_TICKS: u64 = 5 * 60 * TICK_RATE as u64;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run.
    pub match_count: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Tick cap per match. Matches still running at the cap are draws.
    pub max_ticks: u64,
    /// Strategy played by Red.
    pub red: BotStrategy,
    /// Strategy played by Blue.
    pub blue: BotStrategy,
    /// Maximum parallel matches (0 = rayon default).
    pub parallel: usize,
    /// Match rules shared by every match; the seed is overridden per match.
    pub game: GameConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            match_count: 100,
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            red: BotStrategy::Rusher,
            blue: BotStrategy::Economist,
            parallel: 0,
            game: GameConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create config for `match_count` matches between two strategies.
    #[must_use]
    pub fn new(match_count: u32, red: BotStrategy, blue: BotStrategy) -> Self {
        Self {
            match_count,
            red,
            blue,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick cap.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Outcome of a single match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Seed the match ran with.
    pub seed: u64,
    /// Winning team, `None` for a draw at the tick cap.
    pub winner: Option<Team>,
    /// Ticks simulated.
    pub ticks: u64,
    /// Troops that entered the map, per team (Red, Blue).
    pub troops_spawned: (u32, u32),
    /// Final state hash.
    pub final_hash: u64,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total: u32,
    /// Matches Red won.
    pub red_wins: u32,
    /// Matches Blue won.
    pub blue_wins: u32,
    /// Matches that hit the tick cap.
    pub draws: u32,
    /// Mean match length in ticks.
    pub average_ticks: f64,
}

impl BatchSummary {
    /// Summarise finished matches.
    #[must_use]
    pub fn from_matches(matches: &[MatchSummary]) -> Self {
        let mut summary = Self {
            total: u32::try_from(matches.len()).unwrap_or(u32::MAX),
            ..Self::default()
        };
        for result in matches {
            match result.winner {
                Some(Team::Red) => summary.red_wins += 1,
                Some(Team::Blue) => summary.blue_wins += 1,
                None => summary.draws += 1,
            }
        }
        if !matches.is_empty() {
            let total_ticks: u64 = matches.iter().map(|m| m.ticks).sum();
            summary.average_ticks = total_ticks as f64 / matches.len() as f64;
        }
        summary
    }

    /// Fraction of matches won by `team`.
    #[must_use]
    pub fn win_rate(&self, team: Team) -> f64 {
        let wins = match team {
            Team::Red => self.red_wins,
            Team::Blue => self.blue_wins,
        };
        f64::from(wins) / f64::from(self.total.max(1))
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match outcomes, in seed order.
    pub matches: Vec<MatchSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Matches that could not start.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Default results location inside an output directory.
    #[must_use]
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

/// A match that could not be run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Play one bot-vs-bot match to completion or the tick cap.
pub fn run_match(
    game: &GameConfig,
    seed: u64,
    red: BotStrategy,
    blue: BotStrategy,
    max_ticks: u64,
) -> Result<MatchSummary> {
    play_match(game, seed, red, blue, max_ticks).map(|(summary, _)| summary)
}

/// Like [`run_match`], also returning the recorded input log.
pub fn play_match(
    game: &GameConfig,
    seed: u64,
    red: BotStrategy,
    blue: BotStrategy,
    max_ticks: u64,
) -> Result<(MatchSummary, MatchLog)> {
    let config = GameConfig {
        seed,
        ..game.clone()
    };
    let mut recorder = MatchRecorder::new(config.clone())?;
    let mut bots = [
        BotPlayer::new(RED_CLIENT, red, &config),
        BotPlayer::new(BLUE_CLIENT, blue, &config),
    ];
    for bot in &bots {
        recorder.submit(MatchInput::Connect {
            client: bot.client(),
        });
    }

    let mut spawned = (0u32, 0u32);
    loop {
        let sim = recorder.simulation();
        let tick = sim.get_tick();
        if tick >= max_ticks || sim.phase() == MatchPhase::GameOver {
            break;
        }
        for bot in &mut bots {
            for request in bot.decide(tick) {
                recorder.submit(MatchInput::Request {
                    client: bot.client(),
                    request,
                });
            }
        }

        let events = recorder.tick();
        for event in &events {
            if let GameEvent::TroopSpawned { team, .. } = event {
                match team {
                    Team::Red => spawned.0 += 1,
                    Team::Blue => spawned.1 += 1,
                }
            }
        }
        let snapshot = recorder.simulation_mut().publish();
        for bot in &mut bots {
            bot.observe(&events, snapshot.clone());
        }
    }

    let sim = recorder.simulation();
    let winner = sim.match_state().losing_team().map(Team::enemy);
    let summary = MatchSummary {
        seed,
        winner,
        ticks: sim.get_tick(),
        troops_spawned: spawned,
        final_hash: sim.state_hash(),
    };
    debug!(seed, ?winner, ticks = summary.ticks, "Match finished");
    Ok((summary, recorder.finish()))
}

/// Run a batch of matches.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        matches = config.match_count,
        red = %config.red,
        blue = %config.blue,
        seed = config.seed_start,
        "Starting batch run"
    );

    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build_global()
            .ok(); // Ignore if already set
    }

    let outcomes: Vec<std::result::Result<MatchSummary, BatchError>> = (0..config.match_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            run_match(&config.game, seed, config.red, config.blue, config.max_ticks).map_err(|e| {
                warn!(seed, error = %e, "Match failed");
                BatchError {
                    seed,
                    message: e.to_string(),
                }
            })
        })
        .collect();

    let mut matches = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(summary) => matches.push(summary),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_matches(&matches);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        played = summary.total,
        red_wins = summary.red_wins,
        blue_wins = summary.blue_wins,
        draws = summary.draws,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        matches,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_batch(count: u32) -> BatchConfig {
        BatchConfig::new(count, BotStrategy::Rusher, BotStrategy::Turtle).with_max_ticks(600)
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(12, BotStrategy::Turtle, BotStrategy::Rusher)
            .with_seed(99)
            .with_max_ticks(10);
        assert_eq!(config.match_count, 12);
        assert_eq!(config.seed_start, 99);
        assert_eq!(config.max_ticks, 10);
        assert_eq!(config.red, BotStrategy::Turtle);
    }

    fn summary(seed: u64, winner: Option<Team>, ticks: u64) -> MatchSummary {
        MatchSummary {
            seed,
            winner,
            ticks,
            troops_spawned: (1, 0),
            final_hash: 0,
        }
    }

    #[test]
    fn test_summary_counts() {
        let matches = vec![
            summary(0, Some(Team::Red), 100),
            summary(1, Some(Team::Red), 200),
            summary(2, None, 300),
        ];
        let summary = BatchSummary::from_matches(&matches);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.red_wins, 2);
        assert_eq!(summary.draws, 1);
        assert!((summary.average_ticks - 200.0).abs() < f64::EPSILON);
        assert!((summary.win_rate(Team::Red) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_is_reproducible() {
        let game = GameConfig::default();
        let a = run_match(&game, 7, BotStrategy::Rusher, BotStrategy::Economist, 400).unwrap();
        let b = run_match(&game, 7, BotStrategy::Rusher, BotStrategy::Economist, 400).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_recorded_match_replays() {
        let game = GameConfig::default();
        let (summary, log) =
            play_match(&game, 11, BotStrategy::Economist, BotStrategy::Turtle, 300).unwrap();
        let replayed = log.replay().unwrap();
        assert_eq!(replayed.state_hash(), summary.final_hash);
    }

    #[test]
    fn test_bots_actually_play() {
        let game = GameConfig::default();
        let summary = run_match(&game, 3, BotStrategy::Rusher, BotStrategy::Rusher, 400).unwrap();
        // Starter troops plus at least one bought troop each.
        assert!(summary.troops_spawned.0 >= 2, "{summary:?}");
        assert!(summary.troops_spawned.1 >= 2, "{summary:?}");
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(small_batch(4));
        assert_eq!(results.matches.len(), 4);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total, 4);
        let seeds: Vec<u64> = results.matches.iter().map(|m| m.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_invalid_rules_are_reported_per_match() {
        let mut config = small_batch(2);
        config.game.troop_kinds.clear();
        let results = run_batch(config);
        assert!(results.matches.is_empty());
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(small_batch(2));
        let dir = tempfile::tempdir().unwrap();
        let path = BatchResults::default_path(dir.path());

        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.matches, results.matches);
        assert_eq!(loaded.summary, results.summary);
    }
}
