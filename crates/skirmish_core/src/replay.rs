//! Match logs for recording and replaying matches.
//!
//! A [`MatchLog`] stores the configuration and every input the authority
//! applied, stamped with the tick it arrived before. Because the simulation
//! is deterministic, re-applying the inputs to a fresh simulation rebuilds
//! the match exactly; the stored final hash proves it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::events::TickEvents;
use crate::simulation::{MatchInput, Simulation};

/// Match log format version for compatibility.
pub const LOG_VERSION: u32 = 1;

/// One input and the tick it was applied before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedInput {
    /// Tick the input was applied before.
    pub tick: u64,
    /// The input.
    pub input: MatchInput,
}

/// Complete record of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLog {
    /// Log format version.
    pub version: u32,
    /// Configuration the match ran with.
    pub config: GameConfig,
    /// Inputs in arrival order.
    pub inputs: Vec<LoggedInput>,
    /// Number of ticks the match ran for.
    pub final_tick: u64,
    /// State hash after the last tick.
    pub final_hash: u64,
}

impl MatchLog {
    /// Start an empty log for a match using `config`.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            version: LOG_VERSION,
            config,
            inputs: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record an input.
    pub fn record(&mut self, tick: u64, input: MatchInput) {
        self.inputs.push(LoggedInput { tick, input });
    }

    /// Seal the log with the end state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Inputs applied before `tick`.
    pub fn inputs_at(&self, tick: u64) -> impl Iterator<Item = &MatchInput> {
        self.inputs
            .iter()
            .filter(move |logged| logged.tick == tick)
            .map(|logged| &logged.input)
    }

    /// Save the log to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize match log: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write match log: {e}")))?;
        Ok(())
    }

    /// Load a log from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read match log: {e}")))?;
        let log: Self = bincode::deserialize(&bytes).map_err(|e| {
            GameError::Serialization(format!("Failed to deserialize match log: {e}"))
        })?;

        if log.version != LOG_VERSION {
            return Err(GameError::InvalidState(format!(
                "Match log version mismatch: expected {}, got {}",
                LOG_VERSION, log.version
            )));
        }
        Ok(log)
    }

    /// Re-run the match on a fresh simulation and check the final hash.
    pub fn replay(&self) -> Result<Simulation> {
        let mut player = ReplayPlayer::new(self.clone())?;
        while player.advance() {}
        let replayed = player.simulation.state_hash();
        if replayed != self.final_hash {
            return Err(GameError::ReplayMismatch {
                tick: self.final_tick,
                recorded: self.final_hash,
                replayed,
            });
        }
        Ok(player.simulation)
    }
}

/// A simulation that logs every input it is given.
#[derive(Debug, Clone)]
pub struct MatchRecorder {
    simulation: Simulation,
    log: MatchLog,
}

impl MatchRecorder {
    /// Start a recorded match.
    pub fn new(config: GameConfig) -> Result<Self> {
        Ok(Self {
            simulation: Simulation::new(config.clone())?,
            log: MatchLog::new(config),
        })
    }

    /// Record and apply an input.
    pub fn submit(&mut self, input: MatchInput) {
        self.log.record(self.simulation.get_tick(), input);
        self.simulation.submit(input);
    }

    /// Advance the match.
    pub fn tick(&mut self) -> TickEvents {
        self.simulation.tick()
    }

    /// The recorded simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Mutable access for publishing snapshots.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Stop recording and return the sealed log.
    #[must_use]
    pub fn finish(mut self) -> MatchLog {
        self.log
            .finalize(self.simulation.get_tick(), self.simulation.state_hash());
        self.log
    }
}

/// Step-by-step playback of a [`MatchLog`].
#[derive(Debug)]
pub struct ReplayPlayer {
    log: MatchLog,
    simulation: Simulation,
    input_index: usize,
}

impl ReplayPlayer {
    /// Prepare playback from the start of the match.
    pub fn new(log: MatchLog) -> Result<Self> {
        let simulation = Simulation::new(log.config.clone())?;
        Ok(Self {
            log,
            simulation,
            input_index: 0,
        })
    }

    /// Apply the next tick's inputs and run it.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        let current = self.simulation.get_tick();
        self.submit_inputs_up_to(current);
        if current >= self.log.final_tick {
            return false;
        }
        self.simulation.tick();

        self.simulation.get_tick() < self.log.final_tick
    }

    // Inputs logged after the last tick still changed the recorded state.
    fn submit_inputs_up_to(&mut self, tick: u64) {
        while let Some(logged) = self.log.inputs.get(self.input_index) {
            if logged.tick > tick {
                break;
            }
            self.simulation.submit(logged.input);
            self.input_index += 1;
        }
    }

    /// Restart and play up to `target_tick`.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.simulation = Simulation::new(self.log.config.clone())?;
        self.input_index = 0;
        while self.simulation.get_tick() < target_tick.min(self.log.final_tick) {
            self.advance();
        }
        Ok(())
    }

    /// Next tick to be played.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.simulation.get_tick()
    }

    /// Simulation as of the current tick.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Check if playback reached the end of the log.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.simulation.get_tick() >= self.log.final_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AiMode;
    use crate::simulation::ClientRequest;

    fn recorded_match(ticks: u64) -> MatchLog {
        let mut recorder = MatchRecorder::new(GameConfig::default()).unwrap();
        for client in [1, 2] {
            recorder.submit(MatchInput::Connect { client });
        }
        recorder.tick();
        for client in [1, 2] {
            recorder.submit(MatchInput::Request {
                client,
                request: ClientRequest::PlaceMap,
            });
        }
        for tick in 1..ticks {
            if tick == 30 {
                recorder.submit(MatchInput::Request {
                    client: 1,
                    request: ClientRequest::SetMode {
                        mode: AiMode::Attack,
                    },
                });
            }
            if tick == 60 {
                recorder.submit(MatchInput::Request {
                    client: 2,
                    request: ClientRequest::Spawn { kind: 1 },
                });
            }
            recorder.tick();
        }
        recorder.finish()
    }

    #[test]
    fn log_records_inputs_with_ticks() {
        let log = recorded_match(100);
        assert_eq!(log.inputs.len(), 6);
        assert_eq!(log.inputs_at(0).count(), 2);
        assert_eq!(log.inputs_at(1).count(), 2);
        assert_eq!(log.inputs_at(60).count(), 1);
        assert_eq!(log.final_tick, 100);
    }

    #[test]
    fn replay_reproduces_final_hash() {
        let log = recorded_match(300);
        let sim = log.replay().unwrap();
        assert_eq!(sim.state_hash(), log.final_hash);
        assert_eq!(sim.get_tick(), 300);
    }

    #[test]
    fn tampered_log_is_detected() {
        let mut log = recorded_match(200);
        log.inputs.retain(|logged| logged.tick != 60);
        assert!(matches!(
            log.replay(),
            Err(GameError::ReplayMismatch { tick: 200, .. })
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let log = recorded_match(50);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.log");
        log.save(&path).unwrap();
        assert_eq!(MatchLog::load(&path).unwrap(), log);
    }

    #[test]
    fn load_rejects_other_versions() {
        let mut log = recorded_match(5);
        log.version = LOG_VERSION + 1;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.log");
        log.save(&path).unwrap();
        assert!(MatchLog::load(&path).is_err());
    }

    #[test]
    fn seek_matches_straight_playback() {
        let log = recorded_match(120);
        let mut straight = ReplayPlayer::new(log.clone()).unwrap();
        for _ in 0..80 {
            straight.advance();
        }
        let mut seeking = ReplayPlayer::new(log).unwrap();
        seeking.seek(110).unwrap();
        seeking.seek(80).unwrap();
        assert_eq!(seeking.current_tick(), 80);
        assert_eq!(
            seeking.simulation().state_hash(),
            straight.simulation().state_hash()
        );
        assert!(!seeking.is_finished());
    }
}
