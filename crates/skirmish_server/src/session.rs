//! Authoritative server session and its fixed-rate tick loop.
//!
//! [`ServerSession`] is the synchronous part: it applies inbound messages to
//! the [`Simulation`] and turns each tick into outbound lines.
//! [`run_server`] wraps it in a `tokio` loop: a reader task parses input
//! lines into an unbounded channel, and every `TICK_DURATION_MS` the loop
//! drains the channel in arrival order, ticks, and writes the results.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use skirmish_core::config::GameConfig;
use skirmish_core::simulation::{Simulation, TICK_DURATION_MS};

use crate::error::{Result, ServerError};
use crate::protocol::{Inbound, Outbound};

/// Whether the session keeps running after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep ticking.
    Continue,
    /// Stop after this tick.
    Quit,
}

/// What the reader task hands to the tick loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Incoming {
    Message(Inbound),
    Malformed(String),
}

/// Tick-loop options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServeOptions {
    /// Stop after this many ticks even if input stays open.
    pub max_ticks: Option<u64>,
    /// Keep ticking after the input closes, until `max_ticks` or forever.
    pub linger: bool,
}

/// The authoritative side of one match.
#[derive(Debug)]
pub struct ServerSession {
    simulation: Simulation,
    last_snapshot: Option<u64>,
}

impl ServerSession {
    /// Start a session for `config`.
    pub fn new(config: GameConfig) -> Result<Self> {
        Ok(Self {
            simulation: Simulation::new(config)?,
            last_snapshot: None,
        })
    }

    /// The simulation being served.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Apply one inbound message.
    pub fn handle(&mut self, message: Inbound) -> Control {
        match message.to_input() {
            Some(input) => {
                debug!(?input, "Inbound message");
                self.simulation.submit(input);
                Control::Continue
            }
            None => Control::Quit,
        }
    }

    /// Advance one tick. Returns the tick's events, followed by the
    /// published snapshot when the world changed.
    pub fn step(&mut self) -> Vec<Outbound> {
        let events = self.simulation.tick();
        let mut out: Vec<Outbound> = events
            .iter()
            .map(|event| Outbound::Event {
                tick: events.tick,
                event: event.clone(),
            })
            .collect();

        let snapshot = self.simulation.publish();
        if self.last_snapshot != Some(snapshot.version) {
            self.last_snapshot = Some(snapshot.version);
            out.push(Outbound::snapshot(snapshot));
        }
        out
    }

    /// Final message.
    #[must_use]
    pub fn bye(&self) -> Outbound {
        Outbound::Bye {
            tick: self.simulation.get_tick(),
            state_hash: self.simulation.state_hash(),
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, message: &Outbound) -> Result<()> {
    output.write_all(message.to_json_line().as_bytes()).await?;
    Ok(())
}

async fn read_inbound<R>(input: R, tx: UnboundedSender<Incoming>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let incoming = match Inbound::from_json(line) {
            Ok(message) => Incoming::Message(message),
            Err(e) => {
                warn!(error = %e, line, "Skipping malformed input line");
                Incoming::Malformed(format!("{}: {line}", ServerError::Protocol(e)))
            }
        };
        if tx.send(incoming).is_err() {
            break;
        }
    }
    debug!("Input closed");
    Ok(())
}

/// Serve a match: read JSON lines from `input`, tick at `TICK_RATE`, write
/// JSON lines to `output`. Returns the final state hash.
pub async fn run_server<R, W>(
    config: GameConfig,
    input: R,
    mut output: W,
    options: ServeOptions,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let mut session = ServerSession::new(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_inbound(input, tx));

    write_line(&mut output, &Outbound::ready(session.simulation.get_tick())).await?;
    output.flush().await?;
    info!(tick_ms = TICK_DURATION_MS, "Server ready");

    let mut interval = tokio::time::interval(Duration::from_millis(u64::from(TICK_DURATION_MS)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut input_open = true;
    loop {
        interval.tick().await;

        let mut control = Control::Continue;
        while control == Control::Continue {
            match rx.try_recv() {
                Ok(Incoming::Message(message)) => control = session.handle(message),
                Ok(Incoming::Malformed(message)) => {
                    write_line(&mut output, &Outbound::error(message)).await?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    input_open = false;
                    break;
                }
            }
        }

        for message in session.step() {
            write_line(&mut output, &message).await?;
        }
        output.flush().await?;

        let out_of_ticks = options
            .max_ticks
            .is_some_and(|max| session.simulation.get_tick() >= max);
        let hung_up = !input_open && !options.linger;
        if control == Control::Quit || out_of_ticks || hung_up {
            break;
        }
    }

    reader.abort();
    match reader.await {
        Ok(Err(e)) => warn!(error = %e, "Input reader stopped with an error"),
        Err(e) if e.is_panic() => return Err(ServerError::Reader(e.to_string())),
        _ => {}
    }

    let state_hash = session.simulation.state_hash();
    write_line(&mut output, &session.bye()).await?;
    output.flush().await?;
    info!(tick = session.simulation.get_tick(), state_hash, "Server stopped");
    Ok(state_hash)
}
