//! # Skirmish Server
//!
//! Headless authoritative server for two-player AR skirmish matches.
//!
//! Runs the simulation without rendering or AR tracking. A transport (or a
//! test harness) feeds it connection events and client requests, and reads
//! back every committed event and published snapshot:
//!
//! - **stdin**: inbound JSON lines (connect, disconnect, request, quit)
//! - **stdout**: outbound JSON lines (ready, event, snapshot, bye)
//! - **stderr**: logs (human-readable)
//!
//! See the [`protocol`] module for the message format. The [`bot`] and
//! [`batch`] modules run scripted matches for balance checks.
//!
//! # Example
//!
//! ```bash
//! # Serve a match over stdio
//! cargo run -p skirmish_server -- serve --config configs/skirmish.ron
//!
//! # One bot match, summary as JSON
//! cargo run -p skirmish_server -- simulate --red rusher --blue economist
//!
//! # 500 seeded matches in parallel
//! cargo run -p skirmish_server -- batch --count 500 --output results/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod bot;
pub mod error;
pub mod protocol;
pub mod session;

pub use batch::{run_batch, run_match, BatchConfig, BatchResults, BatchSummary, MatchSummary};
pub use bot::{BotPlayer, BotStrategy};
pub use error::{Result, ServerError};
pub use protocol::{Inbound, Outbound};
pub use session::{run_server, ServeOptions, ServerSession};
