//! JSON-lines protocol between the transport and the authoritative server.
//!
//! One JSON object per line, tagged by `type`:
//!
//! **Input (stdin):** connection events and client requests
//! **Output (stdout):** committed events and published snapshots
//!
//! # Protocol Flow
//!
//! 1. Server starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. The transport forwards connections and requests as they arrive
//! 3. Every tick the server outputs that tick's events, then the new
//!    snapshot if the published state changed
//! 4. On `quit` (or end of input) it outputs `{"type":"bye",...}`
//!
//! # Example Session
//!
//! ```text
//! -> {"type":"connect","client":1}
//! -> {"type":"request","client":1,"request":"place_map"}
//! <- {"type":"event","tick":0,"event":{"PlayerRegistered":{"client":1,"team":"Red"}}}
//! -> {"type":"request","client":1,"request":{"spawn":{"kind":0}}}
//! -> {"type":"request","client":1,"request":{"set_mode":{"mode":"Attack"}}}
//! <- {"type":"snapshot","version":3,"world":{...}}
//! -> {"type":"quit"}
//! <- {"type":"bye","tick":120,"state_hash":1234567890}
//! ```
//!
//! Fixed-point quantities inside events and snapshots are sent as their raw
//! `I32F32` bits so observers reconstruct exact values.

use serde::{Deserialize, Serialize};

use skirmish_core::components::ClientId;
use skirmish_core::events::GameEvent;
use skirmish_core::replicated::Snapshot;
use skirmish_core::simulation::{ClientRequest, MatchInput, WorldSnapshot};

/// Protocol version announced in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Inbound (transport -> server)
// ============================================================================

/// Messages the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// A client connected.
    Connect {
        /// Transport-assigned client id.
        client: ClientId,
    },
    /// A client dropped.
    Disconnect {
        /// Transport-assigned client id.
        client: ClientId,
    },
    /// A client asked the authority for something.
    Request {
        /// Requesting client.
        client: ClientId,
        /// The request.
        request: ClientRequest,
    },
    /// Shut the server down after the current tick.
    Quit,
}

impl Inbound {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The simulation input this message carries, if any.
    #[must_use]
    pub const fn to_input(self) -> Option<MatchInput> {
        match self {
            Self::Connect { client } => Some(MatchInput::Connect { client }),
            Self::Disconnect { client } => Some(MatchInput::Disconnect { client }),
            Self::Request { client, request } => Some(MatchInput::Request { client, request }),
            Self::Quit => None,
        }
    }
}

// ============================================================================
// Outbound (server -> observers)
// ============================================================================

/// Messages the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Server is ready to accept input.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
    },
    /// A committed event.
    Event {
        /// Tick the event belongs to.
        tick: u64,
        /// The event.
        event: GameEvent,
    },
    /// A newly published world state.
    Snapshot {
        /// Replication version.
        version: u64,
        /// Observer-visible state.
        world: WorldSnapshot,
    },
    /// An input line was rejected.
    Error {
        /// What went wrong.
        message: String,
    },
    /// Goodbye message before shutdown.
    Bye {
        /// Ticks simulated.
        tick: u64,
        /// Final state hash, for determinism checks.
        state_hash: u64,
    },
}

impl Outbound {
    /// Create a ready message.
    #[must_use]
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wrap a published snapshot.
    #[must_use]
    pub fn snapshot(snapshot: Snapshot<WorldSnapshot>) -> Self {
        Self::Snapshot {
            version: snapshot.version,
            world: snapshot.value,
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::components::AiMode;
    use skirmish_core::match_state::MatchPhase;

    #[test]
    fn test_parse_connect() {
        let msg = Inbound::from_json(r#"{"type":"connect","client":7}"#).unwrap();
        assert_eq!(msg, Inbound::Connect { client: 7 });
    }

    #[test]
    fn test_parse_unit_request() {
        let msg =
            Inbound::from_json(r#"{"type":"request","client":1,"request":"place_map"}"#).unwrap();
        assert_eq!(
            msg.to_input(),
            Some(MatchInput::Request {
                client: 1,
                request: ClientRequest::PlaceMap
            })
        );
    }

    #[test]
    fn test_parse_spawn_and_mode_requests() {
        let spawn =
            Inbound::from_json(r#"{"type":"request","client":2,"request":{"spawn":{"kind":1}}}"#)
                .unwrap();
        assert_eq!(
            spawn,
            Inbound::Request {
                client: 2,
                request: ClientRequest::Spawn { kind: 1 }
            }
        );

        let mode = Inbound::from_json(
            r#"{"type":"request","client":2,"request":{"set_mode":{"mode":"Attack"}}}"#,
        )
        .unwrap();
        assert_eq!(
            mode,
            Inbound::Request {
                client: 2,
                request: ClientRequest::SetMode {
                    mode: AiMode::Attack
                }
            }
        );
    }

    #[test]
    fn test_quit_has_no_input() {
        let msg = Inbound::from_json(r#"{"type":"quit"}"#).unwrap();
        assert_eq!(msg.to_input(), None);
    }

    #[test]
    fn test_malformed_line_is_error() {
        assert!(Inbound::from_json(r#"{"type":"teleport","client":1}"#).is_err());
        assert!(Inbound::from_json("not json").is_err());
    }

    #[test]
    fn test_event_line_round_trip() {
        let msg = Outbound::Event {
            tick: 3,
            event: GameEvent::PhaseChanged {
                from: MatchPhase::WaitingForPlayers,
                to: MatchPhase::Gameplay,
            },
        };
        let line = msg.to_json_line();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"event""#));
        let parsed: Outbound = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_ready_line() {
        let line = Outbound::ready(0).to_json_line();
        assert_eq!(line, "{\"type\":\"ready\",\"version\":\"1.0\",\"tick\":0}\n");
    }
}
