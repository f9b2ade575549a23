//! # qg-core
//!
//! Shared library for the qg quiz client containing the wire message catalog
//! and the schema validator.
//!
//! The qg protocol is JSON text frames over a single WebSocket. Every frame
//! is a tagged union: commands (client → server) and events (server → client)
//! carry a `"type"` discriminator, game payloads a `"game"` discriminator.
//! This crate defines:
//!
//! - **`protocol`** – The typed message catalog ([`Command`], [`Event`],
//!   [`Game`] and friends) plus the [`encode_command`] / [`decode_event`]
//!   glue that turns raw frames into typed values and back.
//!
//! - **`schema`** – A structural validator over `serde_json::Value` driven
//!   by a registered definition table. Inbound frames must pass
//!   [`schema::assert`] against the `Event` definition before they are
//!   accepted; a frame that fails is a protocol violation, not a user error.
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI
//! frameworks. It is used by the session layer and by anything that needs
//! to speak the wire format in tests.

pub mod protocol;
pub mod schema;

pub use protocol::messages::{
    ApiError, Command, Event, EventKind, Game, Jeopardy, JeopardyCategory, JeopardyQuestion,
    Kahoot, KahootQuestion, Leaderboard, LeaderboardEntry,
};
pub use protocol::{decode_event, encode_command, DecodeError};
pub use schema::SchemaError;
