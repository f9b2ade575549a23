//! Wire protocol: typed message catalog and frame encode/decode glue.
//!
//! # Frame flow
//!
//! ```text
//! caller   → encode_command → JSON text frame  → WebSocket
//! WebSocket → JSON text frame → decode_event   → typed Event
//! ```
//!
//! Inbound frames are validated against the registered `Event` schema
//! definition *before* being deserialized into the typed catalog, so an
//! unknown discriminator or a missing field is reported with a precise
//! instance path instead of a generic serde error.

pub mod messages;

use thiserror::Error;

use crate::schema;
use messages::{Command, Event};

/// Errors produced while turning raw frames into typed messages and back.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not syntactically valid JSON.
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but does not conform to the wire schema.
    #[error(transparent)]
    Schema(#[from] schema::SchemaError),
}

/// Serializes a [`Command`] into an outbound JSON text frame.
///
/// Commands are constructed locally from typed values, so no schema check
/// is run on the way out; the serde representation is the wire format.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if serialization fails.
pub fn encode_command(command: &Command) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(command)?)
}

/// Parses and validates an inbound text frame into a typed [`Event`].
///
/// The frame is first parsed as JSON, then checked against the registered
/// `Event` schema definition, and only then deserialized into the catalog.
/// A frame that fails any of these steps indicates a protocol or version
/// mismatch with the server.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for syntactically invalid JSON and
/// [`DecodeError::Schema`] for a frame that does not match the `Event`
/// definition.
pub fn decode_event(raw: &str) -> Result<Event, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    schema::assert("Event", &value)?;

    // The schema check guarantees the shape, so a serde failure here would
    // mean the catalog and the definition table have drifted apart.
    Ok(serde_json::from_value(value)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaError;

    #[test]
    fn test_decode_event_accepts_player_joined() {
        let ev = decode_event(r#"{"type":"PlayerJoined","playerName":"Alice"}"#).unwrap();
        match ev {
            Event::PlayerJoined { player_name } => assert_eq!(player_name, "Alice"),
            other => panic!("expected PlayerJoined, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_rejects_invalid_json() {
        let result = decode_event("{not json");
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_event_rejects_unknown_discriminator() {
        let result = decode_event(r#"{"type":"Bogus"}"#);
        match result {
            Err(DecodeError::Schema(SchemaError::Validation { path })) => {
                assert_eq!(path, "$.type");
            }
            other => panic!("expected schema validation error at $.type, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_rejects_missing_field() {
        // playerName is required by the EventPlayerJoined definition.
        let result = decode_event(r#"{"type":"PlayerJoined"}"#);
        match result {
            Err(DecodeError::Schema(SchemaError::Validation { path })) => {
                assert_eq!(path, "$.playerName");
            }
            other => panic!("expected schema validation error at $.playerName, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_command_join_game_wire_shape() {
        let cmd = Command::JoinGame {
            game_id: "g1".to_string(),
            player_name: "Alice".to_string(),
        };
        let frame = encode_command(&cmd).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "JoinGame");
        assert_eq!(value["data"]["gameID"], "g1");
        assert_eq!(value["data"]["playerName"], "Alice");
    }
}
