//! Wire-schema validation for qg frames.
//!
//! The qg protocol is defined by a table of named type definitions in the
//! JSON Type Definition style: tagged unions keyed by a discriminator
//! field, objects with required and optional properties, typed arrays, and
//! a handful of primitives. Inbound frames are checked against this table
//! *before* they are deserialized into the typed catalog, so a protocol
//! mismatch is reported with the dotted path of the first offending field
//! (`$.playerName`, `$.categories.0.name`) rather than a serde error.
//!
//! Validation stops at the first mismatch and never mutates the value.
//!
//! # Entry point
//!
//! [`assert`] validates a value against a named definition in the
//! registered qg table:
//!
//! ```rust
//! use qg_core::schema;
//!
//! let frame: serde_json::Value =
//!     serde_json::from_str(r#"{"type":"PlayerJoined","playerName":"Alice"}"#).unwrap();
//! schema::assert("Event", &frame).unwrap();
//! ```

mod validate;

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

/// Errors raised by schema validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The requested type name is not registered in the definition table.
    #[error("unknown type {name:?}")]
    UnknownType { name: String },

    /// The value does not conform to the definition. `path` is the dotted
    /// instance location of the first offending field, starting at `$`.
    #[error("error at {path}")]
    Validation { path: String },

    /// Ref resolution exceeded the recursion bound. Indicates a definition
    /// cycle, not a malformed value.
    #[error("max validation depth exceeded at {path}")]
    MaxDepth { path: String },
}

/// Primitive leaf types understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// A JSON string.
    String,
    /// A JSON boolean.
    Boolean,
    /// Any JSON number.
    Float64,
    /// A JSON number with an integral value within `i32` range.
    Int32,
}

/// A single type definition.
#[derive(Debug, Clone)]
pub enum Definition {
    /// A primitive leaf.
    Type(Primitive),
    /// A reference to another named definition in the same table.
    Ref(&'static str),
    /// An array whose elements all match the inner definition.
    Elements(Box<Definition>),
    /// An object with fixed properties.
    Properties(PropertiesDef),
    /// A tagged union: the value of `tag` selects the properties form to
    /// validate the rest of the object against.
    Discriminator {
        tag: &'static str,
        mapping: Vec<(&'static str, PropertiesDef)>,
    },
}

/// The object form: required and optional properties.
///
/// Unknown fields are rejected unless `additional` is set — matching the
/// schema language's default of `additionalProperties: false`.
#[derive(Debug, Clone)]
pub struct PropertiesDef {
    pub required: Vec<(&'static str, Definition)>,
    pub optional: Vec<(&'static str, Definition)>,
    pub additional: bool,
}

/// A named definition table.
#[derive(Debug, Clone)]
pub struct Schema {
    definitions: HashMap<&'static str, Definition>,
}

impl Schema {
    /// Looks up a named definition.
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Validates `value` against the named definition.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownType`] if `name` is not registered;
    /// [`SchemaError::Validation`] at the first structural mismatch;
    /// [`SchemaError::MaxDepth`] if ref resolution recurses past the bound.
    pub fn assert(&self, name: &str, value: &serde_json::Value) -> Result<(), SchemaError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType {
                name: name.to_string(),
            })?;

        validate::validate(self, definition, value, &mut Vec::new(), 0)
    }

    /// Builds the qg definition table.
    ///
    /// Mirrors the server's schema: `Command` and `Event` are unions on
    /// `"type"`, `Game` on `"game"`. Event payload fields are flat on the
    /// frame; command payloads sit under `"data"`.
    pub fn qg() -> Schema {
        use Definition::Ref;

        let mut definitions = HashMap::new();

        definitions.insert(
            "Command",
            discriminator(
                "type",
                vec![
                    ("JoinGame", props(vec![("data", Ref("CommandJoinGame"))])),
                    (
                        "JeopardyChooseQuestion",
                        props(vec![("data", Ref("CommandJeopardyChooseQuestion"))]),
                    ),
                ],
            ),
        );
        definitions.insert(
            "CommandJoinGame",
            Definition::Properties(props(vec![
                ("gameID", string()),
                ("playerName", Ref("PlayerName")),
            ])),
        );
        definitions.insert(
            "CommandJeopardyChooseQuestion",
            Definition::Properties(props(vec![
                ("category", string()),
                ("question", string()),
            ])),
        );

        definitions.insert(
            "Event",
            discriminator(
                "type",
                vec![
                    (
                        "JoinedGame",
                        props(vec![
                            ("gameID", string()),
                            ("isAdmin", boolean()),
                            ("gameInfo", Ref("Game")),
                        ]),
                    ),
                    (
                        "PlayerJoined",
                        props(vec![("playerName", Ref("PlayerName"))]),
                    ),
                    (
                        "JeopardyBeginQuestion",
                        props(vec![("category", string()), ("question", string())]),
                    ),
                    (
                        "JeopardyTurnEnded",
                        props(vec![
                            ("currentScore", float64()),
                            ("isChooser", boolean()),
                            ("leaderboard", Ref("Leaderboard")),
                        ]),
                    ),
                    ("GameEnded", props(vec![("leaderboard", Ref("Leaderboard"))])),
                ],
            ),
        );

        definitions.insert(
            "Game",
            discriminator(
                "game",
                vec![
                    ("jeopardy", props(vec![("data", Ref("Jeopardy"))])),
                    ("kahoot", props(vec![("data", Ref("Kahoot"))])),
                ],
            ),
        );
        definitions.insert(
            "Jeopardy",
            Definition::Properties(PropertiesDef {
                required: vec![(
                    "categories",
                    elements(Ref("JeopardyCategory")),
                )],
                optional: vec![
                    ("moderators", boolean()),
                    ("require_name", boolean()),
                    ("score_multiplier", float64()),
                ],
                additional: false,
            }),
        );
        definitions.insert(
            "JeopardyCategory",
            Definition::Properties(props(vec![
                ("name", string()),
                ("questions", elements(Ref("JeopardyQuestion"))),
            ])),
        );
        definitions.insert(
            "JeopardyQuestion",
            Definition::Properties(props(vec![
                ("question", string()),
                ("answers", elements(string())),
                ("correct_answer", int32()),
            ])),
        );
        definitions.insert(
            "Kahoot",
            Definition::Properties(props(vec![
                ("questions", elements(Ref("KahootQuestion"))),
                ("time_limit", string()),
            ])),
        );
        definitions.insert(
            "KahootQuestion",
            Definition::Properties(props(vec![
                ("question", string()),
                ("answers", elements(string())),
            ])),
        );

        definitions.insert("Leaderboard", elements(Ref("LeaderboardEntry")));
        definitions.insert(
            "LeaderboardEntry",
            Definition::Properties(props(vec![("playerName", string()), ("score", int32())])),
        );
        definitions.insert("PlayerName", string());
        definitions.insert(
            "Error",
            Definition::Properties(props(vec![("message", string())])),
        );

        Schema { definitions }
    }

    /// The process-wide qg table.
    pub fn global() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(Schema::qg)
    }
}

/// Validates `value` against the named definition in the registered qg table.
///
/// See [`Schema::assert`] for the error contract.
pub fn assert(name: &str, value: &serde_json::Value) -> Result<(), SchemaError> {
    Schema::global().assert(name, value)
}

// ── Table construction helpers ────────────────────────────────────────────────

fn string() -> Definition {
    Definition::Type(Primitive::String)
}

fn boolean() -> Definition {
    Definition::Type(Primitive::Boolean)
}

fn float64() -> Definition {
    Definition::Type(Primitive::Float64)
}

fn int32() -> Definition {
    Definition::Type(Primitive::Int32)
}

fn elements(inner: Definition) -> Definition {
    Definition::Elements(Box::new(inner))
}

/// An all-required properties form with unknown fields rejected.
fn props(required: Vec<(&'static str, Definition)>) -> PropertiesDef {
    PropertiesDef {
        required,
        optional: Vec::new(),
        additional: false,
    }
}

fn discriminator(
    tag: &'static str,
    mapping: Vec<(&'static str, PropertiesDef)>,
) -> Definition {
    Definition::Discriminator { tag, mapping }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
