//! Typed message catalog for the qg wire protocol.
//!
//! Every frame is a JSON object with a `"type"` field that identifies the
//! variant. Commands nest their payload under a `"data"` object; events
//! flatten their payload fields into the frame itself:
//!
//! ```json
//! {"type":"JoinGame","data":{"gameID":"g1","playerName":"Alice"}}
//! {"type":"PlayerJoined","playerName":"Bob"}
//! ```
//!
//! Game payloads are a second union, discriminated by `"game"` with the
//! payload under `"data"`:
//!
//! ```json
//! {"game":"jeopardy","data":{"categories":[]}}
//! ```
//!
//! # Why separate command and event enums?
//!
//! The two directions carry different information: the client *sends*
//! commands (JoinGame, JeopardyChooseQuestion), the server *sends* events
//! (JoinedGame, PlayerJoined, …). Two distinct enums make it a compile-time
//! error to send an event or project a command.

use serde::{Deserialize, Serialize};

// ── Commands (client → server) ────────────────────────────────────────────────

/// All messages the client can send to the qg server.
///
/// # Serde representation
///
/// ```json
/// {"type":"JoinGame","data":{"gameID":"g1","playerName":"Alice"}}
/// {"type":"JeopardyChooseQuestion","data":{"category":"History","question":"200"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    /// Joins a game by ID under the given player name.
    ///
    /// The server replies with an [`Event::JoinedGame`] addressed to this
    /// client; everyone else in the game sees an [`Event::PlayerJoined`].
    JoinGame {
        /// ID of the game to join.
        #[serde(rename = "gameID")]
        game_id: String,
        /// Wanted display name of the joining player.
        #[serde(rename = "playerName")]
        player_name: String,
    },

    /// Chooses the next question to answer in a Jeopardy game.
    ///
    /// Only the current chooser may do this; the server validates and
    /// answers with [`Event::JeopardyBeginQuestion`].
    JeopardyChooseQuestion {
        /// Category name, matching one of the game's categories.
        category: String,
        /// Question value within the category.
        question: String,
    },
}

impl Command {
    /// Returns the wire discriminator for this command.
    ///
    /// Used in log lines so field values (player names, answers) never end
    /// up in the log output.
    pub fn name(&self) -> &'static str {
        match self {
            Command::JoinGame { .. } => "JoinGame",
            Command::JeopardyChooseQuestion { .. } => "JeopardyChooseQuestion",
        }
    }
}

// ── Events (server → client) ──────────────────────────────────────────────────

/// All messages the qg server can send to the client.
///
/// # Serde representation
///
/// ```json
/// {"type":"JoinedGame","gameID":"g1","isAdmin":true,"gameInfo":{"game":"jeopardy","data":{"categories":[]}}}
/// {"type":"JeopardyTurnEnded","currentScore":200.0,"isChooser":false,"leaderboard":[]}
/// {"type":"GameEnded","leaderboard":[{"playerName":"Alice","score":400}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The current player joined a game. A reply to [`Command::JoinGame`],
    /// delivered only to this client — not to be confused with
    /// [`Event::PlayerJoined`], which everyone in the game receives.
    JoinedGame {
        /// ID of the joined game.
        #[serde(rename = "gameID")]
        game_id: String,
        /// Whether this client is the game's admin.
        #[serde(rename = "isAdmin")]
        is_admin: bool,
        /// The full game payload.
        #[serde(rename = "gameInfo")]
        game_info: Game,
    },

    /// A player joined the current game.
    PlayerJoined {
        /// Display name of the player who joined.
        #[serde(rename = "playerName")]
        player_name: String,
    },

    /// A question began within the current Jeopardy game, after the chooser
    /// picked a category and value. A question value may repeat across
    /// categories; the pair identifies it.
    JeopardyBeginQuestion {
        category: String,
        question: String,
    },

    /// A Jeopardy turn ended (also emitted when the game first starts).
    JeopardyTurnEnded {
        /// This player's score after the turn.
        #[serde(rename = "currentScore")]
        current_score: f64,
        /// Whether this player chooses the next question.
        #[serde(rename = "isChooser")]
        is_chooser: bool,
        leaderboard: Leaderboard,
    },

    /// The current game ended.
    GameEnded { leaderboard: Leaderboard },
}

impl Event {
    /// Returns the tag identifying this event's variant.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::JoinedGame { .. } => EventKind::JoinedGame,
            Event::PlayerJoined { .. } => EventKind::PlayerJoined,
            Event::JeopardyBeginQuestion { .. } => EventKind::JeopardyBeginQuestion,
            Event::JeopardyTurnEnded { .. } => EventKind::JeopardyTurnEnded,
            Event::GameEnded { .. } => EventKind::GameEnded,
        }
    }
}

/// Field-less tag for each [`Event`] variant.
///
/// Used as the `wait_for_event` filter in the session layer, so callers can
/// say *which* events they are waiting for without constructing payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    JoinedGame,
    PlayerJoined,
    JeopardyBeginQuestion,
    JeopardyTurnEnded,
    GameEnded,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::JoinedGame => "JoinedGame",
            EventKind::PlayerJoined => "PlayerJoined",
            EventKind::JeopardyBeginQuestion => "JeopardyBeginQuestion",
            EventKind::JeopardyTurnEnded => "JeopardyTurnEnded",
            EventKind::GameEnded => "GameEnded",
        };
        f.write_str(name)
    }
}

// ── Game payloads ─────────────────────────────────────────────────────────────

/// The main game object, carried inside [`Event::JoinedGame`].
///
/// A union keyed by `"game"` with the payload under `"data"`. Only
/// `jeopardy` is projected into client state today; `kahoot` frames are
/// accepted by the validator but rejected at the projection boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", content = "data")]
pub enum Game {
    #[serde(rename = "jeopardy")]
    Jeopardy(Jeopardy),
    #[serde(rename = "kahoot")]
    Kahoot(Kahoot),
}

/// Game data for a Jeopardy game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jeopardy {
    pub categories: Vec<JeopardyCategory>,

    /// Enables moderators being able to join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderators: Option<bool>,

    /// If true, members must input a name before they can participate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_name: Option<bool>,

    /// Score multiplier for each question. The default is 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_multiplier: Option<f64>,
}

/// A category in a Jeopardy game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JeopardyCategory {
    pub name: String,
    pub questions: Vec<JeopardyQuestion>,
}

/// A question in a Jeopardy game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JeopardyQuestion {
    pub question: String,
    /// The possible answers.
    pub answers: Vec<String>,
    /// Index of the correct answer within `answers`. Starts at 1.
    pub correct_answer: i32,
}

/// Game data for a Kahoot game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kahoot {
    pub questions: Vec<KahootQuestion>,
    /// Time limit for each question, as a duration string such as `"10s"`.
    pub time_limit: String,
}

/// A question in a Kahoot game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KahootQuestion {
    pub question: String,
    pub answers: Vec<String>,
}

// ── Leaderboard ───────────────────────────────────────────────────────────────

/// A list of players and their scores, ordered by the server.
pub type Leaderboard = Vec<LeaderboardEntry>;

/// One player's row on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub score: i32,
}

/// Error payload returned by the server on every API error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// The error message.
    pub message: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
