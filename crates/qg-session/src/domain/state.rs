//! Client-local game state.

use qg_core::{Jeopardy, LeaderboardEntry};

/// The client's projection of the game it has joined.
///
/// Exists only between a `JoinedGame` event and session termination. The
/// player list accumulates `PlayerJoined` events; the embedded jeopardy
/// payload is cleared again when the game ends, while id, admin flag, and
/// players survive until the session closes.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// ID of the joined game.
    pub id: String,
    /// Whether this client administers the game.
    pub is_admin: bool,
    /// Players seen joining, each starting at score 0.
    pub players: Vec<LeaderboardEntry>,
    /// Active jeopardy payload; `None` once the game has ended.
    pub jeopardy: Option<Jeopardy>,
}
