//! Folds session events into the client-local [`GameState`].
//!
//! The projector is one subscriber of the session and one publisher to a
//! [`Store`]: every validated event is folded into the current snapshot
//! and the result published for UI observers.
//!
//! # Ordering rules
//!
//! `JoinedGame` creates the snapshot; every other event mutates it. An
//! event arriving before any `JoinedGame` is out of order — the server
//! only sends game events to joined clients — and is discarded with a
//! debug log rather than treated as a fault. An unrecognized game
//! discriminator inside `JoinedGame`, by contrast, *is* a fault: it means
//! this client does not implement the game the server put us in.

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use qg_core::{Event, Game, LeaderboardEntry};

use crate::domain::state::GameState;
use crate::domain::store::Store;
use crate::infrastructure::session::{Session, SessionNotification};

/// Errors raised while folding an event into game state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// `JoinedGame` carried a game this client does not project.
    #[error("unknown game type {0:?}")]
    UnknownGameType(String),
}

/// Projects session events into a `Store<Option<GameState>>`.
pub struct StateProjector {
    game: Store<Option<GameState>>,
}

impl StateProjector {
    pub fn new() -> Self {
        StateProjector {
            game: Store::new(None),
        }
    }

    /// A handle to the projected state store.
    pub fn game(&self) -> Store<Option<GameState>> {
        self.game.clone()
    }

    /// Subscribes to `session` and spawns the folding task.
    ///
    /// The task ends when the session closes (resetting the store to
    /// `None` — game state only exists between `JoinedGame` and session
    /// termination) or when a projection error makes continuing
    /// meaningless; the error is logged, not swallowed.
    pub fn attach(&self, session: &Session) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let store = self.game.clone();
        let id = session.id();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SessionNotification::Event(event)) => {
                        let mut state = store.get();
                        match Self::apply(&mut state, &event) {
                            Ok(()) => store.set(state),
                            Err(e) => {
                                error!("session {id}: projection failed: {e}");
                                break;
                            }
                        }
                    }
                    Ok(SessionNotification::Open) => {}
                    Ok(SessionNotification::Closed) => {
                        store.set(None);
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // The snapshot may now be missing players; keep
                        // folding rather than presenting nothing at all.
                        warn!("session {id}: projector lagged, skipped {skipped} notifications");
                    }
                    Err(RecvError::Closed) => {
                        store.set(None);
                        break;
                    }
                }
            }
        })
    }

    /// The pure fold: one event into the current snapshot.
    ///
    /// Exposed for tests; [`StateProjector::attach`] drives it from the
    /// live stream.
    pub fn apply(state: &mut Option<GameState>, event: &Event) -> Result<(), ProjectionError> {
        match event {
            Event::JoinedGame {
                game_id,
                is_admin,
                game_info,
            } => match game_info {
                Game::Jeopardy(data) => {
                    // A fresh join replaces the snapshot wholesale.
                    *state = Some(GameState {
                        id: game_id.clone(),
                        is_admin: *is_admin,
                        players: Vec::new(),
                        jeopardy: Some(data.clone()),
                    });
                    Ok(())
                }
                Game::Kahoot(_) => Err(ProjectionError::UnknownGameType("kahoot".to_string())),
            },

            Event::PlayerJoined { player_name } => {
                let Some(game) = state.as_mut() else {
                    discard(event);
                    return Ok(());
                };
                game.players.push(LeaderboardEntry {
                    player_name: player_name.clone(),
                    score: 0,
                });
                Ok(())
            }

            Event::GameEnded { .. } => {
                let Some(game) = state.as_mut() else {
                    discard(event);
                    return Ok(());
                };
                game.jeopardy = None;
                Ok(())
            }

            // Turn events carry no state the snapshot tracks; the UI reads
            // them off the event stream directly.
            Event::JeopardyBeginQuestion { .. } | Event::JeopardyTurnEnded { .. } => {
                if state.is_none() {
                    discard(event);
                }
                Ok(())
            }
        }
    }
}

impl Default for StateProjector {
    fn default() -> Self {
        Self::new()
    }
}

fn discard(event: &Event) {
    debug!("ignoring {} received before JoinedGame", event.kind());
}

// ── Tests ─────────────────────────────────────────────────────────────────────
