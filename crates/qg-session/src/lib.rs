//! qg-session library crate.
//!
//! Owns one WebSocket connection to a qg server and turns its frames into
//! a typed event stream and a client-local game-state snapshot.
//!
//! # Architecture
//!
//! ```text
//! qg server (JSON over WebSocket)
//!         ↕
//! [qg-session]
//!   ├── domain/           Pure types: SessionConfig, GameState, Store
//!   ├── application/      StateProjector: event stream → GameState store
//!   └── infrastructure/
//!         └── session/    Session state machine (tokio-tungstenite)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async; it is plain types plus the observer
//!   store primitive.
//! - `application` depends on `domain` and `qg-core` and subscribes to the
//!   session's notifications.
//! - `infrastructure` owns the socket, the read task, and the broadcast
//!   fan-out that everything else subscribes to.
//!
//! # Typical use
//!
//! ```no_run
//! use qg_core::{Command, EventKind};
//! use qg_session::{Session, SessionConfig, StateProjector};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), qg_session::SessionError> {
//! let session = Session::new(SessionConfig::for_origin("http://127.0.0.1:8080").unwrap());
//! session.connect().await?;
//!
//! let projector = StateProjector::new();
//! projector.attach(&session);
//!
//! session
//!     .send(&Command::JoinGame {
//!         game_id: "g1".to_string(),
//!         player_name: "Alice".to_string(),
//!     })
//!     .await?;
//! let joined = session
//!     .wait_for_event(&[EventKind::JoinedGame], Some(Duration::from_secs(10)))
//!     .await?;
//! # let _ = joined;
//! # Ok(())
//! # }
//! ```

/// Domain layer: configuration, game state, and the observer store.
pub mod domain;

/// Application layer: folding the event stream into game state.
pub mod application;

/// Infrastructure layer: the WebSocket session itself.
pub mod infrastructure;

pub use application::projector::{ProjectionError, StateProjector};
pub use domain::config::{ConfigError, SessionConfig, API_VERSION};
pub use domain::state::GameState;
pub use domain::store::{Store, Subscription};
pub use infrastructure::session::{Session, SessionError, SessionNotification, SessionState};
