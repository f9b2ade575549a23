//! qg terminal client — entry point.
//!
//! Connects to a qg server over WebSocket, joins a game, and logs the
//! event stream and the projected game state until the session ends or the
//! user presses Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! qg-client --game <GAME_ID> --name <PLAYER_NAME> [OPTIONS]
//!
//! Options:
//!   --origin <URL>          HTTP(S) origin of the qg server [default: http://127.0.0.1:8080]
//!   --url <WS_URL>          Explicit WebSocket URL (overrides --origin)
//!   --join-timeout <SECS>   Seconds to wait for the JoinedGame reply [default: 10]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable          | Default                 | Description                   |
//! |-------------------|-------------------------|-------------------------------|
//! | `QG_ORIGIN`       | `http://127.0.0.1:8080` | Server origin                 |
//! | `QG_URL`          | (derived)               | Explicit WebSocket URL        |
//! | `QG_GAME`         | —                       | Game ID to join               |
//! | `QG_NAME`         | —                       | Player name                   |
//! | `QG_JOIN_TIMEOUT` | `10`                    | JoinedGame reply timeout      |
//!
//! Log output goes through `tracing-subscriber`; set `RUST_LOG=debug` to
//! watch individual frames.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use qg_core::{Command, Event, EventKind};
use qg_session::{GameState, Session, SessionConfig, SessionNotification, StateProjector};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Terminal client for qg multiplayer quiz games.
#[derive(Debug, Parser)]
#[command(
    name = "qg-client",
    about = "Join a qg quiz game and follow its event stream",
    version
)]
struct Cli {
    /// HTTP(S) origin of the qg server.
    ///
    /// The WebSocket endpoint is derived from it as `/api/v0/ws`, with
    /// `https` mapping to `wss` and `http` to `ws`.
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "QG_ORIGIN")]
    origin: String,

    /// Explicit WebSocket URL. Overrides `--origin` when set.
    #[arg(long, env = "QG_URL")]
    url: Option<String>,

    /// ID of the game to join.
    #[arg(long, env = "QG_GAME")]
    game: String,

    /// Player name to join under.
    #[arg(long, env = "QG_NAME")]
    name: String,

    /// Seconds to wait for the server's JoinedGame reply.
    #[arg(long, default_value_t = 10, env = "QG_JOIN_TIMEOUT")]
    join_timeout: u64,
}

impl Cli {
    /// Builds the session configuration from `--url` or `--origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `--origin` is not an HTTP(S) URL.
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        match &self.url {
            Some(url) => Ok(SessionConfig::new(url.clone())),
            None => SessionConfig::for_origin(&self.origin)
                .with_context(|| format!("invalid origin '{}'", self.origin)),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.session_config()?;

    info!("qg client starting — {}", config.url);

    let session = Session::new(config);
    session
        .connect()
        .await
        .context("failed to connect to the qg server")?;

    // Project the event stream into game state and log each new snapshot.
    let projector = StateProjector::new();
    projector.attach(&session);
    let _state_sub = projector.game().subscribe(log_state);

    // Subscribe before joining so the event log misses nothing.
    let mut notifications = session.subscribe();

    session
        .send(&Command::JoinGame {
            game_id: cli.game.clone(),
            player_name: cli.name.clone(),
        })
        .await
        .context("failed to send JoinGame")?;

    session
        .wait_for_event(
            &[EventKind::JoinedGame],
            Some(Duration::from_secs(cli.join_timeout)),
        )
        .await
        .with_context(|| format!("no JoinedGame reply for game '{}'", cli.game))?;

    // Stream events until the server closes the session or the user
    // interrupts.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C — closing session");
                session.close(true).await;
                break;
            }
            notification = notifications.recv() => match notification {
                Ok(SessionNotification::Event(event)) => log_event(&event),
                Ok(SessionNotification::Open) => {}
                Ok(SessionNotification::Closed) => {
                    info!("session closed");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event log lagged, skipped {skipped} notifications");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}

// ── Log formatting ────────────────────────────────────────────────────────────

fn log_state(state: &Option<GameState>) {
    match state {
        Some(state) => {
            let phase = if state.jeopardy.is_some() {
                "in progress"
            } else {
                "over"
            };
            info!(
                "game {} — {} player(s), {phase}",
                state.id,
                state.players.len()
            );
        }
        None => debug!("no active game"),
    }
}

fn log_event(event: &Event) {
    match event {
        Event::JoinedGame {
            game_id, is_admin, ..
        } => {
            let role = if *is_admin { "admin" } else { "player" };
            info!("joined game {game_id} as {role}");
        }
        Event::PlayerJoined { player_name } => info!("player joined: {player_name}"),
        Event::JeopardyBeginQuestion { category, question } => {
            info!("question begins: {category} / {question}");
        }
        Event::JeopardyTurnEnded {
            current_score,
            is_chooser,
            leaderboard,
        } => {
            info!(
                "turn ended — score {current_score}, {} on the board{}",
                leaderboard.len(),
                if *is_chooser { ", you choose next" } else { "" }
            );
        }
        Event::GameEnded { leaderboard } => {
            info!("game ended");
            for (rank, entry) in leaderboard.iter().enumerate() {
                info!("  {}. {} — {}", rank + 1, entry.player_name, entry.score);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
