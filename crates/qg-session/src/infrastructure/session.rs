//! The qg WebSocket session.
//!
//! A [`Session`] owns exactly one WebSocket connection and moves through
//! the states `Idle → Connecting → Open → Closed`. `Closed` is terminal:
//! there is deliberately no automatic reconnection, so callers construct a
//! new `Session` to connect again.
//!
//! # Event fan-out
//!
//! One read task per session pulls frames off the socket, validates them
//! against the `Event` schema, and broadcasts typed
//! [`SessionNotification`]s. Every subscriber — the state projector, UI
//! observers, and each in-flight [`Session::wait_for_event`] call — holds
//! its own broadcast receiver, so a matching event is seen by all of them
//! (fan-out, not a single-consumer queue). Delivery order matches wire
//! arrival order because there is only one read task and one sender.
//!
//! # Frame handling
//!
//! A text frame that fails schema validation is a protocol violation
//! (schema or version mismatch with the server), not a recoverable user
//! error: the read task logs it and terminates the session rather than
//! skipping the frame.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use qg_core::protocol::{decode_event, encode_command, DecodeError};
use qg_core::{Command, Event, EventKind};

use crate::domain::config::SessionConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// Errors that can occur in the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `send` was called outside the `Open` state.
    #[error("not connected")]
    NotConnected,

    /// The connection attempt failed. `code` carries the HTTP status when
    /// the server rejected the upgrade.
    #[error("connection failed (code {code:?}): {reason}")]
    Connection { code: Option<u16>, reason: String },

    /// `wait_for_event` hit its deadline before a matching event arrived.
    #[error("timed out waiting for a matching event")]
    Timeout,

    /// The session closed before the operation could complete, or the
    /// session was already terminal.
    #[error("session closed")]
    SessionClosed,

    /// An outbound command could not be serialized.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The underlying WebSocket transport failed mid-session.
    #[error("websocket transport error: {0}")]
    Transport(String),
}

/// Lifecycle states of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Constructed, not yet connected.
    Idle = 0,
    /// A `connect` call is in flight.
    Connecting = 1,
    /// Connected; frames flow.
    Open = 2,
    /// Terminal. A new session must be constructed to reconnect.
    Closed = 3,
}

impl SessionState {
    fn from_u8(raw: u8) -> SessionState {
        match raw {
            0 => SessionState::Idle,
            1 => SessionState::Connecting,
            2 => SessionState::Open,
            _ => SessionState::Closed,
        }
    }
}

/// Notifications broadcast to session subscribers.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    /// Fired once, on the transition to `Open`.
    Open,
    /// Fired per validated inbound event, in wire arrival order.
    Event(Event),
    /// Fired once, on the transition to `Closed`. Outstanding
    /// `wait_for_event` calls resolve with [`SessionError::SessionClosed`].
    Closed,
}

/// State shared between the session handle and its read task.
struct Shared {
    /// Correlation ID for log lines; never goes on the wire.
    id: Uuid,
    state: AtomicU8,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    notify: broadcast::Sender<SessionNotification>,
}

impl Shared {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves to `Closed` and broadcasts the notification — exactly once,
    /// however many of the read task, `close`, and a failing `connect`
    /// race here.
    async fn transition_closed(&self) {
        let previous = self
            .state
            .swap(SessionState::Closed as u8, Ordering::AcqRel);
        if previous == SessionState::Closed as u8 {
            return;
        }
        *self.writer.lock().await = None;
        debug!("session {}: closed", self.id);
        let _ = self.notify.send(SessionNotification::Closed);
    }

    /// Pulls frames off the socket until it ends or a frame violates the
    /// protocol, then closes the session.
    async fn read_loop(self: Arc<Self>, mut source: WsSource) {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(WsMessage::Text(raw)) => match decode_event(&raw) {
                    Ok(event) => {
                        debug!("session {}: event {}", self.id, event.kind());
                        let _ = self.notify.send(SessionNotification::Event(event));
                    }
                    Err(e) => {
                        error!(
                            "session {}: invalid inbound frame, closing session: {e}",
                            self.id
                        );
                        break;
                    }
                },
                Ok(WsMessage::Binary(_)) => {
                    // The qg protocol is JSON text only.
                    warn!("session {}: unexpected binary frame (ignored)", self.id);
                }
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                    // Protocol-level keepalive, answered by tokio-tungstenite.
                }
                Ok(WsMessage::Close(frame)) => {
                    debug!("session {}: close frame received: {frame:?}", self.id);
                    break;
                }
                Ok(WsMessage::Frame(_)) => {}
                Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                    debug!("session {}: websocket closed", self.id);
                    break;
                }
                Err(e) => {
                    warn!("session {}: websocket transport error: {e}", self.id);
                    break;
                }
            }
        }
        self.transition_closed().await;
    }
}

/// One qg WebSocket session.
///
/// See the [module docs](self) for the lifecycle and fan-out model.
pub struct Session {
    config: SessionConfig,
    shared: Arc<Shared>,
}

impl Session {
    /// Creates an idle session for the configured URL.
    pub fn new(config: SessionConfig) -> Self {
        let (notify, _) = broadcast::channel(config.event_capacity);
        Session {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                state: AtomicU8::new(SessionState::Idle as u8),
                writer: tokio::sync::Mutex::new(None),
                notify,
            }),
            config,
        }
    }

    /// This session's log-correlation ID.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Opens the WebSocket connection.
    ///
    /// On success the session is `Open`, the `Open` notification has been
    /// broadcast, and the read task is running. Calling `connect` while
    /// already connecting or open is a no-op.
    ///
    /// # Errors
    ///
    /// [`SessionError::Connection`] if the dial or the WebSocket upgrade
    /// fails (the session then is `Closed`);
    /// [`SessionError::SessionClosed`] if the session was already terminal.
    pub async fn connect(&self) -> Result<(), SessionError> {
        match self.shared.state.compare_exchange(
            SessionState::Idle as u8,
            SessionState::Connecting as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(current) => {
                return match SessionState::from_u8(current) {
                    SessionState::Closed => Err(SessionError::SessionClosed),
                    _ => Ok(()),
                };
            }
        }

        debug!("session {}: connecting to {}", self.shared.id, self.config.url);

        let (ws, _response) = match connect_async(self.config.url.as_str()).await {
            Ok(pair) => pair,
            Err(e) => {
                let code = match &e {
                    WsError::Http(response) => Some(response.status().as_u16()),
                    _ => None,
                };
                let reason = e.to_string();
                warn!("session {}: connect failed: {reason}", self.shared.id);
                self.shared.transition_closed().await;
                return Err(SessionError::Connection { code, reason });
            }
        };

        let (sink, source) = ws.split();
        *self.shared.writer.lock().await = Some(sink);

        // A close() racing the dial has already made the session terminal;
        // it must stay that way rather than be resurrected here.
        if self
            .shared
            .state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            *self.shared.writer.lock().await = None;
            return Err(SessionError::SessionClosed);
        }

        info!("session {}: open ({})", self.shared.id, self.config.url);
        let _ = self.shared.notify.send(SessionNotification::Open);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.read_loop(source));

        Ok(())
    }

    /// Serializes `command` and writes it as a text frame.
    ///
    /// Sends are fire-and-forget with respect to inbound ordering; pair a
    /// send with [`Session::wait_for_event`] to await the server's answer.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] outside the `Open` state (nothing is
    /// written); [`SessionError::Transport`] if the write itself fails.
    pub async fn send(&self, command: &Command) -> Result<(), SessionError> {
        if self.state() != SessionState::Open {
            return Err(SessionError::NotConnected);
        }
        let frame = encode_command(command)?;

        let mut writer = self.shared.writer.lock().await;
        let sink = writer.as_mut().ok_or(SessionError::NotConnected)?;

        debug!("session {}: sending {}", self.shared.id, command.name());
        sink.send(WsMessage::Text(frame))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Requests termination. Idempotent: the first call sends a close
    /// frame (code 1000 when `graceful`, 1001 otherwise) and broadcasts
    /// the single `Closed` notification; later calls do nothing.
    pub async fn close(&self, graceful: bool) {
        let sink = self.shared.writer.lock().await.take();
        if let Some(mut sink) = sink {
            let frame = CloseFrame {
                code: if graceful {
                    CloseCode::Normal
                } else {
                    CloseCode::Away
                },
                reason: "".into(),
            };
            // Best effort: the peer may already be gone.
            if let Err(e) = sink.send(WsMessage::Close(Some(frame))).await {
                debug!("session {}: close frame send failed: {e}", self.shared.id);
            }
        }
        self.shared.transition_closed().await;
    }

    /// Waits for the next inbound event whose kind is in `filter`
    /// (an empty filter matches any event).
    ///
    /// Each call is its own one-shot registration on the broadcast stream:
    /// concurrent waiters are each independently satisfied by the same
    /// event, and a waiter that resolves — by match, deadline, or close —
    /// takes its registration with it.
    ///
    /// # Errors
    ///
    /// [`SessionError::Timeout`] if `timeout` elapses first (a zero
    /// duration means no deadline); [`SessionError::SessionClosed`] if the
    /// session closes first or was already closed.
    pub async fn wait_for_event(
        &self,
        filter: &[EventKind],
        timeout: Option<Duration>,
    ) -> Result<Event, SessionError> {
        // Subscribe before checking the state so a close racing with this
        // call cannot slip between the check and the registration.
        let mut rx = self.subscribe();
        if self.state() == SessionState::Closed {
            return Err(SessionError::SessionClosed);
        }

        let id = self.shared.id;
        let recv = async move {
            loop {
                match rx.recv().await {
                    Ok(SessionNotification::Event(event))
                        if filter.is_empty() || filter.contains(&event.kind()) =>
                    {
                        return Ok(event);
                    }
                    Ok(SessionNotification::Closed) => return Err(SessionError::SessionClosed),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("session {id}: waiter lagged, skipped {skipped} notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(SessionError::SessionClosed)
                    }
                }
            }
        };

        match timeout {
            Some(limit) if !limit.is_zero() => tokio::time::timeout(limit, recv)
                .await
                .map_err(|_| SessionError::Timeout)?,
            _ => recv.await,
        }
    }

    /// Subscribes to the raw notification stream.
    ///
    /// The receiver sees `Event` notifications in wire arrival order,
    /// then a final `Closed`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.shared.notify.subscribe()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// The networked paths (connect, frame delivery, waiters, close codes) are
// covered end-to-end in tests/session_integration.rs against an in-process
// WebSocket server. The tests here cover what needs no socket.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new(SessionConfig::default());
        let b = Session::new(SessionConfig::default());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_send_while_idle_is_not_connected() {
        let session = Session::new(SessionConfig::default());
        let result = session
            .send(&Command::JoinGame {
                game_id: "g1".to_string(),
                player_name: "Alice".to_string(),
            })
            .await;
        assert!(matches!(result, Err(SessionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails_and_closes() {
        // Port 1 on loopback refuses immediately.
        let session = Session::new(SessionConfig::new("ws://127.0.0.1:1/api/v0/ws"));
        let result = session.connect().await;
        assert!(matches!(result, Err(SessionError::Connection { .. })));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_after_closed_is_session_closed() {
        let session = Session::new(SessionConfig::new("ws://127.0.0.1:1/api/v0/ws"));
        let _ = session.connect().await;
        let result = session.connect().await;
        assert!(matches!(result, Err(SessionError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_wait_for_event_on_closed_session_resolves_immediately() {
        let session = Session::new(SessionConfig::new("ws://127.0.0.1:1/api/v0/ws"));
        let _ = session.connect().await;
        let result = session.wait_for_event(&[], None).await;
        assert!(matches!(result, Err(SessionError::SessionClosed)));
    }

    #[test]
    fn test_state_round_trips_through_repr() {
        for state in [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::Open,
            SessionState::Closed,
        ] {
            assert_eq!(SessionState::from_u8(state as u8), state);
        }
    }
}
