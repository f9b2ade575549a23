//! Integration tests for the session lifecycle and event fan-out.
//!
//! # Purpose
//!
//! These tests exercise [`Session`] through its *public* API against a real
//! WebSocket server running in-process: a `tokio-tungstenite` acceptor
//! bound to an ephemeral loopback port, scripted per test. They verify:
//!
//! - The happy path: connect, send a command, receive validated events.
//! - Waiter semantics: filters, timeouts, fan-out to concurrent waiters,
//!   and deterministic resolution on close.
//! - The error paths: unreachable server, send after close, malformed
//!   inbound frames terminating the session.
//! - Close behavior: close-code selection and idempotence.
//!
//! Each test owns its server task; nothing is shared between tests, so
//! they run in parallel without interfering.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use qg_core::{Command, EventKind};
use qg_session::{
    Session, SessionConfig, SessionError, SessionNotification, SessionState, StateProjector,
};

// ── Test harness ──────────────────────────────────────────────────────────────

/// Binds an ephemeral loopback port and serves exactly one WebSocket
/// session with the given handler.
async fn ws_server<F, Fut>(handler: F) -> SocketAddr
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Ok((stream, _peer)) = listener.accept().await {
            let ws = accept_async(stream).await.expect("websocket handshake");
            handler(ws).await;
        }
    });

    addr
}

fn config_for(addr: SocketAddr) -> SessionConfig {
    SessionConfig::new(format!("ws://{addr}/api/v0/ws"))
}

/// The join frame from the wire-protocol description.
const JOINED_GAME_FRAME: &str = r#"{"type":"JoinedGame","gameID":"g1","isAdmin":true,"gameInfo":{"game":"jeopardy","data":{"categories":[]}}}"#;

fn player_joined_frame(name: &str) -> String {
    format!(r#"{{"type":"PlayerJoined","playerName":"{name}"}}"#)
}

/// Keeps the server side open without sending anything further.
async fn hold_open(mut ws: WebSocketStream<TcpStream>) {
    // Drain client frames until the client goes away, so the socket stays
    // up for the whole test.
    while let Some(Ok(_)) = ws.next().await {}
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_reaches_open_and_notifies() {
    let addr = ws_server(hold_open).await;
    let session = Session::new(config_for(addr));
    let mut rx = session.subscribe();

    session.connect().await.expect("connect");

    assert_eq!(session.state(), SessionState::Open);
    assert!(matches!(rx.recv().await, Ok(SessionNotification::Open)));
}

#[tokio::test]
async fn test_joined_game_event_reaches_waiter() {
    let addr = ws_server(|mut ws| async move {
        ws.send(Message::Text(JOINED_GAME_FRAME.to_string()))
            .await
            .expect("server send");
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");

    let event = session
        .wait_for_event(&[EventKind::JoinedGame], Some(Duration::from_secs(2)))
        .await
        .expect("JoinedGame must arrive");

    assert_eq!(event.kind(), EventKind::JoinedGame);
}

#[tokio::test]
async fn test_send_serializes_command_onto_the_wire() {
    let (tx, rx) = oneshot::channel::<String>();
    let addr = ws_server(|mut ws| async move {
        if let Some(Ok(Message::Text(frame))) = ws.next().await {
            let _ = tx.send(frame);
        }
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");
    session
        .send(&Command::JoinGame {
            game_id: "g1".to_string(),
            player_name: "Alice".to_string(),
        })
        .await
        .expect("send");

    let frame = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("server must receive the frame")
        .expect("sender alive");
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["type"], "JoinGame");
    assert_eq!(value["data"]["gameID"], "g1");
    assert_eq!(value["data"]["playerName"], "Alice");
}

#[tokio::test]
async fn test_events_are_delivered_in_arrival_order() {
    let addr = ws_server(|mut ws| async move {
        for frame in [
            JOINED_GAME_FRAME.to_string(),
            player_joined_frame("Alice"),
            player_joined_frame("Bob"),
        ] {
            ws.send(Message::Text(frame)).await.expect("server send");
        }
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    let mut rx = session.subscribe();
    session.connect().await.expect("connect");

    let mut kinds = Vec::new();
    while kinds.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("notification must arrive")
            .expect("stream open")
        {
            SessionNotification::Event(event) => kinds.push(event.kind()),
            SessionNotification::Open => {}
            SessionNotification::Closed => panic!("session closed early"),
        }
    }

    assert_eq!(
        kinds,
        vec![
            EventKind::JoinedGame,
            EventKind::PlayerJoined,
            EventKind::PlayerJoined
        ]
    );
}

// ── Waiter semantics ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wait_for_event_times_out() {
    let addr = ws_server(hold_open).await;
    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");

    let result = session
        .wait_for_event(&[EventKind::GameEnded], Some(Duration::from_millis(50)))
        .await;

    assert!(matches!(result, Err(SessionError::Timeout)));
}

#[tokio::test]
async fn test_close_before_deadline_resolves_waiter_with_session_closed() {
    let addr = ws_server(hold_open).await;
    let session = std::sync::Arc::new(Session::new(config_for(addr)));
    session.connect().await.expect("connect");

    // Waiter has a 50 ms deadline; the session closes at ~30 ms. The
    // waiter must see the close, not the timeout.
    let waiter = tokio::spawn({
        let session = std::sync::Arc::clone(&session);
        async move {
            session
                .wait_for_event(&[EventKind::GameEnded], Some(Duration::from_millis(50)))
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    session.close(true).await;

    let result = waiter.await.expect("waiter task");
    assert!(matches!(result, Err(SessionError::SessionClosed)));
}

#[tokio::test]
async fn test_concurrent_waiters_each_see_the_same_event() {
    let addr = ws_server(|mut ws| async move {
        ws.send(Message::Text(player_joined_frame("Alice")))
            .await
            .expect("server send");
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));

    // Drive both waiters and the connect concurrently. The waiters
    // register their subscriptions on their first poll — before the
    // connect's I/O can complete — so neither can miss the frame the
    // server sends immediately after the handshake.
    let (connected, a, b) = tokio::join!(
        session.connect(),
        session.wait_for_event(&[EventKind::PlayerJoined], Some(Duration::from_secs(2))),
        // Empty filter: any event satisfies this waiter.
        session.wait_for_event(&[], Some(Duration::from_secs(2))),
    );

    connected.expect("connect");
    assert_eq!(a.expect("waiter a").kind(), EventKind::PlayerJoined);
    assert_eq!(b.expect("waiter b").kind(), EventKind::PlayerJoined);
}

#[tokio::test]
async fn test_filtered_waiter_skips_non_matching_events() {
    let addr = ws_server(|mut ws| async move {
        for frame in [
            JOINED_GAME_FRAME.to_string(),
            player_joined_frame("Alice"),
            r#"{"type":"GameEnded","leaderboard":[]}"#.to_string(),
        ] {
            ws.send(Message::Text(frame)).await.expect("server send");
        }
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");

    let event = session
        .wait_for_event(&[EventKind::GameEnded], Some(Duration::from_secs(2)))
        .await
        .expect("GameEnded must arrive");

    assert_eq!(event.kind(), EventKind::GameEnded);
}

// ── Close behavior ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_graceful_close_sends_normal_close_code() {
    let (tx, rx) = oneshot::channel();
    let addr = ws_server(|mut ws| async move {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(frame) = message {
                let _ = tx.send(frame);
                break;
            }
        }
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");
    session.close(true).await;

    let frame = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("close frame must arrive")
        .expect("sender alive")
        .expect("close frame must carry a code");
    assert_eq!(frame.code, CloseCode::Normal);
}

#[tokio::test]
async fn test_abrupt_close_sends_going_away_close_code() {
    let (tx, rx) = oneshot::channel();
    let addr = ws_server(|mut ws| async move {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(frame) = message {
                let _ = tx.send(frame);
                break;
            }
        }
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");
    session.close(false).await;

    let frame = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("close frame must arrive")
        .expect("sender alive")
        .expect("close frame must carry a code");
    assert_eq!(frame.code, CloseCode::Away);
}

#[tokio::test]
async fn test_close_is_idempotent_with_a_single_notification() {
    let addr = ws_server(hold_open).await;
    let session = Session::new(config_for(addr));
    let mut rx = session.subscribe();
    session.connect().await.expect("connect");

    session.close(true).await;
    session.close(true).await;

    // Drain: exactly one Open and exactly one Closed, nothing after.
    assert!(matches!(rx.recv().await, Ok(SessionNotification::Open)));
    assert!(matches!(rx.recv().await, Ok(SessionNotification::Closed)));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_send_after_close_is_not_connected() {
    let addr = ws_server(hold_open).await;
    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");
    session.close(true).await;

    let result = session
        .send(&Command::JeopardyChooseQuestion {
            category: "History".to_string(),
            question: "200".to_string(),
        })
        .await;

    assert!(matches!(result, Err(SessionError::NotConnected)));
}

#[tokio::test]
async fn test_server_dropping_connection_closes_session() {
    let addr = ws_server(|ws| async move {
        drop(ws);
    })
    .await;

    let session = Session::new(config_for(addr));
    let mut rx = session.subscribe();
    session.connect().await.expect("connect");

    // Open, then Closed once the drop is observed.
    assert!(matches!(rx.recv().await, Ok(SessionNotification::Open)));
    let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("close must be observed");
    assert!(matches!(next, Ok(SessionNotification::Closed)));
}

// ── Protocol violations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_frame_terminates_the_session() {
    let addr = ws_server(|mut ws| async move {
        // playerName is required; this frame must fail validation.
        ws.send(Message::Text(r#"{"type":"PlayerJoined"}"#.to_string()))
            .await
            .expect("server send");
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    let mut rx = session.subscribe();
    session.connect().await.expect("connect");

    // The frame is rejected before broadcast, so subscribers see the
    // session die without ever seeing an event.
    assert!(matches!(rx.recv().await, Ok(SessionNotification::Open)));
    let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("close must be observed");
    assert!(matches!(next, Ok(SessionNotification::Closed)));

    let result = session.wait_for_event(&[], None).await;
    assert!(matches!(result, Err(SessionError::SessionClosed)));
}

#[tokio::test]
async fn test_unknown_event_type_terminates_the_session() {
    let addr = ws_server(|mut ws| async move {
        ws.send(Message::Text(
            r#"{"type":"ServerGossip","detail":"?"}"#.to_string(),
        ))
        .await
        .expect("server send");
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    session.connect().await.expect("connect");

    let result = session
        .wait_for_event(&[], Some(Duration::from_secs(2)))
        .await;
    assert!(matches!(result, Err(SessionError::SessionClosed)));
}

// ── Projection end-to-end ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_projector_builds_game_state_from_the_live_stream() {
    let addr = ws_server(|mut ws| async move {
        for frame in [JOINED_GAME_FRAME.to_string(), player_joined_frame("Bob")] {
            ws.send(Message::Text(frame)).await.expect("server send");
        }
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    let projector = StateProjector::new();
    projector.attach(&session);
    session.connect().await.expect("connect");

    let store = projector.game();
    let state = poll_until(Duration::from_secs(2), || {
        store
            .get()
            .filter(|state| state.players.len() == 1)
    })
    .await
    .expect("projected state must appear");

    assert_eq!(state.id, "g1");
    assert!(state.is_admin);
    assert_eq!(state.players[0].player_name, "Bob");
    assert_eq!(state.players[0].score, 0);
    assert!(state.jeopardy.is_some());
}

#[tokio::test]
async fn test_projector_resets_state_when_session_closes() {
    let addr = ws_server(|mut ws| async move {
        ws.send(Message::Text(JOINED_GAME_FRAME.to_string()))
            .await
            .expect("server send");
        hold_open(ws).await;
    })
    .await;

    let session = Session::new(config_for(addr));
    let projector = StateProjector::new();
    let task = projector.attach(&session);
    session.connect().await.expect("connect");

    let store = projector.game();
    poll_until(Duration::from_secs(2), || store.get())
        .await
        .expect("state must exist after JoinedGame");

    session.close(true).await;
    task.await.expect("projector task must end on close");

    assert!(store.get().is_none(), "close must reset the projection");
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Polls `probe` every 10 ms until it yields `Some` or the deadline passes.
async fn poll_until<T>(
    limit: Duration,
    mut probe: impl FnMut() -> Option<T>,
) -> Option<T> {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if let Some(value) = probe() {
            return Some(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
