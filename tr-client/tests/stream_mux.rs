//! Exercises `StreamMux` end-to-end against a loopback websocket peer playing the
//! brokerage's side of the protocol.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use tr_client::config::{Endpoints, HandshakeConfig};
use tr_client::error::{AwaitInitialError, StreamError, TerminalError};
use tr_client::mux::StreamMux;
use tr_client::pager::TimelinePager;

async fn accept_one(listener: TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept connection");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("complete websocket upgrade")
}

async fn spawn_listener() -> (TcpListener, Endpoints) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let endpoints = Endpoints {
        ws_url: format!("ws://{addr}"),
        ..Endpoints::default()
    };
    (listener, endpoints)
}

/// S4: two sequential `timelineTransactions` pages chained by cursor, then no more
/// subscriptions are held open.
#[tokio::test]
async fn pages_chain_by_cursor_and_leave_no_live_subscriptions() {
    let (listener, endpoints) = spawn_listener().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener).await;

        let connect = ws.next().await.unwrap().unwrap();
        assert!(connect.into_text().unwrap().starts_with("connect 31 "));
        ws.send(Message::text("connected {}")).await.unwrap();

        let first_sub = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert!(first_sub.starts_with("sub 1 "));
        assert!(!first_sub.contains("\"after\""));
        ws.send(Message::text(
            r#"1 A {"items":[{"id":"i1"},{"id":"i2"}],"cursors":{"after":"c2"}}"#,
        ))
        .await
        .unwrap();
        let unsub_one = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert_eq!(unsub_one, "unsub 1");

        let second_sub = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert!(second_sub.starts_with("sub 2 "));
        assert!(second_sub.contains("\"after\":\"c2\""));
        ws.send(Message::text(r#"2 A {"items":[{"id":"i3"}],"cursors":{}}"#))
            .await
            .unwrap();
        let unsub_two = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert_eq!(unsub_two, "unsub 2");
    });

    let mux = StreamMux::open(&endpoints, "session-token", &HandshakeConfig::default())
        .await
        .expect("handshake succeeds");
    let items = TimelinePager::new(&mux, "session-token", 0).run().await;
    mux.close().await;
    server.await.expect("server task did not panic");

    let ids: Vec<_> = items.iter().map(|i| i.id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["i1", "i2", "i3"]);
}

/// S5: a server `E` reply surfaces `TerminalError::ServerError` to the awaiter, and the
/// mux stays usable for other subscriptions.
#[tokio::test]
async fn error_reply_surfaces_terminal_error_and_mux_stays_ready() {
    let (listener, endpoints) = spawn_listener().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener).await;
        ws.next().await.unwrap().unwrap();
        ws.send(Message::text("connected")).await.unwrap();

        ws.next().await.unwrap().unwrap();
        ws.send(Message::text(r#"1 E "unauthorized""#)).await.unwrap();

        let second = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert!(second.starts_with("sub 2 "));
        ws.send(Message::text(r#"2 A {"items":[],"cursors":{}}"#))
            .await
            .unwrap();
    });

    let mux = StreamMux::open(&endpoints, "session-token", &HandshakeConfig::default())
        .await
        .unwrap();

    let sub = mux.subscribe(json!({"type": "timelineTransactions"})).await.unwrap();
    let err = mux
        .await_initial(sub, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AwaitInitialError::Terminal(TerminalError::ServerError(ref s)) if s.contains("unauthorized")
    ));

    let sub2 = mux.subscribe(json!({"type": "timelineTransactions"})).await.unwrap();
    let ok = mux.await_initial(sub2, Duration::from_secs(5)).await.unwrap();
    assert_eq!(ok, json!({"items": [], "cursors": {}}));

    mux.close().await;
    server.await.unwrap();
}

/// S6: `await_initial`'s deadline elapsing yields `TerminalError::Timeout`, the mux
/// emits `unsub` for the abandoned subscription, and a late `A` for it is dropped.
#[tokio::test]
async fn await_initial_timeout_cancels_subscription_and_drops_late_reply() {
    let (listener, endpoints) = spawn_listener().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener).await;
        ws.next().await.unwrap().unwrap();
        ws.send(Message::text("connected")).await.unwrap();

        ws.next().await.unwrap().unwrap();
        // Deliberately never reply; wait for the client's unsub, then send a late A.
        let unsub = ws.next().await.unwrap().unwrap().into_text().unwrap();
        assert_eq!(unsub, "unsub 1");
        // The late reply must be silently dropped by the reader; no observer is left.
        let _ = ws.send(Message::text(r#"1 A {"items":[]}"#)).await;
    });

    let mux = StreamMux::open(&endpoints, "session-token", &HandshakeConfig::default())
        .await
        .unwrap();
    let sub = mux.subscribe(json!({"type": "timelineTransactions"})).await.unwrap();
    let err = mux
        .await_initial(sub, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AwaitInitialError::Terminal(TerminalError::Timeout)
    ));

    mux.close().await;
    server.await.unwrap();
}

/// Invariant 1: subscription ids allocated by one mux are never reused.
#[tokio::test]
async fn subscription_ids_are_unique_and_monotonic() {
    let (listener, endpoints) = spawn_listener().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener).await;
        ws.next().await.unwrap().unwrap();
        ws.send(Message::text("connected")).await.unwrap();
        for _ in 0..3 {
            ws.next().await.unwrap().unwrap();
        }
    });

    let mux = StreamMux::open(&endpoints, "session-token", &HandshakeConfig::default())
        .await
        .unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let sub = mux.subscribe(json!({})).await.unwrap();
        ids.push(sub.sub_id);
        mux.unsubscribe(sub.sub_id).await;
    }
    assert_eq!(ids, vec![1, 2, 3]);

    mux.close().await;
    server.await.unwrap();
}

/// Invariant 5: `close()` leaves no live awaiter hanging — a pending subscription
/// observes `StreamError::Closed` rather than hanging forever.
#[tokio::test]
async fn close_cancels_every_pending_awaiter() {
    let (listener, endpoints) = spawn_listener().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener).await;
        ws.next().await.unwrap().unwrap();
        ws.send(Message::text("connected")).await.unwrap();
        ws.next().await.unwrap().unwrap();
        // Never reply; hold the connection open so the only way the awaiter
        // resolves is through the client-side `close()` below.
        let _ = ws.next().await;
    });

    let mux = StreamMux::open(&endpoints, "session-token", &HandshakeConfig::default())
        .await
        .unwrap();
    let sub = mux
        .subscribe(json!({"type": "timelineTransactions"}))
        .await
        .unwrap();

    let mux = std::sync::Arc::new(mux);
    let waiter = tokio::spawn({
        let mux = mux.clone();
        async move { mux.await_initial(sub, Duration::from_secs(5)).await }
    });

    // Give the subscribe frame a moment to land before closing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    mux.close().await;

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("awaiter resolves promptly once the table is cleared")
        .expect("task did not panic");
    assert!(matches!(
        result,
        Err(AwaitInitialError::Stream(StreamError::Closed))
    ));

    server.abort();
}
