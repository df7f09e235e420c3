//! Owns the single persistent stream connection: the handshake, subscription-id
//! allocation, inbound-frame dispatch, and the serialized outbound writer.
//!
//! Mirrors the teacher's `WebSocketSession` in shape (a thin wrapper that closes the
//! socket on any unexpected condition) but splits the socket into a dedicated reader
//! task and a dedicated writer task, since this protocol — unlike the teacher's
//! request/response pattern — must demultiplex many concurrently pending subscriptions
//! out of one inbound stream. The pending-subscription map keyed by a oneshot sender
//! follows the same shape as `mcp-client`'s pending-request table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tr_types::frame::{Frame, ReplyKind};

use crate::codec;
use crate::config::{Endpoints, HandshakeConfig};
use crate::error::{AwaitInitialError, StreamError, TerminalError};

const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SubTable = Arc<Mutex<HashMap<u32, oneshot::Sender<SubOutcome>>>>;

/// The terminal payload delivered to a subscription's single awaiter.
enum SubOutcome {
    /// The first (canonical) `A` reply.
    Add(Value),
    /// An `E` reply; carries the server's payload.
    Error(Value),
}

/// A handle returned by [`StreamMux::subscribe`]; consumed exactly once by
/// [`StreamMux::await_initial`].
pub struct Subscription {
    /// The allocated subscription id.
    pub sub_id: u32,
    rx: oneshot::Receiver<SubOutcome>,
}

/// The persistent, multiplexed stream connection.
pub struct StreamMux {
    write_tx: mpsc::UnboundedSender<Frame>,
    subs: SubTable,
    next_id: AtomicU32,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamMux {
    /// Opens the websocket, sends the `connect` frame, and waits for `connected` within
    /// the 10 second handshake deadline before spawning the reader and writer tasks.
    ///
    /// Connect headers carry `User-Agent`, `Origin` (the web app's origin from
    /// `endpoints`), and `Cookie: tr_session=<session_token>`, per the external
    /// interface contract; the server rejects the upgrade if any is missing.
    #[tracing::instrument(skip(session_token, handshake), fields(ws_url = %endpoints.ws_url))]
    pub async fn open(
        endpoints: &Endpoints,
        session_token: &str,
        handshake: &HandshakeConfig,
    ) -> Result<Self, StreamError> {
        let mut request = endpoints
            .ws_url
            .as_str()
            .into_client_request()
            .map_err(|err| StreamError::Transport(err.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            "Cookie",
            format!("tr_session={session_token}")
                .parse()
                .map_err(|_| StreamError::Transport("invalid session cookie".to_string()))?,
        );
        headers.insert(
            "User-Agent",
            "TradeRepublic/1.0.0 Android/30"
                .parse()
                .expect("static header value is valid"),
        );
        headers.insert(
            "Origin",
            endpoints
                .origin
                .parse()
                .map_err(|_| StreamError::Transport("invalid origin".to_string()))?,
        );

        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(map_connect_error)?;
        let (mut write_half, mut read_half) = ws_stream.split();

        let connect_frame = Frame::Connect {
            protocol_version: handshake.protocol_version.clone(),
            handshake: handshake.to_json(),
        };
        write_half
            .send(Message::text(codec::encode(&connect_frame)))
            .await
            .map_err(|err| StreamError::Transport(err.to_string()))?;

        await_connected(&mut read_half).await?;

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let subs: SubTable = Arc::new(Mutex::new(HashMap::new()));

        let writer_task = tokio::spawn(writer_loop(write_half, write_rx));
        let reader_task = tokio::spawn(reader_loop(read_half, subs.clone(), write_tx.clone()));

        Ok(Self {
            write_tx,
            subs,
            next_id: AtomicU32::new(1),
            reader_task: Mutex::new(Some(reader_task)),
            writer_task: Mutex::new(Some(writer_task)),
        })
    }

    /// Allocates the next `sub_id`, sends a `sub` frame, and registers the subscription
    /// as pending. Non-blocking: returns as soon as the frame is enqueued.
    #[tracing::instrument(skip(self, payload))]
    pub async fn subscribe(&self, payload: Value) -> Result<Subscription, StreamError> {
        let sub_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.subs.lock().await.insert(sub_id, tx);
        self.write_tx
            .send(Frame::Sub { sub_id, payload })
            .map_err(|_| StreamError::Closed)?;
        tracing::debug!(sub_id, "subscription opened");
        Ok(Subscription { sub_id, rx })
    }

    /// Waits for the first `A` or `E` reply for `sub`, or for `timeout` to elapse.
    ///
    /// On any outcome other than a pending mux shutdown mid-wait, the mux has already
    /// (or is about to) retire the subscription: on `A` it sends `unsub` on the
    /// caller's behalf; on timeout it cancels the subscription itself; on `E` the
    /// subscription is already closed with no `unsub` emitted.
    #[tracing::instrument(skip(self, sub), fields(sub_id = sub.sub_id))]
    pub async fn await_initial(
        &self,
        sub: Subscription,
        timeout: Duration,
    ) -> Result<Value, AwaitInitialError> {
        let sub_id = sub.sub_id;
        match tokio::time::timeout(timeout, sub.rx).await {
            Ok(Ok(SubOutcome::Add(payload))) => Ok(payload),
            Ok(Ok(SubOutcome::Error(payload))) => {
                Err(TerminalError::ServerError(payload.to_string()).into())
            }
            Ok(Err(_)) => Err(StreamError::Closed.into()),
            Err(_elapsed) => {
                tracing::warn!(sub_id, "await_initial timed out, cancelling subscription");
                self.cancel_pending(sub_id).await;
                Err(TerminalError::Timeout.into())
            }
        }
    }

    /// Idempotently cancels a pending subscription before it has produced a result.
    pub async fn unsubscribe(&self, sub_id: u32) {
        self.cancel_pending(sub_id).await;
    }

    async fn cancel_pending(&self, sub_id: u32) {
        if self.subs.lock().await.remove(&sub_id).is_some() {
            let _ = self.write_tx.send(Frame::Unsub {
                sub_id,
                payload: None,
            });
        }
    }

    /// Cancels every pending awaiter with `StreamError::Closed` and tears down both
    /// background tasks. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) {
        self.subs.lock().await.clear();
        if let Some(handle) = self.reader_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.writer_task.lock().await.take() {
            handle.abort();
        }
        tracing::debug!("mux closed");
    }
}

async fn await_connected(
    read_half: &mut SplitStream<WsStream>,
) -> Result<(), StreamError> {
    let wait = async {
        loop {
            match read_half.next().await {
                Some(Ok(Message::Text(text))) => match codec::decode(text.as_str()) {
                    Ok(Frame::Connected(_)) => return Ok(()),
                    Ok(other) => {
                        tracing::trace!(?other, "ignoring frame before handshake completes")
                    }
                    Err(err) => tracing::warn!(%err, "decode error during handshake"),
                },
                Some(Ok(Message::Close(_))) | None => return Err(StreamError::AuthRejected),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(StreamError::Transport(err.to_string())),
            }
        }
    };
    match tokio::time::timeout(HANDSHAKE_DEADLINE, wait).await {
        Ok(result) => result,
        Err(_elapsed) => Err(StreamError::Timeout),
    }
}

async fn writer_loop(
    mut write_half: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Frame>,
) {
    while let Some(frame) = rx.recv().await {
        let line = codec::encode(&frame);
        tracing::trace!(%line, "> sending frame");
        if let Err(err) = write_half.send(Message::text(line)).await {
            tracing::error!(%err, "transport write error, stopping writer");
            break;
        }
    }
    let _ = write_half.close().await;
}

async fn reader_loop(mut read_half: SplitStream<WsStream>, subs: SubTable, write_tx: mpsc::UnboundedSender<Frame>) {
    loop {
        match read_half.next().await {
            Some(Ok(Message::Text(text))) => {
                tracing::trace!(%text, "< received frame");
                match codec::decode(text.as_str()) {
                    Ok(Frame::Reply {
                        sub_id,
                        kind,
                        payload,
                    }) => dispatch_reply(&subs, &write_tx, sub_id, kind, payload).await,
                    Ok(Frame::Connected(_)) => tracing::trace!("ignoring connected after ready"),
                    Ok(Frame::Echo(_)) => tracing::trace!("echo"),
                    Ok(other) => tracing::warn!(?other, "unexpected outbound-only frame from server"),
                    Err(err) => tracing::warn!(%err, "dropping malformed frame"),
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                tracing::error!(%err, "transport read error, tearing down mux");
                break;
            }
        }
    }
    subs.lock().await.clear();
}

async fn dispatch_reply(
    subs: &SubTable,
    write_tx: &mpsc::UnboundedSender<Frame>,
    sub_id: u32,
    kind: ReplyKind,
    payload: Option<Value>,
) {
    match kind {
        ReplyKind::Add => {
            let sender = subs.lock().await.remove(&sub_id);
            match sender {
                Some(tx) => {
                    let _ = tx.send(SubOutcome::Add(payload.unwrap_or(Value::Null)));
                    let _ = write_tx.send(Frame::Unsub {
                        sub_id,
                        payload: None,
                    });
                }
                None => tracing::warn!(sub_id, "A for unknown or already-closed subscription"),
            }
        }
        ReplyKind::Error => {
            let sender = subs.lock().await.remove(&sub_id);
            match sender {
                Some(tx) => {
                    let _ = tx.send(SubOutcome::Error(payload.unwrap_or(Value::Null)));
                }
                None => tracing::warn!(sub_id, "E for unknown or already-closed subscription"),
            }
        }
        ReplyKind::Continue | ReplyKind::Delta => {
            if !subs.lock().await.contains_key(&sub_id) {
                tracing::debug!(sub_id, ?kind, "frame for unknown/closed subscription, dropping");
            }
        }
    }
}

fn map_connect_error(err: tungstenite::Error) -> StreamError {
    if let tungstenite::Error::Http(response) = &err {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return StreamError::AuthRejected;
        }
    }
    StreamError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_reply_resolves_pending_and_emits_unsub() {
        let subs: SubTable = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        subs.lock().await.insert(1, tx);
        let (write_tx, mut write_rx) = mpsc::unbounded_channel();

        dispatch_reply(&subs, &write_tx, 1, ReplyKind::Add, Some(json!({"ok": true}))).await;

        assert!(subs.lock().await.is_empty());
        let outcome = rx.await.unwrap();
        match outcome {
            SubOutcome::Add(v) => assert_eq!(v, json!({"ok": true})),
            SubOutcome::Error(_) => panic!("expected Add"),
        }
        match write_rx.try_recv().unwrap() {
            Frame::Unsub { sub_id, payload } => {
                assert_eq!(sub_id, 1);
                assert_eq!(payload, None);
            }
            other => panic!("expected Unsub, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_reply_resolves_pending_with_no_unsub() {
        let subs: SubTable = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        subs.lock().await.insert(1, tx);
        let (write_tx, mut write_rx) = mpsc::unbounded_channel();

        dispatch_reply(
            &subs,
            &write_tx,
            1,
            ReplyKind::Error,
            Some(json!("unauthorized")),
        )
        .await;

        assert!(subs.lock().await.is_empty());
        match rx.await.unwrap() {
            SubOutcome::Error(v) => assert_eq!(v, json!("unauthorized")),
            SubOutcome::Add(_) => panic!("expected Error"),
        }
        assert!(write_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reply_for_unknown_sub_id_is_dropped_silently() {
        let subs: SubTable = Arc::new(Mutex::new(HashMap::new()));
        let (write_tx, mut write_rx) = mpsc::unbounded_channel();

        dispatch_reply(&subs, &write_tx, 42, ReplyKind::Add, None).await;

        assert!(write_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_add_for_same_sub_is_a_no_op() {
        let subs: SubTable = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        subs.lock().await.insert(1, tx);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();

        dispatch_reply(&subs, &write_tx, 1, ReplyKind::Add, Some(json!(1))).await;
        // the sender was already consumed; a second Add for the same id now finds
        // nothing in the map, matching "first A is canonical".
        dispatch_reply(&subs, &write_tx, 1, ReplyKind::Add, Some(json!(2))).await;

        assert_eq!(rx.await.unwrap().try_into_value(), json!(1));
    }

    impl SubOutcome {
        fn try_into_value(self) -> Value {
            match self {
                SubOutcome::Add(v) | SubOutcome::Error(v) => v,
            }
        }
    }
}
