//! Live session client.
//!
//! [`LiveSession`] owns one persistent WebSocket connection to a Live API
//! endpoint. A single reactor task per connection owns the socket: it sends
//! the setup message first, then multiplexes the outbound queue, inbound
//! messages, the setup deadline and cancellation with `tokio::select!`.
//!
//! State lives in a `watch` channel and every transition goes through
//! `send_if_modified`, so checks like "is the session active" are cheap and
//! synchronous, and no two contexts can race a transition.
//!
//! # Example
//!
//! ```rust,ignore
//! use live_voice::core::live::{Endpoint, LiveSession, SessionConfig, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::new(
//!         Endpoint::vertex_ai("my-project", "us-central1"),
//!         token,
//!         "projects/my-project/locations/us-central1/publishers/google/models/gemini-live",
//!     )
//!     .with_voice("Aoede");
//!
//!     let session = LiveSession::new(config);
//!     let mut events = session.subscribe();
//!     session.connect().await?;
//!     session.wait_for_active(std::time::Duration::from_secs(10)).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let SessionEvent::AudioChunkReceived(frame) = event {
//!             // schedule playback
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::base::{
    EventCallback, LiveError, LiveResult, SessionEvent, SessionState, SessionStats, ToolResponse,
};
use super::config::{ConnectionOptions, SessionConfig, connection_target};
use super::events::{EventBus, EventStream};
use super::messages::{ClientMessage, ContentPart, InboundMessage, parse_server_message};
use crate::core::frame::AudioFrame;

/// Bound on waiting for the peer's close reply after sending our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on `disconnect()` waiting for the reactor to finish.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Outbound {
    Message(ClientMessage),
    Close,
}

// =============================================================================
// Shared state
// =============================================================================

#[derive(Default)]
struct Counters {
    frames_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_discarded: AtomicU64,
}

/// State shared between the session handle and its reactor.
struct Shared {
    state: watch::Sender<SessionState>,
    bus: EventBus,
    counters: Counters,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move from `from` to `to`; returns whether the transition happened.
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Enter `Closed` and emit `Closed` unless the session already ended.
    fn finish_closed(&self, code: u16, reason: impl Into<String>) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if changed {
            let reason = reason.into();
            info!("Live session closed ({}: {})", code, reason);
            self.bus.publish(SessionEvent::Closed { code, reason });
        }
    }

    /// Enter `Failed` and emit `Error` unless the session already ended.
    fn fail(&self, err: LiveError) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = SessionState::Failed;
                true
            }
        });
        if changed {
            error!("Live session failed: {}", err);
            self.bus.publish(SessionEvent::Error(err));
        }
    }

    fn discard(&self, reason: &LiveError) {
        self.counters.messages_discarded.fetch_add(1, Ordering::Relaxed);
        warn!("Discarding inbound message: {}", reason);
    }
}

struct Link {
    outbound: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

// =============================================================================
// Live Session
// =============================================================================

/// One live voice session.
///
/// All methods take `&self`; wrap the session in an `Arc` to share it
/// between the capture forwarder and the event consumer. Dropping the
/// session cancels its reactor.
pub struct LiveSession {
    config: SessionConfig,
    options: ConnectionOptions,
    shared: Arc<Shared>,
    link: Mutex<Option<Link>>,
    session_id: Mutex<Option<Uuid>>,
}

impl LiveSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_options(config, ConnectionOptions::default())
    }

    pub fn with_options(config: SessionConfig, options: ConnectionOptions) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            options,
            shared: Arc::new(Shared {
                state,
                bus: EventBus::new(),
                counters: Counters::default(),
            }),
            link: Mutex::new(None),
            session_id: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Id of the current (or last) connection, for correlating logs.
    pub fn session_id(&self) -> Option<Uuid> {
        *self.session_id.lock()
    }

    /// Watch state transitions.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        let counters = &self.shared.counters;
        SessionStats {
            frames_sent: counters.frames_sent.load(Ordering::Relaxed),
            messages_received: counters.messages_received.load(Ordering::Relaxed),
            messages_discarded: counters.messages_discarded.load(Ordering::Relaxed),
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> EventStream {
        self.shared.bus.subscribe()
    }

    /// Drive `callback` with every event from now on, on its own task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_event(&self, callback: EventCallback) -> JoinHandle<()> {
        let mut events = self.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                callback(event).await;
            }
        })
    }

    /// Open the transport and send the setup message.
    ///
    /// Returns once the setup message is on the wire and `Opened` has been
    /// emitted; the session is then `AwaitingSetupAck`. Allowed from `Idle`,
    /// `Closed` and `Failed`; any other state is rejected with `InvalidState`.
    pub async fn connect(&self) -> LiveResult<()> {
        self.config.validate()?;
        self.options.validate()?;

        let setup_json = ClientMessage::setup(&self.config).to_json()?;
        let request = self.build_request()?;

        let changed = self.shared.state.send_if_modified(|state| {
            if state.can_connect() {
                *state = SessionState::Connecting;
                true
            } else {
                false
            }
        });
        if !changed {
            return Err(LiveError::InvalidState(format!(
                "cannot connect while {}",
                self.state()
            )));
        }

        let session_id = Uuid::new_v4();
        *self.session_id.lock() = Some(session_id);
        info!(
            "[{}] Connecting live session to {} (model {})",
            session_id,
            self.config.endpoint(),
            self.config.model()
        );

        let (outbound_tx, outbound_rx) = mpsc::channel(self.options.outbound_queue_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let reactor = Reactor {
            shared: self.shared.clone(),
            session_id,
            setup_timeout: self.options.setup_timeout,
            outbound_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(reactor.run(
            request,
            self.options.connect_timeout,
            setup_json,
            ready_tx,
        ));

        if let Some(previous) = self.link.lock().replace(Link {
            outbound: outbound_tx,
            cancel,
            task,
        }) {
            previous.cancel.cancel();
            previous.task.abort();
        }

        match ready_rx.await {
            Ok(result) => result,
            Err(_) => {
                let err = LiveError::Transport("connection task ended unexpectedly".to_string());
                self.shared.fail(err.clone());
                Err(err)
            }
        }
    }

    fn build_request(&self) -> LiveResult<Request> {
        let (url, bearer) = connection_target(&self.config, &self.options)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| LiveError::InvalidConfiguration(format!("invalid WebSocket URL: {e}")))?;
        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| LiveError::InvalidConfiguration(format!("invalid token: {e}")))?;
            request.headers_mut().insert(http::header::AUTHORIZATION, value);
        }
        Ok(request)
    }

    fn outbound(&self) -> Option<mpsc::Sender<Outbound>> {
        self.link.lock().as_ref().map(|link| link.outbound.clone())
    }

    async fn send_active(&self, message: ClientMessage) -> LiveResult<()> {
        let state = self.state();
        if state != SessionState::Active {
            return Err(LiveError::NotReady(state));
        }
        let Some(outbound) = self.outbound() else {
            return Err(LiveError::NotReady(state));
        };
        outbound
            .send(Outbound::Message(message))
            .await
            .map_err(|_| LiveError::Transport("connection task is gone".to_string()))
    }

    /// Send one microphone frame as realtime input.
    ///
    /// Rejected with `NotReady` unless the session is `Active`; nothing is
    /// transmitted in that case.
    pub async fn send_audio_frame(&self, frame: &AudioFrame) -> LiveResult<()> {
        self.send_active(ClientMessage::audio(frame)).await
    }

    /// Send a complete user text turn.
    pub async fn send_text(&self, text: impl Into<String>) -> LiveResult<()> {
        self.send_active(ClientMessage::text(text)).await
    }

    /// Answer tool invocations.
    pub async fn send_tool_response(&self, responses: Vec<ToolResponse>) -> LiveResult<()> {
        if responses.is_empty() {
            return Ok(());
        }
        self.send_active(ClientMessage::tool_response(responses)).await
    }

    /// Wait until the session is `Active`.
    ///
    /// Fails with `InvalidState` if the session ends first and with
    /// `Timeout` if `timeout` elapses.
    pub async fn wait_for_active(&self, timeout: Duration) -> LiveResult<()> {
        let mut rx = self.shared.state.subscribe();
        let waited = tokio::time::timeout(
            timeout,
            rx.wait_for(|state| *state == SessionState::Active || state.is_terminal()),
        )
        .await;
        match waited {
            Ok(Ok(state)) if *state == SessionState::Active => Ok(()),
            Ok(Ok(state)) => Err(LiveError::InvalidState(format!(
                "session ended while waiting to become active ({})",
                *state
            ))),
            Ok(Err(_)) => Err(LiveError::InvalidState("session dropped".to_string())),
            Err(_) => Err(LiveError::Timeout(format!(
                "session not active after {:?}",
                timeout
            ))),
        }
    }

    /// Close the connection with a normal close frame.
    ///
    /// Emits exactly one `Closed`. Calling it again, or on a session that
    /// never connected, is a no-op.
    pub async fn disconnect(&self) -> LiveResult<()> {
        let mut previous = None;
        self.shared.state.send_if_modified(|state| match state {
            SessionState::Connecting | SessionState::AwaitingSetupAck | SessionState::Active => {
                previous = Some(*state);
                *state = SessionState::Closing;
                true
            }
            _ => false,
        });
        let Some(previous) = previous else {
            debug!("disconnect() ignored in state {}", self.state());
            return Ok(());
        };

        let link = self
            .link
            .lock()
            .as_ref()
            .map(|link| (link.outbound.clone(), link.cancel.clone()));
        let Some((outbound, cancel)) = link else {
            self.shared.finish_closed(1000, "client disconnect");
            return Ok(());
        };

        if previous == SessionState::Connecting || outbound.send(Outbound::Close).await.is_err() {
            cancel.cancel();
        }

        let mut rx = self.shared.state.subscribe();
        let timed_out =
            tokio::time::timeout(DISCONNECT_TIMEOUT, rx.wait_for(|state| state.is_terminal()))
                .await
                .is_err();
        if timed_out {
            warn!("Reactor did not finish closing in time, cancelling");
            cancel.cancel();
            self.shared.finish_closed(1000, "client disconnect");
        }
        Ok(())
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.cancel.cancel();
        }
    }
}

// =============================================================================
// Reactor
// =============================================================================

/// The task that owns one connection.
struct Reactor {
    shared: Arc<Shared>,
    session_id: Uuid,
    setup_timeout: Duration,
    outbound_rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
}

impl Reactor {
    async fn run(
        mut self,
        request: Request,
        connect_timeout: Duration,
        setup_json: String,
        ready: oneshot::Sender<LiveResult<()>>,
    ) {
        let ws = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.shared.finish_closed(1000, "client disconnect");
                let _ = ready.send(Err(LiveError::InvalidState(
                    "session disconnected while connecting".to_string(),
                )));
                return;
            }
            result = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(request)) => {
                match result {
                    Ok(Ok((ws, _response))) => ws,
                    Ok(Err(e)) => {
                        let err = LiveError::Transport(format!("WebSocket connect failed: {e}"));
                        self.shared.fail(err.clone());
                        let _ = ready.send(Err(err));
                        return;
                    }
                    Err(_) => {
                        let err = LiveError::Timeout(format!(
                            "WebSocket connect timed out after {:?}",
                            connect_timeout
                        ));
                        self.shared.fail(err.clone());
                        let _ = ready.send(Err(err));
                        return;
                    }
                }
            }
        };

        info!("[{}] WebSocket open", self.session_id);
        let (mut sink, mut stream) = ws.split();

        // The setup message is always the first application message
        if let Err(e) = sink.send(Message::Text(setup_json.into())).await {
            let err = LiveError::Transport(format!("failed to send setup message: {e}"));
            self.shared.fail(err.clone());
            let _ = ready.send(Err(err));
            return;
        }
        debug!("[{}] Setup message sent", self.session_id);

        self.shared
            .transition(SessionState::Connecting, SessionState::AwaitingSetupAck);
        self.shared.bus.publish(SessionEvent::Opened);
        let _ = ready.send(Ok(()));

        let deadline = tokio::time::sleep(self.setup_timeout);
        tokio::pin!(deadline);
        let mut awaiting_ack = true;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("[{}] Reactor cancelled", self.session_id);
                    Self::close_socket(&mut sink, &mut stream).await;
                    self.shared.finish_closed(1000, "client disconnect");
                    break;
                }

                _ = &mut deadline, if awaiting_ack => {
                    // A disconnect queued behind the deadline still wins.
                    if self.shared.state() == SessionState::Closing {
                        Self::close_socket(&mut sink, &mut stream).await;
                        self.shared.finish_closed(1000, "client disconnect");
                        break;
                    }
                    let _ = sink.send(Message::Close(None)).await;
                    self.shared.fail(LiveError::Timeout(format!(
                        "no setup acknowledgment within {:?}",
                        self.setup_timeout
                    )));
                    break;
                }

                command = self.outbound_rx.recv() => match command {
                    Some(Outbound::Message(message)) => {
                        let kind = message.kind();
                        let json = match message.to_json() {
                            Ok(json) => json,
                            Err(e) => {
                                error!("[{}] Dropping outbound {}: {}", self.session_id, kind, e);
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(json.into())).await {
                            self.shared.fail(LiveError::Transport(format!(
                                "failed to send {kind}: {e}"
                            )));
                            break;
                        }
                        if matches!(message, ClientMessage::RealtimeInput(_)) {
                            self.shared.counters.frames_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        trace!("[{}] Sent {}", self.session_id, kind);
                    }
                    Some(Outbound::Close) | None => {
                        Self::close_socket(&mut sink, &mut stream).await;
                        self.shared.finish_closed(1000, "client disconnect");
                        break;
                    }
                },

                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(&text, &mut awaiting_ack);
                    }
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.handle_text(text, &mut awaiting_ack),
                        Err(_) => {
                            self.shared.counters.messages_received.fetch_add(1, Ordering::Relaxed);
                            self.shared.discard(&LiveError::ProtocolViolation(
                                "binary frame is not UTF-8".to_string(),
                            ));
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            debug!("[{}] Failed to send pong: {}", self.session_id, e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                            .unwrap_or((1005, String::new()));
                        self.peer_closed(awaiting_ack, code, reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.shared.fail(LiveError::Transport(e.to_string()));
                        break;
                    }
                    None => {
                        self.peer_closed(awaiting_ack, ABNORMAL_CLOSURE, "connection dropped".to_string());
                        break;
                    }
                },
            }
        }
        debug!("[{}] Reactor finished", self.session_id);
    }

    fn peer_closed(&self, awaiting_ack: bool, code: u16, reason: String) {
        if awaiting_ack && self.shared.state() != SessionState::Closing {
            self.shared.fail(LiveError::Transport(format!(
                "connection closed before setup acknowledgment ({code}: {reason})"
            )));
        } else {
            self.shared.finish_closed(code, reason);
        }
    }

    /// Send a normal close frame and wait briefly for the peer's reply.
    async fn close_socket(
        sink: &mut futures_util::stream::SplitSink<WsStream, Message>,
        stream: &mut futures_util::stream::SplitStream<WsStream>,
    ) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        };
        if sink.send(Message::Close(Some(frame))).await.is_err() {
            return;
        }
        let _ = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
            while let Some(Ok(message)) = stream.next().await {
                if message.is_close() {
                    break;
                }
            }
        })
        .await;
    }

    fn handle_text(&self, text: &str, awaiting_ack: &mut bool) {
        self.shared
            .counters
            .messages_received
            .fetch_add(1, Ordering::Relaxed);

        let message = match parse_server_message(text) {
            Ok(message) => message,
            Err(e) => {
                self.shared.discard(&e);
                return;
            }
        };

        if *awaiting_ack && message.requires_active_session() {
            self.shared.discard(&LiveError::ProtocolViolation(
                "content received before setup acknowledgment".to_string(),
            ));
            return;
        }

        let bus = &self.shared.bus;
        match message {
            InboundMessage::SetupAcknowledged => {
                if *awaiting_ack {
                    *awaiting_ack = false;
                    self.shared
                        .transition(SessionState::AwaitingSetupAck, SessionState::Active);
                    info!("[{}] Live session active", self.session_id);
                    bus.publish(SessionEvent::SetupComplete);
                } else {
                    debug!("[{}] Ignoring repeated setup acknowledgment", self.session_id);
                }
            }
            InboundMessage::ModelContent {
                parts,
                turn_complete,
                interrupted,
            } => {
                if interrupted {
                    debug!("[{}] Model output interrupted", self.session_id);
                    bus.publish(SessionEvent::Interrupted);
                }
                for part in parts {
                    match part {
                        ContentPart::Audio(frame) => {
                            bus.publish(SessionEvent::AudioChunkReceived(frame))
                        }
                        ContentPart::Text(text) => bus.publish(SessionEvent::TextReceived(text)),
                    }
                }
                if turn_complete {
                    bus.publish(SessionEvent::TurnComplete);
                }
            }
            InboundMessage::ToolCall { calls } => {
                for call in calls {
                    info!(
                        "[{}] Tool invoked: {} ({:?})",
                        self.session_id, call.name, call.id
                    );
                    bus.publish(SessionEvent::ToolInvoked(call));
                }
            }
            InboundMessage::ToolCallCancellation { ids } => {
                bus.publish(SessionEvent::ToolCallCancelled(ids));
            }
            InboundMessage::GoAway { time_left } => {
                warn!(
                    "[{}] Service will close the connection (time left: {:?})",
                    self.session_id, time_left
                );
                bus.publish(SessionEvent::GoAway { time_left });
            }
            InboundMessage::Ignored => {
                trace!("[{}] Ignoring inbound message", self.session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::live::config::{Endpoint, TokenPlacement};

    fn session() -> LiveSession {
        LiveSession::new(SessionConfig::new(
            Endpoint::Custom("ws://127.0.0.1:1/live".into()),
            "token",
            "m1",
        ))
    }

    #[tokio::test]
    async fn test_new_session_is_idle() {
        let session = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_active());
        assert_eq!(session.stats(), SessionStats::default());
        assert_eq!(session.session_id(), None);
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_ready() {
        let session = session();
        let frame = AudioFrame::capture(&[0.0; 16]);
        assert_eq!(
            session.send_audio_frame(&frame).await,
            Err(LiveError::NotReady(SessionState::Idle))
        );
        assert!(matches!(
            session.send_text("hi").await,
            Err(LiveError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let session = session();
        let mut events = session.subscribe();
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(events.try_recv(), None);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connecting() {
        let session = LiveSession::new(SessionConfig::new(Endpoint::GeminiApi, "k", ""));
        assert!(matches!(
            session.connect().await,
            Err(LiveError::InvalidConfiguration(_))
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_connect_refused_fails_session() {
        let session = session();
        let mut events = session.subscribe();
        let result = session.connect().await;
        assert!(matches!(result, Err(LiveError::Transport(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(events.recv().await, Some(SessionEvent::Error(_))));
    }

    #[test]
    fn test_bearer_header_request() {
        let session = LiveSession::with_options(
            SessionConfig::new(Endpoint::Custom("wss://example.com/live".into()), "tok", "m"),
            ConnectionOptions {
                token_placement: Some(TokenPlacement::BearerHeader),
                ..Default::default()
            },
        );
        let request = session.build_request().unwrap();
        assert_eq!(request.uri().to_string(), "wss://example.com/live");
        assert_eq!(
            request.headers().get(http::header::AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
    }

    #[test]
    fn test_query_token_request() {
        let request = session().build_request().unwrap();
        assert_eq!(
            request.uri().to_string(),
            "ws://127.0.0.1:1/live?access_token=token"
        );
        assert!(request.headers().get(http::header::AUTHORIZATION).is_none());
    }
}
