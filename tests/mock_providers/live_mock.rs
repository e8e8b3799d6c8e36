//! WebSocket Mock Server for the Live API
//!
//! Accepts `BidiGenerateContent` connections, records everything the client
//! sends and plays back a scripted sequence of server messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// How the server answers the setup message
#[derive(Debug, Clone)]
pub enum SetupReply {
    /// Send `setupComplete` right away
    Ack,
    /// Send `setupComplete` after a delay
    DelayedAck(Duration),
    /// Never acknowledge
    Silent,
    /// Close the connection instead of acknowledging
    Close(u16, String),
}

/// One scripted server action after the setup reply
#[derive(Debug, Clone)]
pub enum ServerAction {
    Json(Value),
    Raw(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Sleep(Duration),
    Close(u16, String),
}

/// Script for every connection the server accepts
#[derive(Debug, Clone)]
pub struct MockScript {
    pub setup_reply: SetupReply,
    pub actions: Vec<ServerAction>,
}

impl MockScript {
    pub fn ack() -> Self {
        Self {
            setup_reply: SetupReply::Ack,
            actions: Vec::new(),
        }
    }

    pub fn with_setup_reply(setup_reply: SetupReply) -> Self {
        Self {
            setup_reply,
            actions: Vec::new(),
        }
    }

    pub fn then(mut self, action: ServerAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn then_json(self, value: Value) -> Self {
        self.then(ServerAction::Json(value))
    }
}

/// Something the client sent
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Json(Value),
    Pong(Vec<u8>),
    Close(Option<u16>),
}

/// Handshake details of one accepted connection
#[derive(Debug, Clone)]
pub struct HandshakeInfo {
    pub uri: String,
    pub authorization: Option<String>,
}

/// A running mock server bound to an ephemeral port
pub struct LiveMockServer {
    pub url: String,
    received: mpsc::UnboundedReceiver<Received>,
    handshakes: Arc<Mutex<Vec<HandshakeInfo>>>,
    connections: Arc<AtomicUsize>,
    task: tokio::task::JoinHandle<()>,
}

impl LiveMockServer {
    pub async fn start(script: MockScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, received) = mpsc::unbounded_channel();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let handshakes = handshakes.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let script = script.clone();
                    let tx = tx.clone();
                    let handshakes = handshakes.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, script, tx, handshakes).await {
                            eprintln!("Live mock connection error: {}", e);
                        }
                    });
                }
            })
        };

        Self {
            url: format!("ws://{addr}/ws/live"),
            received,
            handshakes,
            connections,
            task,
        }
    }

    /// Next thing the client sent, waiting up to two seconds
    pub async fn next_received(&mut self) -> Option<Received> {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next JSON message, skipping pongs and close frames
    pub async fn next_json(&mut self) -> Option<Value> {
        loop {
            match self.next_received().await? {
                Received::Json(value) => return Some(value),
                _ => continue,
            }
        }
    }

    /// Whatever arrives within `wait`
    pub async fn drain(&mut self, wait: Duration) -> Vec<Received> {
        let mut out = Vec::new();
        let deadline = tokio::time::Instant::now() + wait;
        while let Ok(Some(item)) = tokio::time::timeout_at(deadline, self.received.recv()).await {
            out.push(item);
        }
        out
    }

    pub fn handshakes(&self) -> Vec<HandshakeInfo> {
        self.handshakes.lock().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for LiveMockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Handle a single Live API connection
async fn handle_connection(
    stream: TcpStream,
    script: MockScript,
    tx: mpsc::UnboundedSender<Received>,
    handshakes: Arc<Mutex<Vec<HandshakeInfo>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let callback = |request: &Request, response: Response| {
        handshakes.lock().push(HandshakeInfo {
            uri: request.uri().to_string(),
            authorization: request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        Ok::<Response, ErrorResponse>(response)
    };
    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();

    // The first application message must be the setup message
    let Some(Ok(Message::Text(first))) = read.next().await else {
        return Ok(());
    };
    let setup: Value = serde_json::from_str(&first)?;
    let _ = tx.send(Received::Json(setup));

    match &script.setup_reply {
        SetupReply::Ack => {
            write.send(Message::Text(r#"{"setupComplete":{}}"#.into())).await?;
        }
        SetupReply::DelayedAck(delay) => {
            tokio::time::sleep(*delay).await;
            write.send(Message::Text(r#"{"setupComplete":{}}"#.into())).await?;
        }
        SetupReply::Silent => {}
        SetupReply::Close(code, reason) => {
            write.send(close_message(*code, reason)).await?;
        }
    }

    if !matches!(script.setup_reply, SetupReply::Close(..)) {
        for action in script.actions {
            match action {
                ServerAction::Json(value) => {
                    write.send(Message::Text(value.to_string().into())).await?
                }
                ServerAction::Raw(text) => write.send(Message::Text(text.into())).await?,
                ServerAction::Binary(data) => write.send(Message::Binary(data.into())).await?,
                ServerAction::Ping(data) => write.send(Message::Ping(data.into())).await?,
                ServerAction::Sleep(duration) => tokio::time::sleep(duration).await,
                ServerAction::Close(code, reason) => {
                    write.send(close_message(code, &reason)).await?;
                    break;
                }
            }
        }
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(value) = serde_json::from_str::<Value>(&text) {
                    let _ = tx.send(Received::Json(value));
                }
            }
            Ok(Message::Pong(data)) => {
                let _ = tx.send(Received::Pong(data.to_vec()));
            }
            Ok(Message::Close(frame)) => {
                let _ = tx.send(Received::Close(frame.map(|f| u16::from(f.code))));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    Ok(())
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    }))
}
