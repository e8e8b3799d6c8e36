//! Base types for live sessions.
//!
//! Errors, connection states and the caller-facing event surface shared by
//! the session client, the event bus and the frame forwarder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::core::codec::CodecError;
use crate::core::frame::AudioFrame;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a live session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiveError {
    /// The socket failed or closed before the handshake finished
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound payload carried invalid base64
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// An inbound message was unparsable or arrived out of order
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A send was attempted before the session became active
    #[error("Session not ready (state: {0})")]
    NotReady(SessionState),

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The operation is not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Connect or setup acknowledgment timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// An outbound message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CodecError> for LiveError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedEncoding(msg) => LiveError::MalformedEncoding(msg),
        }
    }
}

/// Result type for live session operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle of one session.
///
/// ```text
/// Idle -> Connecting -> AwaitingSetupAck -> Active -> Closing -> Closed
///                 \______________\______________\________\-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    AwaitingSetupAck,
    Active,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    /// `Closed` and `Failed` end a session.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// States from which `connect()` may start a session.
    #[inline]
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Closed | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::AwaitingSetupAck => write!(f, "AwaitingSetupAck"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Closing => write!(f, "Closing"),
            SessionState::Closed => write!(f, "Closed"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call id, echoed back in the tool response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Declared function name
    pub name: String,
    /// JSON arguments object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Result of a tool invocation sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: serde_json::Value,
}

impl ToolResponse {
    /// Respond to `invocation` with `response`.
    pub fn for_invocation(invocation: &ToolInvocation, response: serde_json::Value) -> Self {
        Self {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            response,
        }
    }
}

/// Events emitted by a session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transport open and setup message sent
    Opened,
    /// The service acknowledged the setup message
    SetupComplete,
    /// A chunk of synthesized audio
    AudioChunkReceived(AudioFrame),
    /// A text part of the model turn
    TextReceived(String),
    /// The model asked for a function call
    ToolInvoked(ToolInvocation),
    /// The model withdrew earlier function calls
    ToolCallCancelled(Vec<String>),
    /// Model output was cut off by user speech; pending playback is stale
    Interrupted,
    /// The model finished its turn
    TurnComplete,
    /// The service will close the connection soon
    GoAway { time_left: Option<String> },
    /// The session ended; emitted exactly once per connection
    Closed { code: u16, reason: String },
    /// Setup timeout or transport failure; the session is `Failed`
    Error(LiveError),
}

impl SessionEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Opened => "opened",
            SessionEvent::SetupComplete => "setupComplete",
            SessionEvent::AudioChunkReceived(_) => "audioChunkReceived",
            SessionEvent::TextReceived(_) => "textReceived",
            SessionEvent::ToolInvoked(_) => "toolInvoked",
            SessionEvent::ToolCallCancelled(_) => "toolCallCancelled",
            SessionEvent::Interrupted => "interrupted",
            SessionEvent::TurnComplete => "turnComplete",
            SessionEvent::GoAway { .. } => "goAway",
            SessionEvent::Closed { .. } => "closed",
            SessionEvent::Error(_) => "error",
        }
    }

    /// Whether this event ends the event stream of a connection.
    pub fn is_final(&self) -> bool {
        matches!(self, SessionEvent::Closed { .. } | SessionEvent::Error(_))
    }
}

/// Counters exposed by `LiveSession::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Audio frames handed to the transport
    pub frames_sent: u64,
    /// Inbound messages received
    pub messages_received: u64,
    /// Inbound messages discarded as malformed or out of order
    pub messages_discarded: u64,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for session events.
pub type EventCallback =
    Arc<dyn Fn(SessionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
