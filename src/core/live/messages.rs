//! Live API WebSocket message types.
//!
//! All messages are JSON objects keyed by their kind. Outbound keys are
//! snake_case; the service answers in camelCase (snake_case aliases are
//! accepted too).
//!
//! Client messages (sent to the service):
//! - `setup` - session configuration, always the first message
//! - `realtime_input` - base64 PCM16 microphone audio
//! - `client_content` - a complete text turn
//! - `tool_response` - results of function calls
//!
//! Server messages (received from the service):
//! - `setupComplete` - setup acknowledged
//! - `serverContent` - model turn parts, `turnComplete`, `interrupted`
//! - `toolCall` - function calls requested by the model
//! - `toolCallCancellation` - function calls withdrawn by the model
//! - `goAway` - the connection will be closed soon
//!
//! Anything else (`usageMetadata`, transcriptions, ...) is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::base::{LiveError, LiveResult, ToolInvocation, ToolResponse};
use super::config::{ResponseModality, SessionConfig, ToolDeclaration};
use crate::core::frame::AudioFrame;

// =============================================================================
// Client messages
// =============================================================================

/// A message sent to the service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Setup(SetupPayload),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponsePayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupPayload {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSet>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSet {
    pub function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResponsePayload {
    pub function_responses: Vec<ToolResponse>,
}

impl ClientMessage {
    /// Build the setup message for `config`.
    pub fn setup(config: &SessionConfig) -> Self {
        let speech_config = config.voice().map(|voice| SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice.to_string(),
                },
            },
        });
        let system_instruction = config.system_prompt().map(|prompt| SystemInstruction {
            parts: vec![TextPart {
                text: prompt.to_string(),
            }],
        });
        let tools = (!config.tools().is_empty()).then(|| {
            vec![ToolSet {
                function_declarations: config.tools().to_vec(),
            }]
        });

        ClientMessage::Setup(SetupPayload {
            model: config.model().to_string(),
            generation_config: GenerationConfig {
                response_modalities: config.response_modalities().to_vec(),
                speech_config,
            },
            system_instruction,
            tools,
        })
    }

    /// Wrap a microphone frame as realtime input.
    pub fn audio(frame: &AudioFrame) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: frame.mime_type().to_string(),
                data: frame.to_portable_text(),
            }],
        })
    }

    /// A complete user text turn.
    pub fn text(text: impl Into<String>) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![Turn {
                role: "user".to_string(),
                parts: vec![TextPart { text: text.into() }],
            }],
            turn_complete: true,
        })
    }

    pub fn tool_response(responses: Vec<ToolResponse>) -> Self {
        ClientMessage::ToolResponse(ToolResponsePayload {
            function_responses: responses,
        })
    }

    /// Message kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Setup(_) => "setup",
            ClientMessage::RealtimeInput(_) => "realtime_input",
            ClientMessage::ClientContent(_) => "client_content",
            ClientMessage::ToolResponse(_) => "tool_response",
        }
    }

    pub fn to_json(&self) -> LiveResult<String> {
        serde_json::to_string(self).map_err(|e| LiveError::Serialization(e.to_string()))
    }
}

// =============================================================================
// Server messages
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    #[serde(default, alias = "server_content")]
    server_content: Option<ServerContent>,
    #[serde(default, alias = "tool_call")]
    tool_call: Option<ToolCallPayload>,
    #[serde(default, alias = "tool_call_cancellation")]
    tool_call_cancellation: Option<ToolCallCancellationPayload>,
    #[serde(default, alias = "go_away")]
    go_away: Option<GoAwayPayload>,
    #[serde(default, alias = "turn_complete")]
    turn_complete: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default, alias = "model_turn")]
    model_turn: Option<ModelTurn>,
    #[serde(default, alias = "turn_complete")]
    turn_complete: Option<bool>,
    #[serde(default)]
    interrupted: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallPayload {
    #[serde(default, alias = "function_calls")]
    function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ToolCallCancellationPayload {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoAwayPayload {
    #[serde(default, alias = "time_left")]
    time_left: Option<Value>,
}

/// One part of a model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Audio(AudioFrame),
    Text(String),
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    SetupAcknowledged,
    ModelContent {
        parts: Vec<ContentPart>,
        turn_complete: bool,
        interrupted: bool,
    },
    ToolCall {
        calls: Vec<ToolInvocation>,
    },
    ToolCallCancellation {
        ids: Vec<String>,
    },
    GoAway {
        time_left: Option<String>,
    },
    /// Valid JSON object of a kind the session does not act on
    Ignored,
}

impl InboundMessage {
    /// Whether this message belongs to an established session.
    ///
    /// Such messages arriving before the setup acknowledgment are out of order.
    pub fn requires_active_session(&self) -> bool {
        !matches!(
            self,
            InboundMessage::SetupAcknowledged | InboundMessage::GoAway { .. } | InboundMessage::Ignored
        )
    }
}

/// Parse one inbound message.
///
/// Invalid JSON, non-object payloads and unexpected shapes are protocol
/// violations; bad base64 in any audio part rejects the whole message.
pub fn parse_server_message(text: &str) -> LiveResult<InboundMessage> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| LiveError::ProtocolViolation(format!("invalid JSON: {e}")))?;
    let Some(object) = value.as_object() else {
        return Err(LiveError::ProtocolViolation(
            "message is not a JSON object".to_string(),
        ));
    };

    if object.contains_key("setupComplete") || object.contains_key("setup_complete") {
        return Ok(InboundMessage::SetupAcknowledged);
    }

    let message: ServerMessage = serde_json::from_value(value)
        .map_err(|e| LiveError::ProtocolViolation(format!("unexpected message shape: {e}")))?;

    let top_level_turn_complete = message.turn_complete.unwrap_or(false);
    if let Some(content) = message.server_content {
        let mut parts = Vec::new();
        for part in content.model_turn.map(|turn| turn.parts).unwrap_or_default() {
            if let Some(inline) = part.inline_data {
                if inline.mime_type.starts_with("audio/") {
                    let frame = AudioFrame::from_portable_text(&inline.mime_type, &inline.data)?;
                    parts.push(ContentPart::Audio(frame));
                } else {
                    trace!("Skipping inline data of type {}", inline.mime_type);
                }
            }
            if let Some(text) = part.text {
                parts.push(ContentPart::Text(text));
            }
        }
        return Ok(InboundMessage::ModelContent {
            parts,
            turn_complete: content.turn_complete.unwrap_or(false) || top_level_turn_complete,
            interrupted: content.interrupted.unwrap_or(false),
        });
    }

    if top_level_turn_complete {
        return Ok(InboundMessage::ModelContent {
            parts: Vec::new(),
            turn_complete: true,
            interrupted: false,
        });
    }

    if let Some(tool_call) = message.tool_call {
        let calls = tool_call
            .function_calls
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.name,
                arguments: match call.args {
                    Value::Null => Value::Object(Default::default()),
                    args => args,
                },
            })
            .collect();
        return Ok(InboundMessage::ToolCall { calls });
    }

    if let Some(cancellation) = message.tool_call_cancellation {
        return Ok(InboundMessage::ToolCallCancellation {
            ids: cancellation.ids,
        });
    }

    if let Some(go_away) = message.go_away {
        let time_left = go_away.time_left.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        });
        return Ok(InboundMessage::GoAway { time_left });
    }

    Ok(InboundMessage::Ignored)
}
