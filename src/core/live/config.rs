//! Session configuration and endpoint resolution.
//!
//! A [`SessionConfig`] is built once per session and fully determines the
//! setup message. [`ConnectionOptions`] hold the transport knobs that are
//! not part of the handshake payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;
use zeroize::Zeroize;

use super::base::{LiveError, LiveResult};

/// Vertex AI Live endpoint path, appended to `wss://{region}-aiplatform.googleapis.com`.
pub const VERTEX_AI_LIVE_PATH: &str =
    "/ws/google.cloud.aiplatform.v1.LlmBidiService/BidiGenerateContent";

/// Gemini API Live endpoint for API keys.
pub const GEMINI_API_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Gemini API Live endpoint for ephemeral tokens.
pub const GEMINI_EPHEMERAL_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContentConstrained";

/// Default Vertex AI region.
pub const DEFAULT_REGION: &str = "us-central1";

/// Default native-audio Live model.
pub const DEFAULT_MODEL: &str = "gemini-live-2.5-flash-preview-native-audio-09-2025";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// Endpoint
// =============================================================================

/// Where a session connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Vertex AI `LlmBidiService` in a Google Cloud project
    VertexAi { project_id: String, region: String },
    /// Gemini API with an API key
    GeminiApi,
    /// Gemini API with an ephemeral token
    GeminiEphemeral,
    /// Any compatible `ws://` or `wss://` URL (proxies, tests)
    Custom(String),
}

impl Endpoint {
    pub fn vertex_ai(project_id: impl Into<String>, region: impl Into<String>) -> Self {
        Endpoint::VertexAi {
            project_id: project_id.into(),
            region: region.into(),
        }
    }

    /// Base WebSocket URL without credentials.
    pub fn base_url(&self) -> LiveResult<Url> {
        let raw = match self {
            Endpoint::VertexAi { region, .. } => {
                format!("wss://{region}-aiplatform.googleapis.com{VERTEX_AI_LIVE_PATH}")
            }
            Endpoint::GeminiApi => GEMINI_API_LIVE_URL.to_string(),
            Endpoint::GeminiEphemeral => GEMINI_EPHEMERAL_LIVE_URL.to_string(),
            Endpoint::Custom(url) => url.clone(),
        };
        let url = Url::parse(&raw)
            .map_err(|e| LiveError::InvalidConfiguration(format!("invalid endpoint URL '{raw}': {e}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(LiveError::InvalidConfiguration(format!(
                "endpoint scheme must be ws or wss, got '{other}'"
            ))),
        }
    }

    /// How the credential is attached when the caller does not override it.
    pub fn default_token_placement(&self) -> TokenPlacement {
        match self {
            Endpoint::GeminiApi => TokenPlacement::KeyQuery,
            _ => TokenPlacement::AccessTokenQuery,
        }
    }

    /// Expand a short model id into the resource name this endpoint expects.
    ///
    /// Values that already contain `/` are returned unchanged.
    pub fn expand_model(&self, model: &str) -> String {
        if model.contains('/') {
            return model.to_string();
        }
        match self {
            Endpoint::VertexAi { project_id, region } => format!(
                "projects/{project_id}/locations/{region}/publishers/google/models/{model}"
            ),
            Endpoint::GeminiApi | Endpoint::GeminiEphemeral => format!("models/{model}"),
            Endpoint::Custom(_) => model.to_string(),
        }
    }

    fn validate(&self) -> LiveResult<()> {
        if let Endpoint::VertexAi { project_id, region } = self {
            if project_id.trim().is_empty() {
                return Err(LiveError::InvalidConfiguration(
                    "Vertex AI endpoint requires a project id".to_string(),
                ));
            }
            if region.trim().is_empty() {
                return Err(LiveError::InvalidConfiguration(
                    "Vertex AI endpoint requires a region".to_string(),
                ));
            }
        }
        self.base_url().map(|_| ())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::VertexAi { project_id, region } => {
                write!(f, "vertex-ai({project_id}, {region})")
            }
            Endpoint::GeminiApi => write!(f, "gemini-api"),
            Endpoint::GeminiEphemeral => write!(f, "gemini-ephemeral"),
            Endpoint::Custom(url) => write!(f, "{url}"),
        }
    }
}

/// How the credential token is attached to the WebSocket request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPlacement {
    /// `?access_token=<token>`
    AccessTokenQuery,
    /// `?key=<token>`
    KeyQuery,
    /// `Authorization: Bearer <token>`
    BearerHeader,
}

impl TokenPlacement {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "access_token" | "access_token_query" | "query" => Some(Self::AccessTokenQuery),
            "key" | "key_query" | "api_key" => Some(Self::KeyQuery),
            "bearer" | "bearer_header" | "header" => Some(Self::BearerHeader),
            _ => None,
        }
    }
}

// =============================================================================
// Session configuration
// =============================================================================

/// Output modalities requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
    Text,
}

impl ResponseModality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseModality::Audio => "AUDIO",
            ResponseModality::Text => "TEXT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "AUDIO" => Some(Self::Audio),
            "TEXT" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Immutable description of one session.
///
/// The model string is sent verbatim; expand short ids with
/// [`Endpoint::expand_model`] before building the value. The credential is
/// redacted from `Debug` output and zeroized on drop.
#[derive(Clone)]
pub struct SessionConfig {
    endpoint: Endpoint,
    credential_token: String,
    model: String,
    response_modalities: Vec<ResponseModality>,
    voice: Option<String>,
    system_prompt: Option<String>,
    tools: Vec<ToolDeclaration>,
}

impl SessionConfig {
    /// Audio-only session with no voice, prompt or tools.
    pub fn new(endpoint: Endpoint, credential_token: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            credential_token: credential_token.into(),
            model: model.into(),
            response_modalities: vec![ResponseModality::Audio],
            voice: None,
            system_prompt: None,
            tools: Vec::new(),
        }
    }

    /// Duplicates are dropped, first occurrence wins.
    pub fn with_response_modalities(
        mut self,
        modalities: impl IntoIterator<Item = ResponseModality>,
    ) -> Self {
        let mut unique = Vec::new();
        for modality in modalities {
            if !unique.contains(&modality) {
                unique.push(modality);
            }
        }
        self.response_modalities = unique;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn credential_token(&self) -> &str {
        &self.credential_token
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn response_modalities(&self) -> &[ResponseModality] {
        &self.response_modalities
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn tools(&self) -> &[ToolDeclaration] {
        &self.tools
    }

    pub fn validate(&self) -> LiveResult<()> {
        self.endpoint.validate()?;
        if self.model.trim().is_empty() {
            return Err(LiveError::InvalidConfiguration("model is required".to_string()));
        }
        if self.response_modalities.is_empty() {
            return Err(LiveError::InvalidConfiguration(
                "at least one response modality is required".to_string(),
            ));
        }
        for (i, tool) in self.tools.iter().enumerate() {
            if tool.name.trim().is_empty() {
                return Err(LiveError::InvalidConfiguration(format!(
                    "tool #{i} has an empty name"
                )));
            }
            if self.tools[..i].iter().any(|t| t.name == tool.name) {
                return Err(LiveError::InvalidConfiguration(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("endpoint", &self.endpoint)
            .field("credential_token", &"[REDACTED]")
            .field("model", &self.model)
            .field("response_modalities", &self.response_modalities)
            .field("voice", &self.voice)
            .field("system_prompt", &self.system_prompt)
            .field("tools", &self.tools)
            .finish()
    }
}

impl Drop for SessionConfig {
    fn drop(&mut self) {
        self.credential_token.zeroize();
    }
}

// =============================================================================
// Connection options
// =============================================================================

/// Transport settings that are not part of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Bound on opening the WebSocket
    pub connect_timeout: Duration,
    /// Bound on receiving the setup acknowledgment after open
    pub setup_timeout: Duration,
    /// Capacity of the outbound message queue
    pub outbound_queue_capacity: usize,
    /// Override the endpoint's default token placement
    pub token_placement: Option<TokenPlacement>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            token_placement: None,
        }
    }
}

impl ConnectionOptions {
    pub fn validate(&self) -> LiveResult<()> {
        if self.connect_timeout.is_zero() || self.setup_timeout.is_zero() {
            return Err(LiveError::InvalidConfiguration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(LiveError::InvalidConfiguration(
                "outbound queue capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build the WebSocket URL, placing the token in the query when required.
///
/// Returns the URL and, for header placement, the bearer token.
pub(crate) fn connection_target(
    config: &SessionConfig,
    options: &ConnectionOptions,
) -> LiveResult<(Url, Option<String>)> {
    let mut url = config.endpoint().base_url()?;
    let placement = options
        .token_placement
        .unwrap_or_else(|| config.endpoint().default_token_placement());
    let token = config.credential_token();
    if token.is_empty() {
        return Ok((url, None));
    }
    match placement {
        TokenPlacement::AccessTokenQuery => {
            url.query_pairs_mut().append_pair("access_token", token);
            Ok((url, None))
        }
        TokenPlacement::KeyQuery => {
            url.query_pairs_mut().append_pair("key", token);
            Ok((url, None))
        }
        TokenPlacement::BearerHeader => Ok((url, Some(token.to_string()))),
    }
}
