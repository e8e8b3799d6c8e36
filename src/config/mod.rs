//! Configuration module for the live voice client
//!
//! This module handles client configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use live_voice::config::ClientConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ClientConfig::from_file(&config_path)?;
//!
//! let session_config = config.to_session_config()?;
//! println!("Model: {}", session_config.model());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use env::ENV_VARS;
pub use yaml::{AudioYaml, ConnectionYaml, SessionYaml, YamlConfig};

use crate::core::capture::{CaptureConfig, DEFAULT_BLOCK_SIZE};
use crate::core::live::{
    ConnectionOptions, DEFAULT_MODEL, DEFAULT_REGION, Endpoint, LiveError, LiveResult,
    ResponseModality, SessionConfig, TokenPlacement, ToolDeclaration,
};

const DEFAULT_ENDPOINT: &str = "vertex";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Client configuration
///
/// Everything needed to run a live voice conversation:
/// - Endpoint selection and credentials
/// - Model, voice, system prompt, modalities and tool declarations
/// - Transport timeouts and token placement
/// - Audio device and recording settings
#[derive(Clone)]
pub struct ClientConfig {
    /// `vertex`, `gemini`, `gemini-ephemeral` or a ws/wss URL
    pub endpoint: String,
    pub project_id: Option<String>,
    pub region: String,
    pub access_token: Option<String>,
    /// Short model id or full resource name
    pub model: String,
    pub voice: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<PathBuf>,
    pub response_modalities: Vec<ResponseModality>,
    pub tools: Vec<ToolDeclaration>,

    pub token_placement: Option<TokenPlacement>,
    pub connect_timeout_seconds: u64,
    pub setup_timeout_seconds: u64,

    pub capture_block_size: usize,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    /// Tee model audio into this WAV file
    pub record_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: None,
            region: DEFAULT_REGION.to_string(),
            access_token: None,
            model: DEFAULT_MODEL.to_string(),
            voice: None,
            system_prompt: None,
            system_prompt_file: None,
            response_modalities: vec![ResponseModality::Audio],
            tools: Vec::new(),
            token_placement: None,
            connect_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            setup_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            capture_block_size: DEFAULT_BLOCK_SIZE,
            input_device: None,
            output_device: None,
            record_path: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("response_modalities", &self.response_modalities)
            .field("tools", &self.tools.len())
            .field("token_placement", &self.token_placement)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("setup_timeout_seconds", &self.setup_timeout_seconds)
            .field("capture_block_size", &self.capture_block_size)
            .field("input_device", &self.input_device)
            .field("output_device", &self.output_device)
            .field("record_path", &self.record_path)
            .finish()
    }
}

/// Zeroize the access token when the configuration is dropped.
impl Drop for ClientConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut token) = self.access_token {
            token.zeroize();
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// The .env file is loaded in `main`, so its values are visible here as
    /// regular environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation
    /// fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Resolve the endpoint name into an [`Endpoint`].
    pub fn endpoint(&self) -> Result<Endpoint, String> {
        let value = self.endpoint.trim();
        if value.starts_with("ws://") || value.starts_with("wss://") {
            return Ok(Endpoint::Custom(value.to_string()));
        }
        match value.to_lowercase().replace('_', "-").as_str() {
            "vertex" | "vertex-ai" | "vertexai" => {
                let project_id = self
                    .project_id
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        "The Vertex AI endpoint requires a project id (set LIVE_PROJECT_ID)"
                            .to_string()
                    })?;
                Ok(Endpoint::vertex_ai(project_id, self.region.clone()))
            }
            "gemini" | "gemini-api" => Ok(Endpoint::GeminiApi),
            "gemini-ephemeral" | "ephemeral" => Ok(Endpoint::GeminiEphemeral),
            other => Err(format!("Unknown endpoint: {other}")),
        }
    }

    /// Build the immutable session configuration.
    ///
    /// Short model ids are expanded to the endpoint's resource name.
    pub fn to_session_config(&self) -> LiveResult<SessionConfig> {
        let endpoint = self.endpoint().map_err(LiveError::InvalidConfiguration)?;
        let model = endpoint.expand_model(&self.model);
        let token = self.access_token.clone().unwrap_or_default();

        let mut session = SessionConfig::new(endpoint, token, model)
            .with_response_modalities(self.response_modalities.iter().copied())
            .with_tools(self.tools.clone());
        if let Some(voice) = &self.voice {
            session = session.with_voice(voice.clone());
        }
        if let Some(prompt) = &self.system_prompt {
            session = session.with_system_prompt(prompt.clone());
        }
        Ok(session)
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            setup_timeout: Duration::from_secs(self.setup_timeout_seconds),
            token_placement: self.token_placement,
            ..Default::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::with_block_size(self.capture_block_size)
    }
}
