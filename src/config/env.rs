//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ClientConfig;
use crate::core::live::{ResponseModality, TokenPlacement};

pub(crate) const ENV_ENDPOINT: &str = "LIVE_ENDPOINT";
pub(crate) const ENV_PROJECT_ID: &str = "LIVE_PROJECT_ID";
pub(crate) const ENV_REGION: &str = "LIVE_REGION";
pub(crate) const ENV_ACCESS_TOKEN: &str = "LIVE_ACCESS_TOKEN";
pub(crate) const ENV_MODEL: &str = "LIVE_MODEL";
pub(crate) const ENV_VOICE: &str = "LIVE_VOICE";
pub(crate) const ENV_SYSTEM_PROMPT: &str = "LIVE_SYSTEM_PROMPT";
pub(crate) const ENV_SYSTEM_PROMPT_FILE: &str = "LIVE_SYSTEM_PROMPT_FILE";
pub(crate) const ENV_RESPONSE_MODALITIES: &str = "LIVE_RESPONSE_MODALITIES";
pub(crate) const ENV_TOKEN_PLACEMENT: &str = "LIVE_TOKEN_PLACEMENT";
pub(crate) const ENV_CONNECT_TIMEOUT: &str = "LIVE_CONNECT_TIMEOUT_SECONDS";
pub(crate) const ENV_SETUP_TIMEOUT: &str = "LIVE_SETUP_TIMEOUT_SECONDS";
pub(crate) const ENV_CAPTURE_BLOCK_SIZE: &str = "LIVE_CAPTURE_BLOCK_SIZE";
pub(crate) const ENV_INPUT_DEVICE: &str = "LIVE_INPUT_DEVICE";
pub(crate) const ENV_OUTPUT_DEVICE: &str = "LIVE_OUTPUT_DEVICE";
pub(crate) const ENV_RECORD_PATH: &str = "LIVE_RECORD_PATH";

/// Every variable read by [`load_from_env`].
pub const ENV_VARS: &[&str] = &[
    ENV_ENDPOINT,
    ENV_PROJECT_ID,
    ENV_REGION,
    ENV_ACCESS_TOKEN,
    ENV_MODEL,
    ENV_VOICE,
    ENV_SYSTEM_PROMPT,
    ENV_SYSTEM_PROMPT_FILE,
    ENV_RESPONSE_MODALITIES,
    ENV_TOKEN_PLACEMENT,
    ENV_CONNECT_TIMEOUT,
    ENV_SETUP_TIMEOUT,
    ENV_CAPTURE_BLOCK_SIZE,
    ENV_INPUT_DEVICE,
    ENV_OUTPUT_DEVICE,
    ENV_RECORD_PATH,
];

/// Non-empty, trimmed value of `key`.
pub(crate) fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, String> {
    match env_string(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid value for {key}: {value}")),
        None => Ok(None),
    }
}

/// Parse a comma separated modality list such as `AUDIO,TEXT`.
pub(crate) fn parse_modalities<S: AsRef<str>>(values: &[S]) -> Result<Vec<ResponseModality>, String> {
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
        .map(|v| ResponseModality::parse(v).ok_or_else(|| format!("Unknown response modality: {v}")))
        .collect()
}

pub(crate) fn parse_token_placement(value: &str) -> Result<TokenPlacement, String> {
    TokenPlacement::parse(value).ok_or_else(|| format!("Unknown token placement: {value}"))
}

/// Build a configuration from environment variables on top of defaults.
pub(crate) fn load_from_env() -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::default();

    if let Some(endpoint) = env_string(ENV_ENDPOINT) {
        config.endpoint = endpoint;
    }
    config.project_id = env_string(ENV_PROJECT_ID);
    if let Some(region) = env_string(ENV_REGION) {
        config.region = region;
    }
    config.access_token = env_string(ENV_ACCESS_TOKEN);
    if let Some(model) = env_string(ENV_MODEL) {
        config.model = model;
    }
    config.voice = env_string(ENV_VOICE);
    config.system_prompt = env_string(ENV_SYSTEM_PROMPT);
    config.system_prompt_file = env_string(ENV_SYSTEM_PROMPT_FILE).map(PathBuf::from);

    if let Some(modalities) = env_string(ENV_RESPONSE_MODALITIES) {
        let parts: Vec<&str> = modalities.split(',').collect();
        config.response_modalities = parse_modalities(parts.as_slice())?;
    }
    if let Some(placement) = env_string(ENV_TOKEN_PLACEMENT) {
        config.token_placement = Some(parse_token_placement(&placement)?);
    }
    if let Some(seconds) = env_parse(ENV_CONNECT_TIMEOUT)? {
        config.connect_timeout_seconds = seconds;
    }
    if let Some(seconds) = env_parse(ENV_SETUP_TIMEOUT)? {
        config.setup_timeout_seconds = seconds;
    }
    if let Some(size) = env_parse(ENV_CAPTURE_BLOCK_SIZE)? {
        config.capture_block_size = size;
    }
    config.input_device = env_string(ENV_INPUT_DEVICE);
    config.output_device = env_string(ENV_OUTPUT_DEVICE);
    config.record_path = env_string(ENV_RECORD_PATH).map(PathBuf::from);

    Ok(config)
}
