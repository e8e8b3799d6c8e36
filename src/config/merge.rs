//! Merging YAML overrides onto the environment configuration.

use std::path::PathBuf;

use super::ClientConfig;
use super::env::{load_from_env, parse_modalities, parse_token_placement};
use super::yaml::YamlConfig;

/// Environment (with defaults) as the base, YAML values on top.
///
/// A system prompt file is read here when no inline prompt is configured.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    if let Some(yaml) = yaml {
        if let Some(session) = yaml.session {
            if let Some(endpoint) = session.endpoint {
                config.endpoint = endpoint;
            }
            if session.project_id.is_some() {
                config.project_id = session.project_id;
            }
            if let Some(region) = session.region {
                config.region = region;
            }
            if session.access_token.is_some() {
                config.access_token = session.access_token;
            }
            if let Some(model) = session.model {
                config.model = model;
            }
            if session.voice.is_some() {
                config.voice = session.voice;
            }
            if session.system_prompt.is_some() {
                config.system_prompt = session.system_prompt;
            }
            if let Some(path) = session.system_prompt_file {
                config.system_prompt_file = Some(PathBuf::from(path));
            }
            if let Some(modalities) = session.response_modalities {
                config.response_modalities = parse_modalities(modalities.as_slice())?;
            }
            if let Some(tools) = session.tools {
                config.tools = tools;
            }
        }

        if let Some(connection) = yaml.connection {
            if let Some(placement) = connection.token_placement {
                config.token_placement = Some(parse_token_placement(&placement)?);
            }
            if let Some(seconds) = connection.connect_timeout_seconds {
                config.connect_timeout_seconds = seconds;
            }
            if let Some(seconds) = connection.setup_timeout_seconds {
                config.setup_timeout_seconds = seconds;
            }
        }

        if let Some(audio) = yaml.audio {
            if let Some(size) = audio.capture_block_size {
                config.capture_block_size = size;
            }
            if audio.input_device.is_some() {
                config.input_device = audio.input_device;
            }
            if audio.output_device.is_some() {
                config.output_device = audio.output_device;
            }
            if let Some(path) = audio.record_path {
                config.record_path = Some(PathBuf::from(path));
            }
        }
    }

    if config.system_prompt.is_none()
        && let Some(path) = &config.system_prompt_file
    {
        let prompt = std::fs::read_to_string(path).map_err(|e| {
            format!("Failed to read system prompt file {}: {e}", path.display())
        })?;
        config.system_prompt = Some(prompt.trim().to_string()).filter(|p| !p.is_empty());
    }

    Ok(config)
}
