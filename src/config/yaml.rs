use serde::Deserialize;
use std::path::PathBuf;

use crate::core::live::ToolDeclaration;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// session:
///   endpoint: "vertex"
///   project_id: "my-project"
///   region: "us-central1"
///   access_token: "ya29...."
///   model: "gemini-live-2.5-flash-preview-native-audio-09-2025"
///   voice: "Aoede"
///   system_prompt: "You are a friendly diary companion."
///   response_modalities: ["AUDIO"]
///   tools:
///     - name: "save_diary"
///       description: "Save the diary entry"
///       parameters:
///         type: "object"
///         properties:
///           text: { type: "string" }
///
/// connection:
///   token_placement: "access_token"
///   connect_timeout_seconds: 10
///   setup_timeout_seconds: 10
///
/// audio:
///   capture_block_size: 4096
///   input_device: "USB Microphone"
///   output_device: "Speakers"
///   record_path: "/tmp/model-output.wav"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub session: Option<SessionYaml>,
    pub connection: Option<ConnectionYaml>,
    pub audio: Option<AudioYaml>,
}

/// Session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    /// `vertex`, `gemini`, `gemini-ephemeral` or a ws/wss URL
    pub endpoint: Option<String>,
    pub project_id: Option<String>,
    pub region: Option<String>,
    /// OAuth access token, API key or ephemeral token depending on endpoint
    pub access_token: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub system_prompt: Option<String>,
    /// Read the system prompt from this file when `system_prompt` is unset
    pub system_prompt_file: Option<String>,
    pub response_modalities: Option<Vec<String>>,
    pub tools: Option<Vec<ToolDeclaration>>,
}

/// Transport settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConnectionYaml {
    pub token_placement: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
    pub setup_timeout_seconds: Option<u64>,
}

/// Audio device settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub capture_block_size: Option<usize>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub record_path: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
session:
  endpoint: "vertex"
  project_id: "proj"
  region: "europe-west4"
  access_token: "tok"
  model: "gemini-live"
  voice: "Aoede"
  system_prompt: "Be brief."
  response_modalities: ["AUDIO", "TEXT"]
  tools:
    - name: "save_diary"
      description: "Save the entry"
      parameters:
        type: "object"

connection:
  token_placement: "bearer"
  connect_timeout_seconds: 5
  setup_timeout_seconds: 7

audio:
  capture_block_size: 2048
  input_device: "mic"
  output_device: "speakers"
  record_path: "/tmp/out.wav"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let session = config.session.unwrap();
        assert_eq!(session.endpoint.as_deref(), Some("vertex"));
        assert_eq!(session.region.as_deref(), Some("europe-west4"));
        assert_eq!(
            session.response_modalities,
            Some(vec!["AUDIO".to_string(), "TEXT".to_string()])
        );
        let tools = session.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "save_diary");
        assert_eq!(tools[0].parameters, Some(serde_json::json!({"type": "object"})));

        let connection = config.connection.unwrap();
        assert_eq!(connection.token_placement.as_deref(), Some("bearer"));
        assert_eq!(connection.setup_timeout_seconds, Some(7));

        let audio = config.audio.unwrap();
        assert_eq!(audio.capture_block_size, Some(2048));
        assert_eq!(audio.record_path.as_deref(), Some("/tmp/out.wav"));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
session:
  voice: "Puck"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let session = config.session.unwrap();
        assert_eq!(session.voice.as_deref(), Some("Puck"));
        assert!(session.model.is_none());
        assert!(config.connection.is_none());
        assert!(config.audio.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.session.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "session:\n  model: \"m1\"\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.session.unwrap().model.as_deref(), Some("m1"));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
