//! Configuration for the console
//!
//! Loaded from TOML; every field has a default so a partial file is valid.

use crate::audio::SESSION_SAMPLE_RATE;
use crate::realtime::{SessionUpdate, TranscriptionConfig};
use crate::{Result, VoxdraftError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant that drafts marketing emails. \
When the user asks for an email, call edit_email_marketing with a subject and body. \
Save anything worth remembering about the user with set_memory.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// System instructions for the assistant
    pub instructions: String,

    /// Text sent as the first user turn after connecting
    pub greeting: String,

    /// Voice of the assistant's audio output
    pub voice: String,

    /// Model used to transcribe user audio
    pub transcription_model: String,

    /// Capture rate handed to the session
    pub input_sample_rate: u32,

    /// Rate of audio received from the session
    pub output_sample_rate: u32,

    /// Rate of decoded replay artifacts
    pub decode_sample_rate: u32,

    /// How often spectra are sampled for the visualizers
    pub visualization_interval_ms: u64,

    /// Buffer size of the command channel
    pub channel_buffer_size: usize,

    /// Relay server; when set no API key is required
    pub relay_server_url: Option<String>,

    /// Override for the stored credential location
    pub credential_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            greeting: "Hello!".to_string(),
            voice: "alloy".to_string(),
            transcription_model: "whisper-1".to_string(),
            input_sample_rate: SESSION_SAMPLE_RATE,
            output_sample_rate: SESSION_SAMPLE_RATE,
            decode_sample_rate: SESSION_SAMPLE_RATE,
            visualization_interval_ms: 50,
            channel_buffer_size: 100,
            relay_server_url: None,
            credential_path: None,
        }
    }
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VoxdraftError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            VoxdraftError::ConfigError(msg) => {
                VoxdraftError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ConsoleConfig = toml::from_str(content)
            .map_err(|e| VoxdraftError::ConfigError(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("input_sample_rate", self.input_sample_rate),
            ("output_sample_rate", self.output_sample_rate),
            ("decode_sample_rate", self.decode_sample_rate),
        ];
        for (name, rate) in rates {
            if rate == 0 {
                return Err(VoxdraftError::ConfigError(format!("{} must be non-zero", name)));
            }
        }

        if self.visualization_interval_ms == 0 {
            return Err(VoxdraftError::ConfigError(
                "visualization_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.channel_buffer_size == 0 {
            return Err(VoxdraftError::ConfigError(
                "channel_buffer_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the greeting sent after connecting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Set the assistant instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Route the session through a relay server
    pub fn with_relay_server(mut self, url: impl Into<String>) -> Self {
        self.relay_server_url = Some(url.into());
        self
    }

    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    pub fn with_visualization_interval_ms(mut self, interval: u64) -> Self {
        self.visualization_interval_ms = interval;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Session configuration applied on every connect
    pub fn session_defaults(&self) -> SessionUpdate {
        SessionUpdate {
            instructions: Some(self.instructions.clone()),
            voice: Some(self.voice.clone()),
            input_audio_transcription: Some(TranscriptionConfig {
                model: self.transcription_model.clone(),
            }),
            turn_detection: None,
        }
    }

    pub fn visualization_interval(&self) -> Duration {
        Duration::from_millis(self.visualization_interval_ms)
    }

    /// Whether an API key must be supplied
    pub fn requires_api_key(&self) -> bool {
        self.relay_server_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.greeting, "Hello!");
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.decode_sample_rate, 24_000);
        assert!(config.validate().is_ok());
        assert!(config.requires_api_key());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            greeting = "Hi there"
            relay_server_url = "ws://localhost:8081"
            "#,
        )
        .unwrap();
        assert_eq!(config.greeting, "Hi there");
        assert_eq!(config.voice, "alloy");
        assert!(!config.requires_api_key());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = ConsoleConfig::from_toml_str("decode_sample_rate = 0").unwrap_err();
        assert!(matches!(err, VoxdraftError::ConfigError(_)));
        assert!(ConsoleConfig::default()
            .with_visualization_interval_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "voice = \"verse\"").unwrap();
        writeln!(file, "visualization_interval_ms = 100").unwrap();

        let config = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(config.voice, "verse");
        assert_eq!(config.visualization_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ConsoleConfig::load("/nonexistent/voxdraft.toml").is_err());
    }

    #[test]
    fn test_session_defaults() {
        let update = ConsoleConfig::default().with_voice("echo").session_defaults();
        assert_eq!(update.voice.as_deref(), Some("echo"));
        assert_eq!(
            update.input_audio_transcription.map(|t| t.model).as_deref(),
            Some("whisper-1")
        );
        assert!(update.turn_detection.is_none());
    }
}
