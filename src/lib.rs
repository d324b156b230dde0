//! Voxdraft - realtime voice console core
//!
//! Orchestrates a hosted realtime conversational AI session, a microphone
//! capture device and a speaker playback device, and lets the AI edit an
//! email-marketing draft through tool calls.

pub mod audio;
pub mod integration;
pub mod messages;
pub mod realtime;
pub mod ui;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VoxdraftError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<std::io::Error> for VoxdraftError {
    fn from(e: std::io::Error) -> Self {
        VoxdraftError::IOError(e.to_string())
    }
}

impl VoxdraftError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user re-triggers connect; nothing is retried automatically
            VoxdraftError::ConnectionError(_) => true,
            VoxdraftError::TransportError(_) => true,
            // Hardware errors may require user intervention
            VoxdraftError::AudioDeviceError(_) => false,
            VoxdraftError::AudioProcessingError(_) => true,
            VoxdraftError::ToolError(_) => true,
            VoxdraftError::ConfigError(_) => false,
            VoxdraftError::IOError(_) => false,
            VoxdraftError::ChannelError(_) => false,
            VoxdraftError::InvalidState(_) => true,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoxdraftError::ConnectionError(_) => {
                "Could not connect to the realtime service. Please try again.".to_string()
            }
            VoxdraftError::TransportError(_) => {
                "The realtime service reported an error.".to_string()
            }
            VoxdraftError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            VoxdraftError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            VoxdraftError::ToolError(_) => "A tool call could not be applied.".to_string(),
            VoxdraftError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            VoxdraftError::IOError(_) => "File system error occurred.".to_string(),
            VoxdraftError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            VoxdraftError::InvalidState(_) => {
                "That action is not available right now.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxdraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: VoxdraftError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, VoxdraftError::IOError(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_connection_errors_are_recoverable() {
        let err = VoxdraftError::ConnectionError("refused".into());
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("refused"));
        assert!(err.user_message().contains("connect"));
    }
}
