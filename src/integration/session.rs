//! Session and turn-taking state machine.
//!
//! One tagged value replaces independent `connected` / `recording` /
//! `vad` flags, so push-to-talk recording and VAD listening cannot both be
//! active.

use std::fmt;
use std::time::Instant;

/// How turn boundaries are decided
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnMode {
    /// The user holds a button while speaking
    #[default]
    PushToTalk,
    /// The remote service detects end of speech
    VoiceActivity,
}

impl fmt::Display for TurnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnMode::PushToTalk => write!(f, "manual"),
            TurnMode::VoiceActivity => write!(f, "vad"),
        }
    }
}

/// Turn-taking state while connected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// Push-to-talk, button released
    ManualIdle,
    /// Push-to-talk, button held since `started`
    ManualRecording { started: Instant },
    /// VAD with capture paused
    VadIdle,
    /// VAD with capture streaming to the service
    VadListening,
}

impl TurnState {
    pub fn mode(&self) -> TurnMode {
        match self {
            TurnState::ManualIdle | TurnState::ManualRecording { .. } => TurnMode::PushToTalk,
            TurnState::VadIdle | TurnState::VadListening => TurnMode::VoiceActivity,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(
            self,
            TurnState::ManualRecording { .. } | TurnState::VadListening
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::ManualIdle => write!(f, "Manual"),
            TurnState::ManualRecording { .. } => write!(f, "Recording"),
            TurnState::VadIdle => write!(f, "VAD"),
            TurnState::VadListening => write!(f, "Listening"),
        }
    }
}

/// Connection lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// Handshake in progress; user actions other than disconnect are rejected
    Connecting,
    Connected(TurnState),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, SessionState::Disconnected)
    }

    pub fn turn(&self) -> Option<TurnState> {
        match self {
            SessionState::Connected(turn) => Some(*turn),
            _ => None,
        }
    }

    /// Turn mode while connected
    pub fn turn_mode(&self) -> Option<TurnMode> {
        self.turn().map(|turn| turn.mode())
    }

    pub fn is_capturing(&self) -> bool {
        self.turn().is_some_and(|turn| turn.is_capturing())
    }

    /// Start of the current push-to-talk recording
    pub fn recording_started(&self) -> Option<Instant> {
        match self {
            SessionState::Connected(TurnState::ManualRecording { started }) => Some(*started),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Connected(turn) => write!(f, "Connected ({})", turn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        let state = SessionState::default();
        assert!(state.is_disconnected());
        assert_eq!(state.turn_mode(), None);
        assert!(!state.is_capturing());
    }

    #[test]
    fn test_derived_turn_mode() {
        let recording = SessionState::Connected(TurnState::ManualRecording {
            started: Instant::now(),
        });
        assert_eq!(recording.turn_mode(), Some(TurnMode::PushToTalk));
        assert!(recording.is_capturing());
        assert!(recording.recording_started().is_some());

        let listening = SessionState::Connected(TurnState::VadListening);
        assert_eq!(listening.turn_mode(), Some(TurnMode::VoiceActivity));
        assert!(listening.is_capturing());
        assert!(listening.recording_started().is_none());

        assert!(!SessionState::Connected(TurnState::VadIdle).is_capturing());
        assert!(!SessionState::Connecting.is_capturing());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Connecting.to_string(), "Connecting");
        assert_eq!(
            SessionState::Connected(TurnState::VadListening).to_string(),
            "Connected (Listening)"
        );
        assert_eq!(TurnMode::VoiceActivity.to_string(), "vad");
    }
}
