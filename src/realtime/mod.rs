//! Realtime session seam.
//!
//! The hosted conversational AI is reached through a [`RealtimeSessionClient`]
//! supplied by the embedding application. The client keeps the canonical
//! conversation state and reports everything that happens on the connection
//! through a single [`SessionEvent`] channel, taken once by the orchestrator.
//!
//! # Audio Format
//!
//! Input and output audio are PCM 16-bit mono at 24kHz.

pub mod tools;

pub use tools::{
    edit_email_marketing_definition, register_tools, set_memory_definition,
    EditEmailMarketingTool, SetMemoryTool, ToolDefinition, ToolHandler,
};

use crate::integration::TurnMode;
use crate::messages::{ConversationItem, EventSource, ItemDelta};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Turn detection as configured on the remote session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Manual turns: the client commits audio and requests responses
    #[serde(rename = "none")]
    None,
    /// Server-side voice activity detection
    #[serde(rename = "server_vad")]
    ServerVad {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
}

impl TurnDetection {
    pub fn server_vad() -> Self {
        TurnDetection::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }

    pub fn is_server_vad(&self) -> bool {
        matches!(self, TurnDetection::ServerVad { .. })
    }
}

impl From<TurnMode> for TurnDetection {
    fn from(mode: TurnMode) -> Self {
        match mode {
            TurnMode::PushToTalk => TurnDetection::None,
            TurnMode::VoiceActivity => TurnDetection::server_vad(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub model: String,
}

/// Partial session configuration; unset fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

impl SessionUpdate {
    pub fn turn_detection(turn_detection: TurnDetection) -> Self {
        Self {
            turn_detection: Some(turn_detection),
            ..Default::default()
        }
    }
}

/// A piece of user content sent as one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
}

impl ContentPart {
    pub fn input_text(text: impl Into<String>) -> Self {
        ContentPart::InputText { text: text.into() }
    }
}

/// Raw protocol event observed on the connection, in either direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub time: DateTime<Utc>,
    pub source: EventSource,
    pub event: Value,
}

impl RealtimeEvent {
    pub fn new(source: EventSource, event: Value) -> Self {
        Self {
            time: Utc::now(),
            source,
            event,
        }
    }
}

/// Everything the client reports to the orchestrator
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Any protocol event, for the event log
    Realtime(RealtimeEvent),
    /// Error reported by the remote service or transport
    Error(Value),
    /// The remote side detected a barge-in; playback should stop
    ConversationInterrupted,
    /// An item was created, streamed into or completed
    ConversationUpdated {
        item: ConversationItem,
        delta: Option<ItemDelta>,
    },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Realtime(e) => write!(
                f,
                "realtime.event({})",
                e.event.get("type").and_then(Value::as_str).unwrap_or("?")
            ),
            SessionEvent::Error(_) => write!(f, "error"),
            SessionEvent::ConversationInterrupted => write!(f, "conversation.interrupted"),
            SessionEvent::ConversationUpdated { item, .. } => {
                write!(f, "conversation.updated({})", item.id)
            }
        }
    }
}

/// Client for a hosted realtime conversational AI session.
///
/// Calls that perform I/O are async and must be awaited before any dependent
/// call. Sending user content is expected to also request a response, as the
/// hosted service's client libraries do.
#[async_trait(?Send)]
pub trait RealtimeSessionClient {
    /// Open the remote session
    async fn connect(&mut self) -> Result<()>;

    /// Close the remote session
    async fn disconnect(&mut self) -> Result<()>;

    /// Drop tools and configuration, returning the client to its defaults
    fn reset(&mut self);

    fn is_connected(&self) -> bool;

    /// Update the session configuration. Allowed before `connect`; the
    /// configuration is applied once the session opens.
    async fn update_session(&mut self, update: SessionUpdate) -> Result<()>;

    /// Register a tool the remote AI may call
    fn add_tool(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>)
        -> Result<()>;

    /// Send content as a user turn
    async fn send_user_message_content(&mut self, content: Vec<ContentPart>) -> Result<()>;

    /// Append captured PCM16 audio to the input buffer
    async fn append_input_audio(&mut self, pcm: &[i16]) -> Result<()>;

    /// Request a response for the current input
    async fn create_response(&mut self) -> Result<()>;

    /// Cancel the current response, telling the service how much of
    /// `track_id` was actually played
    async fn cancel_response(&mut self, track_id: &str, sample_offset: u64) -> Result<()>;

    /// Take the event channel. Only the first call returns `Some`.
    fn take_events(&mut self) -> Option<UnboundedReceiver<SessionEvent>>;

    /// Canonical list of conversation items
    fn items(&self) -> Vec<ConversationItem>;
}
