use crate::audio::DecodedAudio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a conversation item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Message,
    FunctionCall,
    FunctionCallOutput,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}

/// Function call details attached to a `function_call` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTool {
    pub name: String,
    pub call_id: String,
    pub arguments: String,
}

/// Content of an item as accumulated from streamed deltas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub transcript: String,
    /// Full PCM16 audio received so far
    #[serde(default)]
    pub audio: Vec<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<FormattedTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Playable artifact, attached locally once the item has completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<DecodedAudio>,
}

/// A conversation item as held by the remote session's canonical state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub formatted: FormattedContent,
}

impl ConversationItem {
    pub fn message(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            item_type: ItemType::Message,
            role: Some(role),
            status: ItemStatus::InProgress,
            formatted: FormattedContent::default(),
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.formatted.text = text.into();
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.formatted.transcript = transcript.into();
        self
    }

    pub fn with_audio(mut self, audio: Vec<i16>) -> Self {
        self.formatted.audio = audio;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }

    /// Completed items carrying full audio are decoded for replay
    pub fn needs_decoding(&self) -> bool {
        self.is_completed() && !self.formatted.audio.is_empty() && self.formatted.file.is_none()
    }

    /// Text to show in the transcript, preferring speech-to-text output
    pub fn display_text(&self) -> Option<&str> {
        if let Some(tool) = &self.formatted.tool {
            return Some(tool.name.as_str());
        }
        if let Some(output) = &self.formatted.output {
            return Some(output.as_str());
        }
        let formatted = &self.formatted;
        [formatted.transcript.as_str(), formatted.text.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
    }
}

/// Incremental payload carried by a `conversation.updated` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<i16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_deserializes_from_session_shape() {
        let item: ConversationItem = serde_json::from_value(serde_json::json!({
            "id": "x",
            "type": "message",
            "role": "assistant",
            "status": "completed",
            "formatted": { "audio": [1, 2, 3], "transcript": "hi" }
        }))
        .unwrap();

        assert_eq!(item.id, "x");
        assert_eq!(item.role, Some(Role::Assistant));
        assert!(item.needs_decoding());
        assert_eq!(item.display_text(), Some("hi"));
    }

    #[test]
    fn test_in_progress_item_is_not_decoded() {
        let item = ConversationItem::message("a", Role::User).with_audio(vec![0; 10]);
        assert!(!item.needs_decoding());
    }

    #[test]
    fn test_display_text_falls_back_to_text() {
        let item = ConversationItem::message("a", Role::User).with_text("typed");
        assert_eq!(item.display_text(), Some("typed"));

        let empty = ConversationItem::message("b", Role::Assistant);
        assert_eq!(empty.display_text(), None);
    }
}
