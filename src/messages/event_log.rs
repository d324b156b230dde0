//! Realtime event log shown in the console's event pane.
//!
//! Consecutive events of the same `type` collapse into one entry whose
//! `repeat_count` grows; a different type starts a new entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which side of the connection produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Client,
    Server,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Client => write!(f, "client"),
            EventSource::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub repeat_count: u32,
    pub payload: Value,
}

impl EventLogEntry {
    pub fn new(timestamp: DateTime<Utc>, source: EventSource, payload: Value) -> Self {
        Self {
            timestamp,
            source,
            repeat_count: 1,
            payload,
        }
    }

    /// The payload's `type` field, if it has one
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// Time since the session started, as `MM:SS.hh`
    pub fn elapsed_label(&self, session_start: DateTime<Utc>) -> String {
        let millis = (self.timestamp - session_start).num_milliseconds().max(0);
        let minutes = millis / 60_000;
        let seconds = (millis / 1000) % 60;
        let hundredths = (millis % 1000) / 10;
        format!("{:02}:{:02}.{:02}", minutes, seconds, hundredths)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, coalescing it into the last one when both carry the
    /// same event type
    pub fn push(&mut self, entry: EventLogEntry) {
        if let Some(last) = self.entries.last_mut() {
            if last.event_type() == entry.event_type() {
                last.repeat_count += 1;
                return;
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&EventLogEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(kind: &str) -> EventLogEntry {
        EventLogEntry::new(Utc::now(), EventSource::Server, json!({ "type": kind }))
    }

    #[test]
    fn test_consecutive_same_type_coalesce() {
        let mut log = EventLog::new();
        for _ in 0..5 {
            log.push(entry("response.audio.delta"));
        }
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].repeat_count, 5);
    }

    #[test]
    fn test_differing_type_starts_new_entry() {
        let mut log = EventLog::new();
        log.push(entry("a"));
        log.push(entry("a"));
        log.push(entry("b"));
        log.push(entry("a"));

        let counts: Vec<u32> = log.entries().iter().map(|e| e.repeat_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);
        assert_eq!(log.last().and_then(|e| e.event_type()), Some("a"));
    }

    #[test]
    fn test_coalescing_keeps_first_payload() {
        let mut log = EventLog::new();
        log.push(EventLogEntry::new(
            Utc::now(),
            EventSource::Client,
            json!({ "type": "input_audio_buffer.append", "n": 1 }),
        ));
        log.push(EventLogEntry::new(
            Utc::now(),
            EventSource::Client,
            json!({ "type": "input_audio_buffer.append", "n": 2 }),
        ));
        assert_eq!(log.entries()[0].payload["n"], 1);
    }

    #[test]
    fn test_elapsed_label() {
        let start = Utc::now();
        let mut e = entry("x");
        e.timestamp = start + chrono::Duration::milliseconds(83_456);
        assert_eq!(e.elapsed_label(start), "01:23.45");

        e.timestamp = start - chrono::Duration::seconds(1);
        assert_eq!(e.elapsed_label(start), "00:00.00");
    }
}
