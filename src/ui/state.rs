//! Conversation view model
//!
//! Everything the console renders lives here: the session snapshot, the
//! transcript, the realtime event log, the memory panel and the email draft.
//!
//! The design separates:
//! - **State**: `ConversationViewModel`, written by the orchestrator and tools
//! - **Notifications**: `ViewEvent`s telling the UI what to repaint

use crate::audio::{DecodedAudio, FrequencyData};
use crate::integration::SessionState;
use crate::messages::{ConversationItem, EmailDraft, EventLog, EventLogEntry, MemoryStore};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const NOTIFY_BUFFER: usize = 256;

/// Repaint notifications for the UI
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    StateChanged,
    ItemsChanged,
    EventLogged,
    MemoryChanged,
    DraftChanged,
    Error(String),
}

/// Spectra of both devices for one visualizer frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualizationFrame {
    pub input: FrequencyData,
    pub output: FrequencyData,
}

#[derive(Clone, Debug, Default)]
pub struct ConversationViewModel {
    /// Connection and turn-taking state
    pub session: SessionState,
    /// Id of the current session, set on every successful connect
    pub session_id: Option<Uuid>,
    pub session_started_at: Option<DateTime<Utc>>,
    /// Transcript, in the order kept by the realtime client
    pub items: Vec<ConversationItem>,
    pub event_log: EventLog,
    pub memory: MemoryStore,
    pub email_draft: EmailDraft,
    /// Text typed but not yet sent
    pub input_text: String,
    /// Whole seconds of the current push-to-talk recording
    pub recording_seconds: u64,
    pub spectrum: VisualizationFrame,
    pub last_error: Option<String>,
}

impl ConversationViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transcript, keeping decoded audio already attached to
    /// items that are still present
    pub fn replace_items(&mut self, mut items: Vec<ConversationItem>) {
        let mut decoded: HashMap<String, DecodedAudio> = self
            .items
            .drain(..)
            .filter_map(|item| item.formatted.file.map(|file| (item.id, file)))
            .collect();

        for item in items.iter_mut() {
            if item.formatted.file.is_none() {
                item.formatted.file = decoded.remove(&item.id);
            }
        }
        self.items = items;
    }

    /// Attach a decoded artifact to the item with `id`. Returns `false` if
    /// no such item exists.
    pub fn attach_audio(&mut self, id: &str, file: DecodedAudio) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.formatted.file = Some(file);
                true
            }
            None => false,
        }
    }

    pub fn item(&self, id: &str) -> Option<&ConversationItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Reset per-session state for a fresh connection
    pub fn start_session(&mut self, id: Uuid, started_at: DateTime<Utc>) {
        self.session_id = Some(id);
        self.session_started_at = Some(started_at);
        self.event_log.clear();
        self.items.clear();
        self.recording_seconds = 0;
        self.last_error = None;
    }

    /// Clear per-session state. The email draft outlives the session.
    pub fn end_session(&mut self) {
        self.session_id = None;
        self.session_started_at = None;
        self.items.clear();
        self.event_log.clear();
        self.memory.clear();
        self.recording_seconds = 0;
        self.spectrum = VisualizationFrame::default();
    }

    pub fn log_event(&mut self, entry: EventLogEntry) {
        self.event_log.push(entry);
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}

/// Thread-safe shared view model
///
/// Wraps `ConversationViewModel` in `Arc<RwLock<>>`. Each subscriber gets
/// its own bounded channel and sees every notification; a subscriber whose
/// buffer is full misses notifications until it drains.
#[derive(Clone)]
pub struct SharedViewModel {
    inner: Arc<RwLock<ConversationViewModel>>,
    subscribers: Arc<Mutex<Vec<Sender<ViewEvent>>>>,
}

impl Default for SharedViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedViewModel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConversationViewModel::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a read lock on the view model
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, ConversationViewModel> {
        self.inner.read()
    }

    /// Get a write lock on the view model
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, ConversationViewModel> {
        self.inner.write()
    }

    /// Receiver for repaint notifications sent from now on
    pub fn subscribe(&self) -> Receiver<ViewEvent> {
        let (tx, rx) = bounded(NOTIFY_BUFFER);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn notify(&self, event: ViewEvent) {
        self.subscribers.lock().retain(|tx| {
            !matches!(
                tx.try_send(event.clone()),
                Err(TrySendError::Disconnected(_))
            )
        });
    }

    /// Mutate the view model and send one notification
    pub fn update<R>(&self, event: ViewEvent, f: impl FnOnce(&mut ConversationViewModel) -> R) -> R {
        let result = f(&mut *self.inner.write());
        self.notify(event);
        result
    }

    // === Convenience read methods ===

    pub fn session(&self) -> SessionState {
        self.inner.read().session
    }

    pub fn items(&self) -> Vec<ConversationItem> {
        self.inner.read().items.clone()
    }

    pub fn event_log(&self) -> EventLog {
        self.inner.read().event_log.clone()
    }

    pub fn memory(&self) -> MemoryStore {
        self.inner.read().memory.clone()
    }

    pub fn email_draft(&self) -> EmailDraft {
        self.inner.read().email_draft.clone()
    }

    pub fn input_text(&self) -> String {
        self.inner.read().input_text.clone()
    }

    pub fn recording_seconds(&self) -> u64 {
        self.inner.read().recording_seconds
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub fn spectrum(&self) -> VisualizationFrame {
        self.inner.read().spectrum.clone()
    }

    // === Writes ===

    pub fn set_session(&self, session: SessionState) {
        self.update(ViewEvent::StateChanged, |vm| vm.session = session);
    }

    pub fn set_memory(&self, key: impl Into<String>, value: impl Into<String>) {
        self.update(ViewEvent::MemoryChanged, |vm| vm.memory.set(key, value));
    }

    pub fn apply_email_draft(&self, draft: EmailDraft) {
        self.update(ViewEvent::DraftChanged, |vm| vm.email_draft = draft);
    }

    /// User edit of the subject field
    pub fn set_email_subject(&self, subject: impl Into<String>) {
        self.update(ViewEvent::DraftChanged, |vm| {
            vm.email_draft.subject = subject.into()
        });
    }

    /// User edit of the body field
    pub fn set_email_body(&self, body: impl Into<String>) {
        self.update(ViewEvent::DraftChanged, |vm| vm.email_draft.body = body.into());
    }

    pub fn set_input_text(&self, text: impl Into<String>) {
        self.inner.write().input_text = text.into();
    }

    pub fn clear_input(&self) {
        self.inner.write().input_text.clear();
    }

    pub fn log_event(&self, entry: EventLogEntry) {
        self.update(ViewEvent::EventLogged, |vm| vm.log_event(entry));
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.inner.write().record_error(message.clone());
        self.notify(ViewEvent::Error(message));
    }

    pub fn set_recording_seconds(&self, seconds: u64) {
        let changed = {
            let mut vm = self.inner.write();
            let changed = vm.recording_seconds != seconds;
            vm.recording_seconds = seconds;
            changed
        };
        if changed {
            self.notify(ViewEvent::StateChanged);
        }
    }

    pub fn set_spectrum(&self, frame: VisualizationFrame) {
        self.inner.write().spectrum = frame;
    }
}
