//! Recording test doubles for the realtime client and both audio devices.
//!
//! Every adapter writes into one shared call log so tests can assert on the
//! relative order of calls across adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use voxdraft::audio::{
    AnalysisKind, AudioCapture, AudioPlayback, CaptureStatus, ChunkSink, FrequencyData,
    TrackOffset,
};
use voxdraft::integration::{ConsoleConfig, OrchestratorHandle, SessionOrchestrator};
use voxdraft::messages::{ConversationItem, EventSource, ItemDelta};
use voxdraft::realtime::{
    ContentPart, RealtimeEvent, RealtimeSessionClient, SessionEvent, SessionUpdate,
    ToolDefinition, ToolHandler,
};
use voxdraft::{Result, VoxdraftError};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ClientConnect,
    ClientDisconnect,
    ClientReset,
    UpdateSession(SessionUpdate),
    AddTool(String),
    SendUserMessage(Vec<ContentPart>),
    AppendInputAudio(usize),
    CreateResponse,
    CancelResponse(String, u64),
    CaptureBegin,
    CaptureRecord,
    CapturePause,
    CaptureEnd,
    PlaybackConnect,
    PlaybackAdd(String, usize),
    PlaybackInterrupt,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Failures to inject into the doubles
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub client_connect: bool,
    pub client_disconnect: bool,
    pub capture_begin: bool,
    pub capture_record: bool,
}

// === Realtime client ===

pub struct FakeClient {
    log: CallLog,
    connected: bool,
    failures: Failures,
    events_rx: Option<UnboundedReceiver<SessionEvent>>,
    items: Arc<Mutex<Vec<ConversationItem>>>,
    tools: Arc<Mutex<HashMap<String, Arc<dyn ToolHandler>>>>,
}

/// The remote side of a `FakeClient`, kept by the test
#[derive(Clone)]
pub struct FakeRemote {
    events_tx: UnboundedSender<SessionEvent>,
    items: Arc<Mutex<Vec<ConversationItem>>>,
    tools: Arc<Mutex<HashMap<String, Arc<dyn ToolHandler>>>>,
}

impl FakeClient {
    pub fn new(log: CallLog, failures: Failures) -> (Self, FakeRemote) {
        let (events_tx, events_rx) = unbounded_channel();
        let items = Arc::new(Mutex::new(Vec::new()));
        let tools = Arc::new(Mutex::new(HashMap::new()));

        let client = Self {
            log,
            connected: false,
            failures,
            events_rx: Some(events_rx),
            items: Arc::clone(&items),
            tools: Arc::clone(&tools),
        };
        let remote = FakeRemote {
            events_tx,
            items,
            tools,
        };
        (client, remote)
    }

    fn record(&self, call: Call) {
        self.log.lock().push(call);
    }
}

#[async_trait(?Send)]
impl RealtimeSessionClient for FakeClient {
    async fn connect(&mut self) -> Result<()> {
        self.record(Call::ClientConnect);
        if self.failures.client_connect {
            return Err(VoxdraftError::ConnectionError("handshake refused".into()));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.record(Call::ClientDisconnect);
        self.connected = false;
        if self.failures.client_disconnect {
            return Err(VoxdraftError::TransportError("socket already closed".into()));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.record(Call::ClientReset);
        self.connected = false;
        self.tools.lock().clear();
        self.items.lock().clear();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn update_session(&mut self, update: SessionUpdate) -> Result<()> {
        self.record(Call::UpdateSession(update));
        Ok(())
    }

    fn add_tool(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Result<()> {
        self.record(Call::AddTool(definition.name.clone()));
        self.tools.lock().insert(definition.name, handler);
        Ok(())
    }

    async fn send_user_message_content(&mut self, content: Vec<ContentPart>) -> Result<()> {
        self.record(Call::SendUserMessage(content));
        Ok(())
    }

    async fn append_input_audio(&mut self, pcm: &[i16]) -> Result<()> {
        self.record(Call::AppendInputAudio(pcm.len()));
        Ok(())
    }

    async fn create_response(&mut self) -> Result<()> {
        self.record(Call::CreateResponse);
        Ok(())
    }

    async fn cancel_response(&mut self, track_id: &str, sample_offset: u64) -> Result<()> {
        self.record(Call::CancelResponse(track_id.to_string(), sample_offset));
        Ok(())
    }

    fn take_events(&mut self) -> Option<UnboundedReceiver<SessionEvent>> {
        self.events_rx.take()
    }

    fn items(&self) -> Vec<ConversationItem> {
        self.items.lock().clone()
    }
}

impl FakeRemote {
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn server_event(&self, payload: Value) -> SessionEvent {
        SessionEvent::Realtime(RealtimeEvent::new(EventSource::Server, payload))
    }

    /// Insert or replace an item in the canonical list, returning the
    /// matching update event
    pub fn upsert(&self, item: ConversationItem, delta: Option<ItemDelta>) -> SessionEvent {
        let mut items = self.items.lock();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        SessionEvent::ConversationUpdated { item, delta }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke a registered tool the way the service would
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let handler = self
            .tools
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| VoxdraftError::ToolError(format!("unknown tool {}", name)))?;
        handler.call(arguments)
    }
}

// === Capture ===

pub struct FakeCapture {
    log: CallLog,
    failures: Failures,
    probe: CaptureProbe,
}

/// Shared view of a `FakeCapture`, kept by the test
#[derive(Clone, Default)]
pub struct CaptureProbe {
    status: Arc<Mutex<CaptureStatus>>,
    sink: Arc<Mutex<Option<ChunkSink>>>,
}

impl CaptureProbe {
    pub fn status(&self) -> CaptureStatus {
        *self.status.lock()
    }

    /// Deliver a chunk as the device would; dropped unless recording
    pub fn deliver(&self, chunk: Vec<i16>) -> bool {
        if self.status() != CaptureStatus::Recording {
            return false;
        }
        match self.sink.lock().as_ref() {
            Some(tx) => tx.send(chunk).is_ok(),
            None => false,
        }
    }
}

impl FakeCapture {
    pub fn new(log: CallLog, failures: Failures) -> (Self, CaptureProbe) {
        let probe = CaptureProbe::default();
        let capture = Self {
            log,
            failures,
            probe: probe.clone(),
        };
        (capture, probe)
    }

    fn record_call(&self, call: Call) {
        self.log.lock().push(call);
    }
}

#[async_trait(?Send)]
impl AudioCapture for FakeCapture {
    async fn begin(&mut self) -> Result<()> {
        self.record_call(Call::CaptureBegin);
        if self.failures.capture_begin {
            return Err(VoxdraftError::AudioDeviceError("microphone busy".into()));
        }
        if self.probe.status() != CaptureStatus::Ended {
            return Err(VoxdraftError::AudioDeviceError("already started".into()));
        }
        *self.probe.status.lock() = CaptureStatus::Paused;
        Ok(())
    }

    async fn record(&mut self, sink: ChunkSink) -> Result<()> {
        self.record_call(Call::CaptureRecord);
        if self.failures.capture_record {
            return Err(VoxdraftError::AudioDeviceError("stream stalled".into()));
        }
        if self.probe.status() != CaptureStatus::Paused {
            return Err(VoxdraftError::AudioDeviceError("not paused".into()));
        }
        *self.probe.sink.lock() = Some(sink);
        *self.probe.status.lock() = CaptureStatus::Recording;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.record_call(Call::CapturePause);
        if self.probe.status() == CaptureStatus::Ended {
            return Err(VoxdraftError::AudioDeviceError("not started".into()));
        }
        self.probe.sink.lock().take();
        *self.probe.status.lock() = CaptureStatus::Paused;
        Ok(())
    }

    async fn end(&mut self) -> Result<()> {
        self.record_call(Call::CaptureEnd);
        self.probe.sink.lock().take();
        *self.probe.status.lock() = CaptureStatus::Ended;
        Ok(())
    }

    fn status(&self) -> CaptureStatus {
        self.probe.status()
    }

    fn frequencies(&self, _kind: AnalysisKind) -> Result<FrequencyData> {
        Ok(FrequencyData {
            values: vec![0.25, 0.5],
            frequencies: vec![100.0, 200.0],
        })
    }
}

// === Playback ===

pub struct FakePlayback {
    log: CallLog,
    connected: bool,
    probe: PlaybackProbe,
}

#[derive(Clone, Default)]
pub struct PlaybackProbe {
    next_interrupt: Arc<Mutex<Option<TrackOffset>>>,
}

impl PlaybackProbe {
    /// Make the next `interrupt` report that `track_id` played `offset`
    /// samples
    pub fn set_playing(&self, track_id: &str, offset: u64) {
        *self.next_interrupt.lock() = Some(TrackOffset {
            track_id: track_id.to_string(),
            offset,
            current_time: offset as f64 / 24_000.0,
        });
    }
}

impl FakePlayback {
    pub fn new(log: CallLog) -> (Self, PlaybackProbe) {
        let probe = PlaybackProbe::default();
        let playback = Self {
            log,
            connected: false,
            probe: probe.clone(),
        };
        (playback, probe)
    }
}

#[async_trait(?Send)]
impl AudioPlayback for FakePlayback {
    async fn connect(&mut self) -> Result<()> {
        self.log.lock().push(Call::PlaybackConnect);
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn add_16bit_pcm(&mut self, chunk: &[i16], track_id: &str) -> Result<()> {
        if !self.connected {
            return Err(VoxdraftError::AudioDeviceError("not connected".into()));
        }
        self.log
            .lock()
            .push(Call::PlaybackAdd(track_id.to_string(), chunk.len()));
        Ok(())
    }

    async fn interrupt(&mut self) -> Result<Option<TrackOffset>> {
        self.log.lock().push(Call::PlaybackInterrupt);
        Ok(self.probe.next_interrupt.lock().take())
    }

    fn frequencies(&self, _kind: AnalysisKind) -> Result<FrequencyData> {
        if !self.connected {
            return Err(VoxdraftError::AudioDeviceError("not connected".into()));
        }
        Ok(FrequencyData {
            values: vec![0.75],
            frequencies: vec![440.0],
        })
    }
}

// === Harness ===

pub type TestOrchestrator = SessionOrchestrator<FakeClient, FakeCapture, FakePlayback>;

pub struct Harness {
    pub orchestrator: TestOrchestrator,
    pub handle: OrchestratorHandle,
    pub remote: FakeRemote,
    pub capture: CaptureProbe,
    pub playback: PlaybackProbe,
    pub log: CallLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ConsoleConfig::default(), Failures::default())
    }

    pub fn with(config: ConsoleConfig, failures: Failures) -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let (client, remote) = FakeClient::new(Arc::clone(&log), failures);
        let (capture, capture_probe) = FakeCapture::new(Arc::clone(&log), failures);
        let (playback, playback_probe) = FakePlayback::new(Arc::clone(&log));

        let (orchestrator, handle) = SessionOrchestrator::new(config, client, capture, playback)
            .expect("orchestrator construction");

        Self {
            orchestrator,
            handle,
            remote,
            capture: capture_probe,
            playback: playback_probe,
            log,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.lock().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.log.lock().iter().position(|c| c == call)
    }
}
