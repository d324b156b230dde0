//! Session orchestrator
//!
//! Single authority over the connection lifecycle and turn taking. It owns
//! the realtime client and both audio devices, applies user commands and
//! remote events one at a time, and mirrors the result into the shared view
//! model.
//!
//! State changes are made in response to:
//! - User commands (sent through an `OrchestratorHandle`)
//! - Remote session events (from the client's event channel)
//! - Captured audio chunks (forwarded to the session while capturing)

use crate::audio::{decode, AnalysisKind, AudioCapture, AudioPlayback, CaptureStatus, ChunkSink, FrequencyData};
use crate::integration::config::ConsoleConfig;
use crate::integration::session::{SessionState, TurnMode, TurnState};
use crate::messages::{ConversationItem, EventLogEntry, ItemDelta};
use crate::realtime::{
    register_tools, ContentPart, RealtimeSessionClient, SessionEvent, SessionUpdate, TurnDetection,
};
use crate::ui::{SharedViewModel, ViewEvent, VisualizationFrame};
use crate::utils::SessionChannels;
use crate::{Result, VoxdraftError};
use chrono::Utc;
use crossbeam_channel::Receiver as ViewReceiver;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{error::TrySendError, Receiver, Sender, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// User actions that can be sent to the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    /// Connect, or disconnect when already connected
    Connect,
    Disconnect,
    SetTurnMode(TurnMode),
    /// Pause or resume listening in VAD mode
    ToggleListening,
    BeginPushToTalk,
    EndPushToTalk,
    SendText(String),
    /// Tear down the session and stop the event loop
    Shutdown,
}

/// Handle for controlling the orchestrator from the UI
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: Sender<SessionCommand>,
    view: SharedViewModel,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => {
                VoxdraftError::ChannelError("Command queue is full".to_string())
            }
            TrySendError::Closed(_) => {
                VoxdraftError::ChannelError("Orchestrator has stopped".to_string())
            }
        })
    }

    pub fn connect(&self) -> Result<()> {
        self.send_command(SessionCommand::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send_command(SessionCommand::Disconnect)
    }

    pub fn set_turn_mode(&self, mode: TurnMode) -> Result<()> {
        self.send_command(SessionCommand::SetTurnMode(mode))
    }

    pub fn toggle_listening(&self) -> Result<()> {
        self.send_command(SessionCommand::ToggleListening)
    }

    pub fn begin_push_to_talk(&self) -> Result<()> {
        self.send_command(SessionCommand::BeginPushToTalk)
    }

    pub fn end_push_to_talk(&self) -> Result<()> {
        self.send_command(SessionCommand::EndPushToTalk)
    }

    /// Send the current input buffer as a user turn
    pub fn send_input(&self) -> Result<()> {
        let text = self.view.input_text();
        self.send_command(SessionCommand::SendText(text))
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(SessionCommand::SendText(text.into()))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(SessionCommand::Shutdown)
    }

    /// Shared view model (for direct queries and user edits)
    pub fn view(&self) -> &SharedViewModel {
        &self.view
    }

    /// Repaint notifications
    pub fn subscribe(&self) -> ViewReceiver<ViewEvent> {
        self.view.subscribe()
    }
}

pub struct SessionOrchestrator<C, I, O>
where
    C: RealtimeSessionClient,
    I: AudioCapture,
    O: AudioPlayback,
{
    config: ConsoleConfig,
    client: C,
    capture: I,
    playback: O,
    view: SharedViewModel,
    state: SessionState,
    events_rx: Option<UnboundedReceiver<SessionEvent>>,
    chunk_tx: ChunkSink,
    chunk_rx: Option<UnboundedReceiver<Vec<i16>>>,
    command_rx: Option<Receiver<SessionCommand>>,
    tools_registered: bool,
}

impl<C, I, O> SessionOrchestrator<C, I, O>
where
    C: RealtimeSessionClient,
    I: AudioCapture,
    O: AudioPlayback,
{
    /// Create an orchestrator that owns the given client and devices.
    ///
    /// Tools are registered and the client's event channel is taken here,
    /// before any connect. A client reset by `teardown` gets its tools back
    /// on the next connect.
    pub fn new(
        config: ConsoleConfig,
        mut client: C,
        capture: I,
        playback: O,
    ) -> Result<(Self, OrchestratorHandle)> {
        config.validate()?;

        let view = SharedViewModel::new();
        register_tools(&mut client, &view)?;
        let events_rx = client.take_events().ok_or_else(|| {
            VoxdraftError::InvalidState("Realtime event channel was already taken".to_string())
        })?;

        let channels = SessionChannels::new(config.channel_buffer_size);

        let handle = OrchestratorHandle {
            command_tx: channels.commands.command_tx,
            view: view.clone(),
        };

        let orchestrator = Self {
            config,
            client,
            capture,
            playback,
            view,
            state: SessionState::Disconnected,
            events_rx: Some(events_rx),
            chunk_tx: channels.capture.chunk_tx,
            chunk_rx: Some(channels.capture.chunk_rx),
            command_rx: Some(channels.commands.command_rx),
            tools_registered: true,
        };

        Ok((orchestrator, handle))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view(&self) -> &SharedViewModel {
        &self.view
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state: {} -> {}", self.state, state);
        }
        self.state = state;
        self.view.set_session(state);
    }

    // === Connection lifecycle ===

    /// Connect a fresh session, or disconnect if one is already open
    pub async fn connect(&mut self) -> Result<()> {
        if !self.state.is_disconnected() {
            return self.disconnect().await;
        }

        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Connecting session {}", session_id);

        self.view.update(ViewEvent::ItemsChanged, |vm| {
            vm.start_session(session_id, started_at)
        });
        self.set_state(SessionState::Connecting);

        match self.open_session().await {
            Ok(()) => {
                self.set_state(SessionState::Connected(TurnState::ManualIdle));
                info!("Session {} connected", session_id);
                Ok(())
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.release_devices().await;
                self.set_state(SessionState::Disconnected);
                self.view.record_error(e.user_message());
                Err(e)
            }
        }
    }

    async fn open_session(&mut self) -> Result<()> {
        if !self.tools_registered {
            register_tools(&mut self.client, &self.view)?;
            self.tools_registered = true;
        }
        self.capture.begin().await?;
        self.playback.connect().await?;

        self.client
            .update_session(self.config.session_defaults())
            .await?;
        self.client.connect().await?;

        if !self.config.greeting.trim().is_empty() {
            let greeting = ContentPart::input_text(self.config.greeting.clone());
            self.client.send_user_message_content(vec![greeting]).await?;
        }

        self.client
            .update_session(SessionUpdate::turn_detection(TurnDetection::None))
            .await
    }

    /// Best-effort release after a failed connect
    async fn release_devices(&mut self) {
        if self.client.is_connected() {
            if let Err(e) = self.client.disconnect().await {
                warn!("Failed to close realtime session: {}", e);
            }
        }
        if self.capture.status() != CaptureStatus::Ended {
            if let Err(e) = self.capture.end().await {
                warn!("Failed to release capture device: {}", e);
            }
        }
        if self.playback.is_connected() {
            if let Err(e) = self.playback.interrupt().await {
                warn!("Failed to stop playback: {}", e);
            }
        }
    }

    /// Tear the session down in reverse order of connect.
    ///
    /// Idempotent. Every step runs even if an earlier one fails; the first
    /// error is returned.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state.is_disconnected() {
            debug!("Already disconnected");
            return Ok(());
        }

        info!("Disconnecting session");
        self.set_state(SessionState::Disconnected);
        self.view.update(ViewEvent::ItemsChanged, |vm| vm.end_session());

        let mut first_error: Option<VoxdraftError> = None;

        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to close realtime session: {}", e);
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.capture.end().await {
            warn!("Failed to release capture device: {}", e);
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.playback.interrupt().await {
            warn!("Failed to stop playback: {}", e);
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => {
                self.view.record_error(e.user_message());
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Disconnect and return the client to its defaults
    pub async fn teardown(&mut self) -> Result<()> {
        let result = self.disconnect().await;
        self.client.reset();
        self.tools_registered = false;
        info!("Session torn down");
        result
    }

    // === Turn taking ===

    pub async fn set_turn_mode(&mut self, mode: TurnMode) -> Result<()> {
        let turn = match self.state {
            SessionState::Connecting => {
                return Err(VoxdraftError::InvalidState(
                    "Cannot change turn mode while connecting".to_string(),
                ))
            }
            SessionState::Disconnected => {
                debug!("Turn mode {} applied to session configuration only", mode);
                return self
                    .client
                    .update_session(SessionUpdate::turn_detection(mode.into()))
                    .await;
            }
            SessionState::Connected(turn) => turn,
        };

        if turn.mode() == mode {
            debug!("Turn mode already {}", mode);
            return Ok(());
        }

        // Capture must be paused before the service stops expecting audio
        if turn.is_capturing() {
            self.capture.pause().await?;
            self.view.set_recording_seconds(0);
        }
        self.set_state(SessionState::Connected(idle_turn(turn.mode())));

        self.client
            .update_session(SessionUpdate::turn_detection(mode.into()))
            .await?;
        self.set_state(SessionState::Connected(idle_turn(mode)));

        if mode == TurnMode::VoiceActivity {
            self.capture.record(self.chunk_tx.clone()).await?;
            self.set_state(SessionState::Connected(TurnState::VadListening));
        }

        info!("Turn mode set to {}", mode);
        Ok(())
    }

    /// In VAD mode: stop listening and ask for a response, or resume
    pub async fn toggle_listening(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected(TurnState::VadListening) => {
                self.capture.pause().await?;
                self.set_state(SessionState::Connected(TurnState::VadIdle));
                self.client.create_response().await
            }
            SessionState::Connected(TurnState::VadIdle) => {
                self.capture.record(self.chunk_tx.clone()).await?;
                self.set_state(SessionState::Connected(TurnState::VadListening));
                Ok(())
            }
            _ => Err(VoxdraftError::InvalidState(
                "Listening can only be toggled in VAD mode while connected".to_string(),
            )),
        }
    }

    /// Start a push-to-talk recording, cutting off any assistant audio
    pub async fn begin_push_to_talk(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected(TurnState::ManualIdle) => {}
            SessionState::Connected(TurnState::ManualRecording { .. }) => {
                debug!("Push-to-talk already active");
                return Ok(());
            }
            _ => {
                return Err(VoxdraftError::InvalidState(
                    "Push-to-talk requires a connected session in manual mode".to_string(),
                ))
            }
        }

        self.barge_in().await?;
        self.capture.record(self.chunk_tx.clone()).await?;

        self.view.set_recording_seconds(0);
        self.set_state(SessionState::Connected(TurnState::ManualRecording {
            started: Instant::now(),
        }));
        Ok(())
    }

    /// Finish a push-to-talk recording and request exactly one response.
    /// A no-op when no recording is active.
    pub async fn end_push_to_talk(&mut self) -> Result<()> {
        let SessionState::Connected(TurnState::ManualRecording { started }) = self.state else {
            debug!("No push-to-talk recording to end");
            return Ok(());
        };

        self.set_state(SessionState::Connected(TurnState::ManualIdle));
        self.view.set_recording_seconds(0);
        debug!("Push-to-talk held for {:?}", started.elapsed());

        self.capture.pause().await?;
        self.client.create_response().await
    }

    /// Send typed text as a user turn
    pub async fn send_text_message(&mut self, text: &str) -> Result<()> {
        if !self.state.is_connected() {
            return Err(VoxdraftError::InvalidState(
                "Connect before sending a message".to_string(),
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty message");
            return Ok(());
        }

        self.barge_in().await?;
        self.client
            .send_user_message_content(vec![ContentPart::input_text(text)])
            .await?;
        self.view.clear_input();
        Ok(())
    }

    /// Stop assistant audio and tell the service how much was heard
    pub async fn barge_in(&mut self) -> Result<()> {
        if let Some(offset) = self.playback.interrupt().await? {
            debug!(
                "Cancelling response for track {} at sample {}",
                offset.track_id, offset.offset
            );
            self.client
                .cancel_response(&offset.track_id, offset.offset)
                .await?;
        }
        Ok(())
    }

    // === Remote events ===

    /// Apply one remote event
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Realtime(event) => {
                self.view
                    .log_event(EventLogEntry::new(event.time, event.source, event.event));
                Ok(())
            }
            SessionEvent::Error(value) => {
                error!("Realtime session error: {}", value);
                self.view.record_error(error_message(&value));
                Ok(())
            }
            SessionEvent::ConversationInterrupted => {
                debug!("Conversation interrupted by the service");
                self.barge_in().await
            }
            SessionEvent::ConversationUpdated { item, delta } => {
                self.apply_update(item, delta).await
            }
        }
    }

    /// Refresh the transcript after an item changed, play any audio delta
    /// and decode the item's audio once it completes
    pub async fn apply_update(
        &mut self,
        item: ConversationItem,
        delta: Option<ItemDelta>,
    ) -> Result<()> {
        if let Some(audio) = delta.as_ref().and_then(|d| d.audio.as_deref()) {
            if !audio.is_empty() {
                if self.state.is_connected() {
                    self.playback.add_16bit_pcm(audio, &item.id)?;
                } else {
                    debug!("Dropping audio for {} while disconnected", item.id);
                }
            }
        }

        let items = self.client.items();
        self.view
            .update(ViewEvent::ItemsChanged, |vm| vm.replace_items(items));

        let pending = self
            .view
            .read()
            .item(&item.id)
            .filter(|current| current.needs_decoding())
            .map(|current| current.formatted.audio.clone());

        if let Some(audio) = pending {
            let decoded = decode(
                &audio,
                self.config.output_sample_rate,
                self.config.decode_sample_rate,
            )?;
            debug!(
                "Decoded {:.2}s of audio for {}",
                decoded.duration_seconds(),
                item.id
            );
            self.view.update(ViewEvent::ItemsChanged, |vm| {
                vm.attach_audio(&item.id, decoded)
            });
        }
        Ok(())
    }

    /// Forward a captured chunk while capturing; late chunks are dropped
    pub async fn forward_audio(&mut self, chunk: &[i16]) -> Result<()> {
        if !self.state.is_capturing() {
            debug!("Dropping {} captured samples outside a turn", chunk.len());
            return Ok(());
        }
        self.client.append_input_audio(chunk).await
    }

    // === Visualization ===

    /// Sample both devices; a missing or failing device yields an empty
    /// spectrum
    pub fn visualization_frame(&self) -> VisualizationFrame {
        let input = if self.capture.status() != CaptureStatus::Ended {
            self.capture
                .frequencies(AnalysisKind::Voice)
                .unwrap_or_else(|e| {
                    debug!("Input spectrum unavailable: {}", e);
                    FrequencyData::empty()
                })
        } else {
            FrequencyData::empty()
        };

        let output = if self.playback.is_connected() {
            self.playback
                .frequencies(AnalysisKind::Voice)
                .unwrap_or_else(|e| {
                    debug!("Output spectrum unavailable: {}", e);
                    FrequencyData::empty()
                })
        } else {
            FrequencyData::empty()
        };

        VisualizationFrame { input, output }
    }

    fn tick_recording_counter(&self) {
        if let Some(started) = self.state.recording_started() {
            self.view
                .set_recording_seconds(started.elapsed().as_secs());
        }
    }

    // === Event loop ===

    /// Apply one user command
    pub async fn execute(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Connect => self.connect().await,
            SessionCommand::Disconnect => self.disconnect().await,
            SessionCommand::SetTurnMode(mode) => self.set_turn_mode(mode).await,
            SessionCommand::ToggleListening => self.toggle_listening().await,
            SessionCommand::BeginPushToTalk => self.begin_push_to_talk().await,
            SessionCommand::EndPushToTalk => self.end_push_to_talk().await,
            SessionCommand::SendText(text) => self.send_text_message(&text).await,
            SessionCommand::Shutdown => self.teardown().await,
        }
    }

    async fn forward_or_log(&mut self, chunk: &[i16]) {
        if let Err(e) = self.forward_audio(chunk).await {
            warn!("Failed to forward captured audio: {}", e);
        }
    }

    /// Run until `Shutdown` is received or every handle is dropped, then
    /// tear the session down.
    pub async fn run(&mut self) -> Result<()> {
        let not_running =
            || VoxdraftError::InvalidState("Orchestrator is already running".to_string());
        let mut commands = self.command_rx.take().ok_or_else(not_running)?;
        let mut chunks = self.chunk_rx.take().ok_or_else(not_running)?;
        let mut events = self.events_rx.take().ok_or_else(not_running)?;

        let mut counter = tokio::time::interval(Duration::from_secs(1));
        counter.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut visualizer = tokio::time::interval(self.config.visualization_interval());
        visualizer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut events_open = true;
        info!("Orchestrator running");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("All handles dropped");
                        break;
                    };
                    if command == SessionCommand::Shutdown {
                        info!("Shutdown requested");
                        break;
                    }

                    // Audio captured before the action belongs to the turn it ends
                    while let Ok(chunk) = chunks.try_recv() {
                        self.forward_or_log(&chunk).await;
                    }

                    if let Err(e) = self.execute(command).await {
                        warn!("Command failed: {}", e);
                        self.view.record_error(e.user_message());
                    }
                }
                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                warn!("Failed to handle realtime event: {}", e);
                                self.view.record_error(e.user_message());
                            }
                        }
                        None => {
                            warn!("Realtime event channel closed");
                            events_open = false;
                        }
                    }
                }
                Some(chunk) = chunks.recv() => {
                    self.forward_or_log(&chunk).await;
                }
                _ = counter.tick() => {
                    self.tick_recording_counter();
                }
                _ = visualizer.tick() => {
                    let frame = self.visualization_frame();
                    self.view.set_spectrum(frame);
                }
            }
        }

        self.command_rx = Some(commands);
        self.chunk_rx = Some(chunks);
        self.events_rx = Some(events);

        self.teardown().await
    }
}

fn idle_turn(mode: TurnMode) -> TurnState {
    match mode {
        TurnMode::PushToTalk => TurnState::ManualIdle,
        TurnMode::VoiceActivity => TurnState::VadIdle,
    }
}

/// Human-readable message of an error event payload
fn error_message(value: &Value) -> String {
    value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
