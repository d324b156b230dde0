use crate::audio::ChunkSink;
use crate::integration::SessionCommand;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedReceiver};

/// Captured PCM16 chunks flowing from the capture device to the orchestrator
pub struct CaptureChannels {
    pub chunk_tx: ChunkSink,
    pub chunk_rx: UnboundedReceiver<Vec<i16>>,
}

impl CaptureChannels {
    pub fn new() -> Self {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        Self { chunk_tx, chunk_rx }
    }
}

impl Default for CaptureChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// User actions flowing from the UI to the orchestrator
pub struct CommandChannels {
    pub command_tx: Sender<SessionCommand>,
    pub command_rx: Receiver<SessionCommand>,
}

impl CommandChannels {
    pub fn new(buffer_size: usize) -> Self {
        let (command_tx, command_rx) = mpsc::channel(buffer_size.max(1));
        Self {
            command_tx,
            command_rx,
        }
    }
}

pub struct SessionChannels {
    pub capture: CaptureChannels,
    pub commands: CommandChannels,
}

impl SessionChannels {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            capture: CaptureChannels::new(),
            commands: CommandChannels::new(buffer_size),
        }
    }
}
