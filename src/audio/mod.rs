//! Audio capture and playback seams.
//!
//! The orchestrator drives a microphone through [`AudioCapture`] and a speaker
//! through [`AudioPlayback`]. Both traits are `?Send`: devices are owned by a
//! single orchestrator running on a current-thread runtime. Default cpal
//! implementations are available with the `audio-io` feature.

pub mod analysis;
pub mod buffer;
#[cfg(feature = "audio-io")]
pub mod input;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod resampler;
pub mod tracks;
pub mod wav;

pub use analysis::{analyze_spectrum, AnalysisKind, FrequencyData};
pub use buffer::SampleWindow;
#[cfg(feature = "audio-io")]
pub use input::MicrophoneCapture;
#[cfg(feature = "audio-io")]
pub use output::SpeakerPlayback;
pub use resampler::{resample_audio, StreamResampler};
pub use tracks::{TrackOffset, TrackQueue};
pub use wav::{decode, encode_wav, f32_to_pcm16, pcm16_to_f32, DecodedAudio};

use crate::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Sample rate used by the realtime session for PCM16 audio in both directions
pub const SESSION_SAMPLE_RATE: u32 = 24_000;

/// Destination for captured PCM16 mono chunks at [`SESSION_SAMPLE_RATE`]
pub type ChunkSink = UnboundedSender<Vec<i16>>;

/// Lifecycle of a capture device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureStatus {
    /// No device session; `begin` has not been called or `end` has
    #[default]
    Ended,
    /// Device opened, chunks are not forwarded
    Paused,
    /// Device opened and forwarding chunks to the sink
    Recording,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStatus::Ended => write!(f, "ended"),
            CaptureStatus::Paused => write!(f, "paused"),
            CaptureStatus::Recording => write!(f, "recording"),
        }
    }
}

/// Microphone side of the pipeline
#[async_trait(?Send)]
pub trait AudioCapture {
    /// Open the device. Chunks are not forwarded until `record`.
    async fn begin(&mut self) -> Result<()>;

    /// Start (or resume) forwarding chunks into `sink`
    async fn record(&mut self, sink: ChunkSink) -> Result<()>;

    /// Stop forwarding chunks; the device stays open
    async fn pause(&mut self) -> Result<()>;

    /// Close the device
    async fn end(&mut self) -> Result<()>;

    fn status(&self) -> CaptureStatus;

    /// Spectrum of the most recent input audio
    fn frequencies(&self, kind: AnalysisKind) -> Result<FrequencyData>;
}

/// Speaker side of the pipeline
#[async_trait(?Send)]
pub trait AudioPlayback {
    /// Open the output device
    async fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Queue a PCM16 chunk on the track identified by `track_id`
    fn add_16bit_pcm(&mut self, chunk: &[i16], track_id: &str) -> Result<()>;

    /// Stop playback immediately. Returns where the playing track was cut
    /// off, or `None` when nothing has played since the last interrupt.
    async fn interrupt(&mut self) -> Result<Option<TrackOffset>>;

    /// Spectrum of the most recent output audio
    fn frequencies(&self, kind: AnalysisKind) -> Result<FrequencyData>;
}
