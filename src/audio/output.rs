//! Speaker playback using cpal, fed from a [`TrackQueue`].

use super::{
    analyze_spectrum, pcm16_to_f32, AnalysisKind, AudioPlayback, FrequencyData, SampleWindow,
    StreamResampler, TrackOffset, TrackQueue, SESSION_SAMPLE_RATE,
};
use crate::{Result, VoxdraftError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

const ANALYSIS_WINDOW: usize = 2048;

pub struct SpeakerPlayback {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    queue: Arc<Mutex<TrackQueue>>,
    resamplers: HashMap<String, StreamResampler>,
    window: SampleWindow,
}

impl SpeakerPlayback {
    /// Create a playback adapter for the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| VoxdraftError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to get output config: {}", e)))?
            .into();
        let queue = TrackQueue::new(SESSION_SAMPLE_RATE, config.sample_rate.0);

        Ok(Self {
            device,
            config,
            stream: None,
            queue: Arc::new(Mutex::new(queue)),
            resamplers: HashMap::new(),
            window: SampleWindow::new(ANALYSIS_WINDOW),
        })
    }

    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    fn build_stream(&self) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let queue = Arc::clone(&self.queue);
        let window = self.window.clone();
        let mut mono: Vec<f32> = Vec::new();

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);
                    let written = queue.lock().pull(&mut mono);

                    for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                        frame.fill(sample);
                    }
                    if written > 0 {
                        window.push(&mono[..written]);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to build output stream: {}", e)))
    }
}

#[async_trait(?Send)]
impl AudioPlayback for SpeakerPlayback {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            debug!("Playback already connected");
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to start output stream: {}", e)))?;
        self.stream = Some(stream);

        info!(
            "Playback connected: {}Hz, {} channel(s)",
            self.sample_rate(),
            self.channels()
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn add_16bit_pcm(&mut self, chunk: &[i16], track_id: &str) -> Result<()> {
        if self.stream.is_none() {
            return Err(VoxdraftError::AudioDeviceError(
                "Playback not connected; call connect first".into(),
            ));
        }

        let device_rate = self.sample_rate();
        let resampler = match self.resamplers.entry(track_id.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(StreamResampler::new(SESSION_SAMPLE_RATE, device_rate)?)
            }
        };
        let samples = resampler.push(&pcm16_to_f32(chunk))?;

        if !self.queue.lock().enqueue(track_id, &samples) {
            debug!("Dropped chunk for interrupted track {}", track_id);
        }
        Ok(())
    }

    async fn interrupt(&mut self) -> Result<Option<TrackOffset>> {
        let offset = self.queue.lock().interrupt();
        self.resamplers.clear();
        if let Some(offset) = &offset {
            debug!(
                "Interrupted track {} at sample {}",
                offset.track_id, offset.offset
            );
        }
        Ok(offset)
    }

    fn frequencies(&self, kind: AnalysisKind) -> Result<FrequencyData> {
        if self.stream.is_none() {
            return Err(VoxdraftError::AudioDeviceError("Playback not connected".into()));
        }
        Ok(analyze_spectrum(&self.window.snapshot(), self.sample_rate(), kind))
    }
}

impl Drop for SpeakerPlayback {
    fn drop(&mut self) {
        self.stream.take();
    }
}
