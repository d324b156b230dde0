//! Microphone capture using cpal.
//!
//! The device is converted to mono, resampled to the session rate and
//! forwarded as PCM16 chunks while recording. A sample window keeps the last
//! few milliseconds for the input visualizer regardless of recording state.

use super::{
    analyze_spectrum, f32_to_pcm16, AnalysisKind, AudioCapture, CaptureStatus, ChunkSink,
    FrequencyData, SampleWindow, StreamResampler, SESSION_SAMPLE_RATE,
};
use crate::{Result, VoxdraftError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const ANALYSIS_WINDOW: usize = 2048;

pub struct MicrophoneCapture {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    status: Arc<Mutex<CaptureStatus>>,
    sink: Arc<Mutex<Option<ChunkSink>>>,
    window: SampleWindow,
}

impl MicrophoneCapture {
    /// Create a capture adapter for the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| VoxdraftError::AudioDeviceError("No input device available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to get input config: {}", e)))?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            status: Arc::new(Mutex::new(CaptureStatus::Ended)),
            sink: Arc::new(Mutex::new(None)),
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
        let status = Arc::clone(&self.status);
        let sink = Arc::clone(&self.sink);
        let window = self.window.clone();
        let mut resampler = StreamResampler::new(self.sample_rate(), SESSION_SAMPLE_RATE)?;

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };
                    window.push(&mono);

                    if *status.lock() != CaptureStatus::Recording {
                        return;
                    }

                    match resampler.push(&mono) {
                        Ok(resampled) if !resampled.is_empty() => {
                            if let Some(tx) = sink.lock().as_ref() {
                                if tx.send(f32_to_pcm16(&resampled)).is_err() {
                                    debug!("Capture sink closed");
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Dropping input chunk: {}", e),
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to build input stream: {}", e)))
    }
}

#[async_trait(?Send)]
impl AudioCapture for MicrophoneCapture {
    async fn begin(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(VoxdraftError::AudioDeviceError(
                "Capture already started; end it before beginning again".into(),
            ));
        }

        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|e| VoxdraftError::AudioDeviceError(format!("Failed to start input stream: {}", e)))?;

        *self.status.lock() = CaptureStatus::Paused;
        self.stream = Some(stream);
        info!(
            "Capture opened: {}Hz, {} channel(s)",
            self.sample_rate(),
            self.channels()
        );
        Ok(())
    }

    async fn record(&mut self, sink: ChunkSink) -> Result<()> {
        let mut status = self.status.lock();
        match *status {
            CaptureStatus::Ended => Err(VoxdraftError::AudioDeviceError(
                "Capture not started; call begin first".into(),
            )),
            CaptureStatus::Recording => Err(VoxdraftError::AudioDeviceError(
                "Already recording".into(),
            )),
            CaptureStatus::Paused => {
                *self.sink.lock() = Some(sink);
                *status = CaptureStatus::Recording;
                debug!("Capture recording");
                Ok(())
            }
        }
    }

    async fn pause(&mut self) -> Result<()> {
        let mut status = self.status.lock();
        if *status == CaptureStatus::Ended {
            return Err(VoxdraftError::AudioDeviceError(
                "Capture not started; nothing to pause".into(),
            ));
        }
        *status = CaptureStatus::Paused;
        self.sink.lock().take();
        debug!("Capture paused");
        Ok(())
    }

    async fn end(&mut self) -> Result<()> {
        *self.status.lock() = CaptureStatus::Ended;
        self.sink.lock().take();
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Capture closed");
        }
        self.window.clear();
        Ok(())
    }

    fn status(&self) -> CaptureStatus {
        *self.status.lock()
    }

    fn frequencies(&self, kind: AnalysisKind) -> Result<FrequencyData> {
        if self.stream.is_none() {
            return Err(VoxdraftError::AudioDeviceError("Capture not started".into()));
        }
        Ok(analyze_spectrum(&self.window.snapshot(), self.sample_rate(), kind))
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        *self.status.lock() = CaptureStatus::Ended;
        self.stream.take();
    }
}
