use super::resampler::resample_audio;
use crate::{Result, VoxdraftError};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// A playable rendition of an item's audio, kept for later replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAudio {
    /// PCM16 mono samples at `sample_rate`
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Rate the raw audio was recorded at
    pub source_rate: u32,
    /// The same samples wrapped in a WAV container
    pub wav: Vec<u8>,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Turn raw PCM16 audio into a [`DecodedAudio`], resampling only when the
/// rates differ
pub fn decode(pcm: &[i16], source_rate: u32, target_rate: u32) -> Result<DecodedAudio> {
    if source_rate == 0 || target_rate == 0 {
        return Err(VoxdraftError::AudioProcessingError(format!(
            "Cannot decode audio at {} Hz -> {} Hz",
            source_rate, target_rate
        )));
    }

    let samples = if source_rate == target_rate {
        pcm.to_vec()
    } else {
        f32_to_pcm16(&resample_audio(&pcm16_to_f32(pcm), source_rate, target_rate)?)
    };
    let wav = encode_wav(&samples, target_rate, 1)?;

    debug!(
        "Decoded {} samples ({} Hz -> {} Hz)",
        pcm.len(),
        source_rate,
        target_rate
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
        source_rate,
        wav,
    })
}

/// Write PCM16 samples into an in-memory WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoxdraftError::AudioProcessingError(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| VoxdraftError::AudioProcessingError(format!("Failed to write sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| VoxdraftError::AudioProcessingError(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect()
}

pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn test_decode_same_rate_keeps_samples() {
        let pcm: Vec<i16> = (0..2400).map(|i| (i % 200) as i16 * 100).collect();
        let decoded = decode(&pcm, 24_000, 24_000).unwrap();

        assert_eq!(decoded.samples, pcm);
        assert_eq!(decoded.sample_rate, 24_000);
        assert_eq!(decoded.source_rate, 24_000);
        assert!((decoded.duration_seconds() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_wav_bytes_are_readable() {
        let decoded = decode(&[0, 1000, -1000, 32767], 24_000, 24_000).unwrap();
        let reader = WavReader::new(Cursor::new(decoded.wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.channels, 1);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, 32767]);
    }

    #[test]
    fn test_decode_rejects_zero_rate() {
        assert!(decode(&[1, 2], 0, 24_000).is_err());
    }

    #[test]
    fn test_pcm_conversion_clamps() {
        assert_eq!(f32_to_pcm16(&[2.0, -2.0, 0.0]), vec![i16::MAX, -i16::MAX, 0]);
        let back = pcm16_to_f32(&[i16::MAX]);
        assert!((back[0] - 1.0).abs() < f32::EPSILON);
    }
}
