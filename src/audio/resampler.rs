use crate::{Result, VoxdraftError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

const CHUNK_FRAMES: usize = 1024;

/// Mono resampler for audio that arrives in arbitrarily sized pieces.
///
/// Input is buffered until a full resampler chunk is available, so no zero
/// padding is inserted between pushes. Equal rates pass audio through.
pub struct StreamResampler {
    resampler: Option<SincFixedIn<f32>>,
    pending: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(VoxdraftError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let resampler = if input_rate == output_rate {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            };
            let resampler = SincFixedIn::<f32>::new(
                output_rate as f64 / input_rate as f64,
                2.0,
                params,
                CHUNK_FRAMES,
                1,
            )
            .map_err(|e| {
                VoxdraftError::AudioProcessingError(format!("Failed to create resampler: {}", e))
            })?;
            debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);
            Some(resampler)
        };

        Ok(Self {
            resampler,
            pending: Vec::new(),
            input_rate,
            output_rate,
        })
    }

    /// Feed samples and return whatever output is ready
    pub fn push(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        self.pending.extend_from_slice(input);
        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let processed = resampler
                .process(&[chunk], None)
                .map_err(|e| VoxdraftError::AudioProcessingError(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&processed[0]);
        }
        Ok(output)
    }

    /// Resample whatever is still buffered, zero-padding the final chunk
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let remaining = self.pending.len();
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.resize(resampler.input_frames_next(), 0.0);

        let processed = resampler
            .process(&[chunk], None)
            .map_err(|e| VoxdraftError::AudioProcessingError(format!("Resampling failed: {}", e)))?;

        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let keep = ((remaining as f64) * ratio).ceil() as usize;
        Ok(processed[0].iter().take(keep).copied().collect())
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Resample a complete mono buffer in one step
pub fn resample_audio(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    let mut resampler = StreamResampler::new(input_rate, output_rate)?;
    let mut output = resampler.push(input)?;
    output.extend(resampler.flush()?);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rates() {
        assert!(StreamResampler::new(0, 24_000).is_err());
        assert!(StreamResampler::new(48_000, 0).is_err());
    }

    #[test]
    fn test_equal_rates_pass_through() {
        let mut resampler = StreamResampler::new(24_000, 24_000).unwrap();
        assert!(resampler.is_passthrough());
        assert_eq!(resampler.push(&[0.1, 0.2]).unwrap(), vec![0.1, 0.2]);
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_small_pushes_are_buffered() {
        let mut resampler = StreamResampler::new(48_000, 24_000).unwrap();
        let out = resampler.push(&[0.0; 100]).unwrap();
        assert!(out.is_empty());
        assert!(!resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_downsampling_halves_length() {
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resample_audio(&input, 48_000, 24_000).unwrap();
        let expected = input.len() / 2;
        assert!(
            output.len().abs_diff(expected) <= CHUNK_FRAMES,
            "got {} samples, expected about {}",
            output.len(),
            expected
        );
    }
}
