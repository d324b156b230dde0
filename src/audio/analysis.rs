//! Frequency-spectrum sampling for the input/output visualizers.

use std::f32::consts::PI;

const BAND_COUNT: usize = 64;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const VOICE_MIN_HZ: f32 = 32.0;
const VOICE_MAX_HZ: f32 = 2000.0;

/// Which part of the spectrum to report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Linear bands from 0 Hz to Nyquist
    Frequency,
    /// Logarithmic bands over the range of the human voice
    #[default]
    Voice,
}

/// Normalized band magnitudes in `[0, 1]` and their center frequencies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyData {
    pub values: Vec<f32>,
    pub frequencies: Vec<f32>,
}

impl FrequencyData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Loudest band value, 0.0 when empty
    pub fn peak(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }
}

/// Analyze `samples` (mono, `[-1, 1]`) recorded at `sample_rate`
pub fn analyze_spectrum(samples: &[f32], sample_rate: u32, kind: AnalysisKind) -> FrequencyData {
    if samples.is_empty() || sample_rate == 0 {
        return FrequencyData::empty();
    }

    let nyquist = sample_rate as f32 / 2.0;
    let frequencies = band_centers(kind, nyquist);

    let n = samples.len();
    let window: Vec<f32> = (0..n)
        .map(|i| {
            if n == 1 {
                1.0
            } else {
                0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos()
            }
        })
        .collect();
    let window_sum: f32 = window.iter().sum::<f32>().max(f32::EPSILON);

    let values = frequencies
        .iter()
        .map(|&freq| {
            let omega = 2.0 * PI * freq / sample_rate as f32;
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (i, (&sample, &w)) in samples.iter().zip(&window).enumerate() {
                let phase = omega * i as f32;
                re += sample * w * phase.cos();
                im -= sample * w * phase.sin();
            }
            let magnitude = 2.0 * (re * re + im * im).sqrt() / window_sum;
            normalize(magnitude)
        })
        .collect();

    FrequencyData {
        values,
        frequencies,
    }
}

fn band_centers(kind: AnalysisKind, nyquist: f32) -> Vec<f32> {
    match kind {
        AnalysisKind::Frequency => {
            let width = nyquist / BAND_COUNT as f32;
            (0..BAND_COUNT).map(|i| (i as f32 + 0.5) * width).collect()
        }
        AnalysisKind::Voice => {
            let max = VOICE_MAX_HZ.min(nyquist);
            let ratio = (max / VOICE_MIN_HZ).max(1.0);
            (0..BAND_COUNT)
                .map(|i| VOICE_MIN_HZ * ratio.powf(i as f32 / (BAND_COUNT - 1) as f32))
                .collect()
        }
    }
}

fn normalize(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    let decibels = 20.0 * magnitude.log10();
    ((decibels - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS)).clamp(0.0, 1.0)
}
