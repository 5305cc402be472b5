//! Loudness-over-time curves for lip-sync.
//!
//! A curve holds one RMS value per `1 / samples_per_second` of audio, taken
//! from the first channel of the decoded stream.

use crate::audio_data::{AudioInfo, bytes_to_frames};
use std::collections::HashMap;

/// Curve resolution used for speech.
pub const LOUDNESS_SAMPLES_PER_SECOND: f32 = 20.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoudnessCurve {
    samples_per_second: f32,
    samples: Vec<f32>,
}

impl LoudnessCurve {
    /// Builds a curve from raw PCM bytes described by `info`.
    ///
    /// A trailing partial window is kept as the RMS of the frames it holds.
    pub fn analyze(data: &[u8], info: &AudioInfo, samples_per_second: f32) -> Self {
        if samples_per_second <= 0.0 || info.sample_rate == 0 {
            return Self::default();
        }

        let frames_per_segment = (info.sample_rate as f32 / samples_per_second) as usize;
        if frames_per_segment == 0 {
            return Self::default();
        }

        let frame_size = info.frame_size();
        let frame_count = bytes_to_frames(data.len(), info.channels, info.sample_type);

        let samples = data[..frame_count * frame_size]
            .chunks_exact(frame_size)
            .map(|frame| info.sample_type.read_normalized(frame))
            .collect::<Vec<_>>()
            .chunks(frames_per_segment)
            .map(|segment| {
                let sum: f32 = segment.iter().map(|value| value * value).sum();
                (sum / segment.len() as f32).sqrt()
            })
            .collect();

        Self {
            samples_per_second,
            samples,
        }
    }

    pub fn samples_per_second(&self) -> f32 {
        self.samples_per_second
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Loudness at `seconds` into the clip; the value of the window containing
    /// that time, clamped to the last window. Zero for an empty curve or a
    /// negative time.
    pub fn loudness_at(&self, seconds: f32) -> f32 {
        if self.samples.is_empty() || self.samples_per_second <= 0.0 || seconds < 0.0 {
            return 0.0;
        }
        let index = ((seconds * self.samples_per_second) as usize).min(self.samples.len() - 1);
        self.samples[index]
    }
}

/// Curves keyed by normalized voice path, kept for the process lifetime.
#[derive(Debug, Default)]
pub struct LoudnessCache {
    curves: HashMap<String, LoudnessCurve>,
}

impl LoudnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, voice_path: &str) -> bool {
        self.curves.contains_key(voice_path)
    }

    pub fn get(&self, voice_path: &str) -> Option<&LoudnessCurve> {
        self.curves.get(voice_path)
    }

    pub fn insert(&mut self, voice_path: impl Into<String>, curve: LoudnessCurve) {
        self.curves.insert(voice_path.into(), curve);
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
