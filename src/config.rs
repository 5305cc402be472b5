//! Configuration for the sound manager

use crate::output::PlayType;

/// Soft ceiling for resident decoded buffers.
pub const DEFAULT_BUFFER_CACHE_MAX_BYTES: usize = 15 * 1024 * 1024;

/// User-facing sound settings.
///
/// Volumes are multipliers in `[0, 1]`. The per-type volumes are combined
/// multiplicatively with `master_volume`, see [`SoundSettings::volume_for`].
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSettings {
    /// When false the output is never initialised and every operation is a no-op
    pub enabled: bool,
    /// Preferred output device (None = backend default)
    pub device: Option<String>,
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub music_volume: f32,
    pub voice_volume: f32,
    pub footsteps_volume: f32,
    /// Resident buffer budget; the cache may exceed it rather than evict in-use data
    pub buffer_cache_max_bytes: usize,
    /// Lower bound of the randomized delay between region ambient sounds, in seconds
    pub env_sound_min_interval: f32,
    /// Upper bound of the randomized delay between region ambient sounds, in seconds
    pub env_sound_max_interval: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            device: None,
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
            voice_volume: 1.0,
            footsteps_volume: 1.0,
            buffer_cache_max_bytes: DEFAULT_BUFFER_CACHE_MAX_BYTES,
            env_sound_min_interval: 5.0,
            env_sound_max_interval: 20.0,
        }
    }
}

impl SoundSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn master_volume(mut self, volume: f32) -> Self {
        self.master_volume = volume;
        self
    }

    pub fn sfx_volume(mut self, volume: f32) -> Self {
        self.sfx_volume = volume;
        self
    }

    pub fn music_volume(mut self, volume: f32) -> Self {
        self.music_volume = volume;
        self
    }

    pub fn voice_volume(mut self, volume: f32) -> Self {
        self.voice_volume = volume;
        self
    }

    pub fn footsteps_volume(mut self, volume: f32) -> Self {
        self.footsteps_volume = volume;
        self
    }

    pub fn buffer_cache_max_bytes(mut self, bytes: usize) -> Self {
        self.buffer_cache_max_bytes = bytes;
        self
    }

    pub fn env_sound_interval(mut self, min_secs: f32, max_secs: f32) -> Self {
        self.env_sound_min_interval = min_secs;
        self.env_sound_max_interval = max_secs;
        self
    }

    /// Returns a copy with every volume clamped to `[0, 1]` and the ambient
    /// interval bounds ordered.
    pub fn clamped(mut self) -> Self {
        for volume in [
            &mut self.master_volume,
            &mut self.sfx_volume,
            &mut self.music_volume,
            &mut self.voice_volume,
            &mut self.footsteps_volume,
        ] {
            *volume = volume.clamp(0.0, 1.0);
        }
        self.env_sound_min_interval = self.env_sound_min_interval.max(0.0);
        self.env_sound_max_interval = self.env_sound_max_interval.max(self.env_sound_min_interval);
        self
    }

    /// Combined gain for a playback category.
    pub fn volume_for(&self, play_type: PlayType) -> f32 {
        let category = match play_type {
            PlayType::Sfx => self.sfx_volume,
            PlayType::Voice => self.voice_volume,
            PlayType::Foot => self.footsteps_volume,
            PlayType::Music => self.music_volume,
        };
        self.master_volume * category
    }
}
