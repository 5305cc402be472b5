//! Output backend interface.
//!
//! The concrete device, buffer upload, 3D panning and mixing live behind
//! [`SoundOutput`]. The manager is generic over the backend so the choice is
//! made when the manager is built, not per call.

use crate::audio_data::SoundDecoder;
use crate::error::Result;
use crate::math::{Listener, Vec3};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// How a sound instance behaves once started.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PlayMode: u32 {
        /// Not affected by the listener environment (e.g. underwater filtering)
        const NO_ENV = 1 << 0;
        /// Stopped once the source is farther than the culling distance
        const REMOVE_AT_DISTANCE = 1 << 1;
        const LOOP = 1 << 2;

        const NORMAL = 0;
        const LOOP_NO_ENV = Self::LOOP.bits() | Self::NO_ENV.bits();
        const LOOP_REMOVE_AT_DISTANCE = Self::LOOP.bits() | Self::REMOVE_AT_DISTANCE.bits();
    }
}

bitflags! {
    /// Mask of playback categories, used for pause/resume.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SoundTypes: u32 {
        const SFX = 1 << 0;
        const VOICE = 1 << 1;
        const FOOT = 1 << 2;
        const MUSIC = 1 << 3;
    }
}

/// Playback category. Every instance carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayType {
    #[default]
    Sfx,
    Voice,
    Foot,
    Music,
}

impl PlayType {
    pub fn mask(self) -> SoundTypes {
        match self {
            Self::Sfx => SoundTypes::SFX,
            Self::Voice => SoundTypes::VOICE,
            Self::Foot => SoundTypes::FOOT,
            Self::Music => SoundTypes::MUSIC,
        }
    }
}

/// Listener context pushed with every listener update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Normal,
    Underwater,
}

/// Playback parameters of one instance, owned by the manager and pushed to
/// the backend through [`SoundInstance::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundParams {
    pub position: Vec3,
    /// Per-instance volume (requested volume times definition volume)
    pub volume: f32,
    /// Category volume from the settings
    pub base_volume: f32,
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub mode: PlayMode,
    pub play_type: PlayType,
}

impl SoundParams {
    pub fn new(volume: f32, base_volume: f32, pitch: f32, mode: PlayMode, play_type: PlayType) -> Self {
        Self {
            position: Vec3::ZERO,
            volume,
            base_volume,
            pitch,
            min_distance: 1.0,
            max_distance: 1.0,
            mode,
            play_type,
        }
    }

    pub fn at(mut self, position: Vec3, min_distance: f32, max_distance: f32) -> Self {
        self.position = position;
        self.min_distance = min_distance;
        self.max_distance = max_distance;
        self
    }

    /// Effective gain sent to the device.
    pub fn gain(&self) -> f32 {
        self.volume * self.base_volume
    }
}

/// A live playing (or recently stopped) instance.
///
/// Clones must refer to the same underlying instance; the manager keeps one
/// and hands another to the caller.
pub trait SoundInstance: Clone {
    fn is_playing(&self) -> bool;

    /// Stops immediately. Stopping twice is a no-op.
    fn stop(&mut self);

    /// Pushes position, gain and pitch to the device.
    fn update(&mut self, params: &SoundParams);

    /// Seconds of audio played so far.
    fn time_offset(&self) -> f32;
}

/// The audio output capability consumed by the manager.
pub trait SoundOutput {
    /// Handle of a resident decoded buffer
    type Buffer: Copy + Eq + fmt::Debug;
    type Instance: SoundInstance;

    fn enumerate(&self) -> Vec<String>;

    /// Opens `device`, or the default device when `None`.
    fn init(&mut self, device: Option<&str>) -> Result<()>;

    fn is_initialized(&self) -> bool;

    fn load_sound(&mut self, path: &str) -> Result<Self::Buffer>;

    fn unload_sound(&mut self, buffer: Self::Buffer);

    /// Bytes of decoded sample data held by `buffer`.
    fn sound_data_size(&self, buffer: Self::Buffer) -> usize;

    fn play_sound(&mut self, buffer: Self::Buffer, params: &SoundParams, offset: f32) -> Result<Self::Instance>;

    fn play_sound_3d(&mut self, buffer: Self::Buffer, params: &SoundParams, offset: f32) -> Result<Self::Instance>;

    fn stream_sound<D: SoundDecoder + 'static>(&mut self, decoder: D, params: &SoundParams) -> Result<Self::Instance>;

    fn stream_sound_3d<D: SoundDecoder + 'static>(&mut self, decoder: D, params: &SoundParams) -> Result<Self::Instance>;

    fn pause_sounds(&mut self, types: SoundTypes);

    fn resume_sounds(&mut self, types: SoundTypes);

    /// Opens a batch; mutations until [`SoundOutput::finish_update`] apply atomically.
    fn start_update(&mut self);

    fn finish_update(&mut self);

    fn update_listener(&mut self, listener: &Listener, env: Environment);
}
