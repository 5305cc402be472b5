//! Playing instances and their per-frame state.
//!
//! - [`PlayOptions`]: what a caller asks for when starting a sound
//! - [`PlayingSound`]: a backend instance plus the parameters and fade state
//!   the manager keeps for it
//!
//! Instances are advanced by the frame update through [`PlayingSound::tick`].

use crate::math::{Listener, Vec3};
use crate::output::{PlayMode, PlayType, SoundInstance, SoundParams};

/// Sounds flagged [`PlayMode::REMOVE_AT_DISTANCE`] farther than this from the
/// listener are culled.
pub const CULL_DISTANCE: f32 = 2000.0;
pub const CULL_DISTANCE_SQUARED: f32 = CULL_DISTANCE * CULL_DISTANCE;

/// Parameters of a play request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub volume: f32,
    pub pitch: f32,
    pub play_type: PlayType,
    pub mode: PlayMode,
    /// Start offset into the sound, in seconds
    pub offset: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            play_type: PlayType::Sfx,
            mode: PlayMode::NORMAL,
            offset: 0.0,
        }
    }
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn play_type(mut self, play_type: PlayType) -> Self {
        self.play_type = play_type;
        self
    }

    pub fn mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }
}

/// Linear fade toward silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeOut {
    pub duration: f32,
    pub remaining: f32,
    /// Volume when the fade started
    pub start_volume: f32,
}

impl FadeOut {
    /// Volume after the fade has run for `elapsed` more seconds.
    fn advance(&mut self, elapsed: f32) -> f32 {
        self.remaining = (self.remaining - elapsed).max(0.0);
        (self.start_volume * self.remaining / self.duration).max(0.0)
    }

    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }
}

#[derive(Debug, Clone)]
pub struct PlayingSound<I> {
    pub instance: I,
    pub params: SoundParams,
    pub fade: Option<FadeOut>,
}

impl<I: SoundInstance> PlayingSound<I> {
    pub fn new(instance: I, params: SoundParams) -> Self {
        Self {
            instance,
            params,
            fade: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.instance.is_playing()
    }

    pub fn stop(&mut self) {
        self.instance.stop();
    }

    /// Starts fading to silence over `duration` seconds. A non-positive
    /// duration stops the sound at once.
    pub fn fade_out(&mut self, duration: f32) {
        if duration <= 0.0 {
            self.stop();
            return;
        }
        self.fade = Some(FadeOut {
            duration,
            remaining: duration,
            start_volume: self.params.volume,
        });
    }

    /// Re-applies a new category volume without interrupting playback.
    pub fn set_base_volume(&mut self, base_volume: f32) {
        self.params.base_volume = base_volume;
        self.instance.update(&self.params);
    }

    /// Advances one frame and returns whether the sound is still alive.
    ///
    /// `owner_position` is the live position of the owning entity, if any.
    /// Culling applies only to sounds that follow an entity.
    pub fn tick(&mut self, owner_position: Option<Vec3>, listener: &Listener, elapsed: f32) -> bool {
        if let Some(position) = owner_position {
            self.params.position = position;
            if self.params.mode.contains(PlayMode::REMOVE_AT_DISTANCE)
                && listener.distance_squared(position) > CULL_DISTANCE_SQUARED
            {
                log::trace!("Culling sound at distance {}", listener.position.distance(position));
                self.instance.stop();
            }
        }

        if !self.instance.is_playing() {
            return false;
        }

        let mut faded_out = false;
        if let Some(fade) = self.fade.as_mut() {
            self.params.volume = fade.advance(elapsed);
            faded_out = fade.is_done();
        }

        self.instance.update(&self.params);
        if faded_out {
            // silent now; the next liveness check prunes it
            self.fade = None;
            self.instance.stop();
        }
        true
    }
}
