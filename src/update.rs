//! Per-frame maintenance of everything the manager has playing.
//!
//! Work runs at most 30 times per second: frame durations accumulate until
//! an interval has passed, then a single pass consumes the whole amount. Each
//! pass pushes the listener, keeps the underwater loop in step, advances
//! every instance and prunes the finished ones, all inside one backend batch.
//! Region ambient sounds are scheduled every frame.

use crate::config::SoundSettings;
use crate::manager::SoundManager;
use crate::output::{Environment, PlayMode, SoundInstance, SoundOutput};
use crate::playback::{PlayOptions, PlayingSound};
use crate::registry::Owner;
use crate::resources::SoundResources;
use crate::world::SoundWorld;
use rand::Rng;
use std::fmt::Debug;
use std::hash::Hash;

/// Minimum time between two update passes.
pub const UPDATE_INTERVAL: f32 = 1.0 / 30.0;

/// Sound identity of the loop played while the listener is underwater.
pub const UNDERWATER_SOUND: &str = "Underwater";

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameClock {
    accumulated: f32,
}

impl FrameClock {
    /// Adds `duration`; once an interval has accumulated, returns everything
    /// accumulated and starts over.
    pub(crate) fn advance(&mut self, duration: f32) -> Option<f32> {
        self.accumulated += duration;
        if self.accumulated < UPDATE_INTERVAL {
            return None;
        }
        Some(std::mem::take(&mut self.accumulated))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RegionSoundState {
    time_passed: f32,
    time_to_next: f32,
    region: Option<String>,
    /// Sum of chances of the current region; 0 until computed
    total: u32,
}

/// Maps `draw` in `[0, sum(weights))` to the entry whose cumulative weight
/// range contains it. Zero-weight entries are never picked.
pub fn pick_weighted(weights: &[u32], draw: u32) -> Option<usize> {
    let mut start = 0u32;
    for (index, &weight) in weights.iter().enumerate() {
        if draw < start + weight {
            return Some(index);
        }
        start += weight;
    }
    None
}

impl<O, R, E> SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    /// Advances the manager by one frame of `duration` seconds.
    ///
    /// Does nothing while sound is off or no game is running.
    pub fn update<W: SoundWorld<Entity = E>>(&mut self, world: &W, duration: f32) {
        if !self.output.is_initialized() || !world.is_game_running() {
            return;
        }
        self.update_sounds(world, duration);
        self.update_region_sound(world, duration);
    }

    /// Runs `f` inside one backend batch.
    pub fn with_update_batch<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.output.start_update();
        let result = f(self);
        self.output.finish_update();
        result
    }

    fn update_sounds<W: SoundWorld<Entity = E>>(&mut self, world: &W, duration: f32) {
        let Some(elapsed) = self.clock.advance(duration) else {
            return;
        };

        if !self.is_music_playing() {
            self.start_random_title();
        }

        let env = if self.listener_underwater {
            Environment::Underwater
        } else {
            if let Some(mut sound) = self.underwater_sound.take() {
                sound.stop();
            }
            Environment::Normal
        };

        self.with_update_batch(|manager| {
            manager.output.update_listener(&manager.listener, env);

            if env == Environment::Underwater
                && !manager
                    .underwater_sound
                    .as_ref()
                    .is_some_and(|sound| sound.is_playing())
            {
                let options = PlayOptions::new().mode(PlayMode::LOOP_NO_ENV);
                manager.underwater_sound = manager.play_sound(world, UNDERWATER_SOUND, options);
            }

            let listener = manager.listener;
            manager.sounds.retain(&mut manager.cache, |owner, sound| {
                let position = owner.entity().and_then(|entity| world.position(entity));
                sound.tick(position, &listener, elapsed)
            });
            manager.says.retain(|owner, sound| {
                let position = owner.entity().and_then(|entity| world.position(entity));
                sound.tick(position, &listener, elapsed)
            });
        });
    }

    fn update_region_sound<W: SoundWorld<Entity = E>>(&mut self, world: &W, duration: f32) {
        self.region.time_passed += duration;

        let Some(cell) = world.cell(world.player()) else {
            return;
        };
        if !world.is_exterior(&cell) || self.region.time_passed < self.region.time_to_next {
            return;
        }

        let a: f32 = self.rng.gen_range(0.0..=1.0);
        self.region.time_to_next = self.settings.env_sound_min_interval * a
            + self.settings.env_sound_max_interval * (1.0 - a);
        self.region.time_passed = 0.0;

        let Some(region) = world.region(&cell) else {
            return;
        };
        if self.region.region.as_deref() != Some(region.as_str()) {
            self.region.total = 0;
            self.region.region = Some(region.clone());
        }

        let Some(sounds) = world.region_sounds(&region) else {
            return;
        };
        let weights: Vec<u32> = sounds.iter().map(|sound| u32::from(sound.chance)).collect();
        if self.region.total == 0 {
            self.region.total = weights.iter().sum();
            if self.region.total == 0 {
                return;
            }
        }

        let draw = self.rng.gen_range(0..self.region.total);
        if let Some(index) = pick_weighted(&weights, draw) {
            log::debug!("Region {} ambient: {}", region, sounds[index].sound);
            self.play_sound(world, &sounds[index].sound, PlayOptions::new());
        }
    }

    /// Replaces the settings, moves the buffer cache to the new ceiling and
    /// re-applies category volumes to everything playing, in one batch.
    pub fn apply_settings(&mut self, settings: SoundSettings) {
        self.settings = settings.clamped();
        self.cache
            .set_max_size(&mut self.output, self.settings.buffer_cache_max_bytes);
        if !self.output.is_initialized() {
            return;
        }

        self.with_update_batch(|manager| {
            let settings = &manager.settings;
            let refresh = |_: &Owner<E>, sound: &mut PlayingSound<O::Instance>| {
                sound.set_base_volume(settings.volume_for(sound.params.play_type));
            };
            manager.sounds.for_each_mut(refresh);
            manager.says.for_each_mut(refresh);
            if let Some(music) = manager.music.as_mut() {
                music.set_base_volume(settings.volume_for(music.params.play_type));
            }
        });
    }
}
