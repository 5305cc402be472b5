//! Speech: streamed voice lines with a loudness curve for lip-sync.
//!
//! Each owner has at most one say at a time. The loudness curve of a voice
//! file is computed on its first play and kept for later queries.

use crate::audio_data::SoundDecoder;
use crate::error::{Result, SoundError};
use crate::loudness::{LOUDNESS_SAMPLES_PER_SECOND, LoudnessCurve};
use crate::manager::SoundManager;
use crate::math::Vec3;
use crate::output::{PlayMode, PlayType, SoundInstance, SoundOutput, SoundParams};
use crate::playback::PlayingSound;
use crate::registry::Owner;
use crate::resources::{SoundResources, normalize_path, with_extension};
use crate::world::{GameData, SoundWorld};
use std::fmt::Debug;
use std::hash::Hash;

/// Resource path of a voice file given relative to the sound directory.
pub fn voice_path(filename: &str) -> String {
    normalize_path(&format!("sound/{}", filename))
}

impl<O, R, E> SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    /// Has `entity` speak `filename`, replacing whatever it was saying.
    pub fn say<W: SoundWorld<Entity = E>>(&mut self, world: &W, entity: E, filename: &str) {
        if !self.output.is_initialized() {
            return;
        }
        let result = world
            .position(entity)
            .ok_or_else(|| SoundError::UnknownEntity(format!("{:?}", entity)))
            .and_then(|position| self.start_say(world, Owner::Entity(entity), filename, Some(position)));
        if let Err(e) = result {
            log::warn!("Sound Error: {}", e);
        }
    }

    /// Plays `filename` as non-positional speech, e.g. for a narrator.
    pub fn say_detached<G: GameData + ?Sized>(&mut self, data: &G, filename: &str) {
        if !self.output.is_initialized() {
            return;
        }
        if let Err(e) = self.start_say(data, Owner::Detached, filename, None) {
            log::warn!("Sound Error: {}", e);
        }
    }

    fn start_say<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        owner: Owner<E>,
        filename: &str,
        position: Option<Vec3>,
    ) -> Result<()> {
        let path = voice_path(filename);
        let decoder = self.load_voice(&path)?;

        let mut params = SoundParams::new(
            1.0,
            self.settings.volume_for(PlayType::Voice),
            1.0,
            PlayMode::NORMAL,
            PlayType::Voice,
        );
        let instance = match position {
            Some(position) => {
                let (min, max) = self.distance_settings(data).voice_range();
                params = params.at(position, min, max);
                self.output.stream_sound_3d(decoder, &params)?
            }
            None => self.output.stream_sound(decoder, &params)?,
        };

        self.says
            .insert(owner, PlayingSound::new(instance, params), path);
        Ok(())
    }

    /// Opens a voice file, falling back to the `.mp3` variant when the named
    /// file doesn't exist, and makes sure its loudness curve is cached.
    fn load_voice(&mut self, path: &str) -> Result<R::Decoder> {
        let mut decoder = self.resources.decoder();
        if self.resources.exists(path) {
            decoder.open(path)?;
        } else {
            decoder.open(&with_extension(path, "mp3"))?;
        }

        if !self.loudness.contains(path) {
            let info = decoder.info()?;
            let data = decoder.read_all()?;
            let curve = LoudnessCurve::analyze(&data, &info, LOUDNESS_SAMPLES_PER_SECOND);
            log::debug!("Loudness of {}: {} samples", path, curve.samples().len());
            self.loudness.insert(path, curve);
            decoder.rewind()?;
        }
        Ok(decoder)
    }

    /// True when `owner` has nothing left to say.
    pub fn say_done(&self, owner: Owner<E>) -> bool {
        self.says.is_done(&owner)
    }

    pub fn stop_say(&mut self, owner: Owner<E>) {
        self.says.stop(&owner);
    }

    /// Current loudness of what `owner` is saying; zero when silent.
    pub fn say_loudness(&self, owner: Owner<E>) -> f32 {
        let Some(say) = self.says.get(&owner) else {
            return 0.0;
        };
        if !say.sound.is_playing() {
            return 0.0;
        }
        self.loudness
            .get(&say.voice_path)
            .map_or(0.0, |curve| curve.loudness_at(say.sound.instance.time_offset()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoundSettings;
    use crate::testing::{EXTERIOR, MockClip, MockOutput, MockResources, MockWorld, init_logging};

    type Manager = SoundManager<MockOutput, MockResources, u32>;

    fn setup() -> (MockOutput, MockResources, Manager) {
        init_logging();
        let output = MockOutput::new();
        let resources = MockResources::new();
        let manager = SoundManager::new(
            output.clone(),
            resources.clone(),
            SoundSettings::new().voice_volume(0.5),
        );
        (output, resources, manager)
    }

    #[test]
    fn test_say_streams_positional_voice() {
        let (output, resources, mut manager) = setup();
        resources.add("sound/vo/hello.wav", MockClip::silence(8000, 1.0));
        let mut world = MockWorld::new();
        world.spawn(5, Vec3::new(3.0, 0.0, 0.0), EXTERIOR);

        manager.say(&world, 5, "Vo\\Hello.wav");

        let play = output.last_play().unwrap();
        assert!(play.spatial);
        assert_eq!(play.params.play_type, PlayType::Voice);
        assert_eq!(play.params.base_volume, 0.5);
        assert_eq!(play.params.position, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(play.params.min_distance, 200.0);
        assert_eq!(play.params.max_distance, 3000.0);
        assert!(!manager.say_done(Owner::Entity(5)));
        assert!(manager.say_done(Owner::Entity(6)));
    }

    #[test]
    fn test_falls_back_to_mp3() {
        let (output, resources, mut manager) = setup();
        resources.add("sound/vo/hello.mp3", MockClip::silence(8000, 1.0));
        let world = MockWorld::new();

        manager.say_detached(&world, "vo/hello.wav");

        assert_eq!(resources.opens(), vec!["sound/vo/hello.mp3".to_string()]);
        assert!(!output.last_play().unwrap().spatial);
        assert!(!manager.say_done(Owner::Detached));
    }

    #[test]
    fn test_missing_voice_is_logged_not_played() {
        let (output, _resources, mut manager) = setup();
        let mut world = MockWorld::new();
        world.spawn(5, Vec3::ZERO, EXTERIOR);

        manager.say(&world, 5, "vo/none.wav");

        assert!(output.plays().is_empty());
        assert!(manager.say_done(Owner::Entity(5)));
    }

    #[test]
    fn test_new_say_replaces_old() {
        let (output, resources, mut manager) = setup();
        resources.add("sound/vo/a.wav", MockClip::silence(8000, 1.0));
        resources.add("sound/vo/b.wav", MockClip::silence(8000, 1.0));
        let mut world = MockWorld::new();
        world.spawn(5, Vec3::ZERO, EXTERIOR);

        manager.say(&world, 5, "vo/a.wav");
        let first = output.last_play().unwrap().instance;
        manager.say(&world, 5, "vo/b.wav");

        assert!(!first.is_playing());
        assert_eq!(manager.active_says().len(), 1);
        assert_eq!(
            manager.active_says().get(&Owner::Entity(5)).unwrap().voice_path,
            "sound/vo/b.wav"
        );

        manager.stop_say(Owner::Entity(5));
        assert!(manager.say_done(Owner::Entity(5)));
    }

    #[test]
    fn test_loudness_follows_playback_offset() {
        let (output, resources, mut manager) = setup();
        resources.add("sound/vo/loud.wav", MockClip::constant(1000, 1.0, 0.5));
        let mut world = MockWorld::new();
        world.spawn(5, Vec3::ZERO, EXTERIOR);

        manager.say(&world, 5, "vo/loud.wav");
        let instance = output.last_play().unwrap().instance;
        instance.set_time_offset(0.3);
        assert_eq!(manager.say_loudness(Owner::Entity(5)), 0.5);

        // the decoder handed to the backend was rewound after analysis
        let info = output.last_play().unwrap().stream_info.unwrap();
        assert_eq!(info.sample_rate, 1000);

        instance.finish();
        assert_eq!(manager.say_loudness(Owner::Entity(5)), 0.0);
        assert_eq!(manager.say_loudness(Owner::Entity(6)), 0.0);
    }

    #[test]
    fn test_loudness_computed_once_per_file() {
        let (_output, resources, mut manager) = setup();
        resources.add("sound/vo/a.wav", MockClip::silence(8000, 1.0));
        let world = MockWorld::new();

        manager.say_detached(&world, "vo/a.wav");
        manager.say_detached(&world, "vo/a.wav");

        assert_eq!(manager.loudness.len(), 1);
        assert_eq!(resources.opens().len(), 2);
    }

    #[test]
    fn test_finished_say_is_pruned_by_update() {
        let (output, resources, mut manager) = setup();
        resources.add("sound/vo/a.wav", MockClip::silence(8000, 1.0));
        let mut world = MockWorld::new();
        world.spawn(5, Vec3::ZERO, EXTERIOR);

        manager.say(&world, 5, "vo/a.wav");
        output.last_play().unwrap().instance.finish();
        manager.update(&world, 0.5);

        assert!(manager.active_says().is_empty());
    }
}
