//! The sound manager: owns the backend, the definition table, the buffer
//! cache and the live-instance registries, and exposes the play/stop API.
//!
//! The frame update lives in [`crate::update`], music in [`crate::music`] and
//! speech in [`crate::voice`].

use crate::cache::BufferCache;
use crate::config::SoundSettings;
use crate::definitions::{DistanceSettings, SoundDefinitionTable};
use crate::error::{Result, SoundError};
use crate::loudness::LoudnessCache;
use crate::math::{Listener, Vec3};
use crate::music::Playlist;
use crate::output::{PlayMode, PlayType, SoundInstance, SoundOutput, SoundParams, SoundTypes};
use crate::playback::{CULL_DISTANCE_SQUARED, PlayOptions, PlayingSound};
use crate::registry::{ActiveSays, ActiveSounds, Owner};
use crate::resources::SoundResources;
use crate::update::{FrameClock, RegionSoundState};
use crate::world::{GameData, SoundWorld, is_underwater};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt::Debug;
use std::hash::Hash;

pub struct SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    pub(crate) output: O,
    pub(crate) resources: R,
    pub(crate) settings: SoundSettings,

    pub(crate) definitions: SoundDefinitionTable,
    pub(crate) catalog_loaded: bool,
    pub(crate) distances: Option<DistanceSettings>,
    pub(crate) cache: BufferCache<O::Buffer>,

    pub(crate) sounds: ActiveSounds<E, O::Instance>,
    pub(crate) says: ActiveSays<E, O::Instance>,
    pub(crate) loudness: LoudnessCache,
    pub(crate) music: Option<PlayingSound<O::Instance>>,
    pub(crate) playlist: Playlist,
    pub(crate) underwater_sound: Option<O::Instance>,

    pub(crate) listener: Listener,
    pub(crate) listener_underwater: bool,
    pub(crate) paused: SoundTypes,

    pub(crate) clock: FrameClock,
    pub(crate) region: RegionSoundState,
    pub(crate) rng: StdRng,
}

impl<O, R, E> SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    /// Creates the manager and opens the output device.
    ///
    /// With sound disabled in `settings` no device is opened and every play
    /// request is ignored. A failing preferred device falls back to the
    /// default one and the preference is cleared.
    pub fn new(output: O, resources: R, settings: SoundSettings) -> Self {
        let settings = settings.clamped();
        let mut manager = Self {
            output,
            resources,
            cache: BufferCache::new(settings.buffer_cache_max_bytes),
            settings,
            definitions: SoundDefinitionTable::new(),
            catalog_loaded: false,
            distances: None,
            sounds: ActiveSounds::new(),
            says: ActiveSays::new(),
            loudness: LoudnessCache::new(),
            music: None,
            playlist: Playlist::default(),
            underwater_sound: None,
            listener: Listener::default(),
            listener_underwater: false,
            paused: SoundTypes::empty(),
            clock: FrameClock::default(),
            region: RegionSoundState::default(),
            rng: StdRng::from_entropy(),
        };

        if manager.settings.enabled {
            manager.init_output();
        } else {
            log::info!("Sound disabled.");
        }
        manager
    }

    /// Replaces the random source used for ambient draws and playlists.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    fn init_output(&mut self) {
        log::info!("Enumerated output devices:");
        for name in self.output.enumerate() {
            log::info!("  {}", name);
        }

        let result = match self.settings.device.clone() {
            Some(device) => match self.output.init(Some(&device)) {
                Ok(()) => Ok(()),
                Err(e) => {
                    log::warn!("Failed to open device \"{}\": {}", device, e);
                    let fallback = self.output.init(None);
                    if fallback.is_ok() {
                        self.settings.device = None;
                    }
                    fallback
                }
            },
            None => self.output.init(None),
        };

        if let Err(e) = result {
            log::error!("Sound initialization failed: {}", e);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.output.is_initialized()
    }

    pub fn settings(&self) -> &SoundSettings {
        &self.settings
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn definitions(&self) -> &SoundDefinitionTable {
        &self.definitions
    }

    pub fn buffer_cache(&self) -> &BufferCache<O::Buffer> {
        &self.cache
    }

    pub fn active_sounds(&self) -> &ActiveSounds<E, O::Instance> {
        &self.sounds
    }

    pub fn active_says(&self) -> &ActiveSays<E, O::Instance> {
        &self.says
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn is_listener_underwater(&self) -> bool {
        self.listener_underwater
    }

    pub(crate) fn distance_settings<G: GameData + ?Sized>(&mut self, data: &G) -> DistanceSettings {
        *self
            .distances
            .get_or_insert_with(|| DistanceSettings::from_game_data(data))
    }

    fn load_catalog<G: GameData + ?Sized>(&mut self, data: &G) {
        let distances = self.distance_settings(data);
        let records = data.sound_records();
        let added = self.definitions.load_catalog(&records, &distances);
        self.cache.resize(self.definitions.len());
        self.catalog_loaded = true;
        log::info!("Loaded {} sound definitions", added);
    }

    /// Resolves a sound identity to its definition index.
    ///
    /// The whole catalog is loaded the first time the table is found empty.
    pub fn lookup_id<G: GameData + ?Sized>(&mut self, data: &G, id: &str) -> Result<usize> {
        let id = id.to_lowercase();
        if let Some(index) = self.definitions.resolve(&id) {
            return Ok(index);
        }
        if self.definitions.is_empty() && !self.catalog_loaded {
            self.load_catalog(data);
            if let Some(index) = self.definitions.resolve(&id) {
                return Ok(index);
            }
        }
        Err(SoundError::UnknownSound(id))
    }

    /// Plays a non-positional sound owned by nobody.
    pub fn play_sound<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        id: &str,
        options: PlayOptions,
    ) -> Option<O::Instance> {
        self.play_buffered(data, Owner::Detached, id, options, None)
    }

    /// Plays a positional sound that follows `entity`.
    pub fn play_sound_3d<W: SoundWorld<Entity = E>>(
        &mut self,
        world: &W,
        entity: E,
        id: &str,
        options: PlayOptions,
    ) -> Option<O::Instance> {
        let Some(position) = world.position(entity) else {
            log::warn!("Sound Error: {}", SoundError::UnknownEntity(format!("{:?}", entity)));
            return None;
        };
        self.play_buffered(world, Owner::Entity(entity), id, options, Some(position))
    }

    /// Plays a positional sound at a fixed point.
    pub fn play_sound_3d_at<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        position: Vec3,
        id: &str,
        options: PlayOptions,
    ) -> Option<O::Instance> {
        self.play_buffered(data, Owner::Detached, id, options, Some(position))
    }

    fn play_buffered<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        owner: Owner<E>,
        id: &str,
        options: PlayOptions,
        position: Option<Vec3>,
    ) -> Option<O::Instance> {
        if !self.output.is_initialized() {
            return None;
        }

        if let Some(position) = position {
            if options.mode.contains(PlayMode::REMOVE_AT_DISTANCE)
                && self.listener.distance_squared(position) > CULL_DISTANCE_SQUARED
            {
                log::trace!("Not playing {}: too far from the listener", id);
                return None;
            }
        }

        match self.start_buffered(data, owner, id, options, position) {
            Ok(instance) => Some(instance),
            Err(e) => {
                log::warn!("Sound Error: {}", e);
                None
            }
        }
    }

    fn start_buffered<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        owner: Owner<E>,
        id: &str,
        options: PlayOptions,
        position: Option<Vec3>,
    ) -> Result<O::Instance> {
        let index = self.lookup_id(data, id)?;
        let definition = self
            .definitions
            .get(index)
            .ok_or_else(|| SoundError::UnknownSound(id.to_string()))?;
        let handle = self.cache.acquire(&mut self.output, index, &definition.path)?;

        let mut params = SoundParams::new(
            options.volume * definition.volume,
            self.settings.volume_for(options.play_type),
            options.pitch,
            options.mode,
            options.play_type,
        );
        let instance = match position {
            Some(position) => {
                params = params.at(position, definition.min_distance, definition.max_distance);
                self.output.play_sound_3d(handle, &params, options.offset)?
            }
            None => self.output.play_sound(handle, &params, options.offset)?,
        };

        self.cache.add_ref(index);
        self.sounds
            .insert(owner, PlayingSound::new(instance.clone(), params), index);
        Ok(instance)
    }

    /// Stops every instance of `id` played by `entity`.
    pub fn stop_sound_3d<G: GameData + ?Sized>(&mut self, data: &G, entity: E, id: &str) {
        self.stop_owned(data, Owner::Entity(entity), id);
    }

    /// Stops every instance of `id` that has no owner.
    pub fn stop_sound<G: GameData + ?Sized>(&mut self, data: &G, id: &str) {
        self.stop_owned(data, Owner::Detached, id);
    }

    fn stop_owned<G: GameData + ?Sized>(&mut self, data: &G, owner: Owner<E>, id: &str) {
        match self.lookup_id(data, id) {
            Ok(index) => self.sounds.stop(&owner, Some(index)),
            Err(e) => log::warn!("Sound Error: {}", e),
        }
    }

    pub fn stop_all_sounds_3d(&mut self, entity: E) {
        self.sounds.stop(&Owner::Entity(entity), None);
    }

    /// Fades every instance of `id` played by `entity` to silence.
    pub fn fade_out_sound_3d<G: GameData + ?Sized>(
        &mut self,
        data: &G,
        entity: E,
        id: &str,
        duration: f32,
    ) {
        match self.lookup_id(data, id) {
            Ok(index) => self.sounds.fade_out(&Owner::Entity(entity), index, duration),
            Err(e) => log::warn!("Sound Error: {}", e),
        }
    }

    /// True while `entity` has a playing instance of `id`.
    pub fn is_sound_playing(&self, entity: E, id: &str) -> bool {
        self.definitions
            .resolve(&id.to_lowercase())
            .is_some_and(|index| self.sounds.is_playing(&Owner::Entity(entity), index))
    }

    /// Stops sounds and says of every entity matching `filter`, except
    /// `player`. Detached sounds are never touched.
    pub fn stop_sounds_where(&mut self, player: E, mut filter: impl FnMut(E) -> bool) {
        let mut matches =
            |owner: &Owner<E>| owner.entity().is_some_and(|e| e != player && filter(e));
        self.sounds.stop_where(&mut matches);
        self.says.stop_where(&mut matches);
    }

    /// Stops everything owned by entities in `cell`, sparing the player.
    pub fn stop_cell_sounds<W: SoundWorld<Entity = E>>(&mut self, world: &W, cell: &W::Cell) {
        let player = world.player();
        self.stop_sounds_where(player, |entity| world.cell(entity).as_ref() == Some(cell));
    }

    /// Hands everything `old` owns to `new`.
    pub fn reassign_owner(&mut self, old: E, new: E) {
        self.sounds.reassign(&Owner::Entity(old), Owner::Entity(new));
        self.says.reassign(&Owner::Entity(old), Owner::Entity(new));
    }

    pub fn pause_sounds(&mut self, types: SoundTypes) {
        if !self.output.is_initialized() {
            return;
        }
        let types = types & SoundTypes::all();
        self.paused |= types;
        self.output.pause_sounds(types);
    }

    /// Resumes the given types; types that aren't paused are ignored.
    pub fn resume_sounds(&mut self, types: SoundTypes) {
        if !self.output.is_initialized() {
            return;
        }
        let types = types & self.paused;
        if types.is_empty() {
            return;
        }
        self.paused -= types;
        self.output.resume_sounds(types);
    }

    pub fn paused_types(&self) -> SoundTypes {
        self.paused
    }

    pub fn is_type_paused(&self, play_type: PlayType) -> bool {
        self.paused.contains(play_type.mask())
    }

    /// Moves the listener; pushed to the backend on the next update.
    pub fn set_listener<W: SoundWorld<Entity = E>>(
        &mut self,
        world: &W,
        position: Vec3,
        direction: Vec3,
        up: Vec3,
    ) {
        self.listener = Listener::new(position, direction, up);
        self.listener_underwater = is_underwater(world, position);
    }

    /// Stops everything: buffer sounds, says, music and the underwater loop.
    pub fn clear(&mut self) {
        self.sounds.clear(&mut self.cache);
        self.says.clear();
        if let Some(mut sound) = self.underwater_sound.take() {
            sound.stop();
        }
        self.stop_music();
    }
}

impl<O, R, E> Drop for SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    fn drop(&mut self) {
        self.clear();
        if self.output.is_initialized() {
            self.cache.unload_all(&mut self.output);
        }
    }
}
