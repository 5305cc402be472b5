//! Background music: single streamed track plus random playlist titles.

use crate::audio_data::SoundDecoder;
use crate::error::Result;
use crate::manager::SoundManager;
use crate::output::{PlayMode, PlayType, SoundOutput, SoundParams};
use crate::playback::PlayingSound;
use crate::resources::{SoundResources, normalize_path};
use rand::Rng;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Directory prefix of music resources.
pub const MUSIC_DIR: &str = "music/";

#[derive(Debug, Default)]
pub(crate) struct Playlist {
    current: String,
    /// Resource listings per playlist, read once
    titles: HashMap<String, Vec<String>>,
    last_played: Option<String>,
}

impl<O, R, E> SoundManager<O, R, E>
where
    O: SoundOutput,
    R: SoundResources,
    E: Copy + Eq + Hash + Debug,
{
    /// Streams `name`, relative to the music directory, replacing any
    /// current track.
    pub fn stream_music(&mut self, name: &str) {
        self.stream_music_path(&format!("{}{}", MUSIC_DIR, name));
    }

    fn stream_music_path(&mut self, path: &str) {
        if !self.output.is_initialized() {
            return;
        }
        let path = normalize_path(path);
        log::info!("Playing {}", path);
        self.stop_music();
        self.playlist.last_played = Some(path.clone());

        match self.open_music(&path) {
            Ok(sound) => self.music = Some(sound),
            Err(e) => log::warn!("Music Error: {}", e),
        }
    }

    fn open_music(&mut self, path: &str) -> Result<PlayingSound<O::Instance>> {
        let mut decoder = self.resources.decoder();
        decoder.open(path)?;
        let params = SoundParams::new(
            1.0,
            self.settings.volume_for(PlayType::Music),
            1.0,
            PlayMode::NO_ENV,
            PlayType::Music,
        );
        let instance = self.output.stream_sound(decoder, &params)?;
        Ok(PlayingSound::new(instance, params))
    }

    pub fn stop_music(&mut self) {
        if let Some(mut music) = self.music.take() {
            music.stop();
        }
    }

    pub fn is_music_playing(&self) -> bool {
        self.music.as_ref().is_some_and(|music| music.is_playing())
    }

    /// Switches to `playlist` (a subdirectory of the music directory) and
    /// starts one of its titles.
    pub fn play_playlist(&mut self, playlist: &str) {
        self.playlist.current = normalize_path(playlist);
        self.start_random_title();
    }

    /// Starts a random title of the current playlist, avoiding an immediate
    /// repeat of the last one when there is a choice.
    pub fn start_random_title(&mut self) {
        if !self.output.is_initialized() {
            return;
        }

        let resources = &self.resources;
        let current = self.playlist.current.clone();
        let titles = self
            .playlist
            .titles
            .entry(current.clone())
            .or_insert_with(|| resources.list(&format!("{}{}", MUSIC_DIR, current)));
        if titles.is_empty() {
            return;
        }

        let mut index = self.rng.gen_range(0..titles.len());
        if titles.len() > 1 && self.playlist.last_played.as_ref() == Some(&titles[index]) {
            index = (index + 1) % titles.len();
        }
        let title = titles[index].clone();
        self.stream_music_path(&title);
    }

    /// Streams an arbitrary decoder as a non-positional track outside the
    /// music slot. The caller keeps the returned instance.
    pub fn play_track<D: SoundDecoder + 'static>(&mut self, decoder: D, play_type: PlayType) -> Option<O::Instance> {
        if !self.output.is_initialized() {
            return None;
        }
        let params = SoundParams::new(
            1.0,
            self.settings.volume_for(play_type),
            1.0,
            PlayMode::NO_ENV,
            play_type,
        );
        match self.output.stream_sound(decoder, &params) {
            Ok(instance) => Some(instance),
            Err(e) => {
                log::warn!("Sound Error: {}", e);
                None
            }
        }
    }
}
