//! Live-instance registries keyed by owner.
//!
//! [`ActiveSounds`] holds every buffer-backed instance grouped by owning
//! entity; [`ActiveSays`] holds at most one speech stream per owner. An owner
//! vanishes from either map as soon as it has nothing left playing.

use crate::cache::BufferCache;
use crate::output::SoundInstance;
use crate::playback::PlayingSound;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;

/// Who a sound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner<E> {
    /// Ambient, UI or position-only sounds
    Detached,
    Entity(E),
}

impl<E: Copy> Owner<E> {
    pub fn entity(&self) -> Option<E> {
        match self {
            Self::Detached => None,
            Self::Entity(entity) => Some(*entity),
        }
    }
}

impl<E> From<E> for Owner<E> {
    fn from(entity: E) -> Self {
        Self::Entity(entity)
    }
}

/// An instance together with the buffer slot it plays.
#[derive(Debug, Clone)]
pub struct ActiveSound<I> {
    pub sound: PlayingSound<I>,
    pub buffer: usize,
}

#[derive(Debug)]
pub struct ActiveSounds<E, I> {
    sounds: HashMap<Owner<E>, Vec<ActiveSound<I>>>,
}

impl<E, I> Default for ActiveSounds<E, I> {
    fn default() -> Self {
        Self {
            sounds: HashMap::new(),
        }
    }
}

impl<E, I> ActiveSounds<E, I>
where
    E: Copy + Eq + Hash + Debug,
    I: SoundInstance,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners with at least one sound.
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn sound_count(&self) -> usize {
        self.sounds.values().map(Vec::len).sum()
    }

    pub fn entries(&self, owner: &Owner<E>) -> &[ActiveSound<I>] {
        self.sounds.get(owner).map_or(&[], Vec::as_slice)
    }

    pub fn owners(&self) -> impl Iterator<Item = &Owner<E>> {
        self.sounds.keys()
    }

    pub fn insert(&mut self, owner: Owner<E>, sound: PlayingSound<I>, buffer: usize) {
        self.sounds
            .entry(owner)
            .or_default()
            .push(ActiveSound { sound, buffer });
    }

    fn matching_mut(
        &mut self,
        owner: &Owner<E>,
        buffer: Option<usize>,
    ) -> impl Iterator<Item = &mut ActiveSound<I>> {
        self.sounds
            .get_mut(owner)
            .into_iter()
            .flatten()
            .filter(move |entry| buffer.is_none_or(|b| entry.buffer == b))
    }

    /// Stops the owner's sounds, or only those playing `buffer`.
    pub fn stop(&mut self, owner: &Owner<E>, buffer: Option<usize>) {
        for entry in self.matching_mut(owner, buffer) {
            entry.sound.stop();
        }
    }

    pub fn fade_out(&mut self, owner: &Owner<E>, buffer: usize, duration: f32) {
        for entry in self.matching_mut(owner, Some(buffer)) {
            entry.sound.fade_out(duration);
        }
    }

    pub fn is_playing(&self, owner: &Owner<E>, buffer: usize) -> bool {
        self.entries(owner)
            .iter()
            .any(|entry| entry.buffer == buffer && entry.sound.is_playing())
    }

    /// Stops every sound whose owner satisfies `filter`.
    pub fn stop_where(&mut self, mut filter: impl FnMut(&Owner<E>) -> bool) {
        for (owner, entries) in self.sounds.iter_mut() {
            if filter(owner) {
                entries.iter_mut().for_each(|entry| entry.sound.stop());
            }
        }
    }

    /// Moves everything `old` owns to `new`.
    pub fn reassign(&mut self, old: &Owner<E>, new: Owner<E>) {
        if *old == new {
            return;
        }
        if let Some(moved) = self.sounds.remove(old) {
            self.sounds.entry(new).or_default().extend(moved);
        }
    }

    /// Runs `keep` on every instance. Instances it rejects are dropped and
    /// their buffer reference returned to `cache`; owners left empty go away.
    pub fn retain<B, F>(&mut self, cache: &mut BufferCache<B>, mut keep: F)
    where
        B: Copy + Eq + Debug,
        F: FnMut(&Owner<E>, &mut PlayingSound<I>) -> bool,
    {
        self.sounds.retain(|owner, entries| {
            entries.retain_mut(|entry| {
                let alive = keep(owner, &mut entry.sound);
                if !alive {
                    cache.release(entry.buffer);
                }
                alive
            });
            !entries.is_empty()
        });
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&Owner<E>, &mut PlayingSound<I>)) {
        for (owner, entries) in self.sounds.iter_mut() {
            entries.iter_mut().for_each(|entry| f(owner, &mut entry.sound));
        }
    }

    /// Stops everything and releases every buffer reference.
    pub fn clear<B>(&mut self, cache: &mut BufferCache<B>)
    where
        B: Copy + Eq + Debug,
    {
        for entry in self.sounds.drain().flat_map(|(_, entries)| entries) {
            let mut sound = entry.sound;
            sound.stop();
            cache.release(entry.buffer);
        }
    }
}

/// A speech stream and the voice file it plays.
#[derive(Debug, Clone)]
pub struct ActiveSay<I> {
    pub sound: PlayingSound<I>,
    /// Normalized voice path, key into the loudness cache
    pub voice_path: String,
}

#[derive(Debug)]
pub struct ActiveSays<E, I> {
    says: HashMap<Owner<E>, ActiveSay<I>>,
}

impl<E, I> Default for ActiveSays<E, I> {
    fn default() -> Self {
        Self {
            says: HashMap::new(),
        }
    }
}

impl<E, I> ActiveSays<E, I>
where
    E: Copy + Eq + Hash + Debug,
    I: SoundInstance,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.says.len()
    }

    pub fn is_empty(&self) -> bool {
        self.says.is_empty()
    }

    pub fn get(&self, owner: &Owner<E>) -> Option<&ActiveSay<I>> {
        self.says.get(owner)
    }

    /// Records a new say for `owner`, stopping the one it replaces.
    pub fn insert(&mut self, owner: Owner<E>, sound: PlayingSound<I>, voice_path: String) {
        if let Some(mut previous) = self.says.insert(owner, ActiveSay { sound, voice_path }) {
            previous.sound.stop();
        }
    }

    pub fn stop(&mut self, owner: &Owner<E>) {
        if let Some(mut say) = self.says.remove(owner) {
            say.sound.stop();
        }
    }

    pub fn is_done(&self, owner: &Owner<E>) -> bool {
        self.says
            .get(owner)
            .is_none_or(|say| !say.sound.is_playing())
    }

    pub fn stop_where(&mut self, mut filter: impl FnMut(&Owner<E>) -> bool) {
        for (owner, say) in self.says.iter_mut() {
            if filter(owner) {
                say.sound.stop();
            }
        }
    }

    /// Moves `old`'s say to `new`; a say already held by `new` is stopped.
    pub fn reassign(&mut self, old: &Owner<E>, new: Owner<E>) {
        if *old == new {
            return;
        }
        if let Some(moved) = self.says.remove(old) {
            match self.says.entry(new) {
                Entry::Occupied(mut slot) => {
                    let mut replaced = slot.insert(moved);
                    replaced.sound.stop();
                }
                Entry::Vacant(slot) => {
                    slot.insert(moved);
                }
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Owner<E>, &mut PlayingSound<I>) -> bool) {
        self.says.retain(|owner, say| keep(owner, &mut say.sound));
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&Owner<E>, &mut PlayingSound<I>)) {
        for (owner, say) in self.says.iter_mut() {
            f(owner, &mut say.sound);
        }
    }

    pub fn clear(&mut self) {
        for (_, mut say) in self.says.drain() {
            say.sound.stop();
        }
    }
}
