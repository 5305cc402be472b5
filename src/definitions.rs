//! Sound definition table.
//!
//! Identities are kept in a sorted key sequence with a parallel definition
//! sequence, so a binary search on the keys yields an index that stays valid
//! for the definitions and for the buffer cache slots built alongside them.
//! Callers lowercase identities before they reach the table.

use crate::resources::normalize_path;
use crate::world::{GameData, SoundRecord};

/// Distance tuning read from game data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSettings {
    pub default_min: f32,
    pub default_max: f32,
    pub min_mult: f32,
    pub max_mult: f32,
    pub voice_default_min: f32,
    pub voice_default_max: f32,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            default_min: 5.0,
            default_max: 40.0,
            min_mult: 20.0,
            max_mult: 50.0,
            voice_default_min: 10.0,
            voice_default_max: 60.0,
        }
    }
}

impl DistanceSettings {
    pub fn from_game_data<G: GameData + ?Sized>(data: &G) -> Self {
        let fallback = Self::default();
        let read = |name: &str, default: f32| {
            data.float_setting(name).unwrap_or_else(|| {
                log::warn!("Game setting {} missing, using {}", name, default);
                default
            })
        };
        Self {
            default_min: read("fAudioDefaultMinDistance", fallback.default_min),
            default_max: read("fAudioDefaultMaxDistance", fallback.default_max),
            min_mult: read("fAudioMinDistanceMult", fallback.min_mult),
            max_mult: read("fAudioMaxDistanceMult", fallback.max_mult),
            voice_default_min: read("fAudioVoiceDefaultMinDistance", fallback.voice_default_min),
            voice_default_max: read("fAudioVoiceDefaultMaxDistance", fallback.voice_default_max),
        }
    }

    /// Applies the multipliers and floors: min at 1, max at min.
    pub fn scale(&self, min: f32, max: f32) -> (f32, f32) {
        let min = (min * self.min_mult).max(1.0);
        let max = (max * self.max_mult).max(min);
        (min, max)
    }

    pub fn voice_range(&self) -> (f32, f32) {
        self.scale(self.voice_default_min, self.voice_default_max)
    }
}

/// Static playback attributes of one sound identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundDefinition {
    /// Normalized resource path, e.g. `sound/fx/hit.wav`
    pub path: String,
    pub volume: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl SoundDefinition {
    pub fn from_record(record: &SoundRecord, distances: &DistanceSettings) -> Self {
        let volume = 10f64.powf((record.volume as f64 / 255.0 * 3348.0 - 3348.0) / 2000.0) as f32;

        let (min, max) = if record.min_range == 0 && record.max_range == 0 {
            (distances.default_min, distances.default_max)
        } else {
            (record.min_range as f32, record.max_range as f32)
        };
        let (min_distance, max_distance) = distances.scale(min, max);

        Self {
            path: normalize_path(&format!("sound/{}", record.sound)),
            volume,
            min_distance,
            max_distance,
        }
    }
}

#[derive(Debug, Default)]
pub struct SoundDefinitionTable {
    keys: Vec<String>,
    definitions: Vec<SoundDefinition>,
}

impl SoundDefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Inserts `identity` in key order and returns its index.
    ///
    /// A duplicate identity is logged and skipped; the original definition
    /// is kept and `None` returned.
    pub fn register(
        &mut self,
        identity: &str,
        record: &SoundRecord,
        distances: &DistanceSettings,
    ) -> Option<usize> {
        let pos = match self.keys.binary_search_by(|key| key.as_str().cmp(identity)) {
            Ok(_) => {
                log::warn!("Duplicate sound record \"{}\"", identity);
                return None;
            }
            Err(pos) => pos,
        };

        self.keys.insert(pos, identity.to_string());
        self.definitions
            .insert(pos, SoundDefinition::from_record(record, distances));
        Some(pos)
    }

    pub fn resolve(&self, identity: &str) -> Option<usize> {
        self.keys
            .binary_search_by(|key| key.as_str().cmp(identity))
            .ok()
    }

    /// Registers every record, lowercasing identities. Returns how many were added.
    pub fn load_catalog<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a SoundRecord>,
        distances: &DistanceSettings,
    ) -> usize {
        let records = records.into_iter();
        let (lower, _) = records.size_hint();
        self.keys.reserve(lower);
        self.definitions.reserve(lower);

        records
            .filter(|record| {
                self.register(&record.id.to_lowercase(), record, distances)
                    .is_some()
            })
            .count()
    }

    pub fn get(&self, index: usize) -> Option<&SoundDefinition> {
        self.definitions.get(index)
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }
}
