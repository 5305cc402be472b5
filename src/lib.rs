//! Soundscape: audio resource cache and playback scheduler for a game world.
//!
//! The [`SoundManager`] sits between game logic and an audio [`SoundOutput`]
//! backend. It resolves sound identities through a [`SoundDefinitionTable`],
//! keeps decoded buffers in a size-bounded [`BufferCache`], tracks every
//! live instance per owning entity and runs a throttled frame update that
//! moves, fades, culls and prunes them. Speech gets a loudness curve for
//! lip-sync; music streams from playlists.
//!
//! The host supplies three seams:
//! - [`SoundOutput`]: device, buffers, instances and listener
//! - [`SoundResources`]: the file tree and a [`SoundDecoder`] for streams
//! - [`SoundWorld`]: entity positions, cells, regions and game data

pub mod audio_data;
pub mod cache;
pub mod config;
pub mod definitions;
pub mod error;
pub mod loudness;
pub mod manager;
pub mod math;
pub mod music;
pub mod output;
pub mod playback;
pub mod registry;
pub mod resources;
pub mod update;
pub mod voice;
pub mod world;

#[cfg(test)]
mod testing;

pub use audio_data::{AudioInfo, ChannelConfig, SampleType, SoundDecoder, SymphoniaDecoder};
pub use cache::BufferCache;
pub use config::SoundSettings;
pub use definitions::{DistanceSettings, SoundDefinition, SoundDefinitionTable};
pub use error::{Result, SoundError};
pub use loudness::{LoudnessCache, LoudnessCurve};
pub use manager::SoundManager;
pub use math::{Listener, Vec3};
pub use output::{Environment, PlayMode, PlayType, SoundInstance, SoundOutput, SoundParams, SoundTypes};
pub use playback::{PlayOptions, PlayingSound};
pub use registry::Owner;
pub use resources::{FileIndex, SoundResources};
pub use world::{GameData, RegionSound, SoundRecord, SoundWorld};
