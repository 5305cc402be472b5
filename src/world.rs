//! Read-only lookups into the host world and its game data.

use crate::math::Vec3;
use std::fmt::Debug;
use std::hash::Hash;

/// Raw sound record as stored in the game data.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRecord {
    pub id: String,
    /// File name relative to the `sound/` directory
    pub sound: String,
    /// Linear volume byte, 255 = full volume
    pub volume: u8,
    pub min_range: u8,
    pub max_range: u8,
}

impl SoundRecord {
    pub fn new(id: impl Into<String>, sound: impl Into<String>, volume: u8) -> Self {
        Self {
            id: id.into(),
            sound: sound.into(),
            volume,
            min_range: 0,
            max_range: 0,
        }
    }

    pub fn with_range(mut self, min_range: u8, max_range: u8) -> Self {
        self.min_range = min_range;
        self.max_range = max_range;
        self
    }
}

/// One entry of a region's ambient sound list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSound {
    pub sound: String,
    /// Relative weight of this entry in the region's draw
    pub chance: u8,
}

impl RegionSound {
    pub fn new(sound: impl Into<String>, chance: u8) -> Self {
        Self {
            sound: sound.into(),
            chance,
        }
    }
}

/// Static game-data tables.
pub trait GameData {
    /// Game-balance float such as `fAudioDefaultMinDistance`.
    fn float_setting(&self, name: &str) -> Option<f32>;

    /// The complete sound catalog.
    fn sound_records(&self) -> Vec<SoundRecord>;

    /// Weighted ambient sounds of a region, `None` for unknown regions.
    fn region_sounds(&self, region: &str) -> Option<Vec<RegionSound>>;
}

/// Entity and cell queries, plus the game data behind them.
pub trait SoundWorld: GameData {
    type Entity: Copy + Eq + Hash + Debug;
    type Cell: PartialEq + Debug;

    /// False while no game is loaded; the frame update is skipped then.
    fn is_game_running(&self) -> bool;

    fn player(&self) -> Self::Entity;

    /// Current position, `None` once the entity no longer exists.
    fn position(&self, entity: Self::Entity) -> Option<Vec3>;

    fn cell(&self, entity: Self::Entity) -> Option<Self::Cell>;

    /// Water surface height, `None` when the cell has no water.
    fn water_level(&self, cell: &Self::Cell) -> Option<f32>;

    fn is_exterior(&self, cell: &Self::Cell) -> bool;

    fn region(&self, cell: &Self::Cell) -> Option<String>;
}

/// True when `position` is below the water surface of the player's cell.
pub fn is_underwater<W: SoundWorld>(world: &W, position: Vec3) -> bool {
    world
        .cell(world.player())
        .and_then(|cell| world.water_level(&cell))
        .is_some_and(|level| position.z < level)
}
