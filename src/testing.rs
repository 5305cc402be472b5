//! Test doubles for the backend, world and resources.

use crate::audio_data::{AudioInfo, ChannelConfig, SampleType, SoundDecoder};
use crate::error::{Result, SoundError};
use crate::math::{Listener, Vec3};
use crate::output::{Environment, SoundInstance, SoundOutput, SoundParams, SoundTypes};
use crate::resources::{SoundResources, normalize_path};
use crate::world::{GameData, RegionSound, SoundRecord, SoundWorld};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default)]
struct InstanceState {
    playing: bool,
    stops: u32,
    updates: Vec<SoundParams>,
    time_offset: f32,
}

/// Shared handle; clones observe the same instance.
#[derive(Debug, Clone, Default)]
pub struct MockInstance {
    state: Rc<RefCell<InstanceState>>,
}

impl MockInstance {
    pub fn playing() -> Self {
        let instance = Self::default();
        instance.state.borrow_mut().playing = true;
        instance
    }

    /// Ends playback the way a finished clip would.
    pub fn finish(&self) {
        self.state.borrow_mut().playing = false;
    }

    pub fn set_time_offset(&self, seconds: f32) {
        self.state.borrow_mut().time_offset = seconds;
    }

    pub fn last_params(&self) -> Option<SoundParams> {
        self.state.borrow().updates.last().copied()
    }

    pub fn update_count(&self) -> usize {
        self.state.borrow().updates.len()
    }

    pub fn stop_count(&self) -> u32 {
        self.state.borrow().stops
    }
}

impl SoundInstance for MockInstance {
    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.stops += 1;
    }

    fn update(&mut self, params: &SoundParams) {
        self.state.borrow_mut().updates.push(*params);
    }

    fn time_offset(&self) -> f32 {
        self.state.borrow().time_offset
    }
}

/// One instance creation seen by the mock output.
#[derive(Debug, Clone)]
pub struct PlayRecord {
    /// Buffer path, or `None` for streams
    pub path: Option<String>,
    pub spatial: bool,
    pub params: SoundParams,
    pub stream_info: Option<AudioInfo>,
    pub instance: MockInstance,
}

#[derive(Debug, Default)]
struct OutputState {
    devices: Vec<String>,
    broken_devices: HashSet<String>,
    default_broken: bool,
    initialized: bool,
    init_calls: Vec<Option<String>>,
    sizes: HashMap<String, usize>,
    failing_loads: HashSet<String>,
    fail_play: bool,
    buffers: HashMap<u32, String>,
    next_buffer: u32,
    loads: Vec<String>,
    unloads: Vec<String>,
    plays: Vec<PlayRecord>,
    batch_depth: i32,
    batches: usize,
    listener_updates: Vec<(Listener, Environment, bool)>,
    paused: SoundTypes,
    resumed: Vec<SoundTypes>,
}

#[derive(Debug, Clone, Default)]
pub struct MockOutput {
    state: Rc<RefCell<OutputState>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: &[&str]) -> Self {
        let output = Self::new();
        output.state.borrow_mut().devices = devices.iter().map(|d| d.to_string()).collect();
        output
    }

    pub fn break_device(&self, name: &str) {
        self.state.borrow_mut().broken_devices.insert(name.to_string());
    }

    pub fn break_default_device(&self) {
        self.state.borrow_mut().default_broken = true;
    }

    pub fn init_calls(&self) -> Vec<Option<String>> {
        self.state.borrow().init_calls.clone()
    }

    pub fn set_size(&self, path: &str, size: usize) {
        self.state.borrow_mut().sizes.insert(path.to_string(), size);
    }

    pub fn fail_load(&self, path: &str) {
        self.state.borrow_mut().failing_loads.insert(path.to_string());
    }

    pub fn fail_play(&self, fail: bool) {
        self.state.borrow_mut().fail_play = fail;
    }

    pub fn load_count(&self, path: &str) -> usize {
        self.state.borrow().loads.iter().filter(|p| *p == path).count()
    }

    pub fn unload_count(&self, path: &str) -> usize {
        self.state.borrow().unloads.iter().filter(|p| *p == path).count()
    }

    pub fn plays(&self) -> Vec<PlayRecord> {
        self.state.borrow().plays.clone()
    }

    pub fn last_play(&self) -> Option<PlayRecord> {
        self.state.borrow().plays.last().cloned()
    }

    pub fn batches(&self) -> usize {
        self.state.borrow().batches
    }

    pub fn batch_depth(&self) -> i32 {
        self.state.borrow().batch_depth
    }

    pub fn listener_updates(&self) -> Vec<(Listener, Environment, bool)> {
        self.state.borrow().listener_updates.clone()
    }

    pub fn paused(&self) -> SoundTypes {
        self.state.borrow().paused
    }

    pub fn resumed(&self) -> Vec<SoundTypes> {
        self.state.borrow().resumed.clone()
    }

    fn record_play(
        &mut self,
        path: Option<String>,
        spatial: bool,
        params: &SoundParams,
        stream_info: Option<AudioInfo>,
    ) -> Result<MockInstance> {
        let mut state = self.state.borrow_mut();
        if state.fail_play {
            return Err(SoundError::Backend("play refused".to_string()));
        }
        let instance = MockInstance::playing();
        state.plays.push(PlayRecord {
            path,
            spatial,
            params: *params,
            stream_info,
            instance: instance.clone(),
        });
        Ok(instance)
    }
}

impl SoundOutput for MockOutput {
    type Buffer = u32;
    type Instance = MockInstance;

    fn enumerate(&self) -> Vec<String> {
        self.state.borrow().devices.clone()
    }

    fn init(&mut self, device: Option<&str>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.init_calls.push(device.map(str::to_string));
        let broken = match device {
            Some(name) => state.broken_devices.contains(name),
            None => state.default_broken,
        };
        if broken {
            return Err(SoundError::DeviceInit(format!("cannot open {:?}", device)));
        }
        state.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    fn load_sound(&mut self, path: &str) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        if state.failing_loads.contains(path) {
            return Err(SoundError::Decode(format!("cannot decode {}", path)));
        }
        let id = state.next_buffer;
        state.next_buffer += 1;
        state.buffers.insert(id, path.to_string());
        state.loads.push(path.to_string());
        Ok(id)
    }

    fn unload_sound(&mut self, buffer: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(path) = state.buffers.remove(&buffer) {
            state.unloads.push(path);
        }
    }

    fn sound_data_size(&self, buffer: u32) -> usize {
        let state = self.state.borrow();
        state
            .buffers
            .get(&buffer)
            .and_then(|path| state.sizes.get(path))
            .copied()
            .unwrap_or(1024)
    }

    fn play_sound(&mut self, buffer: u32, params: &SoundParams, _offset: f32) -> Result<MockInstance> {
        let path = self.state.borrow().buffers.get(&buffer).cloned();
        self.record_play(path, false, params, None)
    }

    fn play_sound_3d(&mut self, buffer: u32, params: &SoundParams, _offset: f32) -> Result<MockInstance> {
        let path = self.state.borrow().buffers.get(&buffer).cloned();
        self.record_play(path, true, params, None)
    }

    fn stream_sound<D: SoundDecoder + 'static>(&mut self, decoder: D, params: &SoundParams) -> Result<MockInstance> {
        let info = decoder.info().ok();
        self.record_play(None, false, params, info)
    }

    fn stream_sound_3d<D: SoundDecoder + 'static>(&mut self, decoder: D, params: &SoundParams) -> Result<MockInstance> {
        let info = decoder.info().ok();
        self.record_play(None, true, params, info)
    }

    fn pause_sounds(&mut self, types: SoundTypes) {
        self.state.borrow_mut().paused |= types;
    }

    fn resume_sounds(&mut self, types: SoundTypes) {
        let mut state = self.state.borrow_mut();
        state.paused -= types;
        state.resumed.push(types);
    }

    fn start_update(&mut self) {
        let mut state = self.state.borrow_mut();
        state.batch_depth += 1;
        state.batches += 1;
    }

    fn finish_update(&mut self) {
        self.state.borrow_mut().batch_depth -= 1;
    }

    fn update_listener(&mut self, listener: &Listener, env: Environment) {
        let mut state = self.state.borrow_mut();
        let in_batch = state.batch_depth > 0;
        state.listener_updates.push((*listener, env, in_batch));
    }
}

#[derive(Debug, Clone)]
pub struct MockClip {
    pub info: AudioInfo,
    pub data: Vec<u8>,
}

impl MockClip {
    /// Mono 16-bit silence.
    pub fn silence(sample_rate: u32, seconds: f32) -> Self {
        let frames = (sample_rate as f32 * seconds) as usize;
        Self {
            info: AudioInfo {
                sample_rate,
                channels: ChannelConfig::Mono,
                sample_type: SampleType::Int16,
            },
            data: vec![0; frames * 2],
        }
    }

    /// Mono float clip at a constant amplitude.
    pub fn constant(sample_rate: u32, seconds: f32, amplitude: f32) -> Self {
        let frames = (sample_rate as f32 * seconds) as usize;
        Self {
            info: AudioInfo {
                sample_rate,
                channels: ChannelConfig::Mono,
                sample_type: SampleType::Float32,
            },
            data: (0..frames).flat_map(|_| amplitude.to_le_bytes()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockResources {
    files: Rc<RefCell<BTreeMap<String, MockClip>>>,
    opens: Rc<RefCell<Vec<String>>>,
}

impl MockResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, clip: MockClip) {
        self.files.borrow_mut().insert(normalize_path(name), clip);
    }

    /// Names passed to `open`, in order.
    pub fn opens(&self) -> Vec<String> {
        self.opens.borrow().clone()
    }
}

impl SoundResources for MockResources {
    type Decoder = MockDecoder;

    fn exists(&self, name: &str) -> bool {
        self.files.borrow().contains_key(&normalize_path(name))
    }

    fn list(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_path(prefix);
        self.files
            .borrow()
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn decoder(&self) -> MockDecoder {
        MockDecoder {
            files: self.files.clone(),
            opens: self.opens.clone(),
            opened: None,
            cursor: 0,
        }
    }
}

pub struct MockDecoder {
    files: Rc<RefCell<BTreeMap<String, MockClip>>>,
    opens: Rc<RefCell<Vec<String>>>,
    opened: Option<MockClip>,
    cursor: usize,
}

impl SoundDecoder for MockDecoder {
    fn open(&mut self, path: &str) -> Result<()> {
        self.opens.borrow_mut().push(path.to_string());
        let clip = self
            .files
            .borrow()
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| SoundError::Decode(format!("{} not found", path)))?;
        self.opened = Some(clip);
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = None;
    }

    fn info(&self) -> Result<AudioInfo> {
        self.opened
            .as_ref()
            .map(|clip| clip.info)
            .ok_or_else(|| SoundError::Decode("not open".to_string()))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let clip = self
            .opened
            .as_ref()
            .ok_or_else(|| SoundError::Decode("not open".to_string()))?;
        let remaining = &clip.data[self.cursor..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        self.cursor += count;
        Ok(count)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

pub const PLAYER: u32 = 0;
pub const EXTERIOR: u32 = 100;
pub const INTERIOR: u32 = 101;

#[derive(Debug)]
pub struct MockWorld {
    pub running: bool,
    pub entities: HashMap<u32, (Vec3, u32)>,
    pub water: HashMap<u32, f32>,
    pub exterior: HashSet<u32>,
    pub regions: HashMap<u32, String>,
    pub region_sounds: HashMap<String, Vec<RegionSound>>,
    pub settings: HashMap<String, f32>,
    pub records: Vec<SoundRecord>,
    pub catalog_reads: Cell<usize>,
}

impl MockWorld {
    /// Player at the origin of an exterior cell without water.
    pub fn new() -> Self {
        let mut world = Self {
            running: true,
            entities: HashMap::new(),
            water: HashMap::new(),
            exterior: HashSet::from([EXTERIOR]),
            regions: HashMap::new(),
            region_sounds: HashMap::new(),
            settings: HashMap::new(),
            records: Vec::new(),
            catalog_reads: Cell::new(0),
        };
        world.spawn(PLAYER, Vec3::ZERO, EXTERIOR);
        world
    }

    pub fn with_sounds(ids: &[&str]) -> Self {
        let mut world = Self::new();
        for id in ids {
            world.records.push(SoundRecord::new(*id, format!("{}.wav", id), 255));
        }
        world
    }

    pub fn spawn(&mut self, entity: u32, position: Vec3, cell: u32) {
        self.entities.insert(entity, (position, cell));
    }

    pub fn move_to(&mut self, entity: u32, position: Vec3) {
        if let Some(entry) = self.entities.get_mut(&entity) {
            entry.0 = position;
        }
    }

    pub fn despawn(&mut self, entity: u32) {
        self.entities.remove(&entity);
    }
}

impl GameData for MockWorld {
    fn float_setting(&self, name: &str) -> Option<f32> {
        self.settings.get(name).copied()
    }

    fn sound_records(&self) -> Vec<SoundRecord> {
        self.catalog_reads.set(self.catalog_reads.get() + 1);
        self.records.clone()
    }

    fn region_sounds(&self, region: &str) -> Option<Vec<RegionSound>> {
        self.region_sounds.get(region).cloned()
    }
}

impl SoundWorld for MockWorld {
    type Entity = u32;
    type Cell = u32;

    fn is_game_running(&self) -> bool {
        self.running
    }

    fn player(&self) -> u32 {
        PLAYER
    }

    fn position(&self, entity: u32) -> Option<Vec3> {
        self.entities.get(&entity).map(|(position, _)| *position)
    }

    fn cell(&self, entity: u32) -> Option<u32> {
        self.entities.get(&entity).map(|(_, cell)| *cell)
    }

    fn water_level(&self, cell: &u32) -> Option<f32> {
        self.water.get(cell).copied()
    }

    fn is_exterior(&self, cell: &u32) -> bool {
        self.exterior.contains(cell)
    }

    fn region(&self, cell: &u32) -> Option<String> {
        self.regions.get(cell).cloned()
    }
}
