//! Bounded cache of backend sound buffers.
//!
//! One slot per sound definition (same index). A slot holds the backend
//! handle while the buffer is resident and counts the live instances playing
//! it. Slots with no references sit in the unused list, newest at the front;
//! eviction pops from the back.

use crate::error::Result;
use crate::output::SoundOutput;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct BufferSlot<B> {
    handle: Option<B>,
    references: u32,
    /// Size reported by the backend when the buffer was loaded
    size: usize,
}

impl<B> Default for BufferSlot<B> {
    fn default() -> Self {
        Self {
            handle: None,
            references: 0,
            size: 0,
        }
    }
}

#[derive(Debug)]
pub struct BufferCache<B> {
    slots: Vec<BufferSlot<B>>,
    unused: VecDeque<usize>,
    total_size: usize,
    max_size: usize,
}

impl<B: Copy + Eq + std::fmt::Debug> BufferCache<B> {
    pub fn new(max_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            unused: VecDeque::new(),
            total_size: 0,
            max_size,
        }
    }

    /// Grows the slot list to match the definition table.
    pub fn resize(&mut self, len: usize) {
        if len > self.slots.len() {
            self.slots.resize_with(len, BufferSlot::default);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Replaces the byte ceiling and evicts idle buffers down to it.
    pub fn set_max_size<O>(&mut self, output: &mut O, max_size: usize)
    where
        O: SoundOutput<Buffer = B>,
    {
        self.max_size = max_size;
        self.evict_over_budget(output);
    }

    pub fn handle(&self, index: usize) -> Option<B> {
        self.slots.get(index).and_then(|slot| slot.handle)
    }

    pub fn references(&self, index: usize) -> u32 {
        self.slots.get(index).map_or(0, |slot| slot.references)
    }

    /// Eviction candidates, front (most recently unused) to back.
    pub fn unused(&self) -> impl Iterator<Item = usize> + '_ {
        self.unused.iter().copied()
    }

    /// Returns the resident handle for `index`, loading `path` first if needed.
    ///
    /// A fresh load may push the cache past its ceiling; idle buffers are then
    /// evicted oldest first. The just-loaded buffer joins the unused list only
    /// after that pass, so it can't evict itself. Callers take a reference with
    /// [`BufferCache::add_ref`] once an instance is playing.
    pub fn acquire<O>(&mut self, output: &mut O, index: usize, path: &str) -> Result<B>
    where
        O: SoundOutput<Buffer = B>,
    {
        self.resize(index + 1);
        if let Some(handle) = self.slots[index].handle {
            return Ok(handle);
        }

        let handle = output.load_sound(path)?;
        let size = output.sound_data_size(handle);
        self.slots[index].handle = Some(handle);
        self.slots[index].size = size;
        self.total_size += size;
        log::debug!("Loaded {} ({} bytes, cache at {})", path, size, self.total_size);

        self.evict_over_budget(output);
        self.unused.push_front(index);
        Ok(handle)
    }

    fn evict_over_budget<O>(&mut self, output: &mut O)
    where
        O: SoundOutput<Buffer = B>,
    {
        while self.total_size > self.max_size {
            let Some(victim) = self.unused.pop_back() else {
                log::warn!(
                    "No unused sound buffers to free, using {} bytes!",
                    self.total_size
                );
                break;
            };

            let slot = &mut self.slots[victim];
            if let Some(handle) = slot.handle.take() {
                output.unload_sound(handle);
                self.total_size = self.total_size.saturating_sub(slot.size);
                log::trace!("Evicted buffer {} ({} bytes)", victim, slot.size);
            }
            slot.size = 0;
        }
    }

    /// Counts one more instance of `index`; the first one takes the buffer
    /// off the unused list.
    pub fn add_ref(&mut self, index: usize) {
        self.resize(index + 1);
        let slot = &mut self.slots[index];
        slot.references += 1;
        if slot.references == 1 {
            self.unused.retain(|&unused| unused != index);
        }
    }

    /// Drops one instance of `index`; the last one queues the buffer for eviction.
    pub fn release(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        match slot.references {
            0 => log::warn!("Released sound buffer {} with no references", index),
            1 => {
                slot.references = 0;
                self.unused.push_front(index);
            }
            _ => slot.references -= 1,
        }
    }

    /// Unloads every resident buffer and forgets all references.
    pub fn unload_all<O>(&mut self, output: &mut O)
    where
        O: SoundOutput<Buffer = B>,
    {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                output.unload_sound(handle);
            }
            slot.size = 0;
            slot.references = 0;
        }
        self.unused.clear();
        self.total_size = 0;
    }
}
