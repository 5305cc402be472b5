//! Decoded audio access.
//!
//! [`SoundDecoder`] is the pull interface the manager uses for streamed music,
//! speech and loudness analysis. [`SymphoniaDecoder`] is the bundled
//! implementation.

mod symphonia_decoder;

use crate::error::{Result, SoundError};
use std::fmt;

pub use symphonia_decoder::SymphoniaDecoder;

/// Channel layout of decoded PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelConfig {
    Mono,
    Stereo,
    Quad,
    Surround51,
    Surround71,
}

impl ChannelConfig {
    pub fn channel_count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Quad => 4,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
        }
    }

    pub fn from_channel_count(count: usize) -> Result<Self> {
        match count {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            4 => Ok(Self::Quad),
            6 => Ok(Self::Surround51),
            8 => Ok(Self::Surround71),
            _ => Err(SoundError::Format(format!(
                "Unsupported channel count: {}",
                count
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mono => "Mono",
            Self::Stereo => "Stereo",
            Self::Quad => "Quad",
            Self::Surround51 => "5.1 Surround",
            Self::Surround71 => "7.1 Surround",
        }
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample encoding of decoded PCM. Multi-byte types are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    UInt8,
    Int16,
    Float32,
}

impl SampleType {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "U8",
            Self::Int16 => "S16",
            Self::Float32 => "Float32",
        }
    }

    /// Reads the sample starting at `bytes[0]` as a value in `[-1, 1]`.
    ///
    /// Returns 0 when `bytes` is too short.
    pub fn read_normalized(self, bytes: &[u8]) -> f32 {
        match self {
            Self::UInt8 => bytes
                .first()
                .map(|&b| (b as f32 - 128.0) / 128.0)
                .unwrap_or(0.0),
            Self::Int16 => match bytes {
                [lo, hi, ..] => i16::from_le_bytes([*lo, *hi]) as f32 / 32768.0,
                _ => 0.0,
            },
            Self::Float32 => match bytes {
                [a, b, c, d, ..] => f32::from_le_bytes([*a, *b, *c, *d]),
                _ => 0.0,
            },
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stream description reported by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: ChannelConfig,
    pub sample_type: SampleType,
}

impl AudioInfo {
    pub fn frame_size(&self) -> usize {
        frames_to_bytes(1, self.channels, self.sample_type)
    }
}

pub fn frames_to_bytes(frames: usize, channels: ChannelConfig, sample_type: SampleType) -> usize {
    frames * channels.channel_count() * sample_type.bytes_per_sample()
}

pub fn bytes_to_frames(bytes: usize, channels: ChannelConfig, sample_type: SampleType) -> usize {
    bytes / frames_to_bytes(1, channels, sample_type)
}

/// Pull interface over a decoded audio stream.
pub trait SoundDecoder {
    /// Opens `path`. Fails with [`SoundError::Decode`] or [`SoundError::Io`]
    /// when the resource is absent or unreadable.
    fn open(&mut self, path: &str) -> Result<()>;

    fn close(&mut self);

    fn info(&self) -> Result<AudioInfo>;

    /// Fills `buffer` with the next bytes of PCM and returns how many were
    /// written. Zero means end of stream.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn rewind(&mut self) -> Result<()>;

    /// Reads the rest of the stream, growing the output geometrically.
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut output = vec![0u8; 32768];
        let mut total = 0;
        loop {
            let got = self.read(&mut output[total..])?;
            if got == 0 {
                break;
            }
            total += got;
            if total == output.len() {
                output.resize(total * 2, 0);
            }
        }
        output.truncate(total);
        Ok(output)
    }
}
