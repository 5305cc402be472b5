use crate::{
    audio_data::{AudioInfo, ChannelConfig, SampleType, SoundDecoder},
    error::{Result, SoundError},
    resources::normalize_path,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Decoder backed by Symphonia (WAV, MP3, FLAC, OGG, ...).
///
/// The whole track is decoded on [`SoundDecoder::open`] and served as
/// interleaved little-endian `f32` PCM.
pub struct SymphoniaDecoder {
    files: Arc<BTreeMap<String, PathBuf>>,
    opened: Option<OpenTrack>,
}

struct OpenTrack {
    name: String,
    info: AudioInfo,
    data: Vec<u8>,
    cursor: usize,
}

impl SymphoniaDecoder {
    /// Decoder resolving resource names through a prebuilt index.
    pub fn new(files: Arc<BTreeMap<String, PathBuf>>) -> Self {
        Self {
            files,
            opened: None,
        }
    }

    /// Decoder that treats resource names as filesystem paths.
    pub fn standalone() -> Self {
        Self::new(Arc::new(BTreeMap::new()))
    }

    pub fn name(&self) -> Option<&str> {
        self.opened.as_ref().map(|track| track.name.as_str())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .unwrap_or_else(|| PathBuf::from(path))
    }

    fn opened_mut(&mut self) -> Result<&mut OpenTrack> {
        self.opened
            .as_mut()
            .ok_or_else(|| SoundError::Decode("No file opened".to_string()))
    }
}

impl SoundDecoder for SymphoniaDecoder {
    fn open(&mut self, path: &str) -> Result<()> {
        self.close();

        let file_path = self.resolve(path);
        let (samples, sample_rate, channels) = decode_file(&file_path)?;

        let mut data = Vec::with_capacity(samples.len() * 4);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }

        log::debug!(
            "Opened {} ({} Hz, {}, {} bytes)",
            path,
            sample_rate,
            channels,
            data.len()
        );

        self.opened = Some(OpenTrack {
            name: path.to_string(),
            info: AudioInfo {
                sample_rate,
                channels,
                sample_type: SampleType::Float32,
            },
            data,
            cursor: 0,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.opened = None;
    }

    fn info(&self) -> Result<AudioInfo> {
        self.opened
            .as_ref()
            .map(|track| track.info)
            .ok_or_else(|| SoundError::Decode("No file opened".to_string()))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let track = self.opened_mut()?;
        let remaining = &track.data[track.cursor..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        track.cursor += count;
        Ok(count)
    }

    fn rewind(&mut self) -> Result<()> {
        self.opened_mut()?.cursor = 0;
        Ok(())
    }
}

fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, ChannelConfig)> {
    let file = File::open(path)?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SoundError::Decode(format!("Failed to probe audio format: {:?}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| SoundError::Decode("No default audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SoundError::Decode("Sample rate not found".to_string()))?;

    let channel_count = track
        .codec_params
        .channels
        .ok_or_else(|| SoundError::Decode("Channel count not found".to_string()))?
        .count();
    let channels = ChannelConfig::from_channel_count(channel_count)?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SoundError::Decode(format!("Failed to create decoder: {:?}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break, // end-of-file
            Err(e) => {
                return Err(SoundError::Decode(format!("Error reading packet: {:?}", e)));
            }
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(_)) => continue, // recoverable corruption
            Err(e) => {
                return Err(SoundError::Decode(format!("Error decoding packet: {:?}", e)));
            }
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity();

        let mut tmp = SampleBuffer::<f32>::new(capacity as u64, spec);
        tmp.copy_interleaved_ref(decoded);

        samples.extend_from_slice(tmp.samples());
    }

    Ok((samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        let mut decoder = SymphoniaDecoder::standalone();
        assert!(decoder.open("does/not/exist.wav").is_err());
        assert!(decoder.info().is_err());
        assert!(decoder.name().is_none());
    }

    #[test]
    fn test_read_before_open_fails() {
        let mut decoder = SymphoniaDecoder::standalone();
        let mut buffer = [0u8; 16];
        assert!(decoder.read(&mut buffer).is_err());
        assert!(decoder.rewind().is_err());
    }
}
