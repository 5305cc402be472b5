//! Prints the lip-sync loudness curve of a voice file.
//!
//! Usage: `loudness_probe <data-dir> <voice-file> [samples-per-second]`
//!
//! `voice-file` is relative to the `sound/` directory, as passed to `say`.

use anyhow::{Context, bail};
use soundscape::audio_data::SoundDecoder;
use soundscape::loudness::{LOUDNESS_SAMPLES_PER_SECOND, LoudnessCurve};
use soundscape::resources::{FileIndex, SoundResources};
use soundscape::voice::voice_path;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(data_dir), Some(file)) = (args.next(), args.next()) else {
        bail!("usage: loudness_probe <data-dir> <voice-file> [samples-per-second]");
    };
    let samples_per_second = match args.next() {
        Some(value) => value
            .parse::<f32>()
            .with_context(|| format!("invalid samples-per-second: {}", value))?,
        None => LOUDNESS_SAMPLES_PER_SECOND,
    };

    let index = FileIndex::scan(&data_dir)
        .with_context(|| format!("failed to index {}", data_dir))?;
    let path = voice_path(&file);
    if !index.exists(&path) {
        bail!("{} not found under {}", path, data_dir);
    }

    let mut decoder = index.decoder();
    decoder
        .open(&path)
        .with_context(|| format!("failed to open {}", path))?;
    let info = decoder.info()?;
    let data = decoder.read_all()?;
    let curve = LoudnessCurve::analyze(&data, &info, samples_per_second);

    println!(
        "{}: {} Hz, {}, {} windows at {}/s",
        path,
        info.sample_rate,
        info.channels,
        curve.samples().len(),
        curve.samples_per_second()
    );
    for (i, value) in curve.samples().iter().enumerate() {
        let bar = "#".repeat((value * 60.0).round() as usize);
        println!("{:8.2}s {:.4} {}", i as f32 / samples_per_second, value, bar);
    }
    Ok(())
}
