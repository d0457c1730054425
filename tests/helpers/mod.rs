//! Test helpers and fixtures for adagio integration tests
//!
//! Everything here renders offline: tracks come from memory or temporary WAV
//! files and output lands in a [`MemorySink`], so no audio hardware is touched.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `OVERLAP_SAMPLES` (256): Steady-state duration error of one synthesis hop
//! - `EDGE_SAMPLES` (1024): Whole-stream duration error including start/end edges
//! - `FREQUENCY_TOLERANCE_HZ` (50): Zero-crossing frequency estimates

#![allow(dead_code)]

pub mod tolerances;

use adagio::prelude::*;
use std::path::{Path, PathBuf};

/// Default test sample rate (CD audio)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Generate a mono sine at half scale.
pub fn generate_sine(frequency: f64, sample_rate: u32, seconds: f64) -> Vec<i16> {
    adagio::dsp::signal::sine_tone(frequency, sample_rate, seconds, 0.5, 1)
}

/// Generate an interleaved stereo sine at half scale.
pub fn generate_stereo_sine(frequency: f64, sample_rate: u32, seconds: f64) -> Vec<i16> {
    adagio::dsp::signal::sine_tone(frequency, sample_rate, seconds, 0.5, 2)
}

/// Generate a reproducible integer ramp that wraps inside the 16-bit range.
pub fn generate_ramp(num_samples: usize) -> Vec<i16> {
    (0..num_samples)
        .map(|i| ((i * 37) % 20_000) as i16 - 10_000)
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Estimate the dominant frequency by counting rising zero crossings.
pub fn zero_crossing_frequency(samples: &[i16], sample_rate: u32) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let rising = samples
        .windows(2)
        .filter(|w| w[0] < 0 && w[1] >= 0)
        .count();
    rising as f64 * sample_rate as f64 / samples.len() as f64
}

/// Middle `fraction` of a signal, away from start and end transients.
pub fn middle(samples: &[i16], fraction: f64) -> &[i16] {
    let keep = (samples.len() as f64 * fraction) as usize;
    let start = (samples.len() - keep) / 2;
    &samples[start..start + keep]
}

/// Write a 16-bit WAV file into `dir`.
pub fn write_wav(dir: &Path, name: &str, samples: &[i16], format: TrackFormat) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("Failed to create WAV");
    for &s in samples {
        writer.write_sample(s).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
    path
}

/// Loader serving in-memory tracks. Tracks are addressed by their title,
/// which must be the index into `tracks`.
pub fn memory_loader(
    tracks: Vec<(Vec<i16>, TrackFormat)>,
) -> impl FnMut(&Track) -> adagio::player::Result<Box<dyn SampleSource>> {
    move |track: &Track| {
        let index: usize = track.title.parse().map_err(|_| {
            adagio::player::Error::InvalidConfig(format!("unknown track {}", track.title))
        })?;
        let (samples, format) = tracks.get(index).cloned().ok_or(
            adagio::player::Error::TrackIndex {
                index,
                len: tracks.len(),
            },
        )?;
        Ok(Box::new(MemorySource::new(samples, format)) as Box<dyn SampleSource>)
    }
}

/// Playlist of `n` tracks titled "0".."n-1", to pair with [`memory_loader`].
pub fn indexed_playlist(n: usize) -> Playlist {
    Playlist::from_paths((0..n).map(|i| i.to_string())).expect("Failed to build playlist")
}

/// Play in-memory tracks to completion and return the sink.
pub fn render(config: PlayerConfig, tracks: Vec<(Vec<i16>, TrackFormat)>) -> MemorySink {
    render_into(config, tracks, MemorySink::new())
}

/// Play in-memory tracks to completion into a prepared sink.
pub fn render_into(
    config: PlayerConfig,
    tracks: Vec<(Vec<i16>, TrackFormat)>,
    sink: MemorySink,
) -> MemorySink {
    let n = tracks.len();
    let mut player = Player::new(config, indexed_playlist(n), memory_loader(tracks), sink)
        .expect("Failed to create player");
    player.run().expect("Playback failed");
    player.into_sink()
}

/// Time-stretch a whole signal the way the player feeds it: fixed-size
/// blocks, then a flush.
pub fn stretch_in_blocks(samples: &[i16], speed: f64, block: usize) -> Vec<i16> {
    let mut wsola = WsolaProcessor::new(
        WsolaConfig::default(),
        TrackFormat::mono(TEST_SAMPLE_RATE),
        speed,
    )
    .expect("Failed to create processor");
    let mut out = Vec::new();
    for chunk in samples.chunks(block) {
        wsola.process(chunk, &mut out);
    }
    wsola.flush(&mut out);
    out
}
