//! Time-stretch integration tests
//!
//! Duration, pitch and continuity of WSOLA output, both driven directly and
//! through the playback loop.
//!
//! Run with:
//! ```bash
//! cargo test -p adagio --test time_stretch_tests
//! ```

#[path = "helpers/mod.rs"]
mod helpers;

use adagio::prelude::*;
use helpers::tolerances::*;
use helpers::{
    generate_ramp, generate_sine, generate_stereo_sine, indexed_playlist, memory_loader, middle,
    render, stretch_in_blocks, write_wav, zero_crossing_frequency, TEST_SAMPLE_RATE,
};

// =============================================================================
// Duration
// =============================================================================

/// Speed 1.0 through the whole pipeline reproduces the input exactly.
#[test]
fn test_normal_speed_is_identity() {
    let input = generate_ramp(50_000);
    let format = TrackFormat::mono(TEST_SAMPLE_RATE);

    let sink = render(PlayerConfig::default(), vec![(input.clone(), format)]);
    assert_eq!(sink.samples(), input.as_slice());
}

/// Adding input adds input/speed output, within one synthesis hop.
#[test]
fn test_steady_state_duration() {
    let short = generate_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let long = generate_sine(440.0, TEST_SAMPLE_RATE, 2.0);
    let added = (long.len() - short.len()) as f64;

    for speed in [0.5, 1.5, 2.0] {
        let a = stretch_in_blocks(&short, speed, 4096).len() as f64;
        let b = stretch_in_blocks(&long, speed, 4096).len() as f64;
        let expected = added / speed;
        assert!(
            ((b - a) - expected).abs() <= OVERLAP_SAMPLES as f64,
            "speed {speed}: grew by {} samples, expected {expected}",
            b - a
        );
    }
}

/// Whole-stream length stays within the edge tolerance of input/speed.
#[test]
fn test_whole_stream_duration() {
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 2.0);
    for speed in [0.5, 1.0, 1.5, 2.0] {
        let out = stretch_in_blocks(&input, speed, 4096);
        let expected = input.len() as f64 / speed;
        assert!(
            (out.len() as f64 - expected).abs() <= EDGE_SAMPLES as f64,
            "speed {speed}: {} samples, expected about {expected}",
            out.len()
        );
    }
}

/// Doubling then halving the speed comes back to the original length.
#[test]
fn test_round_trip_restores_length() {
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let fast = stretch_in_blocks(&input, 2.0, 4096);
    let restored = stretch_in_blocks(&fast, 0.5, 4096);

    let diff = (restored.len() as i64 - input.len() as i64).unsigned_abs() as usize;
    assert!(
        diff <= 2 * OVERLAP_SAMPLES,
        "round trip length {} vs {}",
        restored.len(),
        input.len()
    );
}

/// Block size does not change how much comes out.
#[test]
fn test_block_size_independence() {
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let big = stretch_in_blocks(&input, 1.5, 8192);
    let small = stretch_in_blocks(&input, 1.5, 300);
    assert_eq!(big.len(), small.len());
}

/// Noise has no periodicity to lock onto; the stream length still follows
/// the speed.
#[test]
fn test_noise_duration() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(42);
    let input: Vec<i16> = (0..88_200).map(|_| rng.gen_range(-8000..=8000)).collect();
    for speed in [0.5, 2.0] {
        let out = stretch_in_blocks(&input, speed, 1024);
        approx::assert_abs_diff_eq!(
            out.len() as f64 * speed / input.len() as f64,
            1.0,
            epsilon = 0.03
        );
    }
}

// =============================================================================
// Pitch
// =============================================================================

/// 1 kHz at half speed lasts twice as long and is still 1 kHz.
#[test]
fn test_half_speed_preserves_pitch() {
    let dir = tempfile::tempdir().unwrap();
    let input = generate_sine(1000.0, TEST_SAMPLE_RATE, 1.0);
    let format = TrackFormat::mono(TEST_SAMPLE_RATE);
    let path = write_wav(dir.path(), "1khz.wav", &input, format);

    let config = PlayerConfig::default().with_speed(PlaybackSpeed::Half);
    let playlist = Playlist::new(vec![Track::new(&path)]).unwrap();
    let mut player = Player::new(config, playlist, WavLoader, MemorySink::new()).unwrap();
    player.run().unwrap();
    let output = player.into_sink().into_samples();

    let ratio = output.len() as f64 / input.len() as f64;
    assert!((1.9..=2.1).contains(&ratio), "length ratio {ratio}");

    let freq = zero_crossing_frequency(middle(&output, 0.8), TEST_SAMPLE_RATE);
    assert!(
        (freq - 1000.0).abs() <= FREQUENCY_TOLERANCE_HZ,
        "dominant frequency {freq} Hz"
    );
}

/// Stereo has no time stretch; speed change falls back to resampling and
/// pitch follows speed.
#[test]
fn test_stereo_falls_back_to_resampler() {
    let input = generate_stereo_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let format = TrackFormat::stereo(TEST_SAMPLE_RATE);
    let config = PlayerConfig::default().with_speed(PlaybackSpeed::Double);

    let sink = render(config, vec![(input.clone(), format)]);
    let frames = sink.samples().len() / 2;
    assert!(
        (frames as i64 - 22_050).abs() <= 4,
        "{frames} frames at double speed"
    );

    let left: Vec<i16> = sink.samples().iter().step_by(2).copied().collect();
    let freq = zero_crossing_frequency(middle(&left, 0.8), TEST_SAMPLE_RATE);
    assert!((freq - 880.0).abs() <= FREQUENCY_TOLERANCE_HZ, "{freq} Hz");
}

/// Stereo resampling in and out of 1.0x neither drops nor replays frames.
#[test]
fn test_stereo_speed_changes_keep_order() {
    let input: Vec<i16> = (0..300)
        .flat_map(|i| [(10 * i) as i16, -(10 * i) as i16])
        .collect();
    let config = PlayerConfig::default()
        .with_block_frames(100)
        .with_speed(PlaybackSpeed::Half);
    let mut player = Player::new(
        config,
        indexed_playlist(1),
        memory_loader(vec![(input, TrackFormat::stereo(TEST_SAMPLE_RATE))]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    player.step().unwrap();
    controller.speed(PlaybackSpeed::Normal);
    player.step().unwrap();
    controller.speed(PlaybackSpeed::Half);
    player.run().unwrap();

    let left: Vec<i16> = player.sink().samples().iter().step_by(2).copied().collect();
    assert!(
        left.windows(2).all(|w| w[1] >= w[0]),
        "output went backwards"
    );
    assert!(left.contains(&990));
    assert_eq!(left.last(), Some(&2990));
    // 100 frames at 0.5x, 100 at 1.0x, 100 at 0.5x
    assert_eq!(left.len(), 500);
}

// =============================================================================
// Pipeline
// =============================================================================

/// The player's stretched output matches the processor fed the same blocks,
/// even when the sink underruns and accepts partial writes.
#[test]
fn test_player_output_matches_processor_under_underruns() {
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let expected = stretch_in_blocks(&input, 0.5, 4096);

    let sink = MemorySink::new()
        .with_max_frames_per_write(1500)
        .with_underrun_at(0)
        .with_underrun_at(2)
        .with_would_block_at(7);
    let config = PlayerConfig::default()
        .with_speed(PlaybackSpeed::Half)
        .with_block_frames(4096);
    let mut player = Player::new(
        config,
        indexed_playlist(1),
        memory_loader(vec![(input, TrackFormat::mono(TEST_SAMPLE_RATE))]),
        sink,
    )
    .unwrap();
    player.run().unwrap();

    let metrics = player.metrics();
    assert_eq!(metrics.underruns, 3);
    assert_eq!(metrics.frames_written as usize, expected.len());

    let sink = player.into_sink();
    assert_eq!(sink.recoveries(), 3);
    assert_eq!(sink.samples(), expected.as_slice());
}

/// Changing speed mid-track keeps playing without losing the stream.
#[test]
fn test_speed_change_mid_track() {
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 2.0);
    let mut player = Player::new(
        PlayerConfig::default(),
        indexed_playlist(1),
        memory_loader(vec![(input.clone(), TrackFormat::mono(TEST_SAMPLE_RATE))]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    for _ in 0..3 {
        player.step().unwrap();
    }
    controller.speed(PlaybackSpeed::Double);
    player.run().unwrap();

    let len = player.sink().samples().len();
    assert!(
        len > input.len() / 2 && len < input.len(),
        "{len} samples after switching to double speed"
    );
}
