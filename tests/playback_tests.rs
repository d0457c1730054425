//! Playback loop integration tests
//!
//! Playlist advance, track-change resets, pause, seek and sink failure
//! handling, all rendered into a memory sink.

#[path = "helpers/mod.rs"]
mod helpers;

use adagio::player::{Error as PlayerError, SinkError};
use adagio::prelude::*;
use helpers::{
    generate_ramp, generate_sine, generate_stereo_sine, indexed_playlist, memory_loader,
    write_wav, TEST_SAMPLE_RATE,
};

fn mono() -> TrackFormat {
    TrackFormat::mono(TEST_SAMPLE_RATE)
}

// =============================================================================
// Playlist
// =============================================================================

/// Tracks play back to back; the player stops after the last one.
#[test]
fn test_playlist_plays_through_and_stops() {
    let first = generate_ramp(10_000);
    let second = generate_ramp(6_000);
    let second_format = TrackFormat::stereo(22050);

    let mut player = Player::new(
        PlayerConfig::default(),
        indexed_playlist(2),
        memory_loader(vec![
            (first.clone(), mono()),
            (second.clone(), second_format),
        ]),
        MemorySink::new(),
    )
    .unwrap();
    player.run().unwrap();

    assert_eq!(player.state(), PlaybackState::Stopped);
    let metrics = player.metrics();
    assert_eq!(metrics.tracks_started, 2);
    assert_eq!(metrics.tracks_finished, 2);

    let sink = player.into_sink();
    assert_eq!(sink.configured_formats(), &[mono(), second_format]);
    assert!(sink.was_drained());

    let expected: Vec<i16> = first.into_iter().chain(second).collect();
    assert_eq!(sink.samples(), expected.as_slice());
}

/// Auto-advance reports the new track before its first block is read.
#[test]
fn test_step_reports_track_change() {
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(1000),
        indexed_playlist(2),
        memory_loader(vec![(generate_ramp(1000), mono()), (generate_ramp(1000), mono())]),
        MemorySink::new(),
    )
    .unwrap();
    player.play().unwrap();

    assert_eq!(player.step().unwrap(), StepOutcome::Played(1000));
    assert_eq!(player.step().unwrap(), StepOutcome::TrackChanged(1));
    assert_eq!(player.status().position_frames, 0);
    assert_eq!(player.step().unwrap(), StepOutcome::Played(1000));
    assert_eq!(player.step().unwrap(), StepOutcome::Stopped);
}

/// On a manual track change the stretch ring is empty and the filter history
/// zeroed before the new track's first block.
#[test]
fn test_track_change_resets_stage_state() {
    let tone = generate_sine(440.0, TEST_SAMPLE_RATE, 1.0);
    let config = PlayerConfig::default()
        .with_speed(PlaybackSpeed::Half)
        .with_eq(EqPreset::BassBoost);
    let mut player = Player::new(
        config,
        indexed_playlist(2),
        memory_loader(vec![(tone.clone(), mono()), (tone, mono())]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    player.step().unwrap();
    player.step().unwrap();
    assert!(player.session().unwrap().wsola().unwrap().buffered() > 0);
    assert!(!player.fir().unwrap().history_is_clear());

    controller.next_track();
    assert_eq!(player.step().unwrap(), StepOutcome::TrackChanged(1));

    let session = player.session().unwrap();
    assert_eq!(session.index(), 1);
    assert_eq!(session.position(), 0);
    assert_eq!(session.wsola().unwrap().buffered(), 0);
    assert_eq!(session.wsola().unwrap().total_input(), 0);
    assert!(player.fir().unwrap().history_is_clear());
    assert_eq!(player.speed(), PlaybackSpeed::Half);
    assert_eq!(player.eq(), EqPreset::BassBoost);
}

/// With a single track, next and previous do nothing.
#[test]
fn test_single_track_navigation() {
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(100),
        indexed_playlist(1),
        memory_loader(vec![(generate_ramp(1000), mono())]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();
    player.play().unwrap();
    player.step().unwrap();

    controller.next_track().previous_track();
    assert_eq!(player.step().unwrap(), StepOutcome::Played(100));
    assert_eq!(player.status().position_frames, 200);
}

/// A track that fails to load keeps the current one playing.
#[test]
fn test_failed_manual_load_keeps_current_track() {
    let good = generate_ramp(5000);
    let loader = move |track: &Track| -> adagio::player::Result<Box<dyn SampleSource>> {
        if track.title == "broken" {
            return Err(PlayerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing",
            )));
        }
        Ok(Box::new(MemorySource::new(good.clone(), TrackFormat::mono(8000))))
    };
    let playlist = Playlist::new(vec![
        Track::new("fine.wav"),
        Track::new("broken.wav"),
    ])
    .unwrap();
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(1000),
        playlist,
        loader,
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    player.step().unwrap();
    controller.next_track();
    assert_eq!(player.step().unwrap(), StepOutcome::Played(1000));

    let status = player.status();
    assert_eq!(status.track_index, 0);
    assert_eq!(status.title.as_deref(), Some("fine"));
    assert_eq!(status.position_frames, 2000);
}

// =============================================================================
// Pause and seek
// =============================================================================

#[test]
fn test_pause_writes_nothing() {
    let mut player = Player::new(
        PlayerConfig::default()
            .with_block_frames(500)
            .with_pause_poll_ms(1),
        indexed_playlist(1),
        memory_loader(vec![(generate_ramp(5000), mono())]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    player.step().unwrap();
    controller.toggle_pause();
    for _ in 0..3 {
        assert_eq!(player.step().unwrap(), StepOutcome::Paused);
    }
    assert_eq!(player.state(), PlaybackState::Paused);
    assert!(player.sink().is_paused());
    assert_eq!(player.sink().samples().len(), 500);
    assert_eq!(player.status().position_frames, 500);

    controller.resume();
    assert_eq!(player.step().unwrap(), StepOutcome::Played(500));
    assert_eq!(player.sink().samples().len(), 1000);
}

/// A track change that wakes the pause wait is reported as such.
#[test]
fn test_track_change_while_paused_is_reported() {
    let mut player = Player::new(
        PlayerConfig::default()
            .with_block_frames(500)
            .with_pause_poll_ms(10_000),
        indexed_playlist(2),
        memory_loader(vec![(generate_ramp(5000), mono()), (generate_ramp(5000), mono())]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();

    player.play().unwrap();
    player.step().unwrap();
    player.pause().unwrap();

    let sender = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        controller.next_track();
    });
    assert_eq!(player.step().unwrap(), StepOutcome::TrackChanged(1));
    sender.join().unwrap();

    assert_eq!(player.state(), PlaybackState::Paused);
    assert_eq!(player.status().track_index, 1);
    assert_eq!(player.status().position_frames, 0);
}

#[test]
fn test_seek_moves_and_clamps() {
    let rate = 8000;
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(1000),
        indexed_playlist(1),
        memory_loader(vec![(vec![0; rate * 25], TrackFormat::mono(rate as u32))]),
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();
    player.play().unwrap();
    player.step().unwrap();

    controller.seek_forward();
    player.handle_pending_events().unwrap();
    assert_eq!(player.status().position_frames, 1000 + 10 * rate as u64);

    controller.seek_backward().seek_backward();
    player.handle_pending_events().unwrap();
    assert_eq!(player.status().position_frames, 0);

    controller.seek_forward().seek_forward().seek_forward();
    player.handle_pending_events().unwrap();
    assert_eq!(player.status().position_frames, 25 * rate as u64);
}

#[test]
fn test_unseekable_source_ignores_seek() {
    let loader = |_: &Track| -> adagio::player::Result<Box<dyn SampleSource>> {
        Ok(Box::new(
            MemorySource::new(vec![0; 200_000], TrackFormat::mono(8000)).without_seek(),
        ))
    };
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(1000),
        Playlist::new(vec![Track::new("stream")]).unwrap(),
        loader,
        MemorySink::new(),
    )
    .unwrap();
    let controller = player.controller();
    player.play().unwrap();
    player.step().unwrap();

    controller.seek_forward();
    player.handle_pending_events().unwrap();
    assert_eq!(player.status().position_frames, 1000);
}

// =============================================================================
// Sink failures
// =============================================================================

#[test]
fn test_fatal_sink_error_aborts() {
    let mut player = Player::new(
        PlayerConfig::default().with_block_frames(1000),
        indexed_playlist(1),
        memory_loader(vec![(generate_ramp(10_000), mono())]),
        MemorySink::new().with_fatal_error_at(3),
    )
    .unwrap();

    let result = player.run();
    assert!(matches!(
        result,
        Err(PlayerError::Sink(SinkError::Device(_)))
    ));
    assert!(player.session().is_none());
    assert_eq!(player.sink().samples().len(), 3000);
}

#[test]
fn test_endless_underruns_give_up() {
    let mut sink = MemorySink::new();
    for call in 0..100 {
        sink = sink.with_underrun_at(call);
    }
    let config = PlayerConfig {
        max_underrun_retries: 5,
        ..Default::default()
    };
    let mut player = Player::new(
        config,
        indexed_playlist(1),
        memory_loader(vec![(generate_ramp(1000), mono())]),
        sink,
    )
    .unwrap();

    assert!(matches!(
        player.run(),
        Err(PlayerError::UnderrunStorm { retries: 5 })
    ));
    assert_eq!(player.metrics().underruns, 6);
}

/// Stop queued before playback starts ends the run cleanly.
#[test]
fn test_stop_before_first_block() {
    let mut player = Player::new(
        PlayerConfig::default(),
        indexed_playlist(1),
        memory_loader(vec![(generate_ramp(1000), mono())]),
        MemorySink::new(),
    )
    .unwrap();
    player.controller().stop();
    player.run().unwrap();

    assert!(player.sink().samples().is_empty());
    assert!(player.sink().was_drained());
}

// =============================================================================
// WAV files
// =============================================================================

#[test]
fn test_wav_playlist_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let stereo = generate_stereo_sine(440.0, 22050, 0.5);
    let mono_tone = generate_sine(660.0, TEST_SAMPLE_RATE, 0.25);
    let a = write_wav(dir.path(), "a.wav", &stereo, TrackFormat::stereo(22050));
    let b = write_wav(dir.path(), "b.wav", &mono_tone, mono());

    let mut player = Player::new(
        PlayerConfig::default(),
        Playlist::from_paths([&a, &b]).unwrap(),
        WavLoader,
        MemorySink::new(),
    )
    .unwrap();
    player.run().unwrap();

    let expected: Vec<i16> = stereo.into_iter().chain(mono_tone).collect();
    assert_eq!(player.sink().samples(), expected.as_slice());
    assert_eq!(player.metrics().tracks_finished, 2);
}
