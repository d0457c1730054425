//! # adagio-player
//!
//! Streaming playback for adagio: a cooperative single-threaded loop that
//! reads blocks from a [`SampleSource`], runs them through the equalizer and
//! the speed stage, and writes them to an [`AudioSink`] with underrun
//! recovery.
//!
//! ## Example
//!
//! ```
//! use adagio_player::{
//!     MemorySink, MemorySource, Player, PlayerConfig, Playlist, SampleSource, Track,
//! };
//! use adagio_dsp::{PlaybackSpeed, TrackFormat};
//!
//! let tone = adagio_dsp::signal::sine_tone(440.0, 22050, 0.5, 0.5, 1);
//! let loader = move |_: &Track| -> adagio_player::Result<Box<dyn SampleSource>> {
//!     Ok(Box::new(MemorySource::new(tone.clone(), TrackFormat::mono(22050))))
//! };
//!
//! let config = PlayerConfig::default().with_speed(PlaybackSpeed::Half);
//! let playlist = Playlist::new(vec![Track::new("tone.wav")]).unwrap();
//! let mut player = Player::new(config, playlist, loader, MemorySink::new()).unwrap();
//! player.run().unwrap();
//!
//! // Half speed plays for roughly twice as long
//! assert!(player.sink().samples().len() > 20_000);
//! ```

pub mod config;
pub mod control;
#[cfg(feature = "device")]
pub mod device;
pub mod error;
pub mod fsm;
pub mod metrics;
pub mod player;
pub mod playlist;
pub mod session;
pub mod sink;
pub mod source;

pub use config::PlayerConfig;
pub use control::{ControlEvent, PlayerController};
#[cfg(feature = "device")]
pub use device::DeviceSink;
pub use error::{Error, Result};
pub use fsm::{PlaybackEvent, PlaybackFsm, PlaybackState, Transition};
pub use metrics::{PlaybackMetrics, PlaybackMetricsSnapshot};
pub use player::{write_all, PlaybackStatus, Player, StepOutcome};
pub use playlist::{Playlist, Track, TrackLoader, WavLoader};
pub use session::TrackSession;
pub use sink::{AudioSink, MemorySink, SinkError};
pub use source::{MemorySource, SampleSource, WavSource};
