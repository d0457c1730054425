//! # Adagio - Real-time Audio Playback Engine
//!
//! Streams 16-bit PCM to an output device, with pitch-preserving speed
//! change and a fixed-tap equalizer in the path.
//!
//! ## Architecture
//!
//! Adagio is an umbrella crate that coordinates:
//! - **adagio-dsp** - Sample-level stages (ring buffer, WSOLA time stretch, FIR equalizer, resampler)
//! - **adagio-player** - Streaming loop (sources, sinks, playlist, state machine, control)
//!
//! ## Quick Start
//!
//! ```
//! use adagio::prelude::*;
//!
//! adagio::logging::init(LogLevel::Warn);
//!
//! let tone = adagio::dsp::signal::sine_tone(1000.0, 22050, 0.25, 0.5, 1);
//! let loader = move |_: &Track| -> adagio::player::Result<Box<dyn SampleSource>> {
//!     Ok(Box::new(MemorySource::new(tone.clone(), TrackFormat::mono(22050))))
//! };
//!
//! let config = PlayerConfig::default().with_eq(EqPreset::BassBoost);
//! let playlist = Playlist::new(vec![Track::new("tone.wav")])?;
//! let mut player = Player::new(config, playlist, loader, MemorySink::new())?;
//! player.run()?;
//! # Ok::<(), adagio::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `device` - Hardware output through CPAL ([`DeviceSink`](player::DeviceSink))

/// Re-export of adagio-dsp for direct access
pub use adagio_dsp as dsp;
/// Re-export of adagio-player for direct access
pub use adagio_player as player;

pub mod config;
pub mod error;
pub mod logging;

pub use config::AdagioConfig;
pub use error::{Error, Result};
pub use logging::LogLevel;

/// Convenience prelude for common imports
pub mod prelude {
    // DSP stages
    pub use crate::dsp::{
        EqPreset, FirFilter, PlaybackSpeed, SampleBlock, TrackFormat, Varispeed, WsolaConfig,
        WsolaProcessor,
    };

    // Playback
    pub use crate::player::{
        AudioSink, ControlEvent, MemorySink, MemorySource, PlaybackState, Player,
        PlayerConfig, PlayerController, Playlist, SampleSource, StepOutcome, Track,
        TrackLoader, WavLoader, WavSource,
    };

    #[cfg(feature = "device")]
    pub use crate::player::DeviceSink;

    pub use crate::{AdagioConfig, LogLevel};
}
