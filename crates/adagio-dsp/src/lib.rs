//! # adagio-dsp
//!
//! Sample-level building blocks for the adagio playback engine. Everything
//! here works on interleaved 16-bit PCM and keeps its state in plain owned
//! structs, so a playback session can hold one of each and drop them on
//! track change.
//!
//! ## Modules
//!
//! - [`ring_buffer`] - fixed-capacity sample store with absolute stream offsets
//! - [`time_stretch`] - WSOLA time-scale modification (mono)
//! - [`fir`] - fixed-tap FIR equalizer with presets
//! - [`varispeed`] - linear-interpolation resampler (pitch follows speed)
//! - [`format`] - track format and sample blocks
//! - [`signal`] - tone generation and sample conversion helpers
//!
//! ## Example
//!
//! ```
//! use adagio_dsp::{TrackFormat, WsolaConfig, WsolaProcessor};
//!
//! let format = TrackFormat::mono(44100);
//! let mut wsola = WsolaProcessor::new(WsolaConfig::default(), format, 0.5).unwrap();
//!
//! let input = adagio_dsp::signal::sine_tone(440.0, 44100, 0.5, 0.5, 1);
//! let mut output = Vec::new();
//! wsola.process(&input, &mut output);
//! wsola.flush(&mut output);
//! assert!(output.len() > input.len());
//! ```

pub mod error;
pub mod fir;
pub mod format;
pub mod ring_buffer;
pub mod signal;
pub mod time_stretch;
pub mod varispeed;

pub use error::{Error, Result};
pub use fir::{EqPreset, FirFilter, DEFAULT_TAPS, MAX_TAPS};
pub use format::{SampleBlock, TrackFormat};
pub use ring_buffer::{RingBuffer, Segment};
pub use time_stretch::{
    normalized_cross_correlation, PlaybackSpeed, WsolaConfig, WsolaProcessor, WsolaTuning,
};
pub use varispeed::Varispeed;
