//! Pitch-preserving time-scale modification.
//!
//! [`WsolaProcessor`] stretches or compresses a mono 16-bit stream by a
//! speed factor in `[0.5, 2.0]`. Speed 1.0 is an exact pass-through.
//!
//! # Example
//!
//! ```
//! use adagio_dsp::{PlaybackSpeed, TrackFormat, WsolaConfig, WsolaProcessor};
//!
//! let speed = PlaybackSpeed::Double;
//! let mut wsola =
//!     WsolaProcessor::new(WsolaConfig::default(), TrackFormat::mono(44100), speed.factor())?;
//!
//! let mut out = Vec::new();
//! wsola.process(&vec![0i16; 8192], &mut out);
//! assert!(out.len() < 8192);
//! # Ok::<(), adagio_dsp::Error>(())
//! ```

mod correlation;
mod types;
mod wsola;

pub use correlation::{normalized_cross_correlation, ENERGY_FLOOR, SILENCE_MATCH};
pub use types::{PlaybackSpeed, WsolaConfig, WsolaTuning};
pub use wsola::{WsolaProcessor, MAX_SPEED, MIN_SPEED};
