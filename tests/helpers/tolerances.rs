//! Tolerance constants for playback testing.
//!
//! Time-scale modification works in whole synthesis hops, so durations are
//! compared in samples rather than seconds.

/// One synthesis hop at the default frame length.
/// Steady-state output length may differ from the ideal by this much.
pub const OVERLAP_SAMPLES: usize = 256;

/// Whole-stream duration error, including the frame needed before the first
/// output and the tail released at the end.
pub const EDGE_SAMPLES: usize = 1024;

/// Zero-crossing frequency estimates on a 1 kHz tone.
pub const FREQUENCY_TOLERANCE_HZ: f64 = 50.0;

/// RMS ratio that counts as a clear boost.
pub const BOOST_RATIO: f64 = 1.15;

/// RMS ratio that counts as a clear cut.
pub const CUT_RATIO: f64 = 0.85;
