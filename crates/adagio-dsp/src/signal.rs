//! Sample conversion and test-tone generation.

use std::f64::consts::PI;

/// Round and clamp an accumulator value into the 16-bit range.
#[inline]
pub fn saturate_i16(value: f32) -> i16 {
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Interleaved 16-bit sine tone.
///
/// `amplitude` is relative to full scale (0.5 = -6 dBFS). Every channel
/// carries the same signal.
pub fn sine_tone(
    frequency: f64,
    sample_rate: u32,
    seconds: f64,
    amplitude: f64,
    channels: u16,
) -> Vec<i16> {
    let frames = (seconds.max(0.0) * sample_rate as f64) as usize;
    let channels = channels.max(1) as usize;
    let scale = amplitude.clamp(0.0, 1.0) * i16::MAX as f64;

    let mut out = Vec::with_capacity(frames * channels);
    for n in 0..frames {
        let t = n as f64 / sample_rate as f64;
        let sample = (scale * (2.0 * PI * frequency * t).sin()).round() as i16;
        out.extend(std::iter::repeat(sample).take(channels));
    }
    out
}
