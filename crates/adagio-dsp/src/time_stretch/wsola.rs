//! WSOLA (waveform-similarity overlap-add) time-scale modification.
//!
//! ## Algorithm Overview
//!
//! Each iteration emits `overlap_len` samples:
//!
//! 1. **Search**: around the ideal input position, find the offset whose
//!    rising-windowed segment best matches the previous output tail
//!    (coarse pass, then a fine pass around the coarse winner)
//! 2. **Window**: extract a full frame at that offset and apply the Hann window
//! 3. **Overlap-add**: first half + previous tail is emitted, second half
//!    becomes the new tail
//! 4. **Advance**: the ideal position moves by `round(overlap_len * speed)`
//!
//! Output per iteration is fixed and the input advance scales with speed, so
//! output length is input length divided by speed while pitch is preserved.
//!
//! ## Buffering
//!
//! Input goes through a [`RingBuffer`] addressed by absolute stream offset.
//! Samples before `next_ideal - search_window` are never discarded. Input is
//! pushed in pieces no larger than the free space, with iterations run in
//! between, so a steady stream never overwrites unread data.

use super::correlation::normalized_cross_correlation;
use super::types::WsolaConfig;
use crate::ring_buffer::RingBuffer;
use crate::signal::saturate_i16;
use crate::{Error, Result, TrackFormat};
use std::f32::consts::PI;
use tracing::{debug, error, trace, warn};

/// Slowest supported speed factor.
pub const MIN_SPEED: f64 = 0.5;
/// Fastest supported speed factor.
pub const MAX_SPEED: f64 = 2.0;

const SCORE_EPSILON: f32 = 1e-6;

/// Mono time-scale modifier. One instance per track.
pub struct WsolaProcessor {
    config: WsolaConfig,
    sample_rate: u32,
    speed: f64,

    window: Vec<f32>,
    ring: RingBuffer,

    // Second half of the last windowed frame
    output_tail: Vec<f32>,
    tail_primed: bool,

    next_ideal: u64,
    prev_offset: isize,
    prev_correlation: f32,
    low_correlation_run: usize,

    total_input: u64,
    total_output: u64,

    // Scratch, sized once
    candidate: Vec<f32>,
    frame: Vec<f32>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    offset: isize,
    correlation: f32,
    score: f32,
}

impl Candidate {
    fn none() -> Self {
        Self {
            offset: 0,
            correlation: 0.0,
            score: f32::NEG_INFINITY,
        }
    }

    /// Higher score wins; ties go to the offset nearer the previous one, then nearer zero.
    fn beats(&self, other: &Candidate, prev_offset: isize) -> bool {
        if self.score > other.score + SCORE_EPSILON {
            return true;
        }
        if self.score < other.score - SCORE_EPSILON {
            return false;
        }
        let d_self = (self.offset - prev_offset).abs();
        let d_other = (other.offset - prev_offset).abs();
        if d_self != d_other {
            return d_self < d_other;
        }
        self.offset.abs() < other.offset.abs()
    }
}

/// Borrowed state for scoring candidate offsets around one ideal position.
struct Search<'a> {
    ring: &'a RingBuffer,
    window: &'a [f32],
    tail: &'a [f32],
    scratch: &'a mut [f32],
    ideal_index: usize,
    prev_offset: isize,
    bias: f32,
    search_window: f32,
}

impl Search<'_> {
    fn score(&mut self, offset: isize) -> Option<Candidate> {
        let start = usize::try_from(self.ideal_index as isize + offset).ok()?;
        let segment = self.ring.segment(start, self.tail.len())?;
        for ((dst, sample), w) in self.scratch.iter_mut().zip(segment.iter()).zip(self.window) {
            *dst = sample as f32 * w;
        }
        let correlation = normalized_cross_correlation(&*self.scratch, self.tail);
        let distance = (offset - self.prev_offset).abs() as f32;
        let penalty = self.bias * distance / self.search_window;
        Some(Candidate {
            offset,
            correlation,
            score: correlation - penalty,
        })
    }

    fn consider(&mut self, offset: isize, best: &mut Candidate) {
        if let Some(candidate) = self.score(offset) {
            if candidate.beats(best, self.prev_offset) {
                *best = candidate;
            }
        }
    }
}

impl WsolaProcessor {
    /// Create a processor for a 16-bit mono track.
    pub fn new(config: WsolaConfig, format: TrackFormat, speed: f64) -> Result<Self> {
        config.validate()?;
        if !format.supports_wsola() {
            return Err(Error::UnsupportedFormat(format!(
                "time stretching needs 16-bit mono, got {format}"
            )));
        }
        check_speed(speed)?;

        let n = config.frame_len;
        let window = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
            .collect();
        let ring = RingBuffer::new(config.ring_capacity)
            .with_max_discard_fraction(config.tuning.max_discard_fraction);

        Ok(Self {
            config,
            sample_rate: format.sample_rate,
            speed,
            window,
            ring,
            output_tail: vec![0.0; config.overlap_len],
            tail_primed: false,
            next_ideal: 0,
            prev_offset: 0,
            prev_correlation: 0.0,
            low_correlation_run: 0,
            total_input: 0,
            total_output: 0,
            candidate: vec![0.0; config.overlap_len],
            frame: vec![0.0; n],
        })
    }

    pub fn config(&self) -> &WsolaConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Speed 1.0 copies input straight through.
    pub fn is_bypassed(&self) -> bool {
        (self.speed - 1.0).abs() < 1e-9
    }

    /// Input advance per iteration.
    pub fn analysis_hop(&self) -> usize {
        ((self.config.overlap_len as f64 * self.speed).round() as usize).max(1)
    }

    /// Output produced per iteration.
    pub fn synthesis_hop(&self) -> usize {
        self.config.overlap_len
    }

    pub fn total_input(&self) -> u64 {
        self.total_input
    }

    pub fn total_output(&self) -> u64 {
        self.total_output
    }

    pub fn next_ideal_input_offset(&self) -> u64 {
        self.next_ideal
    }

    pub fn stream_start_offset(&self) -> u64 {
        self.ring.stream_start_offset()
    }

    /// Samples currently held in the ring.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Correlation of the most recent alignment.
    pub fn last_correlation(&self) -> f32 {
        self.prev_correlation
    }

    /// Offset chosen by the most recent alignment, relative to its ideal position.
    pub fn last_offset(&self) -> isize {
        self.prev_offset
    }

    pub fn output_tail(&self) -> &[f32] {
        &self.output_tail
    }

    /// Change speed without dropping buffered input.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        check_speed(speed)?;
        if (self.speed - speed).abs() > 1e-9 {
            debug!(from = self.speed, to = speed, "time stretch speed changed");
            self.speed = speed;
        }
        Ok(())
    }

    /// Time-scale `input` and append the result to `output`.
    ///
    /// Returns the number of samples appended. Zero is normal while the ring
    /// is still filling.
    pub fn process(&mut self, input: &[i16], output: &mut Vec<i16>) -> usize {
        let before = output.len();
        if self.is_bypassed() {
            self.bypass(input, output);
            return output.len() - before;
        }

        let mut remaining = input;
        while !remaining.is_empty() {
            let free = self.ring.free();
            if free == 0 {
                if self.can_iterate() && self.iterate(output) {
                    continue;
                }
                if self.reclaim() > 0 {
                    continue;
                }
                // Stalled with a full ring; accept the overwrite
                let n = remaining.len().min(self.ring.capacity() / 2).max(1);
                self.push_input(&remaining[..n]);
                remaining = &remaining[n..];
                continue;
            }

            let n = free.min(remaining.len());
            self.push_input(&remaining[..n]);
            remaining = &remaining[n..];
            while self.can_iterate() && self.iterate(output) {}
        }
        output.len() - before
    }

    /// Drain everything still buffered at end of stream, then reset.
    pub fn flush(&mut self, output: &mut Vec<i16>) -> usize {
        let before = output.len();
        let n = self.config.frame_len as u64;

        if self.is_bypassed() {
            if self.tail_primed {
                self.release_tail(output);
            }
        } else {
            while self.next_ideal >= self.ring.stream_start_offset()
                && self.next_ideal + n <= self.ring.end_offset()
            {
                if !self.iterate(output) {
                    break;
                }
            }

            if self.tail_primed {
                output.extend(self.output_tail.iter().map(|&s| saturate_i16(s)));
                self.total_output += self.output_tail.len() as u64;
            } else {
                // Never reached a full frame; nothing was stretched
                self.release_tail(output);
            }
        }

        let flushed = output.len() - before;
        debug!(
            flushed,
            total_input = self.total_input,
            total_output = self.total_output,
            "time stretch flushed"
        );
        self.reset();
        flushed
    }

    /// Forget all buffered input and restart at stream offset zero.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.output_tail.fill(0.0);
        self.tail_primed = false;
        self.next_ideal = 0;
        self.prev_offset = 0;
        self.prev_correlation = 0.0;
        self.low_correlation_run = 0;
        self.total_input = 0;
        self.total_output = 0;
    }

    fn search_window(&self) -> u64 {
        self.config.search_window as u64
    }

    fn discard_target(&self) -> u64 {
        self.next_ideal
            .saturating_sub(self.search_window() + self.config.overlap_len as u64)
    }

    fn reclaim(&mut self) -> usize {
        let target = self.discard_target();
        self.ring.discard_up_to(target)
    }

    fn can_iterate(&self) -> bool {
        let needed = self.search_window() + self.config.frame_len as u64;
        self.next_ideal >= self.ring.stream_start_offset()
            && self.ring.end_offset() >= self.next_ideal + needed
    }

    fn push_input(&mut self, samples: &[i16]) {
        self.total_input += samples.len() as u64;
        if self.ring.push(samples) == 0 {
            return;
        }

        let floor = self.ring.stream_start_offset() + self.search_window();
        if self.next_ideal < floor {
            warn!(
                lost = floor - self.next_ideal,
                "time stretch input overran the ring, resynchronizing"
            );
            self.next_ideal = floor.min(self.ring.end_offset());
            self.prev_offset = 0;
            self.low_correlation_run = 0;
        }
    }

    fn bypass(&mut self, input: &[i16], output: &mut Vec<i16>) {
        if self.tail_primed {
            self.release_tail(output);
        }
        output.extend_from_slice(input);
        self.total_output += input.len() as u64;

        // Keep offsets moving so a later speed change starts consistently
        let piece_len = (self.ring.capacity() / 2).max(1);
        for piece in input.chunks(piece_len) {
            self.push_input(piece);
            self.next_ideal = self.ring.end_offset();
            self.ring
                .set_retain_floor(self.next_ideal.saturating_sub(self.search_window()));
            while self.reclaim() > 0 {}
        }
    }

    /// Emit everything buffered from the ideal position on, cross-fading the
    /// pending tail into it. Used when stretching stops.
    fn release_tail(&mut self, output: &mut Vec<i16>) {
        if let Some(index) = self.ring.absolute_to_index(self.next_ideal) {
            let available = self.ring.len() - index;
            if let Some(segment) = self.ring.segment(index, available) {
                let fade = if self.tail_primed {
                    available.min(self.output_tail.len())
                } else {
                    0
                };
                output.extend(segment.iter().enumerate().map(|(i, s)| {
                    if i < fade {
                        saturate_i16(s as f32 * self.window[i] + self.output_tail[i])
                    } else {
                        s
                    }
                }));
                self.total_output += available as u64;
            }
        }

        self.next_ideal = self.ring.end_offset();
        self.output_tail.fill(0.0);
        self.tail_primed = false;
        self.prev_offset = 0;
        self.low_correlation_run = 0;
    }

    /// Seed the tail from the input at the ideal position so the first
    /// overlap-add reproduces the input instead of fading in.
    fn prime_tail(&mut self, ideal_index: usize) -> bool {
        let n_o = self.config.overlap_len;
        let Some(segment) = self.ring.segment(ideal_index, n_o) else {
            return false;
        };
        for ((dst, sample), w) in self
            .output_tail
            .iter_mut()
            .zip(segment.iter())
            .zip(&self.window[n_o..])
        {
            *dst = sample as f32 * w;
        }
        self.tail_primed = true;
        self.prev_offset = 0;
        self.prev_correlation = 1.0;
        self.low_correlation_run = 0;
        true
    }

    /// Pick the frame offset relative to the ideal position.
    fn choose_offset(&mut self, ideal_index: usize, available: usize) -> Option<(isize, f32)> {
        let n = self.config.frame_len as isize;
        let sw = self.config.search_window as isize;
        let ideal = ideal_index as isize;
        let stride = self.config.coarse_stride() as isize;
        let tuning = self.config.tuning;
        let prev = self.prev_offset;

        // Never before the buffered data, never past its end
        let lo = (-sw).max(-ideal);
        let hi = sw.min(available as isize - n - ideal);
        if lo > hi {
            return None;
        }

        // Narrow the band after a run of poor matches
        let (mut band_lo, mut band_hi) = (lo, hi);
        if self.low_correlation_run >= tuning.low_correlation_patience {
            let excess = (self.low_correlation_run - tuning.low_correlation_patience) as u32;
            let half = (sw >> (1 + excess).min(31)).max(stride);
            band_lo = lo.max(prev - half);
            band_hi = hi.min(prev + half);
            if band_lo > band_hi {
                band_lo = prev.clamp(lo, hi);
                band_hi = band_lo;
            }
        }

        let confidence = self.prev_correlation.clamp(0.0, 1.0);
        let mut search = Search {
            ring: &self.ring,
            window: &self.window[..self.config.overlap_len],
            tail: &self.output_tail,
            scratch: &mut self.candidate,
            ideal_index,
            prev_offset: prev,
            bias: tuning.continuity_bias * (0.25 + 0.75 * confidence),
            search_window: sw as f32,
        };

        let mut best = Candidate::none();
        let mut offset = band_lo;
        while offset <= band_hi {
            search.consider(offset, &mut best);
            offset += stride;
        }
        search.consider(band_hi, &mut best);
        if (band_lo..=band_hi).contains(&prev) {
            search.consider(prev, &mut best);
        }

        let fine_lo = (best.offset - stride).max(band_lo);
        let fine_hi = (best.offset + stride).min(band_hi);
        for offset in fine_lo..=fine_hi {
            search.consider(offset, &mut best);
        }

        // Limit the jump, then re-align locally so the step stays in phase
        let max_jump = (sw / 2).max(1);
        if (best.offset - prev).abs() > max_jump {
            let toward = (prev + (best.offset - prev) / 2).clamp(prev - max_jump, prev + max_jump);
            let local_lo = (toward - stride).max(lo).max(prev - max_jump);
            let local_hi = (toward + stride).min(hi).min(prev + max_jump);

            let mut local = Candidate::none();
            for offset in local_lo..=local_hi {
                search.consider(offset, &mut local);
            }
            if local.score.is_finite() {
                best = local;
            } else if let Some(fallback) = search.score(toward.clamp(lo, hi)) {
                best = fallback;
            }
        }

        if !best.score.is_finite() {
            return None;
        }
        Some((best.offset, best.correlation))
    }

    fn iterate(&mut self, output: &mut Vec<i16>) -> bool {
        let Some(ideal_index) = self.ring.absolute_to_index(self.next_ideal) else {
            error!(
                next_ideal = self.next_ideal,
                stream_start = self.ring.stream_start_offset(),
                "ideal position not buffered, iteration abandoned"
            );
            return false;
        };

        let was_primed = self.tail_primed;
        if !was_primed && !self.prime_tail(ideal_index) {
            return false;
        }

        let available = self.ring.len();
        let Some((offset, correlation)) = self.choose_offset(ideal_index, available) else {
            self.tail_primed = was_primed;
            return false;
        };

        let n = self.config.frame_len;
        let n_o = self.config.overlap_len;
        let position = (ideal_index as isize + offset) as usize;
        let Some(segment) = self.ring.segment(position, n) else {
            error!(
                position,
                frame_len = n,
                available,
                "frame extraction failed, iteration abandoned"
            );
            self.tail_primed = was_primed;
            return false;
        };

        for ((dst, sample), w) in self.frame.iter_mut().zip(segment.iter()).zip(&self.window) {
            *dst = sample as f32 * w;
        }
        output.extend(
            self.frame[..n_o]
                .iter()
                .zip(&self.output_tail)
                .map(|(&a, &b)| saturate_i16(a + b)),
        );
        self.output_tail.copy_from_slice(&self.frame[n_o..]);
        self.total_output += n_o as u64;

        self.prev_offset = offset;
        self.prev_correlation = correlation;
        if correlation < self.config.tuning.low_correlation_threshold {
            self.low_correlation_run += 1;
        } else {
            self.low_correlation_run = 0;
        }

        self.next_ideal += self.analysis_hop() as u64;
        self.ring
            .set_retain_floor(self.next_ideal.saturating_sub(self.search_window()));
        self.reclaim();
        debug_assert!(
            self.ring.stream_start_offset() <= self.next_ideal.saturating_sub(self.search_window())
        );

        trace!(offset, correlation, next_ideal = self.next_ideal, "wsola frame");
        true
    }
}

fn check_speed(speed: f64) -> Result<()> {
    if speed.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(())
    } else {
        Err(Error::InvalidSpeed(speed))
    }
}
