//! Varispeed playback: resampling by the speed factor, pitch follows speed.
//!
//! Used where time stretching is unavailable (stereo tracks, or when the
//! stretcher failed to initialize). Frames are linearly interpolated; the
//! fractional read position and the last frame of each block carry over so
//! block boundaries are seamless.

use crate::signal::saturate_i16;

#[derive(Debug, Clone)]
pub struct Varispeed {
    /// 1.0 = normal, 0.5 = half, 2.0 = double
    speed: f64,
    channels: usize,
    // Read position relative to `last_frame` (index 0) when primed
    position: f64,
    last_frame: Vec<i16>,
    primed: bool,
}

impl Varispeed {
    pub fn new(speed: f64, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            speed: Self::clamp_speed(speed),
            channels,
            position: 0.0,
            last_frame: vec![0; channels],
            primed: false,
        }
    }

    fn clamp_speed(speed: f64) -> f64 {
        if speed.is_finite() {
            speed.max(0.01)
        } else {
            1.0
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Always positive, minimum 0.01.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = Self::clamp_speed(speed);
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// True while a frame from the previous block is held for interpolation.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Play out the held frame for the positions still short of the next
    /// one, then reset. Returns frames appended.
    pub fn flush(&mut self, output: &mut Vec<i16>) -> usize {
        if !self.primed {
            return 0;
        }
        let mut produced = 0;
        let mut pos = self.position;
        while pos < 1.0 {
            output.extend_from_slice(&self.last_frame);
            produced += 1;
            pos += self.speed;
        }
        self.reset();
        produced
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.last_frame.fill(0);
        self.primed = false;
    }

    /// Resample interleaved `input` and append to `output`. Returns frames appended.
    pub fn process(&mut self, input: &[i16], output: &mut Vec<i16>) -> usize {
        let ch = self.channels;
        let input_frames = input.len() / ch;
        if input_frames == 0 {
            return 0;
        }

        // Virtual frame sequence: [last_frame] ++ input when primed
        let lead = usize::from(self.primed);
        let total = lead + input_frames;
        let frame = |i: usize, c: usize| -> f64 {
            if i < lead {
                self.last_frame[c] as f64
            } else {
                input[(i - lead) * ch + c] as f64
            }
        };

        let mut produced = 0;
        let mut pos = self.position;
        while pos + 1.0 < total as f64 {
            let i = pos.floor() as usize;
            let t = pos - i as f64;
            for c in 0..ch {
                let a = frame(i, c);
                let b = frame(i + 1, c);
                output.push(saturate_i16((a + (b - a) * t) as f32));
            }
            produced += 1;
            pos += self.speed;
        }

        // Re-anchor on the last input frame
        self.position = pos - (total - 1) as f64;
        let last = (input_frames - 1) * ch;
        self.last_frame.copy_from_slice(&input[last..last + ch]);
        self.primed = true;
        produced
    }
}

impl Default for Varispeed {
    fn default() -> Self {
        Self::new(1.0, 2)
    }
}
