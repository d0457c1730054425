//! Playback counters.
//!
//! Updated by the playback loop, readable from any thread through the
//! controller.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PlaybackMetrics {
    /// Blocks read from sources
    blocks_read: AtomicU64,
    /// Frames read from sources
    frames_read: AtomicU64,
    /// Frames accepted by the sink
    frames_written: AtomicU64,
    /// Underrun / would-block recoveries
    underruns: AtomicU64,
    /// Blocks that skipped the equalizer
    eq_bypassed: AtomicU64,
    /// Blocks that skipped speed processing
    stretch_bypassed: AtomicU64,
    /// Tracks loaded
    tracks_started: AtomicU64,
    /// Tracks played to the end
    tracks_finished: AtomicU64,
}

impl PlaybackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_read(&self, frames: u64) {
        self.blocks_read.fetch_add(1, Ordering::Relaxed);
        self.frames_read.fetch_add(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self, frames: u64) {
        self.frames_written.fetch_add(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eq_bypass(&self) {
        self.eq_bypassed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stretch_bypass(&self) {
        self.stretch_bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_track_started(&self) {
        self.tracks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_track_finished(&self) {
        self.tracks_finished.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current metrics.
    pub fn snapshot(&self) -> PlaybackMetricsSnapshot {
        PlaybackMetricsSnapshot {
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_written: self.frames_written.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            eq_bypassed: self.eq_bypassed.load(Ordering::Relaxed),
            stretch_bypassed: self.stretch_bypassed.load(Ordering::Relaxed),
            tracks_started: self.tracks_started.load(Ordering::Relaxed),
            tracks_finished: self.tracks_finished.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.blocks_read,
            &self.frames_read,
            &self.frames_written,
            &self.underruns,
            &self.eq_bypassed,
            &self.stretch_bypassed,
            &self.tracks_started,
            &self.tracks_finished,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of playback metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackMetricsSnapshot {
    pub blocks_read: u64,
    pub frames_read: u64,
    pub frames_written: u64,
    pub underruns: u64,
    pub eq_bypassed: u64,
    pub stretch_bypassed: u64,
    pub tracks_started: u64,
    pub tracks_finished: u64,
}
