//! Player configuration.

use crate::{Error, Result};
use adagio_dsp::{EqPreset, PlaybackSpeed, WsolaConfig, DEFAULT_TAPS, MAX_TAPS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the playback loop and its processing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Frames read from the source per loop iteration (default: 4096)
    pub block_frames: usize,
    /// Sleep between control polls while paused, in ms (default: 100)
    pub pause_poll_ms: u64,
    /// Seek step for forward/backward seeks, in seconds (default: 10)
    pub seek_seconds: u32,
    /// Speed at startup (default: 1.0x)
    pub initial_speed: PlaybackSpeed,
    /// Equalizer preset at startup (default: normal)
    pub initial_eq: EqPreset,
    /// Tap count for equalizer preset designs (default: 31)
    pub fir_taps: usize,
    /// Consecutive underrun recoveries without progress before giving up (default: 1024)
    pub max_underrun_retries: u32,
    /// Time-stretch geometry and search tuning
    pub wsola: WsolaConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            block_frames: 4096,
            pause_poll_ms: 100,
            seek_seconds: 10,
            initial_speed: PlaybackSpeed::Normal,
            initial_eq: EqPreset::Normal,
            fir_taps: DEFAULT_TAPS,
            max_underrun_retries: 1024,
            wsola: WsolaConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn with_block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }

    pub fn with_pause_poll_ms(mut self, ms: u64) -> Self {
        self.pause_poll_ms = ms;
        self
    }

    pub fn with_speed(mut self, speed: PlaybackSpeed) -> Self {
        self.initial_speed = speed;
        self
    }

    pub fn with_eq(mut self, preset: EqPreset) -> Self {
        self.initial_eq = preset;
        self
    }

    /// Checks loop parameters only. Stage configurations (time stretch,
    /// equalizer) are validated when the stage is built, and a failure there
    /// disables the stage instead of refusing to play.
    pub fn validate(&self) -> Result<()> {
        if self.block_frames == 0 {
            return Err(Error::InvalidConfig("block_frames must be non-zero".into()));
        }
        if self.max_underrun_retries == 0 {
            return Err(Error::InvalidConfig(
                "max_underrun_retries must be non-zero".into(),
            ));
        }
        if self.fir_taps == 0 {
            return Err(Error::InvalidConfig("fir_taps must be non-zero".into()));
        }
        Ok(())
    }

    /// True when the equalizer tap count is within what the filter accepts.
    pub fn fir_taps_supported(&self) -> bool {
        self.fir_taps <= MAX_TAPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.block_frames, 4096);
        assert_eq!(config.pause_poll(), Duration::from_millis(100));
        assert_eq!(config.seek_seconds, 10);
        assert_eq!(config.fir_taps, 31);
        assert_eq!(config.initial_speed, PlaybackSpeed::Normal);
        assert!(config.validate().is_ok());
        assert!(config.fir_taps_supported());
    }

    #[test]
    fn test_invalid_loop_parameters() {
        assert!(PlayerConfig::default()
            .with_block_frames(0)
            .validate()
            .is_err());

        let config = PlayerConfig {
            max_underrun_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stage_config_does_not_block_playback() {
        let mut config = PlayerConfig {
            fir_taps: 200,
            ..Default::default()
        };
        config.wsola.overlap_len = 1024;
        assert!(config.validate().is_ok());
        assert!(!config.fir_taps_supported());
    }

    #[test]
    fn test_partial_json() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"block_frames": 1024, "initial_eq": "bass_boost"}"#).unwrap();
        assert_eq!(config.block_frames, 1024);
        assert_eq!(config.initial_eq, EqPreset::BassBoost);
        assert_eq!(config.pause_poll_ms, 100);
        assert_eq!(config.wsola, WsolaConfig::default());
    }
}
