//! Error types.

use crate::sink::SinkError;
use thiserror::Error;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// DSP stage rejected its configuration or input format.
    #[error("DSP error: {0}")]
    Dsp(#[from] adagio_dsp::Error),

    /// Unrecoverable output error.
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hound error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Invalid player configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Playlist has no tracks.
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Track index out of range.
    #[error("Track index {index} out of range ({len} tracks)")]
    TrackIndex { index: usize, len: usize },

    /// The sink kept reporting underruns without accepting data.
    #[error("Output stalled after {retries} consecutive underrun recoveries")]
    UnderrunStorm { retries: u32 },

    /// Failed to enumerate devices.
    #[cfg(feature = "device")]
    #[error("Failed to enumerate audio devices")]
    DevicesError(#[from] cpal::DevicesError),

    /// Failed to get device config.
    #[cfg(feature = "device")]
    #[error("Failed to get audio device config")]
    DeviceConfigError(#[from] cpal::DefaultStreamConfigError),

    /// Failed to get device name.
    #[cfg(feature = "device")]
    #[error("Failed to get audio device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),

    /// Device not found.
    #[cfg(feature = "device")]
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
