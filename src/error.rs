//! Centralized error type for the adagio umbrella crate.
//!
//! Wraps both member crates' errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("DSP: {0}")]
    Dsp(#[from] adagio_dsp::Error),

    #[error(transparent)]
    Player(#[from] adagio_player::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
