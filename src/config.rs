//! Application-level configuration.

use crate::logging::LogLevel;
use crate::Result;
use adagio_player::PlayerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdagioConfig {
    pub player: PlayerConfig,
    pub log_level: LogLevel,
}

impl AdagioConfig {
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;
        Ok(())
    }
}
