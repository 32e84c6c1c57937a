// Configuration - RON file with defaults for every field

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Full-scale mixer volume
pub const MAX_VOLUME: i32 = 128;

/// Bridge and software sequencer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeMidiConfig {
    /// Volume latched before the first `set_volume` call (0-128)
    pub initial_volume: i32,
    /// Client name announced to the MIDI backend
    pub client_name: String,
    /// Output port to connect to, first available port when unset
    pub output_port: Option<String>,
    /// Tempo used until the song sets one, and for SMPTE-timed files
    pub default_tempo_bpm: f64,
    /// Sleep between two dispatch passes of the player thread
    pub dispatch_interval_ms: u64,
}

impl Default for NativeMidiConfig {
    fn default() -> Self {
        Self {
            initial_volume: MAX_VOLUME,
            client_name: "native-midi".to_string(),
            output_port: None,
            default_tempo_bpm: 120.0,
            dispatch_interval_ms: 1,
        }
    }
}

impl NativeMidiConfig {
    /// Parse a RON document
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a RON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Save as pretty-printed RON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        let text = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms.max(1))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_tempo_bpm.is_finite() || self.default_tempo_bpm <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_tempo_bpm must be positive, got {}",
                self.default_tempo_bpm
            )));
        }
        if !(0..=MAX_VOLUME).contains(&self.initial_volume) {
            return Err(ConfigError::Invalid(format!(
                "initial_volume must be within 0..={}, got {}",
                MAX_VOLUME, self.initial_volume
            )));
        }
        Ok(())
    }
}
