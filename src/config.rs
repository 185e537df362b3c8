//! Studio Configuration
//!
//! [`StudioConfig`] gathers the initial state of every controller. It is plain
//! serde data, so viewers usually ship it as JSON next to their presets:
//!
//! ```json
//! {
//!   "exposure": { "initial": 1.0, "auto": true },
//!   "environment": { "strength": 1.2, "rotation": 45 },
//!   "presets": [
//!     { "id": "studio", "source": { "uri": "studio.hdr", "kind": "hdr" } }
//!   ],
//!   "initial_preset": "studio"
//! }
//! ```
//!
//! Every field defaults, so `{}` is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::environment::{EnvironmentSettings, PresetCatalog};
use crate::errors::{Result, StudioError};
use crate::exposure::ExposureSettings;
use crate::lighting::LightingSettings;
use crate::renderer::chain::PostSettings;

/// Initial exposure state plus the auto-exposure curve constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Starting (and first manual) exposure.
    pub initial: f32,
    /// Start in auto-exposure mode.
    pub auto: bool,
    pub curve: ExposureSettings,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            auto: true,
            curve: ExposureSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub exposure: ExposureConfig,
    pub post: PostSettings,
    pub environment: EnvironmentSettings,
    pub lighting: LightingSettings,
    pub presets: PresetCatalog,
    /// Preset activated by [`Studio::load_initial_preset`](crate::Studio::load_initial_preset).
    pub initial_preset: Option<String>,
}

impl StudioConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded studio config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Checks cross-field references the type system cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.initial_preset
            && self.presets.get(id).is_none()
        {
            return Err(StudioError::UnknownPreset(id.clone()));
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = StudioConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            StudioConfig::from_json_str(r#"{ "exposure": { "auto": false }, "environment": { "strength": 1.2 } }"#)
                .unwrap();
        assert!(!config.exposure.auto);
        assert_eq!(config.exposure.initial, 1.0);
        assert_eq!(config.environment.strength, 1.2);
        assert!(config.environment.enabled);
    }

    #[test]
    fn unknown_initial_preset_is_rejected() {
        let err = StudioConfig::from_json_str(r#"{ "initial_preset": "nowhere" }"#).unwrap_err();
        assert!(matches!(err, StudioError::UnknownPreset(id) if id == "nowhere"));
    }
}
