//! Engine configuration.
//!
//! Loaded once (JSON string or file), validated, then passed by reference.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{PersonaError, Result};
use crate::profile::NoiseParams;
use crate::seed::Channel;

/// Per-channel noise bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Pixel bytes
    pub canvas: NoiseParams,
    /// readPixels bytes
    pub webgl: NoiseParams,
    /// Float audio samples
    pub audio: NoiseParams,
    /// Text metric widths (px)
    pub metrics: NoiseParams,
    /// Timer jitter (ms)
    pub timing: NoiseParams,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            canvas: NoiseParams::new(2.0, 0.002),
            webgl: NoiseParams::new(1.0, 0.001),
            audio: NoiseParams::new(1e-6, 0.01),
            metrics: NoiseParams::new(0.01, 1.0),
            timing: NoiseParams::new(0.02, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Used when the requested geography is unknown
    pub default_geography: String,
    pub timer_precision_ms: f64,
    pub noise: NoiseConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_geography: "US".to_string(),
            timer_precision_ms: 0.1,
            noise: NoiseConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PersonaError::Config(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PersonaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if catalog::geography(&self.default_geography).is_none() {
            return Err(PersonaError::Config(format!(
                "default geography '{}' is not in the catalog",
                self.default_geography
            )));
        }

        if !self.timer_precision_ms.is_finite() || self.timer_precision_ms <= 0.0 {
            return Err(PersonaError::Config(format!(
                "timerPrecisionMs must be positive, got {}",
                self.timer_precision_ms
            )));
        }

        for channel in Channel::ALL.into_iter().filter(|c| c.is_noise()) {
            let p = self.noise_params(channel);
            if !p.amplitude.is_finite() || p.amplitude < 0.0 {
                return Err(PersonaError::Config(format!(
                    "{} amplitude must be finite and non-negative, got {}",
                    channel, p.amplitude
                )));
            }
            if !p.density.is_finite() || !(0.0..=1.0).contains(&p.density) {
                return Err(PersonaError::Config(format!(
                    "{} density must be within [0, 1], got {}",
                    channel, p.density
                )));
            }
        }

        if self.noise.canvas.amplitude > 127.0 || self.noise.webgl.amplitude > 127.0 {
            return Err(PersonaError::Config(
                "byte noise amplitude is capped at 127".to_string(),
            ));
        }

        if self.noise.timing.amplitude > self.timer_precision_ms {
            return Err(PersonaError::Config(format!(
                "timing amplitude {} exceeds timer precision {}",
                self.noise.timing.amplitude, self.timer_precision_ms
            )));
        }

        Ok(())
    }

    /// Bounds carried for `channel`. Selection channels carry none.
    pub fn noise_params(&self, channel: Channel) -> NoiseParams {
        match channel {
            Channel::Canvas => self.noise.canvas,
            Channel::Webgl => self.noise.webgl,
            Channel::Audio => self.noise.audio,
            Channel::Metrics => self.noise.metrics,
            Channel::Timing => self.noise.timing,
            Channel::Navigator
            | Channel::Hardware
            | Channel::Screen
            | Channel::Gpu
            | Channel::Fonts => NoiseParams::DISABLED,
        }
    }
}
