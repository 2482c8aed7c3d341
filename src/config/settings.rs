//! User-facing pipeline settings. All values are validated here at the
//! boundary so the normalizer and filters never see an out-of-range value.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{path, ConfigError, LoadError};

/// Allowed range for the translation and rotation sensitivity multipliers
const SENSITIVITY_RANGE: (f64, f64) = (0.1, 10.0);
/// Allowed range for the deadzone threshold
const THRESHOLD_RANGE: (f64, f64) = (0.001, 0.1);
/// Allowed range for the publish interval in milliseconds
const UPDATE_INTERVAL_RANGE: (u64, u64) = (1, 100);
/// Allowed range for the device reconnect delay in milliseconds
const RECONNECT_DELAY_RANGE: (u64, u64) = (100, 10_000);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Sensitivity multiplier for the x/y/z axes
    pub translation_sensitivity: f64,
    /// Sensitivity multiplier for the roll/pitch/yaw axes
    pub rotation_sensitivity: f64,
    /// Publish interval for motion samples in milliseconds
    pub update_interval_ms: u64,
    /// Minimum normalized magnitude below which an axis reads as zero
    pub threshold: f64,
    /// Kalman process-noise variance
    pub kalman_q: f64,
    /// Kalman measurement-noise variance
    pub kalman_r: f64,
    /// Kalman error covariance after a reset
    pub initial_covariance: f64,
    /// Delay between device reconnection attempts in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            translation_sensitivity: 1.0,
            rotation_sensitivity: 1.0,
            update_interval_ms: 16,
            threshold: 0.01,
            kalman_q: 0.0005,
            kalman_r: 0.3,
            initial_covariance: 1000.0,
            reconnect_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from the given YAML file, rejecting out-of-range values
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the user settings file, falling back to defaults if it is
    /// missing or invalid. An invalid file is left untouched.
    pub fn load_or_default() -> Self {
        let Some(settings_path) = path::find_settings_file() else {
            log::debug!("No settings file found; using defaults");
            return Self::default();
        };
        match Self::from_yaml_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Unable to load settings {settings_path:?}: {e}; using defaults");
                Self::default()
            }
        }
    }

    /// Persist the settings to the user settings file
    pub fn save(&self) -> Result<(), LoadError> {
        self.validate()?;
        let Some(settings_path) = path::place_settings_file() else {
            return Ok(());
        };
        let content = serde_yaml::to_string(self)?;
        std::fs::write(settings_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "translation_sensitivity",
            self.translation_sensitivity,
            SENSITIVITY_RANGE,
        )?;
        check_range(
            "rotation_sensitivity",
            self.rotation_sensitivity,
            SENSITIVITY_RANGE,
        )?;
        check_range("threshold", self.threshold, THRESHOLD_RANGE)?;
        check_range(
            "update_interval_ms",
            self.update_interval_ms as f64,
            (
                UPDATE_INTERVAL_RANGE.0 as f64,
                UPDATE_INTERVAL_RANGE.1 as f64,
            ),
        )?;
        check_range(
            "reconnect_delay_ms",
            self.reconnect_delay_ms as f64,
            (
                RECONNECT_DELAY_RANGE.0 as f64,
                RECONNECT_DELAY_RANGE.1 as f64,
            ),
        )?;
        check_range("kalman_q", self.kalman_q, (f64::MIN_POSITIVE, f64::MAX))?;
        check_range("kalman_r", self.kalman_r, (f64::MIN_POSITIVE, f64::MAX))?;
        check_range(
            "initial_covariance",
            self.initial_covariance,
            (f64::MIN_POSITIVE, f64::MAX),
        )?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the sensitivity for the given axis kind
    pub fn sensitivity(&self, is_rotation: bool) -> f64 {
        if is_rotation {
            self.rotation_sensitivity
        } else {
            self.translation_sensitivity
        }
    }
}

fn check_range(setting: &'static str, value: f64, range: (f64, f64)) -> Result<(), ConfigError> {
    let (min, max) = range;
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            setting,
            value,
            min,
            max,
        });
    }
    Ok(())
}
