use crate::config::settings::Settings;

use super::axis::Axis;

/// Convert a raw signed axis value into the [-1.0, 1.0] range. The profile's
/// axis_scale maps the device's raw magnitude to full deflection, the
/// sensitivity multiplier is applied on top, and anything below the deadzone
/// threshold reads as zero.
pub fn normalize(raw: i16, axis_scale: f64, sensitivity: f64, threshold: f64) -> f64 {
    let value = (raw as f64 / axis_scale) * sensitivity;
    let value = value.clamp(-1.0, 1.0);
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Applies one device's axis scale and the user's sensitivity and deadzone
/// settings. Raw magnitude varies per physical device, but sensitivity and
/// deadzone must behave the same on all of them.
#[derive(Debug, Clone)]
pub struct Normalizer {
    axis_scale: f64,
    translation_sensitivity: f64,
    rotation_sensitivity: f64,
    threshold: f64,
}

impl Normalizer {
    /// Settings are validated at the configuration boundary before they
    /// reach here.
    pub fn new(axis_scale: f64, settings: &Settings) -> Self {
        Self {
            axis_scale,
            translation_sensitivity: settings.sensitivity(false),
            rotation_sensitivity: settings.sensitivity(true),
            threshold: settings.threshold,
        }
    }

    pub fn normalize(&self, axis: Axis, raw: i16) -> f64 {
        let sensitivity = if axis.is_rotation() {
            self.rotation_sensitivity
        } else {
            self.translation_sensitivity
        };
        normalize(raw, self.axis_scale, sensitivity, self.threshold)
    }
}
