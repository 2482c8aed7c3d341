pub mod path;
pub mod settings;

#[cfg(test)]
mod config_test;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::axis::Axis;

/// Default catalog shipped with the daemon, used when no catalog file exists
const BUILTIN_CATALOG: &str = include_str!("../../rootfs/usr/share/spacemoused/devices.yaml");

/// Represents all possible errors loading a [DeviceCatalog] or [settings::Settings]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Unable to deserialize: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid value: {0}")]
    Invalid(#[from] ConfigError),
}

/// Validation errors for catalog entries and settings values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("axis '{0}' is missing from the mappings")]
    MissingAxis(Axis),
    #[error("axis sign must be +1 or -1, got {0}")]
    InvalidSign(i8),
    #[error("axis scale must be a positive number, got {0}")]
    InvalidAxisScale(f64),
    #[error("button bit index {0} is out of range 0-7")]
    BitOutOfRange(u8),
    #[error("hid id {0:#06x}:{1:#06x} is already used by '{2}'")]
    DuplicateHidId(u16, u16, String),
    #[error("{setting} value {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        setting: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Describes where one axis value lives in a raw report: the report ID it
/// arrives on, the offsets of the two bytes forming a little-endian i16
/// (index 0 is the report-ID byte itself), and the sign to apply after
/// decoding. The two bytes are contiguous on every known device, but
/// nothing here requires that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawAxisSpec", into = "RawAxisSpec")]
pub struct AxisSpec {
    pub channel: u8,
    pub byte1: usize,
    pub byte2: usize,
    pub sign: i8,
}

/// Declarative form of an [AxisSpec]: `[channel, byte1, byte2, sign]`
type RawAxisSpec = (u8, usize, usize, i8);

impl TryFrom<RawAxisSpec> for AxisSpec {
    type Error = ConfigError;

    fn try_from(raw: RawAxisSpec) -> Result<Self, Self::Error> {
        let (channel, byte1, byte2, sign) = raw;
        // Legacy catalogs stored a per-axis "scale" here. Only a bare sign
        // is accepted; device magnitude belongs in axis_scale.
        if sign != 1 && sign != -1 {
            return Err(ConfigError::InvalidSign(sign));
        }
        Ok(Self {
            channel,
            byte1,
            byte2,
            sign,
        })
    }
}

impl From<AxisSpec> for RawAxisSpec {
    fn from(spec: AxisSpec) -> Self {
        (spec.channel, spec.byte1, spec.byte2, spec.sign)
    }
}

/// Describes where one button bit lives in a raw report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawButtonSpec", into = "RawButtonSpec")]
pub struct ButtonSpec {
    pub channel: u8,
    pub byte: usize,
    pub bit: u8,
}

/// Declarative form of a [ButtonSpec]: `[channel, byte, bit]`
type RawButtonSpec = (u8, usize, u8);

impl TryFrom<RawButtonSpec> for ButtonSpec {
    type Error = ConfigError;

    fn try_from(raw: RawButtonSpec) -> Result<Self, Self::Error> {
        let (channel, byte, bit) = raw;
        if bit > 7 {
            return Err(ConfigError::BitOutOfRange(bit));
        }
        Ok(Self { channel, byte, bit })
    }
}

impl From<ButtonSpec> for RawButtonSpec {
    fn from(spec: ButtonSpec) -> Self {
        (spec.channel, spec.byte, spec.bit)
    }
}

/// Describes how to decode one supported device's raw reports into the six
/// motion axes and its buttons
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceProfile {
    #[serde(default)]
    pub name: String,
    /// Vendor and product ID
    pub hid_id: (u16, u16),
    /// Raw integer magnitude that maps to full deflection on this device
    pub axis_scale: f64,
    /// Where each of the six axes lives in the raw reports
    pub mappings: BTreeMap<Axis, AxisSpec>,
    #[serde(default)]
    pub button_mapping: Vec<ButtonSpec>,
}

impl DeviceProfile {
    pub fn vendor_id(&self) -> u16 {
        self.hid_id.0
    }

    pub fn product_id(&self) -> u16 {
        self.hid_id.1
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.hid_id == (vendor_id, product_id)
    }

    /// Validate the profile invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in Axis::ALL {
            if !self.mappings.contains_key(&axis) {
                return Err(ConfigError::MissingAxis(axis));
            }
        }
        if !(self.axis_scale > 0.0) {
            return Err(ConfigError::InvalidAxisScale(self.axis_scale));
        }
        Ok(())
    }

    /// Returns the largest byte offset the profile references on the given
    /// channel, or `None` if the profile does not use that channel at all.
    pub fn max_offset_for_channel(&self, channel: u8) -> Option<usize> {
        let axis_offsets = self
            .mappings
            .values()
            .filter(|spec| spec.channel == channel)
            .flat_map(|spec| [spec.byte1, spec.byte2]);
        let button_offsets = self
            .button_mapping
            .iter()
            .filter(|spec| spec.channel == channel)
            .map(|spec| spec.byte);
        axis_offsets.chain(button_offsets).max()
    }
}

/// A catalog of device profiles keyed by display name, loaded from a
/// declarative YAML source. Malformed entries are rejected individually;
/// the rest of the catalog stays usable.
#[derive(Debug, Default)]
pub struct DeviceCatalog {
    profiles: BTreeMap<String, DeviceProfile>,
    /// Entries rejected during the last load, with the reason
    rejected: Vec<(String, String)>,
    /// File the catalog was loaded from and persists back to
    source: Option<PathBuf>,
}

impl DeviceCatalog {
    /// Load a [DeviceCatalog] from the given YAML string
    pub fn from_yaml(content: &str) -> Result<Self, LoadError> {
        let entries: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
        let mut catalog = Self::default();
        for (name, value) in entries {
            let profile = match serde_yaml::from_value::<DeviceProfile>(value) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!("Rejecting catalog entry '{name}': {e}");
                    catalog.rejected.push((name, e.to_string()));
                    continue;
                }
            };
            if let Err(e) = catalog.insert(name.clone(), profile) {
                log::warn!("Rejecting catalog entry '{name}': {e}");
                catalog.rejected.push((name, e.to_string()));
            }
        }
        Ok(catalog)
    }

    /// Load a [DeviceCatalog] from the given YAML file. The catalog will
    /// persist changes back to this file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut catalog = Self::from_yaml(&content)?;
        catalog.source = Some(path.as_ref().to_path_buf());
        Ok(catalog)
    }

    /// Returns the compiled-in default catalog
    pub fn builtin() -> Self {
        // The shipped catalog is validated by tests, so a parse failure here
        // is a packaging bug.
        Self::from_yaml(BUILTIN_CATALOG).unwrap_or_else(|e| {
            log::error!("Built-in device catalog is malformed: {e}");
            Self::default()
        })
    }

    /// Find the catalog to use: the first existing file in the search
    /// paths, or the compiled-in defaults if none is found.
    pub fn discover() -> Self {
        let Some(catalog_path) = path::find_catalog_file() else {
            log::info!("No device catalog file found; using built-in profiles");
            return Self::builtin();
        };
        log::debug!("Loading device catalog from {catalog_path:?}");
        match Self::from_yaml_file(&catalog_path) {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("Unable to load catalog {catalog_path:?}: {e}");
                Self::builtin()
            }
        }
    }

    /// Find the profile matching the given vendor/product ID pair
    pub fn lookup(&self, vendor_id: u16, product_id: u16) -> Option<&DeviceProfile> {
        self.profiles
            .values()
            .find(|profile| profile.matches(vendor_id, product_id))
    }

    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.values()
    }

    /// Entries rejected during load, with the rejection reason
    pub fn rejected(&self) -> &[(String, String)] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Add a new profile or replace the one with the same name, persisting
    /// the catalog back to its source file.
    pub fn add_or_update(&mut self, profile: DeviceProfile) -> Result<(), LoadError> {
        let name = profile.name.clone();
        self.profiles.remove(&name);
        self.insert(name, profile)?;
        self.save()
    }

    /// Remove a profile by name, persisting the catalog back to its source
    /// file. Returns false if no such profile exists.
    pub fn remove(&mut self, name: &str) -> Result<bool, LoadError> {
        if self.profiles.remove(name).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Write the catalog back to its source file, if it has one
    pub fn save(&self) -> Result<(), LoadError> {
        let Some(source) = self.source.as_ref() else {
            return Ok(());
        };
        self.save_to(source)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(&self.profiles)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Set the file the catalog persists to
    pub fn set_source<P: AsRef<Path>>(&mut self, path: P) {
        self.source = Some(path.as_ref().to_path_buf());
    }

    /// Import profiles from a legacy `devices.json` catalog. Entries keep
    /// their JSON shape except that hid_id elements may be hex strings
    /// ("0x046D"). Malformed entries are skipped. Returns the number of
    /// profiles imported.
    pub fn import_legacy_json<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, LoadError> {
        let file = std::fs::File::open(path.as_ref())?;
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_reader(file)?;
        let mut imported = 0;
        for (name, mut value) in entries {
            normalize_legacy_hid_id(&mut value);
            let mut profile = match serde_json::from_value::<DeviceProfile>(value) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!("Skipping legacy entry '{name}': {e}");
                    continue;
                }
            };
            profile.name = name.clone();
            if let Err(e) = self.insert(name.clone(), profile) {
                log::warn!("Skipping legacy entry '{name}': {e}");
                continue;
            }
            imported += 1;
        }
        self.save()?;
        Ok(imported)
    }

    /// Validate and insert a profile under the given name. The profile's
    /// name field is set to the catalog key.
    fn insert(&mut self, name: String, mut profile: DeviceProfile) -> Result<(), ConfigError> {
        profile.name = name.clone();
        profile.validate()?;
        let (vendor_id, product_id) = profile.hid_id;
        if let Some(existing) = self.lookup(vendor_id, product_id) {
            if existing.name != name {
                return Err(ConfigError::DuplicateHidId(
                    vendor_id,
                    product_id,
                    existing.name.clone(),
                ));
            }
        }
        self.profiles.insert(name, profile);
        Ok(())
    }
}

/// Legacy catalogs store hid_id elements as hex strings like "0x046D".
/// Rewrite them to plain integers so the typed parse accepts them.
fn normalize_legacy_hid_id(value: &mut serde_json::Value) {
    let Some(hid_id) = value.get_mut("hid_id").and_then(|v| v.as_array_mut()) else {
        return;
    };
    for element in hid_id.iter_mut() {
        let Some(text) = element.as_str() else {
            continue;
        };
        let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) else {
            continue;
        };
        if let Ok(id) = u16::from_str_radix(hex, 16) {
            *element = serde_json::Value::from(id);
        }
    }
}
