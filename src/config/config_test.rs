use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use crate::config::{
    settings::Settings, AxisSpec, ButtonSpec, ConfigError, DeviceCatalog, DeviceProfile,
};
use crate::input::axis::Axis;

const CATALOG_YAML: &str = r#"
SpaceNavigator:
  hid_id: [1133, 50726]
  axis_scale: 327.0
  mappings:
    x: [1, 1, 2, 1]
    y: [1, 3, 4, -1]
    z: [1, 5, 6, -1]
    roll: [2, 1, 2, -1]
    pitch: [2, 3, 4, -1]
    yaw: [2, 5, 6, 1]
  button_mapping:
    - [3, 1, 0]
    - [3, 1, 1]
"#;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spacemoused-{}-{name}", std::process::id()))
}

#[test]
fn test_load_catalog() -> Result<(), Box<dyn Error>> {
    let catalog = DeviceCatalog::from_yaml(CATALOG_YAML)?;
    assert_eq!(catalog.len(), 1);
    assert!(catalog.rejected().is_empty());

    let profile = catalog.lookup(1133, 50726).expect("profile should match");
    assert_eq!(profile.name, "SpaceNavigator");
    assert_eq!(profile.axis_scale, 327.0);
    for axis in Axis::ALL {
        assert!(profile.mappings.contains_key(&axis));
    }
    assert_eq!(
        profile.mappings[&Axis::Yaw],
        AxisSpec {
            channel: 2,
            byte1: 5,
            byte2: 6,
            sign: 1
        }
    );
    assert_eq!(profile.button_mapping.len(), 2);
    assert!(catalog.lookup(1133, 1).is_none());
    Ok(())
}

#[test]
fn test_missing_axis_rejects_entry() -> Result<(), Box<dyn Error>> {
    // The second entry has no yaw mapping and must be rejected without
    // taking the first entry down with it.
    let yaml = format!(
        "{CATALOG_YAML}
Broken Device:
  hid_id: [1133, 99]
  axis_scale: 327.0
  mappings:
    x: [1, 1, 2, 1]
    y: [1, 3, 4, -1]
    z: [1, 5, 6, -1]
    roll: [2, 1, 2, -1]
    pitch: [2, 3, 4, -1]
"
    );
    let catalog = DeviceCatalog::from_yaml(&yaml)?;
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("Broken Device").is_none());
    assert_eq!(catalog.rejected().len(), 1);
    assert_eq!(catalog.rejected()[0].0, "Broken Device");
    assert!(catalog.rejected()[0]
        .1
        .contains(&ConfigError::MissingAxis(Axis::Yaw).to_string()));
    Ok(())
}

#[test]
fn test_non_unit_sign_rejects_entry() -> Result<(), Box<dyn Error>> {
    // Legacy catalogs sometimes stored a per-axis scale in the sign slot
    let yaml = "
Legacy Device:
  hid_id: [1133, 99]
  axis_scale: 327.0
  mappings:
    x: [1, 1, 2, 2]
    y: [1, 3, 4, -1]
    z: [1, 5, 6, -1]
    roll: [2, 1, 2, -1]
    pitch: [2, 3, 4, -1]
    yaw: [2, 5, 6, 1]
";
    let catalog = DeviceCatalog::from_yaml(yaml)?;
    assert!(catalog.is_empty());
    assert_eq!(catalog.rejected().len(), 1);
    Ok(())
}

#[test]
fn test_button_bit_out_of_range_rejects_entry() -> Result<(), Box<dyn Error>> {
    let yaml = "
Bad Buttons:
  hid_id: [1133, 99]
  axis_scale: 327.0
  mappings:
    x: [1, 1, 2, 1]
    y: [1, 3, 4, -1]
    z: [1, 5, 6, -1]
    roll: [2, 1, 2, -1]
    pitch: [2, 3, 4, -1]
    yaw: [2, 5, 6, 1]
  button_mapping:
    - [3, 1, 8]
";
    let catalog = DeviceCatalog::from_yaml(yaml)?;
    assert!(catalog.is_empty());
    Ok(())
}

#[test]
fn test_duplicate_hid_id_rejects_later_entry() -> Result<(), Box<dyn Error>> {
    let yaml = format!(
        "{CATALOG_YAML}
Z Clone:
  hid_id: [1133, 50726]
  axis_scale: 500.0
  mappings:
    x: [1, 1, 2, 1]
    y: [1, 3, 4, -1]
    z: [1, 5, 6, -1]
    roll: [2, 1, 2, -1]
    pitch: [2, 3, 4, -1]
    yaw: [2, 5, 6, 1]
"
    );
    let catalog = DeviceCatalog::from_yaml(&yaml)?;
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("SpaceNavigator").is_some());
    assert!(catalog.get("Z Clone").is_none());
    assert_eq!(catalog.rejected().len(), 1);
    Ok(())
}

#[test]
fn test_builtin_catalog_is_valid() {
    let catalog = DeviceCatalog::builtin();
    assert!(!catalog.is_empty());
    assert!(catalog.rejected().is_empty());
    assert!(catalog.lookup(1133, 50726).is_some());
}

#[test]
fn test_save_and_reload_round_trip() -> Result<(), Box<dyn Error>> {
    let path = temp_path("catalog.yaml");
    let catalog = DeviceCatalog::from_yaml(CATALOG_YAML)?;
    catalog.save_to(&path)?;

    let mut reloaded = DeviceCatalog::from_yaml_file(&path)?;
    assert_eq!(reloaded.len(), 1);
    assert_eq!(
        reloaded.get("SpaceNavigator"),
        catalog.get("SpaceNavigator")
    );

    // add_or_update persists back to the source file
    let mut profile = catalog.get("SpaceNavigator").unwrap().clone();
    profile.name = "Test Device".to_string();
    profile.hid_id = (1133, 50731);
    reloaded.add_or_update(profile)?;

    let reloaded_again = DeviceCatalog::from_yaml_file(&path)?;
    assert_eq!(reloaded_again.len(), 2);
    assert!(reloaded_again.lookup(1133, 50731).is_some());

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_remove_persists_to_source() -> Result<(), Box<dyn Error>> {
    let path = temp_path("remove.yaml");
    let catalog = DeviceCatalog::from_yaml(CATALOG_YAML)?;
    catalog.save_to(&path)?;

    let mut reloaded = DeviceCatalog::from_yaml_file(&path)?;
    assert!(reloaded.remove("SpaceNavigator")?);
    assert!(!reloaded.remove("SpaceNavigator")?);

    let reloaded_again = DeviceCatalog::from_yaml_file(&path)?;
    assert!(reloaded_again.is_empty());

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_import_legacy_json() -> Result<(), Box<dyn Error>> {
    let json = r#"{
      "SpaceNavigator": {
        "name": "SpaceNavigator",
        "hid_id": ["0x046D", "0xC626"],
        "axis_scale": 327.0,
        "mappings": {
          "x": [1, 1, 2, 1],
          "y": [1, 3, 4, -1],
          "z": [1, 5, 6, -1],
          "roll": [2, 1, 2, -1],
          "pitch": [2, 3, 4, -1],
          "yaw": [2, 5, 6, 1]
        },
        "button_mapping": [[3, 1, 0], [3, 1, 1]]
      },
      "Broken": {
        "hid_id": [1, 2],
        "axis_scale": 327.0,
        "mappings": {
          "x": [1, 1, 2, 1]
        }
      }
    }"#;
    let path = temp_path("legacy.json");
    std::fs::write(&path, json)?;

    let mut catalog = DeviceCatalog::default();
    let imported = catalog.import_legacy_json(&path)?;
    assert_eq!(imported, 1);
    // Hex hid_id strings are converted to the canonical integers
    assert!(catalog.lookup(0x046d, 0xc626).is_some());
    assert!(catalog.get("Broken").is_none());

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_max_offset_for_channel() {
    let mut mappings = BTreeMap::new();
    mappings.insert(
        Axis::X,
        AxisSpec {
            channel: 1,
            byte1: 1,
            byte2: 2,
            sign: 1,
        },
    );
    mappings.insert(
        Axis::Yaw,
        AxisSpec {
            channel: 2,
            byte1: 5,
            byte2: 6,
            sign: 1,
        },
    );
    let profile = DeviceProfile {
        name: "test".to_string(),
        hid_id: (1, 2),
        axis_scale: 327.0,
        mappings,
        button_mapping: vec![ButtonSpec {
            channel: 3,
            byte: 1,
            bit: 0,
        }],
    };
    assert_eq!(profile.max_offset_for_channel(1), Some(2));
    assert_eq!(profile.max_offset_for_channel(2), Some(6));
    assert_eq!(profile.max_offset_for_channel(3), Some(1));
    assert_eq!(profile.max_offset_for_channel(4), None);
}

#[test]
fn test_settings_defaults_are_valid() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_range_enforcement() {
    let mut settings = Settings::default();
    settings.translation_sensitivity = 0.05;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.rotation_sensitivity = 11.0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.threshold = 0.5;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.update_interval_ms = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.update_interval_ms = 200;
    assert!(settings.validate().is_err());

    // Boundary values are allowed
    let mut settings = Settings::default();
    settings.translation_sensitivity = 0.1;
    settings.rotation_sensitivity = 10.0;
    settings.threshold = 0.001;
    settings.update_interval_ms = 100;
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_yaml_round_trip() -> Result<(), Box<dyn Error>> {
    let path = temp_path("settings.yaml");
    let mut settings = Settings::default();
    settings.translation_sensitivity = 2.5;
    settings.update_interval_ms = 20;
    std::fs::write(&path, serde_yaml::to_string(&settings)?)?;

    let loaded = Settings::from_yaml_file(&path)?;
    assert_eq!(loaded, settings);

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_invalid_settings_file_is_rejected() -> Result<(), Box<dyn Error>> {
    let path = temp_path("bad-settings.yaml");
    std::fs::write(&path, "threshold: 0.9\n")?;
    assert!(Settings::from_yaml_file(&path).is_err());
    std::fs::remove_file(&path)?;
    Ok(())
}
