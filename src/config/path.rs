//! Module for searching for spacemoused config files

use std::path::PathBuf;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/spacemoused";

/// File name of the device catalog
const CATALOG_FILE: &str = "devices.yaml";

/// File name of the user settings document
const SETTINGS_FILE: &str = "settings.yaml";

/// Returns the base path for shipped configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("spacemoused") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of paths in load order to find the device catalog.
/// E.g. ["~/.config/spacemoused/devices.yaml", "/etc/spacemoused/devices.yaml"]
pub fn get_catalog_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(user_file) = user_config_file(CATALOG_FILE) {
        paths.push(user_file);
    }
    paths.push(PathBuf::from("/etc/spacemoused").join(CATALOG_FILE));
    paths.push(PathBuf::from("./rootfs/usr/share/spacemoused").join(CATALOG_FILE));
    paths.push(get_base_path().join(CATALOG_FILE));

    paths
}

/// Returns the first existing device catalog file in load order
pub fn find_catalog_file() -> Option<PathBuf> {
    get_catalog_paths().into_iter().find(|path| path.exists())
}

/// Returns the user-writable path for the device catalog, creating its
/// parent directories if needed
pub fn place_catalog_file() -> Option<PathBuf> {
    place_user_config_file(CATALOG_FILE)
}

/// Returns the user settings file if one exists
pub fn find_settings_file() -> Option<PathBuf> {
    user_config_file(SETTINGS_FILE).filter(|path| path.exists())
}

/// Returns the user-writable path for the settings document, creating its
/// parent directories if needed
pub fn place_settings_file() -> Option<PathBuf> {
    place_user_config_file(SETTINGS_FILE)
}

fn user_config_file(name: &str) -> Option<PathBuf> {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("spacemoused") else {
        return None;
    };
    Some(base_dirs.get_config_home().join(name))
}

fn place_user_config_file(name: &str) -> Option<PathBuf> {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("spacemoused") else {
        log::warn!("Unable to determine user config path for {name}");
        return None;
    };
    match base_dirs.place_config_file(name) {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("Unable to create user config path for {name}: {e}");
            None
        }
    }
}
