use dirs::home_dir;
use std::path::PathBuf;

/// Returns the clib configuration directory, or None if the user's home cannot be resolved.
pub fn try_clib_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("CLIB_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".clib"))
}

/// Default config file: ~/.clib/config.json
pub fn config_path() -> Option<PathBuf> {
    try_clib_home().map(|home| home.join("config.json"))
}

/// Default aggregate build-fragment list, relative to the working directory.
pub fn default_aggregate_path() -> PathBuf {
    PathBuf::from("deps.mk")
}
