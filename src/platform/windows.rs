// Tab Positioner platform paths for Windows
// Config: %APPDATA%/TabPositioner

use std::env;
use std::path::PathBuf;

/// Returns the configuration directory on Windows.
/// `%APPDATA%/TabPositioner`
pub fn get_config_dir() -> PathBuf {
    let appdata = env::var("APPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("TabPositioner")
}
