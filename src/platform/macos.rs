// Tab Positioner platform paths for macOS
// Config: ~/Library/Application Support/TabPositioner

use std::env;
use std::path::PathBuf;

/// Returns the configuration directory on macOS.
/// `~/Library/Application Support/TabPositioner`
pub fn get_config_dir() -> PathBuf {
    let home = PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")));
    home.join("Library")
        .join("Application Support")
        .join("TabPositioner")
}
