// Tab Positioner platform abstraction
// Provides the platform-specific config path for the file-backed settings
// store used by the demo binary.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/tab-positioner` (or `$XDG_CONFIG_HOME/tab-positioner`)
/// - **macOS**: `~/Library/Application Support/TabPositioner`
/// - **Windows**: `%APPDATA%/TabPositioner`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}
