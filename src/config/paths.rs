//! Platform-specific data directory paths.
//!
//!   Windows: %APPDATA%/poise
//!   macOS:   ~/Library/Application Support/poise
//!   Linux:   $XDG_CONFIG_HOME/poise (default ~/.config)

use std::path::PathBuf;

const APP_DIR: &str = "poise";

/// Get the data directory (cross-platform). `POISE_DATA_DIR` overrides it.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("POISE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    get_config_base().join(APP_DIR)
}

/// Directory holding rolling log files.
pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Default directory for saved answer records and session summaries.
pub fn get_results_dir() -> PathBuf {
    get_data_dir().join("results")
}

/// Get the platform-appropriate base config directory.
fn get_config_base() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata);
        }
        dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("AppData")
                .join("Roaming")
        })
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Application Support")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    }
}
