//! Cross-platform path utilities for Pitchy.
//!
//! This is the single source of truth for where Pitchy keeps its files.
//!
//! # Platform Behavior
//!
//! | Platform | Data Directory | Config Directory |
//! |----------|----------------|------------------|
//! | Linux    | `~/.local/share/pitchy` | `~/.config/pitchy` |
//! | macOS    | `~/Library/Application Support/pitchy` | Same as data dir |
//! | Windows  | `%APPDATA%/pitchy` | Same as data dir |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Could not determine config directory")]
    NoConfigDirectory,
}

/// Application identifier used in path construction.
pub const APP_NAME: &str = "pitchy";

/// Name of the CLI configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Create `dir` (and parents) if missing.
///
/// On Unix a newly created directory gets mode 0o700.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms)
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }

    Ok(())
}

/// Get the application data directory.
///
/// Creates the directory if it doesn't exist.
///
/// # Platform Behavior
/// - **Linux**: `~/.local/share/pitchy`
/// - **macOS**: `~/Library/Application Support/pitchy`
/// - **Windows**: `%APPDATA%/pitchy`
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);
    ensure_dir(&data_dir)?;
    Ok(data_dir)
}

/// Get the default directory for saved recordings.
///
/// - All platforms: `<data_dir>/recordings`
pub fn get_recordings_dir() -> Result<PathBuf> {
    let recordings_dir = get_data_dir()?.join("recordings");
    ensure_dir(&recordings_dir)?;
    Ok(recordings_dir)
}

/// Get the configuration directory.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/pitchy`
/// - **macOS/Windows**: config lives with data
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoConfigDirectory)?;
        let config_dir = config_base.join(APP_NAME);
        ensure_dir(&config_dir)?;
        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Path of the CLI configuration file (the file itself may not exist).
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}
