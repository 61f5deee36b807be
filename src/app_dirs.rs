//! Where gaitfog keeps its own files: run logs and the default `gaitfog.toml`.
//!
//! Everything sits in one `.gaitfog` folder under the OS config directory.
//! Setting `GAITFOG_CONFIG_HOME` moves that folder's parent, e.g. to a
//! writable scratch path on Kaggle or a temp dir in tests. An empty value is
//! treated as unset.

use std::ffi::OsString;
use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Folder created under the config root.
pub const APP_DIR_NAME: &str = ".gaitfog";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "GAITFOG_CONFIG_HOME";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    /// Neither `GAITFOG_CONFIG_HOME` nor an OS config directory is available.
    #[error("Cannot locate a config root; set {CONFIG_HOME_ENV}")]
    NoBaseDir,
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.gaitfog` folder, created on first use.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let os_config = BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf());
    let base = choose_base(std::env::var_os(CONFIG_HOME_ENV), os_config)
        .ok_or(AppDirError::NoBaseDir)?;
    create_dir(base.join(APP_DIR_NAME))
}

/// Per-run log files written by [`crate::logging::init`].
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

fn choose_base(env_value: Option<OsString>, os_config: Option<PathBuf>) -> Option<PathBuf> {
    env_value
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or(os_config)
}

fn create_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    if !path.is_dir() {
        std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}
