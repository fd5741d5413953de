use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SwaywpError};
use crate::Result;

const APP_DIR: &str = "swaywp";

/// Every filesystem location the tool touches, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_file: PathBuf,
    /// Holds the restore script and the last-wallpaper state file.
    pub data_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    /// Window-manager startup configuration that receives the hook line.
    pub session_config: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or(SwaywpError::Config(ConfigError::NoConfigDir))?;
        let data_dir = dirs::data_dir().unwrap_or_else(|| config_dir.clone());
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("/tmp"));

        Ok(Self {
            config_file: config_dir.join(APP_DIR).join("config.toml"),
            data_dir: data_dir.join(APP_DIR),
            thumbnail_dir: cache_dir.join(APP_DIR).join("thumbnails"),
            session_config: config_dir.join("sway").join("config"),
        })
    }

    /// All locations under one root; used by tests and for relocatable setups.
    pub fn under(root: &Path) -> Self {
        Self {
            config_file: root.join("config").join(APP_DIR).join("config.toml"),
            data_dir: root.join("data").join(APP_DIR),
            thumbnail_dir: root.join("cache").join(APP_DIR).join("thumbnails"),
            session_config: root.join("config").join("sway").join("config"),
        }
    }

    pub fn with_session_config(mut self, session_config: Option<PathBuf>) -> Self {
        if let Some(path) = session_config {
            self.session_config = path;
        }
        self
    }

    pub fn restore_script(&self) -> PathBuf {
        self.data_dir.join("restore-wallpaper.sh")
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("last_wallpaper")
    }
}

/// Path with a leading `~` resolved against the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
