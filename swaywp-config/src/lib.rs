use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use swaywp_common::error::ConfigError;
use swaywp_common::rotation::INTERVAL_FIELD;
use swaywp_common::{
    expand_tilde, FitMode, OutputConfig, Result, RotationOrder, RotationSettings, SwaywpError,
};

const DEFAULT_CONFIG: &str = r#"# sway-wallpaper configuration

[settings]
# Folder scanned for images (jpg, jpeg, png, gif, bmp, webp). Not recursive.
wallpaper_folder = "~/wallpaper"

# Minutes between changes in auto mode. Whole number, at least 1.
rotation_interval_minutes = 30

# "random" or "sequential" (file name order).
rotation_order = "random"

# swaybg output selector; "*" means every output.
swaybg_output = "*"

# stretch, fit, fill, center, tile or solid_color.
swaybg_mode = "fill"

# Run wal after each change to regenerate the color palette.
generate_palette = true

# Startup configuration that receives the persistence hook.
# session_config = "~/.config/sway/config"
"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub wallpaper_folder: Option<String>,
    #[serde(default = "default_interval")]
    pub rotation_interval_minutes: RawInterval,
    #[serde(default)]
    pub rotation_order: RotationOrder,
    #[serde(default = "default_output")]
    pub swaybg_output: String,
    #[serde(default)]
    pub swaybg_mode: FitMode,
    #[serde(default = "default_generate_palette")]
    pub generate_palette: bool,
    #[serde(default)]
    pub session_config: Option<String>,
}

/// The interval as written. Any TOML value loads; it is only rejected when a
/// mode that needs the interval validates it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawInterval {
    Minutes(i64),
    Text(String),
    Other(toml::Value),
}

impl std::fmt::Display for RawInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawInterval::Minutes(m) => write!(f, "{}", m),
            RawInterval::Text(s) => f.write_str(s),
            RawInterval::Other(v) => write!(f, "{}", v),
        }
    }
}

// Default values
fn default_interval() -> RawInterval {
    RawInterval::Minutes(30)
}

fn default_output() -> String {
    "*".to_string()
}

fn default_generate_palette() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallpaper_folder: None,
            rotation_interval_minutes: default_interval(),
            rotation_order: RotationOrder::default(),
            swaybg_output: default_output(),
            swaybg_mode: FitMode::default(),
            generate_palette: default_generate_palette(),
            session_config: None,
        }
    }
}

impl Config {
    /// Loads `path`, writing the documented defaults there first if it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::write_default(path)?;
            log::info!("Created default configuration at {:?}", path);
        }
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SwaywpError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }))?;

        let config: Config = toml::from_str(&content)?;
        log::debug!("Loaded configuration from {:?}: {:?}", path, config.settings);
        Ok(config)
    }

    pub fn write_default(path: &Path) -> Result<()> {
        let write_err = |e| {
            SwaywpError::Config(ConfigError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(write_err)
    }

    pub fn wallpaper_folder(&self) -> Result<PathBuf> {
        match self.settings.wallpaper_folder.as_deref().map(str::trim) {
            Some(folder) if !folder.is_empty() => Ok(expand_tilde(folder)),
            _ => Err(SwaywpError::Config(ConfigError::MissingField {
                field: "wallpaper_folder".to_string(),
            })),
        }
    }

    /// The interval as an integer. Range checks happen in [`RotationSettings::new`].
    pub fn rotation_interval_minutes(&self) -> Result<i64> {
        match &self.settings.rotation_interval_minutes {
            RawInterval::Minutes(m) => Ok(*m),
            RawInterval::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid_interval(s)),
            other => Err(invalid_interval(&other.to_string())),
        }
    }

    /// Everything auto mode needs, validated.
    pub fn rotation_settings(&self) -> Result<RotationSettings> {
        let minutes = self.rotation_interval_minutes()?;
        let folder = self.wallpaper_folder()?;
        RotationSettings::new(folder, minutes, self.settings.rotation_order)
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            output: self.settings.swaybg_output.clone(),
            mode: self.settings.swaybg_mode,
            generate_palette: self.settings.generate_palette,
        }
    }

    pub fn session_config(&self) -> Option<PathBuf> {
        self.settings.session_config.as_deref().map(expand_tilde)
    }
}

fn invalid_interval(value: &str) -> SwaywpError {
    SwaywpError::Config(ConfigError::InvalidValue {
        field: INTERVAL_FIELD.to_string(),
        value: value.to_string(),
    })
}
