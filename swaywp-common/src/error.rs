use std::path::PathBuf;
use thiserror::Error;

/// Main error type for swaywp operations
#[derive(Error, Debug)]
pub enum SwaywpError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image discovery error: {0}")]
    ImageDiscovery(#[from] ImageDiscoveryError),

    #[error("Process execution error: {0}")]
    Process(#[from] ProcessError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Unexpected error: {message}")]
    Internal { message: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to write configuration file: {path:?}")]
    FileWrite { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse TOML configuration: {message}")]
    TomlParse { message: String },

    #[error("Missing required configuration: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Image discovery errors
#[derive(Error, Debug)]
pub enum ImageDiscoveryError {
    #[error("Failed to read directory: {path:?}")]
    DirectoryRead { path: PathBuf, source: std::io::Error },

    #[error("No images found in directory: {path:?}")]
    NoImagesFound { path: PathBuf },
}

/// Process execution errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Command execution failed: {command}")]
    Execution { command: String, source: std::io::Error },

    #[error("{command} returned non-zero exit code: {code}")]
    NonZeroExit { command: String, code: i32, stderr: String },
}

/// Errors raised while enabling or disabling session persistence
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path:?}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Failed to read {path:?}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to remove {path:?}")]
    Remove { path: PathBuf, source: std::io::Error },

    #[error("Session startup configuration not found: {path:?}")]
    SessionConfigMissing { path: PathBuf },
}

/// Missing helper binaries
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("Missing required programs: {}", tools.join(", "))]
    Missing { tools: Vec<String> },
}

/// Errors caused by what the user asked for, never by an internal fault
#[derive(Error, Debug)]
pub enum InputError {
    #[error("File does not exist: {path:?}")]
    NotFound { path: PathBuf },

    #[error("Not a regular file: {path:?}")]
    NotAFile { path: PathBuf },

    #[error("Unsupported image format: {path:?}")]
    UnsupportedFormat { path: PathBuf },
}

/// Closed set of error classes. Everything user-facing is derived from this,
/// never from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    TransientIo,
    MissingDependency,
    Persistence,
    UserInput,
    Internal,
}

impl ErrorKind {
    /// Notification title and icon for each class.
    pub fn notification(self) -> (&'static str, &'static str) {
        match self {
            ErrorKind::Configuration => ("Configuration Error", "dialog-error"),
            ErrorKind::TransientIo => ("Wallpaper Warning", "dialog-warning"),
            ErrorKind::MissingDependency => ("Missing Dependencies", "dialog-error"),
            ErrorKind::Persistence => ("Persistence Error", "dialog-error"),
            ErrorKind::UserInput => ("Error", "dialog-error"),
            ErrorKind::Internal => ("Auto Mode Error", "dialog-error"),
        }
    }

    /// Process exit status used by the binary.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::UserInput => 2,
            _ => 1,
        }
    }

    /// Whether a rotation tick may absorb this error and keep going.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::TransientIo)
    }
}

impl SwaywpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwaywpError::Config(_) => ErrorKind::Configuration,
            SwaywpError::ImageDiscovery(_) | SwaywpError::Process(_) => ErrorKind::TransientIo,
            SwaywpError::Persistence(_) => ErrorKind::Persistence,
            SwaywpError::Dependency(_) => ErrorKind::MissingDependency,
            SwaywpError::Input(_) => ErrorKind::UserInput,
            SwaywpError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SwaywpError::Internal { message: message.into() }
    }
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, SwaywpError>;

impl From<toml::de::Error> for SwaywpError {
    fn from(err: toml::de::Error) -> Self {
        SwaywpError::Config(ConfigError::TomlParse {
            message: err.to_string(),
        })
    }
}

// Error reporting utilities
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for SwaywpError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {:?}", context, self);
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SwaywpError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Could not read configuration file {:?}", path)
            }
            SwaywpError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            SwaywpError::Config(ConfigError::InvalidValue { field, value })
                if field == "rotation_interval_minutes" =>
            {
                format!(
                    "'rotation_interval_minutes' must be a whole number of minutes >= 1 (got '{}')",
                    value
                )
            }
            SwaywpError::Config(ConfigError::MissingField { field }) => {
                format!("'{}' is not set in the configuration file", field)
            }
            SwaywpError::ImageDiscovery(ImageDiscoveryError::DirectoryRead { path, .. }) => {
                format!(
                    "The wallpaper folder {:?} does not exist. Edit the configuration file.",
                    path
                )
            }
            SwaywpError::ImageDiscovery(ImageDiscoveryError::NoImagesFound { path }) => {
                format!("No images found in {:?}", path)
            }
            SwaywpError::Process(ProcessError::Execution { command, .. }) => {
                format!("Could not run '{}'", command)
            }
            SwaywpError::Persistence(PersistenceError::SessionConfigMissing { path }) => {
                format!("Session configuration {:?} does not exist; persistence needs it", path)
            }
            SwaywpError::Dependency(DependencyError::Missing { tools }) => {
                format!(
                    "Missing required programs: {}. Install them and try again.",
                    tools.join(", ")
                )
            }
            SwaywpError::Input(InputError::NotFound { path }) => {
                format!("The file {:?} does not exist.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error_user_friendly_message() {
        let error = ConfigError::FileRead {
            path: PathBuf::from("/nonexistent/config.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "File not found"),
        };
        let swaywp_error = SwaywpError::Config(error);

        let message = swaywp_error.user_friendly_message();
        assert!(message.contains("configuration file"));
        assert!(message.contains("/nonexistent/config.toml"));
        assert_eq!(swaywp_error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_interval_message_names_the_key() {
        let error = SwaywpError::Config(ConfigError::InvalidValue {
            field: "rotation_interval_minutes".to_string(),
            value: "abc".to_string(),
        });

        let message = error.user_friendly_message();
        assert!(message.contains("rotation_interval_minutes"));
        assert!(message.contains("abc"));
    }

    #[test]
    fn test_kind_classification() {
        let process = SwaywpError::Process(ProcessError::NonZeroExit {
            command: "wal".to_string(),
            code: 1,
            stderr: String::new(),
        });
        assert_eq!(process.kind(), ErrorKind::TransientIo);
        assert!(process.kind().is_transient());

        let input = SwaywpError::Input(InputError::UnsupportedFormat {
            path: PathBuf::from("/tmp/notes.txt"),
        });
        assert_eq!(input.kind(), ErrorKind::UserInput);
        assert_eq!(input.kind().exit_code(), 2);

        let internal = SwaywpError::internal("boom");
        assert!(!internal.kind().is_transient());
        assert_eq!(internal.kind().exit_code(), 1);
    }

    #[test]
    fn test_dependency_message_lists_tools() {
        let error = SwaywpError::Dependency(DependencyError::Missing {
            tools: vec!["swaybg".to_string(), "rofi".to_string()],
        });

        let message = error.user_friendly_message();
        assert!(message.contains("swaybg, rofi"));
        assert_eq!(error.kind().notification().0, "Missing Dependencies");
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Table>("not = [valid").unwrap_err();
        let swaywp_error: SwaywpError = toml_error.into();

        match swaywp_error {
            SwaywpError::Config(ConfigError::TomlParse { .. }) => {}
            _ => panic!("Expected ConfigError::TomlParse"),
        }
    }
}
