pub mod rotation_cursor;
pub mod image_discovery;
pub mod command_builder;
pub mod executor;
pub mod notify;
pub mod session_env;
pub mod rotation;
pub mod persistence;
pub mod dependencies;
pub mod picker;
pub mod paths;
pub mod error;

pub use rotation_cursor::{RotationCursor, RotationOrder};
pub use image_discovery::{FolderImages, ImageDiscovery, ImageSource};
pub use command_builder::{CommandBuilder, FitMode, OutputConfig};
pub use executor::{ProcessExecutor, WallpaperApply};
pub use notify::{DesktopNotifier, Notifier};
pub use rotation::{
    run_auto_mode, shutdown_signal, RotationEngine, RotationSettings, RotationSummary, TickOutcome,
};
pub use persistence::{DisableOutcome, EnableOutcome, PersistMode, PersistenceManager};
pub use dependencies::{check_dependencies, required_tools, RunMode};
pub use picker::{RofiPicker, ThumbnailCache};
pub use paths::{display_name, expand_tilde, AppPaths};
pub use error::{ErrorKind, ErrorReporting, Result, SwaywpError};
