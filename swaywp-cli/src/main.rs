use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use swaywp_common::{
    check_dependencies, display_name, required_tools, run_auto_mode, shutdown_signal, AppPaths,
    CommandBuilder, DesktopNotifier, EnableOutcome, ErrorReporting, FolderImages, ImageDiscovery,
    ImageSource, Notifier, PersistMode, PersistenceManager, ProcessExecutor, RofiPicker, RunMode,
    SwaywpError, ThumbnailCache, WallpaperApply,
};
use swaywp_common::error::ImageDiscoveryError;
use swaywp_config::Config;

#[derive(Parser)]
#[command(name = "sway-wallpaper")]
#[command(about = "Pick, set or rotate the sway wallpaper")]
#[command(version)]
struct Cli {
    /// Change the wallpaper at a fixed interval until interrupted
    #[arg(long, conflicts_with = "set")]
    auto: bool,

    /// Set this image as the wallpaper
    #[arg(long, value_name = "PATH")]
    set: Option<PathBuf>,

    /// No per-change notification or progress output
    #[arg(short, long)]
    quiet: bool,

    /// Restore the wallpaper (or the rotation) when the session starts
    #[arg(long, conflicts_with = "no_persist")]
    persist: bool,

    /// Remove session restore; on its own, exits afterwards
    #[arg(long)]
    no_persist: bool,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.auto {
            RunMode::Auto
        } else if self.set.is_some() {
            RunMode::SetPath
        } else {
            RunMode::Interactive
        }
    }

    fn only_disables_persistence(&self) -> bool {
        self.no_persist && !self.auto && self.set.is_none()
    }
}

/// Notifies the error through the kind table and hands it to the exit path.
fn reported(notifier: &impl Notifier, error: SwaywpError) -> anyhow::Error {
    notifier.notify_error(&error);
    anyhow::Error::new(error)
}

fn progress(quiet: bool, message: impl std::fmt::Display) {
    if !quiet {
        println!("{}", message);
    }
}

/// Validates `image` before anything is printed or spawned, then applies it.
fn set_wallpaper<A: WallpaperApply>(
    applier: &A,
    image: &Path,
    quiet: bool,
    out: &mut impl Write,
) -> swaywp_common::Result<()> {
    ImageDiscovery::validate_image(image)?;
    if !quiet {
        let _ = writeln!(out, "Setting wallpaper: {}", display_name(image));
    }
    applier.apply(image, quiet)
}

fn enable_persistence(
    manager: &PersistenceManager,
    mode: PersistMode,
    quiet: bool,
    notifier: &impl Notifier,
) -> anyhow::Result<()> {
    match manager.enable(&mode).map_err(|e| reported(notifier, e))? {
        EnableOutcome::Configured => progress(
            quiet,
            format!(
                "Persistence enabled: {} runs at session start",
                manager.restore_script().display()
            ),
        ),
        EnableOutcome::AlreadyConfigured => {
            progress(quiet, "Persistence already configured; restore script updated")
        }
    }
    Ok(())
}

fn disable_persistence(
    manager: &PersistenceManager,
    quiet: bool,
    notifier: &impl Notifier,
) -> anyhow::Result<()> {
    let outcome = manager.disable().map_err(|e| reported(notifier, e))?;
    if outcome.is_noop() {
        progress(quiet, "Persistence was not configured");
    } else {
        progress(quiet, "Persistence disabled");
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let notifier = DesktopNotifier;

    let paths = AppPaths::discover().map_err(|e| reported(&notifier, e))?;
    let config =
        Config::load_or_create(&paths.config_file).map_err(|e| reported(&notifier, e))?;
    let paths = paths.with_session_config(config.session_config());
    let output_config = config.output_config();
    let persistence = PersistenceManager::new(&paths, output_config.clone());

    if cli.no_persist {
        disable_persistence(&persistence, cli.quiet, &notifier)?;
        if cli.only_disables_persistence() {
            return Ok(());
        }
    }

    let mode = cli.mode();
    check_dependencies(&required_tools(mode, output_config.generate_palette))
        .map_err(|e| reported(&notifier, e))?;

    let executor = ProcessExecutor::new(CommandBuilder::new(), output_config, notifier);

    match mode {
        RunMode::SetPath => {
            let Some(image) = cli.set.as_deref() else {
                return Ok(());
            };
            set_wallpaper(&executor, image, cli.quiet, &mut std::io::stdout())
                .map_err(|e| reported(&notifier, e))?;

            if cli.persist {
                let mode = PersistMode::Static { image: image.to_path_buf() };
                enable_persistence(&persistence, mode, cli.quiet, &notifier)?;
            }
        }

        RunMode::Interactive => {
            let folder = config.wallpaper_folder().map_err(|e| reported(&notifier, e))?;
            let images = FolderImages.list_images(&folder);
            if images.is_empty() {
                let error = SwaywpError::from(ImageDiscoveryError::NoImagesFound { path: folder });
                return Err(reported(&notifier, error));
            }

            progress(cli.quiet, "Preparing thumbnails...");
            let picker = RofiPicker::new(ThumbnailCache::new(paths.thumbnail_dir.clone()));
            let Some(image) = picker.pick(&images).map_err(|e| reported(&notifier, e))? else {
                progress(cli.quiet, "Selection cancelled.");
                return Ok(());
            };

            set_wallpaper(&executor, &image, cli.quiet, &mut std::io::stdout())
                .map_err(|e| reported(&notifier, e))?;

            if cli.persist {
                let mode = PersistMode::Static { image };
                enable_persistence(&persistence, mode, cli.quiet, &notifier)?;
            }
        }

        RunMode::Auto => {
            if cli.persist {
                let program = std::env::current_exe()
                    .context("Could not locate the running executable")?;
                let mode = PersistMode::AutoCommand { program };
                // Rotation still starts; the failure has already been reported
                if let Err(e) = enable_persistence(&persistence, mode, cli.quiet, &notifier) {
                    log::warn!("Continuing without persistence: {:#}", e);
                }
            }

            let shutdown = shutdown_signal().context("Could not install signal handlers")?;
            progress(cli.quiet, "Auto mode running. Press Ctrl+C to stop.");

            // Errors from the loop were already notified inside it
            let settings = config.rotation_settings();
            let summary =
                run_auto_mode(settings, FolderImages, &executor, &notifier, shutdown).await?;
            progress(cli.quiet, format!("Auto mode stopped after {} changes.", summary.applied));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<SwaywpError>() {
            Some(error) => {
                eprintln!("Error: {}", error.user_friendly_message());
                log::debug!("{:?}", error);
                ExitCode::from(u8::try_from(error.kind().exit_code()).unwrap_or(1))
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::Mutex;
    use swaywp_common::error::InputError;
    use tempfile::tempdir;

    /// Records applications instead of spawning anything.
    #[derive(Default)]
    struct RecordingApplier {
        applied: Mutex<Vec<(PathBuf, bool)>>,
    }

    impl WallpaperApply for RecordingApplier {
        fn apply(&self, image_path: &Path, quiet: bool) -> swaywp_common::Result<()> {
            self.applied.lock().unwrap().push((image_path.to_path_buf(), quiet));
            Ok(())
        }
    }

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("sway-wallpaper").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(parse(&[]).unwrap().mode(), RunMode::Interactive);
        assert_eq!(parse(&["--auto"]).unwrap().mode(), RunMode::Auto);
        assert_eq!(parse(&["--set", "/w/a.png", "-q"]).unwrap().mode(), RunMode::SetPath);
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(parse(&["--auto", "--set", "/w/a.png"]).is_err());
        assert!(parse(&["--persist", "--no-persist"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }

    #[test]
    fn test_no_persist_alone_only_disables() {
        assert!(parse(&["--no-persist"]).unwrap().only_disables_persistence());
        assert!(!parse(&["--no-persist", "--auto"]).unwrap().only_disables_persistence());
        assert!(!parse(&["--quiet"]).unwrap().only_disables_persistence());
    }

    #[test]
    fn test_unsupported_extension_is_rejected_silently() {
        let temp_dir = tempdir().unwrap();
        let notes = temp_dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();
        let applier = RecordingApplier::default();
        let mut out = Vec::new();

        let result = set_wallpaper(&applier, &notes, false, &mut out);

        match result.unwrap_err() {
            SwaywpError::Input(InputError::UnsupportedFormat { .. }) => {}
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
        assert!(out.is_empty());
        assert!(applier.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_rejected_before_apply() {
        let applier = RecordingApplier::default();
        let mut out = Vec::new();

        let result = set_wallpaper(&applier, Path::new("/nonexistent/wall.png"), false, &mut out);

        assert!(matches!(result, Err(SwaywpError::Input(InputError::NotFound { .. }))));
        assert!(out.is_empty());
        assert!(applier.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_valid_path_is_reported_then_applied() {
        let temp_dir = tempdir().unwrap();
        let image = temp_dir.path().join("wall.PNG");
        std::fs::write(&image, "fake png").unwrap();
        let applier = RecordingApplier::default();

        let mut out = Vec::new();
        set_wallpaper(&applier, &image, false, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Setting wallpaper: wall.PNG\n");

        let mut quiet_out = Vec::new();
        set_wallpaper(&applier, &image, true, &mut quiet_out).unwrap();
        assert!(quiet_out.is_empty());

        assert_eq!(*applier.applied.lock().unwrap(), vec![(image.clone(), false), (image, true)]);
    }
}
