//! Timed wallpaper rotation.
//!
//! One tick lists the folder, picks an image, applies it quietly and then
//! waits a full interval. The wait is raced against a shutdown future, so a
//! signal ends the loop at the next scheduling point without interrupting an
//! application that is already running.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{ConfigError, ErrorReporting, SwaywpError};
use crate::executor::WallpaperApply;
use crate::image_discovery::ImageSource;
use crate::notify::Notifier;
use crate::paths::display_name;
use crate::rotation_cursor::{RotationCursor, RotationOrder};
use crate::Result;

pub const INTERVAL_FIELD: &str = "rotation_interval_minutes";

/// Validated, read-only settings for one rotation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSettings {
    pub folder: PathBuf,
    pub interval: Duration,
    pub order: RotationOrder,
}

impl RotationSettings {
    /// Fails for intervals below one minute; there is no zero or negative interval.
    pub fn new(folder: PathBuf, interval_minutes: i64, order: RotationOrder) -> Result<Self> {
        let invalid = || {
            SwaywpError::Config(ConfigError::InvalidValue {
                field: INTERVAL_FIELD.to_string(),
                value: interval_minutes.to_string(),
            })
        };

        let minutes = u64::try_from(interval_minutes).map_err(|_| invalid())?;
        if minutes < 1 {
            return Err(invalid());
        }
        let seconds = minutes.checked_mul(60).ok_or_else(invalid)?;

        Ok(Self {
            folder,
            interval: Duration::from_secs(seconds),
            order,
        })
    }

    pub fn interval_minutes(&self) -> u64 {
        self.interval.as_secs() / 60
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Applied(PathBuf),
    EmptyFolder,
    /// The application failed in a way the next tick may not repeat.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationSummary {
    pub ticks: u64,
    pub applied: u64,
}

pub struct RotationEngine<S, A, N> {
    settings: RotationSettings,
    source: S,
    applier: A,
    notifier: N,
    cursor: RotationCursor,
    rng: StdRng,
}

impl<S, A, N> RotationEngine<S, A, N>
where
    S: ImageSource,
    A: WallpaperApply,
    N: Notifier,
{
    pub fn new(settings: RotationSettings, source: S, applier: A, notifier: N) -> Self {
        Self {
            settings,
            source,
            applier,
            notifier,
            cursor: RotationCursor::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Runs until `shutdown` resolves or a non-transient error occurs.
    pub async fn run<F>(mut self, shutdown: F) -> Result<RotationSummary>
    where
        F: Future<Output = ()>,
    {
        let interval = self.settings.interval;
        let every = humantime::format_duration(interval).to_string();

        log::info!(
            "Auto mode started: {} order, every {}, folder {:?}",
            self.settings.order,
            every,
            self.settings.folder
        );
        self.notifier.notify(
            "Auto Mode Enabled",
            &format!("Changing wallpaper every {}.", every),
            "preferences-desktop-wallpaper",
        );

        tokio::pin!(shutdown);
        let mut summary = RotationSummary::default();

        loop {
            match self.tick() {
                Ok(outcome) => {
                    summary.ticks += 1;
                    if let TickOutcome::Applied(_) = outcome {
                        summary.applied += 1;
                    }
                }
                Err(e) => {
                    e.log_error("Auto mode stopped by an unexpected error");
                    self.notifier.notify_error(&e);
                    return Err(e);
                }
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        log::info!("Auto mode stopped after {} ticks", summary.ticks);
        self.notifier.notify(
            "Auto Mode Disabled",
            "Wallpaper rotation has stopped.",
            "process-stop",
        );
        Ok(summary)
    }

    /// One selection + application. Sleeping is left to [`run`](Self::run).
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let images = self.source.list_images(&self.settings.folder);

        if images.is_empty() {
            log::warn!("No images found in {:?}, waiting", self.settings.folder);
            if self.cursor.record_empty() {
                self.notify_empty_folder();
            }
            return Ok(TickOutcome::EmptyFolder);
        }
        self.cursor.record_images_found();

        let image = self
            .cursor
            .select(self.settings.order, &images, &mut self.rng)
            .cloned()
            .ok_or_else(|| SwaywpError::internal("no image selected from a non-empty set"))?;

        log::info!("Setting new wallpaper: {}", display_name(&image));

        match self.applier.apply(&image, true) {
            Ok(()) => {
                self.cursor.record_success();
                Ok(TickOutcome::Applied(image))
            }
            Err(e) if e.kind().is_transient() => {
                log::warn!("Skipping this tick: {}", e.user_friendly_message());
                if self.cursor.record_failure() {
                    self.notifier.notify_error(&e);
                }
                Ok(TickOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    fn notify_empty_folder(&self) {
        self.notifier.notify(
            "Wallpaper Folder Empty",
            &format!(
                "No images found in '{}'. Waiting for new ones.",
                self.settings.folder.display()
            ),
            "dialog-warning",
        );
    }
}

/// Entry point for auto mode. A configuration error is reported and no tick runs.
pub async fn run_auto_mode<S, A, N, F>(
    settings: Result<RotationSettings>,
    source: S,
    applier: A,
    notifier: N,
    shutdown: F,
) -> Result<RotationSummary>
where
    S: ImageSource,
    A: WallpaperApply,
    N: Notifier,
    F: Future<Output = ()>,
{
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            e.log_error("Auto mode not started");
            notifier.notify_error(&e);
            return Err(e);
        }
    };

    RotationEngine::new(settings, source, applier, notifier)
        .run(shutdown)
        .await
}

/// Installs SIGINT/SIGTERM handlers now and returns a future that resolves on
/// the first of them. Installing early means a signal that arrives during the
/// first application is still delivered here instead of killing the process.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => log::info!("Interrupted, stopping"),
            _ = terminate.recv() => log::info!("Terminated, stopping"),
        }
    })
}
