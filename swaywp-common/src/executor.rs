use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use crate::command_builder::{CommandBuilder, OutputConfig};
use crate::error::{ProcessError, SwaywpError};
use crate::notify::Notifier;
use crate::paths::display_name;
use crate::session_env::apply_session_env;
use crate::Result;

/// How long a freshly started renderer gets to fail before we consider it up.
const RENDERER_STARTUP_GRACE: Duration = Duration::from_millis(200);

/// Sets the screen background as a side effect. Safe to call repeatedly.
pub trait WallpaperApply {
    /// Applies `image_path`. `quiet` suppresses the per-application notification.
    fn apply(&self, image_path: &Path, quiet: bool) -> Result<()>;
}

impl<T: WallpaperApply + ?Sized> WallpaperApply for &T {
    fn apply(&self, image_path: &Path, quiet: bool) -> Result<()> {
        (**self).apply(image_path, quiet)
    }
}

/// Drives swaybg and the palette tool.
#[derive(Clone)]
pub struct ProcessExecutor<N> {
    command_builder: CommandBuilder,
    config: OutputConfig,
    notifier: N,
}

impl<N: Notifier> ProcessExecutor<N> {
    pub fn new(command_builder: CommandBuilder, config: OutputConfig, notifier: N) -> Self {
        Self { command_builder, config, notifier }
    }

    /// Best effort: a failure here only means two renderers may briefly overlap.
    fn kill_previous_renderer(&self) {
        let mut cmd = self.command_builder.build_kill_command();
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        match cmd.status() {
            Ok(status) if status.success() => log::debug!("Stopped previous renderer"),
            Ok(_) => log::debug!("No previous renderer running"),
            Err(e) => log::warn!("Could not stop previous renderer: {}", e),
        }
    }

    fn start_renderer(&self, image_path: &Path) -> Result<()> {
        let mut cmd = self.command_builder.build_renderer_command(image_path, &self.config);
        // Own process group: the renderer must outlive us and ignore our Ctrl+C
        cmd.process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        apply_session_env(&mut cmd);

        log::info!("Executing renderer command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            SwaywpError::Process(ProcessError::Execution {
                command: format!("{:?}", cmd),
                source: e,
            })
        })?;

        std::thread::sleep(RENDERER_STARTUP_GRACE);
        match child.try_wait() {
            Ok(Some(status)) if !status.success() => {
                log::error!(
                    "{} exited right after start with code {}",
                    crate::command_builder::RENDERER,
                    status.code().unwrap_or(-1)
                );
                return Err(SwaywpError::Process(ProcessError::NonZeroExit {
                    command: crate::command_builder::RENDERER.to_string(),
                    code: status.code().unwrap_or(-1),
                    stderr: String::new(),
                }));
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not check renderer status: {}", e),
        }

        // The renderer is killed by the next application; reap it then
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }

    fn generate_palette(&self, image_path: &Path) -> Result<()> {
        let mut cmd = self.command_builder.build_palette_command(image_path);
        apply_session_env(&mut cmd);

        log::debug!("Executing palette command: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            SwaywpError::Process(ProcessError::Execution {
                command: format!("{:?}", cmd),
                source: e,
            })
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SwaywpError::Process(ProcessError::NonZeroExit {
                command: crate::command_builder::PALETTE_TOOL.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.to_string(),
            }));
        }
        Ok(())
    }
}

impl<N: Notifier> WallpaperApply for ProcessExecutor<N> {
    fn apply(&self, image_path: &Path, quiet: bool) -> Result<()> {
        self.kill_previous_renderer();
        self.start_renderer(image_path)?;

        if self.config.generate_palette {
            // The wallpaper is already up; a palette failure does not undo it
            if let Err(e) = self.generate_palette(image_path) {
                log::warn!("Palette generation failed for {:?}: {}", image_path, e);
            }
        }

        if !quiet {
            self.notifier.notify(
                "Wallpaper Updated",
                &display_name(image_path),
                &image_path.to_string_lossy(),
            );
        }

        log::info!("Successfully set wallpaper: {:?}", image_path);
        Ok(())
    }
}
