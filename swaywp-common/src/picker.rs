//! Interactive selection through rofi, with cached thumbnails as icons.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ProcessError, SwaywpError};
use crate::paths::display_name;
use crate::session_env::apply_session_env;
use crate::Result;

pub const PICKER_TOOL: &str = "rofi";
pub const THUMBNAIL_TOOL: &str = "convert";
const THUMBNAIL_SIZE: &str = "128x128";

/// Square thumbnails keyed by image file name.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn thumbnail_path(&self, image: &Path) -> PathBuf {
        self.dir.join(display_name(image))
    }

    /// Missing, or older than its source.
    pub fn is_stale(image: &Path, thumbnail: &Path) -> bool {
        let Ok(thumb_modified) = fs::metadata(thumbnail).and_then(|m| m.modified()) else {
            return true;
        };
        match fs::metadata(image).and_then(|m| m.modified()) {
            Ok(image_modified) => image_modified > thumb_modified,
            Err(_) => false,
        }
    }

    pub fn build_thumbnail_command(image: &Path, thumbnail: &Path) -> Command {
        let mut cmd = Command::new(THUMBNAIL_TOOL);
        cmd.arg(image)
            .args(["-thumbnail", &format!("{}^", THUMBNAIL_SIZE)])
            .args(["-gravity", "center"])
            .args(["-extent", THUMBNAIL_SIZE])
            .arg(thumbnail);
        cmd
    }

    /// Thumbnail for `image`, regenerated when stale. A failed conversion only
    /// costs the icon, so it is logged and the path is still returned.
    pub fn get(&self, image: &Path) -> PathBuf {
        let thumbnail = self.thumbnail_path(image);
        if !Self::is_stale(image, &thumbnail) {
            return thumbnail;
        }

        if let Err(e) = fs::create_dir_all(&self.dir) {
            log::warn!("Could not create thumbnail cache {:?}: {}", self.dir, e);
            return thumbnail;
        }

        log::info!("Generating thumbnail for {}", display_name(image));
        let mut cmd = Self::build_thumbnail_command(image, &thumbnail);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        match cmd.status() {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!(
                "{} exited with {} for {:?}",
                THUMBNAIL_TOOL,
                status.code().unwrap_or(-1),
                image
            ),
            Err(e) => log::warn!("Could not run {}: {}", THUMBNAIL_TOOL, e),
        }
        thumbnail
    }
}

/// One `<name>\0icon\x1f<thumbnail>` row per image.
pub fn picker_entries(rows: &[(String, PathBuf)]) -> String {
    rows.iter()
        .map(|(name, thumb)| format!("{}\0icon\x1f{}", name, thumb.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Maps rofi's output back to an image. Rofi prints only the row text.
pub fn resolve_selection(images: &[PathBuf], selected: &str) -> Option<PathBuf> {
    let selected = selected.trim();
    images.iter().find(|p| display_name(p) == selected).cloned()
}

pub struct RofiPicker {
    thumbnails: ThumbnailCache,
}

impl RofiPicker {
    pub fn new(thumbnails: ThumbnailCache) -> Self {
        Self { thumbnails }
    }

    pub fn build_picker_command() -> Command {
        let mut cmd = Command::new(PICKER_TOOL);
        cmd.arg("-dmenu")
            .args(["-p", "Wallpaper"])
            .arg("-i")
            .arg("-show-icons")
            .args(["-theme-str", "window {width: 80%;}"]);
        cmd
    }

    /// Shows the menu and waits for a choice. `Ok(None)` when the user cancels.
    pub fn pick(&self, images: &[PathBuf]) -> Result<Option<PathBuf>> {
        let rows: Vec<(String, PathBuf)> = images
            .iter()
            .map(|img| (display_name(img), self.thumbnails.get(img)))
            .collect();
        let input = picker_entries(&rows);

        let mut cmd = Self::build_picker_command();
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());
        apply_session_env(&mut cmd);

        let exec_err = |e| {
            SwaywpError::Process(ProcessError::Execution {
                command: PICKER_TOOL.to_string(),
                source: e,
            })
        };

        let mut child = cmd.spawn().map_err(exec_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).map_err(exec_err)?;
        }
        let output = child.wait_with_output().map_err(exec_err)?;

        if !output.status.success() {
            log::info!("Selection cancelled");
            return Ok(None);
        }

        let selected = String::from_utf8_lossy(&output.stdout);
        match resolve_selection(images, &selected) {
            Some(path) => Ok(Some(path)),
            None => {
                log::warn!("Picker returned unknown entry '{}'", selected.trim());
                Ok(None)
            }
        }
    }
}
