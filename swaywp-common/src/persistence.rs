//! Session persistence.
//!
//! Persistence is two facts on disk: an executable restore script, and a
//! marker + hook line in the window manager's startup configuration that runs
//! it. The startup configuration belongs to the user; we only ever append our
//! block or take it out again.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::command_builder::{OutputConfig, RENDERER};
use crate::error::{PersistenceError, SwaywpError};
use crate::paths::AppPaths;
use crate::Result;

pub const HOOK_MARKER: &str = "# swaywp: restore wallpaper on session start";

/// The renderer may not be ready right after the session starts.
pub const RESTORE_ATTEMPTS: u32 = 5;
pub const RESTORE_BACKOFF_SECS: u32 = 2;

/// What the restore script brings back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistMode {
    /// Re-apply this image, read from the state file at session start.
    Static { image: PathBuf },
    /// Re-run the rotation loop through this executable.
    AutoCommand { program: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Configured,
    AlreadyConfigured,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisableOutcome {
    pub script_removed: bool,
    pub hook_removed: bool,
}

impl DisableOutcome {
    pub fn is_noop(&self) -> bool {
        !self.script_removed && !self.hook_removed
    }
}

pub struct PersistenceManager {
    restore_script: PathBuf,
    state_file: PathBuf,
    session_config: PathBuf,
    output_config: OutputConfig,
}

impl PersistenceManager {
    pub fn new(paths: &AppPaths, output_config: OutputConfig) -> Self {
        Self {
            restore_script: paths.restore_script(),
            state_file: paths.state_file(),
            session_config: paths.session_config.clone(),
            output_config,
        }
    }

    pub fn restore_script(&self) -> &Path {
        &self.restore_script
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn hook_line(&self) -> String {
        format!("exec {}", shell_quote(&self.restore_script.to_string_lossy()))
    }

    /// Writes the state and restore script, then appends the hook block unless
    /// it is already there.
    pub fn enable(&self, mode: &PersistMode) -> Result<EnableOutcome> {
        self.enable_with(mode, open_for_append)
    }

    fn enable_with<F>(&self, mode: &PersistMode, open_append: F) -> Result<EnableOutcome>
    where
        F: FnOnce(&Path) -> io::Result<File>,
    {
        if !self.session_config.exists() {
            return Err(PersistenceError::SessionConfigMissing {
                path: self.session_config.clone(),
            }
            .into());
        }
        let session_content = self.read_session_config()?;

        if let PersistMode::Static { image } = mode {
            let image = fs::canonicalize(image).unwrap_or_else(|_| image.clone());
            let state = format!("{}\n", image.display());
            write_atomic(&self.state_file, &state, None)?;
            log::info!("Saved last wallpaper {:?} to {:?}", image, self.state_file);
        }

        let script_existed = self.restore_script.exists();
        let script = render_restore_script(mode, &self.state_file, &self.output_config);
        write_atomic(&self.restore_script, &script, Some(0o755))?;
        log::info!("Wrote restore script {:?}", self.restore_script);

        let hook = self.hook_line();
        if contains_hook(session_content.lines(), &hook) {
            log::info!("Startup hook already present in {:?}", self.session_config);
            return Ok(EnableOutcome::AlreadyConfigured);
        }

        if let Err(e) = self.append_hook_block(&session_content, &hook, open_append) {
            if !script_existed {
                if let Err(remove_err) = fs::remove_file(&self.restore_script) {
                    log::warn!("Could not clean up {:?}: {}", self.restore_script, remove_err);
                }
            }
            return Err(e);
        }

        log::info!("Added startup hook to {:?}", self.session_config);
        Ok(EnableOutcome::Configured)
    }

    /// Takes the hook block out of the startup configuration, then removes the
    /// restore script and state file. Nothing is deleted when the configuration
    /// cannot be read or rewritten. Anything already absent is reported through
    /// the outcome, not as an error.
    pub fn disable(&self) -> Result<DisableOutcome> {
        let mut outcome = DisableOutcome::default();

        if self.session_config.exists() {
            let content = self.read_session_config()?;
            let lines: Vec<&str> = content.split_inclusive('\n').collect();
            if let Some(kept) = remove_hook_block(&lines, HOOK_MARKER, &self.hook_line()) {
                // Lines keep their own terminators, so CRLF files stay CRLF
                let updated = kept.concat();
                // Follow a symlinked config so the link itself survives the rewrite
                let target = fs::canonicalize(&self.session_config)
                    .unwrap_or_else(|_| self.session_config.clone());
                let mode = fs::metadata(&target).map(|m| m.permissions().mode()).ok();
                write_atomic(&target, &updated, mode)?;
                outcome.hook_removed = true;
                log::info!("Removed startup hook from {:?}", target);
            } else {
                log::info!("No startup hook in {:?}", self.session_config);
            }
        } else {
            log::info!("No session configuration at {:?}", self.session_config);
        }

        match fs::remove_file(&self.restore_script) {
            Ok(()) => {
                outcome.script_removed = true;
                log::info!("Removed restore script {:?}", self.restore_script);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No restore script at {:?}", self.restore_script);
            }
            Err(e) => {
                return Err(PersistenceError::Remove {
                    path: self.restore_script.clone(),
                    source: e,
                }
                .into());
            }
        }

        match fs::remove_file(&self.state_file) {
            Ok(()) => log::debug!("Removed state file {:?}", self.state_file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove state file {:?}: {}", self.state_file, e),
        }

        Ok(outcome)
    }

    fn read_session_config(&self) -> Result<String> {
        fs::read_to_string(&self.session_config).map_err(|e| {
            SwaywpError::Persistence(PersistenceError::Read {
                path: self.session_config.clone(),
                source: e,
            })
        })
    }

    /// Appends only; a failure here can never truncate the existing file.
    fn append_hook_block<F>(&self, current: &str, hook: &str, open_append: F) -> Result<()>
    where
        F: FnOnce(&Path) -> io::Result<File>,
    {
        let mut block = String::new();
        if !current.is_empty() && !current.ends_with('\n') {
            block.push('\n');
        }
        block.push_str(HOOK_MARKER);
        block.push('\n');
        block.push_str(hook);
        block.push('\n');

        let write_err = |e| {
            SwaywpError::Persistence(PersistenceError::Write {
                path: self.session_config.clone(),
                source: e,
            })
        };

        let mut file = open_append(&self.session_config).map_err(write_err)?;
        file.write_all(block.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)
    }
}

fn open_for_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().append(true).open(path)
}

/// Whether any line is exactly the hook line (ignoring surrounding whitespace).
pub fn contains_hook<'a>(mut lines: impl Iterator<Item = &'a str>, hook: &str) -> bool {
    lines.any(|line| line.trim() == hook)
}

/// Drops every hook line, plus the marker comment directly above it. All other
/// lines keep their order and their bytes, terminators included when the
/// caller passes them. `None` when there was nothing to remove.
pub fn remove_hook_block<S: AsRef<str>>(
    lines: &[S],
    marker: &str,
    hook: &str,
) -> Option<Vec<String>> {
    let mut kept: Vec<String> = Vec::with_capacity(lines.len());
    let mut removed = false;

    for line in lines {
        let line = line.as_ref();
        if line.trim() == hook {
            removed = true;
            if kept.last().is_some_and(|prev| prev.trim() == marker) {
                kept.pop();
            }
            continue;
        }
        kept.push(line.to_string());
    }

    removed.then_some(kept)
}

pub fn render_restore_script(
    mode: &PersistMode,
    state_file: &Path,
    output: &OutputConfig,
) -> String {
    match mode {
        PersistMode::Static { .. } => format!(
            r#"#!/bin/sh
# Generated by sway-wallpaper. Re-applies the last wallpaper at session start.
state_file={state_file}
[ -r "$state_file" ] || exit 0
image=$(head -n 1 "$state_file")
[ -f "$image" ] || exit 0

attempt=1
while [ "$attempt" -le {attempts} ]; do
    pkill -x {renderer}
    {renderer} -o {output} -i "$image" -m {mode} >/dev/null 2>&1 &
    sleep {backoff}
    if pgrep -x {renderer} >/dev/null; then
        exit 0
    fi
    attempt=$((attempt + 1))
done
echo "sway-wallpaper: could not restore wallpaper after {attempts} attempts" >&2
exit 1
"#,
            state_file = shell_quote(&state_file.to_string_lossy()),
            attempts = RESTORE_ATTEMPTS,
            backoff = RESTORE_BACKOFF_SECS,
            renderer = RENDERER,
            output = shell_quote(&output.output),
            mode = output.mode.as_str(),
        ),
        PersistMode::AutoCommand { program } => format!(
            r#"#!/bin/sh
# Generated by sway-wallpaper. Restarts wallpaper rotation at session start.
runtime_dir="${{XDG_RUNTIME_DIR:-/run/user/$(id -u)}}"

attempt=1
while [ "$attempt" -le {attempts} ]; do
    if [ -S "$runtime_dir/${{WAYLAND_DISPLAY:-wayland-1}}" ]; then
        exec {program} --auto
    fi
    sleep {backoff}
    attempt=$((attempt + 1))
done
echo "sway-wallpaper: session not ready after {attempts} attempts" >&2
exit 1
"#,
            attempts = RESTORE_ATTEMPTS,
            backoff = RESTORE_BACKOFF_SECS,
            program = shell_quote(&program.to_string_lossy()),
        ),
    }
}

/// Single-quotes a string for POSIX sh.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Writes through a sibling temporary file and a rename, so readers see the
/// old or the new content and never a partial file.
fn write_atomic(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    let write_err = |e| {
        SwaywpError::Persistence(PersistenceError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.swaywp.tmp", file_name));

    let result = (|| {
        fs::write(&tmp, contents)?;
        if let Some(mode) = mode {
            fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
        }
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_builder::FitMode;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    const SWAY_CONFIG: &str =
        "set $mod Mod4\nbindsym $mod+Return exec foot\n\ninclude /etc/sway/config.d/*\n";

    fn setup(initial: &str) -> (tempfile::TempDir, AppPaths, PersistenceManager) {
        let temp_dir = tempdir().unwrap();
        let paths = AppPaths::under(temp_dir.path());
        fs::create_dir_all(paths.session_config.parent().unwrap()).unwrap();
        fs::write(&paths.session_config, initial).unwrap();
        let manager = PersistenceManager::new(&paths, OutputConfig::default());
        (temp_dir, paths, manager)
    }

    fn hook_count(paths: &AppPaths, hook: &str) -> usize {
        fs::read_to_string(&paths.session_config)
            .unwrap()
            .lines()
            .filter(|l| l.trim() == hook)
            .count()
    }

    #[test]
    fn test_remove_hook_block_drops_marker_and_hook() {
        let lines = vec!["a", HOOK_MARKER, "exec '/x.sh'", "b"];

        let kept = remove_hook_block(&lines, HOOK_MARKER, "exec '/x.sh'").unwrap();

        assert_eq!(kept, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_hook_block_keeps_unrelated_marker() {
        let lines = vec![HOOK_MARKER, "a", "  exec '/x.sh'  ", "b"];

        let kept = remove_hook_block(&lines, HOOK_MARKER, "exec '/x.sh'").unwrap();

        assert_eq!(kept, vec![HOOK_MARKER, "a", "b"]);
    }

    #[test]
    fn test_remove_hook_block_without_hook_is_none() {
        let lines = vec!["a", HOOK_MARKER, "b"];

        assert!(remove_hook_block(&lines, HOOK_MARKER, "exec '/x.sh'").is_none());
    }

    #[test]
    fn test_enable_twice_is_idempotent() {
        let (tmp, paths, manager) = setup(SWAY_CONFIG);
        let image = tmp.path().join("a.png");
        fs::write(&image, "fake png").unwrap();
        let mode = PersistMode::Static { image };

        assert_eq!(manager.enable(&mode).unwrap(), EnableOutcome::Configured);
        assert_eq!(manager.enable(&mode).unwrap(), EnableOutcome::AlreadyConfigured);

        assert_eq!(hook_count(&paths, &manager.hook_line()), 1);
        assert!(manager.restore_script().exists());

        let mode_bits = fs::metadata(manager.restore_script()).unwrap().permissions().mode();
        assert_eq!(mode_bits & 0o777, 0o755);
    }

    #[test]
    fn test_enable_then_disable_restores_session_config() {
        for initial in [SWAY_CONFIG, "set $mod Mod4\r\nbindsym $mod+Return exec foot\r\n", ""] {
            let (_tmp, paths, manager) = setup(initial);
            let mode = PersistMode::AutoCommand {
                program: PathBuf::from("/usr/bin/sway-wallpaper"),
            };

            manager.enable(&mode).unwrap();
            let enabled = fs::read_to_string(&paths.session_config).unwrap();
            assert!(enabled.contains(HOOK_MARKER));

            let outcome = manager.disable().unwrap();
            assert!(outcome.script_removed);
            assert!(outcome.hook_removed);

            let after = fs::read_to_string(&paths.session_config).unwrap();
            assert_eq!(after, initial);
            assert!(!manager.restore_script().exists());
            assert_eq!(hook_count(&paths, &manager.hook_line()), 0);
        }
    }

    #[test]
    fn test_disable_without_trailing_newline_only_adds_one() {
        let (_tmp, paths, manager) = setup("set $mod Mod4");
        let mode = PersistMode::AutoCommand { program: PathBuf::from("/bin/true") };

        manager.enable(&mode).unwrap();
        manager.disable().unwrap();

        assert_eq!(fs::read_to_string(&paths.session_config).unwrap(), "set $mod Mod4\n");
    }

    #[test]
    fn test_remove_hook_block_keeps_line_terminators() {
        let lines: Vec<&str> = "a\r\n# m\nexec '/x.sh'\nb\r\n".split_inclusive('\n').collect();

        let kept = remove_hook_block(&lines, "# m", "exec '/x.sh'").unwrap();

        assert_eq!(kept.concat(), "a\r\nb\r\n");
    }

    #[test]
    fn test_disable_with_unreadable_session_config_keeps_script() {
        let (tmp, paths, manager) = setup(SWAY_CONFIG);
        let image = tmp.path().join("a.png");
        fs::write(&image, "fake png").unwrap();
        manager.enable(&PersistMode::Static { image }).unwrap();

        fs::remove_file(&paths.session_config).unwrap();
        fs::create_dir(&paths.session_config).unwrap();

        let err = manager.disable().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(manager.restore_script().exists());
        assert!(manager.state_file().exists());
    }

    #[test]
    fn test_failed_append_removes_new_script_and_keeps_config() {
        let (_tmp, paths, manager) = setup(SWAY_CONFIG);
        let mode = PersistMode::AutoCommand { program: PathBuf::from("/bin/true") };

        // A read-only handle makes the append fail even when running as root
        let err = manager.enable_with(&mode, |path| File::open(path)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(fs::read_to_string(&paths.session_config).unwrap(), SWAY_CONFIG);
        assert!(!manager.restore_script().exists());
    }

    #[test]
    fn test_failed_append_keeps_existing_script() {
        let (_tmp, paths, manager) = setup(SWAY_CONFIG);
        fs::create_dir_all(manager.restore_script().parent().unwrap()).unwrap();
        fs::write(manager.restore_script(), "#!/bin/sh\n").unwrap();
        let mode = PersistMode::AutoCommand { program: PathBuf::from("/bin/true") };

        assert!(manager.enable_with(&mode, |path| File::open(path)).is_err());

        assert!(manager.restore_script().exists());
        assert_eq!(fs::read_to_string(&paths.session_config).unwrap(), SWAY_CONFIG);
    }

    #[test]
    fn test_disable_when_nothing_configured_is_noop() {
        let (_tmp, paths, manager) = setup(SWAY_CONFIG);

        let outcome = manager.disable().unwrap();

        assert!(outcome.is_noop());
        assert_eq!(fs::read_to_string(&paths.session_config).unwrap(), SWAY_CONFIG);
    }

    #[test]
    fn test_static_enable_writes_state_file() {
        let (tmp, _paths, manager) = setup(SWAY_CONFIG);
        let image = tmp.path().join("wall.jpg");
        fs::write(&image, "fake jpg").unwrap();

        manager.enable(&PersistMode::Static { image: image.clone() }).unwrap();

        let state = fs::read_to_string(manager.state_file()).unwrap();
        assert_eq!(state.trim_end(), fs::canonicalize(&image).unwrap().to_string_lossy());
    }

    #[test]
    fn test_enable_without_session_config_changes_nothing() {
        let temp_dir = tempdir().unwrap();
        let paths = AppPaths::under(temp_dir.path());
        let manager = PersistenceManager::new(&paths, OutputConfig::default());

        let err = manager
            .enable(&PersistMode::AutoCommand { program: PathBuf::from("/bin/true") })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(!manager.restore_script().exists());
        assert!(!manager.state_file().exists());
    }

    #[test]
    fn test_disable_keeps_symlinked_session_config() {
        let (tmp, paths, manager) = setup("");
        let real = tmp.path().join("dotfiles-sway-config");
        fs::write(&real, SWAY_CONFIG).unwrap();
        fs::remove_file(&paths.session_config).unwrap();
        std::os::unix::fs::symlink(&real, &paths.session_config).unwrap();

        manager
            .enable(&PersistMode::AutoCommand { program: PathBuf::from("/bin/true") })
            .unwrap();
        manager.disable().unwrap();

        assert!(fs::symlink_metadata(&paths.session_config).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), SWAY_CONFIG);
    }

    #[test]
    fn test_static_script_retries_with_baked_in_output() {
        let output = OutputConfig {
            output: "HDMI-A-1".to_string(),
            mode: FitMode::Fit,
            generate_palette: true,
        };
        let script = render_restore_script(
            &PersistMode::Static { image: PathBuf::from("/walls/a.png") },
            Path::new("/data/swaywp/last_wallpaper"),
            &output,
        );

        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("state_file='/data/swaywp/last_wallpaper'"));
        assert!(script.contains("swaybg -o 'HDMI-A-1' -i \"$image\" -m fit"));
        assert!(script.contains(&format!("-le {} ]", RESTORE_ATTEMPTS)));
        assert!(script.contains(&format!("sleep {}", RESTORE_BACKOFF_SECS)));
    }

    #[test]
    fn test_auto_script_execs_rotation_command() {
        let script = render_restore_script(
            &PersistMode::AutoCommand { program: PathBuf::from("/usr/bin/sway-wallpaper") },
            Path::new("/unused"),
            &OutputConfig::default(),
        );

        assert!(script.contains("exec '/usr/bin/sway-wallpaper' --auto"));
        assert!(script.contains("${XDG_RUNTIME_DIR:-/run/user/$(id -u)}"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/home/me/walls"), "'/home/me/walls'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
