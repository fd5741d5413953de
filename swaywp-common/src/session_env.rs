use std::process::Command;

/// Passes the graphical session environment to a child process, with
/// fallbacks for when we were started outside a fully populated session
/// (e.g. from a startup hook before the environment is exported).
pub fn apply_session_env(cmd: &mut Command) {
    if let Ok(display) = std::env::var("WAYLAND_DISPLAY") {
        cmd.env("WAYLAND_DISPLAY", display);
    } else {
        cmd.env("WAYLAND_DISPLAY", "wayland-1");
    }

    cmd.env("XDG_RUNTIME_DIR", runtime_dir());

    if let Ok(desktop) = std::env::var("XDG_CURRENT_DESKTOP") {
        cmd.env("XDG_CURRENT_DESKTOP", desktop);
    }

    if let Ok(session_type) = std::env::var("XDG_SESSION_TYPE") {
        cmd.env("XDG_SESSION_TYPE", session_type);
    } else {
        cmd.env("XDG_SESSION_TYPE", "wayland");
    }
}

pub fn runtime_dir() -> String {
    std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| {
        let uid = rustix::process::getuid();
        format!("/run/user/{}", uid.as_raw())
    })
}
