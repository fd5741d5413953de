use std::process::{Command, Stdio};

use crate::error::{ErrorReporting, SwaywpError};
use crate::session_env::apply_session_env;

/// Fire-and-forget desktop notifications. Delivery failures are logged and
/// never reach the caller.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str, icon: &str);

    /// Reports an error through the kind → title/icon table.
    fn notify_error(&self, error: &SwaywpError) {
        let (title, icon) = error.kind().notification();
        self.notify(title, &error.user_friendly_message(), icon);
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, title: &str, message: &str, icon: &str) {
        (**self).notify(title, message, icon)
    }
}

pub const NOTIFY_TOOL: &str = "notify-send";

/// Sends notifications through `notify-send`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str, icon: &str) {
        let mut cmd = Command::new(NOTIFY_TOOL);
        cmd.arg(title)
            .arg(message)
            .args(["-i", icon])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        apply_session_env(&mut cmd);

        match cmd.spawn() {
            Ok(mut child) => {
                // Reap in the background so the caller never waits on delivery
                std::thread::spawn(move || {
                    if let Err(e) = child.wait() {
                        log::debug!("notify-send did not finish cleanly: {}", e);
                    }
                });
            }
            Err(e) => {
                log::warn!("Could not send notification ({}): {} - {}", e, title, message);
            }
        }
    }
}
