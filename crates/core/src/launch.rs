use std::process::{Child, Command, Stdio};
use std::thread;

/// Starts an entry's action string.
pub trait ActionLauncher {
    /// Returns whether something was started. Failures are logged, never raised.
    fn launch(&self, action: &str) -> bool;
}

/// Hands the action to the OS default handler, then to the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ActionLauncher for SystemLauncher {
    fn launch(&self, action: &str) -> bool {
        let action = action.trim();
        if action.is_empty() {
            return false;
        }
        match open::that_detached(action) {
            Ok(()) => {
                tracing::info!(action, "launched with default handler");
                return true;
            }
            Err(err) => {
                tracing::debug!(action, error = %err, "default handler failed, trying shell")
            }
        }
        match shell_command(action)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                reap_in_background(child);
                true
            }
            Err(err) => {
                tracing::error!(action, error = %err, "launch failed");
                false
            }
        }
    }
}

/// Wait on the child off-thread so it is reaped once it exits.
fn reap_in_background(mut child: Child) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "launched process exited"),
            Err(err) => tracing::warn!(pid, error = %err, "could not wait on launched process"),
        });
    if let Err(err) = spawned {
        tracing::warn!(pid, error = %err, "could not start reaper thread");
    }
}

#[cfg(windows)]
fn shell_command(action: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(action);
    command
}

#[cfg(not(windows))]
fn shell_command(action: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(action);
    command
}
