//! Child process handling.
//!
//! # Responsibilities
//! - Spawn the backend process in its own process group
//! - Relay captured stdout/stderr into the supervisor's log
//! - Signal the entire process group on termination
//!
//! # Design Decisions
//! - Spawning is non-blocking; readiness is the health prober's job
//! - Child output is diagnostic only, never parsed for control decisions
//! - Group signaling shells out to the platform kill tool rather than
//!   pulling in a libc binding

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::BackendConfig;

/// Spawn the backend process described by the configuration.
///
/// The child is placed in a new process group (Unix) so the whole
/// subtree can be signaled together. Returns immediately; the caller
/// owns the returned handle.
pub fn spawn_backend(config: &BackendConfig) -> std::io::Result<Child> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
    }

    cmd.spawn()
}

/// Pump the child's captured stdout/stderr into tracing events.
///
/// Takes the pipes out of the handle; each stream is drained by its own
/// task until the child closes it.
pub fn pump_output(child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.is_empty() {
                    tracing::info!(stream = "stdout", "[backend] {}", line);
                }
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    continue;
                }
                if line.contains("ERROR") || line.contains("Exception") {
                    tracing::warn!(stream = "stderr", "[backend] {}", line);
                } else {
                    tracing::info!(stream = "stderr", "[backend] {}", line);
                }
            }
        });
    }
}

/// Kill the backend's entire process group.
///
/// Used when the backend's own graceful-shutdown endpoint failed or
/// the grace period ran out. Returns an error when the OS kill tool
/// reports failure for both the group and the leaf process.
#[cfg(unix)]
pub fn kill_group(pid: u32) -> std::io::Result<()> {
    // Negative pid targets the whole process group.
    let group = std::process::Command::new("kill")
        .args(["-KILL", &format!("-{pid}")])
        .status()?;
    if group.success() {
        return Ok(());
    }

    // The group may already be gone; fall back to the leaf pid.
    let leaf = std::process::Command::new("kill")
        .args(["-KILL", &pid.to_string()])
        .status()?;
    if leaf.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "kill reported failure for process group {pid}"
        )))
    }
}

#[cfg(target_os = "windows")]
pub fn kill_group(pid: u32) -> std::io::Result<()> {
    let status = std::process::Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/T", "/F"])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "taskkill reported failure for process tree {pid}"
        )))
    }
}
