use anyhow::{Context as _, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use sysboard_sdk::{CommandKind, CommandOutput, DashboardInput};

/// Reads saved command output from `dir`; absent files leave the command uncaptured.
pub fn load_captures(dir: &Path, input: &mut DashboardInput) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("capture directory {} does not exist", dir.display());
    }

    for kind in CommandKind::ALL {
        let path = dir.join(kind.capture_file());
        match fs::read_to_string(&path) {
            Ok(text) => input.set_command(kind, CommandOutput::ok(text)),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = kind.capture_file(), "no capture");
            }
            Err(error) => input.set_command(
                kind,
                CommandOutput::failed(format!("failed to read {}: {error}", path.display())),
            ),
        }
    }
    Ok(())
}

/// Runs every dashboard command on this host, listing backups under `data_dir`.
pub fn capture_live(data_dir: &Path, input: &mut DashboardInput) {
    for kind in CommandKind::ALL {
        input.set_command(kind, capture_one(kind, data_dir));
    }
}

fn capture_one(kind: CommandKind, data_dir: &Path) -> CommandOutput {
    let command_line = live_command(kind, data_dir);
    match run_shell(&command_line) {
        Ok(text) => CommandOutput::ok(text),
        Err(error) => {
            let message = format!("{error:#}");
            tracing::warn!(command = %command_line, error = %message, "command failed");
            CommandOutput::failed(message)
        }
    }
}

fn live_command(kind: CommandKind, data_dir: &Path) -> String {
    match kind {
        CommandKind::BackupListing => {
            let backups = data_dir.join("backups");
            format!("ls -1 {}", shell_quote(&backups.to_string_lossy()))
        }
        _ => kind.command_line().to_string(),
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn run_shell(command_line: &str) -> Result<String> {
    let output = Command::new("sh")
        .args(["-c", command_line])
        .output()
        .with_context(|| format!("failed to execute {command_line}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{command_line} failed: {}", stderr.trim())
    }
}
