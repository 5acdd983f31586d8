//! Host clipboard access.
//!
//! The game's "copy name" button puts the governor name on the emulator
//! clipboard, which the emulator mirrors to the host.

use anyhow::{anyhow, Context, Result};
use std::process::Command;

/// Command printing the host clipboard on this platform.
pub fn default_clipboard_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(windows) {
        &["powershell", "-NoProfile", "-Command", "Get-Clipboard"]
    } else if cfg!(target_os = "macos") {
        &["pbpaste"]
    } else {
        &["xclip", "-o", "-selection", "clipboard"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}

/// Runs the clipboard command and returns its trimmed output.
pub fn read_host_clipboard(command: &[String]) -> Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("Clipboard command is empty"))?;

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run clipboard command {}", program))?;

    if !output.status.success() {
        return Err(anyhow!(
            "Clipboard command failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
