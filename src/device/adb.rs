use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Command;

use super::clipboard::read_host_clipboard;
use super::input_script::{find_input_device, load_script, sendevent_command};
use super::retry::{retry_with_recovery, RetryPolicy};
use super::{Device, Emulator};
use crate::config::AdbSettings;
use crate::error::ScanError;

/// A single emulator reached through `adb connect localhost:<port>`.
pub struct AdbClient {
    adb_path: PathBuf,
    serial: String,
    emulator: Emulator,
    inputs_dir: PathBuf,
    clipboard: Vec<String>,
    retry: RetryPolicy,
    connected: bool,
    /// `/dev/input/eventN` of the touch screen, looked up once per connection
    touch_device: Option<String>,
}

impl AdbClient {
    pub fn new(settings: &AdbSettings, inputs_dir: PathBuf) -> Self {
        Self {
            adb_path: settings.adb_path.clone(),
            serial: format!("localhost:{}", settings.resolved_port()),
            emulator: settings.emulator,
            inputs_dir,
            clipboard: settings.clipboard(),
            retry: settings.retry_policy(),
            connected: false,
            touch_device: None,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Runs adb and returns its stdout.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new(&self.adb_path)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", self.adb_path.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "adb {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(output.stdout)
    }

    /// Runs adb against this client's device.
    fn run_on_device(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        self.run(&full)
    }

    /// Restarts the adb server and connects.
    fn connect_once(&mut self) -> Result<()> {
        log::info!("Connecting to {}", self.serial);

        // Fails harmlessly when no server is running
        if let Err(e) = self.run(&["kill-server"]) {
            log::debug!("adb kill-server: {:#}", e);
        }
        self.run(&["start-server"])?;

        let out = self.run(&["connect", self.serial.as_str()])?;
        let text = String::from_utf8_lossy(&out);
        if !connect_succeeded(&text) {
            bail!("adb connect {}: {}", self.serial, text.trim());
        }

        self.connected = true;
        log::info!("Connected to {}", self.serial);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.disconnect();
        self.connect_once()
    }

    fn with_retry<T>(
        &mut self,
        what: &str,
        op: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T, ScanError> {
        let policy = self.retry.clone();
        retry_with_recovery(self, &policy, what, op, Self::reconnect)
    }

    fn touch_device(&mut self) -> Result<String> {
        if let Some(device) = &self.touch_device {
            return Ok(device.clone());
        }

        let out = self.run_on_device(&["shell", "getevent", "-pl"])?;
        let marker = self.emulator.touch_marker();
        let device = find_input_device(&String::from_utf8_lossy(&out), marker)
            .ok_or_else(|| anyhow!("No input device matching '{}' on {}", marker, self.serial))?;

        log::info!("Touch input device: {}", device);
        self.touch_device = Some(device.clone());
        Ok(device)
    }
}

/// `adb connect` exits successfully even when the connection fails; the
/// message tells.
fn connect_succeeded(output: &str) -> bool {
    let text = output.to_lowercase();
    text.contains("connected to")
        && !text.contains("cannot")
        && !text.contains("unable")
        && !text.contains("failed")
}

impl Device for AdbClient {
    fn connect(&mut self) -> Result<(), ScanError> {
        if self.connected {
            return Ok(());
        }
        self.with_retry("connect", Self::connect_once)
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.run(&["disconnect", self.serial.as_str()]) {
            log::debug!("adb disconnect: {:#}", e);
        }
        self.connected = false;
        self.touch_device = None;
    }

    fn screenshot(&mut self) -> Result<RgbaImage, ScanError> {
        self.with_retry("screenshot", |c| {
            let png = c.run_on_device(&["exec-out", "screencap", "-p"])?;
            let img = image::load_from_memory(&png).context("Failed to decode screenshot")?;
            Ok(img.to_rgba8())
        })
    }

    fn shell(&mut self, cmd: &str) -> Result<String, ScanError> {
        self.with_retry(&format!("shell '{}'", cmd), |c| {
            let out = c.run_on_device(&["shell", cmd])?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        })
    }

    fn replay_input_script(&mut self, name: &str) -> Result<(), ScanError> {
        let path = self
            .inputs_dir
            .join(self.emulator.script_dir())
            .join(name);
        // A missing script cannot be fixed by reconnecting
        let events = load_script(&path).map_err(|e| {
            log::error!("{:#}", e);
            ScanError::DeviceUnavailable {
                attempts: 0,
                last_error: format!("{:#}", e),
            }
        })?;

        self.with_retry(&format!("input script {}", name), |c| {
            let device = c.touch_device()?;
            c.run_on_device(&["shell", sendevent_command(&device, &events).as_str()])?;
            Ok(())
        })
    }

    fn read_clipboard(&mut self) -> Result<String> {
        read_host_clipboard(&self.clipboard)
    }
}
