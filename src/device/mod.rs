//! Emulator control.
//!
//! The [`Device`] trait is what the scanners drive; [`AdbClient`] is the
//! real implementation on top of the `adb` command line tool.

pub mod adb;
pub mod bluestacks;
pub mod clipboard;
pub mod input_script;
pub mod retry;

pub use adb::AdbClient;
pub use retry::{retry_with_recovery, RetryPolicy};

use anyhow::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::layout::Point;

/// Emulator flavour; decides the input script folder and touch device lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Emulator {
    #[default]
    #[serde(rename = "bluestacks")]
    BlueStacks,
    #[serde(rename = "ld")]
    LdPlayer,
}

impl Emulator {
    /// Folder under the inputs directory holding this emulator's scripts.
    pub fn script_dir(self) -> &'static str {
        match self {
            Emulator::BlueStacks => "bluestacks",
            Emulator::LdPlayer => "ld",
        }
    }

    /// Text identifying the touch screen in `getevent -pl` output.
    pub fn touch_marker(self) -> &'static str {
        match self {
            Emulator::BlueStacks => "Touch",
            Emulator::LdPlayer => "ABS_MT_POSITION_Y",
        }
    }
}

/// A single emulator the scan has exclusive control over.
///
/// Every call mutates the emulator UI; callers must issue them from one
/// thread and in order. Implementations retry transport failures and report
/// exhaustion as [`ScanError::DeviceUnavailable`].
pub trait Device {
    /// Connects; safe to call when already connected.
    fn connect(&mut self) -> Result<(), ScanError>;

    fn disconnect(&mut self);

    fn screenshot(&mut self) -> Result<RgbaImage, ScanError>;

    fn shell(&mut self, cmd: &str) -> Result<String, ScanError>;

    /// Replays a named input-event script (a recorded swipe or tap sequence).
    fn replay_input_script(&mut self, name: &str) -> Result<(), ScanError>;

    /// Text the game copied to the host clipboard.
    fn read_clipboard(&mut self) -> Result<String>;

    fn tap(&mut self, at: Point) -> Result<(), ScanError> {
        self.shell(&format!("input tap {} {}", at.x, at.y)).map(|_| ())
    }

    fn swipe(&mut self, from: Point, to: Point, duration_ms: u32) -> Result<(), ScanError> {
        self.shell(&format!(
            "input swipe {} {} {} {} {}",
            from.x, from.y, to.x, to.y, duration_ms
        ))
        .map(|_| ())
    }

    fn key_event(&mut self, code: &str) -> Result<(), ScanError> {
        self.shell(&format!("input keyevent {}", code)).map(|_| ())
    }

    fn input_text(&mut self, text: &str) -> Result<(), ScanError> {
        self.shell(&format!("input text {}", text)).map(|_| ())
    }
}
