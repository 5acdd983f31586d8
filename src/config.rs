//! Configuration types for the scanner.
//!
//! Loads settings from config.json at startup: the device endpoint, OCR
//! overrides, timing constants, scan defaults and an optional UI layout
//! profile.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::bluestacks::discover_port;
use crate::device::clipboard::default_clipboard_command;
use crate::device::{Emulator, RetryPolicy};
use crate::layout::{load_profile, UiLayout};
use crate::ocr::TesseractOverrides;
use crate::paths;
use crate::record::ScanOptions;

/// Device endpoint and transport settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbSettings {
    /// adb executable, looked up on PATH when not absolute
    pub adb_path: PathBuf,
    /// Local port; the device is `localhost:<port>`
    pub port: u16,
    pub emulator: Emulator,
    /// When both are set, the port is read from this BlueStacks instance
    pub bluestacks_config: Option<PathBuf>,
    pub bluestacks_instance: Option<String>,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Program and arguments printing the host clipboard
    pub clipboard_command: Option<Vec<String>>,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            port: 5555,
            emulator: Emulator::BlueStacks,
            bluestacks_config: None,
            bluestacks_instance: None,
            retry_attempts: 3,
            retry_backoff_ms: 1000,
            clipboard_command: None,
        }
    }
}

impl AdbSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Port from the BlueStacks config when configured, else `port`.
    pub fn resolved_port(&self) -> u16 {
        match (&self.bluestacks_config, &self.bluestacks_instance) {
            (Some(conf), Some(instance)) => discover_port(conf, instance).unwrap_or(self.port),
            _ => self.port,
        }
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard_command
            .clone()
            .filter(|cmd| !cmd.is_empty())
            .unwrap_or_else(default_clipboard_command)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractSettings {
    pub executable: Option<PathBuf>,
    pub tessdata: Option<PathBuf>,
}

impl TesseractSettings {
    pub fn overrides(&self) -> TesseractOverrides {
        TesseractOverrides {
            executable: self.executable.clone(),
            tessdata: self.tessdata.clone(),
        }
    }
}

/// Waits after each UI action, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub gov_open: f64,
    pub copy_wait: f64,
    pub kills_open: f64,
    pub info_open: f64,
    pub info_close: f64,
    pub gov_close: f64,
    /// After nudging past an inactive row
    pub scroll_wait: f64,
    /// After advancing a paginated list
    pub page_advance: f64,
    pub search_open: f64,
    /// After tapping the search input
    pub input_wait: f64,
    /// After each key event
    pub key_wait: f64,
    pub search_result: f64,
    /// Upper bound of the random jitter added to waits
    pub max_random: f64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            gov_open: 2.0,
            copy_wait: 0.2,
            kills_open: 1.0,
            info_open: 1.0,
            info_close: 0.5,
            gov_close: 1.0,
            scroll_wait: 1.0,
            page_advance: 1.5,
            search_open: 2.0,
            input_wait: 0.3,
            key_wait: 0.1,
            search_result: 1.0,
            max_random: 0.5,
        }
    }
}

impl Timings {
    /// All waits zero, for scripted devices.
    pub fn instant() -> Self {
        Self {
            gov_open: 0.0,
            copy_wait: 0.0,
            kills_open: 0.0,
            info_open: 0.0,
            info_close: 0.0,
            gov_close: 0.0,
            scroll_wait: 0.0,
            page_advance: 0.0,
            search_open: 0.0,
            input_wait: 0.0,
            key_wait: 0.0,
            search_result: 0.0,
            max_random: 0.0,
        }
    }
}

/// Defaults for a scan; command line flags override them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    pub label: String,
    pub count: usize,
    pub resume: bool,
    /// Skip inactive rows with the recorded scroll script instead of a swipe
    pub advanced_scroll: bool,
    pub track_inactives: bool,
    pub validate_kills: bool,
    pub reconstruct_kills: bool,
    pub validate_power: bool,
    pub check_city_hall: bool,
    /// Governors below this level count as inactive
    pub min_city_hall: u8,
    /// Governors at or above this power are assumed to be max level
    pub power_cutoff: u64,
    /// Retaps of an empty row before the continue handler is asked
    pub inactive_retries: u32,
    pub name_copy_attempts: u32,
    /// Screenshots taken per governor while reading its level
    pub level_screenshots: u32,
    pub options: ScanOptions,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            label: "kingdom".to_string(),
            count: 300,
            resume: false,
            advanced_scroll: false,
            track_inactives: false,
            validate_kills: true,
            reconstruct_kills: true,
            validate_power: true,
            check_city_hall: false,
            min_city_hall: 16,
            power_cutoff: 35_000_000,
            inactive_retries: 10,
            name_copy_attempts: 3,
            level_screenshots: 3,
            options: ScanOptions::full(),
        }
    }
}

/// Complete scanner configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub adb: AdbSettings,
    pub tesseract: TesseractSettings,
    pub timings: Timings,
    pub scan: ScanDefaults,
    /// Complete UI layout profile replacing the built-in one
    pub layout_profile: Option<PathBuf>,
}

impl ScannerConfig {
    /// The configured layout profile, or the built-in one.
    pub fn layout(&self) -> Result<UiLayout> {
        match &self.layout_profile {
            Some(path) => load_profile(path),
            None => Ok(UiLayout::default()),
        }
    }
}

/// `config.json` next to the executable.
pub fn default_config_path() -> PathBuf {
    paths::get_exe_dir().join("config.json")
}

/// Loads configuration from `config_path` or returns defaults.
pub fn load_config(config_path: &Path) -> ScannerConfig {
    log::info!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        log::info!("config.json not found. Using default config.");
        return ScannerConfig::default();
    }

    match fs::read_to_string(config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                log::info!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config.json: {}. Using defaults.", e);
                ScannerConfig::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read config.json: {}. Using defaults.", e);
            ScannerConfig::default()
        }
    }
}

/// Converts a wait in seconds to a duration; negative values become zero.
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config, ScannerConfig::default());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(&path), ScannerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"adb": {"port": 5565, "emulator": "ld"}, "timings": {"gov_open": 3.5}}"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.adb.port, 5565);
        assert_eq!(config.adb.emulator, Emulator::LdPlayer);
        assert_eq!(config.adb.retry_attempts, 3);
        assert_eq!(config.timings.gov_open, 3.5);
        assert_eq!(config.timings.copy_wait, 0.2);
        assert_eq!(config.scan.power_cutoff, 35_000_000);
    }

    #[test]
    fn test_bundled_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.json");
        let contents = fs::read_to_string(path).unwrap();
        let config: ScannerConfig = serde_json::from_str(&contents).unwrap();
        assert_eq!(config.scan.options, ScanOptions::full());
    }

    #[test]
    fn test_bluestacks_port_overrides_configured_port() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("bluestacks.conf");
        fs::write(
            &conf,
            concat!(
                "bst.instance.Pie64.display_name=\"Main\"\n",
                "bst.instance.Pie64.status.adb_port=\"5585\"\n",
            ),
        )
        .unwrap();

        let mut adb = AdbSettings {
            bluestacks_config: Some(conf),
            bluestacks_instance: Some("Main".to_string()),
            ..Default::default()
        };
        assert_eq!(adb.resolved_port(), 5585);

        adb.bluestacks_instance = Some("Other".to_string());
        assert_eq!(adb.resolved_port(), 5555);
    }

    #[test]
    fn test_layout_defaults_to_builtin_profile() {
        let config = ScannerConfig::default();
        assert_eq!(config.layout().unwrap(), UiLayout::default());
    }

    #[test]
    fn test_secs() {
        assert_eq!(secs(0.5), Duration::from_millis(500));
        assert_eq!(secs(-1.0), Duration::ZERO);
    }
}
