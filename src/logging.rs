//! Console and file logging behind the `log` facade.
//!
//! Every line goes to stdout and to `logs/kingdom_scanner.log` with a
//! timestamp. While a scan runs, lines are also appended to that scan's
//! `session.log`.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::paths;

/// Per-session log file, active while a scan is running.
static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

static LOGGER: ScanLogger = ScanLogger;

struct ScanLogger;

impl Log for ScanLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record.level(), &record.args().to_string());
        print!("{}", line);

        append_line(&paths::get_logs_dir().join("kingdom_scanner.log"), &line);

        if let Ok(session) = SESSION_LOG.lock() {
            if let Some(path) = session.as_ref() {
                append_line(path, &line);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Formats one log line: `[HH:MM:SS.mmm] LEVEL message`.
fn format_line(level: log::Level, msg: &str) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    format!("[{}] {:<5} {}\n", timestamp, level, msg)
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Installs the logger. Call once at startup.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

/// Activates (or with `None`, deactivates) the per-session log file.
pub fn set_session_log(path: Option<PathBuf>) {
    if let Ok(mut session) = SESSION_LOG.lock() {
        *session = path;
    }
}
