use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the input-event script directory: `<exe_dir>/resources/inputs/`
pub fn get_inputs_dir() -> PathBuf {
    get_exe_dir().join("resources").join("inputs")
}

/// Returns the directory for downloaded Tesseract data:
/// `<local data dir>/kingdom-scanner/tesseract/`, or `<exe_dir>/tesseract/`
/// when the platform has no local data dir.
pub fn get_tesseract_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("kingdom-scanner").join("tesseract"),
        None => get_exe_dir().join("tesseract"),
    }
}

/// Ensures the logs directory exists. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}

/// Output locations used by a scan.
#[derive(Clone, Debug)]
pub struct ScanPaths {
    /// Working images (current screenshots, name crops)
    pub temp_images: PathBuf,
    /// Finished result files
    pub scans: PathBuf,
    /// Root for archived crops of skipped rows
    pub inactives: PathBuf,
    /// Root for screenshots of records that failed validation
    pub manual_review: PathBuf,
}

impl ScanPaths {
    /// Lays out all scan directories below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            temp_images: root.join("temp_images"),
            scans: root.join("scans"),
            inactives: root.join("inactives"),
            manual_review: root.join("manual_review"),
        }
    }

    /// Default layout next to the executable.
    pub fn from_exe_dir() -> Self {
        Self::under(get_exe_dir())
    }

    /// `inactives/<date>/<run_id>/`
    pub fn inactive_dir(&self, date: NaiveDate, run_id: &str) -> PathBuf {
        self.inactives.join(date.to_string()).join(run_id)
    }

    /// `manual_review/<date>/<run_id>/`
    pub fn review_dir(&self, date: NaiveDate, run_id: &str) -> PathBuf {
        self.manual_review.join(date.to_string()).join(run_id)
    }

    /// Creates the directories every scan needs up front.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_images)?;
        std::fs::create_dir_all(&self.scans)?;
        Ok(())
    }
}
