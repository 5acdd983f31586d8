use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINED_DATA: &str = "eng.traineddata";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALLS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALLS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(windows)]
const SYSTEM_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Clone, Debug)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Optional locations taken from the configuration file.
#[derive(Clone, Debug, Default)]
pub struct TesseractOverrides {
    pub executable: Option<PathBuf>,
    pub tessdata: Option<PathBuf>,
}

/// Ensures Tesseract and English trained data are available.
///
/// The trained data is downloaded into `data_dir/tessdata` when no
/// installed copy is found.
pub fn ensure_tesseract(data_dir: &Path, overrides: &TesseractOverrides) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(data_dir, overrides)?;

    let tessdata = match find_tessdata_dir(data_dir, overrides) {
        Ok(dir) => dir,
        Err(_) => {
            log::info!("{} not found locally, downloading...", TRAINED_DATA);
            let dir = data_dir.join("tessdata");
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            download_tessdata(&dir)?;
            dir
        }
    };

    log::info!(
        "Tesseract ready: {} (tessdata {})",
        executable.display(),
        tessdata.display()
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads English trained data
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    let eng_url = format!("{}/{}", TESSDATA_REPO, TRAINED_DATA);
    let eng_path = tessdata_dir.join(TRAINED_DATA);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "kingdom-scanner")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINED_DATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&eng_path)?;
    file.write_all(&bytes)?;

    log::info!("Downloaded {} ({} bytes)", TRAINED_DATA, bytes.len());

    Ok(())
}

fn responds_to_version(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable: override, local data dir, PATH, then
/// common install locations.
pub fn find_tesseract_executable(
    data_dir: &Path,
    overrides: &TesseractOverrides,
) -> Result<PathBuf> {
    if let Some(path) = &overrides.executable {
        if path.exists() {
            return Ok(path.clone());
        }
        log::warn!("Configured Tesseract {} does not exist", path.display());
    }

    let local_exe = data_dir.join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    for dir in COMMON_INSTALLS {
        let p = Path::new(dir).join(EXECUTABLE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR, add it to PATH, or set \
         tesseract.executable in config.json"
    ))
}

/// Finds a directory holding English trained data.
pub fn find_tessdata_dir(data_dir: &Path, overrides: &TesseractOverrides) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    candidates.extend(overrides.tessdata.clone());
    candidates.push(data_dir.join("tessdata"));
    candidates.extend(SYSTEM_TESSDATA.iter().map(PathBuf::from));

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates
        .into_iter()
        .find(|dir| dir.join(TRAINED_DATA).exists())
        .ok_or_else(|| {
            anyhow!("tessdata directory not found. Please ensure {} is available.", TRAINED_DATA)
        })
}
