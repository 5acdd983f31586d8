use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Hint to the OCR engine about the shape of the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecognitionMode {
    SingleWord,
    SingleLine,
    SingleChar,
}

impl RecognitionMode {
    /// Tesseract page segmentation mode.
    pub fn psm(self) -> u8 {
        match self {
            RecognitionMode::SingleWord => 8,
            RecognitionMode::SingleLine => 7,
            RecognitionMode::SingleChar => 10,
        }
    }
}

/// Character whitelist for numeric fields.
pub const DIGITS: &str = "0123456789";

/// Turns a preprocessed image into text.
pub trait TextRecognizer {
    fn recognize(
        &self,
        img: &GrayImage,
        mode: RecognitionMode,
        whitelist: Option<&str>,
    ) -> Result<String>;
}

/// Tesseract driven through its command line.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
        }
    }

    fn command(
        &self,
        input: &std::path::Path,
        mode: RecognitionMode,
        whitelist: Option<&str>,
    ) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input)
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg("eng")
            .arg("--oem")
            .arg("1")
            .arg("--psm")
            .arg(mode.psm().to_string());
        if let Some(chars) = whitelist {
            cmd.arg("-c").arg(format!("tessedit_char_whitelist={}", chars));
        }
        cmd
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(
        &self,
        img: &GrayImage,
        mode: RecognitionMode,
        whitelist: Option<&str>,
    ) -> Result<String> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let output = self
            .command(temp_input.path(), mode, whitelist)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
