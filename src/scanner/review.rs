//! Screenshot archives written during a drill-down scan.
//!
//! Archiving never fails a scan: write errors are logged and the scan moves on.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::PixelRect;
use crate::ocr::crop_region;

/// Why a record was sent to manual review. The letter prefixes the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    /// Power out of ranking order
    Power,
    /// Kills inconsistent and left as read
    Kills,
    /// Kills inconsistent, one tier reconstructed
    Reconstructed,
}

impl ReviewReason {
    pub fn prefix(self) -> char {
        match self {
            ReviewReason::Power => 'P',
            ReviewReason::Kills => 'F',
            ReviewReason::Reconstructed => 'R',
        }
    }
}

fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    img.save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

/// Saves the profile (and, when there is one, kills) screenshot of a record
/// as `<P|F|R><id>-profile.png` and `<P|F|R><id>-kills.png`.
///
/// Returns the files written.
pub fn archive_for_review(
    dir: &Path,
    reason: ReviewReason,
    id: &str,
    profile: &RgbaImage,
    kills: Option<&RgbaImage>,
) -> Vec<PathBuf> {
    let mut written = Vec::new();
    let stem = format!("{}{}", reason.prefix(), id);

    let mut images = vec![(profile, "profile")];
    images.extend(kills.map(|k| (k, "kills")));

    for (img, page) in images {
        let path = dir.join(format!("{}-{}.png", stem, page));
        match save_png(img, &path) {
            Ok(()) => {
                log::info!("Archived {} for manual review", path.display());
                written.push(path);
            }
            Err(e) => log::warn!("Manual review archive failed: {:#}", e),
        }
    }
    written
}

/// Saves the screen area around an inactive row as `inactive NNN.png`.
pub fn archive_inactive(
    dir: &Path,
    number: usize,
    frame: &RgbaImage,
    area: &PixelRect,
) -> Option<PathBuf> {
    let crop = crop_region(frame, area);
    if crop.width() == 0 || crop.height() == 0 {
        log::warn!("Inactive row {} is outside the screenshot, not archived", number);
        return None;
    }

    let path = dir.join(format!("inactive {:03}.png", number));
    match save_png(&crop, &path) {
        Ok(()) => {
            log::debug!("Archived inactive row to {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::warn!("Inactive archive failed: {:#}", e);
            None
        }
    }
}
