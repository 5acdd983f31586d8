//! Page-at-a-time scan of lists that show several governors per screen.
//!
//! No governor is opened: every row on screen is read from one screenshot,
//! then an input script scrolls exactly one page.

use anyhow::Result;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::callbacks::{BatchProgress, Callbacks};
use super::drilldown::{ScanOutcome, ScanSummary};
use super::session::{new_run_id, ScanSession, StopHandle};
use super::state::ScanState;
use super::timing::wait_random_range;
use crate::config::Timings;
use crate::device::Device;
use crate::error::ScanError;
use crate::layout::{PageLayout, PaginatedLayouts, RowRegions, UiLayout};
use crate::ocr::{crop_region, preprocess, RecognitionMode, ScreenReader};
use crate::paths::ScanPaths;
use crate::record::{EntityRecord, Stat};

/// Prefix of archived name images in the temp image folder.
const NAME_IMAGE_PREFIX: &str = "gov_name_";

/// Which list is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatedMode {
    /// Alliance members by power
    Alliance,
    /// Honor ranking by honor points
    Honor,
    /// Kingdom ranking read as a list, by power
    Seed,
}

impl PaginatedMode {
    pub fn page_layout(self, layouts: &PaginatedLayouts) -> &PageLayout {
        match self {
            PaginatedMode::Alliance => &layouts.alliance,
            PaginatedMode::Honor => &layouts.honor,
            PaginatedMode::Seed => &layouts.seed,
        }
    }

    /// Result file name prefix.
    pub fn file_prefix(self) -> &'static str {
        match self {
            PaginatedMode::Alliance => "Alliance",
            PaginatedMode::Honor => "Honor",
            PaginatedMode::Seed => "Seed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginatedConfig {
    pub layout: UiLayout,
    pub timings: Timings,
    pub paths: ScanPaths,
}

pub struct PaginatedScanner<D: Device, R: ScreenReader> {
    device: D,
    reader: R,
    layout: UiLayout,
    timings: Timings,
    paths: ScanPaths,
    callbacks: Callbacks,
    stop: StopHandle,
    run_id: String,
    state: ScanState,
}

impl<D: Device, R: ScreenReader> PaginatedScanner<D, R> {
    pub fn new(device: D, reader: R, config: PaginatedConfig) -> Result<Self> {
        config.layout.validate()?;
        Ok(Self {
            device,
            reader,
            layout: config.layout,
            timings: config.timings,
            paths: config.paths,
            callbacks: Callbacks::default(),
            stop: StopHandle::new(),
            run_id: new_run_id(),
            state: ScanState::Idle,
        })
    }

    pub fn set_state_callback(&mut self, cb: impl FnMut(&ScanState) + Send + 'static) {
        self.callbacks.state = Some(Box::new(cb));
    }

    pub fn set_batch_callback(
        &mut self,
        cb: impl FnMut(&[EntityRecord], &BatchProgress) + Send + 'static,
    ) {
        self.callbacks.batch = Some(Box::new(cb));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn end_scan(&self) {
        self.stop.end_scan();
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Reads up to `target` rows of the list, page by page.
    ///
    /// Stops early once a page's first row has no score, which means the
    /// list is scrolled to its end.
    pub fn start_scan(
        &mut self,
        label: &str,
        mode: PaginatedMode,
        target: usize,
    ) -> Result<ScanSummary, ScanError> {
        self.stop.begin();
        let mut session = ScanSession::new(&self.run_id, target);
        log::info!(
            "Starting {:?} scan '{}': {} governors (run {})",
            mode,
            label,
            target,
            self.run_id
        );

        let result = self.run(&mut session, mode);
        remove_name_images(&self.paths.temp_images);
        self.device.disconnect();

        match result {
            Ok(outcome) => {
                self.set_state(match outcome {
                    ScanOutcome::Completed => ScanState::Completed,
                    ScanOutcome::Aborted => ScanState::Aborted,
                });
                log::info!("Scan {:?}: {} governors", outcome, session.processed);
                Ok(ScanSummary {
                    run_id: self.run_id.clone(),
                    start_date: session.start_date,
                    label: label.to_string(),
                    outcome,
                    scanned: session.processed,
                    inactive: 0,
                    level_checked: 0,
                })
            }
            Err(e) => {
                log::error!("Scan failed after {} governors: {}", session.processed, e);
                self.set_state(ScanState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn set_state(&mut self, state: ScanState) {
        log::debug!("State: {}", state);
        if state.is_terminal() {
            self.stop.finish();
        }
        self.callbacks.state(&state);
        self.state = state;
    }

    fn run(
        &mut self,
        session: &mut ScanSession,
        mode: PaginatedMode,
    ) -> Result<ScanOutcome, ScanError> {
        self.set_state(ScanState::Initializing);
        self.device.connect()?;
        if let Err(e) = fs::create_dir_all(&self.paths.temp_images) {
            log::warn!("Failed to create {}: {}", self.paths.temp_images.display(), e);
        }

        let page_layout = mode.page_layout(&self.layout.paginated).clone();
        let rows = page_layout.rows_per_page();
        let pages = session.target.div_ceil(rows);
        // rows already emitted, to drop the overlap of the shifted last page
        let mut emitted: Vec<(Option<String>, Stat)> = Vec::new();

        for page in 0..pages {
            if self.stop.is_stopped() {
                log::info!("{}", ScanError::UserAbort);
                return Ok(ScanOutcome::Aborted);
            }
            let started = Instant::now();
            self.set_state(ScanState::ScanningBatch {
                page: page + 1,
                pages,
            });

            let frame = self.device.screenshot()?;
            let first_score = self.reader.recognize_number(
                &frame,
                &page_layout.rows[0].score,
                RecognitionMode::SingleWord,
            );
            let reached_bottom = first_score.is_empty();
            if reached_bottom {
                log::info!("Reached the end of the list on page {}", page + 1);
            }

            let mut batch = Vec::new();
            for (n, row) in page_layout.rows_for(reached_bottom).iter().enumerate() {
                if session.processed + batch.len() >= session.target {
                    break;
                }
                let name = self.reader.read_line(&frame, &row.name);
                let score = self.reader.read_stat(&frame, &row.score);
                if name.is_none() && !score.is_known() {
                    log::debug!("Row {} on page {} is empty", n + 1, page + 1);
                    continue;
                }
                let key = (name.clone(), score.clone());
                if reached_bottom && emitted.contains(&key) {
                    continue;
                }

                let mut record = EntityRecord {
                    name,
                    name_image: self.archive_name(&frame, row, &page_layout, page * rows + n),
                    ..Default::default()
                };
                match mode {
                    PaginatedMode::Honor => record.honor_points = score,
                    PaginatedMode::Alliance | PaginatedMode::Seed => record.power = score,
                }
                emitted.push(key);
                batch.push(record);
            }

            session.processed += batch.len();
            session.record_duration(started.elapsed());
            let progress = BatchProgress {
                current: session.processed,
                target: session.target,
                page: page + 1,
                pages,
                remaining: session.remaining_time(pages - page - 1),
            };
            log::info!(
                "Page {}/{}: {} governors ({} total)",
                page + 1,
                pages,
                batch.len(),
                session.processed
            );
            self.callbacks.batch(&batch, &progress);

            if reached_bottom || session.processed >= session.target {
                break;
            }
            if page + 1 < pages {
                self.device.replay_input_script(&page_layout.advance_script)?;
                wait_random_range(self.timings.page_advance, self.timings.max_random);
            }
        }
        Ok(ScanOutcome::Completed)
    }

    /// Saves a small, lightly cleaned copy of the row's name.
    fn archive_name(
        &self,
        frame: &RgbaImage,
        row: &RowRegions,
        layout: &PageLayout,
        index: usize,
    ) -> Option<PathBuf> {
        let crop = crop_region(frame, &row.name.rect);
        let prepared = preprocess(&crop, &layout.name_archive);
        let path = self
            .paths
            .temp_images
            .join(format!("{}{}.png", NAME_IMAGE_PREFIX, index));
        match prepared.save(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("Failed to save name image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Deletes archived name images left in `dir`.
pub fn remove_name_images(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_name_image = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(NAME_IMAGE_PREFIX) && n.ends_with(".png"));
        if is_name_image {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
