//! Ranked-list scan that opens every governor and reads its detail pages.

use anyhow::Result;
use chrono::NaiveDate;
use image::RgbaImage;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::callbacks::{Callbacks, ProgressInfo, ScanPhase};
use super::review::{archive_for_review, archive_inactive, ReviewReason};
use super::session::{new_run_id, ScanSession, StopHandle};
use super::state::ScanState;
use super::timing::wait_random_range;
use crate::config::{ScanDefaults, Timings};
use crate::device::Device;
use crate::error::ScanError;
use crate::layout::{UiLayout, DIRECT_ROWS};
use crate::ocr::extract::MAX_LEVEL;
use crate::ocr::{RecognitionMode, ScreenReader};
use crate::paths::ScanPaths;
use crate::record::{EntityRecord, Field, ScanOptions, TIERS};
use crate::validation::{validate_kills, CheckState, PowerTracker, ValidationOutcome};

/// How a scan ended without a device failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Target reached or the list ran out
    Completed,
    /// Stopped through `end_scan`
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub run_id: String,
    pub start_date: NaiveDate,
    pub label: String,
    pub outcome: ScanOutcome,
    /// Records emitted by the main pass
    pub scanned: usize,
    /// Inactive rows, plus governors below the minimum level
    pub inactive: usize,
    /// Records re-emitted by the level pass
    pub level_checked: usize,
}

/// Settings of the optional city hall level pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCheckOptions {
    /// Governors below this level count as inactive
    pub min_level: u8,
    /// At or above this power the level is assumed to be the maximum
    pub power_cutoff: u64,
    /// Screenshots taken per governor before giving up on its level
    pub screenshots: u32,
}

/// Per-run options of a drill-down scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillDownOptions {
    pub fields: ScanOptions,
    /// Skip the first four ranks, assumed scanned by an earlier run
    pub resume: bool,
    pub track_inactives: bool,
    /// Nudge past inactive rows with the recorded scroll script
    pub advanced_scroll: bool,
    pub validate_kills: bool,
    pub reconstruct_kills: bool,
    pub validate_power: bool,
    pub level_check: Option<LevelCheckOptions>,
}

impl From<&ScanDefaults> for DrillDownOptions {
    fn from(d: &ScanDefaults) -> Self {
        Self {
            fields: d.options.clone(),
            resume: d.resume,
            track_inactives: d.track_inactives,
            advanced_scroll: d.advanced_scroll,
            validate_kills: d.validate_kills,
            reconstruct_kills: d.reconstruct_kills,
            validate_power: d.validate_power,
            level_check: d.check_city_hall.then(|| LevelCheckOptions {
                min_level: d.min_city_hall,
                power_cutoff: d.power_cutoff,
                screenshots: d.level_screenshots,
            }),
        }
    }
}

/// Fixed collaborators of a scanner, set once at construction.
#[derive(Debug, Clone)]
pub struct DrillDownConfig {
    pub layout: UiLayout,
    pub timings: Timings,
    pub paths: ScanPaths,
    /// Retaps of an empty row before the continue handler is asked
    pub inactive_retries: u32,
    pub name_copy_attempts: u32,
}

/// What opening one rank produced.
enum RankScan {
    Scanned(EntityScan),
    /// The id was already scanned; the list stopped moving
    Duplicate,
    /// No governor could be opened and the continue handler said stop
    GaveUp,
}

struct EntityScan {
    record: EntityRecord,
    profile: RgbaImage,
    kills: Option<RgbaImage>,
}

/// Reading of the rank indicator after a duplicate.
enum Indicator {
    Terminal,
    Inconclusive,
}

/// Mutable state of one `start_scan` call.
pub(super) struct Run {
    pub opts: DrillDownOptions,
    pub session: ScanSession,
    power: PowerTracker,
    seen: HashSet<String>,
    /// Inactive rows skipped so far; shifts the directly tapped rows
    skips: usize,
    /// Scanning the last two ranks
    tail: bool,
    pub level_queue: Vec<EntityRecord>,
    pub level_checked: usize,
    inactive_dir: PathBuf,
    review_dir: PathBuf,
}

impl Run {
    fn new(run_id: &str, target: usize, opts: &DrillDownOptions, paths: &ScanPaths) -> Self {
        let session = ScanSession::new(run_id, target);
        Self {
            inactive_dir: paths.inactive_dir(session.start_date, run_id),
            review_dir: paths.review_dir(session.start_date, run_id),
            opts: opts.clone(),
            session,
            power: PowerTracker::new(),
            seen: HashSet::new(),
            skips: 0,
            tail: false,
            level_queue: Vec::new(),
            level_checked: 0,
        }
    }
}

/// Walks the ranking, opening one governor at a time.
///
/// The scanner owns the device for its lifetime. `start_scan` blocks the
/// calling thread; stop it from elsewhere through [`StopHandle`].
pub struct DrillDownScanner<D: Device, R: ScreenReader> {
    pub(super) device: D,
    pub(super) reader: R,
    pub(super) layout: UiLayout,
    pub(super) timings: Timings,
    paths: ScanPaths,
    inactive_retries: u32,
    name_copy_attempts: u32,
    pub(super) callbacks: Callbacks,
    pub(super) stop: StopHandle,
    run_id: String,
    state: ScanState,
}

impl<D: Device, R: ScreenReader> DrillDownScanner<D, R> {
    /// Fails when the layout profile does not validate.
    pub fn new(device: D, reader: R, config: DrillDownConfig) -> Result<Self> {
        config.layout.validate()?;
        Ok(Self {
            device,
            reader,
            layout: config.layout,
            timings: config.timings,
            paths: config.paths,
            inactive_retries: config.inactive_retries.max(1),
            name_copy_attempts: config.name_copy_attempts.max(1),
            callbacks: Callbacks::default(),
            stop: StopHandle::new(),
            run_id: new_run_id(),
            state: ScanState::Idle,
        })
    }

    pub fn set_state_callback(&mut self, cb: impl FnMut(&ScanState) + Send + 'static) {
        self.callbacks.state = Some(Box::new(cb));
    }

    pub fn set_entity_callback(
        &mut self,
        cb: impl FnMut(&EntityRecord, &ProgressInfo) + Send + 'static,
    ) {
        self.callbacks.entity = Some(Box::new(cb));
    }

    /// Asked whether to keep retrying a row that never opens a governor.
    pub fn set_continue_handler(&mut self, handler: impl FnMut(&str) -> bool + Send + 'static) {
        self.callbacks.continue_handler = Some(Box::new(handler));
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

    /// Scans `target` governors.
    ///
    /// Returns `Err` only when the device is gone; stopping early and
    /// running out of governors are `Ok` summaries.
    pub fn start_scan(
        &mut self,
        label: &str,
        target: usize,
        options: &DrillDownOptions,
    ) -> Result<ScanSummary, ScanError> {
        self.stop.begin();
        let mut run = Run::new(&self.run_id, target, options, &self.paths);
        if options.validate_kills && !options.fields.covers_kill_validation() {
            log::info!("Kill check off: not every kill tier and the kill points are scanned");
        }
        log::info!(
            "Starting {} scan: {} governors{} (run {})",
            label,
            target,
            if options.resume { ", resuming" } else { "" },
            self.run_id
        );

        let result = self.run(&mut run);
        self.device.disconnect();

        match result {
            Ok(outcome) => {
                self.set_state(match outcome {
                    ScanOutcome::Completed => ScanState::Completed,
                    ScanOutcome::Aborted => ScanState::Aborted,
                });
                log::info!(
                    "Scan {:?}: {} governors, {} inactive",
                    outcome,
                    run.session.processed,
                    run.session.inactive
                );
                Ok(ScanSummary {
                    run_id: self.run_id.clone(),
                    start_date: run.session.start_date,
                    label: label.to_string(),
                    outcome,
                    scanned: run.session.processed,
                    inactive: run.session.inactive,
                    level_checked: run.level_checked,
                })
            }
            Err(e) => {
                log::error!("Scan failed after {} governors: {}", run.session.processed, e);
                self.set_state(ScanState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    pub(super) fn set_state(&mut self, state: ScanState) {
        log::debug!("State: {}", state);
        if state.is_terminal() {
            self.stop.finish();
        }
        self.callbacks.state(&state);
        self.state = state;
    }

    pub(super) fn wait(&self, base: f64) {
        wait_random_range(base, self.timings.max_random);
    }

    fn run(&mut self, run: &mut Run) -> Result<ScanOutcome, ScanError> {
        self.set_state(ScanState::Initializing);
        self.device.connect()?;

        let first = if run.opts.resume { DIRECT_ROWS } else { 0 };
        let mut last_rank: Option<usize> = None;
        let mut outcome = ScanOutcome::Completed;

        'ranks: for i in first..first + run.session.target {
            if self.stop.is_stopped() {
                log::info!("{}", ScanError::UserAbort);
                outcome = ScanOutcome::Aborted;
                break;
            }

            let mut rank = last_rank.map_or(i, |prev| (prev + 1).max(i));
            let mut rescanned = false;
            loop {
                let started = Instant::now();
                match self.scan_rank(run, rank)? {
                    RankScan::Scanned(scan) => {
                        self.finish_entity(run, scan, started.elapsed());
                        break;
                    }
                    RankScan::GaveUp => break,
                    RankScan::Duplicate => {
                        self.set_state(ScanState::DuplicateCheck { rank });
                        match self.read_rank_indicator()? {
                            Indicator::Terminal if !run.tail => {
                                run.tail = true;
                                rank = self.layout.ranking.tail.second_last;
                                log::info!(
                                    "End of the ranking reached, scanning the last two governors"
                                );
                                self.set_state(ScanState::TailMode { rank });
                            }
                            Indicator::Terminal => {
                                log::info!("No governors left in the ranking");
                                break 'ranks;
                            }
                            Indicator::Inconclusive if !rescanned => {
                                log::info!("Rescanning rank {}", rank + 1);
                                rescanned = true;
                            }
                            Indicator::Inconclusive => {
                                log::warn!(
                                    "Rank {} still shows a scanned governor, skipping",
                                    rank + 1
                                );
                                break;
                            }
                        }
                    }
                }
            }
            last_rank = Some(rank);
        }

        if outcome == ScanOutcome::Completed {
            if let Some(level) = run.opts.level_check.clone() {
                if !run.level_queue.is_empty() {
                    outcome = self.run_level_check(run, &level)?;
                }
            }
        }
        Ok(outcome)
    }

    fn scan_rank(&mut self, run: &mut Run, rank: usize) -> Result<RankScan, ScanError> {
        self.set_state(ScanState::OpeningEntity { rank });
        let Some(profile) = self.open_entity(run, rank)? else {
            return Ok(RankScan::GaveUp);
        };

        let fields = run.opts.fields.clone();
        let mut record = EntityRecord::default();

        if fields.page_needed(1) {
            self.set_state(ScanState::ScanningPage { rank, page: 1 });
            self.read_profile(&profile, &fields, &mut record)?;
            if let Some(id) = &record.id {
                if run.seen.contains(id) {
                    log::info!("Governor {} was already scanned", id);
                    self.close_entity(rank, false)?;
                    return Ok(RankScan::Duplicate);
                }
            }
        }

        let kills = if fields.page_needed(2) {
            self.set_state(ScanState::ScanningPage { rank, page: 2 });
            Some(self.read_kills(&fields, &mut record)?)
        } else {
            None
        };

        let info_opened = fields.page_needed(3);
        if info_opened {
            self.set_state(ScanState::ScanningPage { rank, page: 3 });
            self.read_more_info(&fields, &mut record)?;
        }

        self.close_entity(rank, info_opened)?;

        if let Some(id) = &record.id {
            run.seen.insert(id.clone());
        }
        Ok(RankScan::Scanned(EntityScan {
            record,
            profile,
            kills,
        }))
    }

    /// Taps the row for `rank` until a governor profile opens.
    ///
    /// Returns the profile screenshot, or `None` when the continue handler
    /// gives up on the row.
    fn open_entity(&mut self, run: &mut Run, rank: usize) -> Result<Option<RgbaImage>, ScanError> {
        let mut tap = self.layout.ranking.row_tap(rank, run.skips);
        self.device.tap(tap)?;
        self.wait(self.timings.gov_open);

        let mut retries = 0;
        loop {
            self.set_state(ScanState::DetectingValidity { rank });
            let frame = self.device.screenshot()?;
            if self.is_entity_open(&frame) {
                return Ok(Some(frame));
            }

            retries += 1;
            run.skips += 1;
            run.session.inactive += 1;
            log::info!(
                "No governor opened at rank {} ({} inactive so far)",
                rank + 1,
                run.session.inactive
            );
            if run.opts.track_inactives {
                let area = self.layout.ranking.inactive_area(tap.y);
                archive_inactive(&run.inactive_dir, run.session.inactive, &frame, &area);
            }

            if retries >= self.inactive_retries {
                let prompt = format!(
                    "Could not open a governor at rank {} after {} tries. Keep trying?",
                    rank + 1,
                    retries
                );
                if !self.callbacks.ask_continue(&prompt) {
                    log::warn!("{}, skipping", ScanError::AmbiguousEntityState { rank });
                    return Ok(None);
                }
                retries = 0;
            }

            if run.opts.advanced_scroll {
                let script = self.layout.ranking.scroll_script.clone();
                self.device.replay_input_script(&script)?;
            } else {
                let [from, to] = self.layout.ranking.scroll_swipe;
                self.device.swipe(from, to, 300)?;
            }
            self.wait(self.timings.scroll_wait);

            tap = self.layout.ranking.row_tap(rank, run.skips);
            self.device.tap(tap)?;
            self.wait(self.timings.gov_open);
        }
    }

    /// The detail marker is only on screen while a profile is open.
    fn is_entity_open(&self, frame: &RgbaImage) -> bool {
        let normalize = |s: &str| -> String {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect()
        };
        match self.reader.read_line(frame, &self.layout.regions.detail_marker) {
            Some(text) => normalize(&text).contains(&normalize(&self.layout.detail_marker_text)),
            None => false,
        }
    }

    fn read_profile(
        &mut self,
        frame: &RgbaImage,
        fields: &ScanOptions,
        record: &mut EntityRecord,
    ) -> Result<(), ScanError> {
        let regions = &self.layout.regions;
        if fields.id {
            let id = self
                .reader
                .recognize_number(frame, &regions.id, RecognitionMode::SingleLine);
            record.id = (!id.is_empty()).then_some(id);
        }
        if fields.power {
            record.power = self.reader.read_stat(frame, &regions.power);
        }
        if fields.killpoints {
            record.killpoints = self.reader.read_stat(frame, &regions.killpoints);
        }
        if fields.alliance {
            record.alliance = self
                .reader
                .read_line(frame, &regions.alliance)
                .map_or(Field::Unknown, Field::Value);
        }
        if fields.name {
            record.name = self.copy_name()?;
        }
        Ok(())
    }

    /// Copies the name through the game's copy button and the clipboard.
    fn copy_name(&mut self) -> Result<Option<String>, ScanError> {
        for attempt in 1..=self.name_copy_attempts {
            self.device.tap(self.layout.taps.name_copy)?;
            self.wait(self.timings.copy_wait);
            match self.device.read_clipboard() {
                Ok(text) if !text.trim().is_empty() => return Ok(Some(text.trim().to_string())),
                Ok(_) => log::debug!("Name copy {}: clipboard empty", attempt),
                Err(e) => log::warn!("Name copy {} failed: {:#}", attempt, e),
            }
        }
        log::warn!("Could not copy governor name");
        Ok(None)
    }

    fn read_kills(
        &mut self,
        fields: &ScanOptions,
        record: &mut EntityRecord,
    ) -> Result<RgbaImage, ScanError> {
        self.device.tap(self.layout.taps.open_kills)?;
        self.wait(self.timings.kills_open);
        let frame = self.device.screenshot()?;

        let regions = &self.layout.regions;
        for t in (0..TIERS).filter(|&t| fields.tier_kills[t]) {
            record.tier_kills[t] = self.reader.read_stat(&frame, &regions.tier_kills[t]);
            record.tier_killpoints[t] = self.reader.read_stat(&frame, &regions.tier_killpoints[t]);
        }
        if fields.ranged {
            record.ranged_points = self.reader.read_stat(&frame, &regions.ranged_points);
        }
        Ok(frame)
    }

    fn read_more_info(
        &mut self,
        fields: &ScanOptions,
        record: &mut EntityRecord,
    ) -> Result<(), ScanError> {
        self.device.tap(self.layout.taps.more_info)?;
        self.wait(self.timings.info_open);
        let frame = self.device.screenshot()?;

        let regions = &self.layout.regions;
        if fields.deaths {
            record.deaths = self.reader.read_stat(&frame, &regions.deaths);
        }
        if fields.resources_assisted {
            record.resources_assisted = self.reader.read_stat(&frame, &regions.resources_assisted);
        }
        if fields.resources_gathered {
            record.resources_gathered = self.reader.read_stat(&frame, &regions.resources_gathered);
        }
        if fields.helps {
            record.helps = self.reader.read_stat(&frame, &regions.helps);
        }
        Ok(())
    }

    /// Closes the more info page, if open, then the profile.
    fn close_entity(&mut self, rank: usize, info_opened: bool) -> Result<(), ScanError> {
        self.set_state(ScanState::ClosingEntity { rank });
        if info_opened {
            self.device.tap(self.layout.taps.close_info)?;
            self.wait(self.timings.info_close);
        }
        self.device.tap(self.layout.taps.close_entity)?;
        self.wait(self.timings.gov_close);
        Ok(())
    }

    fn read_rank_indicator(&mut self) -> Result<Indicator, ScanError> {
        let frame = self.device.screenshot()?;
        let digits = self.reader.recognize_number(
            &frame,
            &self.layout.regions.rank_indicator,
            RecognitionMode::SingleWord,
        );
        match digits.parse::<u64>() {
            Ok(v) if v == self.layout.ranking.tail.terminal_indicator => Ok(Indicator::Terminal),
            _ => {
                log::info!("Rank indicator reads '{}'", digits);
                Ok(Indicator::Inconclusive)
            }
        }
    }

    /// Validates, archives and emits a scanned governor.
    fn finish_entity(&mut self, run: &mut Run, scan: EntityScan, elapsed: Duration) {
        let EntityScan {
            mut record,
            profile,
            kills,
        } = scan;

        let kills_outcome = if run.opts.validate_kills && run.opts.fields.covers_kill_validation() {
            validate_kills(&mut record, run.opts.reconstruct_kills)
        } else {
            ValidationOutcome::default()
        };
        let power_state = if run.opts.validate_power {
            run.power.state_for(&record.power)
        } else {
            CheckState::NotChecked
        };

        let id = record.id.clone().unwrap_or_else(|| "unknown".to_string());
        if kills_outcome.state == CheckState::Failed {
            let reason = if kills_outcome.reconstructed {
                ReviewReason::Reconstructed
            } else {
                ReviewReason::Kills
            };
            archive_for_review(&run.review_dir, reason, &id, &profile, kills.as_ref());
        }
        if power_state == CheckState::Failed {
            archive_for_review(&run.review_dir, ReviewReason::Power, &id, &profile, None);
        }

        if let Some(level) = &run.opts.level_check {
            match record.power.get() {
                Some(power) if power >= level.power_cutoff => {
                    record.city_hall = Field::Value(MAX_LEVEL)
                }
                _ if record.id.is_some() => run.level_queue.push(record.clone()),
                _ => record.city_hall = Field::Unknown,
            }
        }

        run.session.processed += 1;
        run.session.record_duration(elapsed);
        log::info!(
            "Governor {}/{}: {} in {:.1}s",
            run.session.processed,
            run.session.target,
            record.label(),
            elapsed.as_secs_f64()
        );

        let progress = ProgressInfo {
            current: run.session.processed,
            target: run.session.target,
            inactive: run.session.inactive,
            power: power_state,
            kills: kills_outcome,
            remaining: run
                .session
                .remaining_time(run.session.target.saturating_sub(run.session.processed)),
            phase: ScanPhase::Main,
        };
        self.callbacks.entity(&record, &progress);
    }
}
