//! Per-run bookkeeping and the cooperative stop flag.

use chrono::{Local, NaiveDate};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Length of the random run identifier.
const RUN_ID_LEN: usize = 8;

/// Random alphanumeric run identifier.
pub fn new_run_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RUN_ID_LEN)
        .map(char::from)
        .collect()
}

const READY: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;
const FINISHED: u8 = 3;

/// Shared stop flag; clone it into whatever thread should be able to stop
/// the scan.
///
/// The scan checks it once per entity (or page), never in the middle of one.
/// A stop requested before the scan starts is kept; one requested after the
/// scan finished is ignored.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicU8>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Calling it again, or after the scan ended, changes
    /// nothing.
    pub fn end_scan(&self) {
        let requested = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |phase| {
                matches!(phase, READY | RUNNING).then_some(STOPPING)
            });
        match requested {
            Ok(_) => log::info!("Stop requested, finishing current governor"),
            Err(FINISHED) => log::debug!("Scan already finished, stop ignored"),
            Err(_) => {}
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst) == STOPPING
    }

    /// Marks a scan as running, keeping a stop that is already pending.
    pub(crate) fn begin(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |phase| {
                (phase != STOPPING).then_some(RUNNING)
            });
    }

    pub(crate) fn finish(&self) {
        self.0.store(FINISHED, Ordering::SeqCst);
    }
}

/// One scan run. Lives for the duration of `start_scan`.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub run_id: String,
    pub start_date: NaiveDate,
    pub target: usize,
    durations: Vec<Duration>,
    pub processed: usize,
    pub inactive: usize,
}

impl ScanSession {
    pub fn new(run_id: &str, target: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            start_date: Local::now().date_naive(),
            target,
            durations: Vec::new(),
            processed: 0,
            inactive: 0,
        }
    }

    pub fn record_duration(&mut self, elapsed: Duration) {
        self.durations.push(elapsed);
    }

    /// Average duration so far times `remaining`.
    pub fn remaining_time(&self, remaining: usize) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.durations.iter().sum();
        let average = total / self.durations.len() as u32;
        average * remaining as u32
    }
}
