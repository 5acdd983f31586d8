//! Collaborator callbacks a scanner reports through.
//!
//! Every callback is optional. Callbacks run on the scan thread in scan
//! order, one call per state change, finished entity or finished page.

use std::fmt;
use std::time::Duration;

use super::state::ScanState;
use crate::record::EntityRecord;
use crate::validation::{CheckState, ValidationOutcome};

/// Which pass produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// The ranking walk
    Main,
    /// Re-emitted after the city hall level was read
    LevelCheck,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Main => write!(f, "main"),
            ScanPhase::LevelCheck => write!(f, "level_check"),
        }
    }
}

/// Progress reported with each drill-down record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Records emitted so far in this phase, including this one
    pub current: usize,
    pub target: usize,
    /// Inactive or skipped rows so far
    pub inactive: usize,
    pub power: CheckState,
    pub kills: ValidationOutcome,
    /// Estimated time left, from the average entity duration
    pub remaining: Duration,
    pub phase: ScanPhase,
}

/// Progress reported with each paginated batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// Records emitted so far, including this batch
    pub current: usize,
    pub target: usize,
    /// 1-based
    pub page: usize,
    pub pages: usize,
    pub remaining: Duration,
}

pub type StateCallback = Box<dyn FnMut(&ScanState) + Send>;
pub type EntityCallback = Box<dyn FnMut(&EntityRecord, &ProgressInfo) + Send>;
pub type BatchCallback = Box<dyn FnMut(&[EntityRecord], &BatchProgress) + Send>;
/// Gets a question, answers whether to keep trying.
pub type ContinueHandler = Box<dyn FnMut(&str) -> bool + Send>;

#[derive(Default)]
pub(crate) struct Callbacks {
    pub state: Option<StateCallback>,
    pub entity: Option<EntityCallback>,
    pub batch: Option<BatchCallback>,
    pub continue_handler: Option<ContinueHandler>,
}

impl Callbacks {
    pub fn state(&mut self, state: &ScanState) {
        if let Some(cb) = self.state.as_mut() {
            cb(state);
        }
    }

    pub fn entity(&mut self, record: &EntityRecord, progress: &ProgressInfo) {
        if let Some(cb) = self.entity.as_mut() {
            cb(record, progress);
        }
    }

    pub fn batch(&mut self, records: &[EntityRecord], progress: &BatchProgress) {
        if let Some(cb) = self.batch.as_mut() {
            cb(records, progress);
        }
    }

    /// Without a handler the answer is no.
    pub fn ask_continue(&mut self, prompt: &str) -> bool {
        match self.continue_handler.as_mut() {
            Some(handler) => handler(prompt),
            None => {
                log::info!("No continue handler, giving up: {}", prompt);
                false
            }
        }
    }
}
