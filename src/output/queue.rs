//! Record queue between the scan thread and the writer thread.
//!
//! Uses std::sync::mpsc: the scan callbacks send finished records, the
//! writer thread receives them in the same order.

use chrono::{DateTime, Local};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::record::EntityRecord;
use crate::scanner::ScanPhase;

/// A finished record on its way to the sink.
#[derive(Debug, Clone)]
pub struct RecordMessage {
    pub record: EntityRecord,
    /// 1-based position in the scan
    pub sequence: usize,
    pub phase: ScanPhase,
    pub emitted_at: DateTime<Local>,
}

impl RecordMessage {
    pub fn new(record: EntityRecord, sequence: usize, phase: ScanPhase) -> Self {
        Self {
            record,
            sequence,
            phase,
            emitted_at: Local::now(),
        }
    }
}

/// Creates an unbounded record queue; records wait if the sink is slow.
pub fn create_record_queue() -> (Sender<RecordMessage>, Receiver<RecordMessage>) {
    channel()
}
