//! Writer thread draining the record queue into a sink.

use std::sync::mpsc::Receiver;

use super::queue::RecordMessage;
use super::RecordSink;

/// Runs the writer loop.
///
/// Writes records until the channel is closed (every sender dropped), then
/// returns how many were written. A failed write is logged and the loop
/// moves on to the next record.
///
/// This function blocks until the channel closes, so it should be run in a
/// dedicated thread.
pub fn run_record_writer<S: RecordSink>(receiver: Receiver<RecordMessage>, mut sink: S) -> usize {
    log::debug!("Record writer started");
    let mut written = 0;

    for msg in receiver {
        match sink.write_record(&msg) {
            Ok(()) => written += 1,
            Err(e) => log::error!(
                "Record writer: failed to write #{} {}: {:#}",
                msg.sequence,
                msg.record.label(),
                e
            ),
        }
    }

    if let Err(e) = sink.flush() {
        log::error!("Record writer: flush failed: {:#}", e);
    }
    log::debug!("Record writer finished ({} records)", written);
    written
}
