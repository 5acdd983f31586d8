//! Result persistence: a record queue, a writer thread and a CSV sink.

pub mod csv_writer;
pub mod queue;
pub mod writer;

pub use csv_writer::CsvSink;
pub use queue::{create_record_queue, RecordMessage};
pub use writer::run_record_writer;

use anyhow::Result;
use chrono::NaiveDate;

/// Accepts finished records in scan order.
pub trait RecordSink {
    fn write_record(&mut self, msg: &RecordMessage) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `<prefix><count>-<date>-<label>-[<run_id>].csv`
pub fn result_file_name(
    prefix: &str,
    count: usize,
    date: NaiveDate,
    label: &str,
    run_id: &str,
) -> String {
    let label: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{}{}-{}-{}-[{}].csv", prefix, count, date, label, run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            result_file_name("TOP", 300, date, "kd 1234", "ab12cd34"),
            "TOP300-2024-05-01-kd_1234-[ab12cd34].csv"
        );
    }
}
