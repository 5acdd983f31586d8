//! CSV sink for scan results.
//!
//! Append-only: every record is written and flushed as soon as it arrives,
//! so an interrupted scan keeps everything gathered so far.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::queue::RecordMessage;
use super::RecordSink;
use crate::record::{EntityRecord, TIERS};

const CSV_HEADER: &str = "sequence,pass,timestamp,id,name,power,killpoints,\
t1_kills,t2_kills,t3_kills,t4_kills,t5_kills,t45_kills,total_kills,\
t1_killpoints,t2_killpoints,t3_killpoints,t4_killpoints,t5_killpoints,\
ranged_points,deaths,rss_assisted,rss_gathered,helps,alliance,city_hall,\
honor_points,kills_reconstructed,name_image";

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Quotes a field when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(msg: &RecordMessage) -> String {
    let r: &EntityRecord = &msg.record;
    let mut fields: Vec<String> = vec![
        msg.sequence.to_string(),
        msg.phase.to_string(),
        msg.emitted_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        r.id.clone().unwrap_or_default(),
        r.name.clone().unwrap_or_default(),
        r.power.to_string(),
        r.killpoints.to_string(),
    ];
    fields.extend(r.tier_kills.iter().map(|k| k.to_string()));
    fields.push(r.t45_kills().to_string());
    fields.push(r.total_kills().to_string());
    fields.extend((0..TIERS).map(|t| r.tier_killpoints[t].to_string()));
    fields.extend([
        r.ranged_points.to_string(),
        r.deaths.to_string(),
        r.resources_assisted.to_string(),
        r.resources_gathered.to_string(),
        r.helps.to_string(),
        r.alliance.to_string(),
        r.city_hall.to_string(),
        r.honor_points.to_string(),
        r.kills_reconstructed.to_string(),
        r.name_image
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    ]);

    fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Appends one result row to the CSV file.
///
/// Opens the file in append mode for each write, ensuring crash safety.
pub fn append_to_csv(path: &Path, msg: &RecordMessage) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    writeln!(file, "{}", format_row(msg)).context("Failed to write CSV row")?;
    Ok(())
}

/// A result file under `scans/`.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates the file with a header unless it already has content.
    pub fn create(path: PathBuf) -> Result<Self> {
        init_csv(&path)?;
        log::info!("Writing results to {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn write_record(&mut self, msg: &RecordMessage) -> Result<()> {
        append_to_csv(&self.path, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, Stat};
    use crate::scanner::ScanPhase;
    use tempfile::tempdir;

    fn sample() -> EntityRecord {
        EntityRecord {
            id: Some("12345678".to_string()),
            name: Some("Lord, \"Quoted\"".to_string()),
            power: Stat::Value(41_000_000),
            killpoints: Stat::Unknown,
            alliance: Field::Value("[ABC]Alpha".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_init_csv_creates_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("test.csv");

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_init_csv_preserves_existing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("test.csv");
        std::fs::write(&csv_path, "existing,data\n1,2,3\n").unwrap();

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("existing,data"));
    }

    #[test]
    fn test_row_matches_header_width() {
        let row = format_row(&RecordMessage::new(EntityRecord::default(), 1, ScanPhase::Main));
        assert_eq!(row.split(',').count(), CSV_HEADER.split(',').count());
    }

    #[test]
    fn test_sink_appends_escaped_rows() {
        let dir = tempdir().unwrap();
        let mut sink = CsvSink::create(dir.path().join("scan.csv")).unwrap();

        sink.write_record(&RecordMessage::new(sample(), 1, ScanPhase::Main))
            .unwrap();
        sink.write_record(&RecordMessage::new(sample(), 1, ScanPhase::LevelCheck))
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,main,"));
        assert!(lines[1].contains(",12345678,\"Lord, \"\"Quoted\"\"\",41000000,Unknown,Skipped,"));
        assert!(lines[2].starts_with("1,level_check,"));
    }
}
