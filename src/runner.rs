//! Console front-end plumbing: wires a scanner to ADB, Tesseract, a CSV
//! writer thread and the console.
//!
//! The scan runs on the calling thread. Records go over the record queue to
//! the writer thread; a console thread turns `q` + Enter into a stop
//! request and forwards every other line to the continue handler.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ScannerConfig;
use crate::device::AdbClient;
use crate::logging::set_session_log;
use crate::ocr::{ensure_tesseract, OcrReader, TesseractEngine};
use crate::output::{
    create_record_queue, result_file_name, run_record_writer, CsvSink, RecordMessage,
};
use crate::paths::{self, ScanPaths};
use crate::scanner::{
    DrillDownConfig, DrillDownOptions, DrillDownScanner, PaginatedConfig, PaginatedMode,
    PaginatedScanner, ScanPhase, ScanSummary, StopHandle,
};

/// How long the continue handler waits for an answer before giving up.
const ANSWER_TIMEOUT: Duration = Duration::from_secs(120);

/// What to scan.
#[derive(Debug, Clone)]
pub enum ScanKind {
    Kingdom(DrillDownOptions),
    List(PaginatedMode),
}

impl ScanKind {
    fn file_prefix(&self) -> &'static str {
        match self {
            ScanKind::Kingdom(options) if options.resume => "NEXT",
            ScanKind::Kingdom(_) => "TOP",
            ScanKind::List(mode) => mode.file_prefix(),
        }
    }
}

/// Runs one scan to the end and returns its summary.
///
/// A lost device comes back as a [`crate::ScanError`] inside the error.
pub fn run_scan(
    config: &ScannerConfig,
    label: &str,
    count: usize,
    kind: ScanKind,
) -> Result<ScanSummary> {
    let scan_paths = ScanPaths::from_exe_dir();
    scan_paths.ensure().context("Failed to create scan directories")?;

    let layout = config.layout()?;
    let tesseract = ensure_tesseract(&paths::get_tesseract_dir(), &config.tesseract.overrides())?;
    let reader = OcrReader::new(TesseractEngine::new(tesseract));
    let device = AdbClient::new(&config.adb, paths::get_inputs_dir());
    log::info!("Using device {}", device.serial());

    let date = Local::now().date_naive();
    let prefix = kind.file_prefix();

    match kind {
        ScanKind::Kingdom(options) => {
            let mut scanner = DrillDownScanner::new(
                device,
                reader,
                DrillDownConfig {
                    layout,
                    timings: config.timings.clone(),
                    paths: scan_paths.clone(),
                    inactive_retries: config.scan.inactive_retries,
                    name_copy_attempts: config.scan.name_copy_attempts,
                },
            )?;
            let run_id = scanner.run_id().to_string();
            let file_name = result_file_name(prefix, count, date, label, &run_id);
            let session = Session::start(&scan_paths, &file_name, &run_id)?;
            let answers = spawn_console(scanner.stop_handle());

            scanner.set_state_callback(|state| log::info!("{}", state));
            scanner.set_entity_callback(entity_forwarder(session.sender.clone()));
            scanner.set_continue_handler(move |prompt| ask_console(&answers, prompt));

            let result = scanner.start_scan(label, count, &options);
            drop(scanner);
            session.finish();
            Ok(result?)
        }
        ScanKind::List(mode) => {
            let mut scanner = PaginatedScanner::new(
                device,
                reader,
                PaginatedConfig {
                    layout,
                    timings: config.timings.clone(),
                    paths: scan_paths.clone(),
                },
            )?;
            let run_id = scanner.run_id().to_string();
            let file_name = result_file_name(prefix, count, date, label, &run_id);
            let session = Session::start(&scan_paths, &file_name, &run_id)?;
            // list scans never ask anything
            let _answers = spawn_console(scanner.stop_handle());

            scanner.set_state_callback(|state| log::info!("{}", state));
            let sender = session.sender.clone();
            let mut sequence = 0;
            scanner.set_batch_callback(move |records, progress| {
                log::info!(
                    "{}/{} governors, about {}s left",
                    progress.current,
                    progress.target,
                    progress.remaining.as_secs()
                );
                for record in records {
                    sequence += 1;
                    if sender
                        .send(RecordMessage::new(record.clone(), sequence, ScanPhase::Main))
                        .is_err()
                    {
                        log::error!("Record writer is gone, {} not saved", record.label());
                    }
                }
            });

            let result = scanner.start_scan(label, mode, count);
            drop(scanner);
            session.finish();
            Ok(result?)
        }
    }
}

/// Result file, writer thread and session log of one run.
struct Session {
    sender: Sender<RecordMessage>,
    writer: JoinHandle<usize>,
    csv_path: PathBuf,
}

impl Session {
    fn start(scan_paths: &ScanPaths, file_name: &str, run_id: &str) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let session_dir = paths::get_logs_dir().join(format!("{}-{}", timestamp, run_id));
        fs::create_dir_all(&session_dir)
            .with_context(|| {
                format!("Failed to create session directory {}", session_dir.display())
            })?;
        set_session_log(Some(session_dir.join("session.log")));

        let csv_path = scan_paths.scans.join(file_name);
        let sink = CsvSink::create(csv_path.clone())?;
        let (sender, receiver) = create_record_queue();
        let writer = thread::spawn(move || run_record_writer(receiver, sink));

        log::info!("Session folder: {}", session_dir.display());
        log::info!("Type q and press Enter to stop after the current governor");
        Ok(Self {
            sender,
            writer,
            csv_path,
        })
    }

    /// Closes the queue, waits for the writer and ends the session log.
    ///
    /// Every other sender must be dropped first, or this blocks.
    fn finish(self) {
        drop(self.sender);
        log::info!("Waiting for record writer to finish...");
        match self.writer.join() {
            Ok(written) => log::info!("{} records written to {}", written, self.csv_path.display()),
            Err(e) => log::error!("Record writer thread panicked: {:?}", e),
        }
        set_session_log(None);
    }
}

fn entity_forwarder(
    sender: Sender<RecordMessage>,
) -> impl FnMut(&crate::EntityRecord, &crate::scanner::ProgressInfo) + Send + 'static {
    let mut sequence = 0;
    move |record, progress| {
        sequence += 1;
        if progress.phase == ScanPhase::Main {
            log::info!(
                "{}/{} governors, {} inactive, about {}s left",
                progress.current,
                progress.target,
                progress.inactive,
                progress.remaining.as_secs()
            );
        }
        if sender
            .send(RecordMessage::new(record.clone(), sequence, progress.phase))
            .is_err()
        {
            log::error!("Record writer is gone, {} not saved", record.label());
        }
    }
}

/// Reads console lines on a background thread.
///
/// `q` stops the scan; other lines are returned through the receiver.
fn spawn_console(stop: StopHandle) -> Receiver<String> {
    let (sender, receiver) = channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim().to_string();
            if line.eq_ignore_ascii_case("q") {
                stop.end_scan();
            } else if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn ask_console(answers: &Receiver<String>, prompt: &str) -> bool {
    // drop anything typed before the question
    while answers.try_recv().is_ok() {}

    print!("{} [y/N] ", prompt);
    let _ = io::stdout().flush();
    match answers.recv_timeout(ANSWER_TIMEOUT) {
        Ok(answer) => answer.to_lowercase().starts_with('y'),
        Err(_) => {
            log::info!("No answer, giving up on this governor");
            false
        }
    }
}
