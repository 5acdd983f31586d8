//! Kingdom Scanner
//!
//! Drives a game client inside an Android emulator over ADB, reads governor
//! statistics from emulator screenshots with Tesseract, and produces one
//! structured record per governor.
//!
//! This crate provides:
//! - Device control (`device`): connection, taps, swipes, input scripts, screenshots
//! - OCR (`ocr`): region cropping, preprocessing, recognition
//! - Scanning (`scanner`): the drill-down and paginated state machines
//! - Validation (`validation`): kill and power consistency checks
//! - Output (`output`): a CSV sink fed through a writer thread
//! - Console plumbing (`runner`): wires a scan to ADB, Tesseract and the CSV sink

pub mod config;
pub mod device;
pub mod error;
pub mod layout;
pub mod logging;
pub mod ocr;
pub mod output;
pub mod paths;
pub mod record;
pub mod runner;
pub mod scanner;
pub mod validation;

pub use error::ScanError;
pub use record::{EntityRecord, Field, ScanOptions, Stat};
