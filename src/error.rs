//! Typed failure outcomes of a scan.

use thiserror::Error;

/// Errors surfaced by the scan engine.
///
/// Only `DeviceUnavailable` aborts a scan. The other kinds are produced and
/// consumed inside the engine: an unreadable region becomes `Unknown` on the
/// record, validation failures are archived for manual review, ambiguous rows
/// are escalated to the continue handler, and a user abort ends the scan
/// gracefully.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("device unavailable after {attempts} attempts: {last_error}")]
    DeviceUnavailable { attempts: u32, last_error: String },

    #[error("could not read region '{region}'")]
    OcrExtractionFailure { region: String },

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("could not confirm a governor at rank {rank}")]
    AmbiguousEntityState { rank: usize },

    #[error("scan aborted by user")]
    UserAbort,
}

impl ScanError {
    /// Returns true for errors that must end the whole scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::DeviceUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_device_errors_are_fatal() {
        let device = ScanError::DeviceUnavailable {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert!(device.is_fatal());
        assert!(!ScanError::UserAbort.is_fatal());
        assert!(!ScanError::AmbiguousEntityState { rank: 4 }.is_fatal());
        assert!(
            !ScanError::OcrExtractionFailure {
                region: "power".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_device_error_message_carries_last_error() {
        let err = ScanError::DeviceUnavailable {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "device unavailable after 3 attempts: connection refused"
        );
    }
}
