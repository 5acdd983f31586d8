use std::thread;
use std::time::Duration;

use crate::error::ScanError;

/// Bounded retry with a fixed pause before reconnecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Runs `op` up to `policy.attempts` times.
///
/// Between attempts `recover` runs (typically disconnect, wait, reconnect).
/// A failing recovery is logged and the next attempt still runs. After the
/// last failure the error becomes [`ScanError::DeviceUnavailable`] carrying
/// the last underlying message.
pub fn retry_with_recovery<C, T>(
    target: &mut C,
    policy: &RetryPolicy,
    what: &str,
    mut op: impl FnMut(&mut C) -> anyhow::Result<T>,
    mut recover: impl FnMut(&mut C) -> anyhow::Result<()>,
) -> Result<T, ScanError> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match op(target) {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = format!("{:#}", e);
                log::warn!(
                    "{} failed (attempt {}/{}): {}",
                    what,
                    attempt,
                    attempts,
                    last_error
                );
            }
        }

        if attempt < attempts {
            thread::sleep(policy.backoff);
            if let Err(e) = recover(target) {
                log::warn!("Reconnect after failed {} did not succeed: {:#}", what, e);
            }
        }
    }

    log::error!("{} gave up after {} attempts", what, attempts);
    Err(ScanError::DeviceUnavailable {
        attempts,
        last_error,
    })
}
