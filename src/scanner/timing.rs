//! Waits between UI actions.

use rand::Rng;
use std::thread;
use std::time::Duration;

use crate::config::secs;

/// `base` plus up to `max_random` seconds of jitter.
pub fn jittered(base: f64, max_random: f64) -> Duration {
    let jitter = if max_random > 0.0 {
        rand::thread_rng().gen_range(0.0..max_random)
    } else {
        0.0
    };
    secs(base + jitter)
}

/// Sleeps for `base` seconds plus jitter; returns immediately when both are zero.
pub fn wait_random_range(base: f64, max_random: f64) {
    let wait = jittered(base, max_random);
    if !wait.is_zero() {
        thread::sleep(wait);
    }
}
