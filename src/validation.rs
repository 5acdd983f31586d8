//! Internal consistency checks on scanned records.

use crate::error::ScanError;
use crate::record::{EntityRecord, Field, Stat, TIERS};

/// Kill points per kill for each tier, in tenths (T1 = 0.2 ... T5 = 20).
pub const KILL_WEIGHTS_TENTHS: [u64; TIERS] = [2, 20, 40, 100, 200];

/// Result of one check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckState {
    #[default]
    NotChecked,
    Ok,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub state: CheckState,
    /// One tier was solved from the kill point total
    pub reconstructed: bool,
}

impl ValidationOutcome {
    fn with_state(state: CheckState) -> Self {
        Self {
            state,
            reconstructed: false,
        }
    }
}

/// Kill points the game awards for `kills` kills of a tier.
///
/// `None` when the read is too large to be a real count.
pub fn tier_killpoints(tier: usize, kills: u64) -> Option<u64> {
    kills.checked_mul(KILL_WEIGHTS_TENTHS[tier]).map(|p| p / 10)
}

fn checked_sum<'a>(values: impl IntoIterator<Item = &'a u64>) -> Option<u64> {
    values.into_iter().try_fold(0u64, |acc, v| acc.checked_add(*v))
}

/// Kill points of a tier if its kills and kill points agree.
fn trusted_tier(record: &EntityRecord, tier: usize) -> Option<u64> {
    let kills = record.tier_kills[tier].get()?;
    let points = record.tier_killpoints[tier].get()?;
    let expected = tier_killpoints(tier, kills)?;
    (points == expected).then_some(expected)
}

/// Checks the tier kills against the kill point total.
///
/// Each tier's kill points must match its kill count under the game's
/// weights, and the tiers must add up to the total. When `reconstruct` is
/// set and exactly one tier is unreadable or inconsistent, that tier is
/// solved from `total - sum(other tiers)`. If every tier is self-consistent
/// but the sum is off, T1 is solved instead since its read is the least
/// reliable.
///
/// A reconstructed T1 is only known up to the rounding of its kill points:
/// the game floors T1 points, so the true kill count may be a few higher
/// than the value written. No tighter bound is known.
///
/// The outcome stays `Failed` after a reconstruction so the record still
/// goes to manual review.
pub fn validate_kills(record: &mut EntityRecord, reconstruct: bool) -> ValidationOutcome {
    if record.killpoints.is_skipped()
        || record.tier_kills.iter().any(Field::is_skipped)
        || record.tier_killpoints.iter().any(Field::is_skipped)
    {
        return ValidationOutcome::default();
    }

    let Some(total) = record.killpoints.get() else {
        log::debug!("Kill check for {}: total kill points unreadable", record.label());
        return ValidationOutcome::with_state(CheckState::Failed);
    };

    let trusted: [Option<u64>; TIERS] = std::array::from_fn(|t| trusted_tier(record, t));
    let suspects: Vec<usize> = (0..TIERS).filter(|&t| trusted[t].is_none()).collect();

    if suspects.is_empty() {
        let Some(sum) = checked_sum(trusted.iter().flatten()) else {
            log::info!("Kill check for {}: tier kill points overflow", record.label());
            return ValidationOutcome::with_state(CheckState::Failed);
        };
        if sum == total {
            return ValidationOutcome::with_state(CheckState::Ok);
        }
        log::info!(
            "Kill check for {}: tiers add up to {} but total is {}",
            record.label(),
            sum,
            total
        );
    } else {
        log::info!(
            "Kill check for {}: inconsistent tiers {:?}",
            record.label(),
            suspects.iter().map(|t| t + 1).collect::<Vec<_>>()
        );
    }

    if !reconstruct {
        return ValidationOutcome::with_state(CheckState::Failed);
    }

    let target = match suspects.as_slice() {
        [] => 0,
        [single] => *single,
        _ => return ValidationOutcome::with_state(CheckState::Failed),
    };

    let others = checked_sum(
        trusted
            .iter()
            .enumerate()
            .filter(|&(t, _)| t != target)
            .filter_map(|(_, points)| points.as_ref()),
    );
    let Some(remaining) = others.and_then(|others| total.checked_sub(others)) else {
        log::info!(
            "Kill check for {}: other tiers exceed total, cannot solve T{}",
            record.label(),
            target + 1
        );
        return ValidationOutcome::with_state(CheckState::Failed);
    };

    let Some(kills) = remaining.checked_mul(10).map(|p| p / KILL_WEIGHTS_TENTHS[target]) else {
        log::info!("Kill check for {}: total kill points out of range", record.label());
        return ValidationOutcome::with_state(CheckState::Failed);
    };
    record.tier_kills[target] = Stat::Value(kills);
    record.tier_killpoints[target] = Stat::Value(remaining);
    record.kills_reconstructed = true;
    log::info!(
        "Kill check for {}: T{} reconstructed as {} kills",
        record.label(),
        target + 1,
        kills
    );

    ValidationOutcome {
        state: CheckState::Failed,
        reconstructed: true,
    }
}

/// Whether a power reading fits a ranking sorted by descending power.
///
/// Zero, unreadable and readings at or above the last valid one fail.
pub fn validate_power(power: &Stat, last_valid: Option<u64>) -> bool {
    match (power.get(), last_valid) {
        (None | Some(0), _) => false,
        (Some(p), Some(last)) => p < last,
        (Some(_), None) => true,
    }
}

/// Tracks the last valid power reading across a ranked scan.
#[derive(Clone, Debug, Default)]
pub struct PowerTracker {
    last_valid: Option<u64>,
}

impl PowerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_valid(&self) -> Option<u64> {
        self.last_valid
    }

    /// Checks the next reading; only passing readings move the baseline.
    pub fn check(&mut self, power: &Stat) -> Result<u64, ScanError> {
        if validate_power(power, self.last_valid) {
            let value = power.get().unwrap_or_default();
            self.last_valid = Some(value);
            Ok(value)
        } else {
            Err(ScanError::ValidationFailure(format!(
                "power {} after {}",
                power,
                self.last_valid
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "start".to_string())
            )))
        }
    }

    /// `check` folded into a [`CheckState`], skipping unscanned power.
    pub fn state_for(&mut self, power: &Stat) -> CheckState {
        if power.is_skipped() {
            return CheckState::NotChecked;
        }
        match self.check(power) {
            Ok(_) => CheckState::Ok,
            Err(e) => {
                log::info!("{}", e);
                CheckState::Failed
            }
        }
    }
}
