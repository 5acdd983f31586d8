//! Per-governor record produced by a scan.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// One scanned value.
///
/// Fields start out `Skipped` and are only populated when the active scan
/// options request them. A requested field whose region could not be read
/// becomes `Unknown`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Field<T> {
    Value(T),
    /// Requested, but OCR produced nothing usable
    Unknown,
    /// Not requested by the active scan options
    #[default]
    Skipped,
}

/// A numeric stat.
pub type Stat = Field<u64>;

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Field::Skipped)
    }
}

impl Stat {
    /// Copy of the numeric value, if known.
    pub fn get(&self) -> Option<u64> {
        self.value().copied()
    }

    /// Sums stats. Any skipped part makes the sum skipped; otherwise any
    /// unknown part, or a sum past `u64::MAX`, makes it unknown.
    pub fn sum<'a>(parts: impl IntoIterator<Item = &'a Stat>) -> Stat {
        let mut total = Some(0u64);
        let mut unknown = false;
        for part in parts {
            match part {
                Field::Value(v) => total = total.and_then(|t| t.checked_add(*v)),
                Field::Unknown => unknown = true,
                Field::Skipped => return Field::Skipped,
            }
        }
        match total {
            Some(total) if !unknown => Field::Value(total),
            _ => Field::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(v) => write!(f, "{}", v),
            Field::Unknown => write!(f, "Unknown"),
            Field::Skipped => write!(f, "Skipped"),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::Unknown => serializer.serialize_str("Unknown"),
            Field::Skipped => serializer.serialize_str("Skipped"),
        }
    }
}

/// Number of kill tiers.
pub const TIERS: usize = 5;

/// One scanned governor.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntityRecord {
    /// Numeric governor id
    pub id: Option<String>,
    pub name: Option<String>,
    pub power: Stat,
    pub killpoints: Stat,
    /// Kills per tier, index 0 = T1
    pub tier_kills: [Stat; TIERS],
    /// Kill points per tier, index 0 = T1
    pub tier_killpoints: [Stat; TIERS],
    pub ranged_points: Stat,
    pub deaths: Stat,
    pub resources_assisted: Stat,
    pub resources_gathered: Stat,
    pub helps: Stat,
    pub alliance: Field<String>,
    pub city_hall: Field<u8>,
    /// Score column of the honor ranking
    pub honor_points: Stat,
    /// Set when one kill tier was solved from the kill point total
    pub kills_reconstructed: bool,
    /// Low-resolution name crop archived by paginated scans
    pub name_image: Option<PathBuf>,
}

impl EntityRecord {
    /// T4 + T5 kills.
    pub fn t45_kills(&self) -> Stat {
        Stat::sum(&self.tier_kills[3..])
    }

    /// Kills over all tiers.
    pub fn total_kills(&self) -> Stat {
        Stat::sum(&self.tier_kills)
    }

    /// Label used in log lines: `name (id)`.
    pub fn label(&self) -> String {
        format!(
            "{} ({})",
            self.name.as_deref().unwrap_or("?"),
            self.id.as_deref().unwrap_or("?")
        )
    }
}

/// Which fields a scan reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub id: bool,
    pub name: bool,
    pub power: bool,
    pub killpoints: bool,
    pub alliance: bool,
    /// Kills and kill points per tier, index 0 = T1
    pub tier_kills: [bool; TIERS],
    pub ranged: bool,
    pub deaths: bool,
    pub resources_assisted: bool,
    pub resources_gathered: bool,
    pub helps: bool,
}

impl ScanOptions {
    /// Everything the scanner can read.
    pub fn full() -> Self {
        Self {
            id: true,
            name: true,
            power: true,
            killpoints: true,
            alliance: true,
            tier_kills: [true; TIERS],
            ranged: true,
            deaths: true,
            resources_assisted: true,
            resources_gathered: true,
            helps: true,
        }
    }

    /// Profile page only: id, name, power, kill points and alliance.
    pub fn seed() -> Self {
        Self {
            id: true,
            name: true,
            power: true,
            killpoints: true,
            alliance: true,
            ..Self::default()
        }
    }

    /// Whether detail page 1 (profile), 2 (kills) or 3 (more info) must be opened.
    pub fn page_needed(&self, page: u8) -> bool {
        match page {
            1 => self.id || self.name || self.power || self.killpoints || self.alliance,
            2 => self.tier_kills.iter().any(|&t| t) || self.ranged,
            3 => {
                self.deaths || self.resources_assisted || self.resources_gathered || self.helps
            }
            _ => false,
        }
    }

    /// Kill validation needs every tier and the kill point total.
    pub fn covers_kill_validation(&self) -> bool {
        self.killpoints && self.tier_kills.iter().all(|&t| t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_all_skipped() {
        let record = EntityRecord::default();
        assert!(record.id.is_none());
        assert!(record.power.is_skipped());
        assert!(record.tier_kills.iter().all(|t| t.is_skipped()));
        assert!(record.alliance.is_skipped());
        assert!(!record.kills_reconstructed);
    }

    #[test]
    fn test_derived_kill_sums() {
        let record = EntityRecord {
            tier_kills: [
                Field::Value(1),
                Field::Value(2),
                Field::Value(3),
                Field::Value(40),
                Field::Value(50),
            ],
            ..Default::default()
        };
        assert_eq!(record.t45_kills(), Field::Value(90));
        assert_eq!(record.total_kills(), Field::Value(96));
    }

    #[test]
    fn test_derived_sums_propagate_missing_parts() {
        let mut record = EntityRecord {
            tier_kills: std::array::from_fn(|_| Field::Value(1)),
            ..Default::default()
        };
        record.tier_kills[4] = Field::Unknown;
        assert_eq!(record.t45_kills(), Field::Unknown);

        record.tier_kills[0] = Field::Skipped;
        assert_eq!(record.total_kills(), Field::Skipped);
        assert_eq!(record.t45_kills(), Field::Unknown);
    }

    #[test]
    fn test_overflowing_kill_sum_is_unknown() {
        let mut record = EntityRecord {
            tier_kills: std::array::from_fn(|_| Field::Value(1)),
            ..Default::default()
        };
        record.tier_kills[4] = Field::Value(u64::MAX);

        assert_eq!(record.total_kills(), Field::Unknown);
        assert_eq!(record.t45_kills(), Field::Unknown);
        record.tier_kills[3] = Field::Value(0);
        assert_eq!(record.t45_kills(), Field::Value(u64::MAX));
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Stat::Value(1200).to_string(), "1200");
        assert_eq!(Stat::Unknown.to_string(), "Unknown");
        assert_eq!(Field::<String>::Skipped.to_string(), "Skipped");
    }

    #[test]
    fn test_field_serializes_sentinels_as_strings() {
        let json = serde_json::to_string(&vec![Stat::Value(5), Stat::Unknown, Stat::Skipped])
            .unwrap();
        assert_eq!(json, r#"[5,"Unknown","Skipped"]"#);
    }

    #[test]
    fn test_pages_needed() {
        let seed = ScanOptions::seed();
        assert!(seed.page_needed(1));
        assert!(!seed.page_needed(2));
        assert!(!seed.page_needed(3));

        let deaths_only = ScanOptions {
            deaths: true,
            ..Default::default()
        };
        assert!(!deaths_only.page_needed(1));
        assert!(deaths_only.page_needed(3));

        let full = ScanOptions::full();
        assert!((1..=3).all(|p| full.page_needed(p)));
        assert!(!full.page_needed(4));
    }

    #[test]
    fn test_kill_validation_coverage() {
        assert!(ScanOptions::full().covers_kill_validation());
        assert!(!ScanOptions::seed().covers_kill_validation());

        let mut partial = ScanOptions::full();
        partial.tier_kills[0] = false;
        assert!(!partial.covers_kill_validation());
    }
}
