//! Scan state machine states.
//!
//! The drill-down scan sequences through: Initializing → OpeningEntity →
//! DetectingValidity → ScanningPage(1..3) → ClosingEntity → loop, with
//! DuplicateCheck and TailMode near the end of the ranking and an optional
//! LevelCheck pass afterwards. The paginated scan only uses ScanningBatch.

use std::fmt;

/// Where the level-check pass is in the game's menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchNavigation {
    /// Still on the ranking list; the search screen must be opened first
    Rankings,
    /// The governor search screen is open
    SearchScreen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    /// Connecting to the device
    Initializing,
    /// Tapping the row of this rank
    OpeningEntity { rank: usize },
    /// Checking that the tap opened a governor
    DetectingValidity { rank: usize },
    /// Reading detail page 1 (profile), 2 (kills) or 3 (more info)
    ScanningPage { rank: usize, page: u8 },
    ClosingEntity { rank: usize },
    /// Same governor seen twice; checking whether the list has ended
    DuplicateCheck { rank: usize },
    /// Scanning the last two governors of the ranking
    TailMode { rank: usize },
    /// Reading city hall levels through the governor search
    LevelCheck {
        navigation: SearchNavigation,
        current: usize,
        total: usize,
    },
    /// Reading one page of a paginated list
    ScanningBatch { page: usize, pages: usize },
    Completed,
    Aborted,
    Failed(String),
}

impl ScanState {
    /// True for states a scan ends in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Aborted | ScanState::Failed(_)
        )
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Initializing => write!(f, "Initializing"),
            ScanState::OpeningEntity { rank } => write!(f, "Opening governor {}", rank + 1),
            ScanState::DetectingValidity { rank } => {
                write!(f, "Checking governor {}", rank + 1)
            }
            ScanState::ScanningPage { page: 1, .. } => write!(f, "Scanning general page"),
            ScanState::ScanningPage { page: 2, .. } => write!(f, "Scanning kills page"),
            ScanState::ScanningPage { page, .. } => write!(f, "Scanning more info page ({})", page),
            ScanState::ClosingEntity { .. } => write!(f, "Closing governor"),
            ScanState::DuplicateCheck { rank } => {
                write!(f, "Duplicate governor at {}, checking rank", rank + 1)
            }
            ScanState::TailMode { rank } => write!(f, "Scanning last governors ({})", rank + 1),
            ScanState::LevelCheck {
                navigation: SearchNavigation::Rankings,
                ..
            } => write!(f, "Opening governor search"),
            ScanState::LevelCheck { current, total, .. } => {
                write!(f, "Checking City Hall level ({}/{})", current, total)
            }
            ScanState::ScanningBatch { page, pages } => {
                write!(f, "Scanning page {}/{}", page, pages)
            }
            ScanState::Completed => write!(f, "Scan finished"),
            ScanState::Aborted => write!(f, "Scan aborted"),
            ScanState::Failed(msg) => write!(f, "Scan failed: {}", msg),
        }
    }
}
