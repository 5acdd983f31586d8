//! Scan engines.
//!
//! [`DrillDownScanner`] walks the kingdom ranking and opens every governor;
//! [`PaginatedScanner`] reads lists that show several governors per screen.
//! Both are blocking state machines driven from one worker thread and
//! report through optional callbacks.

mod callbacks;
mod drilldown;
mod level_check;
mod paginated;
pub mod review;
mod session;
pub mod state;
mod timing;

#[cfg(test)]
mod test_support;

pub use callbacks::{BatchProgress, ContinueHandler, ProgressInfo, ScanPhase};
pub use drilldown::{
    DrillDownConfig, DrillDownOptions, DrillDownScanner, LevelCheckOptions, ScanOutcome,
    ScanSummary,
};
pub use paginated::{remove_name_images, PaginatedConfig, PaginatedMode, PaginatedScanner};
pub use session::{new_run_id, ScanSession, StopHandle};
pub use state::{ScanState, SearchNavigation};
