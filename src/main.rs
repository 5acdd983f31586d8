//! Kingdom Scanner
//!
//! Console front end: pick a scan with a subcommand, type `q` + Enter to
//! stop it after the current governor.

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

use kingdom_scanner::config::{default_config_path, load_config, ScanDefaults};
use kingdom_scanner::runner::{run_scan, ScanKind};
use kingdom_scanner::scanner::{DrillDownOptions, PaginatedMode, ScanOutcome};
use kingdom_scanner::{logging, paths, ScanError, ScanOptions};

/// Exit code when the emulator could not be reached or was lost mid scan.
const EXIT_DEVICE_UNAVAILABLE: u8 = 4;

#[derive(Parser, Debug)]
#[command(version, about = "Reads governor statistics out of an Android emulator")]
struct Cli {
    /// Configuration file, defaults to config.json next to the executable
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open every governor of the kingdom power ranking
    Kingdom(KingdomArgs),
    /// Read the alliance member list
    Alliance(ListArgs),
    /// Read the honor ranking
    Honor(ListArgs),
    /// Read the kingdom power ranking without opening governors
    Seed(ListArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Name used in the result file
    #[arg(long)]
    label: Option<String>,

    /// Number of governors to scan
    #[arg(short = 'n', long)]
    count: Option<usize>,
}

#[derive(Args, Debug)]
struct KingdomArgs {
    #[command(flatten)]
    list: ListArgs,

    /// Continue below the top rows of a previous scan
    #[arg(long)]
    resume: bool,

    /// Skip inactive rows with the recorded scroll script
    #[arg(long)]
    advanced_scroll: bool,

    /// Keep screenshots of inactive rows
    #[arg(long)]
    track_inactives: bool,

    /// Look up the City Hall level of governors below the power cutoff
    #[arg(long)]
    check_city_hall: bool,

    /// City Hall level below which a governor counts as inactive
    #[arg(long)]
    min_city_hall: Option<u8>,

    /// Skip kill and power validation
    #[arg(long)]
    no_validation: bool,

    /// Read the profile page only
    #[arg(long)]
    profile_only: bool,
}

impl KingdomArgs {
    fn apply(&self, defaults: &mut ScanDefaults) {
        defaults.resume |= self.resume;
        defaults.advanced_scroll |= self.advanced_scroll;
        defaults.track_inactives |= self.track_inactives;
        defaults.check_city_hall |= self.check_city_hall;
        if let Some(level) = self.min_city_hall {
            defaults.min_city_hall = level;
        }
        if self.no_validation {
            defaults.validate_kills = false;
            defaults.reconstruct_kills = false;
            defaults.validate_power = false;
        }
        if self.profile_only {
            defaults.options = ScanOptions::seed();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create working directories: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = logging::init(level) {
        eprintln!("Failed to install logger: {}", e);
    }

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);

    let (list, kind) = match &cli.command {
        Command::Kingdom(args) => {
            args.apply(&mut config.scan);
            (&args.list, ScanKind::Kingdom(DrillDownOptions::from(&config.scan)))
        }
        Command::Alliance(args) => (args, ScanKind::List(PaginatedMode::Alliance)),
        Command::Honor(args) => (args, ScanKind::List(PaginatedMode::Honor)),
        Command::Seed(args) => (args, ScanKind::List(PaginatedMode::Seed)),
    };
    let label = list.label.clone().unwrap_or_else(|| config.scan.label.clone());
    let count = list.count.unwrap_or(config.scan.count);

    log::info!("Starting {} scan of {} governors", label, count);
    match run_scan(&config, &label, count, kind) {
        Ok(summary) => {
            let how = match summary.outcome {
                ScanOutcome::Completed => "completed",
                ScanOutcome::Aborted => "stopped",
            };
            log::info!(
                "Scan {} {}: {} governors, {} inactive, {} levels checked",
                summary.run_id,
                how,
                summary.scanned,
                summary.inactive,
                summary.level_checked
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Scan failed: {:#}", e);
            if matches!(e.downcast_ref::<ScanError>(), Some(ScanError::DeviceUnavailable { .. })) {
                ExitCode::from(EXIT_DEVICE_UNAVAILABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_kingdom_flags_override_defaults() {
        let cli = Cli::parse_from([
            "kingdom-scanner",
            "kingdom",
            "-n",
            "50",
            "--resume",
            "--no-validation",
            "--min-city-hall",
            "20",
        ]);
        let Command::Kingdom(args) = cli.command else {
            panic!("expected kingdom subcommand");
        };
        assert_eq!(args.list.count, Some(50));

        let mut defaults = ScanDefaults::default();
        args.apply(&mut defaults);
        assert!(defaults.resume);
        assert!(!defaults.validate_kills && !defaults.validate_power);
        assert_eq!(defaults.min_city_hall, 20);
        assert_eq!(defaults.options, ScanOptions::full());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from([
            "kingdom-scanner",
            "honor",
            "--config",
            "other.json",
            "--label",
            "kvk",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("other.json")));
        let Command::Honor(args) = cli.command else {
            panic!("expected honor subcommand");
        };
        assert_eq!(args.label.as_deref(), Some("kvk"));
    }
}
