//! City hall level pass run after the ranking walk.
//!
//! Governors below the power cutoff are looked up one by one through the
//! governor search. The search screen is opened once and stays open for
//! the whole pass.

use std::time::{Duration, Instant};

use super::callbacks::{ProgressInfo, ScanPhase};
use super::drilldown::{DrillDownScanner, LevelCheckOptions, Run, ScanOutcome};
use super::state::{ScanState, SearchNavigation};
use crate::device::Device;
use crate::error::ScanError;
use crate::ocr::extract::LEVEL_MODES;
use crate::ocr::{read_level, ScreenReader};
use crate::record::Field;
use crate::validation::{CheckState, ValidationOutcome};

/// Backspaces sent to clear the id input; longer than any governor id.
const CLEAR_KEYSTROKES: usize = 20;

/// Back taps from the ranking screen to the screen holding the settings button.
const BACKS_TO_MENU: usize = 3;

impl<D: Device, R: ScreenReader> DrillDownScanner<D, R> {
    pub(super) fn run_level_check(
        &mut self,
        run: &mut Run,
        level: &LevelCheckOptions,
    ) -> Result<ScanOutcome, ScanError> {
        let queue = std::mem::take(&mut run.level_queue);
        let total = queue.len();
        log::info!("Checking City Hall level of {} governors", total);

        let mut navigation = SearchNavigation::Rankings;
        let mut spent = Duration::ZERO;

        for (n, mut record) in queue.into_iter().enumerate() {
            if self.stop.is_stopped() {
                log::info!("{}", ScanError::UserAbort);
                return Ok(ScanOutcome::Aborted);
            }
            let Some(id) = record.id.clone() else {
                continue;
            };
            let started = Instant::now();

            if navigation == SearchNavigation::Rankings {
                self.set_state(ScanState::LevelCheck {
                    navigation,
                    current: n + 1,
                    total,
                });
                self.open_search()?;
                navigation = SearchNavigation::SearchScreen;
            }
            self.set_state(ScanState::LevelCheck {
                navigation,
                current: n + 1,
                total,
            });

            let found = self.search_level(&id, level.screenshots)?;
            self.device.tap(self.layout.taps.back)?;
            self.wait(self.timings.input_wait);

            match found {
                Some(l) if l < level.min_level => {
                    run.session.inactive += 1;
                    log::info!("{} has City Hall {}, counted as inactive", record.label(), l);
                }
                Some(l) => log::info!("{} has City Hall {}", record.label(), l),
                None => log::warn!(
                    "Could not read City Hall level of {}, keeping '{}'",
                    record.label(),
                    record.city_hall
                ),
            }
            if let Some(l) = found {
                record.city_hall = Field::Value(l);
            }

            run.level_checked += 1;
            spent += started.elapsed();
            let remaining = spent / run.level_checked as u32 * (total - n - 1) as u32;
            let progress = ProgressInfo {
                current: n + 1,
                target: total,
                inactive: run.session.inactive,
                power: CheckState::NotChecked,
                kills: ValidationOutcome::default(),
                remaining,
                phase: ScanPhase::LevelCheck,
            };
            self.callbacks.entity(&record, &progress);
        }

        if navigation == SearchNavigation::SearchScreen {
            for _ in 0..BACKS_TO_MENU {
                self.device.tap(self.layout.taps.back)?;
                self.wait(self.timings.gov_close);
            }
        }
        Ok(ScanOutcome::Completed)
    }

    /// Ranking screen to governor search.
    fn open_search(&mut self) -> Result<(), ScanError> {
        log::info!("Opening governor search");
        for _ in 0..BACKS_TO_MENU {
            self.device.tap(self.layout.taps.back)?;
            self.wait(self.timings.gov_close);
        }
        self.device.tap(self.layout.taps.settings)?;
        self.wait(self.timings.search_open);
        self.device.tap(self.layout.taps.search_open)?;
        self.wait(self.timings.search_open);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), ScanError> {
        for _ in 0..CLEAR_KEYSTROKES {
            self.device.key_event("KEYCODE_DEL")?;
            self.wait(self.timings.key_wait);
        }
        Ok(())
    }

    /// Searches one id and reads the level off the result card.
    fn search_level(&mut self, id: &str, screenshots: u32) -> Result<Option<u8>, ScanError> {
        let taps = self.layout.taps.clone();
        self.device.tap(taps.dismiss)?;
        self.wait(self.timings.key_wait);
        self.device.tap(taps.id_input)?;
        self.wait(self.timings.input_wait);
        self.clear_input()?;
        self.device.input_text(id)?;
        self.wait(self.timings.input_wait);

        // first tap closes the keyboard
        self.device.tap(taps.search_submit)?;
        self.wait(self.timings.input_wait);
        self.device.tap(taps.search_submit)?;
        self.wait(self.timings.search_result);

        let mut level = None;
        for shot in 1..=screenshots.max(1) {
            let frame = self.device.screenshot()?;
            level = read_level(
                &self.reader,
                &frame,
                &self.layout.regions.city_hall_level,
                LEVEL_MODES.len(),
            );
            if level.is_some() {
                break;
            }
            log::debug!("No valid level for {} on screenshot {}", id, shot);
        }

        self.device.tap(taps.id_input)?;
        self.wait(self.timings.input_wait);
        self.clear_input()?;
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanDefaults;
    use crate::record::EntityRecord;
    use crate::scanner::drilldown::DrillDownOptions;
    use crate::scanner::test_support::{drilldown, Governor, World};
    use std::sync::{Arc, Mutex};

    type Emitted = Arc<Mutex<Vec<(EntityRecord, ProgressInfo)>>>;

    fn level_options(cutoff: u64) -> DrillDownOptions {
        DrillDownOptions {
            level_check: Some(LevelCheckOptions {
                min_level: 16,
                power_cutoff: cutoff,
                screenshots: 2,
            }),
            ..DrillDownOptions::from(&ScanDefaults::default())
        }
    }

    fn world_with_levels() -> std::rc::Rc<std::cell::RefCell<World>> {
        let world = World::with_governors(12);
        {
            let mut w = world.borrow_mut();
            for (n, level) in [(5, "2S"), (6, "12"), (7, "17")] {
                w.governors[n].as_mut().unwrap().level = level;
            }
        }
        world
    }

    #[test]
    fn test_levels_are_checked_below_cutoff() {
        let world = world_with_levels();
        let (mut scanner, _dir) = drilldown(&world);
        let emitted: Emitted = Arc::default();
        let sink = emitted.clone();
        scanner.set_entity_callback(move |r, p| sink.lock().unwrap().push((r.clone(), p.clone())));

        let cutoff = Governor::new(4).power;
        let summary = scanner.start_scan("kd", 8, &level_options(cutoff)).unwrap();

        assert_eq!(summary.scanned, 8);
        assert_eq!(summary.level_checked, 3);
        assert_eq!(summary.inactive, 1);

        let emitted = emitted.lock().unwrap();
        assert_eq!(emitted.len(), 11);
        for (record, progress) in &emitted[..5] {
            assert_eq!(progress.phase, ScanPhase::Main);
            assert_eq!(record.city_hall, Field::Value(25));
        }
        let checked: Vec<Field<u8>> = emitted[8..]
            .iter()
            .map(|(r, p)| {
                assert_eq!(p.phase, ScanPhase::LevelCheck);
                r.city_hall.clone()
            })
            .collect();
        // an unreadable level keeps what the main pass stored
        assert_eq!(checked, vec![Field::Skipped, Field::Value(12), Field::Value(17)]);
        assert_eq!(emitted[8].0.city_hall, emitted[5].0.city_hall);
        assert_eq!(emitted[10].1.inactive, 1);
        assert_eq!(emitted[8].0.id, Some(Governor::new(5).id));
    }

    #[test]
    fn test_search_is_opened_once() {
        let world = world_with_levels();
        let (mut scanner, _dir) = drilldown(&world);
        let states: Arc<Mutex<Vec<ScanState>>> = Arc::default();
        let seen = states.clone();
        scanner.set_state_callback(move |s| seen.lock().unwrap().push(s.clone()));

        scanner
            .start_scan("kd", 8, &level_options(Governor::new(4).power))
            .unwrap();

        let states = states.lock().unwrap();
        let opening = states
            .iter()
            .filter(|s| {
                matches!(
                    s,
                    ScanState::LevelCheck {
                        navigation: SearchNavigation::Rankings,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(opening, 1);
        assert!(states.contains(&ScanState::LevelCheck {
            navigation: SearchNavigation::SearchScreen,
            current: 3,
            total: 3,
        }));

        let world = world.borrow();
        let deletes = world
            .commands
            .iter()
            .filter(|c| c.as_str() == "input keyevent KEYCODE_DEL")
            .count();
        assert_eq!(deletes, 3 * 2 * CLEAR_KEYSTROKES);
        assert!(world.commands.contains(&format!("input text {}", Governor::new(6).id)));
    }

    #[test]
    fn test_no_pass_when_everyone_is_above_cutoff() {
        let world = world_with_levels();
        let (mut scanner, _dir) = drilldown(&world);

        let summary = scanner.start_scan("kd", 4, &level_options(1)).unwrap();

        assert_eq!(summary.level_checked, 0);
        assert!(!world.borrow().commands.iter().any(|c| c.starts_with("input text")));
    }
}
