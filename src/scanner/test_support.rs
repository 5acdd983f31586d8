//! Scripted emulator for scanner tests.
//!
//! `FakeDevice` and `FakeReader` share one [`World`]. Screenshots are tiny
//! frames whose first pixel encodes the screen and an index; the reader
//! decodes that pixel and answers from the world's data by region name.

use anyhow::Result;
use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

use super::drilldown::{DrillDownConfig, DrillDownScanner};
use super::paginated::{PaginatedConfig, PaginatedScanner};
use crate::config::Timings;
use crate::device::Device;
use crate::error::ScanError;
use crate::layout::{Point, RegionSpec, UiLayout, DIRECT_ROWS};
use crate::ocr::{RecognitionMode, ScreenReader};
use crate::paths::ScanPaths;
use crate::record::TIERS;
use crate::validation::tier_killpoints;

#[derive(Clone, Debug)]
pub struct Governor {
    pub id: String,
    pub name: String,
    pub power: u64,
    pub kills: [u64; TIERS],
    /// Text shown instead of one tier's kill count
    pub misread_kills: Option<(usize, &'static str)>,
    pub level: &'static str,
}

impl Governor {
    pub fn new(n: usize) -> Self {
        let n64 = n as u64;
        Self {
            id: format!("{}", 50_000_000 + n64 * 137),
            name: format!("Governor {}", n),
            power: 90_000_000 - n64 * 1_000_000,
            kills: [100 * (n64 + 1), 50, 40, 30 + n64, 20 + n64],
            misread_kills: None,
            level: "25",
        }
    }

    pub fn killpoints(&self) -> u64 {
        (0..TIERS).filter_map(|t| tier_killpoints(t, self.kills[t])).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Page {
    Rankings,
    Profile(usize),
    Kills(usize),
    MoreInfo(usize),
    Menu,
    Search,
    SearchResult(Option<usize>),
    List,
}

pub struct World {
    pub layout: UiLayout,
    /// Ranking rows; `None` is a row that never opens
    pub governors: Vec<Option<Governor>>,
    /// Paginated list entries: name and score
    pub list: Vec<(String, u64)>,
    pub list_rows: usize,
    pub list_page: usize,
    /// How far the ranking scrolled below the direct rows
    pub top: usize,
    pub page: Page,
    last_slot: Option<usize>,
    pub opens: usize,
    pub clipboard: String,
    pub typed: String,
    pub commands: Vec<String>,
    pub scripts: Vec<String>,
    pub swipes: usize,
    pub screenshots: usize,
    pub fail_after_screenshots: Option<usize>,
    /// Rank indicator reads that come back blank before it reads cleanly
    pub unreadable_indicator: usize,
    pub connected: bool,
    pub unavailable: bool,
}

impl World {
    fn new() -> Self {
        Self {
            layout: UiLayout::default(),
            governors: Vec::new(),
            list: Vec::new(),
            list_rows: 6,
            list_page: 0,
            top: 0,
            page: Page::Rankings,
            last_slot: None,
            opens: 0,
            clipboard: String::new(),
            typed: String::new(),
            commands: Vec::new(),
            scripts: Vec::new(),
            swipes: 0,
            screenshots: 0,
            fail_after_screenshots: None,
            unreadable_indicator: 0,
            connected: false,
            unavailable: false,
        }
    }

    pub fn with_governors(count: usize) -> Rc<RefCell<World>> {
        let mut world = World::new();
        world.governors = (0..count).map(|n| Some(Governor::new(n))).collect();
        Rc::new(RefCell::new(world))
    }

    pub fn with_list(count: usize, rows: usize) -> Rc<RefCell<World>> {
        let mut world = World::new();
        world.list = (0..count)
            .map(|n| (format!("Member {}", n), 60_000_000 - n as u64 * 250_000))
            .collect();
        world.list_rows = rows;
        world.page = Page::List;
        Rc::new(RefCell::new(world))
    }

    /// Ranking index shown in one of the fixed row positions.
    fn slot_index(&self, slot: usize) -> usize {
        let len = self.governors.len();
        match slot {
            s if s < DIRECT_ROWS => s,
            s if s == DIRECT_ROWS => (DIRECT_ROWS + self.top).min(len - 3),
            s if s == DIRECT_ROWS + 1 => len - 2,
            _ => len - 1,
        }
    }

    /// The scrolling slot can no longer move forward.
    fn saturated(&self) -> bool {
        DIRECT_ROWS + self.top > self.governors.len() - 3
    }

    fn scroll(&mut self) {
        if self.page == Page::Rankings && self.last_slot == Some(DIRECT_ROWS) {
            self.top += 1;
        }
    }

    fn tap(&mut self, p: Point) {
        let taps = self.layout.taps.clone();
        match self.page {
            Page::Rankings => {
                let ranking = &self.layout.ranking;
                if p.x == ranking.row_x {
                    if let Some(slot) = ranking.row_y.iter().position(|&y| y == p.y) {
                        self.last_slot = Some(slot);
                        let idx = self.slot_index(slot);
                        if self.governors[idx].is_some() {
                            self.page = Page::Profile(idx);
                            self.opens += 1;
                        }
                        return;
                    }
                }
                if p == taps.back {
                    self.page = Page::Menu;
                }
            }
            Page::Profile(i) | Page::Kills(i) => {
                if p == taps.name_copy {
                    self.clipboard = self.governors[i]
                        .as_ref()
                        .map(|g| g.name.clone())
                        .unwrap_or_default();
                } else if p == taps.open_kills {
                    self.page = Page::Kills(i);
                } else if p == taps.more_info {
                    self.page = Page::MoreInfo(i);
                } else if p == taps.close_entity {
                    self.page = Page::Rankings;
                    if self.last_slot == Some(DIRECT_ROWS) {
                        self.top += 1;
                    }
                }
            }
            Page::MoreInfo(i) => {
                if p == taps.close_info {
                    self.page = Page::Profile(i);
                }
            }
            Page::Menu => {
                if p == taps.search_open {
                    self.page = Page::Search;
                }
            }
            Page::Search => {
                if p == taps.search_submit {
                    let found = self
                        .governors
                        .iter()
                        .position(|g| g.as_ref().is_some_and(|g| g.id == self.typed));
                    self.page = Page::SearchResult(found);
                } else if p == taps.back {
                    self.page = Page::Menu;
                }
            }
            Page::SearchResult(_) => {
                if p == taps.back {
                    self.page = Page::Search;
                }
            }
            Page::List => {}
        }
    }

    fn frame(&self) -> RgbaImage {
        let (code, idx): (u8, usize) = match self.page {
            Page::Rankings => {
                let terminal = self.layout.ranking.tail.terminal_indicator as usize;
                (1, if self.saturated() { terminal } else { DIRECT_ROWS + self.top + 1 })
            }
            Page::Profile(i) => (2, i),
            Page::Kills(i) => (3, i),
            Page::MoreInfo(i) => (4, i),
            Page::Menu => (8, 0),
            Page::Search => (5, 0),
            Page::SearchResult(found) => (6, found.unwrap_or(0xFFFF)),
            Page::List => (7, self.list_page),
        };
        let mut img = RgbaImage::new(8, 8);
        img.put_pixel(0, 0, Rgba([code, (idx >> 8) as u8, (idx & 0xFF) as u8, 255]));
        img
    }

    fn governor(&self, idx: usize) -> Option<&Governor> {
        self.governors.get(idx).and_then(Option::as_ref)
    }

    fn list_cell(&self, page: usize, region: &str) -> String {
        let Some((head, n)) = region.rsplit_once('_') else {
            return String::new();
        };
        let Ok(n) = n.parse::<usize>() else {
            return String::new();
        };
        let rows = self.list_rows;
        let len = self.list.len();
        let top = page * rows;
        let bottom = top + rows > len;
        let last_layout = head.contains("_last_");

        let entry = match (bottom, last_layout) {
            (false, false) => Some(top + n - 1),
            (true, true) => (len + n - 1).checked_sub(rows),
            _ => None,
        };
        match entry.and_then(|i| self.list.get(i)) {
            Some((_, score)) if head.ends_with("_score") => thousands(*score),
            Some((name, _)) => name.clone(),
            None => String::new(),
        }
    }
}

/// `1234567` as `1,234,567`, the way the game prints numbers.
fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub struct FakeDevice {
    world: Rc<RefCell<World>>,
}

impl Device for FakeDevice {
    fn connect(&mut self) -> Result<(), ScanError> {
        let mut world = self.world.borrow_mut();
        if world.unavailable {
            return Err(ScanError::DeviceUnavailable {
                attempts: 3,
                last_error: "connection refused".to_string(),
            });
        }
        world.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.world.borrow_mut().connected = false;
    }

    fn screenshot(&mut self) -> Result<RgbaImage, ScanError> {
        let mut world = self.world.borrow_mut();
        let limit = world.fail_after_screenshots;
        if limit.is_some_and(|limit| world.screenshots >= limit) {
            return Err(ScanError::DeviceUnavailable {
                attempts: 3,
                last_error: "device offline".to_string(),
            });
        }
        world.screenshots += 1;
        Ok(world.frame())
    }

    fn shell(&mut self, cmd: &str) -> Result<String, ScanError> {
        let mut world = self.world.borrow_mut();
        world.commands.push(cmd.to_string());
        let parts: Vec<&str> = cmd.split_whitespace().collect();
        match parts.as_slice() {
            ["input", "tap", x, y] => {
                if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                    world.tap(Point::new(x, y));
                }
            }
            ["input", "swipe", ..] => {
                world.swipes += 1;
                world.scroll();
            }
            ["input", "keyevent", "KEYCODE_DEL"] => {
                world.typed.pop();
            }
            ["input", "text", text] => world.typed.push_str(text),
            _ => {}
        }
        Ok(String::new())
    }

    fn replay_input_script(&mut self, name: &str) -> Result<(), ScanError> {
        let mut world = self.world.borrow_mut();
        world.scripts.push(name.to_string());
        if world.page == Page::List {
            world.list_page += 1;
        } else {
            world.scroll();
        }
        Ok(())
    }

    fn read_clipboard(&mut self) -> Result<String> {
        Ok(self.world.borrow().clipboard.clone())
    }
}

pub struct FakeReader {
    world: Rc<RefCell<World>>,
}

impl ScreenReader for FakeReader {
    fn read(
        &self,
        frame: &RgbaImage,
        region: &RegionSpec,
        _mode: RecognitionMode,
        _whitelist: Option<&str>,
    ) -> Result<String> {
        let px = frame.get_pixel(0, 0);
        let code = px[0];
        let idx = ((px[1] as usize) << 8) | px[2] as usize;
        let name = region.name.as_str();

        if code == 1 && name == "rank_indicator" {
            let mut world = self.world.borrow_mut();
            if world.unreadable_indicator > 0 {
                world.unreadable_indicator -= 1;
                return Ok(String::new());
            }
            return Ok(idx.to_string());
        }

        let world = self.world.borrow();
        let text = match code {
            2 => match (world.governor(idx), name) {
                (_, "more_info") => "More Info".to_string(),
                (Some(g), "gov_id") => g.id.clone(),
                (Some(g), "power") => thousands(g.power),
                (Some(g), "killpoints") => thousands(g.killpoints()),
                (Some(_), "alliance_name") => "[ABC] Alpha".to_string(),
                _ => String::new(),
            },
            3 => match world.governor(idx) {
                Some(g) => kills_page_text(g, name),
                None => String::new(),
            },
            4 => match name {
                "deaths" | "rss_gathered" | "rss_assisted" | "alliance_helps" => {
                    "5,000".to_string()
                }
                _ => String::new(),
            },
            6 if name == "city_hall_level" => world
                .governor(idx)
                .map(|g| g.level.to_string())
                .unwrap_or_default(),
            7 => world.list_cell(idx, name),
            _ => String::new(),
        };
        Ok(text)
    }
}

fn kills_page_text(g: &Governor, region: &str) -> String {
    if region == "ranged_points" {
        return "1,234".to_string();
    }
    let Some((tier, field)) = region.strip_prefix('t').and_then(|r| r.split_once('_')) else {
        return String::new();
    };
    let Some(t) = tier.parse::<usize>().ok().and_then(|t| t.checked_sub(1)) else {
        return String::new();
    };
    if t >= TIERS {
        return String::new();
    }
    match field {
        "kills" => match g.misread_kills {
            Some((misread, text)) if misread == t => text.to_string(),
            _ => thousands(g.kills[t]),
        },
        "killpoints" => tier_killpoints(t, g.kills[t]).map(thousands).unwrap_or_default(),
        _ => String::new(),
    }
}

fn paths(dir: &TempDir) -> ScanPaths {
    ScanPaths::under(dir.path())
}

pub fn drilldown(
    world: &Rc<RefCell<World>>,
) -> (DrillDownScanner<FakeDevice, FakeReader>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DrillDownConfig {
        layout: UiLayout::default(),
        timings: Timings::instant(),
        paths: paths(&dir),
        inactive_retries: 3,
        name_copy_attempts: 3,
    };
    let scanner = DrillDownScanner::new(
        FakeDevice { world: world.clone() },
        FakeReader { world: world.clone() },
        config,
    )
    .unwrap();
    (scanner, dir)
}

pub fn paginated(
    world: &Rc<RefCell<World>>,
) -> (PaginatedScanner<FakeDevice, FakeReader>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = PaginatedConfig {
        layout: UiLayout::default(),
        timings: Timings::instant(),
        paths: paths(&dir),
    };
    let scanner = PaginatedScanner::new(
        FakeDevice { world: world.clone() },
        FakeReader { world: world.clone() },
        config,
    )
    .unwrap();
    (scanner, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }
}
