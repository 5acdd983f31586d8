//! UI layout profile: every pixel rectangle and tap position the scanners use.
//!
//! A profile is tied to one emulator resolution and one game UI layout.
//! When the UI changes, a complete new profile is loaded; fields are never
//! patched individually at runtime.

mod default_profile;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ocr::preprocess::Recipe;
use crate::record::TIERS;

/// Ranking rows tapped directly by index before the list starts scrolling.
pub const DIRECT_ROWS: usize = 4;

/// Number of fixed on-screen ranking row positions.
pub const RANKING_ROWS: usize = 7;

/// A point in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in screen pixels (top-left corner plus size).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A named OCR region: where to crop and how to preprocess the crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub rect: PixelRect,
    pub recipe: Recipe,
}

impl RegionSpec {
    pub fn new(name: &str, rect: PixelRect, recipe: Recipe) -> Self {
        Self {
            name: name.to_string(),
            rect,
            recipe,
        }
    }
}

/// Regions read while a governor's detail view is open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailRegions {
    /// "More Info" button, only present when a profile is actually open
    pub detail_marker: RegionSpec,
    // profile page
    pub id: RegionSpec,
    pub power: RegionSpec,
    pub killpoints: RegionSpec,
    pub alliance: RegionSpec,
    // kills page
    pub tier_kills: [RegionSpec; TIERS],
    pub tier_killpoints: [RegionSpec; TIERS],
    pub ranged_points: RegionSpec,
    // more info page
    pub deaths: RegionSpec,
    pub resources_gathered: RegionSpec,
    pub resources_assisted: RegionSpec,
    pub helps: RegionSpec,
    /// Rank shown on the ranking screen, used to confirm the end of the list
    pub rank_indicator: RegionSpec,
    /// Level digits on the search result card
    pub city_hall_level: RegionSpec,
}

/// Tap targets for navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapPositions {
    pub name_copy: Point,
    pub open_kills: Point,
    pub more_info: Point,
    pub close_entity: Point,
    pub close_info: Point,
    pub back: Point,
    pub settings: Point,
    pub search_open: Point,
    pub id_input: Point,
    pub search_submit: Point,
    /// Empty area used to dismiss popups
    pub dismiss: Point,
}

/// Rank values at which the ranking list ends.
///
/// These depend on the observed game version and are configuration rather
/// than constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailRanks {
    pub second_last: usize,
    pub last: usize,
    /// Value the rank indicator shows once the list cannot scroll further
    pub terminal_indicator: u64,
}

/// Area archived when a tapped row turns out to be inactive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactiveCrop {
    pub width: u32,
    pub height: u32,
    /// Pixels above the tapped row's y coordinate
    pub above: u32,
}

/// The ranking list the drill-down scan walks through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingLayout {
    pub row_x: u32,
    pub row_y: [u32; RANKING_ROWS],
    pub tail: TailRanks,
    /// Short swipe used to nudge past an inactive row
    pub scroll_swipe: [Point; 2],
    /// Input script used instead of the swipe when advanced scrolling is on
    pub scroll_script: String,
    pub inactive_crop: InactiveCrop,
}

impl RankingLayout {
    /// Maps a rank to one of the fixed row positions.
    ///
    /// Only a window of rows is ever rendered. The first rows are tapped
    /// directly, shifted by the number of inactive rows skipped so far; after
    /// that the list keeps the next governor in the same slot, except for
    /// the two last ranks which sit below it.
    pub fn row_lookup(&self, rank: usize, skips: usize) -> u32 {
        if rank + skips < DIRECT_ROWS {
            self.row_y[rank + skips]
        } else if rank < self.tail.second_last {
            self.row_y[DIRECT_ROWS]
        } else if rank == self.tail.second_last {
            self.row_y[DIRECT_ROWS + 1]
        } else {
            self.row_y[DIRECT_ROWS + 2]
        }
    }

    pub fn row_tap(&self, rank: usize, skips: usize) -> Point {
        Point::new(self.row_x, self.row_lookup(rank, skips))
    }

    /// Area around a tapped row, for archiving inactive rows.
    pub fn inactive_area(&self, row_y: u32) -> PixelRect {
        PixelRect::new(
            0,
            row_y.saturating_sub(self.inactive_crop.above),
            self.inactive_crop.width,
            self.inactive_crop.height,
        )
    }
}

/// One row of a paginated list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowRegions {
    pub name: RegionSpec,
    pub score: RegionSpec,
}

/// Row layout of one paginated mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub rows: Vec<RowRegions>,
    /// Shifted rows of the final page, used once the bottom is reached
    pub last_rows: Option<Vec<RowRegions>>,
    /// Input script that advances exactly one page
    pub advance_script: String,
    /// Lighter preprocessing for the archived name image
    pub name_archive: Recipe,
}

impl PageLayout {
    pub fn rows_per_page(&self) -> usize {
        self.rows.len()
    }

    /// Rows to read on the current page.
    pub fn rows_for(&self, reached_bottom: bool) -> &[RowRegions] {
        match (&self.last_rows, reached_bottom) {
            (Some(last), true) => last,
            _ => &self.rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaginatedLayouts {
    pub alliance: PageLayout,
    pub honor: PageLayout,
    pub seed: PageLayout,
}

/// A complete UI layout profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UiLayout {
    pub version: String,
    pub resolution: (u32, u32),
    /// Text expected in the detail marker region
    pub detail_marker_text: String,
    pub regions: DetailRegions,
    pub taps: TapPositions,
    pub ranking: RankingLayout,
    pub paginated: PaginatedLayouts,
}

impl UiLayout {
    /// Checks the profile for obviously broken entries.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(anyhow!("Layout profile has no version"));
        }
        if self.detail_marker_text.trim().is_empty() {
            return Err(anyhow!("Layout profile has no detail marker text"));
        }

        let r = &self.regions;
        let mut regions: Vec<&RegionSpec> = vec![
            &r.detail_marker,
            &r.id,
            &r.power,
            &r.killpoints,
            &r.alliance,
            &r.ranged_points,
            &r.deaths,
            &r.resources_gathered,
            &r.resources_assisted,
            &r.helps,
            &r.rank_indicator,
            &r.city_hall_level,
        ];
        regions.extend(r.tier_kills.iter());
        regions.extend(r.tier_killpoints.iter());

        for (mode, page) in [
            ("alliance", &self.paginated.alliance),
            ("honor", &self.paginated.honor),
            ("seed", &self.paginated.seed),
        ] {
            if page.rows.is_empty() {
                return Err(anyhow!("Layout profile has no {} rows", mode));
            }
            if let Some(last) = &page.last_rows {
                if last.len() != page.rows.len() {
                    return Err(anyhow!(
                        "Layout profile: {} has {} rows but {} final-page rows",
                        mode,
                        page.rows.len(),
                        last.len()
                    ));
                }
            }
            for row in page.rows.iter().chain(page.last_rows.iter().flatten()) {
                regions.push(&row.name);
                regions.push(&row.score);
            }
        }

        for region in regions {
            if region.rect.is_empty() {
                return Err(anyhow!("Region '{}' has an empty rectangle", region.name));
            }
            if region.recipe.scale == 0 {
                return Err(anyhow!("Region '{}' has a zero scale factor", region.name));
            }
        }

        let tail = &self.ranking.tail;
        if tail.last != tail.second_last + 1 {
            return Err(anyhow!(
                "Tail ranks must be consecutive, got {} and {}",
                tail.second_last,
                tail.last
            ));
        }

        Ok(())
    }
}

/// Loads a complete layout profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<UiLayout> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout profile {}", path.display()))?;
    let layout: UiLayout = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse layout profile {}", path.display()))?;
    layout.validate()?;
    log::info!(
        "Layout profile '{}' ({}x{}) loaded",
        layout.version,
        layout.resolution.0,
        layout.resolution.1
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        UiLayout::default().validate().unwrap();
    }

    #[test]
    fn test_row_lookup_direct_rows_shift_with_skips() {
        let ranking = UiLayout::default().ranking;
        let y = ranking.row_y;

        assert_eq!(ranking.row_lookup(0, 0), y[0]);
        assert_eq!(ranking.row_lookup(1, 0), y[1]);
        assert_eq!(ranking.row_lookup(1, 2), y[3]);
        // Skips push the tap into the scrolling slot
        assert_eq!(ranking.row_lookup(2, 2), y[4]);
    }

    #[test]
    fn test_row_lookup_scrolling_and_tail_slots() {
        let ranking = UiLayout::default().ranking;
        let y = ranking.row_y;

        assert_eq!(ranking.row_lookup(4, 0), y[4]);
        assert_eq!(ranking.row_lookup(500, 3), y[4]);
        assert_eq!(ranking.row_lookup(997, 0), y[4]);
        assert_eq!(ranking.row_lookup(998, 0), y[5]);
        assert_eq!(ranking.row_lookup(999, 0), y[6]);
        assert_eq!(ranking.row_lookup(1200, 0), y[6]);
    }

    #[test]
    fn test_inactive_area_clamps_at_top() {
        let ranking = UiLayout::default().ranking;
        let area = ranking.inactive_area(40);
        assert_eq!(area.y, 0);
        assert_eq!(area.width, ranking.inactive_crop.width);
    }

    #[test]
    fn test_page_layout_switches_to_last_rows() {
        let alliance = UiLayout::default().paginated.alliance;
        assert_eq!(alliance.rows_per_page(), 6);
        assert_eq!(alliance.rows_for(false), alliance.rows.as_slice());
        assert_eq!(
            alliance.rows_for(true),
            alliance.last_rows.as_deref().unwrap()
        );

        let honor = UiLayout::default().paginated.honor;
        assert_eq!(honor.rows_per_page(), 5);
        assert_eq!(honor.rows_for(true), honor.rows.as_slice());
    }

    #[test]
    fn test_profile_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let layout = UiLayout::default();
        fs::write(&path, serde_json::to_string_pretty(&layout).unwrap()).unwrap();

        assert_eq!(load_profile(&path).unwrap(), layout);
    }

    #[test]
    fn test_partial_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"version": "patch", "resolution": [1600, 900]}"#).unwrap();

        assert!(load_profile(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_region() {
        let mut layout = UiLayout::default();
        layout.regions.power.rect.width = 0;
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("power"));
    }

    #[test]
    fn test_validate_rejects_mismatched_last_rows() {
        let mut layout = UiLayout::default();
        if let Some(last) = layout.paginated.seed.last_rows.as_mut() {
            last.pop();
        }
        assert!(layout.validate().is_err());
    }
}
