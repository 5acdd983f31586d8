//! Built-in profile for a 1600x900 emulator window.

use super::*;

// Recipes per field type
const POWER: Recipe = Recipe::new(3, Some(100), true, 12);
const ID: Recipe = Recipe::new(1, Some(120), true, 0);
const ALLIANCE: Recipe = Recipe::new(3, Some(50), true, 12);
const KILLS: Recipe = Recipe::new(3, Some(150), false, 12);
const MORE_INFO: Recipe = Recipe::inverted();
const RANK: Recipe = Recipe::new(3, Some(90), true, 12);
const LEVEL: Recipe = Recipe::new(4, Some(90), true, 40);
const LIST_NAME: Recipe = Recipe::new(3, Some(90), true, 12);
const LIST_SCORE: Recipe = Recipe::new(3, Some(90), true, 12);
const HONOR_SCORE: Recipe = Recipe::new(3, Some(150), false, 12);
// Same cleanup as LIST_NAME at native size, for archiving
const NAME_ARCHIVE: Recipe = Recipe::new(1, Some(90), true, 4);

const TIER_Y: [u32; TIERS] = [414, 458, 502, 546, 591];

fn region(name: &str, x: u32, y: u32, width: u32, height: u32, recipe: Recipe) -> RegionSpec {
    RegionSpec::new(name, PixelRect::new(x, y, width, height), recipe)
}

/// Two columns of three members, as shown by the alliance member list.
fn grid_rows(prefix: &str, y_offset: u32) -> Vec<RowRegions> {
    let mut rows = Vec::new();
    for row in 0..3u32 {
        for (col, x) in [(0u32, 370u32), (1, 835)] {
            let n = row * 2 + col + 1;
            let y = 331 + row * 134 + y_offset;
            rows.push(RowRegions {
                name: region(&format!("{prefix}_name_{n}"), x, y, 300, 38, LIST_NAME),
                score: region(&format!("{prefix}_score_{n}"), x + 2, y + 48, 240, 36, LIST_SCORE),
            });
        }
    }
    rows
}

fn honor_rows(y_offset: u32) -> Vec<RowRegions> {
    (0..5u32)
        .map(|i| {
            let y = 333 + i * 89 + y_offset;
            RowRegions {
                name: region(&format!("honor_name_{}", i + 1), 774, y, 257, 40, LIST_NAME),
                score: region(&format!("honor_score_{}", i + 1), 1183, y, 183, 40, HONOR_SCORE),
            }
        })
        .collect()
}

impl Default for UiLayout {
    fn default() -> Self {
        let tier_kills = std::array::from_fn(|t| {
            region(&format!("t{}_kills", t + 1), 917, TIER_Y[t], 200, 38, KILLS)
        });
        let tier_killpoints = std::array::from_fn(|t| {
            region(&format!("t{}_killpoints", t + 1), 1298, TIER_Y[t], 171, 38, KILLS)
        });

        Self {
            version: "rok-1600x900-v1".to_string(),
            resolution: (1600, 900),
            detail_marker_text: "More Info".to_string(),
            regions: DetailRegions {
                detail_marker: region("more_info", 158, 776, 137, 29, MORE_INFO),
                id: region("gov_id", 721, 177, 260, 38, ID),
                power: region("power", 876, 321, 218, 38, POWER),
                killpoints: region("killpoints", 1185, 321, 216, 38, POWER),
                alliance: region("alliance_name", 586, 321, 279, 38, ALLIANCE),
                tier_kills,
                tier_killpoints,
                ranged_points: region("ranged_points", 1275, 693, 200, 38, KILLS),
                deaths: region("deaths", 1130, 453, 183, 40, MORE_INFO),
                resources_gathered: region("rss_gathered", 1130, 628, 183, 40, MORE_INFO),
                resources_assisted: region("rss_assisted", 1130, 688, 183, 40, MORE_INFO),
                helps: region("alliance_helps", 1130, 746, 183, 40, MORE_INFO),
                rank_indicator: region("rank_indicator", 196, 698, 52, 27, RANK),
                city_hall_level: region("city_hall_level", 1218, 633, 34, 25, LEVEL),
            },
            taps: TapPositions {
                name_copy: Point::new(617, 232),
                open_kills: Point::new(1174, 305),
                more_info: Point::new(224, 731),
                close_entity: Point::new(1454, 88),
                close_info: Point::new(1396, 58),
                back: Point::new(1393, 53),
                settings: Point::new(1386, 727),
                search_open: Point::new(1157, 230),
                id_input: Point::new(405, 140),
                search_submit: Point::new(1342, 142),
                dismiss: Point::new(100, 100),
            },
            ranking: RankingLayout {
                row_x: 690,
                row_y: [285, 390, 490, 590, 605, 705, 805],
                tail: TailRanks {
                    second_last: 998,
                    last: 999,
                    terminal_indicator: 999,
                },
                scroll_swipe: [Point::new(690, 605), Point::new(690, 540)],
                scroll_script: "kingdom_1_person_scroll.txt".to_string(),
                inactive_crop: InactiveCrop {
                    width: 1400,
                    height: 200,
                    above: 100,
                },
            },
            paginated: PaginatedLayouts {
                alliance: PageLayout {
                    rows: grid_rows("alliance", 0),
                    last_rows: Some(grid_rows("alliance_last", 54)),
                    advance_script: "alliance_6_per_screen.txt".to_string(),
                    name_archive: NAME_ARCHIVE,
                },
                honor: PageLayout {
                    rows: honor_rows(0),
                    last_rows: None,
                    advance_script: "honor_5_per_screen.txt".to_string(),
                    name_archive: NAME_ARCHIVE,
                },
                seed: PageLayout {
                    rows: grid_rows("seed", 0),
                    last_rows: Some(grid_rows("seed_last", 54)),
                    advance_script: "seed_6_per_screen.txt".to_string(),
                    name_archive: NAME_ARCHIVE,
                },
            },
        }
    }
}
