use image::RgbaImage;

use super::engine::RecognitionMode;
use super::ScreenReader;
use crate::layout::RegionSpec;
use crate::record::Stat;

/// Highest city hall level the game has.
pub const MAX_LEVEL: u8 = 25;

/// Recognition modes tried, in order, when reading a level.
pub const LEVEL_MODES: [RecognitionMode; 3] = [
    RecognitionMode::SingleWord,
    RecognitionMode::SingleLine,
    RecognitionMode::SingleChar,
];

/// Keeps only ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parses already-stripped digits; empty or overflowing input is unknown.
pub fn parse_stat(digits: &str) -> Stat {
    match digits.parse::<u64>() {
        Ok(v) => Stat::Value(v),
        Err(_) => Stat::Unknown,
    }
}

/// Validates a raw level read.
///
/// The raw text must consist of digits only (whitespace aside). A single
/// digit is a level from 1 to 9; two digits must start with 1 or 2 and
/// stay within 10..=25. A stray character next to a digit, such as "2S",
/// is rejected rather than stripped, because it usually means the second
/// digit was misread.
pub fn validate_level(raw: &str) -> Option<u8> {
    let text: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let bytes = text.as_bytes();
    match bytes.len() {
        1 => match bytes[0] {
            b'1'..=b'9' => Some(bytes[0] - b'0'),
            _ => None,
        },
        2 => {
            if bytes[0] != b'1' && bytes[0] != b'2' {
                return None;
            }
            let level = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
            (10..=MAX_LEVEL).contains(&level).then_some(level)
        }
        _ => None,
    }
}

/// Reads a level with several recognition modes, accepting the first read
/// that passes [`validate_level`].
///
/// Gives up after `attempts` reads in total and returns `None`.
pub fn read_level<S: ScreenReader + ?Sized>(
    reader: &S,
    frame: &RgbaImage,
    region: &RegionSpec,
    attempts: usize,
) -> Option<u8> {
    for (attempt, mode) in LEVEL_MODES.iter().cycle().take(attempts).enumerate() {
        let raw = match reader.read(frame, region, *mode, None) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Level read {} failed: {:#}", attempt + 1, e);
                continue;
            }
        };
        match validate_level(&raw) {
            Some(level) => return Some(level),
            None => log::debug!(
                "Level read {} ({:?}) rejected: {:?}",
                attempt + 1,
                mode,
                raw
            ),
        }
    }
    None
}
