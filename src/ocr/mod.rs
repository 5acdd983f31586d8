pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{RecognitionMode, TesseractEngine, TextRecognizer, DIGITS};
pub use extract::{digits_only, read_level, validate_level};
pub use preprocess::{crop_region, preprocess, Recipe};
pub use setup::{ensure_tesseract, TesseractOverrides, TesseractPaths};

use anyhow::Result;
use image::RgbaImage;

use crate::error::ScanError;
use crate::layout::RegionSpec;
use crate::record::Stat;

/// Reads named regions out of captured frames.
///
/// `read` is the only required method; the helpers turn raw text into
/// record values and never fail, so one unreadable region cannot stop a
/// scan.
pub trait ScreenReader {
    fn read(
        &self,
        frame: &RgbaImage,
        region: &RegionSpec,
        mode: RecognitionMode,
        whitelist: Option<&str>,
    ) -> Result<String>;

    /// Digits of a numeric region; empty when nothing could be read.
    fn recognize_number(
        &self,
        frame: &RgbaImage,
        region: &RegionSpec,
        mode: RecognitionMode,
    ) -> String {
        match self.read(frame, region, mode, Some(DIGITS)) {
            Ok(raw) => digits_only(&raw),
            Err(e) => {
                let failure = ScanError::OcrExtractionFailure {
                    region: region.name.clone(),
                };
                log::warn!("{}: {:#}", failure, e);
                String::new()
            }
        }
    }

    /// A numeric region as a stat, `Unknown` when unreadable.
    fn read_stat(&self, frame: &RgbaImage, region: &RegionSpec) -> Stat {
        let digits = self.recognize_number(frame, region, RecognitionMode::SingleWord);
        let stat = extract::parse_stat(&digits);
        if !stat.is_known() {
            log::debug!("No number read from region '{}'", region.name);
        }
        stat
    }

    /// Free text on one line, `None` when empty or unreadable.
    fn read_line(&self, frame: &RgbaImage, region: &RegionSpec) -> Option<String> {
        match self.read(frame, region, RecognitionMode::SingleLine, None) {
            Ok(raw) => {
                let text = raw.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                let failure = ScanError::OcrExtractionFailure {
                    region: region.name.clone(),
                };
                log::warn!("{}: {:#}", failure, e);
                None
            }
        }
    }
}

/// Crops, preprocesses and recognizes with a [`TextRecognizer`].
pub struct OcrReader<R: TextRecognizer> {
    recognizer: R,
}

impl<R: TextRecognizer> OcrReader<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }
}

impl<R: TextRecognizer> ScreenReader for OcrReader<R> {
    fn read(
        &self,
        frame: &RgbaImage,
        region: &RegionSpec,
        mode: RecognitionMode,
        whitelist: Option<&str>,
    ) -> Result<String> {
        let cropped = crop_region(frame, &region.rect);
        let prepared = preprocess(&cropped, &region.recipe);
        self.recognizer.recognize(&prepared, mode, whitelist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PixelRect, RegionSpec};
    use anyhow::anyhow;
    use image::{GrayImage, ImageBuffer, Rgba};
    use std::cell::RefCell;

    /// Reports the size of the image it receives and echoes a fixed text.
    struct EchoEngine {
        text: &'static str,
        seen: RefCell<Vec<(u32, u32, Option<String>)>>,
    }

    impl TextRecognizer for EchoEngine {
        fn recognize(
            &self,
            img: &GrayImage,
            _mode: RecognitionMode,
            whitelist: Option<&str>,
        ) -> Result<String> {
            self.seen
                .borrow_mut()
                .push((img.width(), img.height(), whitelist.map(str::to_string)));
            if self.text == "fail" {
                Err(anyhow!("engine crashed"))
            } else {
                Ok(self.text.to_string())
            }
        }
    }

    fn echo_reader(text: &'static str) -> OcrReader<EchoEngine> {
        OcrReader::new(EchoEngine {
            text,
            seen: RefCell::new(Vec::new()),
        })
    }

    fn frame() -> RgbaImage {
        ImageBuffer::from_pixel(200, 100, Rgba([0, 0, 0, 255]))
    }

    fn power_region() -> RegionSpec {
        let recipe = Recipe::new(3, Some(100), true, 12);
        RegionSpec::new("power", PixelRect::new(10, 10, 50, 20), recipe)
    }

    #[test]
    fn test_reader_crops_and_preprocesses() {
        let reader = echo_reader("1,234");
        reader.read(&frame(), &power_region(), RecognitionMode::SingleWord, None).unwrap();

        let seen = reader.recognizer.seen.borrow();
        assert_eq!((seen[0].0, seen[0].1), (150 + 24, 60 + 24));
    }

    #[test]
    fn test_read_stat_strips_separators() {
        let reader = echo_reader("12,345,678");
        assert_eq!(reader.read_stat(&frame(), &power_region()), Stat::Value(12_345_678));

        let seen = reader.recognizer.seen.borrow();
        assert_eq!(seen[0].2.as_deref(), Some(DIGITS));
    }

    #[test]
    fn test_recognize_number_is_empty_on_failure() {
        let reader = echo_reader("fail");
        let digits =
            reader.recognize_number(&frame(), &power_region(), RecognitionMode::SingleWord);
        assert_eq!(digits, "");
        assert_eq!(reader.read_stat(&frame(), &power_region()), Stat::Unknown);
    }

    #[test]
    fn test_read_line_trims() {
        let line = echo_reader("  [ABC] Name \n").read_line(&frame(), &power_region());
        assert_eq!(line.as_deref(), Some("[ABC] Name"));
        assert_eq!(echo_reader(" \n").read_line(&frame(), &power_region()), None);
        assert_eq!(echo_reader("fail").read_line(&frame(), &power_region()), None);
    }
}
