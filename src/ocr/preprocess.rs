use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::layout::PixelRect;

/// How a cropped region is cleaned up before OCR.
///
/// Steps run in a fixed order: upscale, grayscale, optional inversion,
/// optional binary threshold, then a white border.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Integer upscale factor, 1 = keep size
    pub scale: u32,
    /// Pixels brighter than this become white, the rest black
    pub threshold: Option<u8>,
    /// Invert before thresholding (light text on dark background)
    pub invert: bool,
    /// White border in pixels added around the result
    pub padding: u32,
}

impl Recipe {
    pub const fn new(scale: u32, threshold: Option<u8>, invert: bool, padding: u32) -> Self {
        Self {
            scale,
            threshold,
            invert,
            padding,
        }
    }

    /// Grayscale and inversion only.
    pub const fn inverted() -> Self {
        Self::new(1, None, true, 0)
    }
}

/// Crops a sub-region from an image using absolute pixel coordinates.
///
/// Clamps the rectangle to the image bounds; a rectangle entirely outside
/// the image yields an empty crop.
pub fn crop_region(img: &RgbaImage, region: &PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = region.x.min(w);
    let y0 = region.y.min(h);
    let rw = region.width.min(w - x0);
    let rh = region.height.min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Runs a recipe on a crop and returns the image handed to the recognizer.
pub fn preprocess(img: &RgbaImage, recipe: &Recipe) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return pad_white(&GrayImage::new(0, 0), recipe.padding.max(1));
    }

    let scaled = if recipe.scale > 1 {
        imageops::resize(img, w * recipe.scale, h * recipe.scale, FilterType::CatmullRom)
    } else {
        img.clone()
    };

    let mut gray = imageops::grayscale(&scaled);

    if recipe.invert {
        imageops::invert(&mut gray);
    }

    if let Some(threshold) = recipe.threshold {
        binarize(&mut gray, threshold);
    }

    if recipe.padding > 0 {
        pad_white(&gray, recipe.padding)
    } else {
        gray
    }
}

/// Pixels above the threshold become white (255), all others black (0).
pub fn binarize(img: &mut GrayImage, threshold: u8) {
    for pixel in img.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
}

/// Surrounds an image with a white border.
pub fn pad_white(img: &GrayImage, padding: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut output: GrayImage =
        ImageBuffer::from_pixel(w + 2 * padding, h + 2 * padding, Luma([255]));
    imageops::replace(&mut output, img, padding as i64, padding as i64);
    output
}
