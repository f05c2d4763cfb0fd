//! Image preprocessing for OCR.
//!
//! Card photographs vary a lot in lighting and print contrast, so no single
//! binarization works for every region. This module provides the individual
//! preprocessing pipelines; the strategy catalog decides which one to run.

use image::imageops::FilterType;
use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::contrast::{
    ThresholdType, adaptive_threshold, equalize_histogram, otsu_level, threshold,
};

use crate::layout::PixelRect;

/// Minimum crop height fed to the OCR engine. Small crops are upscaled
/// first; Tesseract performs noticeably better on larger glyphs.
pub const MIN_OCR_HEIGHT: u32 = 80;

/// Crops a sub-region out of a card image.
///
/// The rectangle is assumed to be already clipped to the image (see
/// `Region::resolve`), but bounds are re-checked to stay panic-free on
/// hand-edited layout tables.
pub fn crop_rect(img: &RgbaImage, rect: PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();
    let x = rect.x.min(w);
    let y = rect.y.min(h);
    let rw = rect.width.min(w - x);
    let rh = rect.height.min(h - y);
    image::imageops::crop_imm(img, x, y, rw, rh).to_image()
}

/// Converts a crop to grayscale, upscaling if it is below [`MIN_OCR_HEIGHT`].
pub fn gray_upscaled(img: &RgbaImage) -> GrayImage {
    let gray = to_gray(img);
    let (w, h) = gray.dimensions();
    if h >= MIN_OCR_HEIGHT || h == 0 || w == 0 {
        return gray;
    }
    let scale = MIN_OCR_HEIGHT as f32 / h as f32;
    let nw = ((w as f32 * scale).round() as u32).max(1);
    image::imageops::resize(&gray, nw, MIN_OCR_HEIGHT, FilterType::CatmullRom)
}

/// Converts an RGBA crop to binary by keeping only bright pixels.
///
/// Pixels where R, G and B all exceed `threshold` become black (text);
/// everything else becomes white (background). This isolates light print on
/// the dark banner areas of the card.
pub fn bright_threshold(img: &RgbaImage, bright: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let Rgba([r, g, b, _]) = *pixel;
        let value = if r > bright && g > bright && b > bright {
            0u8
        } else {
            255u8
        };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Global Otsu binarization after histogram equalization.
///
/// Works well for the body text regions where the page is evenly lit.
pub fn otsu_binarize(img: &RgbaImage) -> GrayImage {
    let gray = equalize_histogram(&gray_upscaled(img));
    let level = otsu_level(&gray);
    let bin = threshold(&gray, level, ThresholdType::Binary);
    ensure_dark_text_on_light(bin)
}

/// Local adaptive binarization; handles shadows and lighting gradients
/// across a photographed card.
pub fn adaptive_binarize(img: &RgbaImage) -> GrayImage {
    let gray = equalize_histogram(&gray_upscaled(img));
    let bin = adaptive_threshold(&gray, 12);
    ensure_dark_text_on_light(bin)
}

fn to_gray(img: &RgbaImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in img.enumerate_pixels() {
        let Rgba([r, g, b, _]) = *pixel;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        out.put_pixel(x, y, Luma([luma as u8]));
    }
    out
}

/// Inverts a binary image when it is mostly black, so OCR always sees dark
/// text on a light background.
fn ensure_dark_text_on_light(mut bin: GrayImage) -> GrayImage {
    let mut white = 0u64;
    let mut black = 0u64;
    for p in bin.pixels() {
        if p.0[0] > 0 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}
