use image::{Rgb, RgbImage};
use log::debug;
use serde::Serialize;

/// Brightness band and the single-pass corrections applied outside it
#[derive(Debug, Clone, Serialize)]
pub struct BrightnessParams {
    /// Images darker than this are stretched
    pub dark_threshold: f64,
    /// Images brighter than this are darkened
    pub bright_threshold: f64,
    /// Gain applied to dark images
    pub dark_gain: f64,
    /// Offset target for dark images; the additive term is `dark_target - brightness`
    pub dark_target: f64,
    /// Amount subtracted from every channel of bright images
    pub bright_offset: f64,
}

impl Default for BrightnessParams {
    fn default() -> Self {
        Self {
            dark_threshold: 40.0,
            bright_threshold: 90.0,
            dark_gain: 1.5,
            dark_target: 91.0,
            bright_offset: 40.0,
        }
    }
}

/// Which correction, if any, was applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessAdjustment {
    Brightened { gain: f64, offset: f64 },
    Darkened { offset: f64 },
    Unchanged,
}

/// 8-bit luma of one pixel: each weighted channel is rounded on its own and
/// the sum saturates at 255.
fn pixel_luma(pixel: &Rgb<u8>) -> u64 {
    let weighted = |value: u8, weight: f64| (value as f64 * weight).round_ties_even() as u64;
    (weighted(pixel[0], 0.299) + weighted(pixel[1], 0.587) + weighted(pixel[2], 0.114)).min(255)
}

/// Scalar brightness of an image.
///
/// The luma sum is divided by `2 * rows * cols`, so a pure white frame
/// measures 127.5 rather than 255.
pub fn measure_brightness(image: &RgbImage) -> f64 {
    let pixels = image.width() as f64 * image.height() as f64;
    if pixels == 0.0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(pixel_luma).sum();
    sum as f64 / (2.0 * pixels)
}

fn convert_scale(image: &RgbImage, gain: f64, offset: f64) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = (*c as f64 * gain + offset).round_ties_even().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Normalize brightness with one decision: stretch dark frames, darken
/// bright frames, leave the rest untouched.
pub fn normalize(image: &RgbImage, params: &BrightnessParams) -> (RgbImage, f64, BrightnessAdjustment) {
    let brightness = measure_brightness(image);

    let (adjusted, adjustment) = if brightness < params.dark_threshold {
        let offset = params.dark_target - brightness;
        (
            convert_scale(image, params.dark_gain, offset),
            BrightnessAdjustment::Brightened {
                gain: params.dark_gain,
                offset,
            },
        )
    } else if brightness > params.bright_threshold {
        (
            convert_scale(image, 1.0, -params.bright_offset),
            BrightnessAdjustment::Darkened {
                offset: params.bright_offset,
            },
        )
    } else {
        (image.clone(), BrightnessAdjustment::Unchanged)
    };

    debug!("Brightness {brightness:.2} -> {adjustment:?}");
    (adjusted, brightness, adjustment)
}
