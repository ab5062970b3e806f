//! HSV conversion and colour-range masking.
//!
//! Hue follows the 8-bit convention used by most vision toolkits: degrees are
//! halved so the full circle fits in `0..180`. Saturation and value span
//! `0..=255`.

use image::{GrayImage, Luma, RgbImage};
use serde::Serialize;

use crate::morphology::{dilate, erode, StructuringElement};

/// Inclusive component-wise HSV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

/// Thresholds and cleanup schedule for the marker masks
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationParams {
    /// Green landing-pad hue/saturation/value band
    pub green: HsvRange,
    /// Erosions applied to the raw green mask before dilating it back
    pub green_erosions: u32,
    pub green_dilations: u32,
    /// Red wraps around hue 0, so it is the union of two bands
    pub red_low: HsvRange,
    pub red_high: HsvRange,
    pub red_erosions: u32,
    pub red_dilations: u32,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            green: HsvRange::new([35, 50, 50], [90, 255, 255]),
            green_erosions: 6,
            green_dilations: 3,
            red_low: HsvRange::new([0, 80, 80], [10, 255, 255]),
            red_high: HsvRange::new([160, 80, 80], [179, 255, 255]),
            red_erosions: 5,
            red_dilations: 2,
        }
    }
}

/// Convert a single RGB triple to 8-bit HSV
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v == 0 {
        0.0
    } else {
        255.0 * delta as f64 / v as f64
    };

    // hue in half-degrees, rounded before wrapping into 0..180
    let h = if delta == 0 {
        0.0
    } else {
        let d = delta as f64;
        let half_degrees = if v == r {
            30.0 * (g - b) as f64 / d
        } else if v == g {
            60.0 + 30.0 * (b - r) as f64 / d
        } else {
            120.0 + 30.0 * (r - g) as f64 / d
        };
        let h = half_degrees.round_ties_even();
        if h < 0.0 {
            h + 180.0
        } else {
            h
        }
    };

    [
        h.clamp(0.0, 179.0) as u8,
        s.round_ties_even().clamp(0.0, 255.0) as u8,
        v as u8,
    ]
}

/// Convert an RGB image to an HSV image (channels stored as H, S, V)
pub fn to_hsv(image: &RgbImage) -> RgbImage {
    let mut hsv = image.clone();
    for pixel in hsv.pixels_mut() {
        pixel.0 = rgb_to_hsv(pixel.0);
    }
    hsv
}

/// Binary mask (255 inside, 0 outside) of pixels whose HSV triple lies in `range`
pub fn segment(hsv: &RgbImage, range: &HsvRange) -> GrayImage {
    GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        if range.contains(hsv.get_pixel(x, y).0) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Green landing-pad mask with its denoising schedule applied
pub fn identify_green(hsv: &RgbImage, params: &SegmentationParams) -> GrayImage {
    let element = StructuringElement::Cross.mask(2);
    let mut mask = segment(hsv, &params.green);
    for _ in 0..params.green_erosions {
        mask = erode(&mask, &element);
    }
    for _ in 0..params.green_dilations {
        mask = dilate(&mask, &element);
    }
    mask
}

/// Red mask: union of both hue bands, then eroded and dilated with a cross
pub fn identify_red(hsv: &RgbImage, params: &SegmentationParams) -> GrayImage {
    let low = segment(hsv, &params.red_low);
    let high = segment(hsv, &params.red_high);

    let mut mask = GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        Luma([low.get_pixel(x, y)[0].saturating_add(high.get_pixel(x, y)[0])])
    });

    let element = StructuringElement::Cross.mask(2);
    for _ in 0..params.red_erosions {
        mask = erode(&mask, &element);
    }
    for _ in 0..params.red_dilations {
        mask = dilate(&mask, &element);
    }
    mask
}
