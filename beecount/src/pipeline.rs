//! Per-image counting pass.
//!
//! Stages run strictly in order and each one hands a freshly owned buffer to
//! the next:
//!
//! 1. crop the configured window out of the frame
//! 2. normalize brightness
//! 3. segment the green landing-pad marker
//! 4. locate the marker and crop the region of interest
//! 5. separate bee-coloured foreground from the pad
//! 6. morphological cleanup
//! 7. measure bee-sized blobs and estimate the count

use image::imageops;
use image::{GrayImage, RgbImage};
use log::debug;
use thiserror::Error;

use crate::background_removal::remove_background;
use crate::blob_aggregation::aggregate;
use crate::brightness::{normalize, BrightnessAdjustment};
use crate::color_segmentation::{identify_green, to_hsv};
use crate::config::PipelineParams;
use crate::contours::RegionRect;
use crate::morphology::clean;
use crate::region_locator::{locate_marker, MarkerLocation};

/// Reasons a single image cannot be counted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no landing-pad marker found")]
    MarkerNotFound,
    #[error("crop window rows {row_start}..{row_end} cols {col_start}..{col_end} exceeds {width}x{height} frame")]
    CropOutOfBounds {
        row_start: u32,
        row_end: u32,
        col_start: u32,
        col_end: u32,
        width: u32,
        height: u32,
    },
    #[error("image has no pixels")]
    EmptyImage,
}

/// Intermediate buffers of the region of interest, kept for diagnostics
#[derive(Debug, Clone)]
pub struct RegionImages {
    pub without_background: RgbImage,
    pub cleaned: RgbImage,
    pub annotated: RgbImage,
}

/// Everything one pass produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub brightness: f64,
    pub adjustment: BrightnessAdjustment,
    pub marker_mask: GrayImage,
    pub roi: RegionRect,
    /// `None` when the located marker region is zero-sized
    pub region: Option<RegionImages>,
    pub estimated_count: u64,
    pub total_area: f64,
    pub blob_count: usize,
}

fn apply_crop_window(image: &RgbImage, params: &PipelineParams) -> Result<RgbImage, PipelineError> {
    let Some(window) = params.crop_window else {
        return Ok(image.clone());
    };
    let (width, height) = image.dimensions();
    let inverted = window.row_start >= window.row_end || window.col_start >= window.col_end;
    if inverted || window.col_end > width || window.row_end > height {
        return Err(PipelineError::CropOutOfBounds {
            row_start: window.row_start,
            row_end: window.row_end,
            col_start: window.col_start,
            col_end: window.col_end,
            width,
            height,
        });
    }
    Ok(imageops::crop_imm(
        image,
        window.col_start,
        window.row_start,
        window.width(),
        window.height(),
    )
    .to_image())
}

/// Run the full counting pass over one decoded frame
pub fn count_bees(image: &RgbImage, params: &PipelineParams) -> Result<PipelineOutput, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyImage);
    }

    let framed = apply_crop_window(image, params)?;
    let (adjusted, brightness, adjustment) = normalize(&framed, &params.brightness);

    let hsv = to_hsv(&adjusted);
    let marker_mask = identify_green(&hsv, &params.segmentation);

    let roi = match locate_marker(&marker_mask, &params.locator) {
        MarkerLocation::Found(rect) => rect,
        MarkerLocation::NotFound => return Err(PipelineError::MarkerNotFound),
    };
    debug!("Region of interest: {roi:?}");

    if roi.is_empty() {
        return Ok(PipelineOutput {
            brightness,
            adjustment,
            marker_mask,
            roi,
            region: None,
            estimated_count: 0,
            total_area: 0.0,
            blob_count: 0,
        });
    }

    let (width, height) = adjusted.dimensions();
    if !roi.fits_within(width, height) {
        return Err(PipelineError::CropOutOfBounds {
            row_start: roi.y,
            row_end: roi.y + roi.height,
            col_start: roi.x,
            col_end: roi.x + roi.width,
            width,
            height,
        });
    }
    let cropped = imageops::crop_imm(&adjusted, roi.x, roi.y, roi.width, roi.height).to_image();

    let without_background = remove_background(&cropped, &params.background);
    let cleaned = clean(&without_background, &params.cleaner);
    let gray = imageops::grayscale(&cleaned);

    let summary = aggregate(&gray, &cropped, &params.blobs, params.avg_bee_area);

    Ok(PipelineOutput {
        brightness,
        adjustment,
        marker_mask,
        roi,
        region: Some(RegionImages {
            without_background,
            cleaned,
            annotated: summary.annotated,
        }),
        estimated_count: summary.estimated_count,
        total_area: summary.total_area,
        blob_count: summary.blob_areas.len(),
    })
}
