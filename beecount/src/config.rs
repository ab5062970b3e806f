//! Configuration layer separating CLI arguments from the pipeline configuration.
//!
//! - `GlobalArgs` / `CountCommand`: what the user types
//! - `BaseConfig`: batch-level options (sources, output placement, strictness)
//! - `PipelineParams`: every numeric constant of the counting pipeline, with
//!   named fields and the calibrated defaults
//!
//! Conversion from CLI to internal configuration validates once at startup so
//! the pipeline itself never has to.

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use serde::Serialize;

use crate::background_removal::BackgroundParams;
use crate::blob_aggregation::BlobParams;
use crate::brightness::BrightnessParams;
use crate::color_segmentation::SegmentationParams;
use crate::morphology::CleanerParams;
use crate::region_locator::LocatorParams;

/// Calibrated pixel area of a single bee at the reference camera distance
pub const DEFAULT_AVG_BEE_AREA: f64 = 90.0;

/// Row/column window cropped from each frame before anything else runs.
/// Start bounds are inclusive, end bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropWindow {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

impl CropWindow {
    pub fn width(&self) -> u32 {
        self.col_end.saturating_sub(self.col_start)
    }

    pub fn height(&self) -> u32 {
        self.row_end.saturating_sub(self.row_start)
    }
}

/// Parse a crop window from "ROW_START,ROW_END,COL_START,COL_END"
pub fn parse_crop_window(s: &str) -> Result<CropWindow, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(
            "Crop window must be in format 'ROW_START,ROW_END,COL_START,COL_END' (e.g., '0,480,0,640')"
                .to_string(),
        );
    }

    let mut bounds = [0u32; 4];
    for (i, part) in parts.iter().enumerate() {
        bounds[i] = part
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid crop bound: '{part}'"))?;
    }

    let window = CropWindow {
        row_start: bounds[0],
        row_end: bounds[1],
        col_start: bounds[2],
        col_end: bounds[3],
    };
    if window.row_start >= window.row_end || window.col_start >= window.col_end {
        return Err(format!(
            "Crop window must have start < end on both axes, got rows {}..{} cols {}..{}",
            window.row_start, window.row_end, window.col_start, window.col_end
        ));
    }
    Ok(window)
}

/// Parse a strictly positive, finite area
pub fn parse_positive_area(s: &str) -> Result<f64, String> {
    let val = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !val.is_finite() || val <= 0.0 {
        return Err(format!("Must be a positive number, got {val}"));
    }
    Ok(val)
}

/// Global CLI arguments that apply to every beecount command
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Output directory for diagnostic images and metadata (default: `output/` next to each input)
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Create metadata output file(s)
    #[arg(long, global = true)]
    pub metadata: bool,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Abort the batch on the first image that fails instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,

    /// Disable colored output (also respects NO_COLOR and BEECOUNT_NO_COLOR env vars)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Number of images processed in parallel (1 = sequential)
    #[arg(short, long, default_value = "1", global = true)]
    pub jobs: usize,
}

/// Batch configuration shared by every command
#[derive(Debug, Clone, Serialize)]
pub struct BaseConfig {
    /// Input sources (images, directories or glob patterns)
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub skip_metadata: bool,
    pub strict: bool,
    pub jobs: usize,
}

impl From<GlobalArgs> for BaseConfig {
    fn from(global: GlobalArgs) -> Self {
        Self {
            sources: Vec::new(), // Sources come from the command
            output_dir: global.output_dir,
            skip_metadata: !global.metadata,
            strict: global.strict,
            jobs: global.jobs.max(1),
        }
    }
}

/// CLI command for bee counting (only command-specific arguments)
#[derive(Parser, Debug, Clone)]
pub struct CountCommand {
    /// Path(s) to input images or directories. Supports glob patterns like *.jpg
    #[arg(value_name = "IMAGES_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Region of each frame where the landing pad can appear: ROW_START,ROW_END,COL_START,COL_END
    #[arg(long, value_parser = parse_crop_window)]
    pub crop: Option<CropWindow>,

    /// Pixel area of a single bee, used to turn blob area into a count
    #[arg(long, default_value = "90", value_parser = parse_positive_area)]
    pub avg_bee_area: f64,

    /// Only write the annotated result image, skip intermediate masks
    #[arg(long)]
    pub no_debug_images: bool,

    /// Print "<name>,<count>" instead of the bare count
    #[arg(long)]
    pub with_names: bool,
}

/// Every constant of the counting pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_window: Option<CropWindow>,
    pub avg_bee_area: f64,
    pub brightness: BrightnessParams,
    pub segmentation: SegmentationParams,
    pub locator: LocatorParams,
    pub background: BackgroundParams,
    pub cleaner: CleanerParams,
    pub blobs: BlobParams,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            crop_window: None,
            avg_bee_area: DEFAULT_AVG_BEE_AREA,
            brightness: BrightnessParams::default(),
            segmentation: SegmentationParams::default(),
            locator: LocatorParams::default(),
            background: BackgroundParams::default(),
            cleaner: CleanerParams::default(),
            blobs: BlobParams::default(),
        }
    }
}

impl PipelineParams {
    /// Reject values that would make the estimate meaningless
    pub fn validate(&self) -> Result<(), String> {
        if !self.avg_bee_area.is_finite() || self.avg_bee_area <= 0.0 {
            return Err(format!(
                "Average bee area must be a positive number, got {}",
                self.avg_bee_area
            ));
        }
        if let Some(window) = &self.crop_window {
            if window.row_start >= window.row_end || window.col_start >= window.col_end {
                return Err(format!("Crop window is empty: {window:?}"));
            }
        }
        if self.blobs.min_area >= self.blobs.max_area {
            return Err(format!(
                "Blob area bounds are inverted: {} >= {}",
                self.blobs.min_area, self.blobs.max_area
            ));
        }
        Ok(())
    }
}

/// Internal configuration for a counting run
#[derive(Debug, Clone, Serialize)]
pub struct CountConfig {
    #[serde(skip)]
    pub base: BaseConfig,
    pub params: PipelineParams,
    pub save_debug_images: bool,
    #[serde(skip)]
    pub with_names: bool,
}

impl CountConfig {
    /// Create configuration from global args and command-specific args
    pub fn from_args(global: GlobalArgs, cmd: CountCommand) -> Result<Self, String> {
        let mut base: BaseConfig = global.into();
        base.sources = cmd.sources;

        let params = PipelineParams {
            crop_window: cmd.crop,
            avg_bee_area: cmd.avg_bee_area,
            ..Default::default()
        };
        params.validate()?;

        Ok(Self {
            base,
            params,
            save_debug_images: !cmd.no_debug_images,
            with_names: cmd.with_names,
        })
    }
}
