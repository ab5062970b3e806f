//! Batch driver: collects input frames, runs the counting pass over each one
//! and records diagnostics and metadata.
//!
//! Images are independent, so `--jobs N` fans them out over a rayon pool.
//! Results are always gathered back in input order.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::brightness::BrightnessAdjustment;
use crate::color_utils::{progress::create_batch_progress_bar, symbols};
use crate::config::CountConfig;
use crate::contours::RegionRect;
use crate::image_input::{list_images, ImageInputConfig, ImageSource};
use crate::output_manager::OutputManager;
use crate::pipeline::count_bees;
use crate::progress::remove_progress_bar;
use crate::shared_metadata::{collect_beecount_env_vars, CountSections, ExecutionContext, InputProcessing};

/// Outcome of counting one frame
#[derive(Debug, Clone, Serialize)]
pub struct ImageCount {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub estimated_count: u64,
    pub total_area: f64,
    pub blob_count: usize,
    pub marker: RegionRect,
    pub brightness: f64,
    pub adjustment: BrightnessAdjustment,
    pub processing_time_ms: f64,
}

impl ImageCount {
    /// Standard output line for this image
    pub fn output_line(&self, with_names: bool) -> String {
        if with_names {
            format!("{},{}", self.name, self.estimated_count)
        } else {
            self.estimated_count.to_string()
        }
    }
}

/// Successful counts in input order plus the number of skipped frames
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub counts: Vec<ImageCount>,
    pub failed: usize,
}

/// Invocation details shared by every image of a run
struct RunContext {
    command_line: Vec<String>,
    start_timestamp: DateTime<Utc>,
}

/// Load, count, and write the outputs of a single frame
fn process_single_image(
    source: &ImageSource,
    config: &CountConfig,
    run: &RunContext,
) -> Result<ImageCount> {
    let start = Instant::now();
    let path = source.path.as_path();
    let frame = source.load()?;
    let output = count_bees(&frame.image, &config.params)
        .with_context(|| format!("Counting failed for {}", frame.name))?;

    if output.region.is_none() {
        warn!(
            "{}Marker region in {} is empty, reporting 0 bees",
            symbols::warning(),
            frame.name
        );
    }

    let output_manager = OutputManager::new(config, path);
    let written = output_manager.write_diagnostics(&output)?;

    let result = ImageCount {
        name: frame.name,
        path: frame.path,
        estimated_count: output.estimated_count,
        total_area: output.total_area,
        blob_count: output.blob_count,
        marker: output.roi,
        brightness: output.brightness,
        adjustment: output.adjustment,
        processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    if !config.base.skip_metadata {
        let sections = CountSections {
            core: Some(toml::Value::try_from(&result)?),
            config: Some(toml::Value::try_from(config)?),
            execution: Some(ExecutionContext {
                timestamp: Some(run.start_timestamp),
                beecount_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                command_line: Some(run.command_line.clone()),
                exit_code: Some(0),
                processing_time_ms: Some(result.processing_time_ms),
                beecount_env_vars: collect_beecount_env_vars(),
            }),
            input: Some(InputProcessing {
                image_path: path.to_string_lossy().to_string(),
                width: frame.image.width(),
                height: frame.image.height(),
                strict_mode: config.base.strict,
            }),
            outputs: Some(output_manager.relative_outputs(&written)?),
        };
        output_manager.save_complete_metadata(sections)?;
    }

    Ok(result)
}

/// Count every frame named by the configured sources
pub fn run_count(config: &CountConfig) -> Result<BatchSummary> {
    let batch_start = Instant::now();
    let run = RunContext {
        command_line: std::env::args().collect(),
        start_timestamp: Utc::now(),
    };

    let image_config = ImageInputConfig::from_strict_flag(config.base.strict);
    let image_files = list_images(&config.base.sources, &image_config)?;

    if image_files.is_empty() {
        warn!("{}No valid images found to process", symbols::warning());
        return Ok(BatchSummary::default());
    }
    info!(
        "{}Found {} image(s) to process",
        symbols::resources_found(),
        image_files.len()
    );

    let total = image_files.len();
    let progress_bar = create_batch_progress_bar(total);

    let process = |index: usize, source: &ImageSource| {
        let path = &source.path;
        let result = process_single_image(source, config, &run);
        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
        match &result {
            Ok(count) => debug!(
                "{}Processed {} ({}/{total}) in {:.1}ms: {} bees",
                symbols::completed_successfully(),
                path.display(),
                index + 1,
                count.processing_time_ms,
                count.estimated_count
            ),
            Err(e) => warn!(
                "{}Failed to process {} ({}/{total}): {e:#}",
                symbols::operation_failed(),
                path.display(),
                index + 1
            ),
        }
        result
    };

    let results: Vec<Result<ImageCount>> = if config.base.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.base.jobs)
            .build()
            .context("Failed to configure thread pool")?;
        pool.install(|| {
            image_files
                .par_iter()
                .enumerate()
                .map(|(index, source)| process(index, source))
                .collect()
        })
    } else {
        let mut results = Vec::with_capacity(total);
        for (index, source) in image_files.iter().enumerate() {
            let result = process(index, source);
            let failed = result.is_err();
            results.push(result);
            if failed && config.base.strict {
                break;
            }
        }
        results
    };

    if let Some(pb) = &progress_bar {
        pb.finish_and_clear();
        remove_progress_bar(pb);
    }

    let mut summary = BatchSummary::default();
    for result in results {
        match result {
            Ok(count) => summary.counts.push(count),
            Err(e) if config.base.strict => return Err(e),
            Err(_) => summary.failed += 1,
        }
    }

    let elapsed = batch_start.elapsed().as_secs_f64();
    if summary.failed == 0 {
        info!(
            "{}Counted bees in {} image(s) in {elapsed:.1}s",
            symbols::completed_successfully(),
            summary.counts.len()
        );
    } else {
        warn!(
            "{}{} of {total} images failed to process",
            symbols::completed_partially_successfully(),
            summary.failed
        );
    }

    Ok(summary)
}
