//! Output path management for diagnostic images and metadata.
//!
//! Every input frame produces up to four diagnostic images named
//! `<prefix>_<input file name>`, plus an optional `<stem>.beecount.toml`
//! sidecar. Without `--output-dir` they land in an `output/` directory next
//! to the input.

use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::CountConfig;
use crate::image_input::write_image;
use crate::pipeline::PipelineOutput;
use crate::shared_metadata::{get_metadata_path, load_or_create_metadata, save_metadata, CountSections};

/// Directory name used when no output directory is configured
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// The diagnostic images written for each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Green marker mask
    Marker,
    /// Region of interest after background removal
    WithoutBackground,
    /// Region of interest after morphological cleanup
    Cleaned,
    /// Region of interest with retained blobs outlined
    Result,
}

impl Diagnostic {
    pub fn prefix(self) -> &'static str {
        match self {
            Diagnostic::Marker => "green",
            Diagnostic::WithoutBackground => "withoutbackground",
            Diagnostic::Cleaned => "erode",
            Diagnostic::Result => "res",
        }
    }
}

/// Output placement for a single input image
pub struct OutputManager<'a> {
    config: &'a CountConfig,
    input_path: &'a Path,
}

impl<'a> OutputManager<'a> {
    pub fn new(config: &'a CountConfig, input_path: &'a Path) -> Self {
        Self { config, input_path }
    }

    fn input_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }

    /// Directory all outputs of this input go to
    pub fn output_dir(&self) -> PathBuf {
        match &self.config.base.output_dir {
            Some(dir) => PathBuf::from(dir),
            None => self
                .input_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(DEFAULT_OUTPUT_DIR),
        }
    }

    pub fn diagnostic_path(&self, kind: Diagnostic) -> PathBuf {
        self.output_dir()
            .join(format!("{}_{}", kind.prefix(), self.input_name()))
    }

    pub fn metadata_path(&self) -> Result<PathBuf> {
        get_metadata_path(self.input_path, &self.output_dir())
    }

    /// Write the diagnostic images of one pass. Intermediate buffers are
    /// skipped unless debug images are enabled; the region images are skipped
    /// when the marker region was empty.
    pub fn write_diagnostics(&self, output: &PipelineOutput) -> Result<Vec<(Diagnostic, PathBuf)>> {
        let mut written = Vec::new();

        if self.config.save_debug_images {
            let path = self.diagnostic_path(Diagnostic::Marker);
            write_image(&path, &output.marker_mask)?;
            written.push((Diagnostic::Marker, path));
        }

        if let Some(region) = &output.region {
            if self.config.save_debug_images {
                let path = self.diagnostic_path(Diagnostic::WithoutBackground);
                write_image(&path, &region.without_background)?;
                written.push((Diagnostic::WithoutBackground, path));

                let path = self.diagnostic_path(Diagnostic::Cleaned);
                write_image(&path, &region.cleaned)?;
                written.push((Diagnostic::Cleaned, path));
            }

            let path = self.diagnostic_path(Diagnostic::Result);
            write_image(&path, &region.annotated)?;
            written.push((Diagnostic::Result, path));
        }

        for (kind, path) in &written {
            debug!("Wrote {} image {}", kind.prefix(), path.display());
        }
        Ok(written)
    }

    /// Written outputs keyed by prefix, paths relative to the metadata file
    pub fn relative_outputs(&self, written: &[(Diagnostic, PathBuf)]) -> Result<BTreeMap<String, String>> {
        let metadata_path = self.metadata_path()?;
        written
            .iter()
            .map(|(kind, path)| {
                Ok((
                    kind.prefix().to_string(),
                    make_path_relative_to_toml(path, &metadata_path)?,
                ))
            })
            .collect()
    }

    /// Save the count sections, keeping whatever else the file already holds
    pub fn save_complete_metadata(&self, sections: CountSections) -> Result<()> {
        if self.config.base.skip_metadata {
            return Ok(());
        }

        let metadata_path = self.metadata_path()?;
        let mut metadata = load_or_create_metadata(&metadata_path)?;
        metadata.count = Some(sections);
        save_metadata(&metadata, &metadata_path)?;

        debug!("📋 Saved metadata to: {}", metadata_path.display());
        Ok(())
    }
}

/// Make a file path relative to a TOML file (used for metadata)
pub fn make_path_relative_to_toml(file_path: &Path, toml_path: &Path) -> Result<String> {
    let relative = toml_path
        .parent()
        .and_then(|toml_dir| file_path.strip_prefix(toml_dir).ok());

    Ok(match relative {
        // Forward slashes for cross-platform compatibility
        Some(rel_path) => rel_path.to_string_lossy().replace('\\', "/"),
        None => file_path.to_string_lossy().to_string(),
    })
}
