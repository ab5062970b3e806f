//! Image source/sink: enumerate inputs in a stable order, decode frames and
//! encode diagnostic buffers.

use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Pixel, RgbImage};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color_utils::symbols;

/// How forgiving source collection is about missing or unsupported inputs
#[derive(Debug, Clone)]
pub struct ImageInputConfig {
    pub strict_mode: bool,
}

impl ImageInputConfig {
    pub fn from_strict_flag(strict: bool) -> Self {
        Self {
            strict_mode: strict,
        }
    }
}

/// A decoded input frame together with the file name it came from
#[derive(Debug, Clone)]
pub struct NamedImage {
    pub name: String,
    pub path: PathBuf,
    pub image: RgbImage,
}

/// Check if a file is a supported raster format
pub fn is_supported_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "bmp" | "tiff" | "tif" | "webp"
            )
        })
        .unwrap_or(false)
}

/// Image files directly inside `dir_path`, in lexicographic name order
pub fn find_images_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read input directory {}", dir_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_supported_image_file(&path) {
            image_files.push(path);
        }
    }

    image_files.sort();
    Ok(image_files)
}

fn is_glob_pattern(source: &str) -> bool {
    source.contains('*') || source.contains('?') || source.contains('[')
}

/// Collect image files from files, directories and glob patterns.
///
/// Each source contributes its images in name order; sources keep the order
/// they were given in and duplicates are dropped.
pub fn collect_images_from_sources(
    sources: &[String],
    config: &ImageInputConfig,
) -> Result<Vec<PathBuf>> {
    let mut all_image_files: Vec<PathBuf> = Vec::new();

    for source in sources {
        let source_path = Path::new(source);

        let found = if source_path.is_file() {
            if is_supported_image_file(source_path) {
                vec![source_path.to_path_buf()]
            } else if config.strict_mode {
                return Err(anyhow!(
                    "File is not a supported image format: {}",
                    source_path.display()
                ));
            } else {
                warn!(
                    "{}Skipping unsupported file: {}",
                    symbols::warning(),
                    source_path.display()
                );
                Vec::new()
            }
        } else if source_path.is_dir() {
            // An unreadable directory always aborts the run
            find_images_in_directory(source_path)?
        } else if is_glob_pattern(source) {
            let paths = glob::glob(source)
                .with_context(|| format!("Invalid glob pattern: {source}"))?;
            let mut matched: Vec<PathBuf> = paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("{}Error reading path in glob {source}: {e}", symbols::warning());
                        None
                    }
                })
                .filter(|path| path.is_file() && is_supported_image_file(path))
                .collect();
            matched.sort();
            if matched.is_empty() && config.strict_mode {
                return Err(anyhow!("No image files found matching pattern: {source}"));
            }
            matched
        } else if config.strict_mode {
            return Err(anyhow!("Source path does not exist: {source}"));
        } else {
            warn!("{}Source path does not exist: {source}", symbols::warning());
            Vec::new()
        };

        for path in found {
            if !all_image_files.contains(&path) {
                all_image_files.push(path);
            }
        }
    }

    if all_image_files.is_empty() && config.strict_mode {
        return Err(anyhow!("No image files found in the specified sources"));
    }

    Ok(all_image_files)
}

/// Decode one frame to an owned RGB buffer
pub fn load_image(path: &Path) -> Result<NamedImage> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Input path has no file name: {}", path.display()))?;
    let image = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?
        .to_rgb8();

    Ok(NamedImage {
        name,
        path: path.to_path_buf(),
        image,
    })
}

/// A listed input frame. The name is known up front, the pixels are decoded
/// on demand so one unreadable file only fails its own entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub name: String,
    pub path: PathBuf,
}

impl ImageSource {
    pub fn load(&self) -> Result<NamedImage> {
        load_image(&self.path)
    }
}

/// Every image under `sources`, in collection order
pub fn list_images(sources: &[String], config: &ImageInputConfig) -> Result<Vec<ImageSource>> {
    let images = collect_images_from_sources(sources, config)?
        .into_iter()
        .map(|path| ImageSource {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            path,
        })
        .collect();
    Ok(images)
}

/// Encode a buffer, creating parent directories as needed. The format
/// follows the file extension.
pub fn write_image<P>(path: &Path, buffer: &ImageBuffer<P, Vec<P::Subpixel>>) -> Result<()>
where
    P: Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    buffer
        .save(path)
        .with_context(|| format!("Failed to write image {}", path.display()))
}
