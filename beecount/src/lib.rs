pub mod background_removal;
pub mod batch_processing;
pub mod blob_aggregation;
pub mod brightness;
pub mod color_segmentation;
pub mod color_utils;
pub mod config;
pub mod contours;
pub mod image_input;
pub mod morphology;
pub mod output_manager;
pub mod pipeline;
pub mod progress;
pub mod region_locator;
pub mod shared_metadata;
