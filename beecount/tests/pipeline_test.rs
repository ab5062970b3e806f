use beecount::blob_aggregation::estimate_count;
use beecount::config::{CropWindow, PipelineParams};
use beecount::pipeline::{count_bees, PipelineError};
use image::{Rgb, RgbImage};

const PAD: Rgb<u8> = Rgb([20, 180, 30]);
const SURROUND: Rgb<u8> = Rgb([120, 110, 40]);
const BEE: Rgb<u8> = Rgb([70, 45, 55]);

fn fill(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            image.put_pixel(x, y, color);
        }
    }
}

/// 160x120 frame: green pad at (20, 30) sized 120x60 with three 10x10 bees on it
fn hive_frame() -> RgbImage {
    let mut image = RgbImage::from_pixel(160, 120, SURROUND);
    fill(&mut image, 20, 30, 120, 60, PAD);
    fill(&mut image, 40, 50, 10, 10, BEE);
    fill(&mut image, 70, 55, 10, 10, BEE);
    fill(&mut image, 100, 50, 10, 10, BEE);
    image
}

#[test]
fn test_three_bees_on_pad() {
    let output = count_bees(&hive_frame(), &PipelineParams::default()).unwrap();

    // region of interest hugs the pad
    let roi = output.roi;
    assert!(roi.x >= 15 && roi.x < 40, "roi {roi:?}");
    assert!(roi.y >= 25 && roi.y < 50, "roi {roi:?}");
    assert!(roi.x + roi.width <= 150 && roi.y + roi.height <= 100, "roi {roi:?}");

    assert_eq!(output.blob_count, 3);
    assert!(
        output.total_area >= 300.0 && output.total_area <= 600.0,
        "total area {}",
        output.total_area
    );
    assert_eq!(
        output.estimated_count,
        estimate_count(output.total_area, 90.0)
    );

    let region = output.region.expect("pad region");
    assert_eq!(region.annotated.dimensions(), (roi.width, roi.height));
    // bees are outlined in red
    assert!(region.annotated.pixels().any(|p| p.0 == [255, 0, 0]));
}

#[test]
fn test_count_scales_with_bee_area() {
    let frame = hive_frame();
    let default = count_bees(&frame, &PipelineParams::default()).unwrap();

    let params = PipelineParams {
        avg_bee_area: default.total_area / 3.0,
        ..Default::default()
    };
    let calibrated = count_bees(&frame, &params).unwrap();
    assert_eq!(calibrated.estimated_count, 3);
}

#[test]
fn test_counting_is_deterministic() {
    let frame = hive_frame();
    let params = PipelineParams::default();

    let first = count_bees(&frame, &params).unwrap();
    let second = count_bees(&frame, &params).unwrap();
    assert_eq!(first.estimated_count, second.estimated_count);
    assert_eq!(first.total_area, second.total_area);
    assert_eq!(first.roi, second.roi);
}

#[test]
fn test_crop_window_shifts_without_changing_count() {
    let frame = hive_frame();
    let full = count_bees(&frame, &PipelineParams::default()).unwrap();

    let params = PipelineParams {
        crop_window: Some(CropWindow {
            row_start: 10,
            row_end: 120,
            col_start: 5,
            col_end: 160,
        }),
        ..Default::default()
    };
    let cropped = count_bees(&frame, &params).unwrap();

    assert_eq!(cropped.roi.x + 5, full.roi.x);
    assert_eq!(cropped.roi.y + 10, full.roi.y);
    assert_eq!(cropped.blob_count, full.blob_count);
    assert_eq!(cropped.estimated_count, full.estimated_count);
}

#[test]
fn test_frame_without_pad_is_a_failure() {
    let mut frame = RgbImage::from_pixel(160, 120, SURROUND);
    fill(&mut frame, 40, 50, 10, 10, BEE);

    assert_eq!(
        count_bees(&frame, &PipelineParams::default()).unwrap_err(),
        PipelineError::MarkerNotFound
    );
}

#[test]
fn test_dark_frame_is_brightened_before_segmentation() {
    // same scene at a third of the exposure
    let frame = hive_frame();
    let dark = RgbImage::from_fn(160, 120, |x, y| {
        let p = frame.get_pixel(x, y).0;
        Rgb([p[0] / 3, p[1] / 3, p[2] / 3])
    });

    let output = count_bees(&dark, &PipelineParams::default()).unwrap();
    assert!(output.brightness < 40.0);
    assert!(matches!(
        output.adjustment,
        beecount::brightness::BrightnessAdjustment::Brightened { .. }
    ));
}
