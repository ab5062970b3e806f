//! Bee-sized blob measurement and count estimation.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::Contour;
use imageproc::drawing::draw_line_segment_mut;
use log::{debug, trace};
use serde::Serialize;

use crate::contours::{contour_area, extract_contours, is_hole};

/// Area filter and drawing options for blob aggregation
#[derive(Debug, Clone, Serialize)]
pub struct BlobParams {
    /// Blobs must be strictly larger than this
    pub min_area: f64,
    /// ... and strictly smaller than this
    pub max_area: f64,
    /// Colour used to outline retained blobs on the diagnostic image
    pub highlight: [u8; 3],
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 20.0,
            max_area: 3000.0,
            highlight: [255, 0, 0],
        }
    }
}

impl BlobParams {
    pub fn accepts(&self, area: f64) -> bool {
        area > self.min_area && area < self.max_area
    }
}

/// Result of aggregating the blobs of one cleaned mask
#[derive(Debug, Clone)]
pub struct BlobSummary {
    pub estimated_count: u64,
    pub total_area: f64,
    pub blob_areas: Vec<f64>,
    pub annotated: RgbImage,
}

/// Convert a summed blob area into a bee count
pub fn estimate_count(total_area: f64, avg_bee_area: f64) -> u64 {
    (total_area / avg_bee_area).round().max(0.0) as u64
}

fn draw_contour(canvas: &mut RgbImage, contour: &Contour<i32>, color: Rgb<u8>) {
    let points = &contour.points;
    if points.len() == 1 {
        let p = points[0];
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
            canvas.put_pixel(p.x as u32, p.y as u32, color);
        }
        return;
    }
    for (i, p1) in points.iter().enumerate() {
        let p2 = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (p1.x as f32, p1.y as f32),
            (p2.x as f32, p2.y as f32),
            color,
        );
    }
}

/// Measure blobs in a grayscale foreground mask and outline the retained ones
/// on a copy of `roi_image`.
///
/// Every border of the two-level hierarchy is a candidate, outer or hole; with
/// a white background the bees show up as hole borders.
pub fn aggregate(
    gray: &GrayImage,
    roi_image: &RgbImage,
    params: &BlobParams,
    avg_bee_area: f64,
) -> BlobSummary {
    let mut annotated = roi_image.clone();
    let color = Rgb(params.highlight);

    let mut blob_areas = Vec::new();
    for contour in extract_contours(gray) {
        let area = contour_area(&contour.points);
        if params.accepts(area) {
            trace!(
                "Blob of {area:.1} px ({} border)",
                if is_hole(&contour) { "hole" } else { "outer" }
            );
            draw_contour(&mut annotated, &contour, color);
            blob_areas.push(area);
        }
    }

    let total_area: f64 = blob_areas.iter().sum();
    let estimated_count = estimate_count(total_area, avg_bee_area);
    debug!(
        "Retained {} blobs, total area {total_area:.1} px -> {estimated_count} bees",
        blob_areas.len()
    );

    BlobSummary {
        estimated_count,
        total_area,
        blob_areas,
        annotated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn test_area_filter_is_exclusive() {
        let params = BlobParams::default();
        assert!(!params.accepts(10.0));
        assert!(!params.accepts(20.0));
        assert!(params.accepts(25.0));
        assert!(params.accepts(2999.0));
        assert!(!params.accepts(3000.0));
        assert!(!params.accepts(3001.0));
    }

    #[test]
    fn test_estimate_count_rounds() {
        assert_eq!(estimate_count(3024.0, 90.0), 34);
        assert_eq!(estimate_count(300.0, 90.0), 3);
        assert_eq!(estimate_count(0.0, 90.0), 0);
        assert_eq!(estimate_count(44.0, 90.0), 0);
        assert_eq!(estimate_count(45.0, 90.0), 1);
    }

    #[test]
    fn test_only_mid_sized_blobs_contribute() {
        // a filled w x h rectangle traces a polygon of area (w - 1) * (h - 1)
        let mut mask = GrayImage::new(400, 200);
        fill(&mut mask, 5, 5, 3, 6); // 2 * 5 = 10
        fill(&mut mask, 20, 5, 6, 6); // 5 * 5 = 25
        fill(&mut mask, 40, 5, 100, 31); // 99 * 30 = 2970
        fill(&mut mask, 150, 5, 101, 31); // 100 * 30 = 3000
        fill(&mut mask, 5, 60, 102, 31); // 101 * 30 = 3030

        let original = RgbImage::new(400, 200);
        let summary = aggregate(&mask, &original, &BlobParams::default(), 90.0);

        assert_eq!(summary.blob_areas.len(), 2);
        assert_eq!(summary.total_area, 25.0 + 2970.0);
        assert_eq!(summary.estimated_count, estimate_count(2995.0, 90.0));
    }

    #[test]
    fn test_retained_blobs_are_outlined() {
        let mut mask = GrayImage::new(50, 50);
        fill(&mut mask, 10, 10, 10, 10);
        let original = RgbImage::new(50, 50);

        let summary = aggregate(&mask, &original, &BlobParams::default(), 90.0);
        assert_eq!(summary.blob_areas, vec![81.0]);
        assert_eq!(summary.annotated.get_pixel(10, 10).0, [255, 0, 0]);
        assert_eq!(summary.annotated.get_pixel(15, 15).0, [0, 0, 0]);
    }

    #[test]
    fn test_white_background_blobs_are_holes() {
        let mut mask = GrayImage::from_pixel(60, 60, Luma([255]));
        for y in 20..30 {
            for x in 20..30 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let original = RgbImage::new(60, 60);
        let summary = aggregate(&mask, &original, &BlobParams::default(), 90.0);

        // outer frame is far above the bound; only the hole counts
        assert_eq!(summary.blob_areas.len(), 1);
        let area = summary.blob_areas[0];
        assert!(area > 100.0 && area < 130.0, "hole area {area}");
    }
}
