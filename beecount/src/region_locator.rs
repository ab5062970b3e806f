//! Landing-pad marker localisation.
//!
//! Contours of the marker mask are clustered by the top edge of their
//! bounding boxes. A first pass averages the top edges of every
//! reasonably-sized contour (or takes a single large contour outright) and
//! keeps everything within a vertical window of that average. If the
//! resulting box is implausibly large, the marker has probably merged with
//! nearby noise and a stricter second pass is run.

use image::GrayImage;
use imageproc::point::Point;
use log::debug;
use serde::Serialize;

use crate::contours::{bounding_rect, contour_area, extract_contours, RegionRect};

/// Thresholds of the two clustering passes
#[derive(Debug, Clone, Serialize)]
pub struct LocatorParams {
    /// Contours at or below this area never contribute to the average
    pub min_contour_area: f64,
    /// A contour above this area alone defines the first-pass anchor
    pub anchor_area: f64,
    /// Half-width (exclusive) of the first-pass vertical window
    pub window: f64,
    /// First-pass boxes above this area trigger the refinement pass
    pub merged_area: u64,
    /// Second-pass anchor area
    pub refine_anchor_area: f64,
    /// Second-pass window when an anchor contour was found
    pub refine_anchor_window: f64,
    /// Second-pass window when the anchor is an average
    pub refine_window: f64,
    /// Minimum area of contours kept by the second pass
    pub refine_min_area: f64,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            min_contour_area: 20.0,
            anchor_area: 3900.0,
            window: 23.0,
            merged_area: 9000,
            refine_anchor_area: 4000.0,
            refine_anchor_window: 7.0,
            refine_window: 20.0,
            refine_min_area: 63.0,
        }
    }
}

/// Outcome of a localisation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLocation {
    /// Bounding box of the clustered marker contours (may be zero-sized)
    Found(RegionRect),
    /// No contour passed the area thresholds, so no anchor row exists
    NotFound,
}

struct Candidate {
    points: Vec<Point<i32>>,
    rect: RegionRect,
    area: f64,
}

/// Anchor row of a pass: the first contour above `anchor_area` wins outright,
/// otherwise the mean top edge of contours above `min_area` seen before it.
fn anchor_row(candidates: &[Candidate], anchor_area: f64, min_area: f64) -> Option<(f64, bool)> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for candidate in candidates {
        if candidate.area > anchor_area {
            return Some((candidate.rect.y as f64, true));
        }
        if candidate.area > min_area {
            sum += candidate.rect.y as f64;
            count += 1;
        }
    }
    (count > 0).then(|| (sum / count as f64, false))
}

fn cluster_rect<F>(candidates: &[Candidate], avg: f64, window: f64, keep: F) -> RegionRect
where
    F: Fn(&Candidate) -> bool,
{
    bounding_rect(
        candidates
            .iter()
            .filter(|c| {
                let y = c.rect.y as f64;
                y > avg - window && y < avg + window && keep(c)
            })
            .flat_map(|c| c.points.iter()),
    )
}

/// Find the bounding box of the landing-pad marker in a binary mask
pub fn locate_marker(mask: &GrayImage, params: &LocatorParams) -> MarkerLocation {
    let mut candidates: Vec<Candidate> = extract_contours(mask)
        .into_iter()
        .map(|contour| {
            let rect = bounding_rect(&contour.points);
            let area = contour_area(&contour.points);
            Candidate {
                points: contour.points,
                rect,
                area,
            }
        })
        .collect();
    candidates.sort_by_key(|c| c.rect.y);

    let Some((avg, _)) = anchor_row(&candidates, params.anchor_area, params.min_contour_area)
    else {
        debug!("No marker contour above {} px", params.min_contour_area);
        return MarkerLocation::NotFound;
    };

    let rect = cluster_rect(&candidates, avg, params.window, |_| true);
    debug!(
        "Marker pass 1: {} contours, anchor row {avg:.1}, box {rect:?}",
        candidates.len()
    );

    if rect.area() <= params.merged_area {
        return MarkerLocation::Found(rect);
    }

    let Some((avg, anchored)) = anchor_row(
        &candidates,
        params.refine_anchor_area,
        params.min_contour_area,
    ) else {
        return MarkerLocation::NotFound;
    };
    let window = if anchored {
        params.refine_anchor_window
    } else {
        params.refine_window
    };

    let refined = cluster_rect(&candidates, avg, window, |c| c.area > params.refine_min_area);
    debug!("Marker pass 2: anchor row {avg:.1} ±{window}, box {refined:?}");
    MarkerLocation::Found(refined)
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
    fn test_single_large_contour_short_circuits() {
        let mut mask = GrayImage::new(200, 200);
        // polygon area 99 * 50 = 4950
        fill(&mut mask, 20, 50, 100, 51);

        let location = locate_marker(&mask, &LocatorParams::default());
        assert_eq!(
            location,
            MarkerLocation::Found(RegionRect::new(20, 50, 100, 51))
        );
    }

    #[test]
    fn test_full_width_marker_touching_edges_is_found() {
        let mut mask = GrayImage::new(120, 120);
        fill(&mut mask, 0, 83, 120, 37);

        // the outermost pixel ring is traced as background
        assert_eq!(
            locate_marker(&mask, &LocatorParams::default()),
            MarkerLocation::Found(RegionRect::new(1, 83, 118, 36))
        );
    }

    #[test]
    fn test_empty_mask_is_not_found() {
        let mask = GrayImage::new(64, 64);
        assert_eq!(
            locate_marker(&mask, &LocatorParams::default()),
            MarkerLocation::NotFound
        );
    }

    #[test]
    fn test_only_tiny_contours_is_not_found() {
        let mut mask = GrayImage::new(64, 64);
        fill(&mut mask, 10, 10, 3, 3);
        fill(&mut mask, 40, 40, 4, 4);
        assert_eq!(
            locate_marker(&mask, &LocatorParams::default()),
            MarkerLocation::NotFound
        );
    }

    #[test]
    fn test_average_between_clusters_gives_empty_box() {
        let mut mask = GrayImage::new(200, 200);
        // two pad fragments near the top, one blob far below
        fill(&mut mask, 10, 40, 30, 20);
        fill(&mut mask, 60, 45, 30, 20);
        fill(&mut mask, 10, 150, 30, 20);

        // average of 40, 45 and 150 is ~78 and nothing lies within ±23 of it
        let location = locate_marker(&mask, &LocatorParams::default());
        assert_eq!(location, MarkerLocation::Found(RegionRect::default()));
    }

    #[test]
    fn test_fragments_near_average_are_merged() {
        let mut mask = GrayImage::new(200, 200);
        fill(&mut mask, 10, 40, 30, 20);
        fill(&mut mask, 60, 50, 30, 20);

        let location = locate_marker(&mask, &LocatorParams::default());
        assert_eq!(
            location,
            MarkerLocation::Found(RegionRect::new(10, 40, 80, 30))
        );
    }

    #[test]
    fn test_oversized_box_is_refined() {
        let mut mask = GrayImage::new(300, 300);
        // big pad: polygon area 139 * 39 = 5421 > 4000
        fill(&mut mask, 20, 100, 140, 40);
        // noise just below the anchor row, inside the loose window
        fill(&mut mask, 200, 115, 60, 60);

        let params = LocatorParams::default();
        // first pass merges both into a box of 240 x 75 > 9000
        let location = locate_marker(&mask, &params);
        assert_eq!(
            location,
            MarkerLocation::Found(RegionRect::new(20, 100, 140, 40))
        );
    }

    #[test]
    fn test_oversized_box_without_anchor_uses_wide_window() {
        let mut mask = GrayImage::new(300, 300);
        // every contour stays below both anchor areas: 59 * 59 = 3481
        fill(&mut mask, 10, 100, 60, 60);
        fill(&mut mask, 100, 100, 60, 60);
        // 5 * 9 = 45: counts towards the average, too small for the second pass
        fill(&mut mask, 200, 100, 6, 10);
        // top 118 sits 8.4 rows below the average of 109.6
        fill(&mut mask, 170, 118, 20, 20);
        // top 130 sits 20.4 rows below: inside ±23, outside ±20
        fill(&mut mask, 250, 130, 30, 30);

        // first pass keeps everything, a 270 x 60 box
        let location = locate_marker(&mask, &LocatorParams::default());
        assert_eq!(
            location,
            MarkerLocation::Found(RegionRect::new(10, 100, 180, 60))
        );
    }
}
