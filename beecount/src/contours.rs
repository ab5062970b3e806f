//! Contour extraction and geometry helpers over binary masks.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use serde::Serialize;

/// Axis-aligned sub-window of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies fully inside a `width`×`height` buffer
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// All border contours of a mask (non-zero pixels are foreground).
///
/// Both outer borders and hole borders are returned; `parent` links form the
/// full hierarchy. The outermost pixel ring is traced as background, so a
/// region touching the image edge still gets an outer border.
pub fn extract_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut framed = mask.clone();
    for x in 0..width {
        framed.put_pixel(x, 0, Luma([0]));
        framed.put_pixel(x, height - 1, Luma([0]));
    }
    for y in 0..height {
        framed.put_pixel(0, y, Luma([0]));
        framed.put_pixel(width - 1, y, Luma([0]));
    }
    find_contours::<i32>(&framed)
}

pub fn is_hole(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Hole
}

/// Polygon area enclosed by the contour points (shoelace formula)
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

/// Smallest rectangle containing every point (inclusive pixel bounds)
pub fn bounding_rect<'a, I>(points: I) -> RegionRect
where
    I: IntoIterator<Item = &'a Point<i32>>,
{
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return RegionRect::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in iter {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    RegionRect::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn test_contour_area_square() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(contour_area(&pts), 100.0);

        let reversed: Vec<_> = pts.into_iter().rev().collect();
        assert_eq!(contour_area(&reversed), 100.0);
    }

    #[test]
    fn test_contour_area_degenerate() {
        assert_eq!(contour_area(&[]), 0.0);
        assert_eq!(contour_area(&[Point::new(1, 1), Point::new(2, 2)]), 0.0);
    }

    #[test]
    fn test_bounding_rect_of_filled_rectangle() {
        let mask = filled_rect(50, 40, 5, 7, 20, 10);
        let contours = extract_contours(&mask);

        assert_eq!(contours.len(), 1);
        assert!(!is_hole(&contours[0]));
        assert_eq!(
            bounding_rect(&contours[0].points),
            RegionRect::new(5, 7, 20, 10)
        );
        // Polygon through border pixel centres
        assert_eq!(contour_area(&contours[0].points), 19.0 * 9.0);
    }

    #[test]
    fn test_hole_is_reported() {
        let mut mask = filled_rect(40, 40, 5, 5, 30, 30);
        for y in 15..25 {
            for x in 15..25 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let contours = extract_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours.iter().filter(|c| is_hole(c)).count(), 1);
    }

    #[test]
    fn test_full_width_band_has_outer_border() {
        // touches the left, right and bottom edges
        let mask = filled_rect(120, 120, 0, 83, 120, 37);
        let contours = extract_contours(&mask);

        assert_eq!(contours.len(), 1);
        assert!(!is_hole(&contours[0]));
        assert_eq!(
            bounding_rect(&contours[0].points),
            RegionRect::new(1, 83, 118, 36)
        );
    }

    #[test]
    fn test_left_edge_region_is_not_a_hole() {
        let mask = filled_rect(60, 40, 0, 10, 20, 15);
        let contours = extract_contours(&mask);

        assert_eq!(contours.len(), 1);
        assert!(!is_hole(&contours[0]));
        assert_eq!(
            bounding_rect(&contours[0].points),
            RegionRect::new(1, 10, 19, 15)
        );
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        assert!(extract_contours(&GrayImage::new(0, 0)).is_empty());
        assert!(extract_contours(&GrayImage::new(5, 5)).is_empty());
    }

    #[test]
    fn test_bounding_rect_empty() {
        let none: Vec<Point<i32>> = Vec::new();
        assert!(bounding_rect(&none).is_empty());
    }

    #[test]
    fn test_region_rect_fits_within() {
        let rect = RegionRect::new(10, 10, 20, 20);
        assert!(rect.fits_within(30, 30));
        assert!(!rect.fits_within(29, 30));
        assert_eq!(rect.area(), 400);
    }
}
