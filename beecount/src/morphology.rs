//! Binary/grayscale morphology with small anchored structuring elements.
//!
//! Elements are rasterised the same way common vision toolkits do it, with the
//! anchor at `(size / 2, size / 2)`. For a 2×2 element that puts the anchor in
//! the bottom-right cell, so erosion grows dark regions towards the
//! bottom-right and dilation grows bright regions the same way.

use image::{GrayImage, Luma, RgbImage};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use serde::Serialize;

/// Shape of a structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructuringElement {
    Rect,
    Cross,
    Ellipse,
}

impl StructuringElement {
    /// Cells of a `size`×`size` element as a row-major 0/1 grid
    pub fn cells(self, size: u8) -> Vec<Vec<bool>> {
        let n = size.max(1) as i32;
        let anchor = n / 2;
        let shape = if n == 1 { StructuringElement::Rect } else { self };

        let r = n / 2;
        let c = n / 2;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        (0..n)
            .map(|i| {
                let (j1, j2) = match shape {
                    StructuringElement::Rect => (0, n),
                    StructuringElement::Cross if i == anchor => (0, n),
                    StructuringElement::Cross => (anchor, anchor + 1),
                    StructuringElement::Ellipse => {
                        let dy = i - r;
                        if dy.abs() <= r {
                            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt())
                                .round() as i32;
                            ((c - dx).max(0), (c + dx + 1).min(n))
                        } else {
                            (0, 0)
                        }
                    }
                };
                (0..n).map(|j| j >= j1 && j < j2).collect()
            })
            .collect()
    }

    /// Build the imageproc mask for a `size`×`size` element
    pub fn mask(self, size: u8) -> Mask {
        let cells = self.cells(size);
        let n = cells.len() as u32;
        let grid = GrayImage::from_fn(n, n, |x, y| {
            if cells[y as usize][x as usize] {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let anchor = (n / 2) as u8;
        Mask::from_image(&grid, anchor, anchor)
    }
}

/// Minimum over the element; pixels outside the image are ignored
pub fn erode(image: &GrayImage, element: &Mask) -> GrayImage {
    grayscale_erode(image, element)
}

/// Maximum over the element; pixels outside the image are ignored
pub fn dilate(image: &GrayImage, element: &Mask) -> GrayImage {
    grayscale_dilate(image, element)
}

/// Apply a grayscale operation to every channel of an RGB image
fn per_channel<F>(image: &RgbImage, op: F) -> RgbImage
where
    F: Fn(&GrayImage) -> GrayImage,
{
    let (width, height) = image.dimensions();
    let channels: Vec<GrayImage> = (0..3)
        .map(|c| {
            let plane = GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[c]]));
            op(&plane)
        })
        .collect();

    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            channels[0].get_pixel(x, y)[0],
            channels[1].get_pixel(x, y)[0],
            channels[2].get_pixel(x, y)[0],
        ])
    })
}

/// Parameters of the foreground denoising pass
#[derive(Debug, Clone, Serialize)]
pub struct CleanerParams {
    pub element: StructuringElement,
    pub element_size: u8,
    /// Dilations run first; they close small background holes
    pub dilations: u32,
    /// Erosions run second; they strip remaining specks
    pub erosions: u32,
}

impl Default for CleanerParams {
    fn default() -> Self {
        Self {
            element: StructuringElement::Ellipse,
            element_size: 2,
            dilations: 3,
            erosions: 5,
        }
    }
}

/// Denoise a white-background / black-foreground image
pub fn clean(foreground: &RgbImage, params: &CleanerParams) -> RgbImage {
    let element = params.element.mask(params.element_size);
    per_channel(foreground, |plane| {
        let mut out = plane.clone();
        for _ in 0..params.dilations {
            out = dilate(&out, &element);
        }
        for _ in 0..params.erosions {
            out = erode(&out, &element);
        }
        out
    })
}
