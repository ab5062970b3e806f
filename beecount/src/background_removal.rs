use image::{Rgb, RgbImage};
use serde::Serialize;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Per-pixel classification rules for the cropped landing pad
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundParams {
    /// Rows `0..=border_top` are background
    pub border_top: u32,
    /// Columns `0..=border_left` are background
    pub border_left: u32,
    /// The last `border_bottom` rows are background
    pub border_bottom: u32,
    /// The last `border_right` columns are background
    pub border_right: u32,
    /// Green and red closer than this (with weak blue) read as pad colour
    pub max_green_red_gap: u8,
    /// All channels at or above this are treated as glare/white pad
    pub near_white: u8,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            border_top: 3,
            border_left: 3,
            border_bottom: 7,
            border_right: 2,
            max_green_red_gap: 20,
            near_white: 230,
        }
    }
}

impl BackgroundParams {
    fn on_border(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        y <= self.border_top
            || x <= self.border_left
            || y as i64 >= height as i64 - self.border_bottom as i64
            || x as i64 >= width as i64 - self.border_right as i64
    }

    fn is_pad_colored(&self, [r, g, b]: [u8; 3]) -> bool {
        let (r, g, b) = (r as u32, g as u32, b as u32);
        (b < g && r < g)
            || (2 * b <= g && 2 * b <= r && g.abs_diff(r) < self.max_green_red_gap as u32)
    }

    fn is_near_white(&self, [r, g, b]: [u8; 3]) -> bool {
        r >= self.near_white && g >= self.near_white && b >= self.near_white
    }

    /// Whether the pixel at `(x, y)` is background, in rule precedence order
    pub fn is_background(&self, pixel: [u8; 3], x: u32, y: u32, width: u32, height: u32) -> bool {
        self.on_border(x, y, width, height) || self.is_pad_colored(pixel) || self.is_near_white(pixel)
    }
}

/// Classify every pixel of the cropped pad: background becomes white, bee
/// coloured foreground becomes black.
pub fn remove_background(cropped: &RgbImage, params: &BackgroundParams) -> RgbImage {
    let (width, height) = cropped.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if params.is_background(cropped.get_pixel(x, y).0, x, y, width, height) {
            BACKGROUND
        } else {
            FOREGROUND
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEE: Rgb<u8> = Rgb([70, 45, 55]);

    #[test]
    fn test_origin_is_always_background() {
        let img = RgbImage::from_pixel(30, 30, BEE);
        let out = remove_background(&img, &BackgroundParams::default());
        assert_eq!(*out.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_border_margins() {
        let img = RgbImage::from_pixel(30, 40, BEE);
        let out = remove_background(&img, &BackgroundParams::default());

        assert_eq!(*out.get_pixel(15, 3), BACKGROUND);
        assert_eq!(*out.get_pixel(15, 4), FOREGROUND);
        assert_eq!(*out.get_pixel(3, 20), BACKGROUND);
        assert_eq!(*out.get_pixel(4, 20), FOREGROUND);
        // bottom: rows >= 40 - 7
        assert_eq!(*out.get_pixel(15, 32), FOREGROUND);
        assert_eq!(*out.get_pixel(15, 33), BACKGROUND);
        // right: columns >= 30 - 2
        assert_eq!(*out.get_pixel(27, 20), FOREGROUND);
        assert_eq!(*out.get_pixel(28, 20), BACKGROUND);
    }

    #[test]
    fn test_green_pad_is_background() {
        let params = BackgroundParams::default();
        assert!(params.is_pad_colored([40, 160, 30]));
        // weak blue with matching red/green (yellowish pad shading)
        assert!(params.is_pad_colored([120, 110, 40]));
        assert!(!params.is_pad_colored([160, 100, 40]));
    }

    #[test]
    fn test_near_white_is_background() {
        let params = BackgroundParams::default();
        assert!(params.is_near_white([230, 240, 250]));
        assert!(!params.is_near_white([229, 240, 250]));
    }

    #[test]
    fn test_bee_colored_interior_is_foreground() {
        let params = BackgroundParams::default();
        assert!(!params.is_background(BEE.0, 10, 10, 30, 30));
        assert!(!params.is_background([200, 200, 210], 10, 10, 30, 30));
    }

    #[test]
    fn test_output_is_strictly_binary() {
        let img = RgbImage::from_fn(25, 25, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 128]));
        let out = remove_background(&img, &BackgroundParams::default());
        assert!(out.pixels().all(|p| *p == BACKGROUND || *p == FOREGROUND));
    }
}
