//! Dominant-color sampling over a map crop.

use std::collections::HashMap;

use image::RgbImage;

use super::{Region, Rgb};
use crate::error::InferenceError;

/// A pixel-addressable RGB bitmap.
pub trait Bitmap {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Pixel at `(x, y)`. Callers stay within `width` x `height`.
    fn pixel(&self, x: u32, y: u32) -> Rgb;
}

impl Bitmap for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> Rgb {
        let [r, g, b] = self.get_pixel(x, y).0;
        Rgb(r, g, b)
    }
}

/// Most frequent color in `region` of `image`, ignoring pure black and pure
/// white (borders, labels and background).
///
/// The crop is scanned column by column. Ties go to the color seen first.
/// Parts of `region` that fall outside the image contribute nothing.
pub fn dominant_color<B: Bitmap + ?Sized>(image: &B, region: Region) -> Result<Rgb, InferenceError> {
    let x_end = region.x.saturating_add(region.width).min(image.width());
    let y_end = region.y.saturating_add(region.height).min(image.height());

    // color -> (count, scan position of first occurrence)
    let mut counts: HashMap<Rgb, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;

    for x in region.x..x_end {
        for y in region.y..y_end {
            let color = image.pixel(x, y);
            if color == Rgb::BLACK || color == Rgb::WHITE {
                continue;
            }
            counts.entry(color).or_insert((0, seen)).0 += 1;
            seen += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(color, _)| color)
        .ok_or(InferenceError::EmptyRegion(region))
}
