//! UPS Ground transit-time inference.
//!
//! UPS does not return a usable transit estimate for Ground, so it is read
//! off the carrier's printable zone map instead: the map downloaded for an
//! origin zip is cropped to the destination state's rectangle, the most
//! common non-black, non-white color in that crop is found, and the color is
//! looked up in a calibrated legend to get the number of days.

pub mod geometry;
pub mod inference;
pub mod legend;
pub mod map_store;
pub mod sampler;

use std::fmt;

use serde::Deserialize;

pub use geometry::{GeometryTable, Region};
pub use inference::GroundTransit;
pub use legend::ColorLegend;
pub use map_store::{MapIndexEntry, MapStore};
pub use sampler::{Bitmap, dominant_color};

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn red(&self) -> u8 {
        self.0
    }

    pub fn green(&self) -> u8 {
        self.1
    }

    pub fn blue(&self) -> u8 {
        self.2
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}
