//! Crop rectangles for each destination state on the UPS Ground map.
//!
//! The rectangles are calibrated against the pixel layout of the printable
//! map image and stored as JSON:
//! ```json
//! {
//!   "AL": [407, 269, 14, 12],
//!   "AZ": [132, 242, 24, 20]
//! }
//! ```
//! Each value is `[x, y, width, height]` with the origin at the top-left.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::InferenceError;

// Approximate boxes for a 640x400 map, not measured against a real UPS map.
// Recalibrate against the current map image (or pass `--regions`) before
// trusting inferred Ground days.
const BUNDLED_REGIONS: &str = include_str!("../../data/ups_ground_regions.json");

/// A pixel rectangle inside a map image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u32; 4]")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<[u32; 4]> for Region {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Region::new(x, y, width, height)
    }
}

/// Read-only map from state code to crop region.
#[derive(Debug, Clone)]
pub struct GeometryTable {
    regions: HashMap<String, Region>,
}

impl GeometryTable {
    /// The calibration shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_REGIONS).context("bundled region table is invalid")
    }

    /// Loads an alternate calibration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read region table {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let regions: HashMap<String, Region> = serde_json::from_str(content)?;
        Ok(Self::from_regions(regions))
    }

    pub fn from_regions(regions: HashMap<String, Region>) -> Self {
        let regions = regions
            .into_iter()
            .map(|(state, region)| (state.to_ascii_uppercase(), region))
            .collect();
        Self { regions }
    }

    /// Returns the crop rectangle for `state` (case-insensitive).
    pub fn region_for(&self, state: &str) -> Result<Region, InferenceError> {
        self.regions
            .get(&state.trim().to_ascii_uppercase())
            .copied()
            .ok_or_else(|| InferenceError::UnknownRegion(state.to_string()))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
