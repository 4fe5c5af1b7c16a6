//! Color legend translating Ground map colors to transit days.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::Rgb;
use crate::error::InferenceError;

// Approximate palette; recalibrate against the current map legend (or pass
// `--legend`) before trusting inferred Ground days.
const BUNDLED_LEGEND: &str = include_str!("../../data/ups_ground_legend.json");

/// Day count to representative map color, e.g. `{"1": [115, 77, 38]}`.
///
/// Matching compares only red and green. The blue channel drifts with image
/// compression and carries no meaning on the map.
#[derive(Debug, Clone)]
pub struct ColorLegend {
    entries: Vec<(u32, Rgb)>,
}

impl ColorLegend {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_LEGEND).context("bundled color legend is invalid")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read color legend {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: BTreeMap<u32, Rgb> = serde_json::from_str(content)?;
        Ok(Self::from_entries(entries))
    }

    /// Entries are checked in ascending day order.
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, Rgb)>) -> Self {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by_key(|(day, _)| *day);
        Self { entries }
    }

    /// Day count whose legend color has the same red and green as `color`.
    pub fn day_count_for(&self, color: Rgb) -> Result<u32, InferenceError> {
        self.entries
            .iter()
            .find(|(_, c)| c.red() == color.red() && c.green() == color.green())
            .map(|(day, _)| *day)
            .ok_or(InferenceError::UnmatchedColor(color))
    }

    /// Red and green of the color drawn for `day`.
    pub fn representative_color(&self, day: u32) -> Option<(u8, u8)> {
        self.entries
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, c)| (c.red(), c.green()))
    }
}
