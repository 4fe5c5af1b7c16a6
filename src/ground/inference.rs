use std::path::Path;

use anyhow::Result;
use tracing::debug;

use super::{Bitmap, ColorLegend, GeometryTable, MapStore, dominant_color};
use crate::error::InferenceError;

/// Reads UPS Ground transit days off downloaded zone maps.
///
/// Holds the calibration tables; build it once and share it.
#[derive(Debug, Clone)]
pub struct GroundTransit {
    geometry: GeometryTable,
    legend: ColorLegend,
}

impl GroundTransit {
    pub fn new(geometry: GeometryTable, legend: ColorLegend) -> Self {
        Self { geometry, legend }
    }

    /// Engine using the calibration tables shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Ok(Self::new(GeometryTable::bundled()?, ColorLegend::bundled()?))
    }

    pub fn geometry(&self) -> &GeometryTable {
        &self.geometry
    }

    pub fn legend(&self) -> &ColorLegend {
        &self.legend
    }

    /// Ground transit days from `origin_zip` to `dest_state`, using the map
    /// indexed for `origin_zip` in `map_dir`.
    ///
    /// Fails with `MapNotFound` when no map was downloaded for the origin;
    /// there is no fallback estimate.
    #[tracing::instrument(skip(self, map_dir), fields(map_dir = %map_dir.display()))]
    pub fn ground_days(
        &self,
        origin_zip: &str,
        dest_state: &str,
        map_dir: &Path,
    ) -> Result<u32, InferenceError> {
        let file_name = MapStore::new(map_dir).lookup(origin_zip)?;
        let map_path = map_dir.join(&file_name);
        debug!(map = %map_path.display(), "Loading Ground map");

        let img = image::open(&map_path)?.to_rgb8();
        self.days_on_map(&img, dest_state)
    }

    /// Transit days to `dest_state` read from an already loaded map.
    pub fn days_on_map<B: Bitmap + ?Sized>(
        &self,
        map: &B,
        dest_state: &str,
    ) -> Result<u32, InferenceError> {
        let region = self.geometry.region_for(dest_state)?;
        let color = dominant_color(map, region)?;
        let days = self.legend.day_count_for(color)?;
        debug!(dest_state, %color, days, "Matched Ground map color");
        Ok(days)
    }
}
