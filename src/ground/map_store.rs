//! Index of downloaded Ground maps, persisted as `maps.csv` in the map directory.
//!
//! ```text
//! file_name,zip_code
//! map_10001.gif,10001
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InferenceError;

pub const INDEX_FILE_NAME: &str = "maps.csv";

/// One downloaded map: the image file name (relative to the map directory)
/// and the origin zip it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapIndexEntry {
    pub file_name: String,
    pub zip_code: String,
}

/// The map index of one map directory.
///
/// Rows are never deduplicated. When a zip appears more than once, the most
/// recently appended row wins.
#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
}

impl MapStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    /// Reads the whole index. A missing index is an empty one.
    pub fn entries(&self) -> Result<Vec<MapIndexEntry>, InferenceError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_reader(File::open(&path)?);
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: MapIndexEntry = result?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Map file name for `zip_code`, or `MapNotFound`.
    pub fn lookup(&self, zip_code: &str) -> Result<String, InferenceError> {
        let zip_code = zip_code.trim();
        self.entries()?
            .into_iter()
            .rev()
            .find(|e| e.zip_code.trim() == zip_code)
            .map(|e| e.file_name)
            .ok_or_else(|| InferenceError::MapNotFound(zip_code.to_string()))
    }

    /// Appends one row, writing the header if the index is new.
    pub fn append(&self, zip_code: &str, file_name: &str) -> Result<(), InferenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.index_path();
        let file_exists = path.exists();
        debug!(path = %path.display(), file_exists, zip_code, file_name, "Appending map index row");

        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        writer.serialize(MapIndexEntry {
            file_name: file_name.to_string(),
            zip_code: zip_code.to_string(),
        })?;
        writer.flush()?;
        Ok(())
    }
}
