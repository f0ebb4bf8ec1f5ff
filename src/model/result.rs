// The persistable outcome of a clustering run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::model::CentroidTable;

/// Final centroid table plus total cost and the run descriptor.
///
/// Assignments are not retained; they are derived from centroids and points
/// on demand. The textual dump round-trips to a structurally equal value,
/// centroid components bit-exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub columns: Vec<String>,
    pub centroids: Vec<Vec<f32>>,
    pub cost: f64,
    pub configuration: Configuration,
}

impl ClusterResult {
    pub fn new(table: &CentroidTable, cost: f64, configuration: Configuration) -> Self {
        Self {
            columns: table.columns().to_vec(),
            centroids: table.to_rows(),
            cost,
            configuration,
        }
    }

    /// Rehydrates the centroid table from the stored rows.
    pub fn table(&self) -> Result<CentroidTable> {
        CentroidTable::from_rows(&self.centroids, &self.columns)
    }

    /// Writes the result as a self-describing json document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Invariant(format!("result serialization failed: {e}")))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }

    /// Reads a result written by [`ClusterResult::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::format(path, e.to_string()))
    }
}
