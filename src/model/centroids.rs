// The k x d float32 centroid table.

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};
use crate::storage::Shard;

/// A k x d float32 matrix of centroids. Row order defines the cluster label
/// space [0, k).
///
/// The host-side table is immutable; Lloyd iterations replace it wholesale.
/// Rows are distinct when a table leaves seeding, but two clusters may
/// collapse onto the same row during refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidTable {
    data: Array2<f32>,
    columns: Vec<String>,
}

impl CentroidTable {
    /// Builds a table, checking shape and finiteness.
    pub fn new(data: Array2<f32>, columns: Vec<String>) -> Result<Self> {
        if data.ncols() != columns.len() {
            return Err(Error::Shape(format!(
                "centroid table has {} components per row but {} column names",
                data.ncols(),
                columns.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::Shape("centroid table contains non-finite values".into()));
        }
        Ok(Self { data, columns })
    }

    /// Builds a table from owned rows.
    pub fn from_rows(rows: &[Vec<f32>], columns: &[String]) -> Result<Self> {
        let k = rows.len();
        let d = columns.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != d) {
            return Err(Error::Shape(format!(
                "centroid row has {} components, expected {d}",
                bad.len()
            )));
        }
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let data = Array2::from_shape_vec((k, d), flat)
            .map_err(|e| Error::Invariant(e.to_string()))?;
        Self::new(data, columns.to_vec())
    }

    pub fn k(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.data.row(i)
    }

    /// Row-major copy of the table, as uploaded to the device.
    pub fn to_flat(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Owned rows, e.g. for the persistable result.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data
            .rows()
            .into_iter()
            .map(|r| r.iter().copied().collect())
            .collect()
    }

    /// Checks that no two rows are bitwise equal. Required of every freshly
    /// seeded table.
    pub fn ensure_distinct(&self) -> Result<()> {
        let rows: Vec<Vec<u32>> = self
            .data
            .rows()
            .into_iter()
            .map(|r| r.iter().map(|v| v.to_bits()).collect())
            .collect();
        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                if rows[i] == rows[j] {
                    return Err(Error::Invariant(format!(
                        "seed centroids {i} and {j} are identical"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bitwise equality with another table, the stabilization backstop.
    pub fn bitwise_eq(&self, other: &CentroidTable) -> bool {
        self.data.dim() == other.data.dim()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Largest row-wise L2 movement between this table and `other`.
    pub fn max_row_shift(&self, other: &CentroidTable) -> f32 {
        self.data
            .rows()
            .into_iter()
            .zip(other.data.rows())
            .map(|(a, b)| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt()
            })
            .fold(0.0, f32::max)
    }

    /// Largest absolute component, used to scale the stabilization tolerance.
    pub fn max_abs(&self) -> f32 {
        self.data.iter().map(|v| v.abs()).fold(0.0, f32::max)
    }

    /// The table as a single shard, for the centroids artifact.
    pub fn to_shard(&self) -> Result<Shard> {
        Shard::from_feature_rows(&self.columns, &self.to_rows())
    }
}
