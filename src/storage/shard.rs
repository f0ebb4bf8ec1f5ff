// Shard and feature-block types shared by every pass.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::config::is_reserved_column;
use crate::error::{Error, Result};

/// A row-aligned block of points from one physical file chunk.
///
/// Shards are immutable; transformations produce new shards with the same
/// row order.
#[derive(Debug, Clone)]
pub struct Shard {
    batch: RecordBatch,
}

impl Shard {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// All column names in file order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Column names usable as features, in file order.
    pub fn feature_column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .filter(|n| !is_reserved_column(n))
            .collect()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.batch
            .schema()
            .index_of(name)
            .map_err(|_| Error::Shape(format!("column {name:?} not present in shard")))
    }

    /// Columnar select: restricts the shard to `columns`, in the requested
    /// order. Used to tolerate column reordering between files.
    pub fn select(&self, columns: &[String]) -> Result<Shard> {
        let indices = columns
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        let batch = self
            .batch
            .project(&indices)
            .map_err(|e| Error::Shape(e.to_string()))?;
        Ok(Shard::new(batch))
    }

    /// Extracts the selected columns as a row-major float32 matrix.
    ///
    /// Integer columns are widened to float32; non-numeric or nullable data
    /// is a shape error.
    pub fn features(&self, columns: &[String]) -> Result<FeatureBlock> {
        let n = self.num_rows();
        let d = columns.len();
        let mut data = vec![0f32; n * d];
        for (j, name) in columns.iter().enumerate() {
            let col = self.batch.column(self.column_index(name)?);
            if col.null_count() > 0 {
                return Err(Error::Shape(format!("column {name:?} contains nulls")));
            }
            let cast = compute::cast(col, &DataType::Float32)
                .map_err(|e| Error::Shape(format!("column {name:?} is not numeric: {e}")))?;
            let values = cast
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| Error::Invariant("cast to float32 produced a foreign array".into()))?;
            for i in 0..n {
                data[i * d + j] = values.value(i);
            }
        }
        FeatureBlock::new(n, d, data)
    }

    /// Builds a shard from row-major float32 rows under the given column
    /// names. Used for materialized row sequences and derived artifacts.
    pub fn from_feature_rows(columns: &[String], rows: &[Vec<f32>]) -> Result<Shard> {
        let d = columns.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != d) {
            return Err(Error::Shape(format!(
                "row has {} components, expected {d}",
                bad.len()
            )));
        }
        let fields: Vec<Field> = columns
            .iter()
            .map(|name| Field::new(name, DataType::Float32, false))
            .collect();
        let arrays: Vec<ArrayRef> = (0..d)
            .map(|j| {
                let col = Float32Array::from_iter_values(rows.iter().map(|r| r[j]));
                Arc::new(col) as ArrayRef
            })
            .collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| Error::Invariant(e.to_string()))?;
        Ok(Shard::new(batch))
    }

    /// Builds a single-column float32 shard, e.g. the q(x) auxiliary stream.
    pub fn single_column_f32(name: &str, values: Vec<f32>) -> Result<Shard> {
        let field = Field::new(name, DataType::Float32, false);
        let array = Arc::new(Float32Array::from(values)) as ArrayRef;
        let batch = RecordBatch::try_new(Arc::new(Schema::new(vec![field])), vec![array])
            .map_err(|e| Error::Invariant(e.to_string()))?;
        Ok(Shard::new(batch))
    }

    /// Returns a new shard with `array` appended as column `name`.
    ///
    /// Row order is preserved; the array must be row-aligned with the shard.
    pub fn with_column(&self, name: &str, array: ArrayRef) -> Result<Shard> {
        if array.len() != self.num_rows() {
            return Err(Error::Shape(format!(
                "appended column {name:?} has {} rows, shard has {}",
                array.len(),
                self.num_rows()
            )));
        }
        let mut fields: Vec<Field> = self
            .batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields.push(Field::new(name, array.data_type().clone(), false));
        let mut columns = self.batch.columns().to_vec();
        columns.push(array);
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
            .map_err(|e| Error::Invariant(e.to_string()))?;
        Ok(Shard::new(batch))
    }
}

/// A shard's feature matrix: `rows` x `dim` float32, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl FeatureBlock {
    pub fn new(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * dim {
            return Err(Error::Invariant(format!(
                "feature block of {rows}x{dim} backed by {} values",
                data.len()
            )));
        }
        Ok(Self { rows, dim, data })
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(Error::Shape(format!(
                "row has {} components, expected {dim}",
                bad.len()
            )));
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(rows.len(), dim, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim.max(1))
    }
}
