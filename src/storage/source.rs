// A points file bound to its format and resolved feature columns.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::{parquet, FeatureBlock, ShardStream, StorageFormat};

/// Boxed lazy sequence of feature blocks.
pub type BlockStream = Box<dyn Iterator<Item = Result<FeatureBlock>>>;

/// A dataset handle: path, format, selected feature columns and a cached
/// exact row count. Every pass opens a fresh stream from it.
#[derive(Debug)]
pub struct DataSource {
    path: PathBuf,
    format: StorageFormat,
    columns: Vec<String>,
    row_count: Cell<Option<u64>>,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>, format: StorageFormat) -> Self {
        Self {
            path: path.into(),
            format,
            columns: Vec::new(),
            row_count: Cell::new(None),
        }
    }

    /// Opens `path`, inferring the format from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = StorageFormat::from_extension(&path)?;
        Ok(Self::new(path, format))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Selected feature columns, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Feature dimensionality d.
    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    /// Fixes the feature columns for this source.
    ///
    /// An empty request selects every non-reserved column of the first shard
    /// in file order; a non-empty request is validated against that shard.
    pub fn resolve_columns(&mut self, requested: &[String]) -> Result<()> {
        let first = self
            .shards()?
            .next()
            .ok_or_else(|| Error::format(&self.path, "file contains no rows"))??;
        if requested.is_empty() {
            self.columns = first.feature_column_names();
            if self.columns.is_empty() {
                return Err(Error::Shape(format!(
                    "{}: no feature columns outside the reserved set",
                    self.path.display()
                )));
            }
        } else {
            let present = first.column_names();
            if let Some(missing) = requested.iter().find(|c| !present.contains(c)) {
                return Err(Error::Shape(format!(
                    "requested column {missing:?} not present in {}",
                    self.path.display()
                )));
            }
            self.columns = requested.to_vec();
        }
        Ok(())
    }

    /// Opens the shard stream. Restartable; shard order is stable.
    pub fn shards(&self) -> Result<ShardStream> {
        self.format.open(&self.path)
    }

    /// Opens the stream of feature blocks over the selected columns.
    pub fn blocks(&self) -> Result<BlockStream> {
        let columns = self.columns.clone();
        let stream = self.shards()?;
        Ok(Box::new(stream.map(move |shard| {
            shard.and_then(|s| s.features(&columns))
        })))
    }

    /// Exact dataset row count, computed once and cached.
    ///
    /// Parquet answers from file metadata; other formats pay one counting
    /// pass.
    pub fn row_count(&self) -> Result<u64> {
        if let Some(n) = self.row_count.get() {
            return Ok(n);
        }
        let n = match self.format {
            StorageFormat::Parquet => parquet::row_count(&self.path)?,
            _ => {
                let mut total = 0u64;
                for shard in self.shards()? {
                    total += shard?.num_rows() as u64;
                }
                total
            }
        };
        self.row_count.set(Some(n));
        Ok(n)
    }
}
