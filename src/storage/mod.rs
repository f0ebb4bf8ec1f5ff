// Package storage provides the columnar shard streams the pipeline runs over.
//
// A points file is consumed as a lazy sequence of shards; every pass re-opens
// the file and sees the same shard order. Four formats are addressable by
// file extension: .parquet, .arrow (Arrow stream), .arrows (Arrow IPC file)
// and .csv.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod csv;
pub mod ipc;
pub mod parquet;
pub mod shard;
pub mod source;
pub mod stream;


pub use shard::{FeatureBlock, Shard};
pub use source::DataSource;
pub use stream::ShardStream;

/// Rows per shard on every read path.
pub const SHARD_ROWS: usize = 16384;

/// Storage formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    Parquet,
    /// Arrow stream framing (`.arrow`).
    Arrow,
    /// Arrow IPC file framing (`.arrows`).
    #[serde(rename = "arrows")]
    ArrowIpc,
    Csv,
}

impl StorageFormat {
    /// Derives the format from a path's extension.
    pub fn from_extension(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::format(path, "missing file extension"))?;
        Self::from_key(ext).map_err(|_| Error::format(path, format!("unrecognized extension {ext:?}")))
    }

    /// Parses a format key as used on the command line.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "parquet" => Ok(Self::Parquet),
            "arrow" => Ok(Self::Arrow),
            "arrows" => Ok(Self::ArrowIpc),
            "csv" => Ok(Self::Csv),
            other => Err(Error::Config(format!("unknown storage format {other:?}"))),
        }
    }

    /// The file extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Arrow => "arrow",
            Self::ArrowIpc => "arrows",
            Self::Csv => "csv",
        }
    }

    /// Opens `path` as a lazy shard sequence.
    ///
    /// Restartable: calling open again yields the same logical sequence.
    pub fn open(self, path: &Path) -> Result<ShardStream> {
        match self {
            Self::Parquet => parquet::open(path),
            Self::Arrow => ipc::open_stream(path),
            Self::ArrowIpc => ipc::open_file(path),
            Self::Csv => csv::open(path),
        }
    }

    /// Writes a shard sequence to `path`, preserving order.
    ///
    /// The write is atomic at the file level: shards land in a temp file next
    /// to the target, which is renamed into place once the writer closes.
    pub fn write<I>(self, path: &Path, shards: I) -> Result<u64>
    where
        I: Iterator<Item = Result<Shard>>,
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".oocmeans-")
            .tempfile_in(parent)
            .map_err(|e| Error::io(path, e))?;
        let file = tmp.as_file().try_clone().map_err(|e| Error::io(path, e))?;

        let rows = match self {
            Self::Parquet => parquet::write_shards(path, file, shards)?,
            Self::Arrow => ipc::write_stream(path, file, shards)?,
            Self::ArrowIpc => ipc::write_file(path, file, shards)?,
            Self::Csv => csv::write_shards(path, file, shards)?,
        };

        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(rows)
    }
}

/// Opens a file as a lazy shard sequence, inferring the format.
pub fn open(path: &Path) -> Result<ShardStream> {
    StorageFormat::from_extension(path)?.open(path)
}

/// Writes a shard sequence to `path`, inferring the format.
pub fn write<I>(path: &Path, shards: I) -> Result<u64>
where
    I: Iterator<Item = Result<Shard>>,
{
    StorageFormat::from_extension(path)?.write(path, shards)
}

/// Converts a file from one format to another, keyed by the two extensions.
///
/// Matching extensions make this a plain copy (a no-op when source and
/// destination are the same path).
pub fn convert(src: &Path, dst: &Path) -> Result<()> {
    let from = StorageFormat::from_extension(src)?;
    let to = StorageFormat::from_extension(dst)?;
    if from == to {
        if src != dst {
            File::open(src).map_err(|e| Error::io(src, e))?;
            std::fs::copy(src, dst).map_err(|e| Error::io(dst, e))?;
        }
        return Ok(());
    }
    to.write(dst, from.open(src)?)?;
    Ok(())
}
