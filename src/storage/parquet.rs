// Parquet shard reader/writer; the default working format.

use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::error::{Error, Result};
use crate::storage::{Shard, ShardStream, SHARD_ROWS};

/// Opens a parquet file as a shard stream.
pub(crate) fn open(path: &Path) -> Result<ShardStream> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::from_parquet(path, e))?
        .with_batch_size(SHARD_ROWS)
        .build()
        .map_err(|e| Error::from_parquet(path, e))?;
    let path = path.to_path_buf();
    Ok(ShardStream::new(reader.map(move |batch| {
        batch
            .map(Shard::new)
            .map_err(|e| Error::from_arrow(&path, e))
    })))
}

/// Reads the exact row count from file metadata, without touching row data.
pub(crate) fn row_count(path: &Path) -> Result<u64> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| Error::from_parquet(path, e))?;
    Ok(builder.metadata().file_metadata().num_rows() as u64)
}

/// Writes shards as parquet into `file`.
pub(crate) fn write_shards<I>(path: &Path, file: File, shards: I) -> Result<u64>
where
    I: Iterator<Item = Result<Shard>>,
{
    let mut shards = shards;
    let first = shards
        .next()
        .ok_or_else(|| Error::Invariant("refusing to write an empty shard stream".into()))??;
    let mut writer = ArrowWriter::try_new(file, first.batch().schema(), None)
        .map_err(|e| Error::from_parquet(path, e))?;
    let mut rows = first.num_rows() as u64;
    writer
        .write(first.batch())
        .map_err(|e| Error::from_parquet(path, e))?;
    for shard in shards {
        let shard = shard?;
        writer
            .write(shard.batch())
            .map_err(|e| Error::from_parquet(path, e))?;
        rows += shard.num_rows() as u64;
    }
    writer.close().map_err(|e| Error::from_parquet(path, e))?;
    Ok(rows)
}
