// CSV shard reader/writer with header rows and inferred schemas.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::{Shard, ShardStream, SHARD_ROWS};

/// Rows inspected for schema inference.
const INFER_ROWS: usize = 1024;

/// Opens a headered csv file as a shard stream.
pub(crate) fn open(path: &Path) -> Result<ShardStream> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let format = arrow::csv::reader::Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, Some(INFER_ROWS))
        .map_err(|e| Error::from_arrow(path, e))?;
    file.rewind().map_err(|e| Error::io(path, e))?;

    let reader = arrow::csv::ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_batch_size(SHARD_ROWS)
        .build(file)
        .map_err(|e| Error::from_arrow(path, e))?;

    let path = path.to_path_buf();
    Ok(ShardStream::new(reader.map(move |batch| {
        batch
            .map(Shard::new)
            .map_err(|e| Error::from_arrow(&path, e))
    })))
}

/// Writes shards as headered csv into `file`.
pub(crate) fn write_shards<I>(path: &Path, file: File, shards: I) -> Result<u64>
where
    I: Iterator<Item = Result<Shard>>,
{
    let mut writer = arrow::csv::WriterBuilder::new().with_header(true).build(file);
    let mut rows = 0u64;
    for shard in shards {
        let shard = shard?;
        writer
            .write(shard.batch())
            .map_err(|e| Error::from_arrow(path, e))?;
        rows += shard.num_rows() as u64;
    }
    Ok(rows)
}
