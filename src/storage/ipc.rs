// Arrow stream (.arrow) and Arrow IPC file (.arrows) shard readers/writers.

use std::fs::File;
use std::path::Path;

use arrow::ipc::reader::{FileReader, StreamReader};
use arrow::ipc::writer::{FileWriter, StreamWriter};

use crate::error::{Error, Result};
use crate::storage::{Shard, ShardStream};

/// Opens an Arrow stream file as a shard stream.
pub(crate) fn open_stream(path: &Path) -> Result<ShardStream> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = StreamReader::try_new(file, None).map_err(|e| Error::from_arrow(path, e))?;
    let path = path.to_path_buf();
    Ok(ShardStream::new(reader.map(move |batch| {
        batch
            .map(Shard::new)
            .map_err(|e| Error::from_arrow(&path, e))
    })))
}

/// Opens an Arrow IPC file as a shard stream.
pub(crate) fn open_file(path: &Path) -> Result<ShardStream> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = FileReader::try_new(file, None).map_err(|e| Error::from_arrow(path, e))?;
    let path = path.to_path_buf();
    Ok(ShardStream::new(reader.map(move |batch| {
        batch
            .map(Shard::new)
            .map_err(|e| Error::from_arrow(&path, e))
    })))
}

/// Writes shards with Arrow stream framing.
pub(crate) fn write_stream<I>(path: &Path, file: File, shards: I) -> Result<u64>
where
    I: Iterator<Item = Result<Shard>>,
{
    let mut shards = shards;
    let first = shards
        .next()
        .ok_or_else(|| Error::Invariant("refusing to write an empty shard stream".into()))??;
    let mut writer =
        StreamWriter::try_new(file, &first.batch().schema()).map_err(|e| Error::from_arrow(path, e))?;
    let mut rows = first.num_rows() as u64;
    writer
        .write(first.batch())
        .map_err(|e| Error::from_arrow(path, e))?;
    for shard in shards {
        let shard = shard?;
        writer
            .write(shard.batch())
            .map_err(|e| Error::from_arrow(path, e))?;
        rows += shard.num_rows() as u64;
    }
    writer.finish().map_err(|e| Error::from_arrow(path, e))?;
    Ok(rows)
}

/// Writes shards with Arrow IPC file framing.
pub(crate) fn write_file<I>(path: &Path, file: File, shards: I) -> Result<u64>
where
    I: Iterator<Item = Result<Shard>>,
{
    let mut shards = shards;
    let first = shards
        .next()
        .ok_or_else(|| Error::Invariant("refusing to write an empty shard stream".into()))??;
    let mut writer =
        FileWriter::try_new(file, &first.batch().schema()).map_err(|e| Error::from_arrow(path, e))?;
    let mut rows = first.num_rows() as u64;
    writer
        .write(first.batch())
        .map_err(|e| Error::from_arrow(path, e))?;
    for shard in shards {
        let shard = shard?;
        writer
            .write(shard.batch())
            .map_err(|e| Error::from_arrow(path, e))?;
        rows += shard.num_rows() as u64;
    }
    writer.finish().map_err(|e| Error::from_arrow(path, e))?;
    Ok(rows)
}
