// Lazy shard sequence abstraction over the per-format readers.

use crate::error::Result;
use crate::storage::Shard;

/// A lazy, order-stable sequence of shards read from one file.
///
/// Dropping the stream closes the underlying reader; re-opening the file
/// yields the same logical sequence again.
pub struct ShardStream {
    inner: Box<dyn Iterator<Item = Result<Shard>>>,
}

impl std::fmt::Debug for ShardStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStream").finish_non_exhaustive()
    }
}

impl ShardStream {
    pub(crate) fn new<I>(inner: I) -> Self
    where
        I: Iterator<Item = Result<Shard>> + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Iterator for ShardStream {
    type Item = Result<Shard>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
