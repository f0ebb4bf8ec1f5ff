// Row-aligned nearest-centroid indices at the narrowest usable width.

use std::sync::Arc;

use arrow::array::{ArrayRef, UInt16Array, UInt32Array, UInt8Array};

/// Unsigned integer width of one assignment value.
///
/// The smallest width covering k is chosen, which halves or quarters the
/// device-to-host transfer relative to a fixed 32-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Narrowest width whose range covers the label space [0, k).
    pub fn for_k(k: usize) -> Self {
        if k < (1 << 8) {
            Self::U8
        } else if k < (1 << 16) {
            Self::U16
        } else {
            Self::U32
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// An assignment vector for one shard: length n, values in [0, k),
/// row-aligned with the shard it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignments {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Assignments {
    /// An empty vector at the right width for `k`, with room for `n` rows.
    pub fn with_capacity(k: usize, n: usize) -> Self {
        match IndexWidth::for_k(k) {
            IndexWidth::U8 => Self::U8(Vec::with_capacity(n)),
            IndexWidth::U16 => Self::U16(Vec::with_capacity(n)),
            IndexWidth::U32 => Self::U32(Vec::with_capacity(n)),
        }
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            Self::U8(_) => IndexWidth::U8,
            Self::U16(_) => IndexWidth::U16,
            Self::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, index: usize) {
        match self {
            Self::U8(v) => v.push(index as u8),
            Self::U16(v) => v.push(index as u16),
            Self::U32(v) => v.push(index as u32),
        }
    }

    pub fn get(&self, i: usize) -> usize {
        match self {
            Self::U8(v) => v[i] as usize,
            Self::U16(v) => v[i] as usize,
            Self::U32(v) => v[i] as usize,
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match self {
            Self::U8(v) => Box::new(v.iter().map(|&x| x as usize)),
            Self::U16(v) => Box::new(v.iter().map(|&x| x as usize)),
            Self::U32(v) => Box::new(v.iter().map(|&x| x as usize)),
        }
    }

    /// The vector as an arrow column for the derived `assignments` shard.
    pub fn to_arrow(&self) -> ArrayRef {
        match self {
            Self::U8(v) => Arc::new(UInt8Array::from(v.clone())) as ArrayRef,
            Self::U16(v) => Arc::new(UInt16Array::from(v.clone())) as ArrayRef,
            Self::U32(v) => Arc::new(UInt32Array::from(v.clone())) as ArrayRef,
        }
    }
}
