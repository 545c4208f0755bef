//! Vector index abstraction and the exact inner-product backend.
//!
//! Rows are addressed by insertion position, which is also the
//! `frame_index` of the frame the vector was computed from.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::vector::dot;

/// Magic bytes at the start of a serialized flat index.
const FLAT_MAGIC: &[u8; 4] = b"VSFI";
/// Serialized flat index format version.
const FLAT_FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + count
const FLAT_HEADER_LEN: usize = 4 + 4 + 4 + 8;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid index dimension: {0}")]
    InvalidDimension(usize),

    #[error("{0}")]
    Corrupt(String),
}

impl IndexError {
    fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// A scored row returned by a nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub row: usize,
    pub score: f32,
}

/// Result ordering: higher score first, ties by lower row.
pub fn compare_hits(a: &Hit, b: &Hit) -> Ordering {
    b.score.total_cmp(&a.score).then(a.row.cmp(&b.row))
}

/// A searchable collection of fixed-dimension vectors.
pub trait VectorIndex: Send + Sync + fmt::Debug {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors as new rows. Either all vectors are added or none.
    fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()>;

    /// Up to `k` rows with the highest inner product against `query`,
    /// ordered by [`compare_hits`].
    fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Hit>>;

    /// Native serialized form, readable by the owning backend.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Factory for a concrete index kind.
pub trait IndexBackend: Send + Sync {
    /// Backend name recorded alongside persisted indexes.
    fn name(&self) -> &'static str;

    fn create(&self, dimension: usize) -> IndexResult<Box<dyn VectorIndex>>;

    fn from_bytes(&self, bytes: &[u8]) -> IndexResult<Box<dyn VectorIndex>>;
}

/// Exact brute-force inner-product index.
#[derive(Clone, PartialEq)]
pub struct FlatIpIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl fmt::Debug for FlatIpIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatIpIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish()
    }
}

impl FlatIpIndex {
    pub fn new(dimension: usize) -> IndexResult<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidDimension(dimension));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    fn row(&self, row: usize) -> &[f32] {
        let start = row * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Parse the native serialized form.
    ///
    /// Layout (little-endian): `b"VSFI"`, `u32` version, `u32` dimension,
    /// `u64` row count, then `count * dimension` `f32` values.
    pub fn from_bytes(bytes: &[u8]) -> IndexResult<Self> {
        if bytes.len() < FLAT_HEADER_LEN {
            return Err(IndexError::corrupt("index file is truncated"));
        }
        if &bytes[0..4] != FLAT_MAGIC {
            return Err(IndexError::corrupt("index file has an unknown format"));
        }

        let version = read_u32(&bytes[4..8]);
        if version != FLAT_FORMAT_VERSION {
            return Err(IndexError::corrupt(format!(
                "unsupported index format version {}",
                version
            )));
        }

        let dimension = read_u32(&bytes[8..12]) as usize;
        if dimension == 0 {
            return Err(IndexError::corrupt("index dimension is zero"));
        }

        let count = usize::try_from(read_u64(&bytes[12..20]))
            .map_err(|_| IndexError::corrupt("index row count overflows"))?;

        let expected_len = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::corrupt("index size overflows"))?;

        let payload = &bytes[FLAT_HEADER_LEN..];
        if payload.len() != expected_len {
            return Err(IndexError::corrupt(format!(
                "index payload is {} bytes, expected {} for {} rows of dimension {}",
                payload.len(),
                expected_len,
                count,
                dimension
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { dimension, data })
    }
}

impl VectorIndex for FlatIpIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Hit>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Hit> = (0..self.len())
            .map(|row| Hit {
                row,
                score: dot(query, self.row(row)),
            })
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, compare_hits);
            hits.truncate(k);
        }
        hits.sort_by(compare_hits);

        Ok(hits)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FLAT_HEADER_LEN + self.data.len() * 4);
        out.extend_from_slice(FLAT_MAGIC);
        out.extend_from_slice(&FLAT_FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for x in &self.data {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }
}

/// Backend producing [`FlatIpIndex`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIpBackend;

impl IndexBackend for FlatIpBackend {
    fn name(&self) -> &'static str {
        "flat_ip"
    }

    fn create(&self, dimension: usize) -> IndexResult<Box<dyn VectorIndex>> {
        Ok(Box::new(FlatIpIndex::new(dimension)?))
    }

    fn from_bytes(&self, bytes: &[u8]) -> IndexResult<Box<dyn VectorIndex>> {
        Ok(Box::new(FlatIpIndex::from_bytes(bytes)?))
    }
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&b[..8]);
    u64::from_le_bytes(buf)
}
