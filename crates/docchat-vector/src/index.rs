//! Flat (brute-force) L2 index.
//!
//! Rows are stored contiguously in insertion order; row `i` is the i-th vector
//! ever added. Distances are squared Euclidean, the usual convention for flat
//! L2 indexes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use docchat_core::error::{Error, Result};

const MAGIC: [u8; 4] = *b"DCFL";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    magic: [u8; 4],
    version: u32,
    dim: u64,
    rows: u64,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self { Self { dim, data: Vec::new() } }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { if self.dim == 0 { 0 } else { self.data.len() / self.dim } }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Append vectors in order. The call is all-or-nothing: any vector of the
    /// wrong dimension rejects the whole batch.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// The `min(k, len)` nearest rows, ascending by distance; equal distances
    /// are ordered by row.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| Neighbor { row, distance: squared_l2(query, v) })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        hits.truncate(k);
        Ok(hits)
    }

    pub fn clear(&mut self) { self.data.clear(); }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let payload = IndexFile {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dim: self.dim as u64,
            rows: self.len() as u64,
            data: self.data.clone(),
        };
        bincode::serialize_into(&mut writer, &payload).map_err(|e| Error::Serialization(e.to_string()))?;
        writer.flush().map_err(|e| Error::io(path, e))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let payload: IndexFile = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::CorruptIndex(format!("{}: {}", path.display(), e)))?;
        if payload.magic != MAGIC {
            return Err(Error::CorruptIndex(format!("{}: not a docchat index file", path.display())));
        }
        if payload.version != FORMAT_VERSION {
            return Err(Error::CorruptIndex(format!("{}: unsupported format version {}", path.display(), payload.version)));
        }
        let dim = usize::try_from(payload.dim).map_err(|e| Error::CorruptIndex(e.to_string()))?;
        let rows = usize::try_from(payload.rows).map_err(|e| Error::CorruptIndex(e.to_string()))?;
        let expected = dim
            .checked_mul(rows)
            .ok_or_else(|| Error::CorruptIndex(format!("{}: header size {} x {} overflows", path.display(), rows, dim)))?;
        if dim == 0 || payload.data.len() != expected {
            return Err(Error::CorruptIndex(format!(
                "{}: header says {} rows of dim {}, found {} values",
                path.display(),
                rows,
                dim,
                payload.data.len()
            )));
        }
        Ok(Self { dim, data: payload.data })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
