//! The index and the chunk store as one logical table.
//!
//! Row `i` of the index is chunk `i` of the store. Every mutation keeps
//! `chunks == metadata == index rows`, and the pair is saved and loaded
//! together.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use docchat_core::error::{Error, Result};
use docchat_core::types::{ChunkMeta, Retrieved};

use crate::index::FlatL2Index;
use crate::store::ChunkStore;

/// `(<stem>.index, <stem>.meta)`. The suffix is appended rather than
/// substituted so stems containing dots keep their full name.
pub fn artifact_paths(stem: &Path) -> (PathBuf, PathBuf) {
    let with_suffix = |suffix: &str| {
        let mut s: OsString = stem.as_os_str().to_owned();
        s.push(suffix);
        PathBuf::from(s)
    };
    (with_suffix(".index"), with_suffix(".meta"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    index: FlatL2Index,
    store: ChunkStore,
}

impl VectorStore {
    pub fn new(dim: usize) -> Self { Self { index: FlatL2Index::new(dim), store: ChunkStore::new() } }

    pub fn dim(&self) -> usize { self.index.dim() }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn chunks(&self) -> &ChunkStore { &self.store }

    pub fn index(&self) -> &FlatL2Index { &self.index }

    pub fn sources(&self) -> Vec<String> { self.store.sources() }

    /// Append chunks with their vectors. Nothing is appended if the counts
    /// disagree or any vector has the wrong dimension.
    pub fn append(&mut self, entries: Vec<(String, ChunkMeta)>, vectors: &[Vec<f32>]) -> Result<()> {
        if entries.len() != vectors.len() {
            return Err(Error::LengthMismatch { chunks: entries.len(), vectors: vectors.len() });
        }
        self.index.add(vectors)?;
        for (chunk, meta) in entries {
            self.store.push(chunk, meta);
        }
        debug!(rows = self.len(), "vector store appended");
        Ok(())
    }

    /// The `min(k, len)` nearest chunks, ascending by distance.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Retrieved>> {
        let hits = self.index.search(query, k.min(self.len()))?;
        hits.into_iter()
            .map(|hit| {
                let (text, meta) = self
                    .store
                    .get(hit.row)
                    .ok_or_else(|| Error::CorruptIndex(format!("index row {} has no chunk", hit.row)))?;
                Ok(Retrieved { text: text.to_string(), meta: meta.clone(), distance: hit.distance })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.store.clear();
    }

    pub fn exists(stem: &Path) -> bool { artifact_paths(stem).0.is_file() }

    /// Write both artifacts, creating the parent directory if needed.
    ///
    /// Each artifact is written to a temporary file in the target directory
    /// and only renamed into place once both writes succeeded, so a failed
    /// save leaves the previous pair intact.
    pub fn save(&self, stem: &Path) -> Result<()> {
        let (index_path, meta_path) = artifact_paths(stem);
        let dir = stem.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let index_tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        self.index.write_to(index_tmp.path())?;
        let meta_tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        self.store.write_to(meta_tmp.path())?;

        index_tmp.persist(&index_path).map_err(|e| Error::io(&index_path, e.error))?;
        meta_tmp.persist(&meta_path).map_err(|e| Error::io(&meta_path, e.error))?;
        info!("Index saved to {} ({} chunks)", stem.display(), self.len());
        Ok(())
    }

    /// Read both artifacts and check they describe the same rows and match
    /// `expected_dim`.
    pub fn load(stem: &Path, expected_dim: usize) -> Result<Self> {
        let (index_path, meta_path) = artifact_paths(stem);
        let index = FlatL2Index::read_from(&index_path)?;
        let store = ChunkStore::read_from(&meta_path)?;
        if index.dim() != expected_dim {
            return Err(Error::DimensionMismatch { expected: expected_dim, actual: index.dim() });
        }
        if index.len() != store.len() {
            return Err(Error::CorruptIndex(format!(
                "{} has {} rows but {} has {} chunks",
                index_path.display(),
                index.len(),
                meta_path.display(),
                store.len()
            )));
        }
        info!("Index loaded from {} ({} chunks)", stem.display(), store.len());
        Ok(Self { index, store })
    }

    /// Delete whichever artifacts exist for `stem`.
    pub fn remove(stem: &Path) -> Result<()> {
        let (index_path, meta_path) = artifact_paths(stem);
        for path in [index_path, meta_path] {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(path, e)),
            }
        }
        Ok(())
    }
}
