use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use docchat_core::error::{Error, Result};
use docchat_core::types::ChunkMeta;

/// Chunk texts and their metadata as two parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStore {
    chunks: Vec<String>,
    metadata: Vec<ChunkMeta>,
}

impl ChunkStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn push(&mut self, chunk: String, meta: ChunkMeta) {
        self.chunks.push(chunk);
        self.metadata.push(meta);
    }

    pub fn get(&self, row: usize) -> Option<(&str, &ChunkMeta)> {
        Some((self.chunks.get(row)?.as_str(), self.metadata.get(row)?))
    }

    pub fn chunks(&self) -> &[String] { &self.chunks }

    pub fn metadata(&self) -> &[ChunkMeta] { &self.metadata }

    /// Distinct source names, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.metadata.iter().map(|m| m.source.clone()).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.metadata.clear();
    }

    /// Write `{"chunks": [...], "metadata": [...]}` as JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| Error::Serialization(e.to_string()))?;
        writer.flush().map_err(|e| Error::io(path, e))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let store: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::CorruptIndex(format!("{}: {}", path.display(), e)))?;
        if store.chunks.len() != store.metadata.len() {
            return Err(Error::CorruptIndex(format!(
                "{}: {} chunks but {} metadata entries",
                path.display(),
                store.chunks.len(),
                store.metadata.len()
            )));
        }
        Ok(store)
    }
}
