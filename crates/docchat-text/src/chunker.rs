//! Text chunking.
//!
//! `chunk_by_tokens` slides a window of `chunk_size` tokens forward by
//! `chunk_size - overlap` and stops at the first window that reaches the end
//! of the token stream. `chunk_by_sentences` packs whole sentences greedily
//! into chunks no larger than the token budget.

use std::ops::Range;

use tiktoken_rs::{CoreBPE, Rank};
use tracing::debug;

use docchat_core::config::{ChunkStrategy, ChunkingSettings};
use docchat_core::error::{Error, Result};

pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    strategy: ChunkStrategy,
    bpe: CoreBPE,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be greater than zero".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")));
        }
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { chunk_size, overlap, strategy: ChunkStrategy::Tokens, bpe })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Ok(Self::new(settings.chunk_size, settings.chunk_overlap)?.with_strategy(settings.strategy))
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn overlap(&self) -> usize { self.overlap }
    pub fn strategy(&self) -> ChunkStrategy { self.strategy }

    pub fn encode(&self, text: &str) -> Vec<Rank> { self.bpe.encode_ordinary(text) }

    pub fn count_tokens(&self, text: &str) -> usize { self.encode(text).len() }

    /// Decode a token slice; bytes split across a window edge become U+FFFD.
    pub fn decode(&self, tokens: &[Rank]) -> String {
        let bytes: Vec<u8> = self.bpe._decode_native_and_split(tokens.to_vec()).flatten().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Chunk with the configured strategy.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        match self.strategy {
            ChunkStrategy::Tokens => self.chunk_by_tokens(text),
            ChunkStrategy::Sentences => self.chunk_by_sentences(text, None),
        }
    }

    pub fn chunk_by_tokens(&self, text: &str) -> Vec<String> {
        let tokens = self.encode(text);
        let windows = token_windows(tokens.len(), self.chunk_size, self.overlap);
        debug!(tokens = tokens.len(), chunks = windows.len(), "token chunking");
        windows.into_iter().map(|w| self.decode(&tokens[w])).collect()
    }

    /// Split on `.`, `!` and `?`, then pack whole sentences into chunks of at
    /// most `max_tokens` (defaults to the chunk size). A sentence longer than
    /// the budget becomes a chunk on its own.
    pub fn chunk_by_sentences(&self, text: &str, max_tokens: Option<usize>) -> Vec<String> {
        let max_tokens = max_tokens.unwrap_or(self.chunk_size);
        let sentences = text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{s}."));

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0usize;
        for sentence in sentences {
            let size = self.count_tokens(&sentence);
            if current_size + size > max_tokens && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_size = 0;
            }
            current.push(sentence);
            current_size += size;
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}

/// Token ranges for a stream of `len` tokens: windows of `size` starting every
/// `size - overlap` tokens, ending with the first window that touches `len`.
/// Yields nothing unless `overlap < size`.
pub fn token_windows(len: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    if overlap >= size {
        return Vec::new();
    }
    let stride = size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        windows.push(start..end);
        if start + size >= len {
            break;
        }
        start += stride;
    }
    windows
}
