use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use docchat_core::config::Settings;
use docchat_core::traits::Embedder;
use docchat_core::types::{ChatResponse, ChunkMeta, Document, ReplyStatus, Retrieved, SourceRef};
use docchat_embed::get_default_embedder;
use docchat_text::TextChunker;
use docchat_vector::VectorStore;

use crate::llm::{CompletionClient, DisabledClient, HttpCompletionClient};

pub const NO_INFORMATION_RESPONSE: &str = "I don't have any relevant information to answer that.";

const CONTEXT_SEPARATOR: &str = "\n\n";
const PREVIEW_CHARS: usize = 200;

/// Render the fixed instruction template around the retrieved context.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are a helpful assistant. Answer the user's question based on the provided context.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer the question based on the context above. If the context doesn't contain relevant information, say so."
    )
}

fn preview(chunk: &str) -> String {
    match chunk.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &chunk[..cut]),
        None => chunk.to_string(),
    }
}

/// Retrieval-augmented chatbot over an in-memory knowledge base.
///
/// The knowledge base is empty until `add_documents` or `load_index`
/// succeeds. Mutating calls take `&mut self`; the instance does no locking
/// of its own.
pub struct RagChatbot {
    chunker: TextChunker,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn CompletionClient>,
    store: VectorStore,
}

impl RagChatbot {
    pub fn new(chunker: TextChunker, embedder: Box<dyn Embedder>, llm: Box<dyn CompletionClient>) -> Self {
        let store = VectorStore::new(embedder.dim());
        info!("RAG chatbot initialized (embedding dim {})", embedder.dim());
        Self { chunker, embedder, llm, store }
    }

    /// Build every component from settings: chunker, embedder and the HTTP
    /// completion client.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        info!("Initializing RAG components...");
        let chunker = TextChunker::from_settings(&settings.chunking)?;
        let llm = HttpCompletionClient::from_settings(&settings.llm)?;
        let embedder = get_default_embedder(&settings.embedding)?;
        Ok(Self::new(chunker, embedder, Box::new(llm)))
    }

    /// Like `from_settings` but without a completion API, for building and
    /// inspecting indexes. `chat` answers with a `CompletionFailed` status.
    pub fn offline_from_settings(settings: &Settings) -> Result<Self> {
        let chunker = TextChunker::from_settings(&settings.chunking)?;
        let embedder = get_default_embedder(&settings.embedding)?;
        Ok(Self::new(chunker, embedder, Box::new(DisabledClient)))
    }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    /// Distinct source names in the knowledge base, sorted.
    pub fn sources(&self) -> Vec<String> { self.store.sources() }

    pub fn store(&self) -> &VectorStore { &self.store }

    /// Chunk, embed and index `documents`. All new chunks are embedded in a
    /// single batch; if embedding or indexing fails nothing is added.
    /// Returns the number of chunks added.
    pub fn add_documents(&mut self, documents: &[Document]) -> Result<usize> {
        info!("Processing {} documents...", documents.len());
        let mut entries: Vec<(String, ChunkMeta)> = Vec::new();
        for (doc_id, doc) in documents.iter().enumerate() {
            let source = if doc.source.is_empty() { format!("document_{doc_id}") } else { doc.source.clone() };
            let chunks = self.chunker.chunk(&doc.text);
            info!("  {}: {} chunks", source, chunks.len());
            entries.extend(
                chunks
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_id, chunk)| (chunk, ChunkMeta { source: source.clone(), chunk_id, doc_id })),
            );
        }
        if entries.is_empty() {
            warn!("No chunks produced; knowledge base unchanged");
            return Ok(0);
        }

        info!("Generating embeddings...");
        let texts: Vec<String> = entries.iter().map(|(chunk, _)| chunk.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).context("embedding chunks")?;
        let added = entries.len();
        self.store.append(entries, &vectors)?;
        info!("Total chunks in knowledge base: {}", self.store.len());
        Ok(added)
    }

    /// The `min(top_k, len)` chunks nearest to `query`, ascending by distance.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Retrieved>> {
        if self.store.is_empty() {
            warn!("No documents in knowledge base");
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(query).context("embedding query")?;
        Ok(self.store.search(&query_vec, top_k)?)
    }

    /// Answer `query` from the `top_k` nearest chunks.
    ///
    /// Completion failures do not fail the call: the response text carries
    /// the error and `status` is `CompletionFailed`. Embedding failures are
    /// returned as errors.
    pub fn chat(&self, query: &str, top_k: usize, show_sources: bool) -> Result<ChatResponse> {
        let retrieved = self.retrieve(query, top_k)?;
        if retrieved.is_empty() {
            return Ok(ChatResponse {
                response: NO_INFORMATION_RESPONSE.to_string(),
                sources: Vec::new(),
                status: ReplyStatus::NoKnowledge,
            });
        }

        let context = retrieved.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
        let prompt = build_prompt(&context, query);
        let (response, status) = match self.llm.complete(&prompt) {
            Ok(text) => (text, ReplyStatus::Answered),
            Err(e) => {
                error!("Completion API error: {}", e);
                (format!("Error calling completion API: {e}"), ReplyStatus::CompletionFailed)
            }
        };

        let sources = if show_sources {
            retrieved
                .iter()
                .map(|r| SourceRef {
                    source: r.meta.source.clone(),
                    chunk_id: r.meta.chunk_id,
                    relevance_score: r.distance,
                    preview: preview(&r.text),
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(ChatResponse { response, sources, status })
    }

    /// Persist the knowledge base as `<stem>.index` and `<stem>.meta`.
    /// An empty knowledge base is not written.
    pub fn save_index(&self, stem: &Path) -> docchat_core::Result<()> {
        if self.store.is_empty() {
            warn!("No chunks to save. Skipping index save.");
            return Ok(());
        }
        self.store.save(stem).inspect_err(|e| error!("Error saving index: {}", e))
    }

    /// Replace the knowledge base with the one saved at `stem`. On failure
    /// the current knowledge base is left untouched.
    pub fn load_index(&mut self, stem: &Path) -> docchat_core::Result<()> {
        let loaded = VectorStore::load(stem, self.embedder.dim()).inspect_err(|e| error!("Error loading index: {}", e))?;
        self.store = loaded;
        Ok(())
    }

    /// Drop every chunk; the knowledge base returns to empty.
    pub fn clear(&mut self) {
        self.store.clear();
        info!("Knowledge base cleared");
    }

    pub fn index_exists(stem: &Path) -> bool { VectorStore::exists(stem) }

    /// Delete the saved artifacts for `stem`, if any.
    pub fn remove_index(stem: &Path) -> docchat_core::Result<()> { VectorStore::remove(stem) }
}
