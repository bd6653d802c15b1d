//! Domain types shared by the loader, chunker, vector store and chatbot.

use serde::{Deserialize, Serialize};

/// A loaded source file.
///
/// - `text`: the extracted plain text
/// - `source`: the file name shown to users as the citation
/// - `path`: the full path the text was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub path: String,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, path: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into(), path: path.into() }
    }
}

/// Position of a chunk within the ingestion it came from.
///
/// `doc_id` is the document's index within its `add_documents` batch and
/// `chunk_id` the window index inside that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: String,
    pub chunk_id: usize,
    pub doc_id: usize,
}

/// A chunk returned by nearest-neighbour retrieval.
///
/// `distance` is the raw squared L2 distance; lower is more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub text: String,
    pub meta: ChunkMeta,
    pub distance: f32,
}

/// Citation attached to a chat answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub chunk_id: usize,
    pub relevance_score: f32,
    pub preview: String,
}

/// How a chat turn was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    /// The completion API produced the response text.
    Answered,
    /// Nothing was retrieved; the canned reply was returned without an API call.
    NoKnowledge,
    /// The completion API failed; the response text carries the error.
    CompletionFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub status: ReplyStatus,
}
