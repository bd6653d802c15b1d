use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tempfile::tempdir;

use docchat_core::loader::DocumentLoader;
use docchat_core::traits::Embedder;
use docchat_core::types::{Document, ReplyStatus};
use docchat_embed::{FakeEmbedder, DEFAULT_DIM};
use docchat_rag::{CompletionClient, CompletionError, RagChatbot, NO_INFORMATION_RESPONSE};
use docchat_text::TextChunker;

#[derive(Clone, Default)]
struct RecordingClient {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingClient {
    fn calls(&self) -> usize { self.prompts.lock().unwrap().len() }
    fn last_prompt(&self) -> String { self.prompts.lock().unwrap().last().cloned().unwrap_or_default() }
}

impl CompletionClient for RecordingClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("The sky is blue.".to_string())
    }
}

struct FailingClient;

impl CompletionClient for FailingClient {
    fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Status { status: 503, body: "overloaded".into() })
    }
}

struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn dim(&self) -> usize { DEFAULT_DIM }
    fn max_len(&self) -> usize { 256 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { Err(anyhow!("model unavailable")) }
}

fn bot_with(client: impl CompletionClient + 'static) -> RagChatbot {
    RagChatbot::new(TextChunker::new(500, 50).unwrap(), Box::new(FakeEmbedder::new(DEFAULT_DIM)), Box::new(client))
}

fn sky_and_grass() -> Vec<Document> {
    vec![
        Document::new("The sky is blue.", "sky.txt", "data/raw/sky.txt"),
        Document::new("Grass is green.", "grass.txt", "data/raw/grass.txt"),
    ]
}

#[test]
fn empty_knowledge_base_returns_canned_reply_without_calling_api() {
    let client = RecordingClient::default();
    let bot = bot_with(client.clone());
    assert!(bot.is_empty());
    assert!(bot.retrieve("anything", 3).unwrap().is_empty());

    let reply = bot.chat("What color is the sky?", 3, true).unwrap();
    assert_eq!(reply.response, NO_INFORMATION_RESPONSE);
    assert_eq!(reply.status, ReplyStatus::NoKnowledge);
    assert!(reply.sources.is_empty());
    assert_eq!(client.calls(), 0);
}

#[test]
fn answers_from_nearest_chunk_with_sources() {
    let client = RecordingClient::default();
    let mut bot = bot_with(client.clone());
    assert_eq!(bot.add_documents(&sky_and_grass()).unwrap(), 2);
    assert_eq!(bot.len(), 2);

    let reply = bot.chat("What color is the sky?", 1, true).unwrap();
    assert_eq!(reply.status, ReplyStatus::Answered);
    assert_eq!(reply.response, "The sky is blue.");
    assert_eq!(client.calls(), 1);
    assert!(client.last_prompt().contains("Context:\nThe sky is blue.\n\nQuestion: What color is the sky?"));

    assert_eq!(reply.sources.len(), 1);
    let source = &reply.sources[0];
    assert_eq!(source.source, "sky.txt");
    assert_eq!(source.chunk_id, 0);
    assert_eq!(source.preview, "The sky is blue.");
    assert!(source.relevance_score >= 0.0);
}

#[test]
fn retrieve_clamps_k_and_orders_by_distance() {
    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&sky_and_grass()).unwrap();

    let hits = bot.retrieve("the sky is blue", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].meta.source, "sky.txt");
    assert!(hits[0].distance <= hits[1].distance);
    assert!(hits[0].distance < 1e-4, "identical text should be at distance ~0");
    assert!(bot.retrieve("the sky is blue", 0).unwrap().is_empty());
}

#[test]
fn all_contexts_are_joined_in_rank_order() {
    let client = RecordingClient::default();
    let mut bot = bot_with(client.clone());
    bot.add_documents(&sky_and_grass()).unwrap();

    bot.chat("the sky is blue", 2, false).unwrap();
    assert!(client.last_prompt().contains("Context:\nThe sky is blue.\n\nGrass is green.\n\nQuestion:"));
}

#[test]
fn completion_failure_becomes_response_text() {
    let mut bot = bot_with(FailingClient);
    bot.add_documents(&sky_and_grass()).unwrap();

    let reply = bot.chat("What color is the sky?", 2, true).unwrap();
    assert_eq!(reply.status, ReplyStatus::CompletionFailed);
    assert!(reply.response.starts_with("Error calling completion API:"));
    assert!(reply.response.contains("503"));
    assert_eq!(reply.sources.len(), 2);
}

#[test]
fn sources_are_omitted_when_not_requested() {
    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&sky_and_grass()).unwrap();
    let reply = bot.chat("What color is the sky?", 2, false).unwrap();
    assert_eq!(reply.status, ReplyStatus::Answered);
    assert!(reply.sources.is_empty());
}

#[test]
fn long_chunks_get_truncated_previews() {
    let mut bot = bot_with(RecordingClient::default());
    let text = "word ".repeat(100);
    bot.add_documents(&[Document::new(text.clone(), "long.txt", "long.txt")]).unwrap();

    let reply = bot.chat("word", 1, true).unwrap();
    let preview = &reply.sources[0].preview;
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 203);
    assert!(text.starts_with(preview.trim_end_matches("...")));
}

#[test]
fn empty_source_falls_back_to_document_position() {
    let mut bot = bot_with(RecordingClient::default());
    let docs = vec![Document::new("Alpha beta.", "named.txt", "named.txt"), Document::new("Gamma delta.", "", "")];
    bot.add_documents(&docs).unwrap();
    assert_eq!(bot.sources(), vec!["document_1".to_string(), "named.txt".to_string()]);

    let meta = bot.store().chunks().metadata();
    assert_eq!(meta[1].doc_id, 1);
    assert_eq!(meta[1].chunk_id, 0);
}

#[test]
fn empty_documents_add_nothing() {
    let mut bot = bot_with(RecordingClient::default());
    assert_eq!(bot.add_documents(&[]).unwrap(), 0);
    assert_eq!(bot.add_documents(&[Document::new("", "empty.txt", "empty.txt")]).unwrap(), 0);
    assert!(bot.is_empty());
}

#[test]
fn embedding_failure_leaves_knowledge_base_unchanged() {
    let mut bot = RagChatbot::new(
        TextChunker::new(500, 50).unwrap(),
        Box::new(BrokenEmbedder),
        Box::new(RecordingClient::default()),
    );
    assert!(bot.add_documents(&sky_and_grass()).is_err());
    assert!(bot.is_empty());
}

#[test]
fn save_then_load_restores_identical_retrieval() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("indices").join("chatbot_index");

    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&sky_and_grass()).unwrap();
    bot.save_index(&stem).unwrap();
    assert!(RagChatbot::index_exists(&stem));

    let mut restored = bot_with(RecordingClient::default());
    restored.load_index(&stem).unwrap();
    assert_eq!(restored.len(), bot.len());
    assert_eq!(restored.store(), bot.store());
    assert_eq!(
        restored.retrieve("What color is the sky?", 2).unwrap(),
        bot.retrieve("What color is the sky?", 2).unwrap()
    );

    RagChatbot::remove_index(&stem).unwrap();
    assert!(!RagChatbot::index_exists(&stem));
}

#[test]
fn saving_empty_knowledge_base_writes_nothing() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("kb");
    bot_with(RecordingClient::default()).save_index(&stem).unwrap();
    assert!(!RagChatbot::index_exists(&stem));
}

#[test]
fn failed_load_keeps_current_state() {
    let dir = tempdir().unwrap();
    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&sky_and_grass()).unwrap();

    assert!(bot.load_index(&dir.path().join("missing")).is_err());
    assert_eq!(bot.len(), 2);

    // Saved with a different embedding dimension.
    let stem = dir.path().join("small");
    let mut small = RagChatbot::new(
        TextChunker::new(500, 50).unwrap(),
        Box::new(FakeEmbedder::new(8)),
        Box::new(RecordingClient::default()),
    );
    small.add_documents(&sky_and_grass()[..1]).unwrap();
    small.save_index(&stem).unwrap();
    assert!(bot.load_index(&stem).is_err());
    assert_eq!(bot.len(), 2);
}

#[test]
fn clear_empties_knowledge_base() {
    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&sky_and_grass()).unwrap();
    bot.clear();
    assert!(bot.is_empty());
    assert_eq!(bot.chat("What color is the sky?", 3, true).unwrap().status, ReplyStatus::NoKnowledge);
}

#[test]
fn loaded_directory_feeds_the_chatbot() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("sky.txt"), "The sky is blue.").unwrap();
    std::fs::write(dir.path().join("notes.md"), "# Notes\nGrass is green.").unwrap();
    std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

    let docs = DocumentLoader::new(dir.path()).load_directory();
    assert_eq!(docs.len(), 2);

    let mut bot = bot_with(RecordingClient::default());
    bot.add_documents(&docs).unwrap();
    assert_eq!(bot.sources(), vec!["notes.md".to_string(), "sky.txt".to_string()]);
}

#[test]
fn offline_chatbot_reports_missing_completion_api() {
    let mut bot = bot_with(docchat_rag::DisabledClient);
    bot.add_documents(&sky_and_grass()).unwrap();
    let reply = bot.chat("What color is the sky?", 1, true).unwrap();
    assert_eq!(reply.status, ReplyStatus::CompletionFailed);
    assert_eq!(reply.response, "Error calling completion API: no completion API configured");
}

#[test]
fn single_short_document_is_one_cited_chunk() {
    let mut bot = bot_with(RecordingClient::default());
    let doc = Document::new("The sky is blue. Grass is green.", "facts.txt", "data/raw/facts.txt");
    assert_eq!(bot.add_documents(&[doc]).unwrap(), 1);

    let reply = bot.chat("What color is the sky?", 3, true).unwrap();
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].chunk_id, 0);
    assert_eq!(reply.sources[0].source, "facts.txt");
}
