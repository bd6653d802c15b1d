//! docchat-rag
//!
//! Retrieval-augmented chat over a local knowledge base: ingestion
//! (chunk → embed → index), retrieval, context assembly and a single call to
//! an OpenAI-compatible chat-completion endpoint.

pub mod chatbot;
pub mod llm;

pub use chatbot::{build_prompt, RagChatbot, NO_INFORMATION_RESPONSE};
pub use llm::{CompletionClient, CompletionError, DisabledClient, HttpCompletionClient};
