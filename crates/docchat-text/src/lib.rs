//! docchat-text
//!
//! Token-window and sentence-packing chunkers over the `cl100k_base` BPE.
//! See `chunker` for the windowing rules.

pub mod chunker;

pub use chunker::{token_windows, TextChunker};
