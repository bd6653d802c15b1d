//! docchat-vector
//!
//! Exact nearest-neighbour storage for chunk embeddings. `FlatL2Index` holds
//! the vectors, `ChunkStore` the parallel chunk texts and metadata, and
//! `VectorStore` keeps the two in lockstep and persists them as a pair of
//! files sharing a path stem (`<stem>.index`, `<stem>.meta`).

pub mod index;
pub mod store;
pub mod table;

pub use index::{FlatL2Index, Neighbor};
pub use store::ChunkStore;
pub use table::{artifact_paths, VectorStore};
