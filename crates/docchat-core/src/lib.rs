#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]
//! docchat-core
//!
//! Types, errors, configuration and document loading shared by the chunking,
//! embedding, vector and RAG crates.

pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
