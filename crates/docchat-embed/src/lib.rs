//! docchat-embed
//!
//! Sentence embeddings for chunks and queries. `SentenceEmbedder` runs a
//! BERT-family encoder (e.g. `all-MiniLM-L6-v2`) from a local model directory
//! through candle; `FakeEmbedder` is a deterministic stand-in selected with
//! `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.use_fake = true`.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use indicatif::{ProgressBar, ProgressStyle};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docchat_core::config::{expand_path, EmbeddingSettings};
use docchat_core::traits::Embedder;

pub mod device;
pub mod fake;
pub mod pool;
pub mod tokenize;

pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;

/// Dimension of `all-MiniLM-L6-v2`, also used for the fake embedder.
pub const DEFAULT_DIM: usize = 384;

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    pad_id: u32,
}

impl SentenceEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let device = device::select_device();
        info!("Loading embedding model: {}", settings.model);
        let model_dir = resolve_model_dir(settings)?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| anyhow!("Failed to parse {}: {}", config_path.display(), e))?;

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        let dim = config.hidden_size;
        let pad_id = tokenize::pad_id(&tokenizer);
        info!("Embedding dimension: {}", dim);
        Ok(Self { model, tokenizer, device, dim, max_len: settings.max_len, batch_size: settings.batch_size.max(1), pad_id })
    }

    fn embed_mini_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&inputs.input_ids, &inputs.token_type_ids, Some(&inputs.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &inputs.attention_mask)?;
        Ok(pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        let pb = if texts.len() > self.batch_size { ProgressBar::new(texts.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks embedded") {
            pb.set_style(style.progress_chars("#>-"));
        }
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_mini_batch(batch)?;
            debug!(batch = batch.len(), "embedded mini-batch");
            out.extend(vectors);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(out)
    }
}

/// Build the embedder selected by settings and environment.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake {
        info!("Using FakeEmbedder (dim {})", DEFAULT_DIM);
        return Ok(Box::new(FakeEmbedder::new(DEFAULT_DIM)));
    }
    Ok(Box::new(SentenceEmbedder::load(settings)?))
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!("Loading weights from {}", safetensors.display());
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        debug!("Loading weights from {}", pickle.display());
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &settings.model_dir { candidates.push(expand_path(dir)); }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { candidates.push(expand_path(dir)); }
    if let Ok(dir) = std::env::var("MODEL_DIR") { candidates.push(expand_path(dir)); }
    candidates.push(Path::new("models").join(&settings.model));
    candidates.push(Path::new("../models").join(&settings.model));
    for p in candidates {
        if p.exists() { info!("Using model dir: {}", p.display()); return Ok(p); }
    }
    Err(anyhow!("Could not locate model directory for '{}'", settings.model))
}
