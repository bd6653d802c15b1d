use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Model inputs for one mini-batch, each shaped `[B, T]`.
pub struct BatchInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Padding id declared by the tokenizer, falling back to `[PAD]` and then 0.
pub fn pad_id(tokenizer: &Tokenizer) -> u32 {
    tokenizer
        .get_padding()
        .map(|p| p.pad_id)
        .or_else(|| tokenizer.token_to_id("[PAD]"))
        .unwrap_or(0)
}

/// Encode `texts`, truncate each to `max_len` and right-pad to the longest
/// sequence in the batch.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, pad_id: u32, device: &Device) -> Result<BatchInputs> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut type_ids = enc.get_type_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len { ids.truncate(max_len); type_ids.truncate(max_len); mask.truncate(max_len); }
        rows.push((ids, type_ids, mask));
    }
    let seq_len = rows.iter().map(|(ids, _, _)| ids.len()).max().unwrap_or(0).max(1);

    let batch = rows.len();
    let mut flat_ids = Vec::with_capacity(batch * seq_len);
    let mut flat_types = Vec::with_capacity(batch * seq_len);
    let mut flat_mask = Vec::with_capacity(batch * seq_len);
    for (ids, type_ids, mask) in rows {
        let pad = seq_len - ids.len();
        flat_ids.extend(ids.into_iter().chain(std::iter::repeat(pad_id).take(pad)));
        flat_types.extend(type_ids.into_iter().chain(std::iter::repeat(0).take(pad)));
        flat_mask.extend(mask.into_iter().chain(std::iter::repeat(0).take(pad)));
    }
    Ok(BatchInputs {
        input_ids: Tensor::from_vec(flat_ids, (batch, seq_len), device)?,
        token_type_ids: Tensor::from_vec(flat_types, (batch, seq_len), device)?,
        attention_mask: Tensor::from_vec(flat_mask, (batch, seq_len), device)?,
    })
}
