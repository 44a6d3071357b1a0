// ============================================================
// Layer 4 — Batch Tokenizer
// ============================================================
// Thin wrapper around tokenizers::Tokenizer that fixes the
// policy the pipeline needs:
//
//   - truncation at max_length (tokens past the context
//     window are discarded)
//   - NO padding at this stage — padding is deferred to the
//     training collator, which pads each batch to its own
//     longest sequence instead of the global maximum
//
// Output per text: 'input_ids' (≤ max_length token ids) plus
// the tokenizer's auxiliary outputs ('attention_mask',
// 'type_ids', 'special_tokens_mask'), forwarded unchanged —
// downstream stages pick the columns they need and drop the
// rest. Tokenizer failures are fatal and propagate unchanged;
// there are no retries.
//
// Reference: tokenizers crate documentation

use serde_json::{json, Value};
use tokenizers::{Tokenizer, TruncationParams};

use crate::domain::errors::PreprocessError;
use crate::domain::record::Record;

/// Column name for the token-id sequence.
pub const INPUT_IDS_COLUMN: &str = "input_ids";

/// Column name for the attention mask.
pub const ATTENTION_MASK_COLUMN: &str = "attention_mask";

/// Column name for segment/type ids.
pub const TYPE_IDS_COLUMN: &str = "type_ids";

/// Column name for the special-tokens mask.
pub const SPECIAL_TOKENS_MASK_COLUMN: &str = "special_tokens_mask";

/// A tokenizer configured for truncation-only batch encoding.
pub struct BatchTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl BatchTokenizer {
    /// Wrap a tokenizer, enabling truncation at `max_length`
    /// and disabling any padding it was loaded with.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, PreprocessError> {
        assert!(max_length > 0, "max_length must be positive");

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| PreprocessError::Tokenization(e.to_string()))?;
        tokenizer.with_padding(None);

        Ok(Self { tokenizer, max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode a batch of texts into per-record column maps
    /// (ready to merge into dataset records).
    pub fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Record>, PreprocessError> {
        let inputs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| PreprocessError::Tokenization(e.to_string()))?;

        Ok(encodings
            .iter()
            .map(|enc| {
                let mut columns = Record::new();
                columns.insert(INPUT_IDS_COLUMN.to_string(), json!(enc.get_ids()));
                columns.insert(
                    ATTENTION_MASK_COLUMN.to_string(),
                    json!(enc.get_attention_mask()),
                );
                columns.insert(TYPE_IDS_COLUMN.to_string(), json!(enc.get_type_ids()));
                columns.insert(
                    SPECIAL_TOKENS_MASK_COLUMN.to_string(),
                    json!(enc.get_special_tokens_mask()),
                );
                columns
            })
            .collect())
    }
}

/// Read the 'input_ids' column length from a tokenized record.
/// Every record reaching the filter stage carries the column
/// (the tokenize stage adds it unconditionally).
pub fn input_ids_len(record: &Record) -> usize {
    record
        .get(INPUT_IDS_COLUMN)
        .and_then(Value::as_array)
        .map(|ids| ids.len())
        .unwrap_or(0)
}
