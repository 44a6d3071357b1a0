// ============================================================
// Layer 4 — Preprocessing Pipeline
// ============================================================
// The fixed four-stage pipeline that turns raw records into
// training-ready, tokenized, shuffled examples:
//
//   raw records
//       │
//       ▼
//   1. format   → adds the 'text' prompt column
//       │
//       ▼
//   2. tokenize → adds 'input_ids' and the tokenizer's
//                 auxiliary columns, drops the caller-named
//                 raw columns
//       │
//       ▼
//   3. filter   → keeps records with len(input_ids) < max_length
//       │
//       ▼
//   4. shuffle  → deterministic order from the seed
//
// The stages may not be skipped or reordered: tokenize reads
// the column format produced, filter reads the column tokenize
// produced, and shuffle fixes the final order only after the
// filter has bounded the in-flight set.
//
// The filter is a STRICT less-than: a record tokenized to
// exactly max_length was almost certainly truncated mid-prompt
// (truncation caps at max_length), so it is dropped rather
// than trained on.
//
// Any malformed record aborts the whole run — the corpus is
// assumed pre-validated upstream, and partial output would
// silently corrupt training data quality.

use serde_json::Value;
use tokenizers::Tokenizer;

use crate::data::dataset::InstructDataset;
use crate::data::formatter::{with_prompt, TEXT_COLUMN};
use crate::data::tokenize::{input_ids_len, BatchTokenizer};
use crate::domain::errors::PreprocessError;

/// Records tokenized per call into the tokenizer.
const TOKENIZE_BATCH_SIZE: usize = 1000;

/// Run the full format → tokenize → filter → shuffle pipeline.
///
/// `remove_columns` names the columns dropped after
/// tokenization — typically every raw column plus 'text',
/// since the training loop only consumes token ids.
pub fn preprocess_dataset(
    tokenizer:      Tokenizer,
    max_length:     usize,
    seed:           u64,
    dataset:        &InstructDataset,
    remove_columns: &[String],
) -> Result<InstructDataset, PreprocessError> {
    tracing::info!(
        "Preprocessing {} records (max_length={}, seed={})",
        dataset.len(),
        max_length,
        seed,
    );

    let batch_tokenizer = BatchTokenizer::new(tokenizer, max_length)?;

    // ── Stage 1: add the prompt column ────────────────────────────────────────
    let formatted = dataset.map(with_prompt)?;

    // ── Stage 2: tokenize in batches, drop spent columns ──────────────────────
    let tokenized = formatted.map_batched(
        TOKENIZE_BATCH_SIZE,
        |batch| {
            // Stage 1 put 'text' on every record.
            let texts: Vec<&str> = batch
                .iter()
                .map(|r| r.get(TEXT_COLUMN).and_then(Value::as_str).unwrap_or_default())
                .collect();
            batch_tokenizer.encode_batch(&texts)
        },
        remove_columns,
    )?;

    // ── Stage 3: drop records at or over the context window ───────────────────
    let filtered = tokenized.filter(|r| input_ids_len(r) < max_length);
    tracing::info!(
        "Filtered {} truncated records, {} remain",
        tokenized.len() - filtered.len(),
        filtered.len(),
    );

    // ── Stage 4: fix the final order ──────────────────────────────────────────
    Ok(filtered.shuffle(seed))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    // Build a word-level tokenizer whose token count equals the
    // whitespace word count — that makes prompt lengths exactly
    // predictable in the boundary tests below.
    fn word_tokenizer() -> Tokenizer {
        let tokenizer_json = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0, "content": "[UNK]", "single_word": false, "lstrip": false,
                 "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": { "[UNK]": 0, "alpha": 1, "beta": 2, "gamma": 3 },
                "unk_token": "[UNK]"
            }
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&tokenizer_json).unwrap().as_bytes())
            .unwrap();
        Tokenizer::from_file(file.path()).unwrap()
    }

    fn record(value: serde_json::Value) -> crate::domain::record::Record {
        value.as_object().unwrap().clone()
    }

    // A context-free prompt is 22 template words + instruction
    // words + response words (blurb 16, three 2-word labels).
    const TEMPLATE_WORDS: usize = 22;

    #[test]
    fn test_filter_boundary_is_strict() {
        // "alpha" (1 word) + "beta" (1 word) → 24 tokens.
        // "alpha beta" (2) + "beta" (1)     → 25 tokens.
        let short = record(json!({ "instruction": "alpha", "response": "beta" }));
        let exact = record(json!({ "instruction": "alpha beta", "response": "beta" }));
        let dataset = InstructDataset::new(vec![short, exact]);

        let max_length = TEMPLATE_WORDS + 3; // 25
        let out = preprocess_dataset(word_tokenizer(), max_length, 42, &dataset, &[])
            .unwrap();

        // 24 < 25 → kept; 25 < 25 is false → dropped.
        assert_eq!(out.len(), 1);
        assert_eq!(input_ids_len(out.get(0).unwrap()), max_length - 1);
    }

    #[test]
    fn test_overlong_records_truncate_then_drop() {
        // 40 instruction words → truncated down to max_length,
        // which the strict filter then rejects.
        let words = vec!["gamma"; 40].join(" ");
        let long = record(json!({ "instruction": words, "response": "beta" }));
        let dataset = InstructDataset::new(vec![long]);

        let out = preprocess_dataset(word_tokenizer(), 30, 42, &dataset, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_remove_columns_dropped_after_tokenization() {
        let dataset = InstructDataset::new(vec![record(json!({
            "instruction": "alpha",
            "response": "beta",
            "category": "open_qa",
        }))]);

        let remove: Vec<String> = ["instruction", "response", "category", "text"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = preprocess_dataset(word_tokenizer(), 100, 42, &dataset, &remove)
            .unwrap();

        let result = out.get(0).unwrap();
        assert!(result.get("input_ids").is_some());
        assert!(result.get("attention_mask").is_some());
        for column in &remove {
            assert!(result.get(column.as_str()).is_none(), "{column} should be gone");
        }
    }

    #[test]
    fn test_auxiliary_tokenizer_columns_pass_through() {
        use crate::data::tokenize::{
            ATTENTION_MASK_COLUMN, SPECIAL_TOKENS_MASK_COLUMN, TYPE_IDS_COLUMN,
        };

        let dataset = InstructDataset::new(vec![record(json!({
            "instruction": "alpha",
            "response": "beta gamma",
        }))]);

        let out = preprocess_dataset(word_tokenizer(), 100, 42, &dataset, &[]).unwrap();
        let result = out.get(0).unwrap();

        // Every auxiliary output rides alongside input_ids, one
        // entry per token.
        let ids_len = input_ids_len(result);
        for column in [ATTENTION_MASK_COLUMN, TYPE_IDS_COLUMN, SPECIAL_TOKENS_MASK_COLUMN] {
            let values = result
                .get(column)
                .and_then(Value::as_array)
                .unwrap_or_else(|| panic!("{column} column missing"));
            assert_eq!(values.len(), ids_len, "{column} length mismatch");
        }
    }

    #[test]
    fn test_shuffle_is_reproducible_end_to_end() {
        let records: Vec<_> = (0..12)
            .map(|i| record(json!({
                "instruction": format!("alpha {i}"),
                "response": "beta",
            })))
            .collect();
        let dataset = InstructDataset::new(records);

        let a = preprocess_dataset(word_tokenizer(), 100, 7, &dataset, &[]).unwrap();
        let b = preprocess_dataset(word_tokenizer(), 100, 7, &dataset, &[]).unwrap();
        let c = preprocess_dataset(word_tokenizer(), 100, 8, &dataset, &[]).unwrap();

        let order = |ds: &InstructDataset| -> Vec<String> {
            ds.records()
                .iter()
                .map(|r| r["instruction"].as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(order(&a), order(&b));
        assert_ne!(order(&a), order(&c));
    }

    #[test]
    fn test_malformed_record_aborts_run() {
        let good = record(json!({ "instruction": "alpha", "response": "beta" }));
        let bad  = record(json!({ "instruction": "alpha" })); // no response
        let dataset = InstructDataset::new(vec![good, bad]);

        let err = preprocess_dataset(word_tokenizer(), 100, 42, &dataset, &[])
            .unwrap_err();
        assert!(matches!(err, PreprocessError::MissingField { .. }));
    }
}
