// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained tokenizer.json shipped in the model
// directory and resolves a padding id for the collator.
//
// Causal-LM tokenizers frequently define no pad token at all
// (LLaMA famously doesn't), in which case the usual recipe is
// pad = eos: pad positions never contribute to the loss, so
// any real id works — eos just keeps the vocabulary untouched.
//
// Reference: tokenizers crate documentation

use anyhow::Result;
use std::path::PathBuf;
use tokenizers::Tokenizer;

/// Pad-token candidates, most explicit first; eos-style
/// tokens follow the "pad = eos" convention.
const PAD_CANDIDATES: [&str; 4] = ["<pad>", "[PAD]", "</s>", "<|endoftext|>"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load tokenizer.json from the model directory.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        tracing::info!("Loaded tokenizer from '{}'", path.display());
        Ok(tokenizer)
    }

    /// Resolve the id used for padding.
    /// Falls back to id 0 when the vocabulary has none of the
    /// known pad/eos tokens.
    pub fn pad_token_id(tokenizer: &Tokenizer) -> u32 {
        for candidate in PAD_CANDIDATES {
            if let Some(id) = tokenizer.token_to_id(candidate) {
                tracing::debug!("Using '{}' (id {}) as pad token", candidate, id);
                return id;
            }
        }
        tracing::warn!("No pad or eos token in vocabulary — padding with id 0");
        0
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn tokenizer_with_vocab(vocab: serde_json::Value) -> Tokenizer {
        let tokenizer_json = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&tokenizer_json).unwrap().as_bytes())
            .unwrap();
        Tokenizer::from_file(file.path()).unwrap()
    }

    #[test]
    fn test_eos_serves_as_pad_when_no_pad_token() {
        let tokenizer = tokenizer_with_vocab(json!({ "[UNK]": 0, "</s>": 2, "hello": 5 }));
        assert_eq!(TokenizerStore::pad_token_id(&tokenizer), 2);
    }

    #[test]
    fn test_explicit_pad_token_wins_over_eos() {
        let tokenizer =
            tokenizer_with_vocab(json!({ "[UNK]": 0, "<pad>": 3, "</s>": 2 }));
        assert_eq!(TokenizerStore::pad_token_id(&tokenizer), 3);
    }

    #[test]
    fn test_fallback_to_zero() {
        let tokenizer = tokenizer_with_vocab(json!({ "[UNK]": 0, "hello": 5 }));
        assert_eq!(TokenizerStore::pad_token_id(&tokenizer), 0);
    }

    #[test]
    fn test_missing_tokenizer_file_is_an_error() {
        let store = TokenizerStore::new("does/not/exist");
        assert!(store.load().is_err());
    }
}
