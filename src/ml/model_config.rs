// ============================================================
// Layer 5 — Pretrained Model Config
// ============================================================
// Wraps the HF-style config.json found in a pretrained-model
// directory. The file is a loose mapping of hyperparameters
// whose key names vary by model family, so this type keeps the
// raw JSON and answers questions with conventions + defaults
// instead of a rigid schema.
//
// The context-window probe mirrors what fine-tuning scripts do
// in practice: GPT-2 family says 'n_positions', LLaMA/BERT
// family says 'max_position_embeddings', GLM family says
// 'seq_length'. First truthy hit wins, no sanity validation —
// an intentionally permissive compatibility shim. When none of
// the three is present the conventional 1024 default applies;
// that lookup miss is an expected case, never an error.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::{fs, path::Path};

/// Fallback context window when the config names none.
pub const DEFAULT_MAX_LENGTH: usize = 1024;

/// The config field names that encode context window size,
/// in probe priority order.
const LENGTH_SETTINGS: [&str; 3] = ["n_positions", "max_position_embeddings", "seq_length"];

/// A pretrained model's hyperparameter mapping.
#[derive(Debug, Clone, Default)]
pub struct PretrainedConfig {
    fields: Map<String, Value>,
}

impl PretrainedConfig {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Load `config.json` from a model directory.
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join("config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("cannot read model config '{}'", path.display()))?;
        let value: Value = serde_json::from_str(&json)
            .with_context(|| format!("invalid JSON in '{}'", path.display()))?;
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            _ => anyhow::bail!("'{}' is not a JSON object", path.display()),
        }
    }

    /// Resolve the maximum sequence length for truncation.
    ///
    /// Probes n_positions → max_position_embeddings →
    /// seq_length; the first positive integer wins. Falls back
    /// to DEFAULT_MAX_LENGTH when all three are absent or zero.
    pub fn context_window(&self) -> usize {
        for setting in LENGTH_SETTINGS {
            if let Some(length) = self.positive_usize(setting) {
                tracing::info!("Found max length: {} (from '{}')", length, setting);
                return length;
            }
        }
        tracing::info!("Using default max length: {}", DEFAULT_MAX_LENGTH);
        DEFAULT_MAX_LENGTH
    }

    /// An integer field, or `default` when absent/non-integer.
    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        self.positive_usize(key).unwrap_or(default)
    }

    /// A float field, or `default` when absent/non-numeric.
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.fields.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn positive_usize(&self, key: &str) -> Option<usize> {
        self.fields
            .get(key)
            .and_then(Value::as_u64)
            .filter(|&n| n > 0)
            .map(|n| n as usize)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> PretrainedConfig {
        PretrainedConfig::new(value.as_object().unwrap().clone())
    }

    #[test]
    fn test_probe_priority_order() {
        // n_positions outranks max_position_embeddings
        let cfg = config(json!({
            "n_positions": 2048,
            "max_position_embeddings": 4096,
        }));
        assert_eq!(cfg.context_window(), 2048);
    }

    #[test]
    fn test_second_and_third_settings() {
        assert_eq!(
            config(json!({ "max_position_embeddings": 4096 })).context_window(),
            4096
        );
        assert_eq!(config(json!({ "seq_length": 8192 })).context_window(), 8192);
    }

    #[test]
    fn test_zero_counts_as_absent() {
        let cfg = config(json!({ "n_positions": 0, "seq_length": 512 }));
        assert_eq!(cfg.context_window(), 512);
    }

    #[test]
    fn test_default_when_no_hint_present() {
        let cfg = config(json!({ "hidden_size": 768 }));
        assert_eq!(cfg.context_window(), DEFAULT_MAX_LENGTH);
    }

    #[test]
    fn test_non_integer_hint_is_skipped() {
        let cfg = config(json!({ "n_positions": "big" }));
        assert_eq!(cfg.context_window(), DEFAULT_MAX_LENGTH);
    }
}
