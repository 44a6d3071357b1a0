// ============================================================
// Layer 3 — Preprocessing Error Taxonomy
// ============================================================
// The pipeline has exactly two failure modes, and both are
// fatal for the whole run:
//
//   MissingField  — a record lacks both the primary field and
//                   its fallback (e.g. neither 'instruction'
//                   nor 'question'). The corpus is assumed
//                   pre-validated upstream, so one malformed
//                   record aborts preprocessing rather than
//                   being silently skipped.
//
//   Tokenization  — the tokenizer rejected a text. Propagated
//                   unchanged, no retries.
//
// A model config that carries none of the known max-length
// hints is NOT an error — that case is resolved by a default
// (see ml::model_config), so it never appears here.
//
// Reference: Rust Book §9 (Error Handling)

use thiserror::Error;

/// Fatal errors raised while turning raw records into
/// tokenized training examples.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// A record is missing a required field and its fallback.
    /// `field` is the primary name, `fallback` the alternative
    /// that was also absent (empty string when there is none,
    /// as for 'response').
    #[error("record is missing required field '{field}' (fallback '{fallback}' also absent)")]
    MissingField { field: String, fallback: String },

    /// The tokenizer collaborator rejected its input.
    #[error("tokenization failed: {0}")]
    Tokenization(String),
}

impl PreprocessError {
    /// Shorthand for a field with a named fallback that was
    /// also absent.
    pub fn missing(field: &str, fallback: &str) -> Self {
        Self::MissingField {
            field:    field.to_string(),
            fallback: fallback.to_string(),
        }
    }

    /// Shorthand for a mandatory field with no fallback.
    pub fn missing_no_fallback(field: &str) -> Self {
        Self::MissingField {
            field:    field.to_string(),
            fallback: String::new(),
        }
    }
}
