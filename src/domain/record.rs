// ============================================================
// Layer 3 — Record and Prompt-Field Resolution
// ============================================================
// Instruction corpora come in two common shapes:
//
//   Dolly-style:  { "instruction": ..., "context": ...,       "response": ... }
//   Orca-style:   { "question": ...,    "system_prompt": ..., "response": ... }
//
// Records keep whatever extra columns the source dataset had
// (e.g. "category"), so a Record is a flexible JSON object
// rather than a fixed struct.
//
// Resolution is done with explicit presence checks, not
// exception-driven fallback: a field counts as present only
// when the key exists AND holds a string value. The resolver
// first decides which of the two shapes the record follows
// (from its instruction field), then reads the matching
// context field. Context is genuinely optional supplementary
// information — absent or empty means "no context section".
//
// 'response' is mandatory in both shapes; a record without it
// is a fatal input error.
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use serde_json::{Map, Value};

use crate::domain::errors::PreprocessError;

/// One raw training record: a JSON object with a flexible,
/// non-fixed key set.
pub type Record = Map<String, Value>;

/// Which input convention a record follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStyle {
    /// `{instruction, context}` — Dolly-style
    Instruction,
    /// `{question, system_prompt}` — Orca/QA-style
    Qa,
}

/// The canonical prompt fields extracted from a record,
/// independent of which convention it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFields {
    /// The primary instruction text (from 'instruction' or 'question')
    pub instruction: String,

    /// Optional supplementary context (from 'context' or
    /// 'system_prompt'). None when absent or empty — the
    /// formatter omits the whole section in that case.
    pub context: Option<String>,

    /// The expected model output. No fallback field exists.
    pub response: String,
}

impl PromptFields {
    /// Resolve the canonical prompt fields from a record.
    ///
    /// Field resolution order:
    ///   1. 'instruction' present → Instruction style,
    ///      context read from 'context'
    ///   2. otherwise 'question'  → QA style,
    ///      context read from 'system_prompt'
    ///   3. neither → MissingField (fatal)
    ///
    /// 'response' must be present in either style.
    pub fn resolve(record: &Record) -> Result<Self, PreprocessError> {
        let (style, instruction) = match str_field(record, "instruction") {
            Some(text) => (InputStyle::Instruction, text),
            None => match str_field(record, "question") {
                Some(text) => (InputStyle::Qa, text),
                None => return Err(PreprocessError::missing("instruction", "question")),
            },
        };

        // Each style has its own context field. Empty strings
        // count as "no context" so the formatter can omit the
        // section entirely.
        let context_key = match style {
            InputStyle::Instruction => "context",
            InputStyle::Qa          => "system_prompt",
        };
        let context = str_field(record, context_key)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let response = str_field(record, "response")
            .ok_or_else(|| PreprocessError::missing_no_fallback("response"))?;

        Ok(Self {
            instruction: instruction.to_string(),
            context,
            response: response.to_string(),
        })
    }
}

/// Read a field as a string slice.
/// Returns None when the key is absent OR the value is not a
/// string (null, number, ...) — only genuine string content
/// participates in prompt building.
fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_instruction_style() {
        let r = record(json!({
            "instruction": "Summarise this",
            "context": "Some passage",
            "response": "A summary",
        }));
        let fields = PromptFields::resolve(&r).unwrap();
        assert_eq!(fields.instruction, "Summarise this");
        assert_eq!(fields.context.as_deref(), Some("Some passage"));
        assert_eq!(fields.response, "A summary");
    }

    #[test]
    fn test_qa_style_fallback() {
        let r = record(json!({
            "question": "What is Rust?",
            "system_prompt": "You are a helpful assistant.",
            "response": "A systems language.",
        }));
        let fields = PromptFields::resolve(&r).unwrap();
        assert_eq!(fields.instruction, "What is Rust?");
        assert_eq!(fields.context.as_deref(), Some("You are a helpful assistant."));
    }

    #[test]
    fn test_empty_context_resolves_to_none() {
        let r = record(json!({
            "instruction": "A",
            "context": "",
            "response": "B",
        }));
        let fields = PromptFields::resolve(&r).unwrap();
        assert_eq!(fields.context, None);
    }

    #[test]
    fn test_absent_context_resolves_to_none() {
        let r = record(json!({ "instruction": "A", "response": "B" }));
        let fields = PromptFields::resolve(&r).unwrap();
        assert_eq!(fields.context, None);
    }

    #[test]
    fn test_null_instruction_counts_as_absent() {
        // Only string values participate — a null 'instruction'
        // must fall through to 'question'.
        let r = record(json!({
            "instruction": null,
            "question": "Q",
            "response": "R",
        }));
        let fields = PromptFields::resolve(&r).unwrap();
        assert_eq!(fields.instruction, "Q");
    }

    #[test]
    fn test_missing_both_instruction_fields_is_fatal() {
        let r = record(json!({ "response": "B" }));
        let err = PromptFields::resolve(&r).unwrap_err();
        assert!(matches!(err, PreprocessError::MissingField { .. }));
    }

    #[test]
    fn test_missing_response_is_fatal() {
        let r = record(json!({ "instruction": "A" }));
        let err = PromptFields::resolve(&r).unwrap_err();
        assert!(matches!(err, PreprocessError::MissingField { ref field, .. } if field == "response"));
    }
}
