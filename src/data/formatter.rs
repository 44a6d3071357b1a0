// ============================================================
// Layer 4 — Prompt Formatter
// ============================================================
// Turns one raw record into the flat prompt string the model
// is trained to imitate. The layout is fixed:
//
//   <intro blurb>
//
//   ### Instruction:
//   <instruction or question>
//
//   Input:                          ← omitted when no context
//   <context or system_prompt>
//
//   ### Response:
//   <response>
//
//   ### End
//
// Sections are joined with a blank line. The order is
// significant: it defines the format the model learns and the
// format inference prompts must reproduce. When the resolved
// context is absent or empty the Input section disappears
// entirely (no empty section) — context is optional
// supplementary information.
//
// Formatting is a pure function of the record's fields, so it
// can run sequentially or in parallel with identical results.
//
// Reference: Taori et al. (2023) Alpaca prompt template

use serde_json::Value;

use crate::domain::errors::PreprocessError;
use crate::domain::record::{PromptFields, Record};

/// Fixed introductory sentence describing the task.
pub const INTRO_BLURB: &str =
    "Below is an instruction that describes a task. \
     Write a response that appropriately completes the request.";

/// Section label for the instruction text.
pub const INSTRUCTION_KEY: &str = "### Instruction:";

/// Section label for optional context.
pub const INPUT_KEY: &str = "Input:";

/// Section label for the expected output.
pub const RESPONSE_KEY: &str = "### Response:";

/// Fixed end marker closing every prompt.
pub const END_KEY: &str = "### End";

/// The name of the column this formatter adds.
pub const TEXT_COLUMN: &str = "text";

/// Build the prompt string for one record.
pub fn format_prompt(record: &Record) -> Result<String, PreprocessError> {
    let fields = PromptFields::resolve(record)?;

    let instruction = format!("{INSTRUCTION_KEY}\n{}", fields.instruction);
    let input       = fields.context.map(|c| format!("{INPUT_KEY}\n{c}"));
    let response    = format!("{RESPONSE_KEY}\n{}", fields.response);

    // Fixed order: blurb, instruction, [input], response, end.
    let parts = [
        Some(INTRO_BLURB.to_string()),
        Some(instruction),
        input,
        Some(response),
        Some(END_KEY.to_string()),
    ];

    Ok(parts.into_iter().flatten().collect::<Vec<_>>().join("\n\n"))
}

/// Return the record with a 'text' column added.
/// All original fields pass through unchanged (non-destructive
/// merge) — downstream stages decide which columns to drop.
pub fn with_prompt(record: &Record) -> Result<Record, PreprocessError> {
    let text = format_prompt(record)?;
    let mut out = record.clone();
    out.insert(TEXT_COLUMN.to_string(), Value::String(text));
    Ok(out)
}
