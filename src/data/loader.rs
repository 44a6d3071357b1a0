// ============================================================
// Layer 4 — JSONL Loader
// ============================================================
// Loads an instruction dataset from a JSON Lines file:
// one JSON object per line, flexible key sets per record.
//
// Blank lines are skipped (trailing newlines are common);
// anything else that fails to parse as a JSON object is a
// hard error carrying the line number — a half-read corpus
// is worse than no corpus.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::record::Record;
use crate::domain::traits::ExampleSource;

/// Loads records from a .jsonl file.
/// Implements the ExampleSource trait from Layer 3.
pub struct JsonlLoader {
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<Record>> {
        let file = File::open(&self.path)
            .with_context(|| format!("cannot open dataset '{}'", self.path.display()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line
                .with_context(|| format!("cannot read '{}'", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }

            let value: serde_json::Value = serde_json::from_str(&line)
                .with_context(|| {
                    format!("invalid JSON on line {} of '{}'", index + 1, self.path.display())
                })?;

            match value {
                serde_json::Value::Object(record) => records.push(record),
                other => bail!(
                    "line {} of '{}' is not a JSON object (found {})",
                    index + 1,
                    self.path.display(),
                    match other {
                        serde_json::Value::Array(_)  => "an array",
                        serde_json::Value::String(_) => "a string",
                        _ => "a scalar",
                    },
                ),
            }
        }

        tracing::info!(
            "Loaded {} records from '{}'",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_records_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"instruction": "first", "response": "a"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"question": "second", "response": "b"}}"#).unwrap();

        let records = JsonlLoader::new(file.path()).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["instruction"], "first");
        assert_eq!(records[1]["question"], "second");
    }

    #[test]
    fn test_non_object_line_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"["not", "an", "object"]"#).unwrap();
        assert!(JsonlLoader::new(file.path()).load_all().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = JsonlLoader::new("does/not/exist.jsonl");
        assert!(loader.load_all().is_err());
    }
}
