// ============================================================
// Layer 2 — PreviewUseCase
// ============================================================
// Formats the first few records of a corpus WITHOUT training,
// so the exact prompt layout the model will learn can be
// inspected before committing GPU hours to it. Uses the same
// formatter as the real pipeline — what you see is what
// trains.

use anyhow::Result;

use crate::data::{formatter::format_prompt, loader::JsonlLoader};
use crate::domain::traits::ExampleSource;

pub struct PreviewUseCase {
    dataset_path: String,
    limit:        usize,
}

impl PreviewUseCase {
    pub fn new(dataset_path: impl Into<String>, limit: usize) -> Self {
        Self { dataset_path: dataset_path.into(), limit }
    }

    /// Return the formatted prompt for the first `limit`
    /// records. A malformed record fails here exactly as it
    /// would fail the training run.
    pub fn prompts(&self) -> Result<Vec<String>> {
        let records = JsonlLoader::new(&self.dataset_path).load_all()?;

        records
            .iter()
            .take(self.limit)
            .map(|record| Ok(format_prompt(record)?))
            .collect()
    }
}
