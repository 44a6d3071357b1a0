// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file at each logging
// interval. CSV because it opens anywhere and plots learning
// curves without tooling.
//
// Metrics recorded per logged step:
//   - step: the optimizer step number
//   - loss: average loss since the previous logged step
//   - lr:   the learning rate used at this step
//
// Output file: {output_dir}/metrics.csv
//
// Example:
//   step,loss,lr
//   4,9.871232,0.000200
//   8,9.614501,0.000200
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics at a logging interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Optimizer step number (after gradient accumulation)
    pub step: usize,

    /// Average training loss over the interval
    pub loss: f64,

    /// Learning rate applied at this step (includes warmup)
    pub lr: f64,
}

/// Appends step metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, writing the CSV header if the file
    /// doesn't exist yet (appending across runs is allowed).
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,loss,lr")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{},{:.6},{:.6}", m.step, m.loss, m.lr)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
