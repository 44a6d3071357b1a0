// ============================================================
// Layer 4 — Instruction Dataset
// ============================================================
// An ordered collection of records, closed under the four
// transformations the preprocessing pipeline needs:
//
//   map          — per-record transform (may fail fatally)
//   map_batched  — batched transform that can also drop columns
//   filter       — keep records matching a predicate
//   shuffle      — deterministic reorder from a seed
//
// Every operation takes &self and returns a NEW dataset; the
// original is never mutated. Later pipeline stages depend on
// columns produced by earlier ones, so this immutability is
// what makes the stage ordering auditable.
//
// Shuffling uses a seeded StdRng with Fisher-Yates
// (rand::seq::SliceRandom), so a given (seed, input) pair
// always produces the same final order — training runs are
// reproducible.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            rand crate documentation

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::errors::PreprocessError;
use crate::domain::record::Record;

/// An ordered, immutable collection of training records.
#[derive(Debug, Clone, Default)]
pub struct InstructDataset {
    records: Vec<Record>,
}

impl InstructDataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// The union of column names across all records, sorted.
    /// Records have flexible key sets, so the union (not the
    /// first record) is what callers need when deciding which
    /// columns to drop after tokenization.
    pub fn column_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect();
        names.into_iter().collect()
    }

    /// Apply `f` to every record, producing a new dataset.
    /// The first failing record aborts the whole map — there is
    /// no per-record skip or recovery.
    pub fn map<F>(&self, f: F) -> Result<Self, PreprocessError>
    where
        F: Fn(&Record) -> Result<Record, PreprocessError>,
    {
        let records = self
            .records
            .iter()
            .map(|r| f(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(records))
    }

    /// Apply a batched transform, then drop `remove_columns`
    /// from every output record.
    ///
    /// `f` receives up to `batch_size` records at a time and
    /// must return one map of NEW columns per input record
    /// (same order, same count). New columns are merged over
    /// the originals before the removal list is applied —
    /// callers typically drop the raw text columns here since
    /// nothing downstream needs them.
    pub fn map_batched<F>(
        &self,
        batch_size:     usize,
        f:              F,
        remove_columns: &[String],
    ) -> Result<Self, PreprocessError>
    where
        F: Fn(&[Record]) -> Result<Vec<Record>, PreprocessError>,
    {
        assert!(batch_size > 0, "batch_size must be positive");

        let mut records = Vec::with_capacity(self.records.len());

        for batch in self.records.chunks(batch_size) {
            let outputs = f(batch)?;
            assert_eq!(
                outputs.len(),
                batch.len(),
                "batched transform must return one output per input record",
            );

            for (original, new_columns) in batch.iter().zip(outputs) {
                let mut merged = original.clone();
                for (key, value) in new_columns {
                    merged.insert(key, value);
                }
                for column in remove_columns {
                    merged.remove(column);
                }
                records.push(merged);
            }
        }

        Ok(Self::new(records))
    }

    /// Keep only records matching the predicate.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool,
    {
        let records = self
            .records
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        Self::new(records)
    }

    /// Return a reordered copy. Same seed + same input order →
    /// same output order, across runs and machines.
    pub fn shuffle(&self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut records = self.records.clone();
        records.shuffle(&mut rng);
        Self::new(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn dataset(n: usize) -> InstructDataset {
        let records = (0..n)
            .map(|i| {
                json!({ "instruction": format!("task {i}"), "response": "r" })
                    .as_object()
                    .unwrap()
                    .clone()
            })
            .collect();
        InstructDataset::new(records)
    }

    fn instructions(ds: &InstructDataset) -> Vec<String> {
        ds.records()
            .iter()
            .map(|r| r["instruction"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_map_produces_new_dataset() {
        let ds = dataset(3);
        let mapped = ds
            .map(|r| {
                let mut out = r.clone();
                out.insert("extra".into(), json!(1));
                Ok(out)
            })
            .unwrap();
        // Original untouched, mapped has the new column
        assert!(ds.get(0).unwrap().get("extra").is_none());
        assert!(mapped.get(0).unwrap().get("extra").is_some());
    }

    #[test]
    fn test_map_aborts_on_first_error() {
        let ds = dataset(5);
        let result = ds.map(|r| {
            if r["instruction"] == json!("task 2") {
                Err(PreprocessError::missing_no_fallback("response"))
            } else {
                Ok(r.clone())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_map_batched_merges_and_removes() {
        let ds = dataset(5);
        let out = ds
            .map_batched(
                2, // exercises an uneven final batch
                |batch| {
                    Ok(batch
                        .iter()
                        .map(|_| {
                            json!({ "input_ids": [1, 2, 3] })
                                .as_object()
                                .unwrap()
                                .clone()
                        })
                        .collect())
                },
                &["instruction".to_string()],
            )
            .unwrap();

        assert_eq!(out.len(), 5);
        for record in out.records() {
            assert!(record.get("input_ids").is_some());
            assert!(record.get("instruction").is_none());
            // untouched columns survive
            assert_eq!(record.get("response"), Some(&Value::String("r".into())));
        }
    }

    #[test]
    fn test_filter_keeps_matching_records() {
        let ds = dataset(10);
        let kept = ds.filter(|r| r["instruction"].as_str().unwrap().ends_with('3'));
        assert_eq!(kept.len(), 1);
        assert_eq!(ds.len(), 10);
    }

    #[test]
    fn test_shuffle_is_deterministic_per_seed() {
        let ds = dataset(20);
        assert_eq!(instructions(&ds.shuffle(42)), instructions(&ds.shuffle(42)));
    }

    #[test]
    fn test_shuffle_differs_across_seeds() {
        // With 20 records two seeds agreeing is ~1/20! — treat
        // a collision as a real failure.
        let ds = dataset(20);
        assert_ne!(instructions(&ds.shuffle(42)), instructions(&ds.shuffle(43)));
    }

    #[test]
    fn test_column_names_is_union() {
        let mut records = dataset(1).records().to_vec();
        records.push(
            json!({ "question": "q", "response": "r", "category": "qa" })
                .as_object()
                .unwrap()
                .clone(),
        );
        let ds = InstructDataset::new(records);
        assert_eq!(
            ds.column_names(),
            vec!["category", "instruction", "question", "response"]
        );
    }
}
