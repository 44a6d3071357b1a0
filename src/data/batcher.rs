// ============================================================
// Layer 4 — SFT Batcher (Collator)
// ============================================================
// Converts tokenized samples into padded tensor batches for
// the training loop. Padding was deliberately NOT done at the
// tokenize stage: padding here, per batch, means each batch is
// only as wide as its own longest sequence instead of the
// global maximum — less wasted compute on pad tokens.
//
//   Input:  Vec of N SftSamples with ragged lengths
//   Output: SftBatch with tensors of shape [N, longest]
//
// Pad positions get pad_id in input_ids and 0 in the
// attention mask; the loss ignores them (see ml::model).
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::tokenize::{ATTENTION_MASK_COLUMN, INPUT_IDS_COLUMN};
use crate::domain::record::Record;

// ─── SftSample ────────────────────────────────────────────────────────────────
/// One tokenized, unpadded training sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl SftSample {
    /// Extract the typed sample from a pipeline output record.
    /// Returns None when the token columns are missing or not
    /// integer arrays (the pipeline never produces that, so a
    /// None here means the caller skipped preprocessing).
    pub fn from_record(record: &Record) -> Option<Self> {
        let ids = int_column(record, INPUT_IDS_COLUMN)?;
        let mask = match record.get(ATTENTION_MASK_COLUMN) {
            // length-derived mask when the tokenizer emitted none
            None => vec![1; ids.len()],
            Some(_) => int_column(record, ATTENTION_MASK_COLUMN)?,
        };
        Some(Self { input_ids: ids, attention_mask: mask })
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

fn int_column(record: &Record, column: &str) -> Option<Vec<u32>> {
    record
        .get(column)?
        .as_array()?
        .iter()
        .map(|v| v.as_u64().map(|n| n as u32))
        .collect()
}

// ─── SftDataset ───────────────────────────────────────────────────────────────
/// Wraps the samples so Burn's DataLoader can index them.
pub struct SftDataset {
    samples: Vec<SftSample>,
}

impl SftDataset {
    pub fn new(samples: Vec<SftSample>) -> Self {
        Self { samples }
    }
}

impl Dataset<SftSample> for SftDataset {
    fn get(&self, index: usize) -> Option<SftSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── SftBatch ─────────────────────────────────────────────────────────────────
/// A padded batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SftBatch<B: Backend> {
    /// Token ids — shape [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,
}

// ─── SftBatcher ───────────────────────────────────────────────────────────────
// Stateless apart from the pad id; the target device arrives
// with each `batch` call from the data loader.
#[derive(Clone, Debug)]
pub struct SftBatcher {
    pub pad_id: u32,
}

impl SftBatcher {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }
}

/// Pad every sample to the longest sequence in the batch and
/// flatten row-major. Pure so it is testable without a device.
fn pad_to_longest(items: &[SftSample], pad_id: u32) -> (Vec<i32>, Vec<i32>, usize) {
    let seq_len = items.iter().map(SftSample::len).max().unwrap_or(0);

    let mut ids_flat  = Vec::with_capacity(items.len() * seq_len);
    let mut mask_flat = Vec::with_capacity(items.len() * seq_len);

    for sample in items {
        for position in 0..seq_len {
            match sample.input_ids.get(position) {
                Some(&id) => {
                    ids_flat.push(id as i32);
                    mask_flat.push(
                        sample.attention_mask.get(position).copied().unwrap_or(1) as i32,
                    );
                }
                None => {
                    ids_flat.push(pad_id as i32);
                    mask_flat.push(0);
                }
            }
        }
    }

    (ids_flat, mask_flat, seq_len)
}

impl<B: Backend> Batcher<B, SftSample, SftBatch<B>> for SftBatcher {
    fn batch(&self, items: Vec<SftSample>, device: &B::Device) -> SftBatch<B> {
        let batch_size = items.len();
        let (ids_flat, mask_flat, seq_len) = pad_to_longest(&items, self.pad_id);

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            ids_flat.as_slice(), device,
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), device,
        ).reshape([batch_size, seq_len]);

        SftBatch { input_ids, attention_mask }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_from_record() {
        let record = json!({
            "input_ids": [5, 6, 7],
            "attention_mask": [1, 1, 1],
            "category": "open_qa",
        })
        .as_object()
        .unwrap()
        .clone();

        let sample = SftSample::from_record(&record).unwrap();
        assert_eq!(sample.input_ids, vec![5, 6, 7]);
        assert_eq!(sample.attention_mask, vec![1, 1, 1]);
    }

    #[test]
    fn test_sample_without_token_columns_is_none() {
        let record = json!({ "instruction": "A" }).as_object().unwrap().clone();
        assert!(SftSample::from_record(&record).is_none());
    }

    #[test]
    fn test_batcher_meets_dataloader_contract() {
        // The data loader hands the device to each `batch`
        // call; the batcher itself carries no device state.
        fn dataloader_compatible<B, Bt>(_: &Bt)
        where
            B: Backend,
            Bt: Batcher<B, SftSample, SftBatch<B>>,
        {
        }
        dataloader_compatible::<burn::backend::Wgpu, _>(&SftBatcher::new(0));
    }

    #[test]
    fn test_padding_to_longest() {
        let items = vec![
            SftSample { input_ids: vec![1, 2],       attention_mask: vec![1, 1] },
            SftSample { input_ids: vec![3, 4, 5, 6], attention_mask: vec![1, 1, 1, 1] },
        ];
        let (ids, mask, seq_len) = pad_to_longest(&items, 0);

        assert_eq!(seq_len, 4);
        // First row padded out with pad_id=0 and mask 0
        assert_eq!(ids,  vec![1, 2, 0, 0, 3, 4, 5, 6]);
        assert_eq!(mask, vec![1, 1, 0, 0, 1, 1, 1, 1]);
    }
}
