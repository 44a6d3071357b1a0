// ============================================================
// Layer 6 — Adapter Store
// ============================================================
// Persistence for model weights on both ends of a run:
//
//   load_base_weights — restores the pretrained base record
//                       from the model directory, when one is
//                       shipped (`base_model.mpk.gz`). Without
//                       it the run starts from random weights,
//                       which is still useful for pipeline
//                       smoke runs.
//
//   save              — writes the fine-tuned record plus the
//                       two JSON configs needed to rebuild it:
//                         adapter_model.mpk.gz
//                         adapter_config.json   (LoRA shapes)
//                         finetune_config.json  (run settings)
//
// Burn's CompactRecorder serialises module records to
// gzip-compressed MessagePack; loading fails loudly when the
// architecture doesn't match the record.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::PathBuf};

use crate::application::finetune_use_case::FinetuneConfig;
use crate::ml::lora::LoraConfig;
use crate::ml::model::CausalLmModel;

pub struct AdapterStore {
    /// Directory holding the pretrained model inputs
    model_dir: PathBuf,
    /// Directory the fine-tuned adapter is written to
    output_dir: PathBuf,
}

impl AdapterStore {
    pub fn new(model_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).ok();
        Self { model_dir: model_dir.into(), output_dir }
    }

    /// Load pretrained base weights into the model, if the
    /// model directory ships a record. Returns the model
    /// unchanged (with a warning) when it doesn't.
    pub fn load_base_weights<B: Backend>(
        &self,
        model:  CausalLmModel<B>,
        device: &B::Device,
    ) -> Result<CausalLmModel<B>> {
        let path = self.model_dir.join("base_model");

        if !self.model_dir.join("base_model.mpk.gz").exists() {
            tracing::warn!(
                "No base weight record in '{}' — starting from random initialization",
                self.model_dir.display(),
            );
            return Ok(model);
        }

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "cannot load base weights '{}' (architecture mismatch?)",
                    path.display()
                )
            })?;

        tracing::info!("Loaded base weights from '{}'", path.display());
        Ok(model.load_record(record))
    }

    /// Persist the fine-tuned model record and its configs.
    pub fn save<B: AutodiffBackend>(
        &self,
        model: &CausalLmModel<B>,
        cfg:   &FinetuneConfig,
        lora:  &LoraConfig,
    ) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("cannot create '{}'", self.output_dir.display()))?;

        let weights_path = self.output_dir.join("adapter_model");
        CompactRecorder::new()
            .record(model.clone().into_record(), weights_path.clone())
            .with_context(|| {
                format!("failed to save adapter to '{}'", weights_path.display())
            })?;

        // The adapter shapes, so inference can rebuild the
        // adapted modules before loading the record.
        let adapter_path = self.output_dir.join("adapter_config.json");
        fs::write(&adapter_path, serde_json::to_string_pretty(lora)?)
            .with_context(|| format!("cannot write '{}'", adapter_path.display()))?;

        // The full run configuration, for provenance.
        let config_path = self.output_dir.join("finetune_config.json");
        fs::write(&config_path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("cannot write '{}'", config_path.display()))?;

        tracing::info!("Adapter saved to '{}'", self.output_dir.display());
        Ok(())
    }
}
