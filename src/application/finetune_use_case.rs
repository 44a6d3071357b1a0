// ============================================================
// Layer 2 — FinetuneUseCase
// ============================================================
// Orchestrates the full fine-tuning workflow in order:
//
//   Step 1: Load the .jsonl corpus        (Layer 4 - data)
//   Step 2: Load tokenizer + model config (Layer 6 - infra)
//   Step 3: Resolve the max length        (Layer 5 - ml)
//   Step 4: Preprocess the dataset        (Layer 4 - data)
//   Step 5: Build tensor samples          (Layer 4 - data)
//   Step 6: Train the adapter             (Layer 5 - ml)
//
// All settings arrive through FinetuneConfig — one explicit
// struct instead of scattered environment lookups, so a run
// is fully described by one serialisable value (it is saved
// next to the adapter for provenance).
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{SftDataset, SftSample},
    dataset::InstructDataset,
    formatter::TEXT_COLUMN,
    loader::JsonlLoader,
    pipeline::preprocess_dataset,
};
use crate::domain::traits::ExampleSource;
use crate::infra::{adapter_store::AdapterStore, tokenizer_store::TokenizerStore};
use crate::ml::{
    lora::LoraConfig,
    model::CausalLmConfig,
    model_config::PretrainedConfig,
    trainer::run_training,
};

// ─── Fine-Tuning Configuration ────────────────────────────────────────────────
// All settings for a fine-tuning run. Serialisable so it can
// be saved alongside the adapter and reloaded later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinetuneConfig {
    pub dataset_path:     String,
    pub model_dir:        String,
    pub output_dir:       String,
    pub max_steps:        usize,
    pub seed:             u64,
    pub batch_size:       usize,
    pub grad_accum_steps: usize,
    pub warmup_steps:     usize,
    pub learning_rate:    f64,
    pub logging_steps:    usize,
    pub lora_r:           usize,
    pub lora_alpha:       usize,
    pub lora_dropout:     f64,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            dataset_path:     "data/train.jsonl".to_string(),
            model_dir:        "model".to_string(),
            output_dir:       "outputs".to_string(),
            max_steps:        20,
            seed:             42,
            batch_size:       1,
            grad_accum_steps: 4,
            warmup_steps:     2,
            learning_rate:    2e-4,
            logging_steps:    4,
            lora_r:           16,
            lora_alpha:       64,
            lora_dropout:     0.1,
        }
    }
}

impl FinetuneConfig {
    pub fn lora(&self) -> LoraConfig {
        LoraConfig {
            r:       self.lora_r,
            alpha:   self.lora_alpha,
            dropout: self.lora_dropout,
            ..LoraConfig::default()
        }
    }
}

// ─── FinetuneUseCase ──────────────────────────────────────────────────────────
// Owns the config and runs the full workflow.
pub struct FinetuneUseCase {
    config: FinetuneConfig,
}

impl FinetuneUseCase {
    pub fn new(config: FinetuneConfig) -> Self {
        Self { config }
    }

    /// Execute the full fine-tuning workflow end to end.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let lora = cfg.lora();
        lora.validate()?;

        // ── Step 1: Load the instruction corpus ───────────────────────────────
        let loader  = JsonlLoader::new(&cfg.dataset_path);
        let dataset = InstructDataset::new(loader.load_all()?);
        tracing::info!("Number of prompts: {}", dataset.len());
        tracing::info!("Column names are: {:?}", dataset.column_names());

        // ── Step 2: Load tokenizer and pretrained config ──────────────────────
        let tok_store = TokenizerStore::new(&cfg.model_dir);
        let tokenizer = tok_store.load()?;
        let pad_id    = TokenizerStore::pad_token_id(&tokenizer);

        let pretrained = PretrainedConfig::from_model_dir(&cfg.model_dir)?;

        // ── Step 3: Resolve the truncation length ─────────────────────────────
        // Probes the model-family-specific config fields,
        // falling back to 1024 (see ml::model_config).
        let model_cfg  = CausalLmConfig::from_pretrained(&pretrained);
        let max_length = model_cfg.max_seq_len;

        // ── Step 4: Format → tokenize → filter → shuffle ──────────────────────
        // After tokenization the raw columns and the prompt
        // text have served their purpose — drop them all.
        let mut remove_columns = dataset.column_names();
        remove_columns.push(TEXT_COLUMN.to_string());

        let processed =
            preprocess_dataset(tokenizer, max_length, cfg.seed, &dataset, &remove_columns)?;

        // ── Step 5: Build tensor-ready samples ────────────────────────────────
        let samples: Vec<SftSample> = processed
            .records()
            .iter()
            .map(|record| {
                SftSample::from_record(record)
                    .ok_or_else(|| anyhow!("tokenized record lost its token columns"))
            })
            .collect::<Result<_>>()?;
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 6: Train and save the adapter ────────────────────────────────
        let store = AdapterStore::new(&cfg.model_dir, &cfg.output_dir);
        run_training(cfg, &model_cfg, &lora, SftDataset::new(samples), pad_id, store)?;

        Ok(())
    }
}
