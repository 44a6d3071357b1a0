// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `preview`
// and all their configurable flags.
//
// Every training flag can also be supplied through an
// environment variable (clap's env feature) — batch schedulers
// typically inject settings that way, while local runs use
// flags. Flags win when both are present.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::finetune_use_case::FinetuneConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a LoRA adapter on an instruction dataset
    Train(TrainArgs),

    /// Print the formatted prompt for the first records
    Preview(PreviewArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the instruction dataset (.jsonl, one record per line)
    #[arg(long, env = "DATASET_PATH")]
    pub dataset: String,

    /// Directory with the pretrained model
    /// (config.json, tokenizer.json, optional base_model record)
    #[arg(long, env = "MODEL_PATH")]
    pub model_dir: String,

    /// Directory the fine-tuned adapter is written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: String,

    /// Number of optimizer steps to train for
    #[arg(long, env = "MAX_STEPS", default_value_t = 20)]
    pub max_steps: usize,

    /// Shuffle seed — same seed, same dataset order
    #[arg(long, env = "SEED", default_value_t = 42)]
    pub seed: u64,

    /// Samples per forward pass
    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    /// Micro-batches accumulated per optimizer step
    #[arg(long, default_value_t = 4)]
    pub grad_accum_steps: usize,

    /// Steps of linear learning-rate warmup
    #[arg(long, default_value_t = 2)]
    pub warmup_steps: usize,

    /// Peak learning rate
    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    /// Log the averaged loss every this many steps
    #[arg(long, default_value_t = 4)]
    pub logging_steps: usize,

    /// LoRA rank — dimension of the update matrices
    #[arg(long, default_value_t = 16)]
    pub lora_r: usize,

    /// LoRA scaling numerator (effective scale = alpha / r)
    #[arg(long, default_value_t = 64)]
    pub lora_alpha: usize,

    /// Dropout probability on the adapter path
    #[arg(long, default_value_t = 0.1)]
    pub lora_dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer config.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for FinetuneConfig {
    fn from(a: TrainArgs) -> Self {
        FinetuneConfig {
            dataset_path:     a.dataset,
            model_dir:        a.model_dir,
            output_dir:       a.output_dir,
            max_steps:        a.max_steps,
            seed:             a.seed,
            batch_size:       a.batch_size,
            grad_accum_steps: a.grad_accum_steps,
            warmup_steps:     a.warmup_steps,
            learning_rate:    a.lr,
            logging_steps:    a.logging_steps,
            lora_r:           a.lora_r,
            lora_alpha:       a.lora_alpha,
            lora_dropout:     a.lora_dropout,
        }
    }
}

/// All arguments for the `preview` command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to the instruction dataset (.jsonl)
    #[arg(long, env = "DATASET_PATH")]
    pub dataset: String,

    /// How many records to format
    #[arg(long, default_value_t = 3)]
    pub limit: usize,
}
