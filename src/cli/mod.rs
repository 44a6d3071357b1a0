// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — fine-tunes a LoRA adapter on a dataset
//   2. `preview` — prints formatted prompts without training
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PreviewArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "instruct-lora",
    version = "0.1.0",
    about = "Fine-tune a causal language model on instruction data with a LoRA adapter."
)]
pub struct Cli {
    /// The subcommand to run (train or preview)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => Self::run_train(args),
            Commands::Preview(args) => Self::run_preview(args),
        }
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a FinetuneConfig and hands off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::finetune_use_case::FinetuneUseCase;

        tracing::info!("Starting fine-tuning on dataset: {}", args.dataset);

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = FinetuneUseCase::new(args.into());
        use_case.execute()?;

        println!("Fine-tuning complete. Adapter saved.");
        Ok(())
    }

    /// Handles the `preview` subcommand.
    /// Formats the first records and prints them.
    fn run_preview(args: PreviewArgs) -> Result<()> {
        use crate::application::preview_use_case::PreviewUseCase;

        let use_case = PreviewUseCase::new(args.dataset, args.limit);

        for (index, prompt) in use_case.prompts()?.iter().enumerate() {
            println!("─── Record {} ───", index);
            println!("{prompt}\n");
        }
        Ok(())
    }
}
