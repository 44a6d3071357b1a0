// ============================================================
// Layer 5 — Fine-Tuning Loop
// ============================================================
// Step-bounded supervised fine-tuning over the preprocessed
// dataset. Differences from a classic epoch loop:
//
//   - the run ends after max_steps optimizer steps, cycling
//     the dataset as many times as needed (short adapter runs
//     are measured in steps, not epochs)
//   - gradients are accumulated over grad_accum_steps
//     micro-batches before each optimizer step, trading
//     wall-clock for a larger effective batch
//   - the learning rate warms up linearly over warmup_steps
//
// Only the LoRA adapter parameters have require_grad set, so
// the Adam step leaves the frozen base untouched.
//
// Reference: Burn Book §5 (Training)
//            Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::{AdamConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::finetune_use_case::FinetuneConfig;
use crate::data::batcher::{SftBatcher, SftDataset};
use crate::infra::adapter_store::AdapterStore;
use crate::infra::metrics::{MetricsLogger, StepMetrics};
use crate::ml::lora::LoraConfig;
use crate::ml::model::CausalLmConfig;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub fn run_training(
    cfg:           &FinetuneConfig,
    model_cfg:     &CausalLmConfig,
    lora:          &LoraConfig,
    dataset:       SftDataset,
    pad_id:        u32,
    adapter_store: AdapterStore,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, model_cfg, lora, dataset, pad_id, adapter_store, device)
}

fn train_loop(
    cfg:           &FinetuneConfig,
    model_cfg:     &CausalLmConfig,
    lora:          &LoraConfig,
    dataset:       SftDataset,
    pad_id:        u32,
    adapter_store: AdapterStore,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<()> {
    use burn::data::dataset::Dataset as _;
    if dataset.len() == 0 {
        bail!("no training examples left after preprocessing");
    }

    // ── Build model + adapter ─────────────────────────────────────────────────
    let mut model = model_cfg.init::<MyBackend>(lora, &device);
    model = adapter_store.load_base_weights(model, &device)?;

    // The original PEFT recipe's parameter accounting: only
    // the adapter should show up as trainable.
    let (trainable, total) = model.parameter_counts();
    tracing::info!(
        "all params: {} || trainable params: {} || trainable%: {:.4}",
        total,
        trainable,
        100.0 * trainable as f64 / total as f64,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();
    let mut accumulator = GradientsAccumulator::new();

    // ── Training data loader ──────────────────────────────────────────────────
    let batcher = SftBatcher::new(pad_id);
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    let metrics = MetricsLogger::new(&cfg.output_dir)?;

    // ── Step loop ─────────────────────────────────────────────────────────────
    tracing::info!("Training for {} steps...", cfg.max_steps);

    let mut step          = 0usize;
    let mut micro_batches = 0usize;
    let mut loss_window   = 0.0f64;

    'training: loop {
        // Cycle the dataset until the step budget is spent.
        for batch in loader.iter() {
            let loss = model.forward_loss(batch.input_ids, pad_id as usize);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_window += loss_val;
            micro_batches += 1;

            let grads = loss.backward();
            accumulator.accumulate(&model, GradientsParams::from_grads(grads, &model));

            // One optimizer step per grad_accum_steps micro-batches
            if micro_batches % cfg.grad_accum_steps != 0 {
                continue;
            }

            step += 1;
            let lr = warmup_lr(cfg.learning_rate, step, cfg.warmup_steps);
            model = optim.step(lr, model, accumulator.grads());

            if step % cfg.logging_steps == 0 {
                let window = (cfg.logging_steps * cfg.grad_accum_steps) as f64;
                let avg_loss = loss_window / window;
                loss_window = 0.0;

                println!(
                    "Step {:>4}/{} | loss={:.4} | lr={:.2e}",
                    step, cfg.max_steps, avg_loss, lr,
                );
                metrics.log(&StepMetrics { step, loss: avg_loss, lr })?;
            }

            if step >= cfg.max_steps {
                break 'training;
            }
        }
    }

    // ── Save the fine-tuned adapter ───────────────────────────────────────────
    tracing::info!("Saving adapter to '{}'", cfg.output_dir);
    adapter_store.save(&model, cfg, lora)?;

    tracing::info!("Training complete!");
    Ok(())
}

/// Linear warmup: ramp from lr/warmup_steps up to `base_lr`
/// over the first warmup_steps optimizer steps.
fn warmup_lr(base_lr: f64, step: usize, warmup_steps: usize) -> f64 {
    if warmup_steps == 0 || step >= warmup_steps {
        base_lr
    } else {
        base_lr * step as f64 / warmup_steps as f64
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_ramps_linearly() {
        assert_eq!(warmup_lr(2e-4, 1, 2), 1e-4);
        assert_eq!(warmup_lr(2e-4, 2, 2), 2e-4);
        assert_eq!(warmup_lr(2e-4, 50, 2), 2e-4);
    }

    #[test]
    fn test_zero_warmup_uses_base_lr_immediately() {
        assert_eq!(warmup_lr(2e-4, 1, 0), 2e-4);
    }
}
