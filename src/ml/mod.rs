// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly except the
// batcher in Layer 4 — keeping the framework surface small.
//
// What's in this layer:
//
//   model_config.rs — Wrapper over a pretrained model's
//                     config.json. Resolves the context
//                     window (max sequence length) across
//                     model families with differing field
//                     names.
//
//   lora.rs         — LoRA adapter: config, the adapted
//                     linear module (frozen base + trainable
//                     low-rank update), parameter accounting.
//
//   model.rs        — Decoder-only causal transformer with
//                     adapters on the attention projections
//                     and the shifted next-token loss.
//
//   trainer.rs      — Step-bounded fine-tuning loop with
//                     gradient accumulation and LR warmup.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hu et al. (2021) LoRA

/// Pretrained config.json wrapper and max-length resolution
pub mod model_config;

/// LoRA adapter configuration and module
pub mod lora;

/// Causal language model architecture
pub mod model;

/// Step-bounded fine-tuning loop
pub mod trainer;
