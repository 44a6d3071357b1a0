// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns that don't belong in
// any specific business layer:
//
//   tokenizer_store.rs — Loads the pretrained tokenizer.json
//                        from the model directory and resolves
//                        a pad id (pad = eos when the
//                        vocabulary defines no pad token).
//
//   adapter_store.rs   — Loads the optional pretrained base
//                        record and saves the fine-tuned
//                        adapter (weights + adapter config +
//                        run config) to the output directory.
//
//   metrics.rs         — Training metrics logging. Writes
//                        step-level metrics (loss, lr) to a
//                        CSV file for later analysis.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Pretrained tokenizer loading and pad-id resolution
pub mod tokenizer_store;

/// Base weight loading and adapter checkpoint saving
pub mod adapter_store;

/// Training metrics CSV logger
pub mod metrics;
