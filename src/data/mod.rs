// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from a raw .jsonl corpus
// all the way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   .jsonl records
//       │
//       ▼
//   JsonlLoader       → reads one JSON object per line
//       │
//       ▼
//   formatter         → builds the 'text' prompt column
//       │
//       ▼
//   BatchTokenizer    → text → input_ids (truncated, unpadded)
//       │
//       ▼
//   InstructDataset   → map / filter / shuffle over records
//       │
//       ▼
//   SftDataset        → implements Burn's Dataset trait
//       │
//       ▼
//   SftBatcher        → pads each batch, stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Loads records from a JSON Lines file
pub mod loader;

/// Builds the fixed instruction prompt per record
pub mod formatter;

/// Ordered record collection with map / filter / shuffle
pub mod dataset;

/// Truncation-only batch tokenization
pub mod tokenize;

/// The fixed four-stage preprocessing pipeline
pub mod pipeline;

/// Pads batches and implements Burn's Dataset/Batcher traits
pub mod batcher;
