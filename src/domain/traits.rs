// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code
// that uses them. For example:
//   - JsonlLoader implements ExampleSource
//   - A future ParquetLoader could also implement it
//   - The application layer only sees ExampleSource
//     and works with both without any changes
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::record::Record;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can load raw training records.
///
/// Implementations:
///   - JsonlLoader → loads from a JSON Lines file
///   - (future) ParquetLoader → loads from Parquet datasets
pub trait ExampleSource {
    /// Load all available records from this source, in file order.
    fn load_all(&self) -> Result<Vec<Record>>;
}
