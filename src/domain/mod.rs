// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and traits describing instruction data —
// the core vocabulary of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO ML-specific code
//   - Only plain Rust structs, enums, and traits
//
// Why keep this layer pure?
//   - Easy to unit test (no GPU needed)
//   - Easy to understand (no framework noise)
//   - Easy to swap implementations (just implement the trait)
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A flexible-keyed training record and the prompt-field resolver
pub mod record;

// The error taxonomy for the preprocessing pipeline
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;
