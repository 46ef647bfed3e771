// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the matching task.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// Everything that reads files, runs a tokenizer or builds
// tensors lives in the data / ml / infra layers and talks
// to this layer through the traits below.

// A sentence pair read from a data file
pub mod example;

// Core abstractions (traits) that other layers implement
pub mod traits;
