// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe what the system
// works with: pretrained model identifiers and the vocabulary
// contract shared by both dictionaries.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// The supported pretrained BERT checkpoints
pub mod bert_name;

/// The vocabulary contract (pad/unk/bos/eos, encode, decode)
pub mod traits;
