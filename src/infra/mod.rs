// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches files on disk:
//
//   tokenizer_store.rs — WordPiece tokenizer over a BERT vocab.txt
//   pretrained.rs      — Resolves a BERT identifier to its vocab,
//                        config and weights
//   checkpoint.rs      — Saves and restores the full translation
//                        model with Burn's CompactRecorder
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pretrained BERT files
pub mod pretrained;

/// BERT WordPiece tokenizer construction
pub mod tokenizer_store;
