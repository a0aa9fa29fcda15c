// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn module code lives here.
//
//   bert.rs     — the pretrained BERT encoder (all hidden layers)
//   encoder.rs  — BERT behind the encoder contract: padding mask,
//                 layer selection, [seq, batch, hidden] layout,
//                 beam reordering, optional freezing
//   decoder.rs  — burn's TransformerDecoder with target embeddings,
//                 positions and the output projection
//   model.rs    — encoder + decoder
//   arch.rs     — named architecture presets
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

/// Named hyperparameter presets
pub mod arch;

/// BERT encoder returning every encoded layer
pub mod bert;

/// Transformer decoder over the target dictionary
pub mod decoder;

/// BERT adapted to the translation encoder contract
pub mod encoder;

/// The full translation model
pub mod model;
