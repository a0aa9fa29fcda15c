// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw text and tensor batches:
//
//   source line ──▶ BertBasedDictionary ──┐
//                                         ├──▶ TranslationBatcher ──▶ tensors
//   target line ──▶ Dictionary ───────────┘
//                   (Bert-compatible layout)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Frequency-annotated symbol table
pub mod dictionary;

/// Target dictionary constructors in the BERT index layout
pub mod bert_compatible;

/// Source dictionary backed by the BERT tokenizer
pub mod bert_based;

/// Reads the language pair off binarized file names
pub mod language_pair;

/// Implements Burn's Batcher trait for sentence pairs
pub mod batcher;
