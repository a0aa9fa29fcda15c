// ============================================================
// Error Types
// ============================================================
// Every fallible library operation returns BertNmtError.
// The CLI layer wraps these with anyhow context before they
// reach the user.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BertNmtError {
    /// Source and target dictionaries disagree on a special index.
    #[error("{symbol} index mismatch: source dictionary has {src_index}, target dictionary has {tgt_index}")]
    SpecialIndexMismatch {
        symbol:    &'static str,
        src_index: u32,
        tgt_index: u32,
    },

    #[error("Could not infer language pair from '{}', please provide it explicitly", .0.display())]
    LanguagePair(PathBuf),

    #[error("Unknown pretrained BERT model: {0}")]
    UnknownBertName(String),

    #[error("Unknown {kind}: {name}")]
    UnknownRegistryName { kind: &'static str, name: String },

    #[error("Cannot interpret '{0}' as a boolean")]
    InvalidBool(String),

    #[error("bert layer {layer} is out of range for a model with {num_layers} layers")]
    InvalidBertLayer { layer: i64, num_layers: usize },

    #[error("Incorrect dictionary format in '{}' line {line}: expected '<symbol> <count>', got '{content}'", .path.display())]
    DictionaryFormat {
        path:    PathBuf,
        line:    usize,
        content: String,
    },

    #[error("Duplicate symbol '{symbol}' in '{}'", .path.display())]
    DuplicateSymbol { path: PathBuf, symbol: String },

    #[error("Source has {len} tokens but BERT has only {max} positions")]
    SourceTooLong { len: usize, max: usize },

    #[error("Unsupported configuration: {0}")]
    Unsupported(&'static str),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Pretrained model error: {0}")]
    Pretrained(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BertNmtError>;
