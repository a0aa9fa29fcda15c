// ============================================================
// Layer 3 — Pretrained Model Identifiers
// ============================================================
// The closed set of BERT checkpoints the encoder can wrap.
// Two properties are derived from the identifier:
//   - whether the tokenizer lowercases its input
//   - whether the model is a "base" (768) or "large" (1024) model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BertNmtError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BertName {
    BertBaseCased,
    BertBaseUncased,
    BertLargeCased,
    BertLargeUncased,
    BertBaseMultilingualUncased,
    BertBaseMultilingualCased,
    BertBaseChinese,
}

impl BertName {
    pub const ALL: [BertName; 7] = [
        BertName::BertBaseCased,
        BertName::BertBaseUncased,
        BertName::BertLargeCased,
        BertName::BertLargeUncased,
        BertName::BertBaseMultilingualUncased,
        BertName::BertBaseMultilingualCased,
        BertName::BertBaseChinese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BertName::BertBaseCased               => "bert-base-cased",
            BertName::BertBaseUncased             => "bert-base-uncased",
            BertName::BertLargeCased              => "bert-large-cased",
            BertName::BertLargeUncased            => "bert-large-uncased",
            BertName::BertBaseMultilingualUncased => "bert-base-multilingual-uncased",
            BertName::BertBaseMultilingualCased   => "bert-base-multilingual-cased",
            BertName::BertBaseChinese             => "bert-base-chinese",
        }
    }

    /// Chinese and explicitly uncased checkpoints were trained on lowercased text.
    pub fn lowercase(&self) -> bool {
        *self == BertName::BertBaseChinese || self.as_str().contains("uncased")
    }

    pub fn is_base(&self) -> bool {
        self.as_str().contains("base")
    }

    /// Hidden size of the checkpoint, which the decoder width must match.
    pub fn hidden_size(&self) -> usize {
        if self.is_base() { 768 } else { 1024 }
    }
}

impl Default for BertName {
    fn default() -> Self {
        BertName::BertBaseUncased
    }
}

impl fmt::Display for BertName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BertName {
    type Err = BertNmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BertName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| BertNmtError::UnknownBertName(s.to_string()))
    }
}
