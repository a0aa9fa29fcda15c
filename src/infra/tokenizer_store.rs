// ============================================================
// Layer 6 — BERT Tokenizer Adapter
// ============================================================
// Builds a WordPiece tokenizer for a pretrained BERT vocabulary.
//
// vocab.txt holds one token per line; the line number is the id.
// From it we write a tokenizer JSON in Hugging Face format and
// load it through Tokenizer::from_str, so the pipeline is:
//
//   BertNormalizer (clean text, CJK spacing, optional lowercase)
//   BertPreTokenizer (whitespace + punctuation)
//   WordPiece (## continuation, [UNK] fallback)
//
// Never-split tokens are registered as added tokens. Added tokens
// are matched on raw text before normalisation, so they are
// neither lowercased nor split on the '#' punctuation. The `##`
// entries match only as whole words: "cat ##s" keeps "##s" but
// "a##s" is split as ordinary text.

use std::{fs, path::Path, str::FromStr};

use tokenizers::Tokenizer;

use crate::error::{BertNmtError, Result};

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// Unit and ordinal suffixes kept whole after a number ("21st", "5min").
const UNIT_SUFFIXES: [&str; 12] = [
    "st", "nd", "rd", "th",
    "mm", "m",
    "ns", "ms", "s", "min", "hr", "h",
];

/// Structural tokens, `##`-prefixed unit suffixes and `##0`..`##9`.
pub fn never_split_tokens() -> Vec<String> {
    let mut tokens: Vec<String> = [PAD_TOKEN, UNK_TOKEN, CLS_TOKEN, SEP_TOKEN]
        .iter()
        .map(|t| t.to_string())
        .collect();
    tokens.extend(UNIT_SUFFIXES.iter().map(|s| format!("##{s}")));
    tokens.extend((0..10).map(|d| format!("##{d}")));
    tokens
}

pub struct BertTokenizer {
    inner:     Tokenizer,
    lowercase: bool,
}

impl BertTokenizer {
    /// Read a BERT `vocab.txt` and build the tokenizer over it.
    pub fn from_vocab_file(path: &Path, lowercase: bool) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            BertNmtError::Tokenizer(format!("Cannot read vocabulary '{}': {e}", path.display()))
        })?;
        let tokens: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
        Self::from_vocab(&tokens, lowercase)
    }

    /// Build the tokenizer from an in-memory vocabulary (index = position).
    pub fn from_vocab(tokens: &[String], lowercase: bool) -> Result<Self> {
        let mut vocab = serde_json::Map::new();
        for (id, token) in tokens.iter().enumerate() {
            vocab.insert(token.clone(), serde_json::json!(id));
        }
        if !vocab.contains_key(UNK_TOKEN) {
            return Err(BertNmtError::Tokenizer(format!("vocabulary has no {UNK_TOKEN} token")));
        }

        // Only tokens the vocabulary actually has can be protected;
        // the rest would come out as [UNK] either way.
        let structural = [PAD_TOKEN, UNK_TOKEN, CLS_TOKEN, SEP_TOKEN];
        let added_tokens: Vec<serde_json::Value> = never_split_tokens()
            .into_iter()
            .filter_map(|token| {
                let id = vocab.get(&token)?.clone();
                Some(serde_json::json!({
                    "id":          id,
                    "content":     token,
                    "single_word": token.starts_with("##"),
                    "lstrip":      false,
                    "rstrip":      false,
                    "normalized":  false,
                    "special":     structural.contains(&token.as_str()),
                }))
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": lowercase
            },
            "pre_tokenizer": {
                "type": "BertPreTokenizer"
            },
            "post_processor": null,
            "decoder": {
                "type": "WordPiece",
                "prefix": "##",
                "cleanup": true
            },
            "model": {
                "type": "WordPiece",
                "unk_token": UNK_TOKEN,
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": vocab
            }
        });

        let inner = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| BertNmtError::Tokenizer(format!("Cannot build tokenizer: {e}")))?;
        Ok(Self { inner, lowercase })
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    /// Split text into WordPiece tokens, without structural tokens.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| BertNmtError::Tokenizer(format!("Cannot tokenize '{text}': {e}")))?;
        Ok(encoding.get_tokens().to_vec())
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    /// Tokens missing from the vocabulary map to the [UNK] id.
    pub fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        let unk = self.inner.token_to_id(UNK_TOKEN).unwrap_or(0);
        tokens
            .iter()
            .map(|t| self.inner.token_to_id(t).unwrap_or(unk))
            .collect()
    }

    /// Ids outside the vocabulary map to [UNK].
    pub fn convert_ids_to_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.inner.id_to_token(id).unwrap_or_else(|| UNK_TOKEN.to_string()))
            .collect()
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tiny_vocab;

    #[test]
    fn test_never_split_list() {
        let tokens = never_split_tokens();
        assert_eq!(tokens.len(), 4 + 12 + 10);
        assert_eq!(&tokens[..4], &["[PAD]", "[UNK]", "[CLS]", "[SEP]"]);
        assert!(tokens.contains(&"##min".to_string()));
        assert!(tokens.contains(&"##7".to_string()));
    }

    #[test]
    fn test_lowercasing_follows_flag() {
        let vocab = tiny_vocab();
        let lower = BertTokenizer::from_vocab(&vocab, true).unwrap();
        let cased = BertTokenizer::from_vocab(&vocab, false).unwrap();
        assert_eq!(lower.tokenize("Hello World").unwrap(), vec!["hello", "world"]);
        assert_eq!(cased.tokenize("Hello World").unwrap(), vec!["Hello", "World"]);
    }

    #[test]
    fn test_wordpiece_continuations() {
        let tok = BertTokenizer::from_vocab(&tiny_vocab(), true).unwrap();
        assert_eq!(tok.tokenize("cats playing").unwrap(), vec!["cat", "##s", "play", "##ing"]);
    }

    #[test]
    fn test_structural_tokens_are_not_split() {
        let tok = BertTokenizer::from_vocab(&tiny_vocab(), true).unwrap();
        assert_eq!(tok.tokenize("[CLS] hello [SEP]").unwrap(), vec!["[CLS]", "hello", "[SEP]"]);
    }

    #[test]
    fn test_suffix_tokens_match_whole_words_only() {
        let tok = BertTokenizer::from_vocab(&tiny_vocab(), true).unwrap();
        assert_eq!(tok.tokenize("cat ##s").unwrap(), vec!["cat", "##s"]);
        assert_eq!(tok.tokenize("a##s").unwrap(), vec!["a", "#", "#", "s"]);
    }

    #[test]
    fn test_unknown_ids_and_tokens() {
        let tok = BertTokenizer::from_vocab(&tiny_vocab(), true).unwrap();
        assert_eq!(tok.convert_tokens_to_ids(&["zzz".to_string()]), vec![100]);
        assert_eq!(tok.convert_ids_to_tokens(&[1_000_000]), vec!["[UNK]"]);
    }

    #[test]
    fn test_vocab_without_unk_is_rejected() {
        let vocab = vec!["[PAD]".to_string(), "a".to_string()];
        assert!(BertTokenizer::from_vocab(&vocab, true).is_err());
    }
}
