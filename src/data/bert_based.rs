// ============================================================
// Layer 4 — Bert-Based Dictionary
// ============================================================
// The source-side vocabulary. It stores no symbols of its own:
// every index is whatever the BERT tokenizer assigns, and the
// special indices are read once from the tokenizer:
//
//   pad = [PAD]   unk = [UNK]   bos = [CLS]   eos = [SEP]
//
// encode_line produces exactly what BERT was trained on:
//   [CLS] subword subword ... [SEP]

use std::path::Path;

use crate::domain::bert_name::BertName;
use crate::domain::traits::Vocabulary;
use crate::error::{BertNmtError, Result};
use crate::infra::pretrained::PretrainedStore;
use crate::infra::tokenizer_store::{BertTokenizer, CLS_TOKEN, PAD_TOKEN, SEP_TOKEN, UNK_TOKEN};
use crate::ml::encoder::MAX_SOURCE_POSITIONS;

pub struct BertBasedDictionary {
    tokenizer: BertTokenizer,
    pad:       u32,
    unk:       u32,
    bos:       u32,
    eos:       u32,
    unk_word:  String,
}

impl BertBasedDictionary {
    /// Tokenizer for `name` from the pretrained store.
    pub fn new(name: BertName, store: &PretrainedStore) -> Result<Self> {
        Self::from_tokenizer(store.load_tokenizer(name)?)
    }

    /// Tokenizer for `name` over an explicit `vocab.txt`.
    pub fn from_vocab_file(name: BertName, vocab: &Path) -> Result<Self> {
        Self::from_tokenizer(BertTokenizer::from_vocab_file(vocab, name.lowercase())?)
    }

    pub fn from_tokenizer(tokenizer: BertTokenizer) -> Result<Self> {
        let lookup = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| BertNmtError::Tokenizer(format!("vocabulary has no {token} token")))
        };
        let (pad, unk, bos, eos) = (
            lookup(PAD_TOKEN)?,
            lookup(UNK_TOKEN)?,
            lookup(CLS_TOKEN)?,
            lookup(SEP_TOKEN)?,
        );
        Ok(Self { tokenizer, pad, unk, bos, eos, unk_word: "<unk>".to_string() })
    }

    pub fn tokenizer(&self) -> &BertTokenizer {
        &self.tokenizer
    }
}

impl Vocabulary for BertBasedDictionary {
    fn len(&self) -> usize {
        self.tokenizer.vocab_size()
    }

    fn pad(&self) -> u32 {
        self.pad
    }

    fn unk(&self) -> u32 {
        self.unk
    }

    fn bos(&self) -> u32 {
        self.bos
    }

    fn eos(&self) -> u32 {
        self.eos
    }

    fn unk_word(&self) -> &str {
        &self.unk_word
    }

    /// Overlong lines are reported but kept whole; BERT has no
    /// position embedding past 512, so the encoder rejects them.
    fn encode_line(&self, line: &str, reverse_order: bool) -> Result<Vec<u32>> {
        let mut words = self.tokenizer.tokenize(line)?;
        if words.len() > MAX_SOURCE_POSITIONS {
            tracing::warn!(
                "Line has {} subword tokens, more than BERT's {} positions: {}",
                words.len(), MAX_SOURCE_POSITIONS, line
            );
        }
        if reverse_order {
            words.reverse();
        }
        words.insert(0, CLS_TOKEN.to_string());
        words.push(SEP_TOKEN.to_string());
        Ok(self.tokenizer.convert_tokens_to_ids(&words))
    }

    fn string(&self, ids: &[u32], _bpe_symbol: Option<&str>, _escape_unk: bool) -> String {
        self.tokenizer.convert_ids_to_tokens(ids).join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bert_compatible::BertCompatibleDictionary;
    use crate::domain::traits::check_special_indices;
    use crate::test_support::{capture_logs, tiny_store};

    #[test]
    fn test_special_indices_come_from_tokenizer() {
        let (_dir, store) = tiny_store();
        let d = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        assert_eq!((d.pad(), d.unk(), d.bos(), d.eos()), (0, 100, 101, 102));
    }

    #[test]
    fn test_uncased_scenario_wraps_with_cls_sep() {
        let (_dir, store) = tiny_store();
        let d   = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let ids = d.encode_line("Hello World", false).unwrap();
        assert_eq!(d.string(&ids, None, false), "[CLS] hello world [SEP]");
    }

    #[test]
    fn test_cased_model_preserves_case() {
        let (_dir, store) = tiny_store();
        let d   = BertBasedDictionary::new(BertName::BertBaseCased, &store).unwrap();
        let ids = d.encode_line("Hello World", false).unwrap();
        assert_eq!(d.string(&ids, None, false), "[CLS] Hello World [SEP]");
    }

    #[test]
    fn test_reverse_order_keeps_structural_tokens_outside() {
        let (_dir, store) = tiny_store();
        let d   = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let ids = d.encode_line("the cats", true).unwrap();
        assert_eq!(d.string(&ids, None, false), "[CLS] ##s cat the [SEP]");
    }

    #[test]
    fn test_decode_reproduces_subword_tokens() {
        let (_dir, store) = tiny_store();
        let d    = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let line = "the cat playing 21st";
        let ids  = d.encode_line(line, false).unwrap();
        let decoded = d.string(&ids[1..ids.len() - 1], None, false);
        let tokens  = d.tokenizer().tokenize(line).unwrap();
        assert_eq!(decoded, tokens.join(" "));
    }

    #[test]
    fn test_overlong_line_is_not_truncated() {
        let (_dir, store) = tiny_store();
        let d    = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let line = vec!["the"; 600].join(" ");
        assert_eq!(d.encode_line(&line, false).unwrap().len(), 602);
    }

    #[test]
    fn test_overlong_line_is_reported() {
        let (_dir, store) = tiny_store();
        let d    = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let line = vec!["the"; 600].join(" ");
        let (ids, logs) = capture_logs(|| d.encode_line(&line, false));
        assert_eq!(ids.unwrap().len(), 602);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Line has 600 subword tokens, more than BERT's 512 positions"), "{logs}");
    }

    #[test]
    fn test_line_at_position_limit_is_silent() {
        let (_dir, store) = tiny_store();
        let d    = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let line = vec!["the"; MAX_SOURCE_POSITIONS].join(" ");
        let (ids, logs) = capture_logs(|| d.encode_line(&line, false));
        assert_eq!(ids.unwrap().len(), MAX_SOURCE_POSITIONS + 2);
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_batch_string_is_row_wise() {
        let (_dir, store) = tiny_store();
        let d    = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let rows = vec![d.encode_line("hello", false).unwrap(), d.encode_line("world", false).unwrap()];
        assert_eq!(d.string_batch(&rows), "[CLS] hello [SEP]\n[CLS] world [SEP]");
    }

    #[test]
    fn test_matches_bert_compatible_target() {
        let (_dir, store) = tiny_store();
        let src = BertBasedDictionary::new(BertName::BertBaseUncased, &store).unwrap();
        let tgt = BertCompatibleDictionary::new();
        assert!(check_special_indices(&src, &tgt).is_ok());
    }
}
