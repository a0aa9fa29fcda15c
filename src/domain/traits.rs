// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Vocabulary is the contract the encoder, decoder and task see.
// Two very different types implement it:
//   - Dictionary          → a materialised symbol table (target side)
//   - BertBasedDictionary → a proxy over the BERT tokenizer (source side)
//
// Neither inherits from the other; the translation task only
// needs the shared accessors to check that both sides agree
// on their special indices.

use rand::Rng;

use crate::error::{BertNmtError, Result};

/// Symbol ↔ index mapping with designated special symbols.
pub trait Vocabulary {
    /// Number of symbols, including the special ones.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad(&self) -> u32;
    fn unk(&self) -> u32;
    fn bos(&self) -> u32;
    fn eos(&self) -> u32;

    /// The word used for unknown symbols.
    fn unk_word(&self) -> &str;

    /// `<unk>`, or `<<unk>>` when `escape` is set.
    fn unk_string(&self, escape: bool) -> String {
        if escape {
            format!("<{}>", self.unk_word())
        } else {
            self.unk_word().to_string()
        }
    }

    /// Convert one line of raw text into indices.
    fn encode_line(&self, line: &str, reverse_order: bool) -> Result<Vec<u32>>;

    /// Convert indices back into a space separated string.
    fn string(&self, ids: &[u32], bpe_symbol: Option<&str>, escape_unk: bool) -> String;

    /// Row-wise `string`, one line per row.
    fn string_batch(&self, rows: &[Vec<u32>]) -> String {
        rows.iter()
            .map(|row| self.string(row, None, false))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Random non-special indices terminated by eos, for warm-up batches.
    fn dummy_sentence(&self, length: usize) -> Vec<u32> {
        let mut rng = rand::thread_rng();
        let low     = self.eos() + 2;
        let high    = (self.len() as u32).max(low + 1);
        let mut ids: Vec<u32> = (0..length).map(|_| rng.gen_range(low..high)).collect();
        if let Some(last) = ids.last_mut() {
            *last = self.eos();
        }
        ids
    }
}

/// Fail unless both vocabularies place pad, unk and eos at the same index.
///
/// The encoder masks source padding by the source pad index while the
/// decoder loss ignores the target pad index, so a mismatch here would
/// silently corrupt training.
pub fn check_special_indices(src: &dyn Vocabulary, tgt: &dyn Vocabulary) -> Result<()> {
    let pairs = [
        ("pad", src.pad(), tgt.pad()),
        ("eos", src.eos(), tgt.eos()),
        ("unk", src.unk(), tgt.unk()),
    ];
    for (symbol, src_index, tgt_index) in pairs {
        if src_index != tgt_index {
            return Err(BertNmtError::SpecialIndexMismatch { symbol, src_index, tgt_index });
        }
    }
    Ok(())
}
