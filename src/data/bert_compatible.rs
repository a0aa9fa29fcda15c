// ============================================================
// Layer 4 — Bert-Compatible Dictionary
// ============================================================
// A target-side symbol table whose reserved block lines up
// with the BERT vocabulary:
//
//   index    BERT vocab.txt    this dictionary
//   0        [PAD]             <pad>
//   1..=99   [unused1..99]     [unused1..99]
//   100      [UNK]             <unk>
//   101      [CLS]             <bos>
//   102      [SEP]             </s>
//
// so pad, unk and eos agree with the source side and learned
// target symbols start at index 103.

use std::path::Path;

use crate::data::dictionary::Dictionary;
use crate::error::Result;

/// Number of placeholder symbols between pad and unk.
pub const NUM_UNUSED: usize = 99;

/// Reserved symbols: pad + unused + unk + bos + eos.
pub const NSPECIAL: usize = NUM_UNUSED + 4;

/// Constructors for a `Dictionary` in the BERT-compatible layout.
pub struct BertCompatibleDictionary;

impl BertCompatibleDictionary {
    /// Build the reserved block with the default special words.
    pub fn new() -> Dictionary {
        Self::with_specials("<pad>", "</s>", "<unk>")
    }

    /// Build the reserved block. Insertion order fixes the indices.
    pub fn with_specials(pad: &str, eos: &str, unk: &str) -> Dictionary {
        let mut d = Dictionary::empty(pad, eos, unk);
        d.pad_index = d.add_symbol(pad, 0);
        for i in 1..=NUM_UNUSED {
            d.add_symbol(&format!("[unused{i}]"), 0);
        }
        d.unk_index = d.add_symbol(unk, 0);
        d.bos_index = d.add_symbol("<bos>", 0);
        d.eos_index = d.add_symbol(eos, 0);
        d.nspecial  = d.symbols().len();
        d
    }

    /// Load a `<symbol> <count>` file on top of the reserved block.
    pub fn load(path: &Path) -> Result<Dictionary> {
        let mut d = Self::new();
        d.add_from_file(path)?;
        tracing::debug!("Loaded '{}' ({} symbols)", path.display(), d.symbols().len());
        Ok(d)
    }

    /// Count a set of corpus files and finalize the result.
    pub fn build(
        filenames:      &[impl AsRef<Path>],
        threshold:      usize,
        nwords:         Option<usize>,
        padding_factor: usize,
    ) -> Result<Dictionary> {
        let mut d = Self::new();
        for filename in filenames {
            d.add_file_to_dictionary(filename.as_ref())?;
        }
        d.finalize(threshold, nwords, padding_factor);
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Vocabulary;

    #[test]
    fn test_reserved_layout() {
        let d = BertCompatibleDictionary::new();
        assert_eq!(d.pad(), 0);
        assert_eq!(d.symbol(1), Some("[unused1]"));
        assert_eq!(d.symbol(99), Some("[unused99]"));
        assert_eq!(d.unk(), 100);
        assert_eq!(d.bos(), 101);
        assert_eq!(d.eos(), 102);
        assert_eq!(d.nspecial(), 103);
        assert_eq!(d.len(), 103);
    }

    #[test]
    fn test_first_learned_symbol_follows_reserved_block() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.de.txt");
        std::fs::write(&path, "und 10\nder 7\n").unwrap();
        let d = BertCompatibleDictionary::load(&path).unwrap();
        assert_eq!(d.index("und"), 103);
        assert_eq!(d.index("der"), 104);
        assert_eq!(d.pad(), 0);
    }

    #[test]
    fn test_build_pads_to_multiple_of_factor() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.de");
        std::fs::write(&path, "ein haus\nein baum\nein\n").unwrap();
        let d = BertCompatibleDictionary::build(&[&path], 1, None, 8).unwrap();
        assert_eq!(d.len() % 8, 0);
        // eos is special, so only the three words are learned.
        assert_eq!(d.index("ein"), 103);
        assert_eq!(d.pad(), 0);
        assert_eq!(d.eos(), 102);
    }

    #[test]
    fn test_save_then_load_keeps_indices() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("train.de");
        std::fs::write(&corpus, "a b b c c c\n").unwrap();
        let built = BertCompatibleDictionary::build(&[&corpus], 0, None, 1).unwrap();

        let path = dir.path().join("dict.de.txt");
        built.save(&path).unwrap();
        let loaded = BertCompatibleDictionary::load(&path).unwrap();
        assert_eq!(loaded.symbols(), built.symbols());
        assert_eq!(loaded.index("c"), 103);
    }
}
