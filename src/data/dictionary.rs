// ============================================================
// Layer 4 — Symbol Table
// ============================================================
// A frequency-annotated symbol table in the usual NMT layout:
//
//   symbols: ["<pad>", ..., "<unk>", "<bos>", "</s>", "the", "of", ...]
//   counts:  [   0   , ...,    0   ,    0   ,   0   , 9812 , 7601, ...]
//   indices: { "<pad>": 0, ..., "the": 103, "of": 104, ... }
//
// The first `nspecial` entries are reserved and never move.
// Everything after them is learned from a corpus and can be
// re-ordered and pruned by `finalize`.
//
// On-disk format (one learned symbol per line):
//   <symbol> <count>

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use crate::domain::traits::Vocabulary;
use crate::error::{BertNmtError, Result};

/// Split a line on runs of whitespace.
pub fn tokenize_line(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    pub(crate) unk_word: String,
    pub(crate) pad_word: String,
    pub(crate) eos_word: String,
    symbols:             Vec<String>,
    counts:              Vec<usize>,
    indices:             HashMap<String, u32>,
    pub(crate) pad_index: u32,
    pub(crate) unk_index: u32,
    pub(crate) bos_index: u32,
    pub(crate) eos_index: u32,
    pub(crate) nspecial:  usize,
}

impl Dictionary {
    /// An empty table that knows its special words but holds no symbols yet.
    /// Callers are responsible for inserting the specials and recording
    /// their indices; see `BertCompatibleDictionary::new`.
    pub(crate) fn empty(pad: &str, eos: &str, unk: &str) -> Self {
        Self {
            unk_word:  unk.to_string(),
            pad_word:  pad.to_string(),
            eos_word:  eos.to_string(),
            symbols:   Vec::new(),
            counts:    Vec::new(),
            indices:   HashMap::new(),
            pad_index: 0,
            unk_index: 0,
            bos_index: 0,
            eos_index: 0,
            nspecial:  0,
        }
    }

    /// Number of reserved symbols at the front of the table.
    pub fn nspecial(&self) -> usize {
        self.nspecial
    }

    pub fn symbol(&self, index: u32) -> Option<&str> {
        self.symbols.get(index as usize).map(String::as_str)
    }

    pub fn count(&self, index: u32) -> Option<usize> {
        self.counts.get(index as usize).copied()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Index of `sym`, or the unk index when it is not in the table.
    pub fn index(&self, sym: &str) -> u32 {
        self.indices.get(sym).copied().unwrap_or(self.unk_index)
    }

    pub fn contains(&self, sym: &str) -> bool {
        self.indices.contains_key(sym)
    }

    /// Add `n` occurrences of `word`, returning its index.
    pub fn add_symbol(&mut self, word: &str, n: usize) -> u32 {
        if let Some(&idx) = self.indices.get(word) {
            self.counts[idx as usize] += n;
            return idx;
        }
        let idx = self.symbols.len() as u32;
        self.indices.insert(word.to_string(), idx);
        self.symbols.push(word.to_string());
        self.counts.push(n);
        idx
    }

    /// Sort learned symbols by frequency and prune them.
    ///
    /// * `threshold`      - symbols seen fewer times than this are dropped
    /// * `nwords`         - total size cap including specials; `None` keeps all
    /// * `padding_factor` - filler symbols are appended until the size is a
    ///                      multiple of this (values ≤ 1 disable padding)
    pub fn finalize(&mut self, threshold: usize, nwords: Option<usize>, padding_factor: usize) {
        let nwords = nwords.unwrap_or(self.symbols.len());
        let budget = nwords.saturating_sub(self.nspecial);

        let mut learned: Vec<(String, usize)> = self.symbols[self.nspecial..]
            .iter()
            .cloned()
            .zip(self.counts[self.nspecial..].iter().copied())
            .collect();
        // Stable: equal counts keep their insertion order.
        learned.sort_by(|a, b| b.1.cmp(&a.1));

        let mut symbols: Vec<String> = self.symbols[..self.nspecial].to_vec();
        let mut counts:  Vec<usize>  = self.counts[..self.nspecial].to_vec();
        for (symbol, count) in learned.into_iter().take(budget) {
            if count < threshold {
                break;
            }
            symbols.push(symbol);
            counts.push(count);
        }

        if padding_factor > 1 {
            let mut i = 0usize;
            while symbols.len() % padding_factor != 0 {
                symbols.push(format!("madeupword{i:04}"));
                counts.push(0);
                i += 1;
            }
        }

        self.indices = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        self.symbols = symbols;
        self.counts  = counts;

        tracing::debug!("Finalized dictionary with {} symbols", self.symbols.len());
    }

    /// Load `<symbol> <count>` lines from a file, appending after the specials.
    pub fn add_from_file(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            let format_err = || BertNmtError::DictionaryFormat {
                path:    path.to_path_buf(),
                line:    line_no + 1,
                content: line.to_string(),
            };
            let (word, count) = line.rsplit_once(' ').ok_or_else(format_err)?;
            let count: usize  = count.parse().map_err(|_| format_err())?;
            if self.indices.contains_key(word) {
                return Err(BertNmtError::DuplicateSymbol {
                    path:   path.to_path_buf(),
                    symbol: word.to_string(),
                });
            }
            self.add_symbol(word, count);
        }
        Ok(())
    }

    /// Write the learned symbols (specials excluded) back to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = std::io::BufWriter::new(fs::File::create(path)?);
        for (symbol, count) in self.symbols[self.nspecial..]
            .iter()
            .zip(&self.counts[self.nspecial..])
        {
            writeln!(out, "{symbol} {count}")?;
        }
        out.flush()?;
        tracing::debug!("Saved dictionary to '{}'", path.display());
        Ok(())
    }

    /// Count every whitespace token of a text file, plus one eos per line.
    pub fn add_file_to_dictionary(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        let mut counter: BTreeMap<String, usize> = BTreeMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            for word in tokenize_line(&line) {
                *counter.entry(word.to_string()).or_insert(0) += 1;
            }
            *counter.entry(self.eos_word.clone()).or_insert(0) += 1;
        }
        for (word, count) in counter {
            self.add_symbol(&word, count);
        }
        Ok(())
    }
}

impl Vocabulary for Dictionary {
    fn len(&self) -> usize {
        self.symbols.len()
    }

    fn pad(&self) -> u32 {
        self.pad_index
    }

    fn unk(&self) -> u32 {
        self.unk_index
    }

    fn bos(&self) -> u32 {
        self.bos_index
    }

    fn eos(&self) -> u32 {
        self.eos_index
    }

    fn unk_word(&self) -> &str {
        &self.unk_word
    }

    fn encode_line(&self, line: &str, reverse_order: bool) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = tokenize_line(line).into_iter().map(|w| self.index(w)).collect();
        if reverse_order {
            ids.reverse();
        }
        ids.push(self.eos_index);
        Ok(ids)
    }

    fn string(&self, ids: &[u32], bpe_symbol: Option<&str>, escape_unk: bool) -> String {
        let words: Vec<String> = ids
            .iter()
            .filter(|&&i| i != self.eos_index)
            .map(|&i| {
                if i == self.unk_index {
                    self.unk_string(escape_unk)
                } else {
                    self.symbol(i).map(str::to_string).unwrap_or_else(|| self.unk_string(escape_unk))
                }
            })
            .collect();
        let sentence = words.join(" ");
        match bpe_symbol {
            Some(bpe) => format!("{sentence} ").replace(bpe, "").trim_end().to_string(),
            None      => sentence,
        }
    }
}
