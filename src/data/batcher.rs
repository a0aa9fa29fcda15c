// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TranslationSample>
// into the tensors the translation model consumes.
//
// Sentences have different lengths, so every row is padded to
// the longest one in the batch:
//
//   left-padded source        right-padded target
//   [pad pad  a  b </s>]      [x  y </s> pad]
//   [ c   d   e  f </s>]      [z </s> pad pad]
//
// The decoder input is the target shifted right by one, with
// the trailing eos moved to the front:
//
//   target:             [x  y  </s>]
//   prev_output_tokens: [</s> x  y ]

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

/// One sentence pair, already encoded by the two dictionaries.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationSample {
    pub source: Vec<u32>,
    pub target: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// [batch_size, src_len]
    pub src_tokens: Tensor<B, 2, Int>,

    /// [batch_size], unpadded source lengths
    pub src_lengths: Tensor<B, 1, Int>,

    /// [batch_size, tgt_len], the target shifted right by one
    pub prev_output_tokens: Tensor<B, 2, Int>,

    /// [batch_size, tgt_len]
    pub target: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device:          B::Device,
    pub src_pad:         u32,
    pub tgt_pad:         u32,
    pub eos:             u32,
    pub left_pad_source: bool,
    pub left_pad_target: bool,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, src_pad: u32, tgt_pad: u32, eos: u32) -> Self {
        Self {
            device,
            src_pad,
            tgt_pad,
            eos,
            left_pad_source: true,
            left_pad_target: false,
        }
    }

    pub fn with_left_pad(mut self, source: bool, target: bool) -> Self {
        self.left_pad_source = source;
        self.left_pad_target = target;
        self
    }

    fn tensor(&self, rows: &[Vec<u32>], pad: u32, left_pad: bool) -> Tensor<B, 2, Int> {
        let (flat, width) = collate_tokens(rows, pad, left_pad);
        Tensor::from_data(TensorData::new(flat, [rows.len(), width]), &self.device)
    }
}

/// Stack rows into one flat buffer padded to the longest row.
pub fn collate_tokens(rows: &[Vec<u32>], pad: u32, left_pad: bool) -> (Vec<i64>, usize) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        let padding = std::iter::repeat(pad as i64).take(width - row.len());
        let tokens  = row.iter().map(|&t| t as i64);
        if left_pad {
            flat.extend(padding.chain(tokens));
        } else {
            flat.extend(tokens.chain(padding));
        }
    }
    (flat, width)
}

/// `[x, y, eos]` → `[eos, x, y]`.
///
/// Rows are expected to end in eos. A row that does not is still
/// shifted right by one, so its last token is dropped and the result
/// stays aligned with the target.
pub fn move_eos_to_beginning(row: &[u32], eos: u32) -> Vec<u32> {
    match row.split_last() {
        Some((_, body)) => std::iter::once(eos).chain(body.iter().copied()).collect(),
        None => Vec::new(),
    }
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let sources: Vec<Vec<u32>> = items.iter().map(|s| s.source.clone()).collect();
        let targets: Vec<Vec<u32>> = items.iter().map(|s| s.target.clone()).collect();
        let shifted: Vec<Vec<u32>> = targets
            .iter()
            .map(|t| move_eos_to_beginning(t, self.eos))
            .collect();

        let lengths: Vec<i64> = sources.iter().map(|s| s.len() as i64).collect();

        TranslationBatch {
            src_tokens:         self.tensor(&sources, self.src_pad, self.left_pad_source),
            src_lengths:        Tensor::from_data(TensorData::new(lengths, [items.len()]), &self.device),
            prev_output_tokens: self.tensor(&shifted, self.tgt_pad, self.left_pad_target),
            target:             self.tensor(&targets, self.tgt_pad, self.left_pad_target),
        }
    }
}
