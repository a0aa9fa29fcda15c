// ============================================================
// Layer 5 — Translation Encoder
// ============================================================
// Wraps BertModel behind the encoder contract the decoder and
// beam search expect:
//
//   src_tokens [batch, src_len]
//       │  padding mask = (src_tokens == pad)
//       ▼
//   BERT(src_tokens, segment ids = 0, attention mask = !padding)
//       │  pick one hidden layer (negative index from the top)
//       ▼
//   encoder_out [src_len, batch, hidden] + Option<padding mask>
//
// A batch without padding yields `None` instead of an all-false
// mask. A batch longer than BERT's position table is an error.

use burn::prelude::*;

use crate::error::{BertNmtError, Result};
use crate::ml::bert::BertModel;

/// BERT's learned position table has exactly this many rows.
pub const MAX_SOURCE_POSITIONS: usize = 512;

/// Encoder output in the shape the decoder consumes.
#[derive(Debug, Clone)]
pub struct EncoderOut<B: Backend> {
    /// `[src_len, batch, hidden]`
    pub encoder_out:          Tensor<B, 3>,
    /// `[batch, src_len]`, true at padded positions
    pub encoder_padding_mask: Option<Tensor<B, 2, Bool>>,
}

impl<B: Backend> EncoderOut<B> {
    /// Select batch rows by `new_order`, e.g. to follow beam-search hypotheses.
    pub fn reorder(self, new_order: Tensor<B, 1, Int>) -> Self {
        let encoder_out = self.encoder_out.select(1, new_order.clone());
        let encoder_padding_mask = self
            .encoder_padding_mask
            .map(|mask| mask.int().select(0, new_order).bool());
        Self { encoder_out, encoder_padding_mask }
    }
}

/// The source-side half of an encoder-decoder model.
pub trait Encoder<B: Backend> {
    fn forward(
        &self,
        src_tokens:  Tensor<B, 2, Int>,
        src_lengths: Tensor<B, 1, Int>,
    ) -> Result<(Tensor<B, 3>, Option<Tensor<B, 2, Bool>>)>;

    fn reorder_encoder_out(
        &self,
        encoder_out: (Tensor<B, 3>, Option<Tensor<B, 2, Bool>>),
        new_order:   Tensor<B, 1, Int>,
    ) -> (Tensor<B, 3>, Option<Tensor<B, 2, Bool>>);

    /// Longest source sequence the encoder accepts.
    fn max_positions(&self) -> usize;
}

#[derive(Module, Debug)]
pub struct BertTranslationEncoder<B: Backend> {
    pub bert:  BertModel<B>,
    /// Resolved (non-negative) index into BERT's encoded layers.
    layer:     usize,
    pad_index: usize,
}

impl<B: Backend> BertTranslationEncoder<B> {
    /// * `bert_layer` - negative values count from the top, -1 being the last layer
    /// * `freeze`     - mark every BERT parameter as not requiring gradients
    pub fn new(bert: BertModel<B>, bert_layer: i64, pad_index: u32, freeze: bool) -> Result<Self> {
        let layer = resolve_layer(bert_layer, bert.num_layers())?;
        let bert  = if freeze { bert.no_grad() } else { bert };
        tracing::debug!("BERT encoder uses layer {} (freeze={})", layer, freeze);
        Ok(Self { bert, layer, pad_index: pad_index as usize })
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn encode(&self, src_tokens: Tensor<B, 2, Int>) -> Result<EncoderOut<B>> {
        let [_, src_len] = src_tokens.dims();
        let max = self.bert.max_positions();
        if src_len > max {
            return Err(BertNmtError::SourceTooLong { len: src_len, max });
        }

        let paddings    = src_tokens.clone().equal_elem(self.pad_index as i64);
        let num_padding = paddings.clone().int().sum().into_scalar().elem::<i64>();
        let paddings    = (num_padding > 0).then_some(paddings);
        let masks       = paddings.clone().map(|p| p.bool_not());

        let token_types = src_tokens.zeros_like();
        let output      = self.bert.forward(src_tokens, token_types, masks);

        // The layer index is validated against this model in `new`.
        let mut layers  = output.encoded_layers;
        let encoder_out = layers.swap_remove(self.layer).swap_dims(0, 1);

        Ok(EncoderOut { encoder_out, encoder_padding_mask: paddings })
    }
}

impl<B: Backend> Encoder<B> for BertTranslationEncoder<B> {
    fn forward(
        &self,
        src_tokens:   Tensor<B, 2, Int>,
        _src_lengths: Tensor<B, 1, Int>,
    ) -> Result<(Tensor<B, 3>, Option<Tensor<B, 2, Bool>>)> {
        let out = self.encode(src_tokens)?;
        Ok((out.encoder_out, out.encoder_padding_mask))
    }

    fn reorder_encoder_out(
        &self,
        encoder_out: (Tensor<B, 3>, Option<Tensor<B, 2, Bool>>),
        new_order:   Tensor<B, 1, Int>,
    ) -> (Tensor<B, 3>, Option<Tensor<B, 2, Bool>>) {
        let tmp = EncoderOut {
            encoder_out:          encoder_out.0,
            encoder_padding_mask: encoder_out.1,
        }
        .reorder(new_order);
        (tmp.encoder_out, tmp.encoder_padding_mask)
    }

    fn max_positions(&self) -> usize {
        MAX_SOURCE_POSITIONS
    }
}

fn resolve_layer(bert_layer: i64, num_layers: usize) -> Result<usize> {
    let n   = num_layers as i64;
    let idx = if bert_layer < 0 { n + bert_layer } else { bert_layer };
    if (0..n).contains(&idx) {
        Ok(idx as usize)
    } else {
        Err(BertNmtError::InvalidBertLayer { layer: bert_layer, num_layers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tiny_bert_config, TestBackend};

    fn ids(rows: &[&[i64]]) -> Tensor<TestBackend, 2, Int> {
        let width = rows[0].len();
        let flat: Vec<i64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::from_data(TensorData::new(flat, [rows.len(), width]), &Default::default())
    }

    fn encoder(layer: i64) -> BertTranslationEncoder<TestBackend> {
        let bert = tiny_bert_config().init(&Default::default());
        BertTranslationEncoder::new(bert, layer, 0, true).unwrap()
    }

    #[test]
    fn test_negative_layer_counts_from_top() {
        assert_eq!(resolve_layer(-2, 12).unwrap(), 10);
        assert_eq!(resolve_layer(-1, 3).unwrap(), 2);
        assert_eq!(resolve_layer(0, 3).unwrap(), 0);
        assert!(resolve_layer(-4, 3).is_err());
        assert!(resolve_layer(3, 3).is_err());
    }

    #[test]
    fn test_output_is_sequence_first() {
        let enc = encoder(-2);
        let out = enc.encode(ids(&[&[101, 5, 6, 102], &[101, 7, 102, 0]])).unwrap();
        assert_eq!(out.encoder_out.dims(), [4, 2, tiny_bert_config().hidden_size]);
    }

    #[test]
    fn test_no_padding_gives_no_mask() {
        let enc = encoder(-2);
        let out = enc.encode(ids(&[&[101, 5, 102], &[101, 6, 102]])).unwrap();
        assert!(out.encoder_padding_mask.is_none());
    }

    #[test]
    fn test_padding_mask_marks_pad_positions() {
        let enc  = encoder(-2);
        let out  = enc.encode(ids(&[&[101, 5, 6, 102], &[101, 7, 102, 0]])).unwrap();
        let mask = out.encoder_padding_mask.expect("batch has padding");
        let values: Vec<bool> = mask.into_data().iter::<bool>().collect();
        assert_eq!(values, vec![false, false, false, false, false, false, false, true]);
    }

    #[test]
    fn test_reorder_permutes_batch() {
        let enc    = encoder(-1);
        let tokens = ids(&[&[101, 5, 6, 102], &[101, 7, 102, 0]]);
        let out    = enc.forward(tokens, Tensor::from_data(TensorData::new(vec![4i64, 3], [2]), &Default::default())).unwrap();
        let before = out.0.clone();

        let order = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![1i64, 0], [2]), &Default::default());
        let (reordered, mask) = enc.reorder_encoder_out(out, order);

        // Batch column 0 of the result is batch column 1 of the input.
        let hidden = tiny_bert_config().hidden_size;
        let want: Vec<f32> = before.slice([0..4, 1..2, 0..hidden]).into_data().iter::<f32>().collect();
        let got:  Vec<f32> = reordered.slice([0..4, 0..1, 0..hidden]).into_data().iter::<f32>().collect();
        assert_eq!(want, got);

        let mask: Vec<bool> = mask.expect("mask is kept").into_data().iter::<bool>().collect();
        assert_eq!(mask, vec![false, false, false, true, false, false, false, false]);
    }

    #[test]
    fn test_source_longer_than_position_table() {
        let enc = encoder(-1);
        let max = tiny_bert_config().max_position_embeddings;

        let fits: Vec<i64> = vec![5; max];
        assert!(enc.encode(ids(&[&fits[..]])).is_ok());

        let long: Vec<i64> = vec![5; max + 1];
        assert!(matches!(
            enc.encode(ids(&[&long[..]])),
            Err(BertNmtError::SourceTooLong { len, max: m }) if len == max + 1 && m == max
        ));
    }

    #[test]
    fn test_max_positions() {
        assert_eq!(encoder(-1).max_positions(), 512);
    }

    #[test]
    fn test_freeze_disables_gradients() {
        type Ad = burn::backend::Autodiff<TestBackend>;
        let device = Default::default();

        let frozen: BertTranslationEncoder<Ad> =
            BertTranslationEncoder::new(tiny_bert_config().init(&device), -1, 0, true).unwrap();
        assert!(!frozen.bert.embeddings.word_embeddings.weight.is_require_grad());
        assert!(!frozen.bert.pooler.weight.is_require_grad());

        let trainable: BertTranslationEncoder<Ad> =
            BertTranslationEncoder::new(tiny_bert_config().init(&device), -1, 0, false).unwrap();
        assert!(trainable.bert.embeddings.word_embeddings.weight.is_require_grad());
    }
}
