// ============================================================
// Layer 5 — Target-Side Decoder
// ============================================================
// Burn's standard TransformerDecoder with the embedding and
// output layers a translation decoder needs:
//
//   prev_output_tokens [batch, tgt_len]
//       │  embed × √d  (+ positions)  → pad rows zeroed → dropout
//       ▼
//   TransformerDecoder (causal self-attention, cross-attention
//                       over encoder_out with its padding mask)
//       │  (final LayerNorm when pre-norm)
//       ▼
//   output projection → logits [batch, tgt_len, |target vocab|]
//
// The embedding table has one row per target symbol; the pad
// row never contributes to the decoder input.

use burn::{
    nn::{
        attention::generate_autoregressive_mask,
        transformer::{TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::error::{BertNmtError, Result};
use crate::ml::arch::ModelArgs;
use crate::ml::encoder::EncoderOut;

/// Target embedding table with normal(0, d^-0.5) initialisation.
pub fn build_embedding<B: Backend>(num_embeddings: usize, embed_dim: usize, device: &B::Device) -> Embedding<B> {
    EmbeddingConfig::new(num_embeddings, embed_dim)
        .with_initializer(Initializer::Normal {
            mean: 0.0,
            std:  (embed_dim as f64).powf(-0.5),
        })
        .init(device)
}

/// Sinusoidal table with one row per position `0..num_positions`,
/// first half sine, second half cosine. The `padding_idx` row is zero.
pub fn sinusoidal_table(num_positions: usize, embed_dim: usize, padding_idx: usize) -> Vec<f32> {
    let half_dim = embed_dim / 2;
    let scale    = if half_dim > 1 { (10000f64).ln() / (half_dim as f64 - 1.0) } else { 0.0 };
    let mut table = vec![0f32; num_positions * embed_dim];
    for pos in 0..num_positions {
        if pos == padding_idx {
            continue;
        }
        for i in 0..half_dim {
            let angle = pos as f64 * (-(i as f64) * scale).exp();
            table[pos * embed_dim + i]            = angle.sin() as f32;
            table[pos * embed_dim + half_dim + i] = angle.cos() as f32;
        }
        // Odd widths leave the last column at zero.
    }
    table
}

/// Lower-triangular ones, `[len, len]`: row-vector × this = running sum.
fn running_sum_matrix(len: usize) -> Vec<f32> {
    (0..len * len)
        .map(|k| if k / len <= k % len { 1.0 } else { 0.0 })
        .collect()
}

#[derive(Module, Debug)]
pub struct TranslationDecoder<B: Backend> {
    pub embed_tokens:    Embedding<B>,
    pub embed_positions: Option<Embedding<B>>,
    pub layers:          TransformerDecoder<B>,
    pub layer_norm:      Option<LayerNorm<B>>,
    pub project_out_dim: Option<Linear<B>>,
    pub output_proj:     Option<Linear<B>>,
    pub dropout:         Dropout,
    embed_dim:           usize,
    pad_index:           usize,
    sinusoidal:          bool,
}

impl<B: Backend> TranslationDecoder<B> {
    pub fn new(args: &ModelArgs, embed_tokens: Embedding<B>, pad_index: u32, device: &B::Device) -> Result<Self> {
        if args.adaptive_softmax_cutoff.is_some() {
            return Err(BertNmtError::Unsupported("adaptive softmax"));
        }
        if args.adaptive_input {
            return Err(BertNmtError::Unsupported("adaptive input"));
        }
        if args.share_all_embeddings {
            return Err(BertNmtError::Unsupported("share_all_embeddings with a BERT encoder"));
        }
        if args.decoder_embed_path.is_some() {
            return Err(BertNmtError::Unsupported("pretrained decoder embeddings"));
        }

        let [num_embeddings, embed_dim] = embed_tokens.weight.val().dims();
        if embed_dim != args.decoder_embed_dim {
            return Err(BertNmtError::DimensionMismatch(format!(
                "embedding width {embed_dim} != decoder_embed_dim {}", args.decoder_embed_dim
            )));
        }
        if args.share_decoder_input_output_embed && args.decoder_output_dim != embed_dim {
            return Err(BertNmtError::DimensionMismatch(format!(
                "tied output embedding needs decoder_output_dim == {embed_dim}, got {}",
                args.decoder_output_dim
            )));
        }

        let pad = pad_index as usize;
        let embed_positions = (!args.no_token_positional_embeddings && args.decoder_learned_pos)
            .then(|| build_embedding(args.max_target_positions + pad + 1, embed_dim, device));
        let sinusoidal = !args.no_token_positional_embeddings && !args.decoder_learned_pos;

        let layers = TransformerDecoderConfig::new(
            embed_dim,
            args.decoder_ffn_embed_dim,
            args.decoder_attention_heads,
            args.decoder_layers,
        )
        .with_dropout(args.dropout)
        .with_norm_first(args.decoder_normalize_before)
        .init(device);

        let layer_norm = args
            .decoder_normalize_before
            .then(|| LayerNormConfig::new(embed_dim).init(device));
        let project_out_dim = (args.decoder_output_dim != embed_dim)
            .then(|| LinearConfig::new(embed_dim, args.decoder_output_dim).with_bias(false).init(device));
        let output_proj = (!args.share_decoder_input_output_embed).then(|| {
            LinearConfig::new(args.decoder_output_dim, num_embeddings)
                .with_bias(false)
                .with_initializer(Initializer::Normal {
                    mean: 0.0,
                    std:  (args.decoder_output_dim as f64).powf(-0.5),
                })
                .init(device)
        });

        Ok(Self {
            embed_tokens,
            embed_positions,
            layers,
            layer_norm,
            project_out_dim,
            output_proj,
            dropout: DropoutConfig::new(args.dropout).init(),
            embed_dim,
            pad_index: pad,
            sinusoidal,
        })
    }

    /// Position ids: the n-th real token of a row gets `pad + n`,
    /// padding gets `pad`. Left padding therefore does not shift positions.
    fn make_positions(&self, keep: Tensor<B, 2>) -> Tensor<B, 2, Int> {
        let [_, tgt_len] = keep.dims();
        let device = keep.device();
        let tri    = Tensor::<B, 2>::from_data(TensorData::new(running_sum_matrix(tgt_len), [tgt_len, tgt_len]), &device);
        let counts = keep.clone().matmul(tri) * keep;
        (counts + self.pad_index as f64).int()
    }

    /// Scaled token embeddings plus positions, zero at padded positions.
    fn embed(&self, prev_output_tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, tgt_len] = prev_output_tokens.dims();
        let device = prev_output_tokens.device();

        let keep = prev_output_tokens
            .clone()
            .equal_elem(self.pad_index as i64)
            .bool_not()
            .float();

        let mut x = self.embed_tokens.forward(prev_output_tokens) * (self.embed_dim as f64).sqrt();

        if let Some(positions) = &self.embed_positions {
            x = x + positions.forward(self.make_positions(keep.clone()));
        } else if self.sinusoidal {
            let num_positions = self.pad_index + 1 + tgt_len;
            let table = sinusoidal_table(num_positions, self.embed_dim, self.pad_index);
            let table = Tensor::<B, 2>::from_data(TensorData::new(table, [num_positions, self.embed_dim]), &device);
            let ids   = self.make_positions(keep.clone()).reshape([batch_size * tgt_len]);
            x = x + table.select(0, ids).reshape([batch_size, tgt_len, self.embed_dim]);
        }

        self.dropout.forward(x * keep.unsqueeze_dim::<3>(2))
    }

    /// Decodes the whole target prefix in one pass.
    pub fn forward(&self, prev_output_tokens: Tensor<B, 2, Int>, encoder_out: &EncoderOut<B>) -> Tensor<B, 3> {
        let [batch_size, tgt_len] = prev_output_tokens.dims();
        let device = prev_output_tokens.device();

        let x      = self.embed(prev_output_tokens);
        let memory = encoder_out.encoder_out.clone().swap_dims(0, 1);
        let causal = generate_autoregressive_mask::<B>(batch_size, tgt_len, &device);

        let mut input = TransformerDecoderInput::new(x, memory).target_mask_attn(causal);
        if let Some(mask) = &encoder_out.encoder_padding_mask {
            input = input.memory_mask_pad(mask.clone());
        }

        let mut x = self.layers.forward(input);
        if let Some(norm) = &self.layer_norm {
            x = norm.forward(x);
        }
        if let Some(project) = &self.project_out_dim {
            x = project.forward(x);
        }
        self.output_layer(x)
    }

    fn output_layer(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match &self.output_proj {
            Some(proj) => proj.forward(x),
            None => {
                let [batch_size, tgt_len, dim] = x.dims();
                let weight = self.embed_tokens.weight.val();
                let vocab  = weight.dims()[0];
                x.reshape([batch_size * tgt_len, dim])
                    .matmul(weight.transpose())
                    .reshape([batch_size, tgt_len, vocab])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tiny_model_args, TestBackend};

    fn memory(batch: usize, src_len: usize, dim: usize) -> EncoderOut<TestBackend> {
        EncoderOut {
            encoder_out:          Tensor::ones([src_len, batch, dim], &Default::default()),
            encoder_padding_mask: None,
        }
    }

    #[test]
    fn test_sinusoidal_layout() {
        let table = sinusoidal_table(3, 4, 0);
        // padding row is zero
        assert!(table[..4].iter().all(|v| *v == 0.0));
        // position 1, half_dim 2 → frequencies 1 and 1e-4
        assert!((table[4] - 1f32.sin()).abs() < 1e-6);
        assert!((table[6] - 1f32.cos()).abs() < 1e-6);
        assert!((table[8] - 2f32.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_positions_count_real_tokens() {
        let device  = Default::default();
        let args    = tiny_model_args();
        let embed   = build_embedding::<TestBackend>(110, args.decoder_embed_dim, &device);
        let decoder = TranslationDecoder::new(&args, embed, 1, &device).unwrap();

        let keep = Tensor::<TestBackend, 2>::from_data(TensorData::new(vec![0f32, 0., 1., 1., 1., 1., 0., 0.], [2, 4]), &device);
        let ids: Vec<i64> = decoder.make_positions(keep).into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![1, 1, 2, 3, 2, 3, 1, 1]);
    }

    fn token_row(decoder: &TranslationDecoder<TestBackend>, tokens: Vec<i64>, col: usize) -> Vec<f32> {
        let dim  = decoder.embed_dim;
        let prev = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(tokens, [1, 2]), &Default::default());
        decoder.embed(prev).slice([0..1, col..col + 1, 0..dim]).into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_left_padding_does_not_shift_positions() {
        let device = Default::default();
        for learned in [false, true] {
            let mut args = tiny_model_args();
            args.decoder_learned_pos = learned;
            let embed   = build_embedding::<TestBackend>(110, args.decoder_embed_dim, &device);
            let decoder = TranslationDecoder::new(&args, embed, 0, &device).unwrap();

            let right = token_row(&decoder, vec![104, 0], 0);
            let left  = token_row(&decoder, vec![0, 104], 1);
            assert!(right.iter().zip(&left).all(|(a, b)| (a - b).abs() < 1e-6));
        }
    }

    #[test]
    fn test_logits_cover_target_vocab() {
        let device  = Default::default();
        let args    = tiny_model_args();
        let embed   = build_embedding::<TestBackend>(120, args.decoder_embed_dim, &device);
        let decoder = TranslationDecoder::new(&args, embed, 0, &device).unwrap();

        let prev = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(vec![102i64, 103, 104, 102, 105, 0], [2, 3]), &device);
        let out  = decoder.forward(prev, &memory(2, 5, args.decoder_embed_dim));
        assert_eq!(out.dims(), [2, 3, 120]);
    }

    #[test]
    fn test_tied_output_projection() {
        let device = Default::default();
        let mut args = tiny_model_args();
        args.share_decoder_input_output_embed = true;
        args.decoder_learned_pos = true;
        let embed   = build_embedding::<TestBackend>(110, args.decoder_embed_dim, &device);
        let decoder = TranslationDecoder::new(&args, embed, 0, &device).unwrap();
        assert!(decoder.output_proj.is_none());
        assert!(decoder.embed_positions.is_some());

        let prev = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(vec![102i64, 104], [1, 2]), &device);
        assert_eq!(decoder.forward(prev, &memory(1, 3, args.decoder_embed_dim)).dims(), [1, 2, 110]);
    }

    #[test]
    fn test_pad_positions_embed_to_zero() {
        let device  = Default::default();
        let args    = tiny_model_args();
        let embed   = build_embedding::<TestBackend>(110, args.decoder_embed_dim, &device);
        let decoder = TranslationDecoder::new(&args, embed, 0, &device).unwrap();

        let prev = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(vec![104i64, 0], [1, 2]), &device);
        let x    = decoder.embed(prev);
        let dim  = args.decoder_embed_dim;
        let pad_row: Vec<f32> = x.slice([0..1, 1..2, 0..dim]).into_data().iter::<f32>().collect();
        assert!(pad_row.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unsupported_options_are_rejected() {
        let device = Default::default();
        let mut args = tiny_model_args();
        args.adaptive_softmax_cutoff = Some(vec![1000]);
        let embed = build_embedding::<TestBackend>(110, args.decoder_embed_dim, &device);
        assert!(matches!(
            TranslationDecoder::new(&args, embed, 0, &device),
            Err(BertNmtError::Unsupported(_))
        ));
    }
}
