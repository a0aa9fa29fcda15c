use burn::prelude::*;

use crate::domain::traits::Vocabulary;
use crate::error::{BertNmtError, Result};
use crate::ml::arch::ModelArgs;
use crate::ml::bert::BertModel;
use crate::ml::decoder::{build_embedding, TranslationDecoder};
use crate::ml::encoder::{BertTranslationEncoder, Encoder, EncoderOut};

/// Registered model name.
pub const MODEL_NAME: &str = "bert_nmt";

/// BERT encoder + transformer decoder.
#[derive(Module, Debug)]
pub struct BertTranslationModel<B: Backend> {
    pub encoder: BertTranslationEncoder<B>,
    pub decoder: TranslationDecoder<B>,
}

impl<B: Backend> BertTranslationModel<B> {
    /// Assemble the model around an already loaded BERT.
    pub fn build(
        args:     &ModelArgs,
        bert:     BertModel<B>,
        src_pad:  u32,
        tgt_dict: &dyn Vocabulary,
        device:   &B::Device,
    ) -> Result<Self> {
        let hidden = bert.embeddings.word_embeddings.weight.val().dims()[1];
        if hidden != args.decoder_embed_dim {
            return Err(BertNmtError::DimensionMismatch(format!(
                "BERT hidden size {hidden} != decoder_embed_dim {}", args.decoder_embed_dim
            )));
        }

        let encoder = BertTranslationEncoder::new(bert, args.bert_layer, src_pad, !args.no_freeze_bert)?;

        // One row per target symbol; the pad row is masked out in the decoder.
        let embed_tokens = build_embedding(tgt_dict.len(), args.decoder_embed_dim, device);
        let decoder = TranslationDecoder::new(args, embed_tokens, tgt_dict.pad(), device)?;

        tracing::info!(
            "Built {} model: {} decoder layers, {} heads, width {}",
            MODEL_NAME, args.decoder_layers, args.decoder_attention_heads, args.decoder_embed_dim
        );
        Ok(Self { encoder, decoder })
    }

    /// src_tokens: [batch, src_len], prev_output_tokens: [batch, tgt_len]
    /// → logits: [batch, tgt_len, |target vocab|]
    ///
    /// Fails when the source is longer than BERT's position table.
    pub fn forward(
        &self,
        src_tokens:         Tensor<B, 2, Int>,
        src_lengths:        Tensor<B, 1, Int>,
        prev_output_tokens: Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 3>> {
        let (encoder_out, encoder_padding_mask) = self.encoder.forward(src_tokens, src_lengths)?;
        let dict_out = EncoderOut { encoder_out, encoder_padding_mask };
        Ok(self.decoder.forward(prev_output_tokens, &dict_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bert_compatible::BertCompatibleDictionary;
    use crate::test_support::{tiny_bert_config, tiny_model_args, TestBackend};

    #[test]
    fn test_forward_shape() {
        let device   = Default::default();
        let tgt_dict = BertCompatibleDictionary::new();
        let bert     = tiny_bert_config().init(&device);
        let model: BertTranslationModel<TestBackend> =
            BertTranslationModel::build(&tiny_model_args(), bert, 0, &tgt_dict, &device).unwrap();

        let src  = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(vec![101i64, 104, 105, 102, 101, 106, 102, 0], [2, 4]), &device);
        let lens = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![4i64, 3], [2]), &device);
        let prev = Tensor::<TestBackend, 2, Int>::from_data(TensorData::new(vec![102i64, 1, 102, 0], [2, 2]), &device);

        let logits = model.forward(src, lens, prev).unwrap();
        assert_eq!(logits.dims(), [2, 2, 103]);
    }

    #[test]
    fn test_width_must_match_bert() {
        let device = Default::default();
        let mut args = tiny_model_args();
        args.decoder_embed_dim  = 32;
        args.decoder_output_dim = 32;
        let bert = tiny_bert_config().init(&device);
        let result: Result<BertTranslationModel<TestBackend>> =
            BertTranslationModel::build(&args, bert, 0, &BertCompatibleDictionary::new(), &device);
        assert!(matches!(result, Err(BertNmtError::DimensionMismatch(_))));
    }
}
