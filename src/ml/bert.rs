// ============================================================
// Layer 5 — BERT Encoder
// ============================================================
// The pretrained masked-language-model encoder:
//
//   word + position + segment embeddings → LayerNorm → Dropout
//   N × [ self-attention → Add & Norm → GELU FFN → Add & Norm ]
//   pooler: tanh(Linear(hidden of [CLS]))
//
// Unlike a classifier head, the translation encoder needs the
// hidden states of every layer so that it can pick one of them,
// so `forward` returns all of them.
//
// Reference: Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, tanh},
};
use serde::Deserialize;

/// The architecture fields of a Hugging Face BERT `config.json`.
#[derive(Config, Debug)]
pub struct BertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    #[config(default = 512)]
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 0.1)]
    pub hidden_dropout_prob:     f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

/// `config.json` as written by the various BERT exporters. Older
/// ones leave out the fields that have a default here.
#[derive(Deserialize)]
struct HfBertConfig {
    vocab_size:              usize,
    hidden_size:             usize,
    num_hidden_layers:       usize,
    num_attention_heads:     usize,
    intermediate_size:       usize,
    #[serde(default = "default_max_position_embeddings")]
    max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    type_vocab_size:         usize,
    #[serde(default = "default_hidden_dropout_prob")]
    hidden_dropout_prob:     f64,
    #[serde(default = "default_layer_norm_eps")]
    layer_norm_eps:          f64,
}

fn default_max_position_embeddings() -> usize { 512 }
fn default_type_vocab_size() -> usize { 2 }
fn default_hidden_dropout_prob() -> f64 { 0.1 }
fn default_layer_norm_eps() -> f64 { 1e-12 }

impl BertConfig {
    /// Parse a Hugging Face `config.json`; unknown keys are ignored.
    pub fn from_hf_json(json: &str) -> serde_json::Result<Self> {
        let hf: HfBertConfig = serde_json::from_str(json)?;
        Ok(BertConfig::new(
            hf.vocab_size,
            hf.hidden_size,
            hf.num_hidden_layers,
            hf.num_attention_heads,
            hf.intermediate_size,
        )
        .with_max_position_embeddings(hf.max_position_embeddings)
        .with_type_vocab_size(hf.type_vocab_size)
        .with_hidden_dropout_prob(hf.hidden_dropout_prob)
        .with_layer_norm_eps(hf.layer_norm_eps))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BertModel<B> {
        let embeddings = BertEmbeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.hidden_dropout_prob).init(),
        };
        let layers = (0..self.num_hidden_layers)
            .map(|_| self.build_layer(device))
            .collect();
        let pooler = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        BertModel { embeddings, layers, pooler }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.hidden_size, self.num_attention_heads)
            .with_dropout(self.hidden_dropout_prob)
            .init(device);
        BertLayer {
            self_attn,
            ffn_linear1: LinearConfig::new(self.hidden_size, self.intermediate_size).init(device),
            ffn_linear2: LinearConfig::new(self.intermediate_size, self.hidden_size).init(device),
            norm1:       self.layer_norm(device),
            norm2:       self.layer_norm(device),
            dropout:     DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, token_type_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &input_ids.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_type_ids);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> BertLayer<B> {
    /// `mask_pad` is true at padded positions.
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let mut input = MhaInput::self_attn(x.clone());
        if let Some(mask) = mask_pad {
            input = input.mask_pad(mask);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub layers:     Vec<BertLayer<B>>,
    pub pooler:     Linear<B>,
}

pub struct BertOutput<B: Backend> {
    /// One `[batch, seq_len, hidden]` tensor per encoder layer, bottom first.
    pub encoded_layers: Vec<Tensor<B, 3>>,
    /// `[batch, hidden]`
    pub pooled_output:  Tensor<B, 2>,
}

impl<B: Backend> BertModel<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Rows in the learned position table.
    pub fn max_positions(&self) -> usize {
        self.embeddings.position_embeddings.weight.val().dims()[0]
    }

    /// `attention_mask` is true at positions that may be attended to;
    /// `None` attends everywhere.
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Option<Tensor<B, 2, Bool>>,
    ) -> BertOutput<B> {
        let mask_pad = attention_mask.map(|m| m.bool_not());

        let mut x = self.embeddings.forward(input_ids, token_type_ids);
        let mut encoded_layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
            encoded_layers.push(x.clone());
        }

        let [batch_size, _, hidden] = x.dims();
        let first = x.slice([0..batch_size, 0..1, 0..hidden]).reshape([batch_size, hidden]);
        let pooled_output = tanh(self.pooler.forward(first));

        BertOutput { encoded_layers, pooled_output }
    }
}
