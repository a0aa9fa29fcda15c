// ============================================================
// Layer 5 — Architecture Presets
// ============================================================
// A preset turns a partial configuration (ArchOverrides, every
// field optional) into a complete one (ModelArgs). Presets stack:
//
//   bert_nmt_big_t2t ──fills──▶ bert_nmt_big ──fills──▶ bert_nmt
//
// Each layer only fills fields the caller left unset, then hands
// the result to the next preset. Nothing is mutated in place.

use serde::{Deserialize, Serialize};

use crate::domain::bert_name::BertName;

/// Decoder positions available when the task does not say otherwise.
pub const DEFAULT_MAX_TARGET_POSITIONS: usize = 1024;

/// User-supplied hyperparameters; unset fields take the preset's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchOverrides {
    pub bert_name:                        Option<BertName>,
    pub bert_layer:                       Option<i64>,
    pub no_freeze_bert:                   Option<bool>,
    pub decoder_embed_path:               Option<String>,
    pub decoder_embed_dim:                Option<usize>,
    pub decoder_ffn_embed_dim:            Option<usize>,
    pub decoder_layers:                   Option<usize>,
    pub decoder_attention_heads:          Option<usize>,
    pub decoder_normalize_before:         Option<bool>,
    pub decoder_learned_pos:              Option<bool>,
    pub attention_dropout:                Option<f64>,
    pub relu_dropout:                     Option<f64>,
    pub dropout:                          Option<f64>,
    pub adaptive_softmax_cutoff:          Option<Vec<usize>>,
    pub adaptive_softmax_dropout:         Option<f64>,
    pub share_decoder_input_output_embed: Option<bool>,
    pub share_all_embeddings:             Option<bool>,
    pub no_token_positional_embeddings:   Option<bool>,
    pub adaptive_input:                   Option<bool>,
    pub decoder_output_dim:               Option<usize>,
    pub decoder_input_dim:                Option<usize>,
    pub max_target_positions:             Option<usize>,
}

impl ArchOverrides {
    /// Field-wise: keep our value when set, otherwise take `defaults`'.
    pub fn or(self, defaults: ArchOverrides) -> ArchOverrides {
        ArchOverrides {
            bert_name:                        self.bert_name.or(defaults.bert_name),
            bert_layer:                       self.bert_layer.or(defaults.bert_layer),
            no_freeze_bert:                   self.no_freeze_bert.or(defaults.no_freeze_bert),
            decoder_embed_path:               self.decoder_embed_path.or(defaults.decoder_embed_path),
            decoder_embed_dim:                self.decoder_embed_dim.or(defaults.decoder_embed_dim),
            decoder_ffn_embed_dim:            self.decoder_ffn_embed_dim.or(defaults.decoder_ffn_embed_dim),
            decoder_layers:                   self.decoder_layers.or(defaults.decoder_layers),
            decoder_attention_heads:          self.decoder_attention_heads.or(defaults.decoder_attention_heads),
            decoder_normalize_before:         self.decoder_normalize_before.or(defaults.decoder_normalize_before),
            decoder_learned_pos:              self.decoder_learned_pos.or(defaults.decoder_learned_pos),
            attention_dropout:                self.attention_dropout.or(defaults.attention_dropout),
            relu_dropout:                     self.relu_dropout.or(defaults.relu_dropout),
            dropout:                          self.dropout.or(defaults.dropout),
            adaptive_softmax_cutoff:          self.adaptive_softmax_cutoff.or(defaults.adaptive_softmax_cutoff),
            adaptive_softmax_dropout:         self.adaptive_softmax_dropout.or(defaults.adaptive_softmax_dropout),
            share_decoder_input_output_embed: self.share_decoder_input_output_embed.or(defaults.share_decoder_input_output_embed),
            share_all_embeddings:             self.share_all_embeddings.or(defaults.share_all_embeddings),
            no_token_positional_embeddings:   self.no_token_positional_embeddings.or(defaults.no_token_positional_embeddings),
            adaptive_input:                   self.adaptive_input.or(defaults.adaptive_input),
            decoder_output_dim:               self.decoder_output_dim.or(defaults.decoder_output_dim),
            decoder_input_dim:                self.decoder_input_dim.or(defaults.decoder_input_dim),
            max_target_positions:             self.max_target_positions.or(defaults.max_target_positions),
        }
    }
}

/// A fully specified model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArgs {
    pub bert_name:                        BertName,
    pub bert_layer:                       i64,
    pub no_freeze_bert:                   bool,
    pub decoder_embed_path:               Option<String>,
    pub decoder_embed_dim:                usize,
    pub decoder_ffn_embed_dim:            usize,
    pub decoder_layers:                   usize,
    pub decoder_attention_heads:          usize,
    pub decoder_normalize_before:         bool,
    pub decoder_learned_pos:              bool,
    pub attention_dropout:                f64,
    pub relu_dropout:                     f64,
    pub dropout:                          f64,
    pub adaptive_softmax_cutoff:          Option<Vec<usize>>,
    pub adaptive_softmax_dropout:         f64,
    pub share_decoder_input_output_embed: bool,
    pub share_all_embeddings:             bool,
    pub no_token_positional_embeddings:   bool,
    pub adaptive_input:                   bool,
    pub decoder_output_dim:               usize,
    pub decoder_input_dim:                usize,
    pub max_target_positions:             usize,
}

impl ModelArgs {
    /// Replace every field that `overrides` sets.
    /// The decoder width stays tied to the BERT hidden size.
    pub fn with_overrides(&self, overrides: &ArchOverrides) -> ModelArgs {
        let current = ArchOverrides {
            bert_name:                        Some(self.bert_name),
            bert_layer:                       Some(self.bert_layer),
            no_freeze_bert:                   Some(self.no_freeze_bert),
            decoder_embed_path:               self.decoder_embed_path.clone(),
            decoder_embed_dim:                Some(self.decoder_embed_dim),
            decoder_ffn_embed_dim:            Some(self.decoder_ffn_embed_dim),
            decoder_layers:                   Some(self.decoder_layers),
            decoder_attention_heads:          Some(self.decoder_attention_heads),
            decoder_normalize_before:         Some(self.decoder_normalize_before),
            decoder_learned_pos:              Some(self.decoder_learned_pos),
            attention_dropout:                Some(self.attention_dropout),
            relu_dropout:                     Some(self.relu_dropout),
            dropout:                          Some(self.dropout),
            adaptive_softmax_cutoff:          self.adaptive_softmax_cutoff.clone(),
            adaptive_softmax_dropout:         Some(self.adaptive_softmax_dropout),
            share_decoder_input_output_embed: Some(self.share_decoder_input_output_embed),
            share_all_embeddings:             Some(self.share_all_embeddings),
            no_token_positional_embeddings:   Some(self.no_token_positional_embeddings),
            adaptive_input:                   Some(self.adaptive_input),
            decoder_output_dim:               Some(self.decoder_output_dim),
            decoder_input_dim:                Some(self.decoder_input_dim),
            max_target_positions:             Some(self.max_target_positions),
        };
        bert_nmt_base(&overrides.clone().or(current))
    }
}

/// The `bert_nmt` architecture.
pub fn bert_nmt_base(o: &ArchOverrides) -> ModelArgs {
    let bert_name = o.bert_name.unwrap_or_default();
    // Always derived from the checkpoint: cross-attention reads BERT states.
    let decoder_embed_dim = bert_name.hidden_size();

    ModelArgs {
        bert_name,
        bert_layer:                       o.bert_layer.unwrap_or(-2),
        no_freeze_bert:                   o.no_freeze_bert.unwrap_or(false),
        decoder_embed_path:               o.decoder_embed_path.clone(),
        decoder_embed_dim,
        decoder_ffn_embed_dim:            o.decoder_ffn_embed_dim.unwrap_or(2048),
        decoder_layers:                   o.decoder_layers.unwrap_or(6),
        decoder_attention_heads:          o.decoder_attention_heads.unwrap_or(8),
        decoder_normalize_before:         o.decoder_normalize_before.unwrap_or(false),
        decoder_learned_pos:              o.decoder_learned_pos.unwrap_or(false),
        attention_dropout:                o.attention_dropout.unwrap_or(0.0),
        relu_dropout:                     o.relu_dropout.unwrap_or(0.0),
        dropout:                          o.dropout.unwrap_or(0.1),
        adaptive_softmax_cutoff:          o.adaptive_softmax_cutoff.clone(),
        adaptive_softmax_dropout:         o.adaptive_softmax_dropout.unwrap_or(0.0),
        share_decoder_input_output_embed: o.share_decoder_input_output_embed.unwrap_or(false),
        share_all_embeddings:             o.share_all_embeddings.unwrap_or(false),
        no_token_positional_embeddings:   o.no_token_positional_embeddings.unwrap_or(false),
        adaptive_input:                   o.adaptive_input.unwrap_or(false),
        decoder_output_dim:               o.decoder_output_dim.unwrap_or(decoder_embed_dim),
        decoder_input_dim:                o.decoder_input_dim.unwrap_or(decoder_embed_dim),
        max_target_positions:             o.max_target_positions.unwrap_or(DEFAULT_MAX_TARGET_POSITIONS),
    }
}

/// The `bert_nmt_big` architecture.
pub fn bert_nmt_big(o: &ArchOverrides) -> ModelArgs {
    let filled = o.clone().or(ArchOverrides {
        decoder_ffn_embed_dim:   Some(4096),
        decoder_attention_heads: Some(16),
        dropout:                 Some(0.3),
        ..ArchOverrides::default()
    });
    bert_nmt_base(&filled)
}

/// The `bert_nmt_big_t2t` architecture (pre-norm decoder).
pub fn bert_nmt_big_t2t(o: &ArchOverrides) -> ModelArgs {
    let filled = o.clone().or(ArchOverrides {
        decoder_normalize_before: Some(true),
        attention_dropout:        Some(0.1),
        relu_dropout:             Some(0.1),
        ..ArchOverrides::default()
    });
    bert_nmt_big(&filled)
}
