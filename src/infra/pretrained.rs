// ============================================================
// Layer 6 — Pretrained Model Store
// ============================================================
// Resolves a BERT identifier to files on disk:
//
//   <root>/
//     bert-base-uncased/
//       vocab.txt          ← WordPiece vocabulary, one token per line
//       config.json        ← Hugging Face BERT config
//       bert_model.mpk     ← weights as a Burn record
//       pytorch_model.bin  ← or the Hugging Face PyTorch weights
//     bert-base-cased/
//       ...
//
// The Burn record wins when both are present. PyTorch weights are
// imported through burn-import, with the parameter names rewritten
// onto BertModel's field layout by `hf_key_remaps`.

use std::{fs, path::PathBuf};

use burn::{
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::domain::bert_name::BertName;
use crate::error::{BertNmtError, Result};
use crate::infra::tokenizer_store::BertTokenizer;
use crate::ml::bert::{BertConfig, BertModel, BertModelRecord};

/// Regex rewrites from Hugging Face parameter names to BertModel's,
/// applied in order. Linear weights are transposed and LayerNorm
/// `weight`/`bias` become `gamma`/`beta` by the recorder itself.
/// Keys left unmatched (`cls.*` heads, `position_ids`) are ignored.
pub fn hf_key_remaps() -> Vec<(&'static str, &'static str)> {
    vec![
        (r"^bert\.", ""),
        // TensorFlow-converted checkpoints
        (r"\.gamma$", ".weight"),
        (r"\.beta$", ".bias"),
        (r"^embeddings\.LayerNorm\.", "embeddings.layer_norm."),
        (r"^encoder\.layer\.([0-9]+)\.attention\.self\.", "layers.$1.self_attn."),
        (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense\.", "layers.$1.self_attn.output."),
        (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm\.", "layers.$1.norm1."),
        (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense\.", "layers.$1.ffn_linear1."),
        (r"^encoder\.layer\.([0-9]+)\.output\.dense\.", "layers.$1.ffn_linear2."),
        (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm\.", "layers.$1.norm2."),
        (r"^pooler\.dense\.", "pooler."),
    ]
}

/// Environment variable naming the store root.
pub const PRETRAINED_DIR_ENV: &str = "BERT_NMT_PRETRAINED_DIR";

#[derive(Debug, Clone)]
pub struct PretrainedStore {
    root: PathBuf,
}

impl PretrainedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn model_dir(&self, name: BertName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub fn vocab_path(&self, name: BertName) -> PathBuf {
        self.model_dir(name).join("vocab.txt")
    }

    pub fn config_path(&self, name: BertName) -> PathBuf {
        self.model_dir(name).join("config.json")
    }

    /// Record path without extension; the recorder adds its own.
    pub fn weights_path(&self, name: BertName) -> PathBuf {
        self.model_dir(name).join("bert_model")
    }

    pub fn pytorch_weights_path(&self, name: BertName) -> PathBuf {
        self.model_dir(name).join("pytorch_model.bin")
    }

    /// WordPiece tokenizer, lowercasing as the checkpoint requires.
    pub fn load_tokenizer(&self, name: BertName) -> Result<BertTokenizer> {
        let path = self.vocab_path(name);
        tracing::debug!("Loading {} vocabulary from '{}'", name, path.display());
        BertTokenizer::from_vocab_file(&path, name.lowercase())
    }

    pub fn load_config(&self, name: BertName) -> Result<BertConfig> {
        let path = self.config_path(name);
        let json = fs::read_to_string(&path).map_err(|e| {
            BertNmtError::Pretrained(format!("Cannot read '{}': {e}", path.display()))
        })?;
        Ok(BertConfig::from_hf_json(&json)?)
    }

    /// Build BERT from its config and restore the pretrained weights.
    pub fn load_bert<B: Backend>(&self, name: BertName, device: &B::Device) -> Result<BertModel<B>> {
        let config = self.load_config(name)?;
        let model: BertModel<B> = config.init(device);
        let record = if self.has_pytorch_weights_only(name) {
            self.import_record(name, device)?
        } else {
            let path = self.weights_path(name);
            CompactRecorder::new()
                .load(path.clone(), device)
                .map_err(|e| BertNmtError::Pretrained(format!(
                    "Cannot load weights '{}': {e}", path.display()
                )))?
        };
        tracing::info!("Loaded pretrained {} ({} layers)", name, config.num_hidden_layers);
        Ok(model.load_record(record))
    }

    fn has_pytorch_weights_only(&self, name: BertName) -> bool {
        !self.weights_path(name).with_extension("mpk").exists()
            && self.pytorch_weights_path(name).exists()
    }

    /// Read `pytorch_model.bin` into a BertModel record.
    pub fn import_record<B: Backend>(&self, name: BertName, device: &B::Device) -> Result<BertModelRecord<B>> {
        let path = self.pytorch_weights_path(name);
        tracing::info!("Importing PyTorch weights from '{}'", path.display());
        let args = hf_key_remaps()
            .into_iter()
            .fold(LoadArgs::new(path.clone()), |args, (pattern, replacement)| {
                args.with_key_remap(pattern, replacement)
            });
        PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(args, device)
            .map_err(|e| BertNmtError::Pretrained(format!(
                "Cannot import weights '{}': {e}", path.display()
            )))
    }

    /// Convert `pytorch_model.bin` into the store's Burn record.
    pub fn convert_pytorch<B: Backend>(&self, name: BertName, device: &B::Device) -> Result<()> {
        let config = self.load_config(name)?;
        let model  = config.init::<B>(device).load_record(self.import_record(name, device)?);
        self.save_bert(name, &config, &model)
    }

    /// Write a config and weights into the store, e.g. after conversion.
    pub fn save_bert<B: Backend>(&self, name: BertName, config: &BertConfig, model: &BertModel<B>) -> Result<()> {
        fs::create_dir_all(self.model_dir(name))?;
        fs::write(self.config_path(name), serde_json::to_string_pretty(config)?)?;
        let path = self.weights_path(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| BertNmtError::Pretrained(format!(
                "Cannot save weights '{}': {e}", path.display()
            )))?;
        tracing::debug!("Saved {} into '{}'", name, self.model_dir(name).display());
        Ok(())
    }
}
