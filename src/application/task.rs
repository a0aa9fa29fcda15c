// ============================================================
// Layer 2 — Bert Translation Task
// ============================================================
// Wires the two dictionaries and the model together:
//
//   setup_task
//     ├─ left-pad flags        "True" / "False" → bool
//     ├─ language pair         given, or read off file names
//     ├─ source dictionary     BertBasedDictionary(bert_name)
//     ├─ target dictionary     <data>/dict.<tgt>.txt, Bert-compatible
//     └─ pad/unk/eos must agree between the two
//
//   load_pretrained_model
//     checkpoint.json → (overrides) → dictionaries → model → weights
//
// Reference: Clean Architecture pattern

use std::path::{Path, PathBuf};

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::registry::lookup_architecture;
use crate::data::{
    bert_based::BertBasedDictionary,
    bert_compatible::BertCompatibleDictionary,
    dictionary::Dictionary,
    language_pair::infer_language_pair,
};
use crate::domain::bert_name::BertName;
use crate::domain::traits::{check_special_indices, Vocabulary};
use crate::error::{BertNmtError, Result};
use crate::infra::checkpoint::{CheckpointArgs, CheckpointManager};
use crate::infra::pretrained::PretrainedStore;
use crate::ml::arch::{ArchOverrides, ModelArgs};
use crate::ml::model::BertTranslationModel;

/// Registered task name.
pub const TASK_NAME: &str = "bert_translation";

/// Task-level settings, saved with every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskArgs {
    pub data:                 Vec<PathBuf>,
    pub source_lang:          Option<String>,
    pub target_lang:          Option<String>,
    pub left_pad_source:      String,
    pub left_pad_target:      String,
    pub bert_name:            BertName,
    pub max_source_positions: usize,
    pub max_target_positions: usize,
}

impl Default for TaskArgs {
    fn default() -> Self {
        Self {
            data:                 Vec::new(),
            source_lang:          None,
            target_lang:          None,
            left_pad_source:      "True".to_string(),
            left_pad_target:      "False".to_string(),
            bert_name:            BertName::default(),
            max_source_positions: 1024,
            max_target_positions: 1024,
        }
    }
}

/// Parse a boolean flag written the way the training scripts write it.
pub fn eval_bool(value: &str) -> Result<bool> {
    match value.trim() {
        "True" | "true" | "1"   => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(BertNmtError::InvalidBool(other.to_string())),
    }
}

pub struct BertTranslationTask {
    pub args:            TaskArgs,
    pub left_pad_source: bool,
    pub left_pad_target: bool,
    pub src_dict:        BertBasedDictionary,
    pub tgt_dict:        Dictionary,
    store:               PretrainedStore,
}

impl BertTranslationTask {
    pub fn setup_task(mut args: TaskArgs, store: PretrainedStore) -> Result<Self> {
        let left_pad_source = eval_bool(&args.left_pad_source)?;
        let left_pad_target = eval_bool(&args.left_pad_target)?;

        let first = args
            .data
            .first()
            .cloned()
            .ok_or_else(|| BertNmtError::LanguagePair(PathBuf::new()))?;
        let (src, tgt) = match (&args.source_lang, &args.target_lang) {
            (Some(src), Some(tgt)) => (src.clone(), tgt.clone()),
            _ => infer_language_pair(&first)?,
        };
        args.source_lang = Some(src.clone());
        args.target_lang = Some(tgt.clone());

        let src_dict = BertBasedDictionary::new(args.bert_name, &store)?;
        let tgt_dict = Self::load_dictionary(&first.join(format!("dict.{tgt}.txt")))?;
        check_special_indices(&src_dict, &tgt_dict)?;

        tracing::info!("| [{}] dictionary: {} types", src, src_dict.len());
        tracing::info!("| [{}] dictionary: {} types", tgt, tgt_dict.len());

        Ok(Self { args, left_pad_source, left_pad_target, src_dict, tgt_dict, store })
    }

    pub fn load_dictionary(path: &Path) -> Result<Dictionary> {
        BertCompatibleDictionary::load(path)
    }

    pub fn build_dictionary(
        filenames:      &[impl AsRef<Path>],
        threshold:      usize,
        nwords:         Option<usize>,
        padding_factor: usize,
    ) -> Result<Dictionary> {
        BertCompatibleDictionary::build(filenames, threshold, nwords, padding_factor)
    }

    /// Pretrained BERT from the store plus a freshly initialised decoder.
    pub fn build_model<B: Backend>(&self, args: &ModelArgs, device: &B::Device) -> Result<BertTranslationModel<B>> {
        if args.bert_name != self.args.bert_name {
            return Err(BertNmtError::Pretrained(format!(
                "source text is tokenized for {} but the model encodes with {}",
                self.args.bert_name, args.bert_name
            )));
        }
        let bert = self.store.load_bert(args.bert_name, device)?;
        BertTranslationModel::build(args, bert, self.src_dict.pad(), &self.tgt_dict, device)
    }

    pub fn save_checkpoint<B: Backend>(
        &self,
        dir:   &Path,
        arch:  &str,
        args:  &ModelArgs,
        model: &BertTranslationModel<B>,
    ) -> Result<()> {
        let saved = CheckpointArgs {
            arch:  arch.to_string(),
            task:  self.args.clone(),
            model: args.clone(),
        };
        CheckpointManager::new(dir).save(model, &saved)?;
        tracing::info!("Saved {} checkpoint to '{}'", arch, dir.display());
        Ok(())
    }

    /// Rebuild a task and its model from a checkpoint directory.
    ///
    /// `src_vocab` replaces the store's vocab.txt for the source side.
    /// The saved model args are used as they are unless `overrides`
    /// sets a field.
    pub fn load_pretrained_model<B: Backend>(
        checkpoint_dir: &Path,
        src_vocab:      Option<&Path>,
        tgt_dict_path:  &Path,
        overrides:      Option<&ArchOverrides>,
        store:          PretrainedStore,
        device:         &B::Device,
    ) -> Result<(Self, BertTranslationModel<B>)> {
        let manager = CheckpointManager::new(checkpoint_dir);
        let saved   = manager.load_args()?;
        lookup_architecture(&saved.arch)?;

        let model_args = match overrides {
            Some(o) => saved.model.with_overrides(o),
            None    => saved.model,
        };

        let mut args = saved.task;
        args.bert_name = model_args.bert_name;
        let left_pad_source = eval_bool(&args.left_pad_source)?;
        let left_pad_target = eval_bool(&args.left_pad_target)?;

        let src_dict = match src_vocab {
            Some(vocab) => BertBasedDictionary::from_vocab_file(args.bert_name, vocab)?,
            None        => BertBasedDictionary::new(args.bert_name, &store)?,
        };
        let tgt_dict = Self::load_dictionary(tgt_dict_path)?;
        check_special_indices(&src_dict, &tgt_dict)?;

        let task  = Self { args, left_pad_source, left_pad_target, src_dict, tgt_dict, store };
        let model = task.build_model(&model_args, device)?;
        let model = manager.load_model(model, device)?;
        Ok((task, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use crate::test_support::{tiny_model_args, tiny_store, TestBackend};

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dict.en.txt"), "the 10\ncat 4\n").unwrap();
        fs::write(dir.path().join("train.de-en.de"), "").unwrap();
        dir
    }

    fn task_args(data: &TempDir) -> TaskArgs {
        TaskArgs { data: vec![data.path().to_path_buf()], ..TaskArgs::default() }
    }

    #[test]
    fn test_eval_bool() {
        assert!(eval_bool("True").unwrap());
        assert!(!eval_bool("False").unwrap());
        assert!(matches!(eval_bool("yes"), Err(BertNmtError::InvalidBool(_))));
    }

    #[test]
    fn test_setup_infers_pair_and_checks_dictionaries() {
        let (_store_dir, store) = tiny_store();
        let data = data_dir();
        let task = BertTranslationTask::setup_task(task_args(&data), store).unwrap();

        assert_eq!(task.args.source_lang.as_deref(), Some("de"));
        assert_eq!(task.args.target_lang.as_deref(), Some("en"));
        assert!(task.left_pad_source);
        assert!(!task.left_pad_target);
        assert_eq!(task.tgt_dict.len(), 105);
        assert_eq!(task.tgt_dict.index("the"), 103);
    }

    #[test]
    fn test_explicit_pair_skips_inference() {
        let (_store_dir, store) = tiny_store();
        let data = TempDir::new().unwrap();
        fs::write(data.path().join("dict.fr.txt"), "").unwrap();
        let args = TaskArgs {
            source_lang: Some("en".into()),
            target_lang: Some("fr".into()),
            ..task_args(&data)
        };
        let task = BertTranslationTask::setup_task(args, store).unwrap();
        assert_eq!(task.tgt_dict.len(), 103);
    }

    #[test]
    fn test_mismatched_vocabulary_is_fatal() {
        let (_store_dir, store) = tiny_store();
        // [SEP] sits at 3 here instead of 102.
        fs::write(store.vocab_path(BertName::BertBaseUncased), "[PAD]\n[UNK]\n[CLS]\n[SEP]\nthe\n").unwrap();
        let data = data_dir();
        let result = BertTranslationTask::setup_task(task_args(&data), store);
        assert!(matches!(result, Err(BertNmtError::SpecialIndexMismatch { .. })));
    }

    #[test]
    fn test_invalid_left_pad_flag() {
        let (_store_dir, store) = tiny_store();
        let data = data_dir();
        let args = TaskArgs { left_pad_source: "maybe".into(), ..task_args(&data) };
        assert!(matches!(
            BertTranslationTask::setup_task(args, store),
            Err(BertNmtError::InvalidBool(_))
        ));
    }

    #[test]
    fn test_build_dictionary_uses_bert_layout() {
        let corpus = TempDir::new().unwrap();
        let path   = corpus.path().join("train.en");
        fs::write(&path, "the cat\nthe dog\n").unwrap();
        let d = BertTranslationTask::build_dictionary(&[&path], 1, None, 8).unwrap();
        assert_eq!(d.nspecial(), 103);
        assert_eq!(d.index("the"), 103);
        assert_eq!(d.len() % 8, 0);
    }

    fn embedding_weights(model: &BertTranslationModel<TestBackend>) -> Vec<f32> {
        model.decoder.embed_tokens.weight.val().into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let (_store_dir, store) = tiny_store();
        let data   = data_dir();
        let ckpt   = TempDir::new().unwrap();
        let device = Default::default();

        let task  = BertTranslationTask::setup_task(task_args(&data), store.clone()).unwrap();
        let args  = tiny_model_args();
        let model = task.build_model::<TestBackend>(&args, &device).unwrap();
        task.save_checkpoint(ckpt.path(), "bert_nmt", &args, &model).unwrap();

        let (loaded_task, loaded) = BertTranslationTask::load_pretrained_model::<TestBackend>(
            ckpt.path(),
            None,
            &data.path().join("dict.en.txt"),
            None,
            store,
            &device,
        )
        .unwrap();

        assert_eq!(loaded_task.args.target_lang.as_deref(), Some("en"));
        assert_eq!(loaded.num_params(), model.num_params());

        // CompactRecorder stores half precision.
        let before = embedding_weights(&model);
        let after  = embedding_weights(&loaded);
        assert_eq!(before.len(), after.len());
        assert!(before.iter().zip(&after).all(|(a, b)| (a - b).abs() < 1e-3));
    }

    #[test]
    fn test_strict_load_rejects_other_decoder_depth() {
        let (_store_dir, store) = tiny_store();
        let data   = data_dir();
        let ckpt   = TempDir::new().unwrap();
        let device = Default::default();

        let task  = BertTranslationTask::setup_task(task_args(&data), store).unwrap();
        let args  = tiny_model_args();
        let model = task.build_model::<TestBackend>(&args, &device).unwrap();
        task.save_checkpoint(ckpt.path(), "bert_nmt", &args, &model).unwrap();

        for layers in [1, 3] {
            let other = ModelArgs { decoder_layers: layers, ..args.clone() };
            let fresh = task.build_model::<TestBackend>(&other, &device).unwrap();
            let result = CheckpointManager::new(ckpt.path()).load_model(fresh, &device);
            assert!(matches!(result, Err(BertNmtError::Checkpoint(_))));
        }
    }

    #[test]
    fn test_unknown_architecture_in_checkpoint() {
        let (_store_dir, store) = tiny_store();
        let data   = data_dir();
        let ckpt   = TempDir::new().unwrap();
        let device = Default::default();

        let task  = BertTranslationTask::setup_task(task_args(&data), store.clone()).unwrap();
        let args  = tiny_model_args();
        let model = task.build_model::<TestBackend>(&args, &device).unwrap();
        task.save_checkpoint(ckpt.path(), "bert_nmt_huge", &args, &model).unwrap();

        let result = BertTranslationTask::load_pretrained_model::<TestBackend>(
            ckpt.path(), None, &data.path().join("dict.en.txt"), None, store, &device,
        );
        assert!(matches!(result, Err(BertNmtError::UnknownRegistryName { .. })));
    }
}
