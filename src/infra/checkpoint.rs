// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a trained translation model with Burn's
// CompactRecorder.
//
// What a checkpoint directory holds:
//   checkpoint.json   ← architecture name, task args, model args
//   model.mpk         ← every model parameter, encoder and decoder
//
// The args are needed before the weights: the model has to be
// rebuilt with the exact same shape before a record can be
// loaded into it.
//
// Loading is strict: the record must deserialize into this
// model's structure, and the parameter count recorded at save
// time must match the rebuilt model both before and after the
// weights are restored.

use std::{fs, path::PathBuf};

use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::task::TaskArgs;
use crate::error::{BertNmtError, Result};
use crate::ml::arch::ModelArgs;
use crate::ml::model::BertTranslationModel;

/// Everything needed to rebuild the model a checkpoint was taken from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointArgs {
    pub arch:  String,
    pub task:  TaskArgs,
    pub model: ModelArgs,
}

/// On-disk form of checkpoint.json.
#[derive(Serialize, Deserialize)]
struct SavedCheckpoint {
    args:       CheckpointArgs,
    num_params: usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn args_path(&self) -> PathBuf {
        self.dir.join("checkpoint.json")
    }

    fn model_path(&self) -> PathBuf {
        self.dir.join("model")
    }

    pub fn save<B: Backend>(&self, model: &BertTranslationModel<B>, args: &CheckpointArgs) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let saved = SavedCheckpoint { args: args.clone(), num_params: model.num_params() };
        fs::write(self.args_path(), serde_json::to_string_pretty(&saved)?)?;

        let path = self.model_path();
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| BertNmtError::Checkpoint(format!(
                "Failed to save checkpoint to '{}': {e}", path.display()
            )))?;

        tracing::debug!("Saved checkpoint to '{}'", self.dir.display());
        Ok(())
    }

    fn read_saved(&self) -> Result<SavedCheckpoint> {
        let path = self.args_path();
        let json = fs::read_to_string(&path).map_err(|e| {
            BertNmtError::Checkpoint(format!("Cannot read '{}': {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn load_args(&self) -> Result<CheckpointArgs> {
        Ok(self.read_saved()?.args)
    }

    /// Restore saved weights into a freshly built model of the same shape.
    pub fn load_model<B: Backend>(
        &self,
        model:  BertTranslationModel<B>,
        device: &B::Device,
    ) -> Result<BertTranslationModel<B>> {
        let path     = self.model_path();
        let saved    = self.read_saved()?.num_params;
        let expected = model.num_params();
        if saved != expected {
            return Err(BertNmtError::Checkpoint(format!(
                "'{}' was saved with {saved} parameters, model has {expected}", self.dir.display()
            )));
        }

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .map_err(|e| BertNmtError::Checkpoint(format!(
                "Cannot load '{}' into this model: {e}", path.display()
            )))?;
        let model = model.load_record(record);

        let found = model.num_params();
        if found != expected {
            return Err(BertNmtError::Checkpoint(format!(
                "'{}' holds {found} parameters, model expects {expected}", path.display()
            )));
        }

        tracing::info!("Loaded checkpoint '{}' ({} parameters)", self.dir.display(), found);
        Ok(model)
    }
}
